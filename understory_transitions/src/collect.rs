// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transition collection: fold every transition source of a pass into one
//! root transition plus the root bounds transitions.
//!
//! ## Sources, in order
//!
//! 1) Transitions declared by the [`RenderSnapshot`].
//! 2) Transitions produced by components that need their previous render
//!    output ([`TransitionProvider`]), after the [`LogicalTree`] applied that
//!    previous data.
//! 3) Transitions contributed by pending state updates, consumed from the
//!    [`LogicalTree`].

use alloc::rc::Rc;
use alloc::string::ToString;
use alloc::vec::Vec;

use crate::error::TransitionsError;
use crate::snapshot::RenderSnapshot;
use crate::transition::{
    RootBoundsTransition, Transition, collect_root_bounds_transitions, root_transition,
};
use crate::types::AnimatedProperties;

/// A component that builds its transition from its previous render output.
pub trait TransitionProvider {
    /// The component's resolved identity in the logical tree.
    fn global_key(&self) -> &str;

    /// Produce this pass's transition, if any.
    fn create_transition(&self, global_key: &str) -> Option<Transition>;
}

/// The logical tree that owns state updates and previous render data.
pub trait LogicalTree {
    /// Hand previous render data to the components that asked for it.
    fn apply_previous_render_data(&mut self, components: &[Rc<dyn TransitionProvider>]);

    /// Append the transitions of pending state updates to `out`.
    fn consume_state_update_transitions(
        &mut self,
        out: &mut Vec<Option<Transition>>,
        root_component: &str,
    );

    /// Receive the width and height animations of the root container.
    fn set_root_bounds_transitions(
        &mut self,
        width: Option<RootBoundsTransition>,
        height: Option<RootBoundsTransition>,
    );
}

/// A logical tree with no state updates and no interest in root bounds.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoLogicalTree;

impl LogicalTree for NoLogicalTree {
    fn apply_previous_render_data(&mut self, _: &[Rc<dyn TransitionProvider>]) {}

    fn consume_state_update_transitions(&mut self, _: &mut Vec<Option<Transition>>, _: &str) {}

    fn set_root_bounds_transitions(
        &mut self,
        _: Option<RootBoundsTransition>,
        _: Option<RootBoundsTransition>,
    ) {
    }
}

/// Collects the root transition at most once per mount pass.
#[derive(Clone, Debug, Default)]
pub struct TransitionCollector {
    collected: bool,
    root: Option<Transition>,
}

impl TransitionCollector {
    /// Create a collector with nothing collected.
    pub fn new() -> Self {
        Self::default()
    }

    /// True once [`collect`](Self::collect) ran in the current pass.
    pub fn has_collected(&self) -> bool {
        self.collected
    }

    /// The root transition of the current pass, if one was collected.
    pub fn root_transition(&self) -> Option<&Transition> {
        self.root.as_ref()
    }

    /// Gather and fold every transition source for `input`.
    ///
    /// Subsequent calls in the same pass return the cached result. Root
    /// bounds transitions are handed to `tree`.
    pub fn collect<L: LogicalTree + ?Sized>(
        &mut self,
        input: &RenderSnapshot,
        tree: &mut L,
    ) -> Result<Option<&Transition>, TransitionsError> {
        if self.collected {
            return Ok(self.root.as_ref());
        }

        let mut all: Vec<Option<Transition>> = input.transitions().to_vec();

        let components = input.components_needing_previous_render_data();
        tree.apply_previous_render_data(components);
        for component in components {
            let key = component.global_key();
            if let Some(transition) = component.create_transition(key) {
                all.push(Some(transition));
            }
        }

        tree.consume_state_update_transitions(&mut all, input.root_component_name());

        let all = all
            .into_iter()
            .collect::<Option<Vec<Transition>>>()
            .ok_or_else(|| {
                let err = TransitionsError::NullTransition {
                    root_component: input.root_component_name().into(),
                    root_transition_id: input
                        .root_transition_id()
                        .map_or_else(|| "none".into(), ToString::to_string),
                };
                tracing::error!(%err, "aborting transition collection");
                err
            })?;

        let mut width = None;
        let mut height = None;
        if let Some(root_id) = input.root_transition_id() {
            for transition in &all {
                let (w, h) = (AnimatedProperties::WIDTH, AnimatedProperties::HEIGHT);
                collect_root_bounds_transitions(root_id, transition, w, &mut width);
                collect_root_bounds_transitions(root_id, transition, h, &mut height);
            }
        }
        tree.set_root_bounds_transitions(width, height);

        tracing::debug!(count = all.len(), "collected transitions");
        self.root = root_transition(all);
        self.collected = true;
        Ok(self.root.as_ref())
    }

    /// Forget the cached result so the next pass collects again.
    pub fn reset(&mut self) {
        self.collected = false;
        self.root = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::node;
    use crate::transition::{TransitionTarget, TransitionUnit};
    use crate::types::{ContentKind, TransitionId, TreeId};
    use alloc::string::String;
    use alloc::vec;
    use core::cell::Cell;

    #[derive(Default)]
    struct RecordingTree {
        applied: usize,
        pending: Vec<Option<Transition>>,
        width: Option<RootBoundsTransition>,
        height: Option<RootBoundsTransition>,
        bounds_calls: usize,
    }

    impl LogicalTree for RecordingTree {
        fn apply_previous_render_data(&mut self, components: &[Rc<dyn TransitionProvider>]) {
            self.applied += components.len();
        }

        fn consume_state_update_transitions(&mut self, out: &mut Vec<Option<Transition>>, _: &str) {
            out.append(&mut self.pending);
        }

        fn set_root_bounds_transitions(
            &mut self,
            width: Option<RootBoundsTransition>,
            height: Option<RootBoundsTransition>,
        ) {
            self.width = width;
            self.height = height;
            self.bounds_calls += 1;
        }
    }

    struct Provider {
        key: String,
        transition: Option<Transition>,
        asked: Cell<usize>,
    }

    impl TransitionProvider for Provider {
        fn global_key(&self) -> &str {
            &self.key
        }

        fn create_transition(&self, global_key: &str) -> Option<Transition> {
            assert_eq!(global_key, self.key);
            self.asked.set(self.asked.get() + 1);
            self.transition.clone()
        }
    }

    fn unit(id: &str, props: AnimatedProperties) -> Transition {
        TransitionUnit::new(TransitionTarget::Single(TransitionId::global(id)), props).into()
    }

    fn snapshot_with(
        declared: Vec<Transition>,
        providers: Vec<Rc<dyn TransitionProvider>>,
    ) -> RenderSnapshot {
        let mut b = RenderSnapshot::builder(TreeId(1), "Root");
        b.root(node(0, ContentKind::Host).with_transition_id(TransitionId::global("root")));
        for t in declared {
            b.transition(t);
        }
        for p in providers {
            b.previous_render_data(p);
        }
        b.build().unwrap()
    }

    #[test]
    fn folds_all_sources_in_order() {
        let provider = Rc::new(Provider {
            key: "list".into(),
            transition: Some(unit("b", AnimatedProperties::Y)),
            asked: Cell::new(0),
        });
        let silent = Rc::new(Provider {
            key: "quiet".into(),
            transition: None,
            asked: Cell::new(0),
        });
        let input = snapshot_with(
            vec![unit("a", AnimatedProperties::X)],
            vec![provider.clone() as Rc<dyn TransitionProvider>, silent.clone()],
        );
        let mut tree = RecordingTree {
            pending: vec![Some(unit("c", AnimatedProperties::ALPHA))],
            ..Default::default()
        };
        let mut collector = TransitionCollector::new();
        let root = collector.collect(&input, &mut tree).unwrap().cloned();

        let Some(Transition::Parallel(children)) = root else {
            panic!("three sources fold into a parallel set");
        };
        assert_eq!(
            children,
            vec![
                unit("a", AnimatedProperties::X),
                unit("b", AnimatedProperties::Y),
                unit("c", AnimatedProperties::ALPHA),
            ]
        );
        assert_eq!(tree.applied, 2);
        assert_eq!(provider.asked.get(), 1);
        assert_eq!(silent.asked.get(), 1, "empty providers are asked but contribute nothing");
    }

    #[test]
    fn collects_at_most_once_per_pass() {
        let input = snapshot_with(vec![unit("a", AnimatedProperties::X)], vec![]);
        let mut tree = RecordingTree::default();
        let mut collector = TransitionCollector::new();
        collector.collect(&input, &mut tree).unwrap();
        collector.collect(&input, &mut tree).unwrap();
        assert_eq!(tree.bounds_calls, 1);
        assert!(collector.has_collected());

        collector.reset();
        assert!(collector.root_transition().is_none());
        collector.collect(&input, &mut tree).unwrap();
        assert_eq!(tree.bounds_calls, 2);
    }

    #[test]
    fn null_entry_aborts_and_names_root() {
        let input = snapshot_with(vec![unit("a", AnimatedProperties::X)], vec![]);
        let mut tree = RecordingTree {
            pending: vec![None],
            ..Default::default()
        };
        let mut collector = TransitionCollector::new();
        let err = collector.collect(&input, &mut tree).unwrap_err();
        assert_eq!(
            err,
            TransitionsError::NullTransition {
                root_component: "Root".into(),
                root_transition_id: "root".into(),
            }
        );
        assert!(!collector.has_collected());
    }

    #[test]
    fn root_bounds_are_extracted_for_the_root_id() {
        let input = snapshot_with(
            vec![
                unit("root", AnimatedProperties::HEIGHT),
                unit("other", AnimatedProperties::WIDTH),
            ],
            vec![],
        );
        let mut tree = RecordingTree::default();
        TransitionCollector::new().collect(&input, &mut tree).unwrap();
        assert!(tree.width.is_none());
        assert_eq!(
            tree.height.map(|h| h.unit.properties),
            Some(AnimatedProperties::HEIGHT)
        );
    }

    #[test]
    fn no_sources_means_no_root() {
        let input = snapshot_with(vec![], vec![]);
        let mut collector = TransitionCollector::new();
        assert!(collector.collect(&input, &mut NoLogicalTree).unwrap().is_none());
        assert!(collector.has_collected());
    }
}
