// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The transition manager boundary.
//!
//! A [`TransitionManager`] owns animation timelines: it classifies transition
//! ids when a pass sets up its root transition, drives the animations, and
//! reports completions. Completions are queued as [`TransitionEvent`]s and
//! drained by the engine on its own thread, between passes.
//!
//! [`ScriptedTransitionManager`] is a bookkeeping-only implementation: it
//! never interpolates anything and completes animations only when told to.

use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use core::fmt;

use crate::affinity::AffinityGroup;
use crate::snapshot::TransitionIdMapping;
use crate::transition::{Transition, TransitionEndHandler};
use crate::types::{OutputType, PropertyHandle, TransitionId};

/// A completion reported by a [`TransitionManager`].
#[derive(Clone, Debug, PartialEq)]
pub enum TransitionEvent {
    /// Every animation of this id finished.
    AnimationComplete(TransitionId),
    /// One property of one id finished.
    UnitComplete {
        /// The property that finished.
        handle: PropertyHandle,
        /// Callback of the unit that animated it.
        end_handler: Option<TransitionEndHandler>,
    },
}

/// Drives property animations for the engine.
///
/// `I` is the mount item handle of the [`MountTarget`](crate::MountTarget)
/// being animated.
pub trait TransitionManager<I> {
    /// Classify every id of `previous` and `next` against `root` and prepare
    /// the animations this pass needs.
    fn setup_transitions(
        &mut self,
        previous: Option<&TransitionIdMapping>,
        next: &TransitionIdMapping,
        root: &Transition,
    );

    /// True if `id` has a running or prepared animation.
    fn is_animating(&self, id: &TransitionId) -> bool;

    /// True if `id` is animating out of the tree.
    fn is_disappearing(&self, id: &TransitionId) -> bool;

    /// Start the prepared animations.
    fn run_transitions(&mut self);

    /// Jump running animations that this pass did not declare to their end.
    fn finish_undeclared_transitions(&mut self);

    /// Drop every animation and all mount content without reporting completions.
    fn reset(&mut self);

    /// Set or clear the mount content animated for `id`.
    fn set_mount_content(&mut self, id: &TransitionId, content: Option<AffinityGroup<I>>);

    /// Forget the `output_type` member of `id`'s mount content.
    fn remove_mount_content(&mut self, id: &TransitionId, output_type: OutputType);

    /// Take the oldest pending completion.
    fn poll_event(&mut self) -> Option<TransitionEvent>;
}

/// A transition manager that only keeps books.
///
/// Setup classifies ids the way a real manager would:
///
/// - an id in both mappings animates if the root transition targets it,
/// - an id only in `next` animates if a targeting unit has an appear value,
/// - an id only in `previous` disappears if a targeting unit has a disappear
///   value.
///
/// Nothing completes on its own: call [`finish`](Self::finish) or
/// [`finish_all`](Self::finish_all), then let the engine drain the events.
pub struct ScriptedTransitionManager<I> {
    root: Option<Transition>,
    animating: BTreeSet<TransitionId>,
    disappearing: BTreeSet<TransitionId>,
    declared: BTreeSet<TransitionId>,
    content: BTreeMap<TransitionId, AffinityGroup<I>>,
    events: VecDeque<TransitionEvent>,
    running: bool,
    setups: usize,
    runs: usize,
    resets: usize,
}

impl<I> Default for ScriptedTransitionManager<I> {
    fn default() -> Self {
        Self {
            root: None,
            animating: BTreeSet::new(),
            disappearing: BTreeSet::new(),
            declared: BTreeSet::new(),
            content: BTreeMap::new(),
            events: VecDeque::new(),
            running: false,
            setups: 0,
            runs: 0,
            resets: 0,
        }
    }
}

impl<I> fmt::Debug for ScriptedTransitionManager<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedTransitionManager")
            .field("animating", &self.animating)
            .field("disappearing", &self.disappearing)
            .field("content", &self.content.len())
            .field("pending_events", &self.events.len())
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl<I> ScriptedTransitionManager<I> {
    /// Create an idle manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete every animation of `id`.
    ///
    /// Queues one [`TransitionEvent::UnitComplete`] per animated property that
    /// has an end handler, then [`TransitionEvent::AnimationComplete`]. Does
    /// nothing if `id` is not animating.
    pub fn finish(&mut self, id: &TransitionId) {
        let was_animating = self.animating.remove(id);
        let was_disappearing = self.disappearing.remove(id);
        if !was_animating && !was_disappearing {
            return;
        }
        if let Some(root) = &self.root {
            for unit in root.units().filter(|u| u.target.targets(id)) {
                let Some(handler) = &unit.end_handler else {
                    continue;
                };
                for property in unit.properties.iter() {
                    self.events.push_back(TransitionEvent::UnitComplete {
                        handle: PropertyHandle {
                            transition_id: id.clone(),
                            property,
                        },
                        end_handler: Some(handler.clone()),
                    });
                }
            }
        }
        self.events.push_back(TransitionEvent::AnimationComplete(id.clone()));
    }

    /// Complete every running animation, in id order.
    pub fn finish_all(&mut self) {
        let ids: BTreeSet<TransitionId> =
            self.animating.union(&self.disappearing).cloned().collect();
        for id in &ids {
            self.finish(id);
        }
    }

    /// The mount content currently animated for `id`.
    pub fn mount_content(&self, id: &TransitionId) -> Option<&AffinityGroup<I>> {
        self.content.get(id)
    }

    /// Number of pending events.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// True once [`run_transitions`](TransitionManager::run_transitions) was called
    /// since the last reset.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of setups since creation.
    pub fn setup_count(&self) -> usize {
        self.setups
    }

    /// Number of runs since creation.
    pub fn run_count(&self) -> usize {
        self.runs
    }

    /// Number of resets since creation.
    pub fn reset_count(&self) -> usize {
        self.resets
    }

    fn appears(root: &Transition, id: &TransitionId) -> bool {
        root.units().any(|u| u.target.targets(id) && u.appear_from.is_some())
    }

    fn disappears(root: &Transition, id: &TransitionId) -> bool {
        root.units().any(|u| u.target.targets(id) && u.disappear_to.is_some())
    }
}

impl<I> TransitionManager<I> for ScriptedTransitionManager<I> {
    fn setup_transitions(
        &mut self,
        previous: Option<&TransitionIdMapping>,
        next: &TransitionIdMapping,
        root: &Transition,
    ) {
        self.setups += 1;
        for id in next.keys() {
            let existed = previous.is_some_and(|p| p.contains_key(id));
            let animates = if existed {
                root.targets(id)
            } else {
                Self::appears(root, id)
            };
            if animates {
                self.disappearing.remove(id);
                self.animating.insert(id.clone());
                self.declared.insert(id.clone());
            }
        }
        if let Some(previous) = previous {
            for id in previous.keys().filter(|id| !next.contains_key(*id)) {
                if Self::disappears(root, id) {
                    self.animating.remove(id);
                    self.disappearing.insert(id.clone());
                    self.declared.insert(id.clone());
                }
            }
        }
        self.root = Some(root.clone());
    }

    fn is_animating(&self, id: &TransitionId) -> bool {
        self.animating.contains(id) || self.disappearing.contains(id)
    }

    fn is_disappearing(&self, id: &TransitionId) -> bool {
        self.disappearing.contains(id)
    }

    fn run_transitions(&mut self) {
        self.runs += 1;
        self.running = true;
    }

    fn finish_undeclared_transitions(&mut self) {
        let undeclared: BTreeSet<TransitionId> = self
            .animating
            .union(&self.disappearing)
            .filter(|id| !self.declared.contains(*id))
            .cloned()
            .collect();
        for id in &undeclared {
            self.finish(id);
        }
        self.declared.clear();
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.root = None;
        self.animating.clear();
        self.disappearing.clear();
        self.declared.clear();
        self.content.clear();
        self.events.clear();
        self.running = false;
    }

    fn set_mount_content(&mut self, id: &TransitionId, content: Option<AffinityGroup<I>>) {
        match content {
            Some(group) => {
                self.content.insert(id.clone(), group);
            }
            None => {
                self.content.remove(id);
            }
        }
    }

    fn remove_mount_content(&mut self, id: &TransitionId, output_type: OutputType) {
        let Some(group) = self.content.get_mut(id) else {
            return;
        };
        group.remove(output_type);
        if group.is_empty() {
            self.content.remove(id);
        }
    }

    fn poll_event(&mut self) -> Option<TransitionEvent> {
        self.events.pop_front()
    }
}
