// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The reconciliation driver.
//!
//! ## Pass protocol
//!
//! One mount pass is bracketed by two calls:
//!
//! 1) [`TransitionsEngine::before_mount`] with the next snapshot while the
//!    mount target still shows the previous one,
//! 2) the physical mount of the next snapshot, during which the target
//!    consults the engine through [`MountHooks`],
//! 3) [`TransitionsEngine::after_mount`].
//!
//! Between passes, [`TransitionsEngine::process_events`] drains the
//! completions queued by the [`TransitionManager`].

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::Rc;
use core::fmt;
use core::fmt::Debug;
use core::hash::Hash;

use crate::affinity::AffinityGroup;
use crate::collect::{LogicalTree, TransitionCollector};
use crate::config::EngineConfig;
use crate::disappearing::DisappearingTracker;
use crate::error::TransitionsError;
use crate::locks::{AnimationLocks, MountReferences};
use crate::manager::{TransitionEvent, TransitionManager};
use crate::mount::{DelegatedUnmount, MountHooks, MountTarget, UnmountedItem};
use crate::snapshot::RenderSnapshot;
use crate::thread::ThreadAffinity;
use crate::transition::{Transition, TransitionEndEvent, TransitionEndHandler};
use crate::types::{PropertyHandle, RenderUnitId, TransitionId, TreeId};

/// Whether anything is currently animating.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EngineState {
    /// No animating ids and no disappearing items.
    Idle,
    /// At least one id animates or disappears.
    Animating,
}

/// Cross-pass state, updated at pass boundaries.
#[derive(Debug, Default)]
struct Session {
    /// Snapshot of the pass in progress (or of the last pass).
    input: Option<Rc<RenderSnapshot>>,
    /// Snapshot of the last completed pass.
    last_applied: Option<Rc<RenderSnapshot>>,
    last_mounted_tree: Option<TreeId>,
    /// Transitions were set up in the pass in progress.
    animating_pass: bool,
}

/// Keeps animating and disappearing items mounted across mount passes.
///
/// `I` is the mount item handle of the [`MountTarget`], `M` the
/// [`TransitionManager`], created on first use from the factory.
pub struct TransitionsEngine<I, M> {
    factory: Box<dyn FnMut() -> M>,
    manager: Option<M>,
    session: Session,
    collector: TransitionCollector,
    tracker: DisappearingTracker<I>,
    locks: AnimationLocks,
    refs: MountReferences,
    animating: BTreeSet<TransitionId>,
    config: EngineConfig,
    affinity: ThreadAffinity,
}

impl<I: Copy + Eq + Hash + Debug, M> fmt::Debug for TransitionsEngine<I, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionsEngine")
            .field("has_manager", &self.manager.is_some())
            .field("session", &self.session)
            .field("animating", &self.animating)
            .field("disappearing", &self.tracker.groups().len())
            .field("locked_units", &self.locks.len())
            .field("references", &self.refs.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<I, M> TransitionsEngine<I, M>
where
    I: Copy + Eq + Hash + Debug,
    M: TransitionManager<I>,
{
    /// Create an engine bound to the current thread.
    pub fn new(factory: impl FnMut() -> M + 'static) -> Self {
        Self::with_config(EngineConfig::default(), factory)
    }

    /// Create an engine with `config`.
    pub fn with_config(config: EngineConfig, factory: impl FnMut() -> M + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            manager: None,
            session: Session::default(),
            collector: TransitionCollector::new(),
            tracker: DisappearingTracker::default(),
            locks: AnimationLocks::default(),
            refs: MountReferences::default(),
            animating: BTreeSet::new(),
            config,
            affinity: ThreadAffinity::current(),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Idle or animating.
    pub fn state(&self) -> EngineState {
        if self.animating.is_empty() && self.tracker.is_empty() {
            EngineState::Idle
        } else {
            EngineState::Animating
        }
    }

    /// The transition manager, once created.
    pub fn manager(&self) -> Option<&M> {
        self.manager.as_ref()
    }

    /// Mutable access to the transition manager, once created.
    pub fn manager_mut(&mut self) -> Option<&mut M> {
        self.manager.as_mut()
    }

    /// Ids with a running animation, in id order.
    pub fn animating_ids(&self) -> impl Iterator<Item = &TransitionId> + '_ {
        self.animating.iter()
    }

    /// Ids whose items are kept alive while they animate out, in id order.
    pub fn disappearing_ids(&self) -> impl Iterator<Item = &TransitionId> + '_ {
        self.tracker.groups().keys()
    }

    /// The disappearing group of `id`.
    pub fn disappearing_group(&self, id: &TransitionId) -> Option<&AffinityGroup<I>> {
        self.tracker.groups().get(id)
    }

    /// True if the generic unmount path must leave `item` to the engine.
    pub fn is_locked(&self, item: I) -> bool {
        self.tracker.is_locked(item)
    }

    /// Number of items locked by disappearing subtrees.
    pub fn locked_count(&self) -> usize {
        self.tracker.locked().len()
    }

    /// Number of animating ids that keep `unit` mounted.
    pub fn lock_count(&self, unit: RenderUnitId) -> u32 {
        self.locks.count(unit)
    }

    /// True if the engine holds a mount reference on `unit`.
    pub fn owns_reference(&self, unit: RenderUnitId) -> bool {
        self.refs.owns(unit)
    }

    /// Root transition of the pass in progress.
    pub fn root_transition(&self) -> Option<&Transition> {
        self.collector.root_transition()
    }

    /// Snapshot of the last completed pass.
    pub fn last_applied(&self) -> Option<&Rc<RenderSnapshot>> {
        self.session.last_applied.as_ref()
    }

    /// Prepare the pass that will mount `input`.
    ///
    /// `target` must still show the previous snapshot.
    pub fn before_mount<T, L>(
        &mut self,
        input: Rc<RenderSnapshot>,
        target: &mut T,
        tree: &mut L,
    ) -> Result<(), TransitionsError>
    where
        T: MountTarget<Item = I> + ?Sized,
        L: LogicalTree + ?Sized,
    {
        self.affinity.assert_current();
        let _span = tracing::debug_span!("before_mount", tag = self.config.tag()).entered();

        self.session.input = Some(Rc::clone(&input));
        self.session.animating_pass = false;

        if self.session.last_mounted_tree != Some(input.tree_id()) {
            tracing::debug!(tree = input.tree_id().0, "tree instance changed");
            self.session.last_applied = None;
            self.reset_animation_state(target)?;
            if !input.needs_to_rerun_transitions() {
                return Ok(());
            }
        }

        for (id, group) in self.tracker.take_reappeared(input.transition_id_mapping()) {
            tracing::debug!(%id, "disappearing id reappeared");
            if let Some(manager) = self.manager.as_mut() {
                manager.set_mount_content(&id, None);
            }
            self.tracker.finalize(&group, target)?;
        }

        let previous = self.session.last_applied.clone();
        if self.should_animate_transitions(&input) {
            self.collector.collect(&input, tree)?;
            if let Some(root) = self.collector.root_transition() {
                let factory = &mut self.factory;
                let manager = self.manager.get_or_insert_with(|| factory());
                manager.setup_transitions(
                    previous.as_deref().map(RenderSnapshot::transition_id_mapping),
                    input.transition_id_mapping(),
                    root,
                );
                for id in input.transition_id_mapping().keys() {
                    if manager.is_animating(id) {
                        self.animating.insert(id.clone());
                    }
                }
                self.session.animating_pass = true;
            }
        }

        if let Some(manager) = self.manager.as_mut() {
            manager.finish_undeclared_transitions();
        }

        self.reset_acquired_references(&input, target);

        if !self.session.animating_pass {
            return Ok(());
        }
        if let (Some(previous), Some(manager)) = (previous, self.manager.as_ref()) {
            self.tracker
                .extract(&previous, target, &mut self.refs, |id| manager.is_disappearing(id))?;
        }
        Ok(())
    }

    /// Finish the pass started by [`before_mount`](Self::before_mount), after
    /// the target mounted the new snapshot.
    pub fn after_mount<T>(&mut self, target: &mut T) -> Result<(), TransitionsError>
    where
        T: MountTarget<Item = I> + ?Sized,
    {
        self.affinity.assert_current();
        let _span = tracing::debug_span!("after_mount", tag = self.config.tag()).entered();
        let Some(input) = self.session.input.clone() else {
            return Ok(());
        };

        self.update_animating_mount_content(&input, target)?;
        if self.session.animating_pass {
            if let Some(manager) = self.manager.as_mut() {
                manager.run_transitions();
            }
        }

        input.set_needs_to_rerun_transitions(false);
        self.session.last_mounted_tree = Some(input.tree_id());
        self.session.last_applied = Some(input);
        self.session.animating_pass = false;
        self.collector.reset();
        Ok(())
    }

    /// Drain and dispatch every completion queued by the manager.
    ///
    /// Returns the number of events handled.
    pub fn process_events<T>(&mut self, target: &mut T) -> Result<usize, TransitionsError>
    where
        T: MountTarget<Item = I> + ?Sized,
    {
        self.affinity.assert_current();
        let mut handled = 0;
        while let Some(event) = self.manager.as_mut().and_then(|m| m.poll_event()) {
            match event {
                TransitionEvent::AnimationComplete(id) => self.on_animation_complete(target, &id)?,
                TransitionEvent::UnitComplete { handle, end_handler } => {
                    self.on_animation_unit_complete(&handle, end_handler.as_ref());
                }
            }
            handled += 1;
        }
        Ok(handled)
    }

    /// Every animation of `id` finished.
    ///
    /// A disappearing id has its items torn down; otherwise the id's locks
    /// are released against the last applied snapshot.
    pub fn on_animation_complete<T>(
        &mut self,
        target: &mut T,
        id: &TransitionId,
    ) -> Result<(), TransitionsError>
    where
        T: MountTarget<Item = I> + ?Sized,
    {
        self.affinity.assert_current();
        if let Some(group) = self.tracker.take(id) {
            tracing::debug!(%id, "disappearing animation complete");
            if let Some(manager) = self.manager.as_mut() {
                manager.set_mount_content(id, None);
            }
            self.tracker.finalize(&group, target)?;
            return Ok(());
        }

        if !self.animating.remove(id) {
            if self.config.debug_animations {
                tracing::warn!(
                    %id,
                    "ending animation for an id that was not recorded as animating"
                );
            }
            return Ok(());
        }
        let Some(last) = self.session.last_applied.clone() else {
            return Ok(());
        };
        let Some(group) = last.animatables_for(id) else {
            return Ok(());
        };
        for (_, item) in group.iter() {
            let Some(position) = last.position_of(item.id) else {
                return Ok(());
            };
            self.locks.set_lock(id, position, false, &last, target, &mut self.refs);
        }
        Ok(())
    }

    /// One property of one id finished; invoke the unit's end handler.
    pub fn on_animation_unit_complete(
        &self,
        handle: &PropertyHandle,
        handler: Option<&TransitionEndHandler>,
    ) {
        self.affinity.assert_current();
        if let Some(handler) = handler {
            handler.call(&TransitionEndEvent {
                key: handle.transition_id.reference().into(),
                property: handle.property,
            });
        }
    }

    /// The whole tree was unmounted: drop every reference the engine holds.
    pub fn on_unmount<T>(&mut self, target: &mut T)
    where
        T: MountTarget<Item = I> + ?Sized,
    {
        self.affinity.assert_current();
        self.refs.release_all(target);
        self.locks.clear();
    }

    /// The tree was unbound: drop every reference the engine holds.
    pub fn on_unbind<T>(&mut self, target: &mut T)
    where
        T: MountTarget<Item = I> + ?Sized,
    {
        self.affinity.assert_current();
        self.refs.release_all(target);
        self.locks.clear();
    }

    fn should_animate_transitions(&self, input: &RenderSnapshot) -> bool {
        self.session.last_mounted_tree == Some(input.tree_id())
            || input.needs_to_rerun_transitions()
    }

    fn reset_animation_state<T>(&mut self, target: &mut T) -> Result<(), TransitionsError>
    where
        T: MountTarget<Item = I> + ?Sized,
    {
        for (id, group) in self.tracker.take_all() {
            if let Some(manager) = self.manager.as_mut() {
                manager.set_mount_content(&id, None);
            }
            self.tracker.finalize(&group, target)?;
        }
        self.refs.release_all(target);
        self.locks.clear();
        self.animating.clear();
        if let Some(manager) = self.manager.as_mut() {
            manager.reset();
        }
        Ok(())
    }

    /// Release every bookkeeping reference, then lock the subtrees of the
    /// animating ids at their positions in `input`.
    fn reset_acquired_references<T>(&mut self, input: &RenderSnapshot, target: &mut T)
    where
        T: MountTarget<Item = I> + ?Sized,
    {
        self.refs.release_all(target);
        self.locks.clear();
        for id in &self.animating {
            let Some(group) = input.animatables_for(id) else {
                continue;
            };
            for (_, item) in group.iter() {
                if let Some(position) = input.position_of(item.id) {
                    self.locks.set_lock(id, position, true, input, target, &mut self.refs);
                }
            }
        }
    }

    fn update_animating_mount_content<T>(
        &mut self,
        input: &RenderSnapshot,
        target: &mut T,
    ) -> Result<(), TransitionsError>
    where
        T: MountTarget<Item = I> + ?Sized,
    {
        let Some(manager) = self.manager.as_mut() else {
            return Ok(());
        };
        let mut content: BTreeMap<TransitionId, AffinityGroup<I>> = BTreeMap::new();
        for index in 0..target.item_count().min(input.len()) {
            let Some(animatable) = input.node_at(index).and_then(|n| input.animatable(n.id)) else {
                continue;
            };
            let Some(id) = &animatable.transition_id else {
                continue;
            };
            content
                .entry(id.clone())
                .or_default()
                .replace(animatable.output_type, target.item_at(index))?;
        }
        for (id, group) in content {
            manager.set_mount_content(&id, Some(group));
        }
        for (id, group) in self.tracker.groups() {
            manager.set_mount_content(id, Some(group.clone()));
        }
        Ok(())
    }
}

impl<I, M> MountHooks<I> for TransitionsEngine<I, M>
where
    I: Copy + Eq + Hash + Debug,
    M: TransitionManager<I>,
{
    fn should_delegate_unmount(&self, item: I) -> bool {
        self.affinity.assert_current();
        self.tracker.is_locked(item)
    }

    fn unmount(&mut self, index: usize, item: I, _host: I) -> DelegatedUnmount {
        self.affinity.assert_current();
        let decision = self.tracker.delegated_unmount(item);
        tracing::debug!(index, ?item, ?decision, "delegated unmount");
        decision
    }

    fn on_unmount_item(&mut self, unmounted: &UnmountedItem<I>) {
        self.affinity.assert_current();
        if unmounted.is_host {
            for &child in &unmounted.disappearing_children {
                let Some(id) = self.tracker.forget(child) else {
                    continue;
                };
                if let Some(manager) = self.manager.as_mut() {
                    manager.set_mount_content(&id, None);
                }
            }
        }
        if let (Some(id), Some(manager)) = (&unmounted.transition_id, self.manager.as_mut()) {
            manager.remove_mount_content(id, unmounted.output_type);
        }
    }

    fn on_detach_item(&mut self, detached: &UnmountedItem<I>) {
        self.affinity.assert_current();
        let current_tree = self.session.input.as_ref().map(|i| i.tree_id());
        if current_tree == self.session.last_mounted_tree || !detached.is_host {
            return;
        }
        let Some(manager) = self.manager.as_mut() else {
            return;
        };
        for &child in &detached.disappearing_children {
            if let Some(id) = self.tracker.transition_id_of(child) {
                manager.set_mount_content(id, None);
            }
        }
    }
}
