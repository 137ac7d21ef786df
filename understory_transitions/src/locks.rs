// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mount references held by the engine, and animation lock accounting.
//!
//! Two separate counts keep animating items mounted:
//!
//! - [`MountReferences`] is the engine's ledger of references it holds on the
//!   [`MountTarget`]. A render unit is either held once or not at all.
//! - [`AnimationLocks`] records, per render unit, which animating transition
//!   ids depend on it (the id's own subtree plus its structural ancestors).
//!   The first holder takes a reference unless the engine already holds one;
//!   the last holder to leave drops only a reference the locks took
//!   themselves. An id that holds no lock on a unit cannot release it.

use alloc::collections::BTreeSet;

use hashbrown::{HashMap, HashSet};

use crate::mount::MountTarget;
use crate::snapshot::RenderSnapshot;
use crate::types::{RenderUnitId, TransitionId};

/// References the engine holds on mount target items, keyed by render unit.
#[derive(Clone, Debug, Default)]
pub(crate) struct MountReferences {
    held: HashMap<RenderUnitId, usize>,
}

impl MountReferences {
    pub(crate) fn owns(&self, unit: RenderUnitId) -> bool {
        self.held.contains_key(&unit)
    }

    pub(crate) fn len(&self) -> usize {
        self.held.len()
    }

    /// Take a reference on `unit` unless one is already held.
    pub(crate) fn acquire<M: MountTarget + ?Sized>(
        &mut self,
        target: &mut M,
        unit: RenderUnitId,
        index: usize,
        also_mount: bool,
    ) {
        if self.held.contains_key(&unit) {
            return;
        }
        target.acquire_reference(unit, index, also_mount);
        self.held.insert(unit, index);
    }

    /// Drop the reference on `unit` if one is held.
    pub(crate) fn release<M: MountTarget + ?Sized>(
        &mut self,
        target: &mut M,
        unit: RenderUnitId,
        also_unmount: bool,
    ) {
        if let Some(index) = self.held.remove(&unit) {
            target.release_reference(unit, index, also_unmount);
        }
    }

    /// Drop every held reference, leaving items mounted.
    pub(crate) fn release_all<M: MountTarget + ?Sized>(&mut self, target: &mut M) {
        for (unit, index) in self.held.drain() {
            target.release_reference(unit, index, false);
        }
    }
}

/// Per render unit set of the animating transition ids that depend on it.
#[derive(Clone, Debug, Default)]
pub(crate) struct AnimationLocks {
    holders: HashMap<RenderUnitId, BTreeSet<TransitionId>>,
    acquired: HashSet<RenderUnitId>,
}

impl AnimationLocks {
    /// Number of ids holding a lock on `unit`.
    pub(crate) fn count(&self, unit: RenderUnitId) -> u32 {
        self.holders
            .get(&unit)
            .map_or(0, |ids| u32::try_from(ids.len()).unwrap_or(u32::MAX))
    }

    /// Number of locked render units.
    pub(crate) fn len(&self) -> usize {
        self.holders.len()
    }

    /// Forget every lock. References must be released through the ledger.
    pub(crate) fn clear(&mut self) {
        self.holders.clear();
        self.acquired.clear();
    }

    /// Lock or unlock, on behalf of `id`, the subtree at `index` of
    /// `snapshot` and its structural ancestors, stopping short of the
    /// absolute root.
    ///
    /// Locking twice for the same id is idempotent, and unlocking only drops
    /// locks `id` holds.
    pub(crate) fn set_lock<M: MountTarget + ?Sized>(
        &mut self,
        id: &TransitionId,
        index: usize,
        increment: bool,
        snapshot: &RenderSnapshot,
        target: &mut M,
        refs: &mut MountReferences,
    ) {
        let last = snapshot.find_last_descendant_index(index);
        for i in (index..=last).chain(snapshot.ancestors(index)) {
            let Some(node) = snapshot.node_at(i) else {
                continue;
            };
            if increment {
                self.lock(id, node.id, i, target, refs);
            } else {
                self.unlock(id, node.id, target, refs);
            }
        }
        tracing::debug!(
            %id,
            index,
            last,
            increment,
            locked = self.holders.len(),
            "animation lock updated"
        );
    }

    fn lock<M: MountTarget + ?Sized>(
        &mut self,
        id: &TransitionId,
        unit: RenderUnitId,
        index: usize,
        target: &mut M,
        refs: &mut MountReferences,
    ) {
        let ids = self.holders.entry(unit).or_default();
        if !ids.insert(id.clone()) || ids.len() > 1 {
            return;
        }
        if !refs.owns(unit) {
            refs.acquire(target, unit, index, false);
            self.acquired.insert(unit);
        }
    }

    fn unlock<M: MountTarget + ?Sized>(
        &mut self,
        id: &TransitionId,
        unit: RenderUnitId,
        target: &mut M,
        refs: &mut MountReferences,
    ) {
        let Some(ids) = self.holders.get_mut(&unit) else {
            return;
        };
        if !ids.remove(id) || !ids.is_empty() {
            return;
        }
        self.holders.remove(&unit);
        if self.acquired.remove(&unit) {
            refs.release(target, unit, false);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::mount::UnmountedItem;
    use crate::snapshot::tests::node;
    use crate::types::{ContentKind, TreeId};
    use alloc::vec::Vec;
    use kurbo::Rect;

    /// A mount target that only counts references.
    #[derive(Default)]
    pub(crate) struct CountingTarget {
        pub(crate) refs: HashMap<RenderUnitId, i32>,
        pub(crate) mounts: Vec<RenderUnitId>,
    }

    impl MountTarget for CountingTarget {
        type Item = u32;

        fn item_count(&self) -> usize {
            0
        }
        fn item_at(&self, _: usize) -> Option<u32> {
            None
        }
        fn render_unit_of(&self, _: u32) -> Option<RenderUnitId> {
            None
        }
        fn root_item(&self) -> Option<u32> {
            None
        }
        fn acquire_reference(&mut self, unit: RenderUnitId, _: usize, also_mount: bool) {
            *self.refs.entry(unit).or_insert(0) += 1;
            if also_mount {
                self.mounts.push(unit);
            }
        }
        fn release_reference(&mut self, unit: RenderUnitId, _: usize, _: bool) {
            *self.refs.entry(unit).or_insert(0) -= 1;
        }
        fn notify_logically_unmounted(&mut self, _: usize) {}
        fn host_of(&self, _: u32) -> Option<u32> {
            None
        }
        fn is_host(&self, _: u32) -> bool {
            false
        }
        fn child_count(&self, _: u32) -> usize {
            0
        }
        fn child_at(&self, _: u32, _: usize) -> Option<u32> {
            None
        }
        fn bounds_of(&self, _: u32) -> Rect {
            Rect::ZERO
        }
        fn move_to_host(&mut self, _: u32, _: u32, _: usize, _: Rect) {}
        fn unmount_from_host(&mut self, _: u32, _: u32) {}
        fn unmount_disappearing(&mut self, _: u32, _: u32) {}
        fn unbind(&mut self, _: u32) -> Option<UnmountedItem<u32>> {
            None
        }
    }

    // root
    // └── 1 host
    //     ├── 2 host
    //     │   └── 3 view
    //     └── 4 view
    fn nested() -> RenderSnapshot {
        let mut b = RenderSnapshot::builder(TreeId(1), "Nested");
        let root = b.root(node(0, ContentKind::Host));
        let h1 = b.child(root, node(1, ContentKind::Host));
        let h2 = b.child(h1, node(2, ContentKind::Host));
        b.child(h2, node(3, ContentKind::View));
        b.child(h1, node(4, ContentKind::View));
        b.build().unwrap()
    }

    fn id(reference: &str) -> TransitionId {
        TransitionId::global(reference)
    }

    fn held(target: &CountingTarget) -> Vec<(u64, i32)> {
        let mut v: Vec<_> = target
            .refs
            .iter()
            .filter(|(_, n)| **n != 0)
            .map(|(u, n)| (u.0, *n))
            .collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn lock_covers_subtree_and_ancestors_but_not_root() {
        let s = nested();
        let mut target = CountingTarget::default();
        let mut refs = MountReferences::default();
        let mut locks = AnimationLocks::default();
        locks.set_lock(&id("card"), 2, true, &s, &mut target, &mut refs);
        assert_eq!(held(&target), [(1, 1), (2, 1), (3, 1)]);
        assert_eq!(locks.count(RenderUnitId(0)), 0, "the absolute root is never locked");
        assert_eq!(locks.count(RenderUnitId(4)), 0, "siblings are not locked");
        assert!(target.mounts.is_empty(), "locking never mounts");
    }

    #[test]
    fn lock_then_unlock_restores_counts() {
        let s = nested();
        let mut target = CountingTarget::default();
        let mut refs = MountReferences::default();
        let mut locks = AnimationLocks::default();
        locks.set_lock(&id("card"), 1, true, &s, &mut target, &mut refs);
        locks.set_lock(&id("card"), 1, false, &s, &mut target, &mut refs);
        assert!(held(&target).is_empty());
        assert_eq!(locks.len(), 0);
        assert_eq!(refs.len(), 0);
    }

    #[test]
    fn shared_ancestor_stays_locked_while_any_dependent_animates() {
        let s = nested();
        let mut target = CountingTarget::default();
        let mut refs = MountReferences::default();
        let mut locks = AnimationLocks::default();
        locks.set_lock(&id("label"), 3, true, &s, &mut target, &mut refs);
        locks.set_lock(&id("badge"), 4, true, &s, &mut target, &mut refs);
        assert_eq!(locks.count(RenderUnitId(1)), 2);
        assert_eq!(held(&target), [(1, 1), (2, 1), (3, 1), (4, 1)], "acquired once each");

        locks.set_lock(&id("label"), 3, false, &s, &mut target, &mut refs);
        assert_eq!(held(&target), [(1, 1), (4, 1)]);
        locks.set_lock(&id("badge"), 4, false, &s, &mut target, &mut refs);
        assert!(held(&target).is_empty());
    }

    #[test]
    fn references_held_elsewhere_are_not_released_by_unlock() {
        let s = nested();
        let mut target = CountingTarget::default();
        let mut refs = MountReferences::default();
        refs.acquire(&mut target, RenderUnitId(3), 3, false);
        let mut locks = AnimationLocks::default();
        locks.set_lock(&id("label"), 3, true, &s, &mut target, &mut refs);
        locks.set_lock(&id("label"), 3, false, &s, &mut target, &mut refs);
        assert_eq!(held(&target), [(3, 1)]);
        assert!(refs.owns(RenderUnitId(3)));

        refs.release_all(&mut target);
        assert!(held(&target).is_empty());
    }

    #[test]
    fn unlock_without_lock_is_a_no_op() {
        let s = nested();
        let mut target = CountingTarget::default();
        let mut refs = MountReferences::default();
        let mut locks = AnimationLocks::default();
        locks.set_lock(&id("card"), 2, false, &s, &mut target, &mut refs);
        assert!(target.refs.is_empty());
    }

    #[test]
    fn unlock_by_another_id_keeps_the_holder_locked() {
        let s = nested();
        let mut target = CountingTarget::default();
        let mut refs = MountReferences::default();
        let mut locks = AnimationLocks::default();
        locks.set_lock(&id("card"), 1, true, &s, &mut target, &mut refs);

        // "label" sits inside the card's subtree but never locked anything.
        locks.set_lock(&id("label"), 3, false, &s, &mut target, &mut refs);
        assert_eq!(held(&target), [(1, 1), (2, 1), (3, 1), (4, 1)]);
        assert_eq!(locks.count(RenderUnitId(3)), 1);
        assert!(refs.owns(RenderUnitId(1)));
    }

    #[test]
    fn repeated_lock_for_one_id_is_counted_once() {
        let s = nested();
        let mut target = CountingTarget::default();
        let mut refs = MountReferences::default();
        let mut locks = AnimationLocks::default();
        locks.set_lock(&id("card"), 2, true, &s, &mut target, &mut refs);
        locks.set_lock(&id("card"), 2, true, &s, &mut target, &mut refs);
        assert_eq!(locks.count(RenderUnitId(2)), 1);
        locks.set_lock(&id("card"), 2, false, &s, &mut target, &mut refs);
        assert!(held(&target).is_empty(), "one unlock releases everything");
        locks.set_lock(&id("card"), 2, false, &s, &mut target, &mut refs);
        assert!(held(&target).is_empty());
    }
}
