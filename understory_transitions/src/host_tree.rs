// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A reference mount target: hosts, ordered children and disappearing lists
//! over a generational arena.

use alloc::rc::Rc;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use kurbo::Rect;

use crate::mount::{DelegatedUnmount, MountHooks, MountTarget, NoHooks, UnmountedItem};
use crate::snapshot::RenderSnapshot;
use crate::types::{ContentKind, MountItemId, OutputType, RenderUnitId, TransitionId};

/// One change applied to a [`HostTree`], as recorded in its journal.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MountOp {
    /// An item was mounted for the unit.
    Mount(RenderUnitId),
    /// The unit's item was removed from its host.
    Unmount(RenderUnitId),
    /// The unit's item moved to its host's disappearing list.
    StartDisappearing(RenderUnitId),
    /// The unit's item was reparented.
    MoveToHost {
        /// The moved unit.
        unit: RenderUnitId,
        /// The unit of the new host.
        host: RenderUnitId,
    },
    /// The unit's item was removed from its host's disappearing list.
    UnmountDisappearing(RenderUnitId),
    /// The mount index was reported logically unmounted.
    LogicallyUnmounted(usize),
    /// The unit's item was released and its slot freed.
    Unbind(RenderUnitId),
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    render_unit: RenderUnitId,
    output_type: OutputType,
    transition_id: Option<TransitionId>,
    kind: ContentKind,
    /// Relative to the host.
    bounds: Rect,
    host: Option<MountItemId>,
    /// Mount index in the snapshot the item was last placed by.
    index: usize,
    children: Vec<MountItemId>,
    disappearing: Vec<MountItemId>,
}

/// A tree of mounted items driven by [`RenderSnapshot`]s.
///
/// Each [`mount`](Self::mount) pass reconciles the tree against a new
/// snapshot: items whose unit left the snapshot are unmounted (or handed to
/// [`MountHooks::unmount`] when the hooks ask to delegate), then every node
/// that is visible in the viewport, referenced, or has such a descendant is
/// mounted. Without a viewport every node is visible.
///
/// Item handles are generational: once an item is unbound its handle is stale
/// and never aliases a later item.
pub struct HostTree {
    slots: Vec<Option<Slot>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    positions: Vec<Option<MountItemId>>,
    by_unit: HashMap<RenderUnitId, MountItemId>,
    references: HashMap<RenderUnitId, u32>,
    logically_unmounted: HashSet<usize>,
    snapshot: Option<Rc<RenderSnapshot>>,
    viewport: Option<Rect>,
    journal: Vec<MountOp>,
}

impl Default for HostTree {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for HostTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HostTree")
            .field("items_alive", &self.alive_count())
            .field("positions", &self.positions.len())
            .field("free_list", &self.free_list.len())
            .field("references", &self.references.len())
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

impl HostTree {
    /// Create an empty tree with no viewport.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            positions: Vec::new(),
            by_unit: HashMap::new(),
            references: HashMap::new(),
            logically_unmounted: HashSet::new(),
            snapshot: None,
            viewport: None,
            journal: Vec::new(),
        }
    }

    /// Restrict incremental mount to nodes intersecting `viewport` (root coordinates).
    pub fn set_viewport(&mut self, viewport: Option<Rect>) {
        self.viewport = viewport;
    }

    /// The snapshot of the last mount pass.
    pub fn snapshot(&self) -> Option<&Rc<RenderSnapshot>> {
        self.snapshot.as_ref()
    }

    /// Returns `true` if `item` refers to a live item.
    pub fn is_alive(&self, item: MountItemId) -> bool {
        self.slots
            .get(item.idx())
            .and_then(|s| s.as_ref())
            .is_some_and(|s| s.generation == item.1)
    }

    /// Number of live items, disappearing ones included.
    pub fn alive_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// The item currently mounted for `unit`.
    pub fn item_for_unit(&self, unit: RenderUnitId) -> Option<MountItemId> {
        self.by_unit.get(&unit).copied()
    }

    /// Items mounted in `host`, in mount order.
    pub fn children(&self, host: MountItemId) -> &[MountItemId] {
        self.slot_opt(host)
            .map(|s| s.children.as_slice())
            .unwrap_or_default()
    }

    /// Disappearing items of `host`, in the order they started disappearing.
    pub fn disappearing(&self, host: MountItemId) -> &[MountItemId] {
        self.slot_opt(host)
            .map(|s| s.disappearing.as_slice())
            .unwrap_or_default()
    }

    /// Mount references currently held on `unit`.
    pub fn reference_count(&self, unit: RenderUnitId) -> u32 {
        self.references.get(&unit).copied().unwrap_or(0)
    }

    /// True if `index` was reported logically unmounted since the last pass.
    pub fn is_logically_unmounted(&self, index: usize) -> bool {
        self.logically_unmounted.contains(&index)
    }

    /// Every change since the journal was last taken.
    pub fn journal(&self) -> &[MountOp] {
        &self.journal
    }

    /// Take and clear the journal.
    pub fn take_journal(&mut self) -> Vec<MountOp> {
        core::mem::take(&mut self.journal)
    }

    /// Reconcile the tree against `snapshot`.
    pub fn mount<H: MountHooks<MountItemId> + ?Sized>(
        &mut self,
        snapshot: Rc<RenderSnapshot>,
        hooks: &mut H,
    ) {
        // Items whose unit left the snapshot, last index first.
        for index in (0..self.positions.len()).rev() {
            let Some(item) = self.positions[index] else {
                continue;
            };
            if !self.is_alive(item) {
                continue;
            }
            let unit = self.slot(item).render_unit;
            if snapshot.position_of(unit).is_some() {
                continue;
            }
            self.positions[index] = None;
            self.unmount_index(index, item, hooks);
        }

        // Re-index the items that stay.
        let len = snapshot.len();
        self.positions.clear();
        self.positions.resize(len, None);
        self.logically_unmounted.clear();
        for (index, node) in snapshot.nodes().iter().enumerate() {
            let Some(&item) = self.by_unit.get(&node.id) else {
                continue;
            };
            if !self.is_alive(item) {
                self.by_unit.remove(&node.id);
                continue;
            }
            self.positions[index] = Some(item);
            let bounds = relative_bounds(&snapshot, index);
            let slot = self.slot_mut(item);
            slot.index = index;
            slot.bounds = bounds;
            slot.output_type = node.output_type;
            slot.transition_id.clone_from(&node.transition_id);
        }
        self.snapshot = Some(Rc::clone(&snapshot));

        // A node is needed if it is visible, referenced, or has a needed descendant.
        let mut needed: Vec<bool> = snapshot
            .nodes()
            .iter()
            .map(|n| {
                self.viewport.is_none_or(|v| v.overlaps(n.bounds))
                    || self.reference_count(n.id) > 0
            })
            .collect();
        for index in (1..len).rev() {
            if needed[index] {
                if let Some(parent) = snapshot.nodes()[index].parent {
                    needed[parent] = true;
                }
            }
        }
        if let Some(root) = needed.first_mut() {
            *root = true;
        }

        for index in 0..len {
            if !needed[index] {
                continue;
            }
            match self.positions[index] {
                Some(item) => self.rehost(&snapshot, index, item),
                None => {
                    self.mount_index(index);
                }
            }
        }
        for index in (0..len).rev() {
            if needed[index] {
                continue;
            }
            if let Some(item) = self.positions[index].take() {
                if hooks.should_delegate_unmount(item) {
                    self.positions[index] = Some(item);
                    continue;
                }
                self.unmount_item(item, hooks);
            }
        }
        self.sort_children();
    }

    /// Report every mounted item to [`MountHooks::on_detach_item`], in mount order.
    pub fn detach<H: MountHooks<MountItemId> + ?Sized>(&self, hooks: &mut H) {
        for item in self.positions.iter().flatten() {
            if let Some(detached) = self.describe(*item) {
                hooks.on_detach_item(&detached);
            }
        }
    }

    fn unmount_index<H: MountHooks<MountItemId> + ?Sized>(
        &mut self,
        index: usize,
        item: MountItemId,
        hooks: &mut H,
    ) {
        let unit = self.slot(item).render_unit;
        if self.by_unit.get(&unit) == Some(&item) {
            self.by_unit.remove(&unit);
        }
        if !hooks.should_delegate_unmount(item) {
            self.unmount_item(item, hooks);
            return;
        }
        let Some(host) = self.slot(item).host else {
            return;
        };
        if hooks.unmount(index, item, host) == DelegatedUnmount::StartDisappearing {
            let h = self.slot_mut(host);
            h.children.retain(|c| *c != item);
            h.disappearing.push(item);
            self.journal.push(MountOp::StartDisappearing(unit));
        }
    }

    /// Generic unmount: hosted items first, last mounted first.
    fn unmount_item<H: MountHooks<MountItemId> + ?Sized>(
        &mut self,
        item: MountItemId,
        hooks: &mut H,
    ) {
        if !self.is_alive(item) {
            return;
        }
        let children = self.slot(item).children.clone();
        for child in children.into_iter().rev() {
            self.unmount_item(child, hooks);
        }
        if let Some(host) = self.slot(item).host {
            self.unmount_from_host(host, item);
        }
        if let Some(unmounted) = self.unbind(item) {
            hooks.on_unmount_item(&unmounted);
            for child in unmounted.disappearing_children {
                self.free_subtree(child);
            }
        }
    }

    fn free_subtree(&mut self, item: MountItemId) {
        if !self.is_alive(item) {
            return;
        }
        let slot = self.slot(item);
        let hosted: Vec<MountItemId> =
            slot.children.iter().chain(&slot.disappearing).copied().collect();
        for child in hosted {
            self.free_subtree(child);
        }
        self.unbind(item);
    }

    fn mount_index(&mut self, index: usize) -> Option<MountItemId> {
        if let Some(item) = self.positions.get(index).copied().flatten() {
            return Some(item);
        }
        let snapshot = Rc::clone(self.snapshot.as_ref()?);
        let node = snapshot.node_at(index)?;
        let host = match node.parent {
            Some(parent) => Some(self.mount_index(parent)?),
            None => None,
        };
        let item = self.alloc(Slot {
            generation: 0,
            render_unit: node.id,
            output_type: node.output_type,
            transition_id: node.transition_id.clone(),
            kind: node.kind,
            bounds: relative_bounds(&snapshot, index),
            host,
            index,
            children: Vec::new(),
            disappearing: Vec::new(),
        });
        if let Some(host) = host {
            self.insert_child(host, item, index);
        }
        self.positions[index] = Some(item);
        self.by_unit.insert(node.id, item);
        self.journal.push(MountOp::Mount(node.id));
        Some(item)
    }

    /// Move a kept item under the item mounted for its current parent node.
    fn rehost(&mut self, snapshot: &RenderSnapshot, index: usize, item: MountItemId) {
        let Some(parent) = snapshot.nodes()[index].parent else {
            return;
        };
        let Some(host) = self.mount_index(parent) else {
            return;
        };
        if self.slot(item).host == Some(host) {
            return;
        }
        if let Some(old) = self.slot(item).host {
            self.slot_mut(old).children.retain(|c| *c != item);
        }
        self.slot_mut(item).host = Some(host);
        self.insert_child(host, item, index);
        let unit = self.slot(item).render_unit;
        let host_unit = self.slot(host).render_unit;
        self.journal.push(MountOp::MoveToHost { unit, host: host_unit });
    }

    fn insert_child(&mut self, host: MountItemId, item: MountItemId, index: usize) {
        let at = self
            .slot(host)
            .children
            .partition_point(|c| self.slot(*c).index < index);
        self.slot_mut(host).children.insert(at, item);
    }

    fn sort_children(&mut self) {
        for i in 0..self.slots.len() {
            let Some(mut children) = self.slots[i]
                .as_mut()
                .map(|s| core::mem::take(&mut s.children))
            else {
                continue;
            };
            children.sort_by_key(|c| self.slot_opt(*c).map_or(usize::MAX, |s| s.index));
            if let Some(slot) = self.slots[i].as_mut() {
                slot.children = children;
            }
        }
    }

    fn describe(&self, item: MountItemId) -> Option<UnmountedItem<MountItemId>> {
        let slot = self.slot_opt(item)?;
        Some(UnmountedItem {
            item,
            render_unit: slot.render_unit,
            output_type: slot.output_type,
            transition_id: slot.transition_id.clone(),
            is_host: slot.kind == ContentKind::Host,
            disappearing_children: slot.disappearing.clone(),
        })
    }

    fn alloc(&mut self, mut slot: Slot) -> MountItemId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            slot.generation = generation;
            self.slots[idx] = Some(slot);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "MountItemId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            slot.generation = generation;
            self.slots.push(Some(slot));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "MountItemId uses 32-bit indices by design."
            )]
            ((self.slots.len() - 1) as u32, generation)
        };
        MountItemId::new(idx, generation)
    }

    fn slot_opt(&self, item: MountItemId) -> Option<&Slot> {
        self.slots
            .get(item.idx())
            .and_then(|s| s.as_ref())
            .filter(|s| s.generation == item.1)
    }

    fn slot(&self, item: MountItemId) -> &Slot {
        self.slot_opt(item).expect("dangling MountItemId")
    }

    fn slot_mut(&mut self, item: MountItemId) -> &mut Slot {
        self.slots[item.idx()]
            .as_mut()
            .filter(|s| s.generation == item.1)
            .expect("dangling MountItemId")
    }
}

impl MountTarget for HostTree {
    type Item = MountItemId;

    fn item_count(&self) -> usize {
        self.positions.len()
    }

    fn item_at(&self, index: usize) -> Option<MountItemId> {
        self.positions
            .get(index)
            .copied()
            .flatten()
            .filter(|item| self.is_alive(*item))
    }

    fn render_unit_of(&self, item: MountItemId) -> Option<RenderUnitId> {
        self.slot_opt(item).map(|s| s.render_unit)
    }

    fn root_item(&self) -> Option<MountItemId> {
        self.item_at(0)
    }

    fn acquire_reference(&mut self, unit: RenderUnitId, index: usize, also_mount: bool) {
        *self.references.entry(unit).or_insert(0) += 1;
        if also_mount && !self.by_unit.contains_key(&unit) {
            self.mount_index(index);
        }
    }

    fn release_reference(&mut self, unit: RenderUnitId, index: usize, also_unmount: bool) {
        let Some(count) = self.references.get_mut(&unit) else {
            return;
        };
        *count -= 1;
        if *count > 0 {
            return;
        }
        self.references.remove(&unit);
        if !also_unmount {
            return;
        }
        let visible = match (self.viewport, self.snapshot.as_ref().and_then(|s| s.node_at(index))) {
            (Some(v), Some(node)) => v.overlaps(node.bounds),
            _ => true,
        };
        if visible {
            return;
        }
        if let Some(item) = self.item_at(index) {
            self.positions[index] = None;
            self.unmount_item(item, &mut NoHooks);
        }
    }

    fn notify_logically_unmounted(&mut self, index: usize) {
        self.logically_unmounted.insert(index);
        self.journal.push(MountOp::LogicallyUnmounted(index));
    }

    fn host_of(&self, item: MountItemId) -> Option<MountItemId> {
        self.slot_opt(item).and_then(|s| s.host)
    }

    fn is_host(&self, item: MountItemId) -> bool {
        self.slot_opt(item).is_some_and(|s| s.kind == ContentKind::Host)
    }

    fn child_count(&self, host: MountItemId) -> usize {
        self.children(host).len()
    }

    fn child_at(&self, host: MountItemId, index: usize) -> Option<MountItemId> {
        self.children(host).get(index).copied()
    }

    fn bounds_of(&self, item: MountItemId) -> Rect {
        self.slot_opt(item).map_or(Rect::ZERO, |s| s.bounds)
    }

    fn move_to_host(&mut self, item: MountItemId, host: MountItemId, index: usize, bounds: Rect) {
        if !self.is_alive(item) || !self.is_alive(host) {
            return;
        }
        if let Some(old) = self.slot(item).host {
            let old = self.slot_mut(old);
            old.children.retain(|c| *c != item);
            old.disappearing.retain(|c| *c != item);
        }
        let slot = self.slot_mut(item);
        slot.host = Some(host);
        slot.bounds = bounds;
        let unit = slot.render_unit;
        let h = self.slot_mut(host);
        let at = index.min(h.children.len());
        h.children.insert(at, item);
        let host_unit = h.render_unit;
        self.journal.push(MountOp::MoveToHost { unit, host: host_unit });
    }

    fn unmount_from_host(&mut self, host: MountItemId, item: MountItemId) {
        if !self.is_alive(item) {
            return;
        }
        if self.is_alive(host) {
            self.slot_mut(host).children.retain(|c| *c != item);
        }
        let slot = self.slot_mut(item);
        slot.host = None;
        let unit = slot.render_unit;
        self.journal.push(MountOp::Unmount(unit));
    }

    fn unmount_disappearing(&mut self, host: MountItemId, item: MountItemId) {
        if !self.is_alive(item) {
            return;
        }
        if self.is_alive(host) {
            let h = self.slot_mut(host);
            h.disappearing.retain(|c| *c != item);
            h.children.retain(|c| *c != item);
        }
        let slot = self.slot_mut(item);
        slot.host = None;
        let unit = slot.render_unit;
        self.journal.push(MountOp::UnmountDisappearing(unit));
    }

    fn unbind(&mut self, item: MountItemId) -> Option<UnmountedItem<MountItemId>> {
        let unmounted = self.describe(item)?;
        let slot = self.slots[item.idx()].take()?;
        let host = slot
            .host
            .and_then(|h| self.slots[h.idx()].as_mut().filter(|s| s.generation == h.1));
        if let Some(host) = host {
            host.children.retain(|c| *c != item);
            host.disappearing.retain(|c| *c != item);
        }
        if self.positions.get(slot.index) == Some(&Some(item)) {
            self.positions[slot.index] = None;
        }
        if self.by_unit.get(&slot.render_unit) == Some(&item) {
            self.by_unit.remove(&slot.render_unit);
        }
        for orphan in slot.children.iter().chain(&slot.disappearing) {
            let live = self.slots[orphan.idx()]
                .as_mut()
                .filter(|s| s.generation == orphan.1);
            if let Some(s) = live {
                s.host = None;
            }
        }
        self.free_list.push(item.idx());
        self.journal.push(MountOp::Unbind(slot.render_unit));
        Some(unmounted)
    }
}

/// Bounds of node `index` relative to its parent node.
fn relative_bounds(snapshot: &RenderSnapshot, index: usize) -> Rect {
    let node = &snapshot.nodes()[index];
    match node.parent.and_then(|p| snapshot.node_at(p)) {
        Some(parent) => node.bounds - parent.bounds.origin().to_vec2(),
        None => node.bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::node;
    use crate::types::TreeId;

    // root
    // ├── 1 host
    // │   ├── 2 view
    // │   └── 3 view
    // └── 4 view
    fn sample(tree_id: u32) -> Rc<RenderSnapshot> {
        let mut b = RenderSnapshot::builder(TreeId(tree_id), "Sample");
        let root = b.root(node(0, ContentKind::Host));
        let h1 = b.child(root, node(1, ContentKind::Host));
        b.child(h1, node(2, ContentKind::View));
        b.child(h1, node(3, ContentKind::View));
        b.child(root, node(4, ContentKind::View));
        Rc::new(b.build().unwrap())
    }

    fn units(tree: &HostTree, items: &[MountItemId]) -> Vec<u64> {
        items
            .iter()
            .map(|i| tree.render_unit_of(*i).unwrap().0)
            .collect()
    }

    #[test]
    fn mounts_hosts_before_children() {
        let mut tree = HostTree::new();
        tree.mount(sample(1), &mut NoHooks);
        assert_eq!(tree.alive_count(), 5);
        let root = tree.root_item().unwrap();
        assert_eq!(units(&tree, tree.children(root)), [1, 4]);
        let h1 = tree.item_at(1).unwrap();
        assert_eq!(units(&tree, tree.children(h1)), [2, 3]);
        assert_eq!(tree.host_of(tree.item_at(3).unwrap()), Some(h1));
        assert_eq!(tree.bounds_of(tree.item_at(2).unwrap()), Rect::new(0.0, 10.0, 100.0, 20.0));
    }

    #[test]
    fn removed_units_unmount_last_index_first() {
        let mut tree = HostTree::new();
        tree.mount(sample(1), &mut NoHooks);
        tree.take_journal();

        let mut b = RenderSnapshot::builder(TreeId(1), "Sample");
        let root = b.root(node(0, ContentKind::Host));
        b.child(root, node(4, ContentKind::View));
        tree.mount(Rc::new(b.build().unwrap()), &mut NoHooks);

        assert_eq!(
            tree.journal(),
            [
                MountOp::Unmount(RenderUnitId(3)),
                MountOp::Unbind(RenderUnitId(3)),
                MountOp::Unmount(RenderUnitId(2)),
                MountOp::Unbind(RenderUnitId(2)),
                MountOp::Unmount(RenderUnitId(1)),
                MountOp::Unbind(RenderUnitId(1)),
            ]
        );
        assert_eq!(tree.alive_count(), 2);
        assert_eq!(tree.item_for_unit(RenderUnitId(4)), tree.item_at(1));
    }

    #[test]
    fn viewport_limits_mounting_and_references_override_it() {
        let mut tree = HostTree::new();
        // Node 4 sits at y = 40..50.
        tree.set_viewport(Some(Rect::new(0.0, 0.0, 100.0, 35.0)));
        tree.mount(sample(1), &mut NoHooks);
        assert!(tree.item_for_unit(RenderUnitId(4)).is_none());

        tree.acquire_reference(RenderUnitId(4), 4, true);
        assert!(tree.item_for_unit(RenderUnitId(4)).is_some(), "mounted on acquire");
        tree.mount(sample(1), &mut NoHooks);
        assert!(tree.item_for_unit(RenderUnitId(4)).is_some(), "kept while referenced");

        tree.release_reference(RenderUnitId(4), 4, true);
        assert!(tree.item_for_unit(RenderUnitId(4)).is_none(), "unmounted on last release");
    }

    #[test]
    fn stale_handles_never_alias() {
        let mut tree = HostTree::new();
        tree.mount(sample(1), &mut NoHooks);
        let old = tree.item_for_unit(RenderUnitId(4)).unwrap();
        let mut b = RenderSnapshot::builder(TreeId(1), "Sample");
        b.root(node(0, ContentKind::Host));
        tree.mount(Rc::new(b.build().unwrap()), &mut NoHooks);
        assert!(!tree.is_alive(old));
        tree.mount(sample(1), &mut NoHooks);
        let new = tree.item_for_unit(RenderUnitId(4)).unwrap();
        assert!(tree.is_alive(new));
        assert!(!tree.is_alive(old));
        if old.0 == new.0 {
            assert!(new.1 > old.1, "generation must increase on reuse");
        }
    }

    struct Delegating {
        locked: HashSet<MountItemId>,
        unmounted: Vec<RenderUnitId>,
        detached: usize,
    }

    impl MountHooks<MountItemId> for Delegating {
        fn should_delegate_unmount(&self, item: MountItemId) -> bool {
            self.locked.contains(&item)
        }

        fn unmount(&mut self, _: usize, _: MountItemId, _: MountItemId) -> DelegatedUnmount {
            DelegatedUnmount::StartDisappearing
        }

        fn on_unmount_item(&mut self, unmounted: &UnmountedItem<MountItemId>) {
            self.unmounted.push(unmounted.render_unit);
        }

        fn on_detach_item(&mut self, _: &UnmountedItem<MountItemId>) {
            self.detached += 1;
        }
    }

    #[test]
    fn delegated_items_start_disappearing() {
        let mut tree = HostTree::new();
        tree.mount(sample(1), &mut NoHooks);
        let leaf = tree.item_for_unit(RenderUnitId(4)).unwrap();
        let root = tree.root_item().unwrap();
        let mut hooks = Delegating {
            locked: [leaf].into_iter().collect(),
            unmounted: Vec::new(),
            detached: 0,
        };
        let mut b = RenderSnapshot::builder(TreeId(1), "Sample");
        b.root(node(0, ContentKind::Host));
        tree.mount(Rc::new(b.build().unwrap()), &mut hooks);

        assert!(tree.is_alive(leaf));
        assert_eq!(tree.disappearing(root), [leaf]);
        assert_eq!(tree.child_count(root), 0, "disappearing items are not children");
        assert_eq!(hooks.unmounted, [RenderUnitId(3), RenderUnitId(2), RenderUnitId(1)]);

        tree.detach(&mut hooks);
        assert_eq!(hooks.detached, 1, "only the root is still mounted");
    }

    #[test]
    fn move_to_host_reparents_with_new_bounds() {
        let mut tree = HostTree::new();
        tree.mount(sample(1), &mut NoHooks);
        let root = tree.root_item().unwrap();
        let leaf = tree.item_at(3).unwrap();
        let moved = Rect::new(5.0, 5.0, 10.0, 10.0);
        tree.move_to_host(leaf, root, tree.child_count(root), moved);
        assert_eq!(tree.host_of(leaf), Some(root));
        assert_eq!(units(&tree, tree.children(root)), [1, 4, 3]);
        assert_eq!(tree.bounds_of(leaf), moved);
        assert_eq!(tree.child_count(tree.item_at(1).unwrap()), 1);
    }
}
