// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render description snapshots: immutable views of the next thing to mount.
//!
//! A [`RenderSnapshot`] is an ordered sequence of [`RenderNode`]s in mount
//! order (depth first, parents before children) with index `0` as the logical
//! root. Every subtree therefore occupies a contiguous index range, which is
//! what [`RenderSnapshot::find_last_descendant_index`] relies on.
//!
//! Snapshots are built once with a [`SnapshotBuilder`] and shared behind an
//! `Rc` between the caller and the [engine](crate::TransitionsEngine).

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

use hashbrown::HashMap;
use kurbo::Rect;

use crate::affinity::AffinityGroup;
use crate::collect::TransitionProvider;
use crate::error::AffinityError;
use crate::transition::Transition;
use crate::types::{ContentKind, OutputType, RenderUnitId, TransitionId, TreeId};

/// Transition id to the animatable outputs carrying it.
pub type TransitionIdMapping = BTreeMap<TransitionId, AffinityGroup<AnimatableItem>>;

/// One physical output in a render description.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderNode {
    /// Identity, stable across passes while the output is unchanged.
    pub id: RenderUnitId,
    /// Index of the host node in the same snapshot; `None` only for the root.
    pub parent: Option<usize>,
    /// Which output of its component this node is.
    pub output_type: OutputType,
    /// What gets mounted.
    pub kind: ContentKind,
    /// Bounds in root coordinates.
    pub bounds: Rect,
    /// Transition id of the owning component, if it is animatable.
    pub transition_id: Option<TransitionId>,
}

impl RenderNode {
    /// A content node with no transition id. The parent is assigned by the builder.
    pub fn new(id: RenderUnitId, kind: ContentKind, bounds: Rect) -> Self {
        Self {
            id,
            parent: None,
            output_type: if kind == ContentKind::Host {
                OutputType::Host
            } else {
                OutputType::Content
            },
            kind,
            bounds,
            transition_id: None,
        }
    }

    /// Set the output type.
    #[must_use]
    pub fn with_output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = output_type;
        self
    }

    /// Set the transition id.
    #[must_use]
    pub fn with_transition_id(mut self, id: TransitionId) -> Self {
        self.transition_id = Some(id);
        self
    }
}

/// Animatable metadata of one render node.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimatableItem {
    /// The render node this metadata belongs to.
    pub id: RenderUnitId,
    /// Transition id, if the node takes part in transitions.
    pub transition_id: Option<TransitionId>,
    /// Output type of the node within its component.
    pub output_type: OutputType,
    /// Bounds in root coordinates.
    pub bounds: Rect,
}

/// An immutable render description.
pub struct RenderSnapshot {
    tree_id: TreeId,
    root_component_name: String,
    nodes: Vec<RenderNode>,
    positions: HashMap<RenderUnitId, usize>,
    animatables: HashMap<RenderUnitId, AnimatableItem>,
    mapping: TransitionIdMapping,
    root_transition_id: Option<TransitionId>,
    transitions: Vec<Option<Transition>>,
    previous_render_data: Vec<Rc<dyn TransitionProvider>>,
    needs_to_rerun_transitions: Cell<bool>,
}

impl fmt::Debug for RenderSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderSnapshot")
            .field("tree_id", &self.tree_id)
            .field("root_component_name", &self.root_component_name)
            .field("nodes", &self.nodes.len())
            .field("transition_ids", &self.mapping.len())
            .field("transitions", &self.transitions.len())
            .field("needs_to_rerun_transitions", &self.needs_to_rerun_transitions.get())
            .finish_non_exhaustive()
    }
}

impl RenderSnapshot {
    /// Start building a snapshot for logical tree `tree_id`.
    pub fn builder(tree_id: TreeId, root_component_name: &str) -> SnapshotBuilder {
        SnapshotBuilder {
            tree_id,
            root_component_name: root_component_name.into(),
            nodes: Vec::new(),
            open: Vec::new(),
            root_transition_id: None,
            transitions: Vec::new(),
            previous_render_data: Vec::new(),
            needs_to_rerun_transitions: false,
        }
    }

    /// Logical tree instance this snapshot belongs to.
    pub fn tree_id(&self) -> TreeId {
        self.tree_id
    }

    /// Name of the root component, used in diagnostics.
    pub fn root_component_name(&self) -> &str {
        &self.root_component_name
    }

    /// Number of render nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the snapshot has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node at mount index `index`.
    pub fn node_at(&self, index: usize) -> Option<&RenderNode> {
        self.nodes.get(index)
    }

    /// All nodes in mount order.
    pub fn nodes(&self) -> &[RenderNode] {
        &self.nodes
    }

    /// Mount index of the node with identity `id`.
    pub fn position_of(&self, id: RenderUnitId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Animatable metadata of the node with identity `id`.
    pub fn animatable(&self, id: RenderUnitId) -> Option<&AnimatableItem> {
        self.animatables.get(&id)
    }

    /// The animatable outputs carrying `id`.
    pub fn animatables_for(&self, id: &TransitionId) -> Option<&AffinityGroup<AnimatableItem>> {
        self.mapping.get(id)
    }

    /// Every transition id in this snapshot with its outputs.
    pub fn transition_id_mapping(&self) -> &TransitionIdMapping {
        &self.mapping
    }

    /// Transition id of the logical root, used for root bounds animations.
    pub fn root_transition_id(&self) -> Option<&TransitionId> {
        self.root_transition_id.as_ref()
    }

    /// Transitions declared for this pass.
    ///
    /// Entries are never absent for snapshots built with
    /// [`SnapshotBuilder::transition`]; the collector still checks.
    pub fn transitions(&self) -> &[Option<Transition>] {
        &self.transitions
    }

    /// Components that need their previous render output to produce a transition.
    pub fn components_needing_previous_render_data(&self) -> &[Rc<dyn TransitionProvider>] {
        &self.previous_render_data
    }

    /// True if transitions must run even though the logical tree instance changed.
    pub fn needs_to_rerun_transitions(&self) -> bool {
        self.needs_to_rerun_transitions.get()
    }

    /// Set or clear the re-run request.
    pub fn set_needs_to_rerun_transitions(&self, rerun: bool) {
        self.needs_to_rerun_transitions.set(rerun);
    }

    /// Last index of the contiguous subtree rooted at `index`.
    ///
    /// Returns `index` itself for a leaf. Scans forward until it reaches a node
    /// whose ancestor chain reaches the absolute root without passing `index`.
    pub fn find_last_descendant_index(&self, index: usize) -> usize {
        for i in index + 1..self.nodes.len() {
            let mut parent = self.nodes[i].parent;
            loop {
                match parent {
                    Some(p) if p == index => break,
                    Some(p) if self.nodes[p].parent.is_some() => parent = self.nodes[p].parent,
                    _ => return i - 1,
                }
            }
        }
        self.nodes.len().saturating_sub(1)
    }

    /// Structural ancestors of `index`, nearest first, excluding the absolute root.
    pub fn ancestors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let mut parent = self.nodes.get(index).and_then(|n| n.parent);
        core::iter::from_fn(move || {
            let p = parent?;
            let grandparent = self.nodes[p].parent?;
            parent = Some(grandparent);
            Some(p)
        })
    }
}

/// Builder for [`RenderSnapshot`].
///
/// Nodes must be pushed in depth-first order: a child may only be added under
/// the most recently pushed node or one of its ancestors.
pub struct SnapshotBuilder {
    tree_id: TreeId,
    root_component_name: String,
    nodes: Vec<RenderNode>,
    open: Vec<usize>,
    root_transition_id: Option<TransitionId>,
    transitions: Vec<Option<Transition>>,
    previous_render_data: Vec<Rc<dyn TransitionProvider>>,
    needs_to_rerun_transitions: bool,
}

impl fmt::Debug for SnapshotBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotBuilder")
            .field("tree_id", &self.tree_id)
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

impl SnapshotBuilder {
    /// Push the logical root at index `0`.
    ///
    /// # Panics
    ///
    /// Panics if a root was already pushed.
    pub fn root(&mut self, mut node: RenderNode) -> usize {
        assert!(self.nodes.is_empty(), "a snapshot has exactly one root");
        node.parent = None;
        self.nodes.push(node);
        self.open.push(0);
        0
    }

    /// Push `node` as a child of the node at `parent` and return its index.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not the last pushed node or one of its ancestors.
    pub fn child(&mut self, parent: usize, mut node: RenderNode) -> usize {
        while self.open.last().is_some_and(|&top| top != parent) {
            self.open.pop();
        }
        assert!(
            !self.open.is_empty(),
            "nodes must be pushed in depth-first order (parent {parent} is closed)"
        );
        node.parent = Some(parent);
        let index = self.nodes.len();
        self.nodes.push(node);
        self.open.push(index);
        index
    }

    /// Override the root transition id (defaults to the root node's).
    pub fn root_transition_id(&mut self, id: TransitionId) -> &mut Self {
        self.root_transition_id = Some(id);
        self
    }

    /// Declare a transition for this pass.
    pub fn transition(&mut self, transition: impl Into<Transition>) -> &mut Self {
        self.transitions.push(Some(transition.into()));
        self
    }

    /// Register a component that produces its transition from previous render data.
    pub fn previous_render_data(&mut self, component: Rc<dyn TransitionProvider>) -> &mut Self {
        self.previous_render_data.push(component);
        self
    }

    /// Request transitions to run even across a tree instance change.
    pub fn needs_to_rerun_transitions(&mut self, rerun: bool) -> &mut Self {
        self.needs_to_rerun_transitions = rerun;
        self
    }

    /// Finish the snapshot, indexing positions, animatable metadata and the
    /// transition id mapping.
    pub fn build(self) -> Result<RenderSnapshot, AffinityError> {
        let mut positions = HashMap::with_capacity(self.nodes.len());
        let mut animatables = HashMap::with_capacity(self.nodes.len());
        let mut mapping = TransitionIdMapping::new();
        for (index, node) in self.nodes.iter().enumerate() {
            positions.insert(node.id, index);
            let item = AnimatableItem {
                id: node.id,
                transition_id: node.transition_id.clone(),
                output_type: node.output_type,
                bounds: node.bounds,
            };
            if let Some(tid) = &node.transition_id {
                mapping
                    .entry(tid.clone())
                    .or_insert_with(AffinityGroup::new)
                    .add(node.output_type, item.clone())?;
            }
            animatables.insert(node.id, item);
        }
        let root_transition_id = self
            .root_transition_id
            .or_else(|| self.nodes.first().and_then(|n| n.transition_id.clone()));
        Ok(RenderSnapshot {
            tree_id: self.tree_id,
            root_component_name: self.root_component_name,
            nodes: self.nodes,
            positions,
            animatables,
            mapping,
            root_transition_id,
            transitions: self.transitions,
            previous_render_data: self.previous_render_data,
            needs_to_rerun_transitions: Cell::new(self.needs_to_rerun_transitions),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloc::vec;

    pub(crate) fn node(id: u64, kind: ContentKind) -> RenderNode {
        let y = id as f64 * 10.0;
        RenderNode::new(RenderUnitId(id), kind, Rect::new(0.0, y, 100.0, y + 10.0))
    }

    // root
    // ├── 1 host
    // │   ├── 2 view
    // │   └── 3 host
    // │       └── 4 view
    // └── 5 view
    fn sample() -> RenderSnapshot {
        let mut b = RenderSnapshot::builder(TreeId(1), "Sample");
        let root = b.root(node(0, ContentKind::Host));
        let h1 = b.child(root, node(1, ContentKind::Host));
        b.child(h1, node(2, ContentKind::View));
        let h3 = b.child(h1, node(3, ContentKind::Host));
        b.child(h3, node(4, ContentKind::View));
        b.child(root, node(5, ContentKind::Drawable));
        b.build().unwrap()
    }

    #[test]
    fn last_descendant_of_subtree_and_leaf() {
        let s = sample();
        assert_eq!(s.find_last_descendant_index(1), 4, "subtree of size 4 at 1");
        assert_eq!(s.find_last_descendant_index(3), 4);
        assert_eq!(s.find_last_descendant_index(2), 2, "leaf returns itself");
        assert_eq!(s.find_last_descendant_index(5), 5, "last leaf returns itself");
        assert_eq!(s.find_last_descendant_index(0), 5, "root spans everything");
    }

    #[test]
    fn last_descendant_matches_subtree_size() {
        // A chain of k hosts under the root: the subtree at 1 has k nodes.
        for k in 1..6_u64 {
            let mut b = RenderSnapshot::builder(TreeId(1), "Chain");
            let mut parent = b.root(node(0, ContentKind::Host));
            for id in 1..=k {
                parent = b.child(parent, node(id, ContentKind::Host));
            }
            b.child(0, node(100, ContentKind::View));
            let s = b.build().unwrap();
            assert_eq!(s.find_last_descendant_index(1), 1 + k as usize - 1);
        }
    }

    #[test]
    fn ancestors_stop_short_of_root() {
        let s = sample();
        let up: Vec<_> = s.ancestors(4).collect();
        assert_eq!(up, vec![3, 1]);
        assert_eq!(s.ancestors(1).count(), 0);
        assert_eq!(s.ancestors(0).count(), 0);
    }

    #[test]
    fn mapping_groups_outputs_by_transition_id() {
        let t1 = TransitionId::global("card");
        let mut b = RenderSnapshot::builder(TreeId(1), "Card");
        let root_id = TransitionId::global("root");
        let root = b.root(node(0, ContentKind::Host).with_transition_id(root_id));
        b.child(
            root,
            node(1, ContentKind::Drawable)
                .with_output_type(OutputType::Background)
                .with_transition_id(t1.clone()),
        );
        b.child(root, node(2, ContentKind::View).with_transition_id(t1.clone()));
        let s = b.build().unwrap();

        let group = s.animatables_for(&t1).unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(group.get(OutputType::Background).map(|a| a.id), Some(RenderUnitId(1)));
        assert_eq!(group.most_significant_unit().map(|a| a.id), Some(RenderUnitId(2)));
        assert_eq!(s.root_transition_id(), Some(&TransitionId::global("root")));
        assert_eq!(s.position_of(RenderUnitId(2)), Some(2));
        assert!(s.animatable(RenderUnitId(0)).is_some());
    }

    #[test]
    fn duplicate_output_type_is_rejected() {
        let t1 = TransitionId::global("dup");
        let mut b = RenderSnapshot::builder(TreeId(1), "Dup");
        let root = b.root(node(0, ContentKind::Host));
        b.child(root, node(1, ContentKind::View).with_transition_id(t1.clone()));
        b.child(root, node(2, ContentKind::View).with_transition_id(t1));
        assert_eq!(b.build().unwrap_err(), AffinityError::Occupied(OutputType::Content));
    }

    #[test]
    #[should_panic(expected = "depth-first order")]
    fn out_of_order_child_panics() {
        let mut b = RenderSnapshot::builder(TreeId(1), "Bad");
        let root = b.root(node(0, ContentKind::Host));
        let a = b.child(root, node(1, ContentKind::Host));
        b.child(root, node(2, ContentKind::Host));
        b.child(a, node(3, ContentKind::View));
    }

    #[test]
    fn rerun_flag_is_mutable_through_shared_snapshot() {
        let mut b = RenderSnapshot::builder(TreeId(7), "Rerun");
        b.root(node(0, ContentKind::Host));
        b.needs_to_rerun_transitions(true);
        let s = Rc::new(b.build().unwrap());
        let shared = Rc::clone(&s);
        assert!(s.needs_to_rerun_transitions());
        shared.set_needs_to_rerun_transitions(false);
        assert!(!s.needs_to_rerun_transitions());
    }
}
