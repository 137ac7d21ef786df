// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Disappearing-item tracking.
//!
//! When a transition id leaves the render description while its transition
//! animates it out, the mounted subtree of each of its outputs is kept alive:
//! force-mounted in full, locked against the generic unmount path, and
//! reparented to the root host so that removing intermediate hosts cannot
//! take it down. The tracker owns those subtrees until the animation
//! completes or the id reappears, then tears them down leaves first.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};
use kurbo::Vec2;

use crate::affinity::AffinityGroup;
use crate::error::TransitionsError;
use crate::locks::MountReferences;
use crate::mount::{DelegatedUnmount, MountTarget, UnmountedItem};
use crate::snapshot::{RenderSnapshot, TransitionIdMapping};
use crate::types::TransitionId;

/// Disappearing groups and the items they keep alive.
#[derive(Clone, Debug)]
pub(crate) struct DisappearingTracker<I> {
    groups: BTreeMap<TransitionId, AffinityGroup<I>>,
    roots: HashMap<I, TransitionId>,
    /// Locked items of each group root's subtree, the root included.
    members: HashMap<I, Vec<I>>,
    locked: HashSet<I>,
}

impl<I> Default for DisappearingTracker<I> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
            roots: HashMap::new(),
            members: HashMap::new(),
            locked: HashSet::new(),
        }
    }
}

impl<I: Copy + Eq + Hash + core::fmt::Debug> DisappearingTracker<I> {
    pub(crate) fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub(crate) fn groups(&self) -> &BTreeMap<TransitionId, AffinityGroup<I>> {
        &self.groups
    }

    pub(crate) fn locked(&self) -> &HashSet<I> {
        &self.locked
    }

    pub(crate) fn is_locked(&self, item: I) -> bool {
        self.locked.contains(&item)
    }

    /// True if `item` is a member of a disappearing group.
    pub(crate) fn is_group_root(&self, item: I) -> bool {
        self.roots.contains_key(&item)
    }

    /// What the generic unmount path should do with a locked `item`: group
    /// roots start disappearing in their host, their descendants stay put.
    pub(crate) fn delegated_unmount(&self, item: I) -> DelegatedUnmount {
        if self.is_group_root(item) {
            DelegatedUnmount::StartDisappearing
        } else {
            DelegatedUnmount::Keep
        }
    }

    /// The transition id of the group `item` belongs to.
    pub(crate) fn transition_id_of(&self, item: I) -> Option<&TransitionId> {
        self.roots.get(&item)
    }

    /// Keep every newly disappearing subtree of `previous` alive.
    ///
    /// `is_disappearing` classifies the transition id of a previous index.
    pub(crate) fn extract<M>(
        &mut self,
        previous: &RenderSnapshot,
        target: &mut M,
        refs: &mut MountReferences,
        mut is_disappearing: impl FnMut(&TransitionId) -> bool,
    ) -> Result<(), TransitionsError>
    where
        M: MountTarget<Item = I> + ?Sized,
    {
        let count = target.item_count().min(previous.len());
        let mut index = 1;
        while index < count {
            let disappearing_id = previous
                .node_at(index)
                .and_then(|node| previous.animatable(node.id))
                .and_then(|a| a.transition_id.as_ref())
                .filter(|&id| is_disappearing(id));
            let Some(id) = disappearing_id else {
                index += 1;
                continue;
            };

            let last = previous.find_last_descendant_index(index);
            let mut members = Vec::with_capacity(last + 1 - index);
            for j in index..=last {
                let Some(node) = previous.node_at(j) else {
                    continue;
                };
                if target.item_at(j).is_none() {
                    refs.release(target, node.id, false);
                    target.acquire_reference(node.id, j, true);
                    target.release_reference(node.id, j, false);
                }
                if let Some(item) = target.item_at(j) {
                    self.locked.insert(item);
                    members.push(item);
                }
            }

            let Some(item) = target.item_at(index) else {
                return Err(fail(TransitionsError::MissingDisappearingRoot { index }));
            };
            remount_to_root(target, item)?;

            let output_type = previous
                .node_at(index)
                .and_then(|node| previous.animatable(node.id))
                .map(|a| a.output_type)
                .unwrap_or(previous.nodes()[index].output_type);
            self.groups
                .entry(id.clone())
                .or_default()
                .add(output_type, item)?;
            self.roots.insert(item, id.clone());
            self.members.insert(item, members);
            target.notify_logically_unmounted(index);
            tracing::debug!(%id, index, last, "extracted disappearing subtree");

            index = last + 1;
        }
        Ok(())
    }

    /// Remove the groups whose id is present again in `next`.
    pub(crate) fn take_reappeared(
        &mut self,
        next: &TransitionIdMapping,
    ) -> Vec<(TransitionId, AffinityGroup<I>)> {
        let ids: Vec<TransitionId> = self
            .groups
            .keys()
            .filter(|id| next.contains_key(*id))
            .cloned()
            .collect();
        ids.into_iter()
            .filter_map(|id| self.groups.remove(&id).map(|g| (id, g)))
            .collect()
    }

    /// Remove the group of `id`.
    pub(crate) fn take(&mut self, id: &TransitionId) -> Option<AffinityGroup<I>> {
        self.groups.remove(id)
    }

    /// Remove every group.
    pub(crate) fn take_all(&mut self) -> Vec<(TransitionId, AffinityGroup<I>)> {
        core::mem::take(&mut self.groups).into_iter().collect()
    }

    /// Forget `item` and its locked subtree after the generic path destroyed
    /// them with their host.
    pub(crate) fn forget(&mut self, item: I) -> Option<TransitionId> {
        self.locked.remove(&item);
        for member in self.members.remove(&item).unwrap_or_default() {
            self.locked.remove(&member);
        }
        let id = self.roots.remove(&item)?;
        if let Some(group) = self.groups.get_mut(&id) {
            let slot = group.iter().find(|(_, v)| **v == item).map(|(ty, _)| ty);
            if let Some(ty) = slot {
                group.remove(ty);
            }
            if group.is_empty() {
                self.groups.remove(&id);
            }
        }
        Some(id)
    }

    /// Tear down every member of `group`, leaves first.
    ///
    /// Returns the unbound items in teardown order.
    pub(crate) fn finalize<M>(
        &mut self,
        group: &AffinityGroup<I>,
        target: &mut M,
    ) -> Result<Vec<UnmountedItem<I>>, TransitionsError>
    where
        M: MountTarget<Item = I> + ?Sized,
    {
        let mut out = Vec::new();
        for (_, &item) in group.iter() {
            self.unmount_subtree(target, item, true, &mut out)?;
        }
        Ok(out)
    }

    fn unmount_subtree<M>(
        &mut self,
        target: &mut M,
        item: I,
        disappearing: bool,
        out: &mut Vec<UnmountedItem<I>>,
    ) -> Result<(), TransitionsError>
    where
        M: MountTarget<Item = I> + ?Sized,
    {
        if target.is_host(item) {
            for j in (0..target.child_count(item)).rev() {
                if let Some(child) = target.child_at(item, j) {
                    self.unmount_subtree(target, child, false, out)?;
                }
            }
            let remaining = target.child_count(item);
            if remaining > 0 {
                return Err(fail(TransitionsError::ResidualChildren { remaining }));
            }
        }
        let Some(host) = target.host_of(item) else {
            return Err(fail(TransitionsError::DetachedDisappearingItem));
        };
        if disappearing {
            target.unmount_disappearing(host, item);
        } else {
            target.unmount_from_host(host, item);
        }
        if let Some(unmounted) = target.unbind(item) {
            out.push(unmounted);
        }
        self.locked.remove(&item);
        self.roots.remove(&item);
        self.members.remove(&item);
        Ok(())
    }
}

/// Reparent `item` to the root host, keeping its on-screen position.
fn remount_to_root<M: MountTarget + ?Sized>(
    target: &mut M,
    item: M::Item,
) -> Result<(), TransitionsError> {
    let Some(root) = target.root_item() else {
        return Err(fail(TransitionsError::DetachedDisappearingItem));
    };
    let Some(host) = target.host_of(item) else {
        return Err(fail(TransitionsError::DetachedDisappearingItem));
    };
    if host == root {
        return Ok(());
    }
    let mut offset = Vec2::ZERO;
    let mut next = host;
    while next != root {
        offset += target.bounds_of(next).origin().to_vec2();
        let Some(up) = target.host_of(next) else {
            return Err(fail(TransitionsError::DetachedDisappearingItem));
        };
        next = up;
    }
    let bounds = target.bounds_of(item) + offset;
    let index = target.child_count(root);
    target.move_to_host(item, root, index, bounds);
    Ok(())
}

fn fail(err: TransitionsError) -> TransitionsError {
    tracing::error!(%err, "disappearing item consistency violation");
    err
}
