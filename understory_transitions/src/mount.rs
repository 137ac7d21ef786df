// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The mount target boundary and the hooks the engine exposes to it.
//!
//! ## Overview
//!
//! The live tree of mounted items belongs to a [`MountTarget`]. The engine
//! reads it by mount index, takes and drops mount references, and, for
//! disappearing subtrees only, restructures hosts directly.
//!
//! In the other direction, a generic incremental-mount pass consults
//! [`MountHooks`] before unmounting anything: items the engine has locked for
//! a disappear animation are handed to [`MountHooks::unmount`] instead of
//! being destroyed, and lifecycle hooks report items the pass did unmount or
//! detach.
//!
//! [`HostTree`](crate::HostTree) is a reference implementation of both sides.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use kurbo::Rect;

use crate::types::{OutputType, RenderUnitId, TransitionId};

/// The live, mutable tree of mounted items.
///
/// Mount indices refer to positions in the most recently mounted
/// [`RenderSnapshot`](crate::RenderSnapshot).
pub trait MountTarget {
    /// Handle of a mounted item.
    type Item: Copy + Eq + Hash + Debug;

    /// Number of mount indices.
    fn item_count(&self) -> usize;

    /// The item mounted at `index`, if any.
    fn item_at(&self, index: usize) -> Option<Self::Item>;

    /// The render unit `item` was mounted for.
    fn render_unit_of(&self, item: Self::Item) -> Option<RenderUnitId>;

    /// The root item, which is also the root host.
    fn root_item(&self) -> Option<Self::Item>;

    /// Take a mount reference on `unit`, mounting it at `index` when
    /// `also_mount` is set and it is not mounted yet.
    fn acquire_reference(&mut self, unit: RenderUnitId, index: usize, also_mount: bool);

    /// Drop a mount reference on `unit`, unmounting it when `also_unmount` is
    /// set and no reference remains.
    fn release_reference(&mut self, unit: RenderUnitId, index: usize, also_unmount: bool);

    /// Record that `index` is no longer part of the tree's positions, without
    /// destroying its content.
    fn notify_logically_unmounted(&mut self, index: usize);

    /// The host `item` is mounted in.
    fn host_of(&self, item: Self::Item) -> Option<Self::Item>;

    /// True if `item` hosts other items.
    fn is_host(&self, item: Self::Item) -> bool;

    /// Number of items mounted in `host`, disappearing items excluded.
    fn child_count(&self, host: Self::Item) -> usize;

    /// The `index`-th item mounted in `host`.
    fn child_at(&self, host: Self::Item, index: usize) -> Option<Self::Item>;

    /// Bounds of `item` relative to its host.
    fn bounds_of(&self, item: Self::Item) -> Rect;

    /// Detach `item` from its current host, apply `bounds`, and mount it in
    /// `host` at `index`.
    fn move_to_host(&mut self, item: Self::Item, host: Self::Item, index: usize, bounds: Rect);

    /// Remove `item` from `host`.
    fn unmount_from_host(&mut self, host: Self::Item, item: Self::Item);

    /// Remove a disappearing `item` from `host`.
    fn unmount_disappearing(&mut self, host: Self::Item, item: Self::Item);

    /// Release `item`'s content and forget it, returning what was unbound.
    fn unbind(&mut self, item: Self::Item) -> Option<UnmountedItem<Self::Item>>;
}

/// What the generic path should do with an item whose unmount was delegated.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DelegatedUnmount {
    /// Move the item to its host's disappearing list; it stays drawn.
    StartDisappearing,
    /// Leave the item where it is.
    Keep,
}

/// An item leaving the mount tree (unmounted or detached).
#[derive(Clone, Debug, PartialEq)]
pub struct UnmountedItem<I> {
    /// The item.
    pub item: I,
    /// Its render unit.
    pub render_unit: RenderUnitId,
    /// Its output type within its component.
    pub output_type: OutputType,
    /// Its transition id, if animatable.
    pub transition_id: Option<TransitionId>,
    /// True if the item hosts other items.
    pub is_host: bool,
    /// Disappearing items the item was hosting.
    pub disappearing_children: Vec<I>,
}

/// Hooks a generic incremental-mount pass calls while it mounts and unmounts.
pub trait MountHooks<I> {
    /// True if unmounting `item` must be left to [`unmount`](Self::unmount).
    fn should_delegate_unmount(&self, item: I) -> bool;

    /// Take over the unmount of `item`, mounted at `index` in `host`.
    fn unmount(&mut self, index: usize, item: I, host: I) -> DelegatedUnmount;

    /// Called for every item the generic pass unmounts.
    fn on_unmount_item(&mut self, _unmounted: &UnmountedItem<I>) {}

    /// Called for every item detached with its tree.
    fn on_detach_item(&mut self, _detached: &UnmountedItem<I>) {}
}

/// Hooks that never delegate and ignore lifecycle events.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoHooks;

impl<I> MountHooks<I> for NoHooks {
    fn should_delegate_unmount(&self, _: I) -> bool {
        false
    }

    fn unmount(&mut self, _: usize, _: I, _: I) -> DelegatedUnmount {
        DelegatedUnmount::Keep
    }
}
