// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_transitions --heading-base-level=0

//! Understory Transitions: transition-aware mount reconciliation.
//!
//! A declarative UI describes each frame as a [`RenderSnapshot`], and a mount
//! target turns consecutive snapshots into a live tree of mounted items. This
//! crate sits between the two so that animations can run across that
//! boundary.
//!
//! - Items that leave the description but have a disappear animation stay
//!   mounted, moved to the root host, until the animation completes.
//! - Items that animate keep themselves, their subtree, and their ancestors
//!   mounted through reference-counted animation locks.
//! - Transitions are collected from the snapshot, from components that asked
//!   for previous render data, and from pending state updates, then handed to
//!   a [`TransitionManager`] as one root transition.
//!
//! ## Pass protocol
//!
//! Every mount pass is bracketed by [`TransitionsEngine::before_mount`] and
//! [`TransitionsEngine::after_mount`]. While the target mounts the new
//! snapshot it consults the engine through [`MountHooks`]: items locked for a
//! disappear animation are never destroyed by the generic unmount path.
//! Between passes, [`TransitionsEngine::process_events`] drains the
//! completions queued by the manager.
//!
//! The engine is single-threaded; every entry point asserts it runs on the
//! thread that created it (with the `std` feature).
//!
//! ## API overview
//!
//! - [`TransitionsEngine`]: the reconciliation driver.
//! - [`RenderSnapshot`] / [`SnapshotBuilder`]: immutable render descriptions.
//! - [`Transition`] / [`TransitionUnit`]: declarative transition trees.
//! - [`TransitionManager`]: the animation runner boundary;
//!   [`ScriptedTransitionManager`] runs nothing and completes on request.
//! - [`MountTarget`] / [`MountHooks`]: the mount tree boundary;
//!   [`HostTree`] is a reference implementation with a [`MountOp`] journal.
//! - [`AffinityGroup`]: the render units of one animated entity, one per
//!   [`OutputType`].
//!
//! ### Minimal usage
//!
//! ```
//! use std::rc::Rc;
//! use kurbo::Rect;
//! use understory_transitions::{
//!     AnimatedProperties, ContentKind, EngineState, HostTree, NoLogicalTree, RenderNode,
//!     RenderSnapshot, RenderUnitId, ScriptedTransitionManager, TransitionId, TransitionTarget,
//!     TransitionUnit, TransitionsEngine, TreeId,
//! };
//!
//! let card = TransitionId::global("card");
//! let screen = |with_card: bool| {
//!     let mut b = RenderSnapshot::builder(TreeId(1), "Screen");
//!     let root = b.root(RenderNode::new(
//!         RenderUnitId(0),
//!         ContentKind::Host,
//!         Rect::new(0.0, 0.0, 400.0, 400.0),
//!     ));
//!     if with_card {
//!         let bounds = Rect::new(10.0, 10.0, 110.0, 60.0);
//!         let node = RenderNode::new(RenderUnitId(1), ContentKind::View, bounds);
//!         b.child(root, node.with_transition_id(card.clone()));
//!     } else {
//!         let target = TransitionTarget::Single(card.clone());
//!         let fade = TransitionUnit::new(target, AnimatedProperties::ALPHA);
//!         b.transition(fade.disappear_to(0.0));
//!     }
//!     Rc::new(b.build().unwrap())
//! };
//!
//! let mut engine = TransitionsEngine::new(ScriptedTransitionManager::new);
//! let mut tree = HostTree::new();
//! for snapshot in [screen(true), screen(false)] {
//!     engine.before_mount(Rc::clone(&snapshot), &mut tree, &mut NoLogicalTree).unwrap();
//!     tree.mount(snapshot, &mut engine);
//!     engine.after_mount(&mut tree).unwrap();
//! }
//!
//! // The card left the description but stays mounted while it fades out.
//! assert_eq!(engine.state(), EngineState::Animating);
//! assert_eq!(tree.alive_count(), 2);
//!
//! engine.manager_mut().unwrap().finish(&card);
//! engine.process_events(&mut tree).unwrap();
//! assert_eq!(tree.alive_count(), 1);
//! ```

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod affinity;
pub mod collect;
pub mod config;
pub mod engine;
pub mod error;
pub mod host_tree;
pub mod manager;
pub mod mount;
pub mod snapshot;
pub mod transition;
pub mod types;

mod disappearing;
mod locks;
mod thread;

pub use affinity::AffinityGroup;
pub use collect::{LogicalTree, NoLogicalTree, TransitionCollector, TransitionProvider};
pub use config::EngineConfig;
pub use engine::{EngineState, TransitionsEngine};
pub use error::{AffinityError, TransitionsError};
pub use host_tree::{HostTree, MountOp};
pub use manager::{ScriptedTransitionManager, TransitionEvent, TransitionManager};
pub use mount::{DelegatedUnmount, MountHooks, MountTarget, NoHooks, UnmountedItem};
pub use snapshot::{
    AnimatableItem, RenderNode, RenderSnapshot, SnapshotBuilder, TransitionIdMapping,
};
pub use transition::{
    Animator, RootBoundsTransition, Transition, TransitionEndEvent, TransitionEndHandler,
    TransitionTarget, TransitionUnit,
};
pub use types::{
    AnimatedProperties, ContentKind, MountItemId, OutputType, PropertyHandle, RenderUnitId,
    TransitionId, TransitionIdKind, TreeId,
};
