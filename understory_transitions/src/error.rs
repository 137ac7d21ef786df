// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Every variant of [`TransitionsError`] is an internal consistency violation:
//! an upstream collaborator broke its contract and continuing would corrupt the
//! mount tree. Callers are expected to abort the mount pass when they see one.
//! Ordinary absence (no manager yet, no previous snapshot, no animatable
//! metadata) is never an error.

use alloc::string::String;

use crate::types::OutputType;

/// A consistency violation detected during a mount pass or a completion callback.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TransitionsError {
    /// A collected transition list contained an absent entry.
    #[error("null transition collected for root component {root_component} (root transition id: {root_transition_id})")]
    NullTransition {
        /// Name of the root component of the snapshot.
        root_component: String,
        /// Display form of the root transition id, or `none`.
        root_transition_id: String,
    },
    /// The root of a disappearing subtree was still not mounted after force-mounting it.
    #[error("root of the disappearing subtree at index {index} is not mounted")]
    MissingDisappearingRoot {
        /// Index in the previous snapshot.
        index: usize,
    },
    /// Recursive unmount of a host's children left some mounted.
    #[error("recursively unmounting a host left {remaining} item(s) behind")]
    ResidualChildren {
        /// Number of children still reported after the recursive unmount.
        remaining: usize,
    },
    /// A disappearing item was found with no host.
    #[error("disappearing item has no host")]
    DetachedDisappearingItem,
    /// Two items were mapped to the same output slot of one affinity group.
    #[error(transparent)]
    Affinity(#[from] AffinityError),
}

/// Violation of the one-unit-per-output-type rule of an
/// [`AffinityGroup`](crate::AffinityGroup).
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum AffinityError {
    /// The group already has a unit of this type.
    #[error("affinity group already contains a {0:?} unit")]
    Occupied(OutputType),
    /// A host unit must be the only member of its group.
    #[error("a Host unit must be the only member of an affinity group")]
    HostNotAlone,
}
