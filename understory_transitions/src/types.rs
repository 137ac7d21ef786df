// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types shared by the engine and its collaborators: identifiers,
//! output-unit tags, and animated property flags.

use alloc::sync::Arc;
use core::fmt;

/// How a [`TransitionId`] was derived.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TransitionIdKind {
    /// A key that is unique across the whole logical tree.
    Global,
    /// A key that is unique only within its owner.
    Scoped,
    /// A key synthesized by the component model for bounds animations.
    Autogenerated,
}

/// Stable cross-pass key for one logical animatable entity.
///
/// Transition ids are content-independent: the same logical element carries the
/// same id in every render description it appears in, which makes the id the
/// join key between the previously mounted snapshot and the next one.
///
/// Cloning is cheap; the textual parts are reference counted.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TransitionId {
    kind: TransitionIdKind,
    reference: Arc<str>,
    owner: Option<Arc<str>>,
}

impl TransitionId {
    /// A globally unique id.
    pub fn global(reference: &str) -> Self {
        Self {
            kind: TransitionIdKind::Global,
            reference: Arc::from(reference),
            owner: None,
        }
    }

    /// An id scoped to `owner`.
    pub fn scoped(owner: &str, reference: &str) -> Self {
        Self {
            kind: TransitionIdKind::Scoped,
            reference: Arc::from(reference),
            owner: Some(Arc::from(owner)),
        }
    }

    /// An id generated for `reference` (typically a component's global key).
    pub fn autogenerated(reference: &str) -> Self {
        Self {
            kind: TransitionIdKind::Autogenerated,
            reference: Arc::from(reference),
            owner: None,
        }
    }

    /// The id kind.
    pub fn kind(&self) -> TransitionIdKind {
        self.kind
    }

    /// The user-facing key this id was built from.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// The owner for scoped ids.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.owner) {
            (TransitionIdKind::Scoped, Some(owner)) => write!(f, "{owner}/{}", self.reference),
            (TransitionIdKind::Autogenerated, _) => write!(f, "auto:{}", self.reference),
            _ => f.write_str(&self.reference),
        }
    }
}

/// Identity of one physical output in a render description.
///
/// Stable across passes as long as the output is unchanged.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RenderUnitId(pub u64);

/// Identity of a logical tree instance.
///
/// Two snapshots with different tree ids never animate against each other.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TreeId(pub u32);

/// The kind of physical output a render node produces for its component.
///
/// The declaration order is the iteration order of an
/// [`AffinityGroup`](crate::AffinityGroup).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum OutputType {
    /// The component's own content.
    Content,
    /// A background drawn under the content.
    Background,
    /// A foreground drawn over the content.
    Foreground,
    /// A host wrapping the component's outputs.
    Host,
    /// A border drawn around the content.
    Border,
}

impl OutputType {
    /// Every output type, in group order.
    pub const ALL: [Self; 5] = [
        Self::Content,
        Self::Background,
        Self::Foreground,
        Self::Host,
        Self::Border,
    ];

    pub(crate) const fn slot(self) -> usize {
        match self {
            Self::Content => 0,
            Self::Background => 1,
            Self::Foreground => 2,
            Self::Host => 3,
            Self::Border => 4,
        }
    }
}

/// What a render node mounts.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ContentKind {
    /// A host that mounts other items.
    Host,
    /// A leaf view.
    View,
    /// A leaf drawable.
    Drawable,
}

bitflags::bitflags! {
    /// Properties a transition unit can animate.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct AnimatedProperties: u16 {
        /// Horizontal position.
        const X        = 0b0000_0000_0001;
        /// Vertical position.
        const Y        = 0b0000_0000_0010;
        /// Width of the bounds.
        const WIDTH    = 0b0000_0000_0100;
        /// Height of the bounds.
        const HEIGHT   = 0b0000_0000_1000;
        /// Opacity.
        const ALPHA    = 0b0000_0001_0000;
        /// Uniform scale.
        const SCALE    = 0b0000_0010_0000;
        /// Horizontal scale.
        const SCALE_X  = 0b0000_0100_0000;
        /// Vertical scale.
        const SCALE_Y  = 0b0000_1000_0000;
        /// Rotation in degrees.
        const ROTATION = 0b0001_0000_0000;

        /// Position and size.
        const BOUNDS = Self::X.bits() | Self::Y.bits() | Self::WIDTH.bits() | Self::HEIGHT.bits();
    }
}

/// One animated property of one transition id.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PropertyHandle {
    /// The animated entity.
    pub transition_id: TransitionId,
    /// The animated property; a single flag.
    pub property: AnimatedProperties,
}

/// Identifier for a mount item in a [`HostTree`](crate::HostTree).
///
/// A small, copyable generational handle: the slot index plus the generation
/// the slot had when the item was mounted. Once the item is unmounted its slot
/// may be reused, and the stale handle never aliases the new item.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct MountItemId(pub(crate) u32, pub(crate) u32);

impl MountItemId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}
