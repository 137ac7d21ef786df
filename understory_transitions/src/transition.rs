// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declarative transitions.
//!
//! A [`Transition`] describes *which* properties of *which* entities should
//! animate. It deliberately says nothing about per-frame interpolation; the
//! [`TransitionManager`](crate::TransitionManager) owns timelines and easing.
//! The [`Animator`] carried by each unit is an opaque descriptor handed through
//! to that manager.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use crate::types::{AnimatedProperties, TransitionId};

/// Which entities a [`TransitionUnit`] applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionTarget {
    /// Every entity with a transition id.
    All,
    /// One entity.
    Single(TransitionId),
    /// A fixed set of entities.
    Set(Vec<TransitionId>),
}

impl TransitionTarget {
    /// True if the target covers `id`.
    pub fn targets(&self, id: &TransitionId) -> bool {
        match self {
            Self::All => true,
            Self::Single(single) => single == id,
            Self::Set(ids) => ids.contains(id),
        }
    }
}

/// Timing descriptor handed to the transition manager.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Animator {
    /// Manager default.
    Default,
    /// Fixed-duration timing.
    Timing {
        /// Duration in milliseconds.
        duration_ms: u32,
    },
    /// Spring physics.
    Spring {
        /// Spring tension.
        tension: f64,
        /// Spring friction.
        friction: f64,
    },
}

/// Payload of a per-property completion notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionEndEvent {
    /// The user-facing key of the animated entity.
    pub key: alloc::string::String,
    /// The property that finished.
    pub property: AnimatedProperties,
}

/// Callback invoked when one property of a unit finishes animating.
#[derive(Clone)]
pub struct TransitionEndHandler(Rc<dyn Fn(&TransitionEndEvent)>);

impl TransitionEndHandler {
    /// Wrap a callback.
    pub fn new(f: impl Fn(&TransitionEndEvent) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke the callback.
    pub fn call(&self, event: &TransitionEndEvent) {
        (self.0)(event);
    }
}

impl fmt::Debug for TransitionEndHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TransitionEndHandler").finish_non_exhaustive()
    }
}

impl PartialEq for TransitionEndHandler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A leaf transition: animate `properties` of the targeted entities.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionUnit {
    /// Entities covered by this unit.
    pub target: TransitionTarget,
    /// Properties to animate.
    pub properties: AnimatedProperties,
    /// Timing descriptor.
    pub animator: Animator,
    /// Starting value for entities that appear, if they should animate in.
    pub appear_from: Option<f64>,
    /// Final value for entities that disappear, if they should animate out.
    pub disappear_to: Option<f64>,
    /// Per-property completion callback.
    pub end_handler: Option<TransitionEndHandler>,
}

impl TransitionUnit {
    /// A unit animating `properties` of `target` with the default animator.
    pub fn new(target: TransitionTarget, properties: AnimatedProperties) -> Self {
        Self {
            target,
            properties,
            animator: Animator::Default,
            appear_from: None,
            disappear_to: None,
            end_handler: None,
        }
    }

    /// Set the animator.
    #[must_use]
    pub fn with_animator(mut self, animator: Animator) -> Self {
        self.animator = animator;
        self
    }

    /// Animate entities in from `value` when they appear.
    #[must_use]
    pub fn appear_from(mut self, value: f64) -> Self {
        self.appear_from = Some(value);
        self
    }

    /// Animate entities out to `value` when they disappear.
    #[must_use]
    pub fn disappear_to(mut self, value: f64) -> Self {
        self.disappear_to = Some(value);
        self
    }

    /// Attach a per-property completion callback.
    #[must_use]
    pub fn on_end(mut self, handler: TransitionEndHandler) -> Self {
        self.end_handler = Some(handler);
        self
    }

    /// True if this unit animates `property` of `id`.
    pub fn targets_property(&self, id: &TransitionId, property: AnimatedProperties) -> bool {
        self.properties.intersects(property) && self.target.targets(id)
    }
}

/// A declarative description of how properties change over time.
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    /// A single unit.
    Unit(TransitionUnit),
    /// Children run together.
    Parallel(Vec<Self>),
    /// Children run one after another.
    Sequence(Vec<Self>),
    /// Children start `step_ms` apart.
    Stagger {
        /// Delay between consecutive children, in milliseconds.
        step_ms: u32,
        /// The staggered children.
        children: Vec<Self>,
    },
}

impl From<TransitionUnit> for Transition {
    fn from(unit: TransitionUnit) -> Self {
        Self::Unit(unit)
    }
}

impl Transition {
    /// Every unit in this transition, depth first.
    pub fn units(&self) -> impl Iterator<Item = &TransitionUnit> + '_ {
        let mut stack: Vec<&Self> = alloc::vec![self];
        core::iter::from_fn(move || {
            while let Some(t) = stack.pop() {
                match t {
                    Self::Unit(unit) => return Some(unit),
                    Self::Parallel(children)
                    | Self::Sequence(children)
                    | Self::Stagger { children, .. } => stack.extend(children.iter().rev()),
                }
            }
            None
        })
    }

    /// True if some unit targets `id`.
    pub fn targets(&self, id: &TransitionId) -> bool {
        self.units().any(|u| u.target.targets(id))
    }

    /// The first unit that animates `property` of `id`.
    pub fn unit_for(
        &self,
        id: &TransitionId,
        property: AnimatedProperties,
    ) -> Option<&TransitionUnit> {
        self.units().find(|u| u.targets_property(id, property))
    }
}

/// A container resize animation derived from transitions on the root entity.
#[derive(Clone, Debug, PartialEq)]
pub struct RootBoundsTransition {
    /// The last unit found that animates the dimension.
    pub unit: TransitionUnit,
    /// The last such unit that also animates appearance, if any.
    pub appear: Option<TransitionUnit>,
}

/// Fold `transition`'s units animating `property` of `root_id` into `out`.
///
/// Later units win, matching the order in which transitions were collected.
pub fn collect_root_bounds_transitions(
    root_id: &TransitionId,
    transition: &Transition,
    property: AnimatedProperties,
    out: &mut Option<RootBoundsTransition>,
) {
    for unit in transition.units() {
        if !unit.targets_property(root_id, property) {
            continue;
        }
        let appear = if unit.appear_from.is_some() {
            Some(unit.clone())
        } else {
            out.as_mut().and_then(|prev| prev.appear.take())
        };
        *out = Some(RootBoundsTransition {
            unit: unit.clone(),
            appear,
        });
    }
}

/// Fold a pass's transitions into one root transition.
///
/// Empty gives `None`, one transition is returned as is, more become a
/// parallel set.
pub fn root_transition(mut all: Vec<Transition>) -> Option<Transition> {
    match all.len() {
        0 => None,
        1 => all.pop(),
        _ => Some(Transition::Parallel(all)),
    }
}
