// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Affinity groups: the physical outputs of one logical animated entity.

use crate::error::AffinityError;
use crate::types::OutputType;

/// An ordered collection holding at most one element per [`OutputType`].
///
/// One component may produce several physical outputs (a background, its
/// content, a border) that all carry the same transition id. The group lets
/// those outputs be animated, tracked and torn down as one unit.
///
/// Iteration (`get_at`/`type_at`/`iter`) follows [`OutputType`] declaration
/// order, skipping empty slots. A [`OutputType::Host`] unit must be the only
/// member of its group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AffinityGroup<T> {
    slots: [Option<T>; 5],
    len: usize,
}

impl<T> Default for AffinityGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AffinityGroup<T> {
    /// Create an empty group.
    pub const fn new() -> Self {
        Self {
            slots: [None, None, None, None, None],
            len: 0,
        }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the group has no members.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add a unit of type `ty`.
    ///
    /// Fails if the slot is taken, or if the addition would mix a host unit
    /// with other units.
    pub fn add(&mut self, ty: OutputType, value: T) -> Result<(), AffinityError> {
        self.check_host_exclusive(ty)?;
        let slot = &mut self.slots[ty.slot()];
        if slot.is_some() {
            return Err(AffinityError::Occupied(ty));
        }
        *slot = Some(value);
        self.len += 1;
        Ok(())
    }

    /// Set or clear the unit of type `ty`, returning the previous one.
    pub fn replace(
        &mut self,
        ty: OutputType,
        value: Option<T>,
    ) -> Result<Option<T>, AffinityError> {
        match value {
            Some(value) => {
                if self.slots[ty.slot()].is_none() {
                    self.add(ty, value)?;
                    Ok(None)
                } else {
                    Ok(self.slots[ty.slot()].replace(value))
                }
            }
            None => Ok(self.remove(ty)),
        }
    }

    /// Clear the unit of type `ty`, returning it.
    pub fn remove(&mut self, ty: OutputType) -> Option<T> {
        let old = self.slots[ty.slot()].take();
        if old.is_some() {
            self.len -= 1;
        }
        old
    }

    /// The unit of type `ty`, if present.
    pub fn get(&self, ty: OutputType) -> Option<&T> {
        self.slots[ty.slot()].as_ref()
    }

    /// The `index`-th member in group order.
    pub fn get_at(&self, index: usize) -> Option<&T> {
        self.iter().nth(index).map(|(_, v)| v)
    }

    /// The output type of the `index`-th member in group order.
    pub fn type_at(&self, index: usize) -> Option<OutputType> {
        self.iter().nth(index).map(|(ty, _)| ty)
    }

    /// Iterate `(type, unit)` pairs in group order.
    pub fn iter(&self) -> impl Iterator<Item = (OutputType, &T)> + '_ {
        OutputType::ALL
            .into_iter()
            .filter_map(|ty| self.slots[ty.slot()].as_ref().map(|v| (ty, v)))
    }

    /// A deterministic representative: the host if present, then content,
    /// background, foreground and border.
    pub fn most_significant_unit(&self) -> Option<&T> {
        const PRIORITY: [OutputType; 5] = [
            OutputType::Host,
            OutputType::Content,
            OutputType::Background,
            OutputType::Foreground,
            OutputType::Border,
        ];
        PRIORITY.into_iter().find_map(|ty| self.get(ty))
    }

    /// True if any member equals `value`.
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|(_, v)| v == value)
    }

    /// Map every member, keeping its slot.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> AffinityGroup<U> {
        AffinityGroup {
            slots: [0, 1, 2, 3, 4].map(|i| self.slots[i].as_ref().map(&mut f)),
            len: self.len,
        }
    }

    fn check_host_exclusive(&self, ty: OutputType) -> Result<(), AffinityError> {
        let host_present = self.slots[OutputType::Host.slot()].is_some();
        let others_present = self.len > usize::from(host_present);
        match ty {
            OutputType::Host if others_present => Err(AffinityError::HostNotAlone),
            OutputType::Host => Ok(()),
            _ if host_present => Err(AffinityError::HostNotAlone),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn iteration_follows_type_order() {
        let mut g = AffinityGroup::new();
        g.add(OutputType::Border, "border").unwrap();
        g.add(OutputType::Content, "content").unwrap();
        g.add(OutputType::Background, "background").unwrap();
        let order: Vec<_> = g.iter().map(|(_, v)| *v).collect();
        assert_eq!(order, ["content", "background", "border"]);
        assert_eq!(g.type_at(2), Some(OutputType::Border));
        assert_eq!(g.get_at(1), Some(&"background"));
        assert_eq!(g.get_at(3), None);
    }

    #[test]
    fn add_rejects_occupied_slot() {
        let mut g = AffinityGroup::new();
        g.add(OutputType::Content, 1).unwrap();
        assert_eq!(
            g.add(OutputType::Content, 2),
            Err(AffinityError::Occupied(OutputType::Content))
        );
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn host_must_be_alone() {
        let mut g = AffinityGroup::new();
        g.add(OutputType::Host, 1).unwrap();
        assert_eq!(g.add(OutputType::Content, 2), Err(AffinityError::HostNotAlone));

        let mut g = AffinityGroup::new();
        g.add(OutputType::Background, 1).unwrap();
        assert_eq!(g.add(OutputType::Host, 2), Err(AffinityError::HostNotAlone));
    }

    #[test]
    fn replace_adds_swaps_and_clears() {
        let mut g = AffinityGroup::new();
        assert_eq!(g.replace(OutputType::Content, Some(1)), Ok(None));
        assert_eq!(g.replace(OutputType::Content, Some(2)), Ok(Some(1)));
        assert_eq!(g.len(), 1);
        assert_eq!(g.replace(OutputType::Content, None), Ok(Some(2)));
        assert!(g.is_empty());
        assert_eq!(g.replace(OutputType::Border, None), Ok(None));
        assert!(g.is_empty());
    }

    #[test]
    fn remove_frees_the_host_slot() {
        let mut g = AffinityGroup::new();
        g.add(OutputType::Host, 1).unwrap();
        assert_eq!(g.remove(OutputType::Content), None);
        assert_eq!(g.len(), 1);
        assert_eq!(g.remove(OutputType::Host), Some(1));
        assert!(g.is_empty());
        assert_eq!(g.remove(OutputType::Host), None);
        g.add(OutputType::Content, 2).unwrap();
        assert_eq!(g.most_significant_unit(), Some(&2));
    }

    #[test]
    fn most_significant_prefers_host_then_content() {
        let mut g = AffinityGroup::new();
        g.add(OutputType::Border, 'b').unwrap();
        g.add(OutputType::Background, 'g').unwrap();
        assert_eq!(g.most_significant_unit(), Some(&'g'));
        g.add(OutputType::Content, 'c').unwrap();
        assert_eq!(g.most_significant_unit(), Some(&'c'));

        let mut h = AffinityGroup::new();
        h.add(OutputType::Host, 'h').unwrap();
        assert_eq!(h.most_significant_unit(), Some(&'h'));
        assert!(AffinityGroup::<char>::new().most_significant_unit().is_none());
    }

    #[test]
    fn map_keeps_slots() {
        let mut g = AffinityGroup::new();
        g.add(OutputType::Foreground, 3).unwrap();
        g.add(OutputType::Content, 1).unwrap();
        let doubled = g.map(|v| v * 2);
        assert_eq!(doubled.get(OutputType::Foreground), Some(&6));
        assert_eq!(doubled.get(OutputType::Content), Some(&2));
        assert_eq!(doubled.len(), 2);
    }
}
