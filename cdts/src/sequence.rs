// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-length slot sequences.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::{fmt, mem};

use crate::memory::{self, AllocError, Allocator};
use crate::types::{MIXED_OR_UNKNOWN_DIMENSIONS, MetaffiType};
use crate::value::Cdt;

/// A fixed-length sequence of slots.
///
/// The length is set at construction and never changes. Slots start [`Cdt::Empty`] and are
/// written through a [`Serializer`](crate::Serializer). Dropping, cloning and comparing a
/// sequence walk the tree below it without recursing on the native stack. `Debug` output stops
/// descending after a few levels.
pub struct Cdts {
    slots: Vec<Cdt>,
    fixed_dimensions: i64,
    pooled: bool,
}

impl Cdts {
    /// Creates `length` empty slots with unknown dimensionality.
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self::with_dimensions(length, MIXED_OR_UNKNOWN_DIMENSIONS)
    }

    /// Creates `length` empty slots with a declared dimensionality.
    #[must_use]
    pub fn with_dimensions(length: usize, fixed_dimensions: i64) -> Self {
        let mut slots = Vec::with_capacity(length);
        slots.resize_with(length, Cdt::default);
        Self::from_slots(slots, fixed_dimensions)
    }

    /// Like [`Cdts::with_dimensions`], with the slot array granted by `alloc`.
    pub fn try_with_dimensions_in(
        alloc: &dyn Allocator,
        length: usize,
        fixed_dimensions: i64,
    ) -> Result<Self, AllocError> {
        let slots = memory::cdt_array(alloc, length)?;
        Ok(Self::from_slots(slots, fixed_dimensions))
    }

    pub(crate) fn from_slots(slots: Vec<Cdt>, fixed_dimensions: i64) -> Self {
        Self {
            slots,
            fixed_dimensions,
            pooled: false,
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if there are no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Declared dimensionality; informational only.
    #[must_use]
    pub fn fixed_dimensions(&self) -> i64 {
        self.fixed_dimensions
    }

    /// Returns `true` if the slot buffer came from a [`CdtsPool`](crate::CdtsPool).
    #[must_use]
    pub fn is_pooled(&self) -> bool {
        self.pooled
    }

    /// Returns slot `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Cdt> {
        self.slots.get(index)
    }

    /// Returns all slots.
    #[must_use]
    pub fn as_slice(&self) -> &[Cdt] {
        &self.slots
    }

    /// Iterates over the slots.
    pub fn iter(&self) -> core::slice::Iter<'_, Cdt> {
        self.slots.iter()
    }

    /// Empties every slot, freeing owned payloads. The length is kept.
    pub fn clear(&mut self) {
        let mut pending = Vec::new();
        detach_nested(&mut self.slots, &mut pending);
        for slot in &mut self.slots {
            *slot = Cdt::Empty;
        }
        drain(pending);
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Cdt> {
        self.slots.get_mut(index)
    }

    pub(crate) fn set_pooled(&mut self, pooled: bool) {
        self.pooled = pooled;
    }

    /// Takes the slot buffer, leaving this sequence empty.
    pub(crate) fn take_slots(&mut self) -> Vec<Cdt> {
        mem::take(&mut self.slots)
    }
}

impl<'a> IntoIterator for &'a Cdts {
    type Item = &'a Cdt;
    type IntoIter = core::slice::Iter<'a, Cdt>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

// A sequence being copied: the source, the element type of the slot that holds it, and the
// slots copied so far.
struct CloneFrame<'a> {
    src: &'a Cdts,
    element_type: MetaffiType,
    out: Vec<Cdt>,
}

impl<'a> CloneFrame<'a> {
    fn new(src: &'a Cdts, element_type: MetaffiType) -> Self {
        Self {
            src,
            element_type,
            out: Vec::with_capacity(src.len()),
        }
    }
}

impl Clone for Cdts {
    fn clone(&self) -> Self {
        let mut parents = Vec::new();
        let mut frame = CloneFrame::new(self, MetaffiType::NONE);
        loop {
            let src = frame.src;
            match src.slots.get(frame.out.len()) {
                Some(Cdt::Array {
                    element_type,
                    items,
                }) => {
                    let child = CloneFrame::new(items, *element_type);
                    parents.push(mem::replace(&mut frame, child));
                }
                Some(slot) => frame.out.push(slot.clone()),
                None => {
                    let element_type = frame.element_type;
                    let copy = Self {
                        slots: frame.out,
                        fixed_dimensions: src.fixed_dimensions,
                        pooled: src.pooled,
                    };
                    let Some(parent) = parents.pop() else {
                        return copy;
                    };
                    frame = parent;
                    frame.out.push(Cdt::Array {
                        element_type,
                        items: Box::new(copy),
                    });
                }
            }
        }
    }
}

impl PartialEq for Cdts {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            if a.fixed_dimensions != b.fixed_dimensions
                || a.pooled != b.pooled
                || a.slots.len() != b.slots.len()
            {
                return false;
            }
            for pair in a.slots.iter().zip(&b.slots) {
                match pair {
                    (
                        Cdt::Array {
                            element_type: ta,
                            items: ia,
                        },
                        Cdt::Array {
                            element_type: tb,
                            items: ib,
                        },
                    ) => {
                        if ta != tb {
                            return false;
                        }
                        pending.push((&**ia, &**ib));
                    }
                    (x, y) => {
                        if x != y {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }
}

// Array levels printed in full by `Debug`; deeper arrays print their length only.
const DEBUG_DEPTH: usize = 8;

impl fmt::Debug for Cdts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        LimitedDebug {
            cdts: self,
            levels: DEBUG_DEPTH,
        }
        .fmt(f)
    }
}

struct LimitedDebug<'a> {
    cdts: &'a Cdts,
    levels: usize,
}

impl fmt::Debug for LimitedDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cdts")
            .field(
                "slots",
                &SlotsDebug {
                    slots: &self.cdts.slots,
                    levels: self.levels,
                },
            )
            .field("fixed_dimensions", &self.cdts.fixed_dimensions)
            .field("pooled", &self.cdts.pooled)
            .finish()
    }
}

struct SlotsDebug<'a> {
    slots: &'a [Cdt],
    levels: usize,
}

impl fmt::Debug for SlotsDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for slot in self.slots {
            match slot {
                Cdt::Array {
                    element_type,
                    items,
                } => match self.levels.checked_sub(1) {
                    Some(levels) => list.entry(&ArrayDebug {
                        element_type: *element_type,
                        items: &LimitedDebug {
                            cdts: items,
                            levels,
                        },
                    }),
                    None => list.entry(&ArrayDebug {
                        element_type: *element_type,
                        items: &Elided(items.len()),
                    }),
                },
                other => list.entry(other),
            };
        }
        list.finish()
    }
}

struct ArrayDebug<'a> {
    element_type: MetaffiType,
    items: &'a dyn fmt::Debug,
}

impl fmt::Debug for ArrayDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("element_type", &self.element_type)
            .field("items", self.items)
            .finish()
    }
}

struct Elided(usize);

impl fmt::Debug for Elided {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cdts {{ len: {}, .. }}", self.0)
    }
}

impl Drop for Cdts {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_nested(&mut self.slots, &mut pending);
        drain(pending);
    }
}

// Moves the slot buffers of nested arrays onto `pending` so that dropping `slots` never recurses
// more than one level.
fn detach_nested(slots: &mut [Cdt], pending: &mut Vec<Vec<Cdt>>) {
    for slot in slots {
        if let Cdt::Array { items, .. } = slot {
            let nested = items.take_slots();
            if !nested.is_empty() {
                pending.push(nested);
            }
        }
    }
}

fn drain(mut pending: Vec<Vec<Cdt>>) {
    while let Some(mut slots) = pending.pop() {
        detach_nested(&mut slots, &mut pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nest(depth: usize) -> Cdts {
        let mut root = Cdts::new(1);
        for _ in 0..depth {
            let mut outer = Cdts::new(1);
            *outer.slot_mut(0).unwrap() = Cdt::Array {
                element_type: MetaffiType::INT8,
                items: Box::new(root),
            };
            root = outer;
        }
        root
    }

    #[test]
    fn new_sequence_is_empty_slots() {
        let c = Cdts::new(3);
        assert_eq!(c.len(), 3);
        assert_eq!(c.fixed_dimensions(), MIXED_OR_UNKNOWN_DIMENSIONS);
        assert!(c.iter().all(Cdt::is_empty));
        assert!(!c.is_pooled());
    }

    #[test]
    fn very_deep_tree_drops_without_overflow() {
        drop(nest(200_000));
    }

    #[test]
    fn very_deep_tree_clones_and_compares_without_overflow() {
        let tree = nest(200_000);
        let copy = tree.clone();
        assert_eq!(tree, copy);
        let other = nest(199_999);
        assert_ne!(tree, other);
        drop(Cdt::Array {
            element_type: MetaffiType::INT8,
            items: Box::new(copy),
        }
        .clone());
    }

    #[test]
    fn clone_keeps_leaves_and_shape() {
        let mut tree = nest(2);
        let mut copy = tree.clone();
        assert_eq!(copy, tree);
        *copy.slot_mut(0).unwrap() = Cdt::Int8(1);
        assert_ne!(copy, tree);
        tree.set_pooled(true);
        assert_ne!(tree.clone(), nest(2));
    }

    #[test]
    fn debug_stops_descending() {
        let text = alloc::format!("{:?}", nest(20));
        assert!(text.contains("len: 1, .."));
        assert_eq!(text.matches("Array").count(), DEBUG_DEPTH + 1);
        assert!(!alloc::format!("{:?}", nest(2)).contains(".."));
    }

    #[test]
    fn clear_keeps_length() {
        let mut c = nest(3);
        c.clear();
        assert_eq!(c.len(), 1);
        assert!(c.get(0).unwrap().is_empty());
    }

    #[test]
    fn allocation_can_be_refused() {
        let a = crate::memory::BudgetAllocator::new(0);
        let err = Cdts::try_with_dimensions_in(&a, 4, 1).unwrap_err();
        assert_eq!(err.kind, crate::memory::AllocKind::CdtArray);
    }
}
