// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only walk over a populated tree.
//!
//! [`traverse_cdts`] visits every slot in pre-order: the slots of a sequence in index order,
//! descending into an array as soon as it is reached. Each visit carries the slot's index path
//! from the root (`[2]` is root slot 2, `[2, 0]` is the first element of the array in it).

use alloc::vec::Vec;
use core::fmt;

use crate::sequence::Cdts;
use crate::types::MetaffiType;
use crate::value::Cdt;

/// What the walk does after a visit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Visit {
    /// Keep going; for an array, descend into it.
    Continue,
    /// Do not descend into this array. Same as `Continue` for scalars.
    Skip,
    /// End the walk.
    Stop,
}

/// Receives the slots of a walk.
pub trait Visitor {
    /// A non-array slot.
    fn value(&mut self, path: &[usize], cdt: &Cdt) -> Visit;

    /// An array slot, before its elements.
    fn array(&mut self, _path: &[usize], _items: &Cdts, _element_type: MetaffiType) -> Visit {
        Visit::Continue
    }
}

/// A walk hit a slot that cannot be visited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraverseError {
    /// The slot was never written.
    EmptySlot {
        /// Where.
        path: Vec<usize>,
    },
    /// A callable slot with no record.
    NullCallable {
        /// Where.
        path: Vec<usize>,
    },
}

impl fmt::Display for TraverseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySlot { path } => write!(
                f,
                "traversed CDT must have a concrete type, found an empty slot at {path:?}"
            ),
            Self::NullCallable { path } => write!(f, "Callable value is null at {path:?}"),
        }
    }
}

impl core::error::Error for TraverseError {}

/// Walks `root`, calling `visitor` for every slot.
///
/// Returns `Ok(true)` if the walk ran to completion and `Ok(false)` if the visitor stopped it.
pub fn traverse_cdts<V: Visitor + ?Sized>(
    root: &Cdts,
    visitor: &mut V,
) -> Result<bool, TraverseError> {
    let mut stack: Vec<(&Cdts, usize)> = Vec::new();
    let mut path: Vec<usize> = Vec::new();
    stack.push((root, 0));
    while let Some(top) = stack.last_mut() {
        let (level, index) = *top;
        let Some(cdt) = level.get(index) else {
            stack.pop();
            path.pop();
            continue;
        };
        top.1 += 1;
        path.push(index);
        let decision = match cdt {
            Cdt::Empty => return Err(TraverseError::EmptySlot { path }),
            Cdt::Callable(None) => return Err(TraverseError::NullCallable { path }),
            Cdt::Array {
                element_type,
                items,
            } => {
                let decision = visitor.array(&path, items, *element_type);
                if decision == Visit::Continue {
                    // The element walk owns this path entry and pops it when it finishes.
                    stack.push((&**items, 0));
                    continue;
                }
                decision
            }
            other => visitor.value(&path, other),
        };
        path.pop();
        if decision == Visit::Stop {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::Serializer;
    use crate::variant::Value;
    use alloc::vec;

    #[derive(Default)]
    struct Paths {
        seen: Vec<(Vec<usize>, MetaffiType)>,
        skip_arrays: bool,
        stop_at: Option<usize>,
    }

    impl Visitor for Paths {
        fn value(&mut self, path: &[usize], cdt: &Cdt) -> Visit {
            self.seen.push((path.to_vec(), cdt.type_tag()));
            if self.stop_at == Some(self.seen.len()) {
                return Visit::Stop;
            }
            Visit::Continue
        }

        fn array(&mut self, path: &[usize], _: &Cdts, element_type: MetaffiType) -> Visit {
            self.seen.push((path.to_vec(), element_type.array_of()));
            if self.skip_arrays {
                Visit::Skip
            } else {
                Visit::Continue
            }
        }
    }

    fn sample() -> Cdts {
        let mut data = Cdts::new(3);
        let mut ser = Serializer::new(&mut data);
        ser.add_int8(1).unwrap();
        ser.add_value(&Value::Array {
            element_type: MetaffiType::INT32,
            items: vec![
                Value::array(MetaffiType::INT32, [2_i32]),
                Value::array(MetaffiType::INT32, [3_i32, 4]),
            ],
        })
        .unwrap();
        ser.add_bool(true).unwrap();
        drop(ser);
        data
    }

    #[test]
    fn pre_order_with_index_paths() {
        let data = sample();
        let mut v = Paths::default();
        assert_eq!(traverse_cdts(&data, &mut v), Ok(true));
        let i32a = MetaffiType::INT32.array_of();
        assert_eq!(
            v.seen,
            vec![
                (vec![0], MetaffiType::INT8),
                (vec![1], i32a),
                (vec![1, 0], i32a),
                (vec![1, 0, 0], MetaffiType::INT32),
                (vec![1, 1], i32a),
                (vec![1, 1, 0], MetaffiType::INT32),
                (vec![1, 1, 1], MetaffiType::INT32),
                (vec![2], MetaffiType::BOOL),
            ]
        );
    }

    #[test]
    fn skip_and_stop() {
        let data = sample();
        let mut v = Paths {
            skip_arrays: true,
            ..Paths::default()
        };
        assert_eq!(traverse_cdts(&data, &mut v), Ok(true));
        assert_eq!(v.seen.len(), 3);

        let mut v = Paths {
            stop_at: Some(1),
            ..Paths::default()
        };
        assert_eq!(traverse_cdts(&data, &mut v), Ok(false));
        assert_eq!(v.seen.len(), 1);
    }

    #[test]
    fn empty_slot_is_an_error() {
        let mut data = Cdts::new(2);
        Serializer::new(&mut data).add_null().unwrap();
        let mut v = Paths::default();
        assert_eq!(
            traverse_cdts(&data, &mut v),
            Err(TraverseError::EmptySlot { path: vec![1] })
        );
    }
}
