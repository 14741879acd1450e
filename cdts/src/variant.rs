// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dynamically typed values.
//!
//! [`Value`] is an owned tree mirroring what a slot can hold. [`Serializer::get_value`] extracts
//! whatever the current slot contains (the "any" read), and [`Serializer::add_value`] writes a
//! tree back through the array protocol. Both walk the tree with an explicit stack, as do
//! cloning, comparing and dropping a [`Value`].

use alloc::vec;
use alloc::vec::Vec;
use core::{fmt, mem, slice};

use crate::chars::{Char8, Char16, Char32};
use crate::error::SerError;
use crate::memory::{self, AllocKind, Allocator};
use crate::serializer::Serializer;
use crate::types::MetaffiType;
use crate::value::{Callable, Cdt, Handle};

/// An owned, dynamically typed value.
///
/// `Debug` output stops descending after a few array levels.
pub enum Value {
    /// Explicit null.
    Null,
    /// `float64`.
    Float64(f64),
    /// `float32`.
    Float32(f32),
    /// `int8`.
    Int8(i8),
    /// `int16`.
    Int16(i16),
    /// `int32`.
    Int32(i32),
    /// `int64`.
    Int64(i64),
    /// `uint8`.
    Uint8(u8),
    /// `uint16`.
    Uint16(u16),
    /// `uint32`.
    Uint32(u32),
    /// `uint64`.
    Uint64(u64),
    /// `bool`.
    Bool(bool),
    /// `char8`.
    Char8(Char8),
    /// `char16`.
    Char16(Char16),
    /// `char32`.
    Char32(Char32),
    /// `string8`.
    String8(Option<Vec<u8>>),
    /// `string16`.
    String16(Option<Vec<u16>>),
    /// `string32`.
    String32(Option<Vec<u32>>),
    /// `handle`.
    Handle(Handle),
    /// `callable`.
    Callable(Callable),
    /// A nested array.
    Array {
        /// Element type, without the array flag.
        element_type: MetaffiType,
        /// The elements. May be ragged or mixed.
        items: Vec<Self>,
    },
}

impl Value {
    /// Returns the type tag this value is written with.
    #[must_use]
    pub fn type_tag(&self) -> MetaffiType {
        match self {
            Self::Null => MetaffiType::NULL,
            Self::Float64(_) => MetaffiType::FLOAT64,
            Self::Float32(_) => MetaffiType::FLOAT32,
            Self::Int8(_) => MetaffiType::INT8,
            Self::Int16(_) => MetaffiType::INT16,
            Self::Int32(_) => MetaffiType::INT32,
            Self::Int64(_) => MetaffiType::INT64,
            Self::Uint8(_) => MetaffiType::UINT8,
            Self::Uint16(_) => MetaffiType::UINT16,
            Self::Uint32(_) => MetaffiType::UINT32,
            Self::Uint64(_) => MetaffiType::UINT64,
            Self::Bool(_) => MetaffiType::BOOL,
            Self::Char8(_) => MetaffiType::CHAR8,
            Self::Char16(_) => MetaffiType::CHAR16,
            Self::Char32(_) => MetaffiType::CHAR32,
            Self::String8(_) => MetaffiType::STRING8,
            Self::String16(_) => MetaffiType::STRING16,
            Self::String32(_) => MetaffiType::STRING32,
            Self::Handle(_) => MetaffiType::HANDLE,
            Self::Callable(_) => MetaffiType::CALLABLE,
            Self::Array { element_type, .. } => element_type.array_of(),
        }
    }

    /// Builds a 1-D array value from scalars.
    pub fn array<T: Into<Self>>(
        element_type: MetaffiType,
        items: impl IntoIterator<Item = T>,
    ) -> Self {
        Self::Array {
            element_type,
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    // Copies a non-array slot.
    fn copy_scalar(cdt: &Cdt, alloc: &dyn Allocator) -> Result<Self, SerError> {
        Ok(match cdt {
            Cdt::Null => Self::Null,
            Cdt::Float64(v) => Self::Float64(*v),
            Cdt::Float32(v) => Self::Float32(*v),
            Cdt::Int8(v) => Self::Int8(*v),
            Cdt::Int16(v) => Self::Int16(*v),
            Cdt::Int32(v) => Self::Int32(*v),
            Cdt::Int64(v) => Self::Int64(*v),
            Cdt::Uint8(v) => Self::Uint8(*v),
            Cdt::Uint16(v) => Self::Uint16(*v),
            Cdt::Uint32(v) => Self::Uint32(*v),
            Cdt::Uint64(v) => Self::Uint64(*v),
            Cdt::Bool(v) => Self::Bool(*v),
            Cdt::Char8(v) => Self::Char8(*v),
            Cdt::Char16(v) => Self::Char16(*v),
            Cdt::Char32(v) => Self::Char32(*v),
            Cdt::String8(s) => Self::String8(copy(alloc, AllocKind::String8, s.as_deref())?),
            Cdt::String16(s) => Self::String16(copy(alloc, AllocKind::String16, s.as_deref())?),
            Cdt::String32(s) => Self::String32(copy(alloc, AllocKind::String32, s.as_deref())?),
            Cdt::Handle(h) => Self::Handle(h.as_deref().copied().unwrap_or_default()),
            Cdt::Callable(Some(c)) => Self::Callable(Callable {
                value: c.value,
                params: memory::copy_units(alloc, AllocKind::TypeArray, &c.params)?,
                retvals: memory::copy_units(alloc, AllocKind::TypeArray, &c.retvals)?,
            }),
            Cdt::Callable(None) => Self::Callable(Callable::default()),
            Cdt::Empty | Cdt::Array { .. } => {
                return Err(SerError::TypeMismatch {
                    expected: MetaffiType::ANY,
                    actual: cdt.type_tag(),
                });
            }
        })
    }
}

macro_rules! leaf_ops {
    (copy: $($copy:ident),*; clone: $($owned:ident),*;) => {
        impl Value {
            // Copies a value; an array comes back without its elements.
            fn clone_shallow(&self) -> Self {
                match self {
                    Self::Null => Self::Null,
                    $(Self::$copy(v) => Self::$copy(*v),)*
                    $(Self::$owned(v) => Self::$owned(v.clone()),)*
                    Self::Array { element_type, .. } => Self::Array {
                        element_type: *element_type,
                        items: Vec::new(),
                    },
                }
            }

            // Compares two values, arrays by element type only.
            fn eq_shallow(&self, other: &Self) -> bool {
                match (self, other) {
                    (Self::Null, Self::Null) => true,
                    $((Self::$copy(a), Self::$copy(b)) => a == b,)*
                    $((Self::$owned(a), Self::$owned(b)) => a == b,)*
                    (
                        Self::Array { element_type: a, .. },
                        Self::Array { element_type: b, .. },
                    ) => a == b,
                    _ => false,
                }
            }

            // Formats a value, arrays by element type and length only.
            fn fmt_shallow(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    Self::Null => f.write_str("Null"),
                    $(Self::$copy(v) => f.debug_tuple(stringify!($copy)).field(v).finish(),)*
                    $(Self::$owned(v) => f.debug_tuple(stringify!($owned)).field(v).finish(),)*
                    Self::Array {
                        element_type,
                        items,
                    } => f
                        .debug_struct("Array")
                        .field("element_type", element_type)
                        .field("len", &items.len())
                        .finish_non_exhaustive(),
                }
            }
        }
    };
}

leaf_ops! {
    copy: Float64, Float32, Int8, Int16, Int32, Int64, Uint8, Uint16, Uint32, Uint64, Bool,
        Char8, Char16, Char32, Handle;
    clone: String8, String16, String32, Callable;
}

// An array being copied: its element type, the elements left, and the copies so far.
struct CloneLevel<'a> {
    element_type: MetaffiType,
    rest: slice::Iter<'a, Value>,
    out: Vec<Value>,
}

impl<'a> CloneLevel<'a> {
    fn new(element_type: MetaffiType, items: &'a [Value]) -> Self {
        Self {
            element_type,
            rest: items.iter(),
            out: Vec::with_capacity(items.len()),
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        let Self::Array {
            element_type,
            items,
        } = self
        else {
            return self.clone_shallow();
        };
        let mut parents = Vec::new();
        let mut level = CloneLevel::new(*element_type, items);
        loop {
            match level.rest.next() {
                Some(Self::Array {
                    element_type,
                    items,
                }) => {
                    let child = CloneLevel::new(*element_type, items);
                    parents.push(mem::replace(&mut level, child));
                }
                Some(leaf) => level.out.push(leaf.clone_shallow()),
                None => {
                    let done = Self::Array {
                        element_type: level.element_type,
                        items: level.out,
                    };
                    let Some(parent) = parents.pop() else {
                        return done;
                    };
                    level = parent;
                    level.out.push(done);
                }
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some(pair) = pending.pop() {
            match pair {
                (
                    Self::Array {
                        element_type: ta,
                        items: ia,
                    },
                    Self::Array {
                        element_type: tb,
                        items: ib,
                    },
                ) => {
                    if ta != tb || ia.len() != ib.len() {
                        return false;
                    }
                    pending.extend(ia.iter().zip(ib));
                }
                (a, b) => {
                    if !a.eq_shallow(b) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

// Array levels printed in full by `Debug`.
const DEBUG_DEPTH: usize = 8;

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        LimitedDebug {
            value: self,
            levels: DEBUG_DEPTH,
        }
        .fmt(f)
    }
}

struct LimitedDebug<'a> {
    value: &'a Value,
    levels: usize,
}

impl fmt::Debug for LimitedDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.value, self.levels.checked_sub(1)) {
            (
                Value::Array {
                    element_type,
                    items,
                },
                Some(levels),
            ) => f
                .debug_struct("Array")
                .field("element_type", element_type)
                .field(
                    "items",
                    &ItemsDebug {
                        items,
                        levels,
                    },
                )
                .finish(),
            (value, _) => value.fmt_shallow(f),
        }
    }
}

struct ItemsDebug<'a> {
    items: &'a [Value],
    levels: usize,
}

impl fmt::Debug for ItemsDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.items.iter().map(|value| LimitedDebug {
                value,
                levels: self.levels,
            }))
            .finish()
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        let Self::Array { items, .. } = self else {
            return;
        };
        let mut pending = mem::take(items);
        while let Some(mut value) = pending.pop() {
            if let Self::Array { items, .. } = &mut value {
                pending.append(items);
            }
        }
    }
}

fn copy<T: Copy>(
    alloc: &dyn Allocator,
    kind: AllocKind,
    units: Option<&[T]>,
) -> Result<Option<Vec<T>>, SerError> {
    Ok(units
        .map(|u| memory::copy_units(alloc, kind, u))
        .transpose()?)
}

macro_rules! from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

from_scalar!(
    f64 => Float64,
    f32 => Float32,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    bool => Bool,
    Char8 => Char8,
    Char16 => Char16,
    Char32 => Char32,
    Handle => Handle,
    Callable => Callable,
);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String8(Some(s.as_bytes().to_vec()))
    }
}

struct OpenArray {
    element_type: MetaffiType,
    remaining: usize,
    items: Vec<Value>,
}

impl Serializer<'_> {
    /// Writes `value` (recursively, for arrays) and advances.
    ///
    /// On error the arrays opened for `value` are dropped, so the cursor and the target slot are
    /// as they were before the call.
    pub fn add_value(&mut self, value: &Value) -> Result<(), SerError> {
        let (depth, index) = (self.depth(), self.index());
        let result = self.write_value(value);
        if result.is_err() {
            self.unwind(depth, index);
        }
        result
    }

    /// Reads whatever the current slot holds (recursively, for arrays) and advances.
    ///
    /// A never-written slot is a [`SerError::TypeMismatch`] against [`MetaffiType::ANY`]. On
    /// error, including one deep inside an array, the cursor is moved back to the slot.
    pub fn get_value(&mut self) -> Result<Value, SerError> {
        let (depth, index) = (self.depth(), self.index());
        let result = self.read_value();
        if result.is_err() {
            self.unwind(depth, index);
        }
        result
    }

    fn write_value(&mut self, value: &Value) -> Result<(), SerError> {
        let mut stack = Vec::new();
        stack.push(slice::from_ref(value).iter());
        while let Some(level) = stack.last_mut() {
            match level.next() {
                Some(Value::Array {
                    element_type,
                    items,
                }) => {
                    self.add_array_begin(items.len(), *element_type)?;
                    stack.push(items.iter());
                }
                Some(v) => self.add_scalar_value(v)?,
                None => {
                    stack.pop();
                    if !stack.is_empty() {
                        self.add_array_end()?;
                    }
                }
            }
        }
        Ok(())
    }

    fn read_value(&mut self) -> Result<Value, SerError> {
        let mut stack: Vec<OpenArray> = Vec::new();
        loop {
            let done = if stack.last().is_some_and(|top| top.remaining == 0) {
                self.get_array_end()?;
                let Some(top) = stack.pop() else {
                    break Err(SerError::InvalidState {
                        what: "value stack underflow",
                    });
                };
                Value::Array {
                    element_type: top.element_type,
                    items: top.items,
                }
            } else if self.peek_type()?.is_array() {
                let (length, element_type) = self.get_array_begin()?;
                stack.push(OpenArray {
                    element_type,
                    remaining: length,
                    items: Vec::with_capacity(length),
                });
                continue;
            } else {
                self.get_scalar_value()?
            };
            match stack.last_mut() {
                Some(parent) => {
                    parent.items.push(done);
                    parent.remaining -= 1;
                }
                None => break Ok(done),
            }
        }
    }

    fn add_scalar_value(&mut self, value: &Value) -> Result<(), SerError> {
        match value {
            Value::Null => self.add_null(),
            Value::Float64(v) => self.add_float64(*v),
            Value::Float32(v) => self.add_float32(*v),
            Value::Int8(v) => self.add_int8(*v),
            Value::Int16(v) => self.add_int16(*v),
            Value::Int32(v) => self.add_int32(*v),
            Value::Int64(v) => self.add_int64(*v),
            Value::Uint8(v) => self.add_uint8(*v),
            Value::Uint16(v) => self.add_uint16(*v),
            Value::Uint32(v) => self.add_uint32(*v),
            Value::Uint64(v) => self.add_uint64(*v),
            Value::Bool(v) => self.add_bool(*v),
            Value::Char8(v) => self.add_char8(*v),
            Value::Char16(v) => self.add_char16(*v),
            Value::Char32(v) => self.add_char32(*v),
            Value::String8(s) => self.add_string8(s.as_deref()),
            Value::String16(s) => self.add_string16(s.as_deref()),
            Value::String32(s) => self.add_string32(s.as_deref()),
            Value::Handle(h) => self.add_handle(h),
            Value::Callable(c) => self.add_callable(c),
            Value::Array { .. } => Err(SerError::InvalidState {
                what: "array value passed as scalar",
            }),
        }
    }

    fn get_scalar_value(&mut self) -> Result<Value, SerError> {
        let tag = self.peek_type()?;
        self.read(tag, Value::copy_scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::BudgetAllocator;
    use crate::sequence::Cdts;
    use crate::value::ForeignPtr;

    fn ragged() -> Value {
        Value::Array {
            element_type: MetaffiType::INT32,
            items: vec![
                Value::array(MetaffiType::INT32, [1_i32]),
                Value::array(MetaffiType::INT32, [2_i32, 3]),
                Value::array(MetaffiType::INT32, [4_i32, 5, 6]),
            ],
        }
    }

    #[test]
    fn ragged_tree_round_trips() {
        let mut data = Cdts::new(2);
        let mut ser = Serializer::new(&mut data);
        let tree = ragged();
        ser.add_value(&tree).unwrap();
        ser.add_value(&Value::from("tail")).unwrap();
        assert!(!ser.has_more());
        ser.reset();
        assert_eq!(ser.get_value(), Ok(tree));
        assert_eq!(ser.get_value(), Ok(Value::String8(Some(b"tail".to_vec()))));
    }

    #[test]
    fn mixed_scalars() {
        let values = [
            Value::Null,
            Value::from(-1.25_f32),
            Value::from(Char16::from('ж')),
            Value::String16(None),
            Value::from(Handle {
                value: ForeignPtr(9),
                runtime_id: 2,
                release: ForeignPtr::NULL,
            }),
            Value::from(Callable::new(ForeignPtr(3), &[MetaffiType::ANY], &[])),
        ];
        let mut data = Cdts::new(values.len());
        let mut ser = Serializer::new(&mut data);
        for v in &values {
            ser.add_value(v).unwrap();
        }
        ser.reset();
        for v in &values {
            assert_eq!(ser.get_value().as_ref(), Ok(v));
        }
    }

    #[test]
    fn empty_arrays_nest() {
        let tree = Value::Array {
            element_type: MetaffiType::UINT8,
            items: vec![Value::array::<u8>(MetaffiType::UINT8, [])],
        };
        let mut data = Cdts::new(1);
        let mut ser = Serializer::new(&mut data);
        ser.add_value(&tree).unwrap();
        ser.reset();
        assert_eq!(ser.get_value(), Ok(tree));
    }

    fn deep(depth: usize) -> Value {
        let mut value = Value::from(1_i8);
        for _ in 0..depth {
            value = Value::Array {
                element_type: MetaffiType::INT8,
                items: vec![value],
            };
        }
        value
    }

    #[test]
    fn deep_value_round_trips_clones_and_drops() {
        const DEPTH: usize = 20_000;
        let tree = deep(DEPTH);
        let mut data = Cdts::new(1);
        let mut ser = Serializer::new(&mut data);
        ser.add_value(&tree).unwrap();
        ser.reset();
        let read = ser.get_value().unwrap();
        assert!(read == tree, "read tree differs");
        let copy = read.clone();
        drop(read);
        assert!(copy == tree, "cloned tree differs");
        assert!(copy != deep(DEPTH - 1), "shallower tree compares equal");
    }

    #[test]
    fn debug_stops_descending() {
        let text = alloc::format!("{:?}", deep(20));
        assert!(text.contains("len: 1, .."));
        assert_eq!(text.matches("Array").count(), DEBUG_DEPTH + 1);
        assert_eq!(
            alloc::format!("{:?}", Value::array(MetaffiType::INT8, [1_i8])),
            "Array { element_type: MetaffiType(4), items: [Int8(1)] }"
        );
    }

    #[test]
    fn failed_get_value_leaves_cursor_on_the_slot() {
        let mut data = Cdts::new(1);
        let mut ser = Serializer::new(&mut data);
        ser.add_array_begin(2, MetaffiType::INT32).unwrap();
        ser.set_index(1).unwrap();
        ser.add_int32(5).unwrap();
        ser.add_array_end().unwrap();
        ser.reset();
        assert_eq!(
            ser.get_value(),
            Err(SerError::TypeMismatch {
                expected: MetaffiType::ANY,
                actual: MetaffiType::NONE
            })
        );
        assert_eq!(ser.depth(), 0);
        assert_eq!(ser.index(), 0);
        assert_eq!(ser.get_array_begin(), Ok((2, MetaffiType::INT32)));
    }

    #[test]
    fn failed_add_value_leaves_slot_and_cursor() {
        let alloc = BudgetAllocator::refusing(AllocKind::String8, 0);
        let mut data = Cdts::new(2);
        let mut ser = Serializer::with_allocator(&mut data, &alloc);
        ser.add_int8(7).unwrap();
        ser.set_index(0).unwrap();
        let tree = Value::Array {
            element_type: MetaffiType::ANY,
            items: vec![
                Value::from(1_i32),
                Value::Array {
                    element_type: MetaffiType::STRING8,
                    items: vec![Value::from("x")],
                },
            ],
        };
        assert!(matches!(ser.add_value(&tree), Err(SerError::Memory(_))));
        assert_eq!(ser.depth(), 0);
        assert_eq!(ser.index(), 0);
        assert_eq!(ser.get_int8(), Ok(7));
        assert_eq!(ser.peek_type(), Ok(MetaffiType::NONE));
    }

    #[test]
    fn empty_slot_is_not_a_value() {
        let mut data = Cdts::new(1);
        let mut ser = Serializer::new(&mut data);
        assert_eq!(
            ser.get_value(),
            Err(SerError::TypeMismatch {
                expected: MetaffiType::ANY,
                actual: MetaffiType::NONE
            })
        );
    }
}
