// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Statically typed access.
//!
//! [`Scalar`] maps a Rust type to its tag and serializer entry points, which gives generic
//! [`Serializer::add`]/[`Serializer::get`] and the 1-D helpers [`Serializer::add_slice`] and
//! [`Serializer::get_vec`].

use alloc::vec::Vec;

use crate::chars::{Char8, Char16, Char32};
use crate::error::SerError;
use crate::memory;
use crate::serializer::Serializer;
use crate::types::MetaffiType;
use crate::value::Cdt;

/// A value stored inline in a slot.
pub trait Scalar: Copy {
    /// The slot tag.
    const TYPE: MetaffiType;

    /// Writes `self` at the cursor.
    fn write_to(self, ser: &mut Serializer<'_>) -> Result<(), SerError>;

    /// Reads a value at the cursor.
    fn read_from(ser: &mut Serializer<'_>) -> Result<Self, SerError>;
}

macro_rules! scalar {
    ($($ty:ty => $tag:ident, $add:ident, $get:ident;)*) => {
        $(
            impl Scalar for $ty {
                const TYPE: MetaffiType = MetaffiType::$tag;

                fn write_to(self, ser: &mut Serializer<'_>) -> Result<(), SerError> {
                    ser.$add(self)
                }

                fn read_from(ser: &mut Serializer<'_>) -> Result<Self, SerError> {
                    ser.$get()
                }
            }
        )*
    };
}

scalar! {
    i8 => INT8, add_int8, get_int8;
    i16 => INT16, add_int16, get_int16;
    i32 => INT32, add_int32, get_int32;
    i64 => INT64, add_int64, get_int64;
    u8 => UINT8, add_uint8, get_uint8;
    u16 => UINT16, add_uint16, get_uint16;
    u32 => UINT32, add_uint32, get_uint32;
    u64 => UINT64, add_uint64, get_uint64;
    f32 => FLOAT32, add_float32, get_float32;
    f64 => FLOAT64, add_float64, get_float64;
    bool => BOOL, add_bool, get_bool;
    Char8 => CHAR8, add_char8, get_char8;
    Char16 => CHAR16, add_char16, get_char16;
    Char32 => CHAR32, add_char32, get_char32;
}

impl Serializer<'_> {
    /// Writes any [`Scalar`] and advances.
    pub fn add<T: Scalar>(&mut self, value: T) -> Result<(), SerError> {
        value.write_to(self)
    }

    /// Reads any [`Scalar`] and advances.
    pub fn get<T: Scalar>(&mut self) -> Result<T, SerError> {
        T::read_from(self)
    }

    /// Writes `values` as a complete 1-D array in the current slot and advances.
    pub fn add_slice<T: Scalar>(&mut self, values: &[T]) -> Result<(), SerError> {
        self.add_array_begin(values.len(), T::TYPE)?;
        for &v in values {
            v.write_to(self)?;
        }
        self.add_array_end()
    }

    /// Reads a complete 1-D array of `T` and advances.
    ///
    /// Every element is type-checked before the array is opened, so a mismatch leaves the cursor
    /// on the array slot.
    pub fn get_vec<T: Scalar>(&mut self) -> Result<Vec<T>, SerError> {
        let length = self.check_homogeneous(T::TYPE)?;
        let mut out = Vec::new();
        out.try_reserve_exact(length).map_err(|_| {
            SerError::Memory(memory::AllocError {
                kind: memory::AllocKind::Memory,
                len: length.saturating_mul(size_of::<T>()),
            })
        })?;
        self.get_array_begin()?;
        for _ in 0..length {
            out.push(T::read_from(self)?);
        }
        self.get_array_end()?;
        Ok(out)
    }

    fn check_homogeneous(&self, element: MetaffiType) -> Result<usize, SerError> {
        let items = match self.peek_slot()? {
            Cdt::Array { items, .. } => items,
            other => {
                return Err(SerError::TypeMismatch {
                    expected: element.array_of(),
                    actual: other.type_tag(),
                });
            }
        };
        if let Some(bad) = items.iter().find(|c| c.type_tag() != element) {
            return Err(SerError::TypeMismatch {
                expected: element,
                actual: bad.type_tag(),
            });
        }
        Ok(items.len())
    }
}
