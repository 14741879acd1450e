// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared fixtures for the conformance tests.
//!
//! A write is described as a list of [`Step`]s so the same script can be replayed against a
//! reference sequence and against one whose allocator refuses requests.

use cdts::{Callable, Cdts, ForeignPtr, MetaffiType, SerError, Serializer};

/// One serializer write.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// `add_array_begin`.
    Begin(usize, MetaffiType),
    /// `add_array_end`.
    End,
    /// `add_int32`.
    Int32(i32),
    /// `add_string8`.
    String8(Option<&'static [u8]>),
    /// `add_callable`.
    Callable(Callable),
    /// `add_null`.
    Null,
}

impl Step {
    /// Performs the write.
    pub fn apply(&self, ser: &mut Serializer<'_>) -> Result<(), SerError> {
        match self {
            Self::Begin(length, ty) => ser.add_array_begin(*length, *ty),
            Self::End => ser.add_array_end(),
            Self::Int32(v) => ser.add_int32(*v),
            Self::String8(s) => ser.add_string8(*s),
            Self::Callable(c) => ser.add_callable(c),
            Self::Null => ser.add_null(),
        }
    }
}

/// A script that touches every kind of allocation: slot arrays, frames, strings, records and
/// type arrays.
#[must_use]
pub fn mixed_script() -> Vec<Step> {
    vec![
        Step::String8(Some(b"root")),
        Step::Begin(2, MetaffiType::ANY),
        Step::Begin(1, MetaffiType::STRING8),
        Step::String8(Some(b"leaf")),
        Step::End,
        Step::Callable(Callable::new(
            ForeignPtr(0x40),
            &[MetaffiType::INT32, MetaffiType::STRING8],
            &[MetaffiType::BOOL],
        )),
        Step::End,
        Step::Null,
        Step::Int32(-1),
    ]
}

/// Root length needed by [`mixed_script`].
pub const MIXED_SCRIPT_ROOT_LEN: usize = 4;

/// Writes `rows` as a 2-level `int32` array in the current slot.
pub fn write_int32_rows(ser: &mut Serializer<'_>, rows: &[&[i32]]) -> Result<(), SerError> {
    ser.add_array_begin(rows.len(), MetaffiType::INT32)?;
    for row in rows {
        ser.add_slice(row)?;
    }
    ser.add_array_end()
}

/// Reads a 2-level `int32` array from the current slot.
pub fn read_int32_rows(ser: &mut Serializer<'_>) -> Result<Vec<Vec<i32>>, SerError> {
    let (rows, _) = ser.get_array_begin()?;
    let mut out = Vec::with_capacity(rows);
    for _ in 0..rows {
        out.push(ser.get_vec::<i32>()?);
    }
    ser.get_array_end()?;
    Ok(out)
}

/// Builds `len` root slots by running `write`.
pub fn build(
    len: usize,
    write: impl FnOnce(&mut Serializer<'_>) -> Result<(), SerError>,
) -> Result<Cdts, SerError> {
    let mut data = Cdts::new(len);
    write(&mut Serializer::new(&mut data))?;
    Ok(data)
}
