// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Serializer errors and their status codes.

use core::fmt;

use crate::memory::AllocError;
use crate::types::MetaffiType;

/// Integer status codes shared with foreign callers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// The operation succeeded.
    Success = 0,
    /// Index at or past the end of the current level.
    Bounds = 1,
    /// The slot holds a different type than requested.
    TypeMismatch = 2,
    /// A required pointer was null.
    NullPointer = 3,
    /// The cursor is inconsistent with the requested operation.
    InvalidState = 4,
    /// An allocation was refused.
    Memory = 5,
    /// An array end without a matching begin, or before every element was visited.
    InvalidArrayState = 6,
}

impl ErrorCode {
    /// Returns the integer value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Why an array begin/end pair was rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArrayStateError {
    /// No array is open.
    NotInArray,
    /// `add_array_end` before every element was written.
    NotPopulated {
        /// Elements written.
        index: usize,
        /// Declared length.
        length: usize,
    },
    /// `get_array_end` before every element was read.
    NotFullyRead {
        /// Elements read.
        index: usize,
        /// Declared length.
        length: usize,
    },
}

impl fmt::Display for ArrayStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInArray => write!(f, "Not in array context"),
            Self::NotPopulated { index, length } => {
                write!(f, "Array not fully populated: {index}/{length} elements")
            }
            Self::NotFullyRead { index, length } => {
                write!(f, "Array not fully read: {index}/{length} elements")
            }
        }
    }
}

/// A serializer operation failed. The cursor and the target slot are unchanged.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SerError {
    /// The current index is past the end of the current level.
    Bounds {
        /// The index that was used.
        index: usize,
        /// Length of the level.
        length: usize,
    },
    /// The slot holds a different type than requested.
    TypeMismatch {
        /// The requested type.
        expected: MetaffiType,
        /// The slot's type.
        actual: MetaffiType,
    },
    /// A required pointer was null.
    NullPointer {
        /// What was null.
        what: &'static str,
    },
    /// The cursor does not point where it claims to.
    InvalidState {
        /// What was inconsistent.
        what: &'static str,
    },
    /// An allocation was refused.
    Memory(AllocError),
    /// Array begin/end misuse.
    InvalidArrayState(ArrayStateError),
}

impl SerError {
    /// Returns the status code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Bounds { .. } => ErrorCode::Bounds,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::NullPointer { .. } => ErrorCode::NullPointer,
            Self::InvalidState { .. } => ErrorCode::InvalidState,
            Self::Memory(_) => ErrorCode::Memory,
            Self::InvalidArrayState(_) => ErrorCode::InvalidArrayState,
        }
    }
}

impl fmt::Display for SerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounds { index, length } => {
                write!(f, "Index out of bounds: {index} >= {length}")
            }
            Self::TypeMismatch { expected, actual } if *expected == MetaffiType::ARRAY => {
                write!(f, "Type mismatch: expected array, got {actual}")
            }
            Self::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {expected}, got {actual}")
            }
            Self::NullPointer { what } => write!(f, "{what} is NULL"),
            Self::InvalidState { what } => write!(f, "Invalid serializer state: {what}"),
            Self::Memory(e) => fmt::Display::fmt(e, f),
            Self::InvalidArrayState(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl core::error::Error for SerError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Memory(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AllocError> for SerError {
    fn from(e: AllocError) -> Self {
        Self::Memory(e)
    }
}

impl From<ArrayStateError> for SerError {
    fn from(e: ArrayStateError) -> Self {
        Self::InvalidArrayState(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::AllocKind;
    use alloc::string::ToString;

    #[test]
    fn codes_match_the_abi() {
        let cases = [
            (
                SerError::Bounds {
                    index: 0,
                    length: 0,
                },
                1,
            ),
            (
                SerError::TypeMismatch {
                    expected: MetaffiType::INT8,
                    actual: MetaffiType::INT16,
                },
                2,
            ),
            (SerError::NullPointer { what: "x" }, 3),
            (SerError::InvalidState { what: "x" }, 4),
            (
                SerError::Memory(AllocError {
                    kind: AllocKind::Memory,
                    len: 8,
                }),
                5,
            ),
            (SerError::InvalidArrayState(ArrayStateError::NotInArray), 6),
        ];
        for (err, code) in cases {
            assert_eq!(err.code().as_i32(), code, "{err}");
        }
        assert_eq!(ErrorCode::Success.as_i32(), 0);
    }

    #[test]
    fn messages() {
        assert_eq!(
            SerError::Bounds {
                index: 3,
                length: 3
            }
            .to_string(),
            "Index out of bounds: 3 >= 3"
        );
        assert_eq!(
            SerError::from(ArrayStateError::NotPopulated {
                index: 1,
                length: 2
            })
            .to_string(),
            "Array not fully populated: 1/2 elements"
        );
        assert_eq!(
            SerError::TypeMismatch {
                expected: MetaffiType::ARRAY,
                actual: MetaffiType::INT32
            }
            .to_string(),
            "Type mismatch: expected array, got metaffi_int32"
        );
        assert_eq!(
            SerError::NullPointer { what: "Serializer" }.to_string(),
            "Serializer is NULL"
        );
    }
}
