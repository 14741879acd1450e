// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Building a tree from a pull-based source.
//!
//! A front end that knows its values by position implements [`ValueSource`]; [`construct_cdts`]
//! asks it for the root length, then for the type of each index path, and writes what it gets
//! through a [`Serializer`], so the result obeys the same rules as a hand-written one.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::error::SerError;
use crate::memory::{AllocError, Allocator};
use crate::sequence::Cdts;
use crate::serializer::Serializer;
use crate::types::{MIXED_OR_UNKNOWN_DIMENSIONS, MetaffiType, TypeInfo, TypeKind};
use crate::variant::Value;

/// Shape of an array reported by a source.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ArrayMetadata {
    /// Number of elements.
    pub length: usize,
    /// Common element type, or [`MetaffiType::ANY`] for mixed elements.
    pub element_type: MetaffiType,
}

/// Supplies values by index path.
pub trait ValueSource {
    /// Number of root values.
    fn root_len(&mut self) -> usize;

    /// Declared type at `path`. Must be concrete (not [`MetaffiType::ANY`]).
    fn type_info(&mut self, path: &[usize]) -> Result<TypeInfo, ConstructError>;

    /// Shape of the array at `path`.
    fn array_metadata(&mut self, path: &[usize]) -> Result<ArrayMetadata, ConstructError>;

    /// The non-array value at `path`, which must be of `kind`.
    fn scalar(&mut self, path: &[usize], kind: TypeKind) -> Result<Value, ConstructError>;
}

/// Construction failed.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstructError {
    /// The source reported [`MetaffiType::ANY`].
    DynamicType {
        /// Where.
        path: Vec<usize>,
    },
    /// The source reported a tag that names no kind.
    UnknownType {
        /// Where.
        path: Vec<usize>,
        /// The tag.
        ty: MetaffiType,
    },
    /// The source returned a value of another kind than it declared.
    Mismatch {
        /// Where.
        path: Vec<usize>,
        /// Declared.
        expected: MetaffiType,
        /// Returned.
        actual: MetaffiType,
    },
    /// The source failed.
    Source {
        /// Where.
        path: Vec<usize>,
        /// Why.
        message: Box<str>,
    },
    /// The serializer rejected a write.
    Serializer(SerError),
}

impl fmt::Display for ConstructError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DynamicType { path } => write!(
                f,
                "get_type_info must return a concrete type, not dynamic type like metaffi_any (at {path:?})"
            ),
            Self::UnknownType { path, ty } => {
                write!(f, "Unknown type while constructing CDTS: {} (at {path:?})", ty.0)
            }
            Self::Mismatch {
                path,
                expected,
                actual,
            } => write!(
                f,
                "source declared {expected} but returned {actual} (at {path:?})"
            ),
            Self::Source { path, message } => write!(f, "{message} (at {path:?})"),
            Self::Serializer(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl core::error::Error for ConstructError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Serializer(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SerError> for ConstructError {
    fn from(e: SerError) -> Self {
        Self::Serializer(e)
    }
}

impl From<AllocError> for ConstructError {
    fn from(e: AllocError) -> Self {
        Self::Serializer(SerError::Memory(e))
    }
}

/// Builds a new root sequence from `source`.
pub fn construct_cdts<S: ValueSource + ?Sized>(
    source: &mut S,
    alloc: &dyn Allocator,
) -> Result<Cdts, ConstructError> {
    let root_len = source.root_len();
    let mut root = Cdts::try_with_dimensions_in(alloc, root_len, MIXED_OR_UNKNOWN_DIMENSIONS)?;
    let mut ser = Serializer::with_allocator(&mut root, alloc);
    // (length, next index) per open level; the root is level 0.
    let mut levels: Vec<(usize, usize)> = Vec::new();
    levels.push((root_len, 0));
    let mut path: Vec<usize> = Vec::new();
    while let Some(top) = levels.last_mut() {
        let (length, index) = *top;
        if index == length {
            levels.pop();
            if !levels.is_empty() {
                ser.add_array_end()?;
                path.pop();
            }
            continue;
        }
        top.1 += 1;
        path.push(index);
        let info = source.type_info(&path)?;
        if info.ty == MetaffiType::ANY {
            return Err(ConstructError::DynamicType { path });
        }
        if info.is_array() {
            let meta = source.array_metadata(&path)?;
            ser.add_array_begin(meta.length, meta.element_type)?;
            levels.push((meta.length, 0));
            continue;
        }
        let Some(kind) = info.ty.kind() else {
            return Err(ConstructError::UnknownType { path, ty: info.ty });
        };
        let value = source.scalar(&path, kind)?;
        if value.type_tag() != kind.tag() {
            return Err(ConstructError::Mismatch {
                path,
                expected: kind.tag(),
                actual: value.type_tag(),
            });
        }
        ser.add_value(&value)?;
        path.pop();
    }
    drop(ser);
    Ok(root)
}

/// A [`ValueSource`] over an in-memory list of values.
#[derive(Clone, Debug)]
pub struct ValueSliceSource<'a> {
    values: &'a [Value],
}

impl<'a> ValueSliceSource<'a> {
    /// Supplies `values` as the root.
    #[must_use]
    pub fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    fn at(&self, path: &[usize]) -> Result<&'a Value, ConstructError> {
        let missing = || ConstructError::Source {
            path: path.to_vec(),
            message: "no value at index path".into(),
        };
        let (&first, rest) = path.split_first().ok_or_else(missing)?;
        let mut value = self.values.get(first).ok_or_else(missing)?;
        for &i in rest {
            value = match value {
                Value::Array { items, .. } => items.get(i).ok_or_else(missing)?,
                _ => return Err(missing()),
            };
        }
        Ok(value)
    }
}

impl ValueSource for ValueSliceSource<'_> {
    fn root_len(&mut self) -> usize {
        self.values.len()
    }

    fn type_info(&mut self, path: &[usize]) -> Result<TypeInfo, ConstructError> {
        Ok(TypeInfo::new(self.at(path)?.type_tag()))
    }

    fn array_metadata(&mut self, path: &[usize]) -> Result<ArrayMetadata, ConstructError> {
        match self.at(path)? {
            Value::Array {
                element_type,
                items,
            } => Ok(ArrayMetadata {
                length: items.len(),
                element_type: *element_type,
            }),
            other => Err(ConstructError::Mismatch {
                path: path.to_vec(),
                expected: MetaffiType::ARRAY,
                actual: other.type_tag(),
            }),
        }
    }

    fn scalar(&mut self, path: &[usize], _kind: TypeKind) -> Result<Value, ConstructError> {
        self.at(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::system;
    use alloc::vec;

    struct Declares(TypeInfo, Value);

    impl ValueSource for Declares {
        fn root_len(&mut self) -> usize {
            1
        }

        fn type_info(&mut self, _: &[usize]) -> Result<TypeInfo, ConstructError> {
            Ok(self.0.clone())
        }

        fn array_metadata(&mut self, _: &[usize]) -> Result<ArrayMetadata, ConstructError> {
            Ok(ArrayMetadata {
                length: 0,
                element_type: MetaffiType::INT8,
            })
        }

        fn scalar(&mut self, _: &[usize], _: TypeKind) -> Result<Value, ConstructError> {
            Ok(self.1.clone())
        }
    }

    #[test]
    fn builds_the_same_tree_as_the_serializer() {
        let values = vec![
            Value::from(3_u32),
            Value::Array {
                element_type: MetaffiType::STRING8,
                items: vec![Value::from("a"), Value::String8(None)],
            },
            Value::Null,
        ];
        let built = construct_cdts(&mut ValueSliceSource::new(&values), system()).unwrap();

        let mut expected = Cdts::new(3);
        let mut ser = Serializer::new(&mut expected);
        for v in &values {
            ser.add_value(v).unwrap();
        }
        drop(ser);
        assert_eq!(built, expected);
    }

    #[test]
    fn dynamic_and_lying_sources_are_rejected() {
        let mut any = Declares(TypeInfo::new(MetaffiType::ANY), Value::Null);
        assert_eq!(
            construct_cdts(&mut any, system()),
            Err(ConstructError::DynamicType { path: vec![0] })
        );

        let mut liar = Declares(TypeInfo::new(MetaffiType::INT8), Value::from(1_i16));
        assert_eq!(
            construct_cdts(&mut liar, system()),
            Err(ConstructError::Mismatch {
                path: vec![0],
                expected: MetaffiType::INT8,
                actual: MetaffiType::INT16
            })
        );

        let mut unknown = Declares(TypeInfo::new(MetaffiType(3)), Value::Null);
        assert!(matches!(
            construct_cdts(&mut unknown, system()),
            Err(ConstructError::UnknownType { .. })
        ));
    }

    #[test]
    fn fixed_dimensions_make_an_array() {
        let mut src = Declares(
            TypeInfo {
                ty: MetaffiType::INT8,
                alias: None,
                fixed_dimensions: 1,
            },
            Value::Null,
        );
        let built = construct_cdts(&mut src, system()).unwrap();
        assert_eq!(
            built.get(0).map(crate::value::Cdt::type_tag),
            Some(MetaffiType::INT8.array_of())
        );
    }
}
