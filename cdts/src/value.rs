// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slot values.
//!
//! A [`Cdt`] is one tagged slot. Owning payloads (string copies, callable signatures, nested
//! sequences) live in `Box`/`Vec` inside the variant, so a slot owns its payload exactly when its
//! variant carries one. Handles are copied records that point at foreign objects the core never
//! touches.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::chars::{Char8, Char16, Char32};
use crate::sequence::Cdts;
use crate::types::MetaffiType;

/// An opaque foreign address. Carried, compared, and returned; never dereferenced.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ForeignPtr(pub usize);

impl ForeignPtr {
    /// The null address.
    pub const NULL: Self = Self(0);

    /// Captures the address of `ptr`.
    #[must_use]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr.expose_provenance())
    }

    /// Rebuilds a pointer from the captured address.
    #[must_use]
    pub fn as_ptr<T>(self) -> *mut T {
        core::ptr::with_exposed_provenance_mut(self.0)
    }

    /// Returns `true` for the null address.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// A reference to an object owned by some runtime.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Handle {
    /// The object.
    pub value: ForeignPtr,
    /// Id of the runtime that owns the object.
    pub runtime_id: u64,
    /// Address of the owner's release callback, or null.
    pub release: ForeignPtr,
}

/// A foreign function together with its signature.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Callable {
    /// The function.
    pub value: ForeignPtr,
    /// Parameter types.
    pub params: Vec<MetaffiType>,
    /// Return types.
    pub retvals: Vec<MetaffiType>,
}

impl Callable {
    /// Creates a callable.
    #[must_use]
    pub fn new(value: ForeignPtr, params: &[MetaffiType], retvals: &[MetaffiType]) -> Self {
        Self {
            value,
            params: params.to_vec(),
            retvals: retvals.to_vec(),
        }
    }
}

/// One slot of a [`Cdts`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Cdt {
    /// Never written. Reports [`MetaffiType::NONE`].
    #[default]
    Empty,
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
    /// `string8`. `None` is a null string.
    String8(Option<Box<[u8]>>),
    /// `string16`. `None` is a null string.
    String16(Option<Box<[u16]>>),
    /// `string32`. `None` is a null string.
    String32(Option<Box<[u32]>>),
    /// `handle`. `None` is a null handle record.
    Handle(Option<Box<Handle>>),
    /// `callable`. `None` is a null callable record.
    Callable(Option<Box<Callable>>),
    /// A nested sequence of `element_type` values.
    Array {
        /// Element type, without the array flag.
        element_type: MetaffiType,
        /// The nested sequence.
        items: Box<Cdts>,
    },
}

impl Cdt {
    /// Returns the slot's type tag.
    #[must_use]
    pub const fn type_tag(&self) -> MetaffiType {
        match self {
            Self::Empty => MetaffiType::NONE,
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

    /// Returns `true` if the slot owns a heap payload that teardown must free.
    ///
    /// Handle records are copies and do not count; the object they point at is foreign.
    #[must_use]
    pub const fn owns_payload(&self) -> bool {
        match self {
            Self::String8(s) => s.is_some(),
            Self::String16(s) => s.is_some(),
            Self::String32(s) => s.is_some(),
            Self::Callable(c) => c.is_some(),
            Self::Array { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` for a never-written slot.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the nested sequence of an array slot.
    #[must_use]
    pub fn as_array(&self) -> Option<&Cdts> {
        match self {
            Self::Array { items, .. } => Some(items),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_slot_is_empty() {
        let c = Cdt::default();
        assert!(c.is_empty());
        assert_eq!(c.type_tag(), MetaffiType::NONE);
        assert!(!c.owns_payload());
    }

    #[test]
    fn ownership_follows_payload() {
        assert!(!Cdt::Int32(1).owns_payload());
        assert!(!Cdt::String8(None).owns_payload());
        assert!(Cdt::String8(Some(Box::from(&b"hi"[..]))).owns_payload());
        assert!(!Cdt::Handle(Some(Box::default())).owns_payload());
        assert!(Cdt::Callable(Some(Box::default())).owns_payload());
        let arr = Cdt::Array {
            element_type: MetaffiType::INT32,
            items: Box::new(Cdts::new(0)),
        };
        assert!(arr.owns_payload());
        assert_eq!(arr.type_tag(), MetaffiType::INT32.array_of());
    }

    #[test]
    fn foreign_ptr_round_trips() {
        let x = 7_u32;
        let p = ForeignPtr::from_ptr(&raw const x);
        assert!(!p.is_null());
        assert_eq!(p.as_ptr::<u32>().cast_const(), &raw const x);
        assert!(ForeignPtr::NULL.is_null());
    }
}
