// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type tags.
//!
//! A [`MetaffiType`] is a bit set. Exactly one scalar discriminant is set, optionally combined
//! with [`MetaffiType::ARRAY`] to mean "nested sequence of that element type". The bit values are
//! shared with every other MetaFFI runtime and must not change.

use alloc::boxed::Box;
use core::fmt;
use core::ops::BitOr;

/// Declared dimensionality used when a sequence mixes ranks or the rank is not known.
pub const MIXED_OR_UNKNOWN_DIMENSIONS: i64 = -1;

/// A MetaFFI type tag.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetaffiType(pub u64);

impl MetaffiType {
    /// No type. Reported for a slot that was never written.
    pub const NONE: Self = Self(0);
    /// IEEE-754 binary64.
    pub const FLOAT64: Self = Self(1);
    /// IEEE-754 binary32.
    pub const FLOAT32: Self = Self(2);
    /// Signed 8-bit integer.
    pub const INT8: Self = Self(4);
    /// Signed 16-bit integer.
    pub const INT16: Self = Self(8);
    /// Signed 32-bit integer.
    pub const INT32: Self = Self(16);
    /// Signed 64-bit integer.
    pub const INT64: Self = Self(32);
    /// Unsigned 8-bit integer.
    pub const UINT8: Self = Self(64);
    /// Unsigned 16-bit integer.
    pub const UINT16: Self = Self(128);
    /// Unsigned 32-bit integer.
    pub const UINT32: Self = Self(256);
    /// Unsigned 64-bit integer.
    pub const UINT64: Self = Self(512);
    /// Boolean.
    pub const BOOL: Self = Self(1024);
    /// String of 8-bit code units (UTF-8).
    pub const STRING8: Self = Self(4096);
    /// String of 16-bit code units (UTF-16).
    pub const STRING16: Self = Self(8192);
    /// String of 32-bit code units (UTF-32).
    pub const STRING32: Self = Self(16384);
    /// Opaque foreign object handle.
    pub const HANDLE: Self = Self(32768);
    /// Array flag, combined with an element type.
    pub const ARRAY: Self = Self(65536);
    /// Size type. Travels as `UINT64` in a slot.
    pub const SIZE: Self = Self(262_144);
    /// One UTF-8 encoded character.
    pub const CHAR8: Self = Self(524_288);
    /// One UTF-16 encoded character.
    pub const CHAR16: Self = Self(1_048_576);
    /// One UTF-32 encoded character.
    pub const CHAR32: Self = Self(2_097_152);
    /// Dynamic type. Never stored in a slot.
    pub const ANY: Self = Self(4_194_304);
    /// Explicit null.
    pub const NULL: Self = Self(8_388_608);
    /// Callable (function pointer plus signature).
    pub const CALLABLE: Self = Self(16_777_216);

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns `true` if every bit in `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Returns `true` if the array flag is set.
    #[must_use]
    pub const fn is_array(self) -> bool {
        self.0 & Self::ARRAY.0 != 0
    }

    /// Returns `self` with the array flag set.
    #[must_use]
    pub const fn array_of(self) -> Self {
        Self(self.0 | Self::ARRAY.0)
    }

    /// Returns `self` with the array flag cleared.
    #[must_use]
    pub const fn element(self) -> Self {
        Self(self.0 & !Self::ARRAY.0)
    }

    /// Returns the scalar kind for a non-array tag.
    #[must_use]
    pub fn kind(self) -> Option<TypeKind> {
        TypeKind::from_tag(self)
    }

    /// Returns the canonical MetaFFI name (`metaffi_int32`, `metaffi_string8_array`, ...).
    ///
    /// Returns `None` for bit patterns that do not name a type.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        if self == Self::NONE {
            return None;
        }
        if self.is_array() {
            if self == Self::ARRAY {
                return Some("metaffi_array");
            }
            return TypeKind::from_tag(self.element()).map(TypeKind::array_name);
        }
        match self {
            Self::SIZE => Some("metaffi_size"),
            Self::ANY => Some("metaffi_any"),
            _ => TypeKind::from_tag(self).map(TypeKind::name),
        }
    }
}

impl BitOr for MetaffiType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for MetaffiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "unknown type ({})", self.0),
        }
    }
}

/// The concrete kinds a slot can hold, array flag aside.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// See [`MetaffiType::FLOAT64`].
    Float64,
    /// See [`MetaffiType::FLOAT32`].
    Float32,
    /// See [`MetaffiType::INT8`].
    Int8,
    /// See [`MetaffiType::INT16`].
    Int16,
    /// See [`MetaffiType::INT32`].
    Int32,
    /// See [`MetaffiType::INT64`].
    Int64,
    /// See [`MetaffiType::UINT8`].
    Uint8,
    /// See [`MetaffiType::UINT16`].
    Uint16,
    /// See [`MetaffiType::UINT32`].
    Uint32,
    /// See [`MetaffiType::UINT64`].
    Uint64,
    /// See [`MetaffiType::BOOL`].
    Bool,
    /// See [`MetaffiType::CHAR8`].
    Char8,
    /// See [`MetaffiType::CHAR16`].
    Char16,
    /// See [`MetaffiType::CHAR32`].
    Char32,
    /// See [`MetaffiType::STRING8`].
    String8,
    /// See [`MetaffiType::STRING16`].
    String16,
    /// See [`MetaffiType::STRING32`].
    String32,
    /// See [`MetaffiType::HANDLE`].
    Handle,
    /// See [`MetaffiType::CALLABLE`].
    Callable,
    /// See [`MetaffiType::NULL`].
    Null,
}

impl TypeKind {
    /// Every kind, in tag order.
    pub const ALL: [Self; 20] = [
        Self::Float64,
        Self::Float32,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Uint8,
        Self::Uint16,
        Self::Uint32,
        Self::Uint64,
        Self::Bool,
        Self::String8,
        Self::String16,
        Self::String32,
        Self::Handle,
        Self::Char8,
        Self::Char16,
        Self::Char32,
        Self::Null,
        Self::Callable,
    ];

    /// Returns the tag for this kind.
    #[must_use]
    pub const fn tag(self) -> MetaffiType {
        match self {
            Self::Float64 => MetaffiType::FLOAT64,
            Self::Float32 => MetaffiType::FLOAT32,
            Self::Int8 => MetaffiType::INT8,
            Self::Int16 => MetaffiType::INT16,
            Self::Int32 => MetaffiType::INT32,
            Self::Int64 => MetaffiType::INT64,
            Self::Uint8 => MetaffiType::UINT8,
            Self::Uint16 => MetaffiType::UINT16,
            Self::Uint32 => MetaffiType::UINT32,
            Self::Uint64 => MetaffiType::UINT64,
            Self::Bool => MetaffiType::BOOL,
            Self::Char8 => MetaffiType::CHAR8,
            Self::Char16 => MetaffiType::CHAR16,
            Self::Char32 => MetaffiType::CHAR32,
            Self::String8 => MetaffiType::STRING8,
            Self::String16 => MetaffiType::STRING16,
            Self::String32 => MetaffiType::STRING32,
            Self::Handle => MetaffiType::HANDLE,
            Self::Callable => MetaffiType::CALLABLE,
            Self::Null => MetaffiType::NULL,
        }
    }

    /// Maps a non-array tag back to its kind.
    ///
    /// [`MetaffiType::SIZE`] maps to [`TypeKind::Uint64`], the kind it is stored as.
    #[must_use]
    pub fn from_tag(tag: MetaffiType) -> Option<Self> {
        if tag == MetaffiType::SIZE {
            return Some(Self::Uint64);
        }
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Returns the canonical scalar name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Float64 => "metaffi_float64",
            Self::Float32 => "metaffi_float32",
            Self::Int8 => "metaffi_int8",
            Self::Int16 => "metaffi_int16",
            Self::Int32 => "metaffi_int32",
            Self::Int64 => "metaffi_int64",
            Self::Uint8 => "metaffi_uint8",
            Self::Uint16 => "metaffi_uint16",
            Self::Uint32 => "metaffi_uint32",
            Self::Uint64 => "metaffi_uint64",
            Self::Bool => "metaffi_bool",
            Self::Char8 => "metaffi_char8",
            Self::Char16 => "metaffi_char16",
            Self::Char32 => "metaffi_char32",
            Self::String8 => "metaffi_string8",
            Self::String16 => "metaffi_string16",
            Self::String32 => "metaffi_string32",
            Self::Handle => "metaffi_handle",
            Self::Callable => "metaffi_callable",
            Self::Null => "metaffi_null",
        }
    }

    /// Returns the canonical name of an array of this kind.
    #[must_use]
    pub const fn array_name(self) -> &'static str {
        match self {
            Self::Float64 => "metaffi_float64_array",
            Self::Float32 => "metaffi_float32_array",
            Self::Int8 => "metaffi_int8_array",
            Self::Int16 => "metaffi_int16_array",
            Self::Int32 => "metaffi_int32_array",
            Self::Int64 => "metaffi_int64_array",
            Self::Uint8 => "metaffi_uint8_array",
            Self::Uint16 => "metaffi_uint16_array",
            Self::Uint32 => "metaffi_uint32_array",
            Self::Uint64 => "metaffi_uint64_array",
            Self::Bool => "metaffi_bool_array",
            Self::Char8 => "metaffi_char8_array",
            Self::Char16 => "metaffi_char16_array",
            Self::Char32 => "metaffi_char32_array",
            Self::String8 => "metaffi_string8_array",
            Self::String16 => "metaffi_string16_array",
            Self::String32 => "metaffi_string32_array",
            Self::Handle => "metaffi_handle_array",
            Self::Callable => "metaffi_callable_array",
            Self::Null => "metaffi_null_array",
        }
    }

    /// Returns `true` for kinds whose slot payload is heap-owned when present.
    #[must_use]
    pub const fn is_heap(self) -> bool {
        matches!(
            self,
            Self::String8 | Self::String16 | Self::String32 | Self::Callable
        )
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A declared type: tag, optional language-specific alias, and array rank.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// The tag.
    pub ty: MetaffiType,
    /// A front-end specific alias (e.g. a class name for handles).
    pub alias: Option<Box<str>>,
    /// Array rank, or [`MIXED_OR_UNKNOWN_DIMENSIONS`].
    pub fixed_dimensions: i64,
}

impl TypeInfo {
    /// Creates a type with no alias and no array rank.
    #[must_use]
    pub const fn new(ty: MetaffiType) -> Self {
        Self {
            ty,
            alias: None,
            fixed_dimensions: 0,
        }
    }

    /// Creates an array type of `element` with `dimensions` levels.
    #[must_use]
    pub const fn array(element: MetaffiType, dimensions: i64) -> Self {
        Self {
            ty: element.array_of(),
            alias: None,
            fixed_dimensions: dimensions,
        }
    }

    /// Attaches an alias.
    #[must_use]
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Returns `true` if values of this type are arrays.
    #[must_use]
    pub const fn is_array(&self) -> bool {
        self.ty.is_array() || self.fixed_dimensions > 0
    }
}

impl Default for TypeInfo {
    fn default() -> Self {
        Self::new(MetaffiType::ANY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn bit_values_match_the_wire_format() {
        assert_eq!(MetaffiType::INT32.bits(), 16);
        assert_eq!(MetaffiType::ARRAY.bits(), 0x1_0000);
        assert_eq!(MetaffiType::NULL.bits(), 0x80_0000);
        assert_eq!(MetaffiType::CALLABLE.bits(), 0x100_0000);
    }

    #[test]
    fn array_flag_round_trips() {
        let t = MetaffiType::INT32.array_of();
        assert!(t.is_array());
        assert!(t.contains(MetaffiType::INT32));
        assert_eq!(t.element(), MetaffiType::INT32);
        assert_eq!(t, MetaffiType::INT32 | MetaffiType::ARRAY);
    }

    #[test]
    fn names() {
        assert_eq!(MetaffiType::INT32.to_string(), "metaffi_int32");
        assert_eq!(
            MetaffiType::STRING8.array_of().to_string(),
            "metaffi_string8_array"
        );
        assert_eq!(MetaffiType::SIZE.name(), Some("metaffi_size"));
        assert_eq!(MetaffiType::NONE.name(), None);
        assert_eq!(MetaffiType(3).to_string(), "unknown type (3)");
    }

    #[test]
    fn every_kind_round_trips_through_its_tag() {
        for kind in TypeKind::ALL {
            assert_eq!(TypeKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(TypeKind::from_tag(MetaffiType::SIZE), Some(TypeKind::Uint64));
        assert_eq!(TypeKind::from_tag(MetaffiType::ANY), None);
        assert_eq!(TypeKind::from_tag(MetaffiType::INT8.array_of()), None);
    }

    #[test]
    fn type_info_dimensions_imply_array() {
        let mut info = TypeInfo::new(MetaffiType::INT32);
        assert!(!info.is_array());
        info.fixed_dimensions = 2;
        assert!(info.is_array());
        assert!(TypeInfo::array(MetaffiType::FLOAT64, 1).ty.is_array());
        assert_eq!(TypeInfo::default().ty, MetaffiType::ANY);
    }
}
