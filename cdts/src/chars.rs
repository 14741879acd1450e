// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-character primitives in the three code-unit widths.
//!
//! Each type stores exactly one Unicode scalar value in a fixed-size buffer so it can travel
//! inline in a slot. Unused trailing code units are zero.

use core::fmt;

/// A character decoding error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CharError {
    /// No code units were supplied.
    Empty,
    /// The leading UTF-8 byte does not start a sequence.
    InvalidLead(u8),
    /// Fewer code units were supplied than the leading unit announces.
    Truncated {
        /// Units announced by the leading unit.
        expected: usize,
        /// Units supplied.
        actual: usize,
    },
    /// The code units do not form a Unicode scalar value.
    Invalid,
}

impl fmt::Display for CharError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no code units"),
            Self::InvalidLead(b) => write!(f, "invalid UTF-8 leading byte 0x{b:02x}"),
            Self::Truncated { expected, actual } => {
                write!(f, "truncated character: expected {expected} code units, got {actual}")
            }
            Self::Invalid => write!(f, "code units do not encode a Unicode scalar value"),
        }
    }
}

impl core::error::Error for CharError {}

/// One UTF-8 encoded character.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Char8([u8; 4]);

impl Char8 {
    /// Returns the sequence length announced by a leading byte.
    #[must_use]
    pub const fn width(lead: u8) -> Option<usize> {
        match lead {
            0x00..=0x7f => Some(1),
            0xc0..=0xdf => Some(2),
            0xe0..=0xef => Some(3),
            0xf0..=0xf7 => Some(4),
            _ => None,
        }
    }

    /// Reads one character from the front of `bytes`. Trailing bytes are ignored.
    pub fn from_utf8(bytes: &[u8]) -> Result<Self, CharError> {
        let &lead = bytes.first().ok_or(CharError::Empty)?;
        let width = Self::width(lead).ok_or(CharError::InvalidLead(lead))?;
        let encoded = bytes.get(..width).ok_or(CharError::Truncated {
            expected: width,
            actual: bytes.len(),
        })?;
        core::str::from_utf8(encoded).map_err(|_| CharError::Invalid)?;
        let mut units = [0_u8; 4];
        units[..width].copy_from_slice(encoded);
        Ok(Self(units))
    }

    /// Wraps raw code units without validation.
    ///
    /// Used for values that arrive from foreign code and are stored as-is.
    #[must_use]
    pub const fn from_units(units: [u8; 4]) -> Self {
        Self(units)
    }

    /// Returns the raw code units, zero padded.
    #[must_use]
    pub const fn units(self) -> [u8; 4] {
        self.0
    }

    /// Returns the encoded bytes, without padding.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        let width = Self::width(self.0[0]).unwrap_or(4);
        &self.0[..width]
    }

    /// Decodes the character.
    pub fn to_char(self) -> Result<char, CharError> {
        let s = core::str::from_utf8(self.as_bytes()).map_err(|_| CharError::Invalid)?;
        s.chars().next().ok_or(CharError::Empty)
    }
}

impl From<char> for Char8 {
    fn from(c: char) -> Self {
        let mut units = [0_u8; 4];
        c.encode_utf8(&mut units);
        Self(units)
    }
}

/// One UTF-16 encoded character, one or two code units.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Char16([u16; 2]);

impl Char16 {
    /// Returns the sequence length announced by a leading unit.
    #[must_use]
    pub const fn width(lead: u16) -> usize {
        if matches!(lead, 0xd800..=0xdbff) { 2 } else { 1 }
    }

    /// Reads one character from the front of `units`. Trailing units are ignored.
    pub fn from_utf16(units: &[u16]) -> Result<Self, CharError> {
        let &lead = units.first().ok_or(CharError::Empty)?;
        let width = Self::width(lead);
        let encoded = units.get(..width).ok_or(CharError::Truncated {
            expected: width,
            actual: units.len(),
        })?;
        let mut decoded = char::decode_utf16(encoded.iter().copied());
        match decoded.next() {
            Some(Ok(_)) => {}
            _ => return Err(CharError::Invalid),
        }
        let mut out = [0_u16; 2];
        out[..width].copy_from_slice(encoded);
        Ok(Self(out))
    }

    /// Wraps raw code units without validation.
    #[must_use]
    pub const fn from_units(units: [u16; 2]) -> Self {
        Self(units)
    }

    /// Returns the raw code units, zero padded.
    #[must_use]
    pub const fn units(self) -> [u16; 2] {
        self.0
    }

    /// Returns the encoded units, without padding.
    #[must_use]
    pub fn as_units(&self) -> &[u16] {
        &self.0[..Self::width(self.0[0])]
    }

    /// Returns `true` if the character needs a surrogate pair.
    #[must_use]
    pub const fn is_surrogate_pair(self) -> bool {
        Self::width(self.0[0]) == 2
    }

    /// Decodes the character.
    pub fn to_char(self) -> Result<char, CharError> {
        match char::decode_utf16(self.as_units().iter().copied()).next() {
            Some(Ok(c)) => Ok(c),
            _ => Err(CharError::Invalid),
        }
    }
}

impl From<char> for Char16 {
    fn from(c: char) -> Self {
        let mut units = [0_u16; 2];
        c.encode_utf16(&mut units);
        Self(units)
    }
}

/// One UTF-32 code unit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Char32(pub u32);

impl Char32 {
    /// Decodes the character.
    pub fn to_char(self) -> Result<char, CharError> {
        char::from_u32(self.0).ok_or(CharError::Invalid)
    }
}

impl From<char> for Char32 {
    fn from(c: char) -> Self {
        Self(u32::from(c))
    }
}

macro_rules! char_conversions {
    ($($from:ident => $to:ident),* $(,)?) => {
        $(
            impl TryFrom<$from> for $to {
                type Error = CharError;

                fn try_from(value: $from) -> Result<Self, CharError> {
                    value.to_char().map(Self::from)
                }
            }
        )*
    };
}

char_conversions!(
    Char8 => Char16,
    Char8 => Char32,
    Char16 => Char8,
    Char16 => Char32,
    Char32 => Char8,
    Char32 => Char16,
);
