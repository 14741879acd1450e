// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Serializer tracing hooks.
//!
//! A [`TraceSink`] attached to a [`Serializer`](crate::Serializer) is told when array scopes
//! open, close or are abandoned, and when an operation fails. The serializer consults
//! [`TraceSink::mask`] once per event and skips the call when the matching bit is clear.

use core::ops::BitOr;

use crate::error::SerError;
use crate::types::MetaffiType;

/// Which events a sink wants.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TraceMask(u8);

impl TraceMask {
    /// No events.
    pub const NONE: Self = Self(0);
    /// Array scope enter/exit.
    pub const ARRAY: Self = Self(1 << 0);
    /// Failed operations.
    pub const ERROR: Self = Self(1 << 1);
    /// Every event.
    pub const ALL: Self = Self(Self::ARRAY.0 | Self::ERROR.0);

    /// Returns `true` if every bit in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl BitOr for TraceMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// The direction of an array scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Opened by `add_array_begin`.
    Write,
    /// Opened by `get_array_begin`.
    Read,
}

/// Receives serializer events.
pub trait TraceSink {
    /// Events this sink wants.
    fn mask(&self) -> TraceMask;

    /// An array scope opened. `depth` counts open arrays including this one.
    fn scope_enter(
        &mut self,
        _kind: ScopeKind,
        _depth: usize,
        _length: usize,
        _element_type: MetaffiType,
    ) {
    }

    /// An array scope closed. `depth` is the depth the scope had while open.
    fn scope_exit(&mut self, _kind: ScopeKind, _depth: usize) {}

    /// Every scope deeper than `depth` closed without a matching `scope_exit`, after a reset, a
    /// failed tree operation or the serializer being dropped.
    fn scopes_unwound(&mut self, _depth: usize) {}

    /// `op` failed at array depth `depth`.
    fn error(&mut self, _op: &'static str, _depth: usize, _error: &SerError) {}
}
