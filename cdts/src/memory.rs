// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Allocation facility.
//!
//! Every heap payload the serializer creates (string copies, callable signatures, nested
//! sequences, cursor frames) is first granted by an [`Allocator`]. The allocator is a capability
//! passed to the serializer; [`system`] returns the process-wide default, which grants every
//! request and reports real allocation failure through `try_reserve`.
//!
//! [`BudgetAllocator`] refuses requests after a budget runs out, which makes every `MEMORY` path
//! reachable from tests.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

use crate::value::Cdt;

/// What an allocation is for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AllocKind {
    /// A fixed-size record (handle, callable, cursor frame, sequence header). `len` is in bytes.
    Memory,
    /// 8-bit string code units.
    String8,
    /// 16-bit string code units.
    String16,
    /// 32-bit string code units.
    String32,
    /// Slots of a sequence.
    CdtArray,
    /// Type tags of a callable signature.
    TypeArray,
}

impl fmt::Display for AllocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Memory => "memory",
            Self::String8 => "string8",
            Self::String16 => "string16",
            Self::String32 => "string32",
            Self::CdtArray => "cdt array",
            Self::TypeArray => "type array",
        };
        f.write_str(s)
    }
}

/// An allocation was refused.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AllocError {
    /// What was being allocated.
    pub kind: AllocKind,
    /// Requested length in units of `kind`.
    pub len: usize,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AllocKind::String8 | AllocKind::String16 | AllocKind::String32 => {
                write!(f, "Failed to allocate string memory")
            }
            AllocKind::CdtArray => write!(f, "Failed to allocate CDT array of {} elements", self.len),
            AllocKind::TypeArray => {
                write!(f, "Failed to allocate type array of {} elements", self.len)
            }
            AllocKind::Memory => write!(f, "Failed to allocate {} bytes", self.len),
        }
    }
}

impl core::error::Error for AllocError {}

/// Grants or refuses allocations.
///
/// Implementations only decide; the memory itself comes from the global allocator. A grant is
/// followed by a fallible reservation, so an exhausted heap still surfaces as [`AllocError`].
pub trait Allocator {
    /// Asks for `len` units of `kind`.
    fn grant(&self, kind: AllocKind, len: usize) -> Result<(), AllocError>;
}

/// The default allocator. Grants every request.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn grant(&self, _kind: AllocKind, _len: usize) -> Result<(), AllocError> {
        Ok(())
    }
}

static SYSTEM: SystemAllocator = SystemAllocator;

/// Returns the process-wide default allocator.
#[must_use]
pub fn system() -> &'static SystemAllocator {
    &SYSTEM
}

/// An allocator that grants a fixed number of requests and refuses the rest.
///
/// With [`BudgetAllocator::refusing`] only requests of one kind count against the budget.
#[derive(Debug)]
pub struct BudgetAllocator {
    remaining: Cell<usize>,
    only: Option<AllocKind>,
    granted: Cell<usize>,
    refused: Cell<usize>,
}

impl BudgetAllocator {
    /// Grants the first `budget` requests.
    #[must_use]
    pub const fn new(budget: usize) -> Self {
        Self {
            remaining: Cell::new(budget),
            only: None,
            granted: Cell::new(0),
            refused: Cell::new(0),
        }
    }

    /// Grants the first `budget` requests of `kind`; other kinds always succeed.
    #[must_use]
    pub const fn refusing(kind: AllocKind, budget: usize) -> Self {
        Self {
            remaining: Cell::new(budget),
            only: Some(kind),
            granted: Cell::new(0),
            refused: Cell::new(0),
        }
    }

    /// Number of requests granted so far.
    #[must_use]
    pub fn granted(&self) -> usize {
        self.granted.get()
    }

    /// Number of requests refused so far.
    #[must_use]
    pub fn refused(&self) -> usize {
        self.refused.get()
    }

    /// Replaces the remaining budget.
    pub fn set_budget(&self, budget: usize) {
        self.remaining.set(budget);
    }
}

impl Allocator for BudgetAllocator {
    fn grant(&self, kind: AllocKind, len: usize) -> Result<(), AllocError> {
        if self.only.is_some_and(|only| only != kind) {
            self.granted.set(self.granted.get() + 1);
            return Ok(());
        }
        match self.remaining.get().checked_sub(1) {
            Some(rest) => {
                self.remaining.set(rest);
                self.granted.set(self.granted.get() + 1);
                Ok(())
            }
            None => {
                self.refused.set(self.refused.get() + 1);
                Err(AllocError { kind, len })
            }
        }
    }
}

/// Copies `units` into a fresh buffer.
pub(crate) fn copy_units<T: Copy>(
    alloc: &dyn Allocator,
    kind: AllocKind,
    units: &[T],
) -> Result<Vec<T>, AllocError> {
    let err = AllocError {
        kind,
        len: units.len(),
    };
    alloc.grant(kind, units.len())?;
    let mut out = Vec::new();
    out.try_reserve_exact(units.len()).map_err(|_| err)?;
    out.extend_from_slice(units);
    Ok(out)
}

/// Allocates `len` empty slots.
pub(crate) fn cdt_array(alloc: &dyn Allocator, len: usize) -> Result<Vec<Cdt>, AllocError> {
    let err = AllocError {
        kind: AllocKind::CdtArray,
        len,
    };
    alloc.grant(AllocKind::CdtArray, len)?;
    let mut slots = Vec::new();
    slots.try_reserve_exact(len).map_err(|_| err)?;
    slots.resize_with(len, Cdt::default);
    Ok(slots)
}

/// Moves `value` into a granted box.
pub(crate) fn boxed<T>(alloc: &dyn Allocator, value: T) -> Result<Box<T>, AllocError> {
    alloc.grant(AllocKind::Memory, size_of::<T>())?;
    Ok(Box::new(value))
}

/// Grants room for one more element of `v`.
pub(crate) fn reserve_one<T>(alloc: &dyn Allocator, v: &mut Vec<T>) -> Result<(), AllocError> {
    let err = AllocError {
        kind: AllocKind::Memory,
        len: size_of::<T>(),
    };
    alloc.grant(AllocKind::Memory, size_of::<T>())?;
    v.try_reserve(1).map_err(|_| err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_refuses_after_exhaustion() {
        let a = BudgetAllocator::new(2);
        assert!(copy_units(&a, AllocKind::String8, b"ab").is_ok());
        assert!(cdt_array(&a, 3).is_ok());
        assert_eq!(
            copy_units(&a, AllocKind::String16, &[1_u16, 2]),
            Err(AllocError {
                kind: AllocKind::String16,
                len: 2
            })
        );
        assert_eq!(a.granted(), 2);
        assert_eq!(a.refused(), 1);
    }

    #[test]
    fn refusing_only_counts_one_kind() {
        let a = BudgetAllocator::refusing(AllocKind::TypeArray, 0);
        assert!(boxed(&a, 5_u64).is_ok());
        assert!(copy_units(&a, AllocKind::String8, b"x").is_ok());
        assert!(copy_units(&a, AllocKind::TypeArray, &[1_u64]).is_err());
        a.set_budget(1);
        assert!(copy_units(&a, AllocKind::TypeArray, &[1_u64]).is_ok());
    }

    #[test]
    fn cdt_array_is_all_empty() {
        let slots = cdt_array(system(), 4).unwrap();
        assert_eq!(slots.len(), 4);
        assert!(slots.iter().all(|c| matches!(c, Cdt::Empty)));
    }

    #[test]
    fn messages() {
        use alloc::string::ToString;
        let e = AllocError {
            kind: AllocKind::String32,
            len: 9,
        };
        assert_eq!(e.to_string(), "Failed to allocate string memory");
    }
}
