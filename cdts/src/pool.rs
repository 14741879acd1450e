// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reuse of slot buffers for per-call parameter and return sequences.
//!
//! Every cross-language call needs a parameter sequence and a return sequence, usually short.
//! [`CdtsPool`] keeps released slot buffers in free lists keyed by length and hands them out
//! again, marked [`pooled`](Cdts::is_pooled). Released buffers are emptied first, so a reused
//! sequence always starts with every slot [`Cdt::Empty`].

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::memory::{self, AllocError, Allocator};
use crate::sequence::Cdts;
use crate::types::MIXED_OR_UNKNOWN_DIMENSIONS;
use crate::value::Cdt;

/// Pool limits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of buffers kept across all lengths.
    pub max_cached: usize,
    /// Longest sequence that is pooled. Longer ones are allocated and freed normally.
    pub max_slots: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_cached: 50,
            max_slots: 100,
        }
    }
}

/// The parameter and return sequences of one call.
#[derive(Debug)]
pub struct CallBuffers {
    /// Parameters.
    pub params: Cdts,
    /// Return values.
    pub rets: Cdts,
}

/// A cache of slot buffers.
#[derive(Debug, Default)]
pub struct CdtsPool {
    config: PoolConfig,
    free: HashMap<usize, Vec<Vec<Cdt>>>,
    cached: usize,
}

impl CdtsPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            free: HashMap::new(),
            cached: 0,
        }
    }

    /// The pool limits.
    #[must_use]
    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Number of buffers currently cached.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cached
    }

    /// Returns a sequence of `length` empty slots, reusing a cached buffer when one fits.
    pub fn acquire(&mut self, alloc: &dyn Allocator, length: usize) -> Result<Cdts, AllocError> {
        if length > self.config.max_slots {
            return Cdts::try_with_dimensions_in(alloc, length, MIXED_OR_UNKNOWN_DIMENSIONS);
        }
        let slots = match self.free.get_mut(&length).and_then(Vec::pop) {
            Some(slots) => {
                self.cached -= 1;
                slots
            }
            None => memory::cdt_array(alloc, length)?,
        };
        let mut cdts = Cdts::from_slots(slots, MIXED_OR_UNKNOWN_DIMENSIONS);
        cdts.set_pooled(true);
        Ok(cdts)
    }

    /// Returns a sequence to the pool. Non-pooled sequences, and any beyond the cache limit,
    /// are simply dropped.
    pub fn release(&mut self, mut cdts: Cdts) {
        if !cdts.is_pooled() || self.cached >= self.config.max_cached {
            return;
        }
        cdts.clear();
        let slots = cdts.take_slots();
        self.free.entry(slots.len()).or_default().push(slots);
        self.cached += 1;
    }

    /// Allocates the parameter and return sequences of one call.
    pub fn alloc_call_buffers(
        &mut self,
        alloc: &dyn Allocator,
        params: usize,
        rets: usize,
    ) -> Result<CallBuffers, AllocError> {
        let params = self.acquire(alloc, params)?;
        let rets = match self.acquire(alloc, rets) {
            Ok(rets) => rets,
            Err(e) => {
                self.release(params);
                return Err(e);
            }
        };
        Ok(CallBuffers { params, rets })
    }

    /// Returns both sequences of a call to the pool.
    pub fn release_call_buffers(&mut self, buffers: CallBuffers) {
        let CallBuffers { params, rets } = buffers;
        self.release(params);
        self.release(rets);
    }
}
