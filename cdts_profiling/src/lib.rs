// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Profiling adapters for `cdts` (currently Tracy).
//!
//! This crate is `std`-only and keeps `cdts` itself free of profiling dependencies. It listens
//! for array scope enter/exit callbacks from a [`Serializer`](cdts::Serializer) and emits
//! matching profiling zones; failed operations become Tracy messages.
//!
//! ## Backend
//! This crate currently supports the Tracy backend via `tracy-client`. Without a running Tracy
//! client every callback is a no-op.
//!
//! ## Example
//! ```
//! use cdts::{Cdts, MetaffiType, Serializer};
//! use cdts_profiling::ProfilingTraceSink;
//!
//! let mut sink = ProfilingTraceSink::new();
//! let mut data = Cdts::new(1);
//! let mut ser = Serializer::new(&mut data).with_sink(&mut sink);
//! ser.add_array_begin(1, MetaffiType::INT8)?;
//! ser.add_int8(7)?;
//! ser.add_array_end()?;
//! # Ok::<(), cdts::SerError>(())
//! ```

mod resolver;
mod sink;

pub use resolver::{DefaultLabelResolver, LabelResolver, TypeNameResolver};
pub use sink::ProfilingTraceSink;
