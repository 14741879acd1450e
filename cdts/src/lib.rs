// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The MetaFFI common data type system.
//!
//! Values cross language boundaries as a [`Cdts`]: a fixed-length sequence of tagged slots
//! ([`Cdt`]). A slot holds one scalar, a string, a handle to a foreign object, a callable, an
//! explicit null, or a nested sequence, which makes multi-dimensional and ragged arrays plain
//! trees.
//!
//! Trees are written and read through a [`Serializer`], a cursor with an explicit stack of open
//! arrays. All allocation goes through an [`Allocator`](memory::Allocator) capability so that
//! allocation failure is an ordinary, recoverable [`SerError`].
//!
//! ```
//! use cdts::{Cdts, MetaffiType, Serializer};
//!
//! let mut params = Cdts::new(2);
//! let mut ser = Serializer::new(&mut params);
//! ser.add_string8(Some(b"hello"))?;
//! ser.add_slice(&[1.0_f64, 2.0])?;
//!
//! ser.reset();
//! assert_eq!(ser.get_string8()?, Some(b"hello".to_vec()));
//! assert_eq!(ser.peek_type()?, MetaffiType::FLOAT64.array_of());
//! assert_eq!(ser.get_vec::<f64>()?, [1.0, 2.0]);
//! # Ok::<(), cdts::SerError>(())
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod chars;
pub mod construct;
pub mod error;
pub mod memory;
pub mod pool;
pub mod sequence;
pub mod serializer;
pub mod trace;
pub mod traverse;
pub mod typed;
pub mod types;
pub mod value;
pub mod variant;

pub use chars::{Char8, Char16, Char32};
pub use error::{ArrayStateError, ErrorCode, SerError};
pub use pool::{CallBuffers, CdtsPool, PoolConfig};
pub use sequence::Cdts;
pub use serializer::{Cursor, Serializer};
pub use typed::Scalar;
pub use types::{MIXED_OR_UNKNOWN_DIMENSIONS, MetaffiType, TypeInfo, TypeKind};
pub use value::{Callable, Cdt, ForeignPtr, Handle};
pub use variant::Value;
