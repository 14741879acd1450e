// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cursor-based serializer.
//!
//! A [`Serializer`] walks a caller-owned [`Cdts`] slot by slot. `add_*` writes the current slot
//! and advances; `get_*` checks the slot's type exactly, copies the value out, and advances.
//!
//! Arrays nest through an explicit stack of frames. `*_array_begin` opens the array in the
//! current slot without advancing the parent level, and the frame holds the open array, so the
//! current level is always the innermost frame. `*_array_end` requires every element of the open
//! array to have been visited, stores it back in its slot, pops the frame, and only then
//! advances the parent. A flattened 2×3 write therefore reads:
//!
//! ```
//! use cdts::{Cdts, MetaffiType, Serializer};
//!
//! let mut data = Cdts::new(1);
//! let mut ser = Serializer::new(&mut data);
//! ser.add_array_begin(2, MetaffiType::INT32)?;
//! for row in [[1, 2, 3], [4, 5, 6]] {
//!     ser.add_array_begin(3, MetaffiType::INT32)?;
//!     for v in row {
//!         ser.add_int32(v)?;
//!     }
//!     ser.add_array_end()?;
//! }
//! ser.add_array_end()?;
//! assert!(!ser.has_more());
//! # Ok::<(), cdts::SerError>(())
//! ```
//!
//! Every operation either succeeds or leaves the cursor and the target slot exactly as they
//! were.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::{fmt, mem};

use crate::chars::{Char8, Char16, Char32};
use crate::error::{ArrayStateError, SerError};
use crate::memory::{self, AllocKind, Allocator};
use crate::sequence::Cdts;
use crate::trace::{ScopeKind, TraceMask, TraceSink};
use crate::types::MetaffiType;
use crate::value::{Callable, Cdt, Handle};

const DANGLING_FRAME: SerError = SerError::InvalidState {
    what: "open array has no slot in the data it was resumed over",
};

// An open array. It is held here while it is filled or read, so the current level is always the
// top frame, and goes back into its slot in the parent level when it closes.
#[derive(Clone, Debug, PartialEq)]
struct ArrayFrame {
    index: usize,
    element_type: MetaffiType,
    kind: ScopeKind,
    items: Box<Cdts>,
}

/// Position of a serializer: the root index and the stack of open arrays.
///
/// A cursor holds no reference to the data, so it can be parked between calls (as the C ABI
/// does) and resumed with [`Serializer::from_parts`]. Open arrays travel with the cursor until
/// they close; dropping a parked cursor drops them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cursor {
    root_index: usize,
    frames: Vec<ArrayFrame>,
}

impl Cursor {
    /// A cursor at root index 0.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root_index: 0,
            frames: Vec::new(),
        }
    }

    /// Number of open arrays.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns to root index 0 and drops every open array.
    ///
    /// [`Serializer::reset`] returns open arrays to their slots instead.
    pub fn reset(&mut self) {
        self.root_index = 0;
        self.frames.clear();
    }
}

/// Reads and writes a [`Cdts`] through a [`Cursor`].
///
/// Arrays still open when the serializer is dropped are put back into their slots.
pub struct Serializer<'a> {
    root: &'a mut Cdts,
    alloc: &'a dyn Allocator,
    cursor: Cursor,
    sink: Option<&'a mut dyn TraceSink>,
}

impl fmt::Debug for Serializer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("root_len", &self.root.len())
            .field("cursor", &self.cursor)
            .field("traced", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for Serializer<'_> {
    fn drop(&mut self) {
        if self.cursor.frames.is_empty() {
            return;
        }
        while !self.cursor.frames.is_empty() {
            self.attach_top();
        }
        self.trace_unwound(0);
    }
}

macro_rules! scalar_ops {
    ($($add:ident / $get:ident: $ty:ty => $variant:ident, $tag:ident;)*) => {
        impl Serializer<'_> {
            $(
                #[doc = concat!("Writes a `", stringify!($ty), "` and advances.")]
                pub fn $add(&mut self, value: $ty) -> Result<(), SerError> {
                    let result = self.put(Cdt::$variant(value));
                    self.traced(stringify!($add), result)
                }

                #[doc = concat!("Reads a `", stringify!($ty), "` and advances.")]
                pub fn $get(&mut self) -> Result<$ty, SerError> {
                    let result = self.read(MetaffiType::$tag, |cdt, _| match cdt {
                        Cdt::$variant(v) => Ok(*v),
                        other => Err(mismatch(MetaffiType::$tag, other)),
                    });
                    self.traced(stringify!($get), result)
                }
            )*
        }
    };
}

scalar_ops! {
    add_int8 / get_int8: i8 => Int8, INT8;
    add_int16 / get_int16: i16 => Int16, INT16;
    add_int32 / get_int32: i32 => Int32, INT32;
    add_int64 / get_int64: i64 => Int64, INT64;
    add_uint8 / get_uint8: u8 => Uint8, UINT8;
    add_uint16 / get_uint16: u16 => Uint16, UINT16;
    add_uint32 / get_uint32: u32 => Uint32, UINT32;
    add_uint64 / get_uint64: u64 => Uint64, UINT64;
    add_float32 / get_float32: f32 => Float32, FLOAT32;
    add_float64 / get_float64: f64 => Float64, FLOAT64;
    add_bool / get_bool: bool => Bool, BOOL;
    add_char8 / get_char8: Char8 => Char8, CHAR8;
    add_char16 / get_char16: Char16 => Char16, CHAR16;
    add_char32 / get_char32: Char32 => Char32, CHAR32;
}

fn mismatch(expected: MetaffiType, actual: &Cdt) -> SerError {
    SerError::TypeMismatch {
        expected,
        actual: actual.type_tag(),
    }
}

impl<'a> Serializer<'a> {
    /// Starts at root index 0, allocating from [`memory::system`].
    pub fn new(root: &'a mut Cdts) -> Self {
        Self::with_allocator(root, memory::system())
    }

    /// Starts at root index 0, allocating from `alloc`.
    pub fn with_allocator(root: &'a mut Cdts, alloc: &'a dyn Allocator) -> Self {
        Self::from_parts(root, alloc, Cursor::new())
    }

    /// Resumes at a parked cursor.
    ///
    /// The cursor should come from a serializer over the same `root`. Closing an array whose
    /// slot does not exist in `root` reports [`SerError::InvalidState`].
    pub fn from_parts(root: &'a mut Cdts, alloc: &'a dyn Allocator, cursor: Cursor) -> Self {
        Self {
            root,
            alloc,
            cursor,
            sink: None,
        }
    }

    /// Attaches a trace sink.
    #[must_use]
    pub fn with_sink(mut self, sink: &'a mut dyn TraceSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Parks the cursor, releasing the borrow of the data. Open arrays move with the cursor.
    #[must_use]
    pub fn into_cursor(mut self) -> Cursor {
        mem::take(&mut self.cursor)
    }

    /// The cursor.
    #[must_use]
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// The root sequence. Arrays that are still open are not in it yet.
    #[must_use]
    pub fn root(&self) -> &Cdts {
        &*self.root
    }

    /// Returns to root index 0, putting every open array back into its slot.
    pub fn reset(&mut self) {
        let open = !self.cursor.frames.is_empty();
        while !self.cursor.frames.is_empty() {
            self.attach_top();
        }
        self.cursor.root_index = 0;
        if open {
            self.trace_unwound(0);
        }
    }

    // --- strings ---

    /// Writes a copy of an 8-bit string, or a null string, and advances.
    pub fn add_string8(&mut self, value: Option<&[u8]>) -> Result<(), SerError> {
        let result = self.add_units(value, AllocKind::String8, Cdt::String8);
        self.traced("add_string8", result)
    }

    /// Writes a copy of a 16-bit string, or a null string, and advances.
    pub fn add_string16(&mut self, value: Option<&[u16]>) -> Result<(), SerError> {
        let result = self.add_units(value, AllocKind::String16, Cdt::String16);
        self.traced("add_string16", result)
    }

    /// Writes a copy of a 32-bit string, or a null string, and advances.
    pub fn add_string32(&mut self, value: Option<&[u32]>) -> Result<(), SerError> {
        let result = self.add_units(value, AllocKind::String32, Cdt::String32);
        self.traced("add_string32", result)
    }

    /// Reads a fresh copy of an 8-bit string and advances. A null string reads as `None`.
    pub fn get_string8(&mut self) -> Result<Option<Vec<u8>>, SerError> {
        let result = self.read(MetaffiType::STRING8, |cdt, alloc| match cdt {
            Cdt::String8(s) => copy_optional(alloc, AllocKind::String8, s.as_deref()),
            other => Err(mismatch(MetaffiType::STRING8, other)),
        });
        self.traced("get_string8", result)
    }

    /// Reads a fresh copy of a 16-bit string and advances.
    pub fn get_string16(&mut self) -> Result<Option<Vec<u16>>, SerError> {
        let result = self.read(MetaffiType::STRING16, |cdt, alloc| match cdt {
            Cdt::String16(s) => copy_optional(alloc, AllocKind::String16, s.as_deref()),
            other => Err(mismatch(MetaffiType::STRING16, other)),
        });
        self.traced("get_string16", result)
    }

    /// Reads a fresh copy of a 32-bit string and advances.
    pub fn get_string32(&mut self) -> Result<Option<Vec<u32>>, SerError> {
        let result = self.read(MetaffiType::STRING32, |cdt, alloc| match cdt {
            Cdt::String32(s) => copy_optional(alloc, AllocKind::String32, s.as_deref()),
            other => Err(mismatch(MetaffiType::STRING32, other)),
        });
        self.traced("get_string32", result)
    }

    // --- records ---

    /// Writes a copy of a handle record and advances.
    ///
    /// The slot does not own the foreign object; its release callback is never called here.
    pub fn add_handle(&mut self, handle: &Handle) -> Result<(), SerError> {
        let result = self.check_bounds().and_then(|index| {
            let record = memory::boxed(self.alloc, *handle)?;
            self.write(index, Cdt::Handle(Some(record)))
        });
        self.traced("add_handle", result)
    }

    /// Reads a handle record and advances. A null record reads as a zeroed handle.
    pub fn get_handle(&mut self) -> Result<Handle, SerError> {
        let result = self.read(MetaffiType::HANDLE, |cdt, _| match cdt {
            Cdt::Handle(h) => Ok(h.as_deref().copied().unwrap_or_default()),
            other => Err(mismatch(MetaffiType::HANDLE, other)),
        });
        self.traced("get_handle", result)
    }

    /// Writes a deep copy of a callable and advances.
    pub fn add_callable(&mut self, callable: &Callable) -> Result<(), SerError> {
        let result = self.check_bounds().and_then(|index| {
            let copy = copy_callable(self.alloc, callable)?;
            let record = memory::boxed(self.alloc, copy)?;
            self.write(index, Cdt::Callable(Some(record)))
        });
        self.traced("add_callable", result)
    }

    /// Reads a deep copy of a callable and advances. A null record reads as an empty callable.
    pub fn get_callable(&mut self) -> Result<Callable, SerError> {
        let result = self.read(MetaffiType::CALLABLE, |cdt, alloc| match cdt {
            Cdt::Callable(Some(c)) => copy_callable(alloc, c),
            Cdt::Callable(None) => Ok(Callable::default()),
            other => Err(mismatch(MetaffiType::CALLABLE, other)),
        });
        self.traced("get_callable", result)
    }

    /// Writes an explicit null and advances.
    pub fn add_null(&mut self) -> Result<(), SerError> {
        let result = self.put(Cdt::Null);
        self.traced("add_null", result)
    }

    // --- arrays ---

    /// Opens a nested array of `length` elements for the current slot.
    ///
    /// Subsequent writes fill the new array. It is stored in the slot, and the parent level
    /// advances, at the matching [`Serializer::add_array_end`].
    pub fn add_array_begin(
        &mut self,
        length: usize,
        element_type: MetaffiType,
    ) -> Result<(), SerError> {
        let result = self.open_for_write(length, element_type.element());
        self.traced("add_array_begin", result)
    }

    /// Closes the innermost array after every element was written, then advances the parent.
    pub fn add_array_end(&mut self) -> Result<(), SerError> {
        let result = self.close(ScopeKind::Write);
        self.traced("add_array_end", result)
    }

    /// Opens the array in the current slot for reading. Returns its length and element type.
    pub fn get_array_begin(&mut self) -> Result<(usize, MetaffiType), SerError> {
        let result = self.open_for_read();
        self.traced("get_array_begin", result)
    }

    /// Closes the innermost array after every element was read, then advances the parent.
    pub fn get_array_end(&mut self) -> Result<(), SerError> {
        let result = self.close(ScopeKind::Read);
        self.traced("get_array_end", result)
    }

    // --- introspection ---

    /// Returns the current slot's type without advancing. A never-written slot reports
    /// [`MetaffiType::NONE`].
    pub fn peek_type(&self) -> Result<MetaffiType, SerError> {
        self.peek_slot().map(Cdt::type_tag)
    }

    /// Returns `true` if the current slot holds an explicit null. Does not advance.
    pub fn is_null(&self) -> Result<bool, SerError> {
        self.peek_slot().map(|cdt| matches!(cdt, Cdt::Null))
    }

    /// The index within the current level.
    #[must_use]
    pub fn index(&self) -> usize {
        self.current_index()
    }

    /// Moves within the current level.
    pub fn set_index(&mut self, index: usize) -> Result<(), SerError> {
        let length = self.current_length();
        if index >= length {
            let err = SerError::Bounds { index, length };
            return self.traced("set_index", Err(err));
        }
        self.move_to(index);
        Ok(())
    }

    /// Length of the current level.
    #[must_use]
    pub fn size(&self) -> usize {
        self.current_length()
    }

    /// Returns `true` while the current level has unvisited slots.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.current_index() < self.current_length()
    }

    /// Number of open arrays.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.cursor.depth()
    }

    // --- internals ---

    fn current_index(&self) -> usize {
        self.cursor
            .frames
            .last()
            .map_or(self.cursor.root_index, |f| f.index)
    }

    fn current_length(&self) -> usize {
        self.level().len()
    }

    fn move_to(&mut self, index: usize) {
        match self.cursor.frames.last_mut() {
            Some(frame) => frame.index = index,
            None => self.cursor.root_index = index,
        }
    }

    fn check_bounds(&self) -> Result<usize, SerError> {
        let index = self.current_index();
        let length = self.current_length();
        if index >= length {
            return Err(SerError::Bounds { index, length });
        }
        Ok(index)
    }

    fn advance(&mut self) {
        match self.cursor.frames.last_mut() {
            Some(frame) => frame.index += 1,
            None => self.cursor.root_index += 1,
        }
    }

    fn level(&self) -> &Cdts {
        match self.cursor.frames.last() {
            Some(frame) => &frame.items,
            None => &*self.root,
        }
    }

    fn level_mut(&mut self) -> &mut Cdts {
        match self.cursor.frames.last_mut() {
            Some(frame) => &mut frame.items,
            None => &mut *self.root,
        }
    }

    pub(crate) fn peek_slot(&self) -> Result<&Cdt, SerError> {
        let index = self.check_bounds()?;
        let level = self.level();
        level.get(index).ok_or(SerError::Bounds {
            index,
            length: level.len(),
        })
    }

    fn write(&mut self, index: usize, value: Cdt) -> Result<(), SerError> {
        let level = self.level_mut();
        let length = level.len();
        let slot = level
            .slot_mut(index)
            .ok_or(SerError::Bounds { index, length })?;
        *slot = value;
        self.advance();
        Ok(())
    }

    fn put(&mut self, value: Cdt) -> Result<(), SerError> {
        let index = self.check_bounds()?;
        self.write(index, value)
    }

    pub(crate) fn read<T>(
        &mut self,
        expected: MetaffiType,
        extract: impl FnOnce(&Cdt, &dyn Allocator) -> Result<T, SerError>,
    ) -> Result<T, SerError> {
        let alloc = self.alloc;
        let cdt = self.peek_slot()?;
        if cdt.type_tag() != expected {
            return Err(mismatch(expected, cdt));
        }
        let value = extract(cdt, alloc)?;
        self.advance();
        Ok(value)
    }

    fn add_units<T: Copy>(
        &mut self,
        value: Option<&[T]>,
        kind: AllocKind,
        wrap: fn(Option<Box<[T]>>) -> Cdt,
    ) -> Result<(), SerError> {
        let index = self.check_bounds()?;
        let payload = match value {
            Some(units) => Some(memory::copy_units(self.alloc, kind, units)?.into_boxed_slice()),
            None => None,
        };
        self.write(index, wrap(payload))
    }

    fn open_for_write(&mut self, length: usize, element_type: MetaffiType) -> Result<(), SerError> {
        self.check_bounds()?;
        let dimensions = i64::try_from(self.cursor.frames.len() + 1).unwrap_or(i64::MAX);
        let items = Cdts::try_with_dimensions_in(self.alloc, length, dimensions)?;
        let items = memory::boxed(self.alloc, items)?;
        memory::reserve_one(self.alloc, &mut self.cursor.frames)?;
        // The slot keeps its old contents until `add_array_end` stores the array there.
        self.cursor.frames.push(ArrayFrame {
            index: 0,
            element_type,
            kind: ScopeKind::Write,
            items,
        });
        self.trace_enter(ScopeKind::Write, length, element_type);
        Ok(())
    }

    fn open_for_read(&mut self) -> Result<(usize, MetaffiType), SerError> {
        let index = match self.peek_slot()? {
            Cdt::Array { .. } => self.current_index(),
            other => return Err(mismatch(MetaffiType::ARRAY, other)),
        };
        memory::reserve_one(self.alloc, &mut self.cursor.frames)?;
        let level = self.level_mut();
        let length = level.len();
        let slot = level
            .slot_mut(index)
            .ok_or(SerError::Bounds { index, length })?;
        let (element_type, items) = match mem::take(slot) {
            Cdt::Array {
                element_type,
                items,
            } => (element_type, items),
            other => {
                let err = mismatch(MetaffiType::ARRAY, &other);
                *slot = other;
                return Err(err);
            }
        };
        let length = items.len();
        self.cursor.frames.push(ArrayFrame {
            index: 0,
            element_type,
            kind: ScopeKind::Read,
            items,
        });
        self.trace_enter(ScopeKind::Read, length, element_type);
        Ok((length, element_type))
    }

    fn close(&mut self, kind: ScopeKind) -> Result<(), SerError> {
        let Some(frame) = self.cursor.frames.last() else {
            return Err(ArrayStateError::NotInArray.into());
        };
        let (index, length) = (frame.index, frame.items.len());
        if index != length {
            return Err(match kind {
                ScopeKind::Write => ArrayStateError::NotPopulated { index, length },
                ScopeKind::Read => ArrayStateError::NotFullyRead { index, length },
            }
            .into());
        }
        if !self.parent_has_slot() {
            return Err(DANGLING_FRAME);
        }
        let depth = self.cursor.frames.len();
        self.attach_top();
        self.advance();
        if let Some(sink) = self.sink.as_deref_mut()
            && sink.mask().contains(TraceMask::ARRAY)
        {
            sink.scope_exit(kind, depth);
        }
        Ok(())
    }

    // Whether the slot the innermost open array belongs in exists.
    fn parent_has_slot(&self) -> bool {
        let frames = &self.cursor.frames;
        match frames.len().checked_sub(2) {
            Some(parent) => frames
                .get(parent)
                .is_some_and(|f| f.index < f.items.len()),
            None => self.cursor.root_index < self.root.len(),
        }
    }

    // Pops the innermost open array into its slot in the parent level, without advancing. An
    // array with no slot to go back to is dropped.
    fn attach_top(&mut self) {
        let Some(frame) = self.cursor.frames.pop() else {
            return;
        };
        let index = self.current_index();
        if let Some(slot) = self.level_mut().slot_mut(index) {
            *slot = Cdt::Array {
                element_type: frame.element_type,
                items: frame.items,
            };
        }
    }

    /// Closes the arrays opened since the cursor was at `depth` and moves back to `index`.
    ///
    /// Arrays opened for reading go back into their slots. Arrays opened for writing are
    /// dropped, so their slots keep what they held before.
    pub(crate) fn unwind(&mut self, depth: usize, index: usize) {
        if self.cursor.frames.len() <= depth {
            self.move_to(index);
            return;
        }
        while self.cursor.frames.len() > depth {
            match self.cursor.frames.last().map(|f| f.kind) {
                Some(ScopeKind::Read) => self.attach_top(),
                _ => {
                    self.cursor.frames.pop();
                }
            }
        }
        self.move_to(index);
        self.trace_unwound(depth);
    }

    fn trace_enter(&mut self, kind: ScopeKind, length: usize, element_type: MetaffiType) {
        if let Some(sink) = self.sink.as_deref_mut()
            && sink.mask().contains(TraceMask::ARRAY)
        {
            sink.scope_enter(kind, self.cursor.frames.len(), length, element_type);
        }
    }

    fn trace_unwound(&mut self, depth: usize) {
        if let Some(sink) = self.sink.as_deref_mut()
            && sink.mask().contains(TraceMask::ARRAY)
        {
            sink.scopes_unwound(depth);
        }
    }

    fn traced<T>(&mut self, op: &'static str, result: Result<T, SerError>) -> Result<T, SerError> {
        if let Err(err) = &result
            && let Some(sink) = self.sink.as_deref_mut()
            && sink.mask().contains(TraceMask::ERROR)
        {
            sink.error(op, self.cursor.frames.len(), err);
        }
        result
    }
}

fn copy_optional<T: Copy>(
    alloc: &dyn Allocator,
    kind: AllocKind,
    units: Option<&[T]>,
) -> Result<Option<Vec<T>>, SerError> {
    units
        .map(|u| memory::copy_units(alloc, kind, u))
        .transpose()
        .map_err(SerError::from)
}

fn copy_callable(alloc: &dyn Allocator, callable: &Callable) -> Result<Callable, SerError> {
    Ok(Callable {
        value: callable.value,
        params: memory::copy_units(alloc, AllocKind::TypeArray, &callable.params)?,
        retvals: memory::copy_units(alloc, AllocKind::TypeArray, &callable.retvals)?,
    })
}
