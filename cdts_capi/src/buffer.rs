// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Buffers handed to C callers.
//!
//! Each buffer stores its element count in a header in front of the returned pointer, so the
//! matching free needs only the pointer. Writing a shorter string into a buffer does not
//! change how it is freed.

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::ptr;

const HEADER: usize = 16;

fn layout<T>(count: usize) -> Option<Layout> {
    let bytes = count.checked_mul(size_of::<T>())?.checked_add(HEADER)?;
    Layout::from_size_align(bytes, HEADER).ok()
}

/// Allocates `count` zeroed units of `T`, or returns null.
pub(crate) fn zeroed<T: Copy>(count: usize) -> *mut T {
    debug_assert!(align_of::<T>() <= HEADER, "unit alignment exceeds the header");
    let Some(layout) = layout::<T>(count) else {
        return ptr::null_mut();
    };
    // SAFETY: the layout is never zero-sized; it always holds the header.
    let base = unsafe { alloc_zeroed(layout) };
    if base.is_null() {
        return ptr::null_mut();
    }
    // SAFETY: `base` is aligned to HEADER and the block is at least HEADER bytes long.
    unsafe {
        base.cast::<usize>().write(count);
        base.add(HEADER).cast::<T>()
    }
}

/// Frees a buffer from [`zeroed`]. Null is ignored.
///
/// # Safety
///
/// `data` must be null or come from `zeroed::<T>` (or a helper built on it) and must not have
/// been freed.
pub(crate) unsafe fn free<T>(data: *mut T) {
    if data.is_null() {
        return;
    }
    // SAFETY: the caller guarantees `data` sits HEADER bytes into a block from `zeroed::<T>`.
    unsafe {
        let base = data.cast::<u8>().sub(HEADER);
        let count = base.cast::<usize>().read();
        if let Some(layout) = layout::<T>(count) {
            dealloc(base, layout);
        }
    }
}

/// Copies `units` and a zero terminator into a new buffer, or returns null.
pub(crate) fn terminated<T: Copy>(units: &[T]) -> *mut T {
    let Some(count) = units.len().checked_add(1) else {
        return ptr::null_mut();
    };
    let data = zeroed::<T>(count);
    if !data.is_null() {
        // SAFETY: `data` holds `units.len() + 1` units; the last one stays zero.
        unsafe { ptr::copy_nonoverlapping(units.as_ptr(), data, units.len()) };
    }
    data
}

/// Copies `units` into a new buffer. An empty slice gives null.
pub(crate) fn copied<T: Copy>(units: &[T]) -> Option<*mut T> {
    if units.is_empty() {
        return Some(ptr::null_mut());
    }
    let data = zeroed::<T>(units.len());
    if data.is_null() {
        return None;
    }
    // SAFETY: `data` holds `units.len()` units.
    unsafe { ptr::copy_nonoverlapping(units.as_ptr(), data, units.len()) };
    Some(data)
}

/// Units before the first zero.
///
/// # Safety
///
/// `data` must be non-null and point to a zero-terminated run of `T`.
pub(crate) unsafe fn until_zero<'a, T: Copy + PartialEq + Default>(data: *const T) -> &'a [T] {
    let zero = T::default();
    let mut len = 0;
    // SAFETY: the caller guarantees a terminator, so every read up to it is in bounds.
    unsafe {
        while *data.add(len) != zero {
            len += 1;
        }
        std::slice::from_raw_parts(data, len)
    }
}
