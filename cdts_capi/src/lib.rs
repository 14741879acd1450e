// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! C ABI for [`cdts`].
//!
//! A C caller owns a sequence (`cdts_new`/`cdts_free`) and drives it through an opaque
//! serializer (`cdts_ser_create`/`cdts_ser_destroy`). Every `cdts_ser_*` operation returns one of
//! the `CDTS_SER_*` status codes and, on failure, may store a message in `*out_err`. The message
//! is written only when `out_err` is non-null and `*out_err` is still null, so the first error of
//! a sequence of calls is kept. Messages are freed with [`cdts_free_error`].
//!
//! Strings cross the boundary zero-terminated. Strings, callable type arrays and error messages
//! returned to the caller are freed with the matching `cdts_free_*` function.

#![allow(unsafe_code, reason = "this crate is the C boundary")]

mod buffer;

use std::ffi::{c_char, c_int, c_void};
use std::fmt::Display;
use std::ptr;

use cdts::memory::{AllocError, AllocKind, system};
use cdts::{
    Callable, Cdts, Char8, Char16, Char32, Cursor, ErrorCode, ForeignPtr, Handle, MetaffiType,
    SerError, Serializer,
};

/// The operation succeeded.
pub const CDTS_SER_SUCCESS: c_int = ErrorCode::Success.as_i32();
/// Index at or past the end of the current level.
pub const CDTS_SER_ERROR_BOUNDS: c_int = ErrorCode::Bounds.as_i32();
/// The slot holds another type than requested.
pub const CDTS_SER_ERROR_TYPE_MISMATCH: c_int = ErrorCode::TypeMismatch.as_i32();
/// A required pointer was null.
pub const CDTS_SER_ERROR_NULL_POINTER: c_int = ErrorCode::NullPointer.as_i32();
/// The serializer is inconsistent with its data.
pub const CDTS_SER_ERROR_INVALID_STATE: c_int = ErrorCode::InvalidState.as_i32();
/// An allocation failed.
pub const CDTS_SER_ERROR_MEMORY: c_int = ErrorCode::Memory.as_i32();
/// Array begin/end misuse.
pub const CDTS_SER_ERROR_INVALID_ARRAY_STATE: c_int = ErrorCode::InvalidArrayState.as_i32();

/// A handle record as C sees it.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct CdtHandle {
    /// The foreign object.
    pub handle: *mut c_void,
    /// Id of the owning runtime.
    pub runtime_id: u64,
    /// The owner's release callback. Never called by this library.
    pub release: Option<unsafe extern "C" fn(*mut CdtHandle)>,
}

/// A callable record as C sees it.
///
/// Type arrays returned by [`cdts_ser_get_callable`] are freed with
/// [`cdts_free_callable_types`].
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct CdtCallable {
    /// The foreign function.
    pub val: *mut c_void,
    /// Parameter type tags.
    pub parameters_types: *mut u64,
    /// Number of parameter type tags.
    pub params_types_length: i8,
    /// Return type tags.
    pub retval_types: *mut u64,
    /// Number of return type tags.
    pub retval_types_length: i8,
}

/// One UTF-8 character, zero padded.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CdtChar8 {
    /// Code units.
    pub c: [u8; 4],
}

/// One UTF-16 character, zero padded.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CdtChar16 {
    /// Code units.
    pub c: [u16; 2],
}

/// One UTF-32 character.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CdtChar32 {
    /// The code point.
    pub c: u32,
}

/// An opaque serializer: a parked cursor over a caller-owned sequence.
#[derive(Debug)]
pub struct CdtsSerializer {
    root: *mut Cdts,
    cursor: Cursor,
}

const SERIALIZER_NULL: SerError = SerError::NullPointer { what: "Serializer" };
const VALUE_NULL: SerError = SerError::NullPointer { what: "Value" };
const VALUE_POINTER_NULL: SerError = SerError::NullPointer {
    what: "Value pointer",
};
const OUTPUT_NULL: SerError = SerError::NullPointer {
    what: "Output pointer",
};

// --- helpers ---

/// Stores `err` in `*out_err` unless a message is already there.
unsafe fn set_error(out_err: *mut *mut c_char, err: &dyn Display) {
    if out_err.is_null() {
        return;
    }
    // SAFETY: the caller passes either null or a writable `char*` slot.
    unsafe {
        if (*out_err).is_null() {
            *out_err = buffer::terminated(err.to_string().as_bytes()).cast();
        }
    }
}

unsafe fn fail(out_err: *mut *mut c_char, err: SerError) -> c_int {
    // SAFETY: forwarded from the caller.
    unsafe { set_error(out_err, &err) };
    err.code().as_i32()
}

/// Resumes the parked cursor of `ser`, runs `op`, and parks the cursor again.
unsafe fn with_serializer<T>(
    ser: *mut CdtsSerializer,
    out_err: *mut *mut c_char,
    op: impl FnOnce(&mut Serializer<'_>) -> Result<T, SerError>,
) -> Result<T, c_int> {
    // SAFETY: the caller passes null or a live serializer from `cdts_ser_create`.
    let Some(state) = (unsafe { ser.as_mut() }) else {
        // SAFETY: forwarded from the caller.
        return Err(unsafe { fail(out_err, SERIALIZER_NULL) });
    };
    // SAFETY: `cdts_ser_create` rejects null roots, and the caller keeps the root alive.
    let root = unsafe { &mut *state.root };
    let mut s = Serializer::from_parts(root, system(), std::mem::take(&mut state.cursor));
    let result = op(&mut s);
    state.cursor = s.into_cursor();
    // SAFETY: forwarded from the caller.
    result.map_err(|err| unsafe { fail(out_err, err) })
}

fn status(result: Result<(), c_int>) -> c_int {
    result.err().unwrap_or(CDTS_SER_SUCCESS)
}

/// Turns a caller's output pointer into a reference.
unsafe fn out_ref<'a, T>(out: *mut T, null: SerError) -> Result<&'a mut T, SerError> {
    // SAFETY: the caller passes null or a writable, aligned `T`.
    unsafe { out.as_mut() }.ok_or(null)
}

/// Turns a caller's input pointer into a reference.
unsafe fn in_ref<'a, T>(val: *const T, null: SerError) -> Result<&'a T, SerError> {
    // SAFETY: the caller passes null or a readable, aligned `T`.
    unsafe { val.as_ref() }.ok_or(null)
}

fn string_memory(kind: AllocKind, len: usize) -> SerError {
    SerError::Memory(AllocError { kind, len })
}

/// Reads with `get`, then exports the value with `export`. If the export fails, the cursor is
/// moved back so the slot can be read again.
fn get_exported<V, T>(
    s: &mut Serializer<'_>,
    get: impl FnOnce(&mut Serializer<'_>) -> Result<V, SerError>,
    export: impl FnOnce(V) -> Result<T, SerError>,
) -> Result<T, SerError> {
    let index = s.index();
    let value = get(s)?;
    match export(value) {
        Ok(out) => Ok(out),
        Err(err) => {
            s.set_index(index)?;
            Err(err)
        }
    }
}

fn export_string<T: Copy>(value: Option<Vec<T>>, kind: AllocKind) -> Result<*mut T, SerError> {
    match value {
        None => Ok(ptr::null_mut()),
        Some(units) => {
            let data = buffer::terminated(&units);
            if data.is_null() {
                return Err(string_memory(kind, units.len()));
            }
            Ok(data)
        }
    }
}

fn handle_from_c(h: &CdtHandle) -> Handle {
    Handle {
        value: ForeignPtr::from_ptr(h.handle.cast_const()),
        runtime_id: h.runtime_id,
        release: h
            .release
            .map_or(ForeignPtr::NULL, |f| ForeignPtr::from_ptr(f as *const ())),
    }
}

fn handle_to_c(h: &Handle) -> CdtHandle {
    let release = if h.release.is_null() {
        None
    } else {
        // SAFETY: a non-null function pointer has the size of a data pointer, and the address is
        // only handed back to the caller, never called here.
        Some(unsafe {
            std::mem::transmute::<*mut (), unsafe extern "C" fn(*mut CdtHandle)>(
                h.release.as_ptr::<()>(),
            )
        })
    };
    CdtHandle {
        handle: h.value.as_ptr(),
        runtime_id: h.runtime_id,
        release,
    }
}

/// Reads a caller's type array.
unsafe fn types_from_c(data: *const u64, len: i8) -> Result<Vec<MetaffiType>, SerError> {
    let len = usize::try_from(len).unwrap_or(0);
    if len == 0 {
        return Ok(Vec::new());
    }
    if data.is_null() {
        return Err(SerError::NullPointer {
            what: "Callable types",
        });
    }
    // SAFETY: the caller guarantees `len` readable tags.
    let tags = unsafe { std::slice::from_raw_parts(data, len) };
    Ok(tags.iter().copied().map(MetaffiType).collect())
}

fn callable_to_c(c: &Callable) -> Result<CdtCallable, SerError> {
    let too_long = SerError::InvalidState {
        what: "callable signature has more than 127 types",
    };
    let params_len = i8::try_from(c.params.len()).map_err(|_| too_long)?;
    let retvals_len = i8::try_from(c.retvals.len()).map_err(|_| too_long)?;
    let params: Vec<u64> = c.params.iter().map(|t| t.0).collect();
    let retvals: Vec<u64> = c.retvals.iter().map(|t| t.0).collect();
    let types_memory = |len| {
        SerError::Memory(AllocError {
            kind: AllocKind::TypeArray,
            len,
        })
    };
    let parameters_types = buffer::copied(&params).ok_or_else(|| types_memory(params.len()))?;
    let Some(retval_types) = buffer::copied(&retvals) else {
        // SAFETY: allocated just above.
        unsafe { buffer::free(parameters_types) };
        return Err(types_memory(retvals.len()));
    };
    Ok(CdtCallable {
        val: c.value.as_ptr(),
        parameters_types,
        params_types_length: params_len,
        retval_types,
        retval_types_length: retvals_len,
    })
}

// --- sequences ---

/// Allocates a sequence of `length` empty slots.
///
/// Returns null if the slots cannot be allocated. Free with [`cdts_free`].
#[unsafe(no_mangle)]
pub extern "C" fn cdts_new(length: u64, fixed_dimensions: i64) -> *mut Cdts {
    let Ok(length) = usize::try_from(length) else {
        return ptr::null_mut();
    };
    match Cdts::try_with_dimensions_in(system(), length, fixed_dimensions) {
        Ok(cdts) => Box::into_raw(Box::new(cdts)),
        Err(_) => ptr::null_mut(),
    }
}

/// Frees a sequence and everything its slots own.
///
/// # Safety
///
/// `cdts` must be null or come from [`cdts_new`], must not have been freed, and must not be in
/// use by a live serializer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_free(cdts: *mut Cdts) {
    if cdts.is_null() {
        return;
    }
    // SAFETY: the caller guarantees ownership came from `cdts_new`.
    drop(unsafe { Box::from_raw(cdts) });
}

/// Number of root slots of a sequence, or 0 for null.
///
/// # Safety
///
/// `cdts` must be null or a live sequence from [`cdts_new`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_length(cdts: *const Cdts) -> u64 {
    // SAFETY: the caller passes null or a live sequence.
    unsafe { cdts.as_ref() }.map_or(0, |c| c.len() as u64)
}

// --- lifecycle ---

/// Creates a serializer at root index 0 of `data`. The serializer borrows `data`.
///
/// Returns null, with a message, if `data` is null.
///
/// # Safety
///
/// `data` must be null or a live sequence that outlives the serializer. `out_err` must be null
/// or point to a writable `char*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_create(
    data: *mut Cdts,
    out_err: *mut *mut c_char,
) -> *mut CdtsSerializer {
    if data.is_null() {
        // SAFETY: forwarded from the caller.
        unsafe { fail(out_err, SerError::NullPointer { what: "CDTS data" }) };
        return ptr::null_mut();
    }
    Box::into_raw(Box::new(CdtsSerializer {
        root: data,
        cursor: Cursor::new(),
    }))
}

/// Destroys a serializer. Arrays still open are stored in their slots of the sequence.
///
/// # Safety
///
/// `ser` must be null or come from [`cdts_ser_create`] and not have been destroyed. If any array
/// is still open, the sequence it was created over must still be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_destroy(ser: *mut CdtsSerializer) {
    if ser.is_null() {
        return;
    }
    // SAFETY: the caller guarantees ownership came from `cdts_ser_create`.
    let state = unsafe { Box::from_raw(ser) };
    let CdtsSerializer { root, cursor } = *state;
    if cursor.depth() == 0 {
        return;
    }
    // SAFETY: `cdts_ser_create` rejects null roots, and the caller keeps the root alive while
    // arrays are open.
    let root = unsafe { &mut *root };
    drop(Serializer::from_parts(root, system(), cursor));
}

/// Returns to root index 0, storing every open array in its slot.
///
/// # Safety
///
/// `ser` must be null or a live serializer. `out_err` must be null or point to a writable `char*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_reset(
    ser: *mut CdtsSerializer,
    out_err: *mut *mut c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe {
        with_serializer(ser, out_err, |s| {
            s.reset();
            Ok(())
        })
    })
}

// --- scalars ---

macro_rules! scalar_abi {
    ($($add:ident / $get:ident: $ty:ty => $core_add:ident / $core_get:ident;)*) => {
        $(
            #[doc = concat!("Writes a `", stringify!($ty), "` and advances.")]
            ///
            /// # Safety
            ///
            /// `ser` must be null or a live serializer whose sequence is still alive. `out_err`
            /// must be null or point to a writable `char*`.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn $add(
                ser: *mut CdtsSerializer,
                val: $ty,
                out_err: *mut *mut c_char,
            ) -> c_int {
                // SAFETY: forwarded from the caller.
                status(unsafe { with_serializer(ser, out_err, |s| s.$core_add(val)) })
            }

            #[doc = concat!("Reads a `", stringify!($ty), "` into `*val` and advances.")]
            ///
            /// # Safety
            ///
            /// As for the matching add, and `val` must be null or writable.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn $get(
                ser: *mut CdtsSerializer,
                val: *mut $ty,
                out_err: *mut *mut c_char,
            ) -> c_int {
                // SAFETY: forwarded from the caller.
                status(unsafe {
                    with_serializer(ser, out_err, |s| {
                        let out = out_ref(val, VALUE_POINTER_NULL)?;
                        *out = s.$core_get()?;
                        Ok(())
                    })
                })
            }
        )*
    };
}

scalar_abi! {
    cdts_ser_add_int8 / cdts_ser_get_int8: i8 => add_int8 / get_int8;
    cdts_ser_add_int16 / cdts_ser_get_int16: i16 => add_int16 / get_int16;
    cdts_ser_add_int32 / cdts_ser_get_int32: i32 => add_int32 / get_int32;
    cdts_ser_add_int64 / cdts_ser_get_int64: i64 => add_int64 / get_int64;
    cdts_ser_add_uint8 / cdts_ser_get_uint8: u8 => add_uint8 / get_uint8;
    cdts_ser_add_uint16 / cdts_ser_get_uint16: u16 => add_uint16 / get_uint16;
    cdts_ser_add_uint32 / cdts_ser_get_uint32: u32 => add_uint32 / get_uint32;
    cdts_ser_add_uint64 / cdts_ser_get_uint64: u64 => add_uint64 / get_uint64;
    cdts_ser_add_float32 / cdts_ser_get_float32: f32 => add_float32 / get_float32;
    cdts_ser_add_float64 / cdts_ser_get_float64: f64 => add_float64 / get_float64;
    cdts_ser_add_bool / cdts_ser_get_bool: bool => add_bool / get_bool;
}

// --- characters ---

macro_rules! char_abi {
    ($($add:ident / $get:ident: $c:ident => $core_add:ident / $core_get:ident,
        |$from:ident| $to_core:expr, |$back:ident| $to_c:expr;)*) => {
        $(
            #[doc = concat!("Writes a copy of `*val` and advances. Null `val` is rejected.")]
            ///
            /// # Safety
            ///
            /// `ser` must be null or a live serializer whose sequence is still alive. `val` must
            /// be null or readable. `out_err` must be null or point to a writable `char*`.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn $add(
                ser: *mut CdtsSerializer,
                val: *const $c,
                out_err: *mut *mut c_char,
            ) -> c_int {
                // SAFETY: forwarded from the caller.
                status(unsafe {
                    with_serializer(ser, out_err, |s| {
                        let $from = in_ref(val, VALUE_NULL)?;
                        s.$core_add($to_core)
                    })
                })
            }

            #[doc = concat!("Reads a character into `*val` and advances.")]
            ///
            /// # Safety
            ///
            /// As for the matching add, and `val` must be null or writable.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn $get(
                ser: *mut CdtsSerializer,
                val: *mut $c,
                out_err: *mut *mut c_char,
            ) -> c_int {
                // SAFETY: forwarded from the caller.
                status(unsafe {
                    with_serializer(ser, out_err, |s| {
                        let out = out_ref(val, VALUE_POINTER_NULL)?;
                        let $back = s.$core_get()?;
                        *out = $to_c;
                        Ok(())
                    })
                })
            }
        )*
    };
}

char_abi! {
    cdts_ser_add_char8 / cdts_ser_get_char8: CdtChar8 => add_char8 / get_char8,
        |c| Char8::from_units(c.c), |v| CdtChar8 { c: v.units() };
    cdts_ser_add_char16 / cdts_ser_get_char16: CdtChar16 => add_char16 / get_char16,
        |c| Char16::from_units(c.c), |v| CdtChar16 { c: v.units() };
    cdts_ser_add_char32 / cdts_ser_get_char32: CdtChar32 => add_char32 / get_char32,
        |c| Char32(c.c), |v| CdtChar32 { c: v.0 };
}

// --- strings ---

macro_rules! string_abi {
    ($($add:ident / $get:ident: $unit:ty => $core_add:ident / $core_get:ident, $kind:ident;)*) => {
        $(
            #[doc = concat!(
                "Writes a copy of the zero-terminated string `val`, or a null string if `val` is ",
                "null, and advances."
            )]
            ///
            /// # Safety
            ///
            /// `ser` must be null or a live serializer whose sequence is still alive. `val` must
            /// be null or zero-terminated. `out_err` must be null or point to a writable `char*`.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn $add(
                ser: *mut CdtsSerializer,
                val: *const $unit,
                out_err: *mut *mut c_char,
            ) -> c_int {
                // SAFETY: forwarded from the caller.
                status(unsafe {
                    with_serializer(ser, out_err, |s| {
                        let units = if val.is_null() {
                            None
                        } else {
                            Some(buffer::until_zero(val))
                        };
                        s.$core_add(units)
                    })
                })
            }

            #[doc = concat!(
                "Reads a fresh zero-terminated copy into `*val` (null for a null string) and ",
                "advances. The copy is freed with the matching `cdts_free_string*`."
            )]
            ///
            /// # Safety
            ///
            /// As for the matching add, and `val` must be null or writable.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn $get(
                ser: *mut CdtsSerializer,
                val: *mut *mut $unit,
                out_err: *mut *mut c_char,
            ) -> c_int {
                // SAFETY: forwarded from the caller.
                status(unsafe {
                    with_serializer(ser, out_err, |s| {
                        let out = out_ref(val, VALUE_POINTER_NULL)?;
                        *out = get_exported(
                            s,
                            |s| s.$core_get(),
                            |v| export_string(v, AllocKind::$kind),
                        )?;
                        Ok(())
                    })
                })
            }
        )*
    };
}

string_abi! {
    cdts_ser_add_string8 / cdts_ser_get_string8: u8 => add_string8 / get_string8, String8;
    cdts_ser_add_string16 / cdts_ser_get_string16: u16 => add_string16 / get_string16, String16;
    cdts_ser_add_string32 / cdts_ser_get_string32: u32 => add_string32 / get_string32, String32;
}

// --- records ---

/// Writes a copy of `*handle` and advances. The release callback is stored, never called.
///
/// # Safety
///
/// `ser` must be null or a live serializer whose sequence is still alive. `handle` must be null
/// or readable. `out_err` must be null or point to a writable `char*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_add_handle(
    ser: *mut CdtsSerializer,
    handle: *const CdtHandle,
    out_err: *mut *mut c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe {
        with_serializer(ser, out_err, |s| {
            let h = in_ref(handle, SerError::NullPointer { what: "Handle" })?;
            s.add_handle(&handle_from_c(h))
        })
    })
}

/// Reads a handle into `*handle` and advances. A null record reads as a zeroed handle.
///
/// # Safety
///
/// As for [`cdts_ser_add_handle`], and `handle` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_get_handle(
    ser: *mut CdtsSerializer,
    handle: *mut CdtHandle,
    out_err: *mut *mut c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe {
        with_serializer(ser, out_err, |s| {
            let out = out_ref(
                handle,
                SerError::NullPointer {
                    what: "Handle pointer",
                },
            )?;
            *out = handle_to_c(&s.get_handle()?);
            Ok(())
        })
    })
}

/// Writes a deep copy of `*callable` and advances.
///
/// # Safety
///
/// `ser` must be null or a live serializer whose sequence is still alive. `callable` must be null
/// or readable, with each type array holding its declared number of tags. `out_err` must be null
/// or point to a writable `char*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_add_callable(
    ser: *mut CdtsSerializer,
    callable: *const CdtCallable,
    out_err: *mut *mut c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe {
        with_serializer(ser, out_err, |s| {
            let c = in_ref(callable, SerError::NullPointer { what: "Callable" })?;
            let record = Callable {
                value: ForeignPtr::from_ptr(c.val.cast_const()),
                params: types_from_c(c.parameters_types, c.params_types_length)?,
                retvals: types_from_c(c.retval_types, c.retval_types_length)?,
            };
            s.add_callable(&record)
        })
    })
}

/// Reads a deep copy of a callable into `*callable` and advances. The type arrays are freed with
/// [`cdts_free_callable_types`].
///
/// # Safety
///
/// As for [`cdts_ser_add_callable`], and `callable` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_get_callable(
    ser: *mut CdtsSerializer,
    callable: *mut CdtCallable,
    out_err: *mut *mut c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe {
        with_serializer(ser, out_err, |s| {
            let out = out_ref(
                callable,
                SerError::NullPointer {
                    what: "Callable pointer",
                },
            )?;
            *out = get_exported(s, |s| s.get_callable(), |c| callable_to_c(&c))?;
            Ok(())
        })
    })
}

/// Writes an explicit null and advances.
///
/// # Safety
///
/// `ser` must be null or a live serializer whose sequence is still alive. `out_err` must be null
/// or point to a writable `char*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_add_null(
    ser: *mut CdtsSerializer,
    out_err: *mut *mut c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe { with_serializer(ser, out_err, |s| s.add_null()) })
}

// --- arrays ---

/// Opens a nested array of `length` elements in the current slot.
///
/// # Safety
///
/// `ser` must be null or a live serializer whose sequence is still alive. `out_err` must be null
/// or point to a writable `char*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_add_array_begin(
    ser: *mut CdtsSerializer,
    length: u64,
    element_type: u64,
    out_err: *mut *mut c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe {
        with_serializer(ser, out_err, |s| {
            let length = usize::try_from(length).map_err(|_| {
                SerError::Memory(AllocError {
                    kind: AllocKind::CdtArray,
                    len: usize::MAX,
                })
            })?;
            s.add_array_begin(length, MetaffiType(element_type))
        })
    })
}

/// Closes the innermost array once every element was written.
///
/// # Safety
///
/// As for [`cdts_ser_add_array_begin`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_add_array_end(
    ser: *mut CdtsSerializer,
    out_err: *mut *mut c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe { with_serializer(ser, out_err, |s| s.add_array_end()) })
}

/// Opens the array in the current slot for reading, storing its length and element type.
///
/// # Safety
///
/// As for [`cdts_ser_add_array_begin`], and both output pointers must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_get_array_begin(
    ser: *mut CdtsSerializer,
    length: *mut u64,
    element_type: *mut u64,
    out_err: *mut *mut c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe {
        with_serializer(ser, out_err, |s| {
            let both = SerError::NullPointer {
                what: "Output pointers",
            };
            let length = out_ref(length, both)?;
            let element_type = out_ref(element_type, both)?;
            let (len, ty) = s.get_array_begin()?;
            *length = len as u64;
            *element_type = ty.0;
            Ok(())
        })
    })
}

/// Closes the innermost array once every element was read.
///
/// # Safety
///
/// As for [`cdts_ser_add_array_begin`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_get_array_end(
    ser: *mut CdtsSerializer,
    out_err: *mut *mut c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe { with_serializer(ser, out_err, |s| s.get_array_end()) })
}

// --- introspection ---

/// Type of the current slot, without advancing. Returns the null type on error.
///
/// # Safety
///
/// `ser` must be null or a live serializer whose sequence is still alive. `out_err` must be null
/// or point to a writable `char*`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_peek_type(
    ser: *mut CdtsSerializer,
    out_err: *mut *mut c_char,
) -> u64 {
    // SAFETY: forwarded from the caller.
    unsafe { with_serializer(ser, out_err, |s| s.peek_type()) }
        .map_or(MetaffiType::NULL.0, |t| t.0)
}

/// Stores whether the current slot holds an explicit null. Does not advance.
///
/// # Safety
///
/// As for [`cdts_ser_peek_type`], and `is_null` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_is_null(
    ser: *mut CdtsSerializer,
    is_null: *mut bool,
    out_err: *mut *mut c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe {
        with_serializer(ser, out_err, |s| {
            let out = out_ref(is_null, OUTPUT_NULL)?;
            *out = s.is_null()?;
            Ok(())
        })
    })
}

/// Index within the current level, or 0 for a null serializer.
///
/// # Safety
///
/// As for [`cdts_ser_peek_type`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_get_index(
    ser: *mut CdtsSerializer,
    out_err: *mut *mut c_char,
) -> u64 {
    // SAFETY: forwarded from the caller.
    unsafe { with_serializer(ser, out_err, |s| Ok(s.index() as u64)) }.unwrap_or(0)
}

/// Moves within the current level.
///
/// # Safety
///
/// As for [`cdts_ser_peek_type`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_set_index(
    ser: *mut CdtsSerializer,
    index: u64,
    out_err: *mut *mut c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe {
        with_serializer(ser, out_err, |s| {
            let index = usize::try_from(index).unwrap_or(usize::MAX);
            s.set_index(index)
        })
    })
}

/// Length of the current level, or 0 for a null serializer.
///
/// # Safety
///
/// As for [`cdts_ser_peek_type`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_size(
    ser: *mut CdtsSerializer,
    out_err: *mut *mut c_char,
) -> u64 {
    // SAFETY: forwarded from the caller.
    unsafe { with_serializer(ser, out_err, |s| Ok(s.size() as u64)) }.unwrap_or(0)
}

/// Stores whether the current level has unvisited slots.
///
/// # Safety
///
/// As for [`cdts_ser_peek_type`], and `has_more` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_ser_has_more(
    ser: *mut CdtsSerializer,
    has_more: *mut bool,
    out_err: *mut *mut c_char,
) -> c_int {
    // SAFETY: forwarded from the caller.
    status(unsafe {
        with_serializer(ser, out_err, |s| {
            *out_ref(has_more, OUTPUT_NULL)? = s.has_more();
            Ok(())
        })
    })
}

// --- buffers ---

/// Allocates `size` zeroed bytes, or returns null. Free with [`cdts_free_memory`].
#[unsafe(no_mangle)]
pub extern "C" fn cdts_alloc_memory(size: u64) -> *mut c_void {
    usize::try_from(size).map_or(ptr::null_mut(), |size| buffer::zeroed::<u8>(size).cast())
}

/// Frees a block from [`cdts_alloc_memory`].
///
/// # Safety
///
/// `data` must be null or come from [`cdts_alloc_memory`] and not have been freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_free_memory(data: *mut c_void) {
    // SAFETY: forwarded from the caller.
    unsafe { buffer::free(data.cast::<u8>()) };
}

macro_rules! string_buffers {
    ($($alloc:ident / $free:ident: $unit:ty;)*) => {
        $(
            #[doc = concat!(
                "Allocates room for `length` units of `", stringify!($unit), "` plus a ",
                "terminator, all zero, or returns null."
            )]
            #[unsafe(no_mangle)]
            pub extern "C" fn $alloc(length: u64) -> *mut $unit {
                usize::try_from(length)
                    .ok()
                    .and_then(|len| len.checked_add(1))
                    .map_or(ptr::null_mut(), buffer::zeroed::<$unit>)
            }

            /// Frees a string returned by this library.
            ///
            /// # Safety
            ///
            /// `data` must be null or a string returned by this library for this width, and
            /// must not have been freed.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn $free(data: *mut $unit) {
                // SAFETY: forwarded from the caller.
                unsafe { buffer::free(data) };
            }
        )*
    };
}

string_buffers! {
    cdts_alloc_string8 / cdts_free_string8: u8;
    cdts_alloc_string16 / cdts_free_string16: u16;
    cdts_alloc_string32 / cdts_free_string32: u32;
}

/// Frees an error message.
///
/// # Safety
///
/// `err` must be null or a message stored by this library and not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_free_error(err: *mut c_char) {
    // SAFETY: forwarded from the caller.
    unsafe { buffer::free(err.cast::<u8>()) };
}

/// Frees the type arrays of a callable read by [`cdts_ser_get_callable`] and nulls them.
///
/// # Safety
///
/// `callable` must be null or point to a record filled by [`cdts_ser_get_callable`] whose arrays
/// were not freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cdts_free_callable_types(callable: *mut CdtCallable) {
    // SAFETY: forwarded from the caller.
    let Some(c) = (unsafe { callable.as_mut() }) else {
        return;
    };
    // SAFETY: both arrays came from `buffer::copied`.
    unsafe {
        buffer::free(c.parameters_types);
        buffer::free(c.retval_types);
    }
    c.parameters_types = ptr::null_mut();
    c.retval_types = ptr::null_mut();
    c.params_types_length = 0;
    c.retval_types_length = 0;
}
