//! Purpose: C ABI bridge for the string enumerator (libstrenum).
//! Exports: `IEnumString` layout, `EnumObject`, `ForeignEnum`, and C-callable factory/memory/error functions.
//! Role: Stable ABI surface for non-Rust producers and consumers.
//! Invariants: Enumerator methods return `HResult`; `S_FALSE` is success with fewer elements.
//! Invariants: Opaque handles and buffers transfer ownership; every one has an explicit release.
//! Invariants: Factory errors map 1:1 with core error kinds and are optional (`out_err` may be null).
#![allow(non_camel_case_types)]

mod foreign;
mod object;
mod vtable;

pub use foreign::ForeignEnum;
pub use object::EnumObject;
pub use vtable::{
    Guid, IEnumString, IEnumStringVtbl, IID_IENUMSTRING, IID_IUNKNOWN, IUnknownVtbl,
};

use crate::core::element::{mem_alloc, mem_free};
use crate::core::enumerator::SequenceEnumerator;
use crate::core::error::{Error, ErrorKind};
use crate::core::hresult::{HResult, S_OK};
use crate::core::sequence::Snapshot;
use std::ffi::{CStr, CString, c_void};
use std::os::raw::c_char;
use std::ptr;

#[repr(C)]
pub struct strenum_error {
    hresult: i32,
    kind: i32,
    message: *mut c_char,
    index: u64,
    has_index: u8,
}

/// Build an enumerator over a copy of `len` UTF-8, nul-terminated strings.
#[unsafe(no_mangle)]
pub extern "C" fn strenum_from_utf8(
    items: *const *const c_char,
    len: usize,
    out_enum: *mut *mut IEnumString,
    out_err: *mut *mut strenum_error,
) -> HResult {
    if out_enum.is_null() {
        return fail(
            out_err,
            Error::new(ErrorKind::Pointer).with_message("out_enum is null"),
        );
    }
    unsafe { *out_enum = ptr::null_mut() };
    let strings = match parse_utf8_items(items, len) {
        Ok(strings) => strings,
        Err(err) => return fail(out_err, err),
    };
    publish(out_enum, strings)
}

/// Build an enumerator over a copy of `len` nul-terminated UTF-16 strings.
#[unsafe(no_mangle)]
pub extern "C" fn strenum_from_wide(
    items: *const *const u16,
    len: usize,
    out_enum: *mut *mut IEnumString,
    out_err: *mut *mut strenum_error,
) -> HResult {
    if out_enum.is_null() {
        return fail(
            out_err,
            Error::new(ErrorKind::Pointer).with_message("out_enum is null"),
        );
    }
    unsafe { *out_enum = ptr::null_mut() };
    let strings = match parse_wide_items(items, len) {
        Ok(strings) => strings,
        Err(err) => return fail(out_err, err),
    };
    publish(out_enum, strings)
}

/// Allocate in the domain transferred elements belong to. Null on failure.
#[unsafe(no_mangle)]
pub extern "C" fn strenum_mem_alloc(size: usize) -> *mut c_void {
    mem_alloc(size)
}

/// Release an element returned by `Next`, or anything from `strenum_mem_alloc`.
#[unsafe(no_mangle)]
pub extern "C" fn strenum_mem_free(ptr: *mut c_void) {
    unsafe { mem_free(ptr) }
}

#[unsafe(no_mangle)]
pub extern "C" fn strenum_error_free(err: *mut strenum_error) {
    if err.is_null() {
        return;
    }
    unsafe {
        let err = Box::from_raw(err);
        if !err.message.is_null() {
            drop(CString::from_raw(err.message));
        }
    }
}

fn publish(out_enum: *mut *mut IEnumString, strings: Vec<String>) -> HResult {
    tracing::debug!(len = strings.len(), "publishing snapshot enumerator");
    let enumerator = SequenceEnumerator::from_sequence(Snapshot::new(strings));
    unsafe { *out_enum = EnumObject::from_enumerator(enumerator) };
    S_OK
}

fn parse_utf8_items(items: *const *const c_char, len: usize) -> Result<Vec<String>, Error> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if items.is_null() {
        return Err(Error::new(ErrorKind::Pointer).with_message("items is null"));
    }
    let slice = unsafe { std::slice::from_raw_parts(items, len) };
    let mut out = Vec::with_capacity(len);
    for (index, item) in slice.iter().enumerate() {
        if item.is_null() {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message("items contains null")
                .with_index(index));
        }
        let value = unsafe { CStr::from_ptr(*item) }
            .to_str()
            .map_err(|err| {
                Error::new(ErrorKind::InvalidArgument)
                    .with_message("item is not valid UTF-8")
                    .with_index(index)
                    .with_source(err)
            })?
            .to_string();
        out.push(value);
    }
    Ok(out)
}

fn parse_wide_items(items: *const *const u16, len: usize) -> Result<Vec<String>, Error> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if items.is_null() {
        return Err(Error::new(ErrorKind::Pointer).with_message("items is null"));
    }
    let slice = unsafe { std::slice::from_raw_parts(items, len) };
    let mut out = Vec::with_capacity(len);
    for (index, item) in slice.iter().enumerate() {
        if item.is_null() {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message("items contains null")
                .with_index(index));
        }
        let units = unsafe { wide_units(*item) };
        let value = String::from_utf16(units).map_err(|err| {
            Error::new(ErrorKind::InvalidArgument)
                .with_message("item is not valid UTF-16")
                .with_index(index)
                .with_source(err)
        })?;
        out.push(value);
    }
    Ok(out)
}

unsafe fn wide_units<'a>(item: *const u16) -> &'a [u16] {
    let mut len = 0;
    unsafe {
        while *item.add(len) != 0 {
            len += 1;
        }
        std::slice::from_raw_parts(item, len)
    }
}

fn fail(out_err: *mut *mut strenum_error, err: Error) -> HResult {
    let hr = err.hresult();
    tracing::debug!(%hr, error = %err, "factory call failed");
    if out_err.is_null() {
        return hr;
    }
    let error = Box::new(strenum_error {
        hresult: hr.0,
        kind: error_kind_code(err.kind()),
        message: to_c_string(err.message().unwrap_or("")),
        index: err.index().unwrap_or(0) as u64,
        has_index: if err.index().is_some() { 1 } else { 0 },
    });
    unsafe {
        *out_err = Box::into_raw(error);
    }
    hr
}

fn to_c_string(input: &str) -> *mut c_char {
    CString::new(input)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

fn error_kind_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::InvalidArgument => 2,
        ErrorKind::Pointer => 3,
        ErrorKind::OutOfMemory => 4,
        ErrorKind::HandleInvalid => 5,
        ErrorKind::NoInterface => 6,
        ErrorKind::Io => 7,
    }
}
