//! Purpose: Binary layout of the enumerator interface and its base handle interface.
//! Exports: `Guid`, interface identifiers, `IUnknownVtbl`, `IEnumStringVtbl`, `IEnumString`.
//! Role: The permanent ABI; shared by the object exporter and the foreign proxy.
//! Invariants: Field order and calling convention never change; slots 0..3 are the base interface.
//! Invariants: `extern "system"` is stdcall on 32-bit Windows and the C convention elsewhere.
#![allow(non_snake_case)]

use crate::core::hresult::HResult;
use std::ffi::c_void;

#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

/// {00000000-0000-0000-C000-000000000046}
pub const IID_IUNKNOWN: Guid = Guid::new(
    0x0000_0000,
    0x0000,
    0x0000,
    [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
);

/// {00000101-0000-0000-C000-000000000046}
pub const IID_IENUMSTRING: Guid = Guid::new(
    0x0000_0101,
    0x0000,
    0x0000,
    [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
);

#[repr(C)]
pub struct IUnknownVtbl {
    pub QueryInterface: unsafe extern "system" fn(
        this: *mut c_void,
        riid: *const Guid,
        ppv: *mut *mut c_void,
    ) -> HResult,
    pub AddRef: unsafe extern "system" fn(this: *mut c_void) -> u32,
    pub Release: unsafe extern "system" fn(this: *mut c_void) -> u32,
}

#[repr(C)]
pub struct IEnumStringVtbl {
    pub base: IUnknownVtbl,
    pub Next: unsafe extern "system" fn(
        this: *mut IEnumString,
        celt: u32,
        rgelt: *mut *mut u16,
        pcelt_fetched: *mut u32,
    ) -> HResult,
    pub Skip: unsafe extern "system" fn(this: *mut IEnumString, celt: u32) -> HResult,
    pub Reset: unsafe extern "system" fn(this: *mut IEnumString) -> HResult,
    pub Clone:
        unsafe extern "system" fn(this: *mut IEnumString, ppenum: *mut *mut IEnumString) -> HResult,
}

/// An interface pointer: the first word of every object is its vtable.
#[repr(C)]
pub struct IEnumString {
    pub vtbl: *const IEnumStringVtbl,
}
