//! Purpose: Expose any Rust `EnumString` as a reference-counted `IEnumString` handle.
//! Exports: `EnumObject`.
//! Role: Producer side of the binary interface; vtable thunks translate calls and statuses.
//! Invariants: Objects start with one reference and are destroyed when the count reaches zero.
//! Invariants: Panics never cross the boundary; they surface as `E_UNEXPECTED`.
//! Invariants: A panic inside an operation poisons the instance; later calls report `E_HANDLE`.

use crate::abi::vtable::{
    Guid, IEnumString, IEnumStringVtbl, IID_IENUMSTRING, IID_IUNKNOWN, IUnknownVtbl,
};
use crate::core::enumerator::{EnumString, Progress};
use crate::core::error::{Error, ErrorKind};
use crate::core::hresult::{
    E_INVALIDARG, E_NOINTERFACE, E_POINTER, E_UNEXPECTED, HResult, S_FALSE, S_OK,
};
use std::ffi::c_void;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering, fence};
use std::sync::{Mutex, MutexGuard};

#[repr(C)]
pub struct EnumObject {
    // Must stay first: the interface pointer is the object pointer.
    iface: IEnumString,
    refs: AtomicU32,
    inner: Mutex<Box<dyn EnumString>>,
}

static VTBL: IEnumStringVtbl = IEnumStringVtbl {
    base: IUnknownVtbl {
        QueryInterface: query_interface,
        AddRef: add_ref,
        Release: release,
    },
    Next: next,
    Skip: skip,
    Reset: reset,
    Clone: clone,
};

impl EnumObject {
    /// Box `inner` behind the interface. The caller owns the single reference.
    ///
    /// The handle may be called and released from any thread, so `inner` must
    /// be `Send`; calls are serialized by the object itself.
    pub fn into_raw(inner: Box<dyn EnumString>) -> *mut IEnumString {
        let object = Box::new(EnumObject {
            iface: IEnumString { vtbl: &VTBL },
            refs: AtomicU32::new(1),
            inner: Mutex::new(inner),
        });
        let raw = Box::into_raw(object);
        tracing::trace!(handle = ?raw, "enumerator handle created");
        raw.cast()
    }

    /// Convenience for producers holding a concrete enumerator.
    pub fn from_enumerator<E: EnumString + 'static>(inner: E) -> *mut IEnumString {
        Self::into_raw(Box::new(inner))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn EnumString>>, Error> {
        self.inner.lock().map_err(|_| {
            Error::new(ErrorKind::HandleInvalid)
                .with_message("enumerator was poisoned by an earlier panic")
        })
    }
}

unsafe fn object<'a>(this: *mut c_void) -> Option<&'a EnumObject> {
    unsafe { this.cast::<EnumObject>().as_ref() }
}

fn guard(op: &'static str, call: impl FnOnce() -> HResult) -> HResult {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(hr) => hr,
        Err(_) => {
            tracing::warn!(op, "panic caught at interface boundary");
            E_UNEXPECTED
        }
    }
}

fn progress_hresult(progress: Progress) -> HResult {
    match progress {
        Progress::Complete => S_OK,
        Progress::Partial | Progress::Exhausted => S_FALSE,
    }
}

fn report(op: &'static str, err: Error) -> HResult {
    let hr = err.hresult();
    tracing::debug!(op, %hr, error = %err, "enumerator call failed");
    hr
}

unsafe extern "system" fn query_interface(
    this: *mut c_void,
    riid: *const Guid,
    ppv: *mut *mut c_void,
) -> HResult {
    guard("QueryInterface", || {
        if ppv.is_null() {
            return E_POINTER;
        }
        unsafe { *ppv = ptr::null_mut() };
        if this.is_null() {
            return E_POINTER;
        }
        let Some(riid) = (unsafe { riid.as_ref() }) else {
            return E_INVALIDARG;
        };
        if *riid != IID_IUNKNOWN && *riid != IID_IENUMSTRING {
            return E_NOINTERFACE;
        }
        unsafe {
            add_ref(this);
            *ppv = this;
        }
        S_OK
    })
}

unsafe extern "system" fn add_ref(this: *mut c_void) -> u32 {
    match unsafe { object(this) } {
        Some(object) => object.refs.fetch_add(1, Ordering::Relaxed) + 1,
        None => 0,
    }
}

unsafe extern "system" fn release(this: *mut c_void) -> u32 {
    let Some(object) = (unsafe { object(this) }) else {
        return 0;
    };
    let previous = object.refs.fetch_sub(1, Ordering::Release);
    if previous != 1 {
        return previous.wrapping_sub(1);
    }
    fence(Ordering::Acquire);
    tracing::trace!(handle = ?this, "enumerator handle released");
    let teardown = catch_unwind(AssertUnwindSafe(|| unsafe {
        drop(Box::from_raw(this.cast::<EnumObject>()));
    }));
    if teardown.is_err() {
        tracing::warn!("panic while dropping enumerator");
    }
    0
}

unsafe extern "system" fn next(
    this: *mut IEnumString,
    celt: u32,
    rgelt: *mut *mut u16,
    pcelt_fetched: *mut u32,
) -> HResult {
    guard("Next", || {
        if !pcelt_fetched.is_null() {
            unsafe { *pcelt_fetched = 0 };
        }
        let Some(object) = (unsafe { object(this.cast()) }) else {
            return E_POINTER;
        };
        if celt == 0 {
            return S_OK;
        }
        if pcelt_fetched.is_null() && celt != 1 {
            return E_INVALIDARG;
        }
        if rgelt.is_null() {
            return E_POINTER;
        }
        let batch = match object.lock().and_then(|mut inner| inner.next(celt as usize)) {
            Ok(batch) => batch,
            Err(err) => return report("Next", err),
        };
        let fetched = batch.items.len();
        for (slot, item) in batch.items.into_iter().enumerate() {
            unsafe { *rgelt.add(slot) = item.into_raw() };
        }
        if !pcelt_fetched.is_null() {
            unsafe { *pcelt_fetched = fetched as u32 };
        }
        progress_hresult(batch.progress)
    })
}

unsafe extern "system" fn skip(this: *mut IEnumString, celt: u32) -> HResult {
    guard("Skip", || {
        let Some(object) = (unsafe { object(this.cast()) }) else {
            return E_POINTER;
        };
        match object.lock().and_then(|mut inner| inner.skip(celt as usize)) {
            Ok(progress) => progress_hresult(progress),
            Err(err) => report("Skip", err),
        }
    })
}

unsafe extern "system" fn reset(this: *mut IEnumString) -> HResult {
    guard("Reset", || {
        let Some(object) = (unsafe { object(this.cast()) }) else {
            return E_POINTER;
        };
        match object.lock().and_then(|mut inner| inner.reset()) {
            Ok(()) => S_OK,
            Err(err) => report("Reset", err),
        }
    })
}

unsafe extern "system" fn clone(this: *mut IEnumString, ppenum: *mut *mut IEnumString) -> HResult {
    guard("Clone", || {
        if ppenum.is_null() {
            return E_POINTER;
        }
        unsafe { *ppenum = ptr::null_mut() };
        let Some(object) = (unsafe { object(this.cast()) }) else {
            return E_POINTER;
        };
        match object.lock().and_then(|inner| inner.clone_enum()) {
            Ok(sibling) => {
                unsafe { *ppenum = EnumObject::into_raw(sibling) };
                S_OK
            }
            Err(err) => report("Clone", err),
        }
    })
}
