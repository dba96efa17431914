//! Purpose: Drive an `IEnumString` implemented elsewhere through its vtable.
//! Exports: `ForeignEnum`.
//! Role: Consumer side of the binary interface and proxy producer over foreign enumerators.
//! Invariants: Owns exactly one reference; dropping it calls `Release` once.
//! Invariants: Every buffer a successful `Next` hands over is adopted, even on protocol errors.
//! Notes: `Skip` statuses cannot tell partial from exhausted; `S_FALSE` is reported as partial.
//! Notes: `Send` assumes the wrapped object accepts serialized calls from any thread.

use crate::abi::vtable::{IEnumString, IEnumStringVtbl, IID_IENUMSTRING};
use crate::core::element::OleString;
use crate::core::enumerator::{Batch, EnumString, Progress};
use crate::core::error::{Error, ErrorKind};
use crate::core::hresult::{HResult, S_OK};
use std::ffi::c_void;
use std::ptr::{self, NonNull};

pub struct ForeignEnum {
    raw: NonNull<IEnumString>,
}

// SAFETY: a `ForeignEnum` is the single owner of its reference and calls the
// object through `&mut self`, so calls never overlap. The constructors require
// objects that may be called and released from any thread.
unsafe impl Send for ForeignEnum {}

impl ForeignEnum {
    /// Take over one reference to `raw`.
    ///
    /// # Safety
    /// `raw` must be null or a live `IEnumString` whose reference the caller gives up.
    /// The object must accept serialized calls, including the final `Release`,
    /// from any thread; handles made by [`EnumObject`](crate::abi::EnumObject) do.
    pub unsafe fn from_raw(raw: *mut IEnumString) -> Result<Self, Error> {
        let raw = NonNull::new(raw)
            .ok_or_else(|| Error::new(ErrorKind::Pointer).with_message("enumerator is null"))?;
        Ok(Self { raw })
    }

    /// Add a reference to `raw` and wrap it; the caller keeps its own reference.
    ///
    /// # Safety
    /// `raw` must be null or a live `IEnumString` meeting the threading
    /// requirement of [`ForeignEnum::from_raw`].
    pub unsafe fn from_borrowed(raw: *mut IEnumString) -> Result<Self, Error> {
        let this = unsafe { Self::from_raw(raw)? };
        unsafe { (this.vtbl().base.AddRef)(raw.cast()) };
        Ok(this)
    }

    /// Ask an arbitrary handle for the enumerator interface.
    ///
    /// # Safety
    /// `unknown` must be null or a live handle whose first three vtable slots
    /// follow the base interface layout, meeting the threading requirement of
    /// [`ForeignEnum::from_raw`].
    pub unsafe fn query(unknown: *mut c_void) -> Result<Self, Error> {
        if unknown.is_null() {
            return Err(Error::new(ErrorKind::Pointer).with_message("handle is null"));
        }
        let mut out: *mut c_void = ptr::null_mut();
        let hr = unsafe {
            let vtbl = *unknown.cast::<*const IEnumStringVtbl>();
            ((*vtbl).base.QueryInterface)(unknown, &IID_IENUMSTRING, &mut out)
        };
        check(hr, "QueryInterface")?;
        unsafe { Self::from_raw(out.cast()) }
    }

    pub fn as_raw(&self) -> *mut IEnumString {
        self.raw.as_ptr()
    }

    /// Hand the owned reference back to the caller.
    pub fn into_raw(self) -> *mut IEnumString {
        let raw = self.raw.as_ptr();
        std::mem::forget(self);
        raw
    }

    fn vtbl(&self) -> &IEnumStringVtbl {
        unsafe { &*(*self.raw.as_ptr()).vtbl }
    }
}

fn check(hr: HResult, op: &'static str) -> Result<HResult, Error> {
    if hr.is_success() {
        return Ok(hr);
    }
    Err(Error::new(ErrorKind::from_hresult(hr))
        .with_hresult(hr)
        .with_message(format!("foreign {op} failed")))
}

fn interface_count(count: usize, op: &'static str) -> Result<u32, Error> {
    u32::try_from(count).map_err(|_| {
        Error::new(ErrorKind::InvalidArgument)
            .with_message(format!("{op} count {count} exceeds the interface limit"))
    })
}

impl EnumString for ForeignEnum {
    fn next(&mut self, requested: usize) -> Result<Batch, Error> {
        if requested == 0 {
            return Ok(Batch {
                items: Vec::new(),
                progress: Progress::Complete,
            });
        }
        let celt = interface_count(requested, "Next")?;
        let mut slots = vec![ptr::null_mut::<u16>(); requested];
        let mut fetched = 0u32;
        let hr = unsafe { (self.vtbl().Next)(self.as_raw(), celt, slots.as_mut_ptr(), &mut fetched) };
        check(hr, "Next")?;

        let fetched = fetched as usize;
        let claimed = fetched.min(requested);
        let mut items = Vec::with_capacity(claimed);
        let mut missing = false;
        for raw in &slots[..claimed] {
            match unsafe { OleString::from_raw(*raw) } {
                Some(item) => items.push(item),
                None => missing = true,
            }
        }
        if fetched > requested || missing {
            return Err(Error::new(ErrorKind::Internal)
                .with_message("foreign Next returned an inconsistent batch"));
        }
        if hr == S_OK && fetched < requested {
            tracing::debug!(requested, fetched, "foreign Next reported success for a short batch");
        }
        Ok(Batch {
            progress: Progress::classify(requested, items.len()),
            items,
        })
    }

    fn skip(&mut self, count: usize) -> Result<Progress, Error> {
        let celt = interface_count(count, "Skip")?;
        let hr = unsafe { (self.vtbl().Skip)(self.as_raw(), celt) };
        match check(hr, "Skip")? {
            S_OK => Ok(Progress::Complete),
            _ => Ok(Progress::Partial),
        }
    }

    fn reset(&mut self) -> Result<(), Error> {
        let hr = unsafe { (self.vtbl().Reset)(self.as_raw()) };
        check(hr, "Reset").map(|_| ())
    }

    fn clone_enum(&self) -> Result<Box<dyn EnumString>, Error> {
        let mut out = ptr::null_mut();
        let hr = unsafe { (self.vtbl().Clone)(self.as_raw(), &mut out) };
        check(hr, "Clone")?;
        let sibling = unsafe { Self::from_raw(out) }.map_err(|_| {
            Error::new(ErrorKind::Internal).with_message("foreign Clone returned no enumerator")
        })?;
        Ok(Box::new(sibling))
    }
}

impl Drop for ForeignEnum {
    fn drop(&mut self) {
        unsafe { (self.vtbl().base.Release)(self.raw.as_ptr().cast()) };
    }
}

impl std::fmt::Debug for ForeignEnum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignEnum").field("raw", &self.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::ForeignEnum;
    use crate::abi::object::EnumObject;
    use crate::core::enumerator::{EnumString, Progress, SequenceEnumerator};
    use crate::core::error::ErrorKind;
    use crate::core::hresult::{E_HANDLE, E_POINTER};
    use crate::core::sequence::{Revocable, Snapshot};

    fn exported(items: &[&'static str]) -> ForeignEnum {
        let raw = EnumObject::from_enumerator(SequenceEnumerator::from_sequence(Snapshot::new(
            items.iter().copied(),
        )));
        unsafe { ForeignEnum::from_raw(raw) }.expect("non-null")
    }

    fn texts(en: &mut dyn EnumString, count: usize) -> (Vec<String>, Progress) {
        let batch = en.next(count).expect("next");
        let items = batch.items.iter().map(|item| item.to_string_lossy()).collect();
        (items, batch.progress)
    }

    #[test]
    fn proxy_preserves_contract_scenario() {
        let mut en = exported(&["a", "b", "c"]);
        assert_eq!(texts(&mut en, 2), (vec!["a".into(), "b".into()], Progress::Complete));
        assert_eq!(texts(&mut en, 2), (vec!["c".into()], Progress::Partial));
        assert_eq!(texts(&mut en, 1), (vec![], Progress::Exhausted));
        en.reset().expect("reset");
        assert_eq!(texts(&mut en, 3).1, Progress::Complete);
    }

    #[test]
    fn proxy_clone_is_independent() {
        let mut en = exported(&["x", "y", "z"]);
        en.next(1).expect("next");
        let mut clone = en.clone_enum().expect("clone");
        assert_eq!(texts(&mut en, 2).1, Progress::Complete);
        assert_eq!(texts(clone.as_mut(), 1).0, vec!["y".to_string()]);
    }

    #[test]
    fn skip_reports_partial_for_short_sequence() {
        let mut en = exported(&["a", "b"]);
        assert_eq!(en.skip(1).expect("skip"), Progress::Complete);
        assert_eq!(en.skip(4).expect("skip"), Progress::Partial);
        assert_eq!(texts(&mut en, 1).1, Progress::Exhausted);
    }

    #[test]
    fn foreign_failures_keep_their_status() {
        let (seq, revoker) = Revocable::new(Snapshot::new(["a"]));
        let raw = EnumObject::from_enumerator(SequenceEnumerator::from_sequence(seq));
        let mut en = unsafe { ForeignEnum::from_raw(raw) }.expect("non-null");
        revoker.revoke();
        let err = en.next(1).expect_err("revoked");
        assert_eq!(err.kind(), ErrorKind::HandleInvalid);
        assert_eq!(err.hresult(), E_HANDLE);
    }

    #[test]
    fn null_handles_are_rejected() {
        let err = unsafe { ForeignEnum::from_raw(std::ptr::null_mut()) }.expect_err("null");
        assert_eq!(err.hresult(), E_POINTER);
        let err = unsafe { ForeignEnum::query(std::ptr::null_mut()) }.expect_err("null");
        assert_eq!(err.kind(), ErrorKind::Pointer);
    }

    #[test]
    fn query_and_borrow_add_references() {
        let owner = exported(&["q"]);
        let mut queried = unsafe { ForeignEnum::query(owner.as_raw().cast()) }.expect("query");
        let borrowed = unsafe { ForeignEnum::from_borrowed(owner.as_raw()) }.expect("borrow");
        drop(owner);
        drop(borrowed);
        assert_eq!(texts(&mut queried, 1).0, vec!["q".to_string()]);
    }
}
