// Transferred text elements and the allocation domain they live in.
use crate::core::error::{Error, ErrorKind};
use std::ffi::c_void;
use std::fmt;
use std::ptr::{self, NonNull};

/// Allocate `size` bytes in the domain every transferred buffer belongs to.
/// Returns null on failure.
pub fn mem_alloc(size: usize) -> *mut c_void {
    unsafe { libc::malloc(size.max(1)) }
}

/// Release a buffer obtained from [`mem_alloc`]. Null is ignored.
///
/// # Safety
/// `ptr` must be null or a live allocation from [`mem_alloc`] that is not used afterwards.
pub unsafe fn mem_free(ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    unsafe { libc::free(ptr) }
}

#[cfg(test)]
thread_local! {
    static ELEMENT_BUDGET: std::cell::Cell<Option<usize>> = const { std::cell::Cell::new(None) };
}

/// Let `count` more element allocations on this thread succeed, then fail
/// every one after that. `None` lifts the limit.
#[cfg(test)]
pub(crate) fn limit_element_allocations(count: Option<usize>) {
    ELEMENT_BUDGET.with(|budget| budget.set(count));
}

fn element_alloc(bytes: usize) -> *mut u16 {
    #[cfg(test)]
    {
        let refused = ELEMENT_BUDGET.with(|budget| match budget.get() {
            Some(0) => true,
            Some(left) => {
                budget.set(Some(left - 1));
                false
            }
            None => false,
        });
        if refused {
            return ptr::null_mut();
        }
    }
    mem_alloc(bytes).cast()
}

/// An owned, null-terminated UTF-16 buffer. Dropping it releases the buffer
/// through [`mem_free`]; [`OleString::into_raw`] hands that duty to the receiver.
pub struct OleString {
    ptr: NonNull<u16>,
    len: usize,
}

// The buffer is uniquely owned and never aliased by the producer.
unsafe impl Send for OleString {}
unsafe impl Sync for OleString {}

impl OleString {
    pub fn new(text: &str) -> Result<Self, Error> {
        let units: Vec<u16> = text.encode_utf16().collect();
        Self::from_wide(&units)
    }

    pub fn from_wide(units: &[u16]) -> Result<Self, Error> {
        if let Some(pos) = units.iter().position(|unit| *unit == 0) {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message(format!("element contains a nul at offset {pos}")));
        }
        let bytes = units
            .len()
            .checked_add(1)
            .and_then(|count| count.checked_mul(size_of::<u16>()))
            .ok_or_else(|| {
                Error::new(ErrorKind::OutOfMemory).with_message("element too large")
            })?;
        let raw = element_alloc(bytes);
        let ptr = NonNull::new(raw).ok_or_else(|| {
            Error::new(ErrorKind::OutOfMemory)
                .with_message(format!("failed to allocate {bytes} bytes for element"))
        })?;
        unsafe {
            ptr::copy_nonoverlapping(units.as_ptr(), ptr.as_ptr(), units.len());
            ptr.as_ptr().add(units.len()).write(0);
        }
        Ok(Self {
            ptr,
            len: units.len(),
        })
    }

    /// Adopt a buffer received across the boundary. Returns `None` for null.
    ///
    /// # Safety
    /// `raw` must be null or a null-terminated buffer allocated with [`mem_alloc`]
    /// whose ownership is being transferred to the caller.
    pub unsafe fn from_raw(raw: *mut u16) -> Option<Self> {
        let ptr = NonNull::new(raw)?;
        let mut len = 0;
        unsafe {
            while *ptr.as_ptr().add(len) != 0 {
                len += 1;
            }
        }
        Some(Self { ptr, len })
    }

    /// Give up ownership; the receiver must release the buffer with [`mem_free`].
    pub fn into_raw(self) -> *mut u16 {
        let raw = self.ptr.as_ptr();
        std::mem::forget(self);
        raw
    }

    pub fn as_ptr(&self) -> *const u16 {
        self.ptr.as_ptr()
    }

    /// Code units without the terminator.
    pub fn as_wide(&self) -> &[u16] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn to_utf8(&self) -> Result<String, Error> {
        String::from_utf16(self.as_wide()).map_err(|err| {
            Error::new(ErrorKind::InvalidArgument)
                .with_message("element is not valid UTF-16")
                .with_source(err)
        })
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.as_wide())
    }
}

impl Drop for OleString {
    fn drop(&mut self) {
        unsafe { mem_free(self.ptr.as_ptr() as *mut c_void) }
    }
}

impl fmt::Debug for OleString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}

impl PartialEq for OleString {
    fn eq(&self, other: &Self) -> bool {
        self.as_wide() == other.as_wide()
    }
}

impl Eq for OleString {}

impl PartialEq<str> for OleString {
    fn eq(&self, other: &str) -> bool {
        self.as_wide().iter().copied().eq(other.encode_utf16())
    }
}

impl PartialEq<&str> for OleString {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}
