// Status codes shared by every enumerator call across the binary boundary.
use std::fmt;

/// 32-bit status: non-negative values succeed, negative values fail.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct HResult(pub i32);

pub const S_OK: HResult = HResult(0);
/// Successful but incomplete: fewer elements than requested.
pub const S_FALSE: HResult = HResult(1);
pub const E_UNEXPECTED: HResult = HResult(0x8000_FFFF_u32 as i32);
pub const E_NOINTERFACE: HResult = HResult(0x8000_4002_u32 as i32);
pub const E_POINTER: HResult = HResult(0x8000_4003_u32 as i32);
pub const E_FAIL: HResult = HResult(0x8000_4005_u32 as i32);
pub const E_HANDLE: HResult = HResult(0x8007_0006_u32 as i32);
pub const E_OUTOFMEMORY: HResult = HResult(0x8007_000E_u32 as i32);
pub const E_INVALIDARG: HResult = HResult(0x8007_0057_u32 as i32);

impl HResult {
    pub fn is_success(self) -> bool {
        self.0 >= 0
    }

    pub fn is_failure(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0 as u32)
    }
}
