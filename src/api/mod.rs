//! Purpose: Define the stable public Rust API boundary for strenum.
//! Exports: The enumerator contract, producers, owned elements, errors, and consumer helpers.
//! Role: Public, additive-only surface used by the CLI and library callers.
//! Invariants: Raw interface layout stays under `abi`; this module speaks Rust types only.

mod drain;

pub use crate::abi::{EnumObject, ForeignEnum};
pub use crate::core::cursor::Cursor;
pub use crate::core::element::OleString;
pub use crate::core::enumerator::{Batch, EnumString, Progress, SequenceEnumerator};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::hresult::{
    E_FAIL, E_HANDLE, E_INVALIDARG, E_NOINTERFACE, E_OUTOFMEMORY, E_POINTER, E_UNEXPECTED,
    HResult, S_FALSE, S_OK,
};
pub use crate::core::sequence::{Generated, Revocable, Revoker, Sequence, Snapshot};
pub use drain::{BATCH_ENV, Batches, DEFAULT_BATCH, DrainOptions, drain};
