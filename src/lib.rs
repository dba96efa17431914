//! Purpose: Cloneable, batched string enumerator behind a stable binary interface.
//! Exports: `core` (contract, producers, errors), `abi` (IEnumString-layout handles and C entry points), `api` (public surface and consumer helpers).
//! Role: Library backing the `strenum` CLI and the `libstrenum` C ABI.
//! Invariants: Every transferred element and handle has exactly one owner at a time.
//! Invariants: A failed call never moves an enumerator's cursor.
pub mod abi;
pub mod api;
pub mod core;
