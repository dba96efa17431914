// Core modules: status codes, errors, owned elements, sequences and the enumerator contract.
pub mod cursor;
pub mod element;
pub mod enumerator;
pub mod error;
pub mod hresult;
pub mod sequence;
