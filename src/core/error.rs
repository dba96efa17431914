use crate::core::hresult::{
    E_FAIL, E_HANDLE, E_INVALIDARG, E_NOINTERFACE, E_OUTOFMEMORY, E_POINTER, E_UNEXPECTED,
    HResult,
};
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    InvalidArgument,
    Pointer,
    OutOfMemory,
    HandleInvalid,
    NoInterface,
    Io,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hresult: Option<HResult>,
    index: Option<usize>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hresult: None,
            index: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Element position the failure refers to, when there is one.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Status code to report across the ABI. A code observed from a foreign
    /// enumerator is passed through unchanged.
    pub fn hresult(&self) -> HResult {
        self.hresult.unwrap_or_else(|| to_hresult(self.kind))
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hresult(mut self, hresult: HResult) -> Self {
        self.hresult = Some(hresult);
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(index) = self.index {
            write!(f, " (index: {index})")?;
        }
        if let Some(hresult) = self.hresult {
            write!(f, " (hresult: {hresult})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

impl ErrorKind {
    /// Classify a failing status returned by a foreign enumerator.
    pub fn from_hresult(hresult: HResult) -> Self {
        match hresult {
            E_INVALIDARG => ErrorKind::InvalidArgument,
            E_POINTER => ErrorKind::Pointer,
            E_OUTOFMEMORY => ErrorKind::OutOfMemory,
            E_HANDLE => ErrorKind::HandleInvalid,
            E_NOINTERFACE => ErrorKind::NoInterface,
            E_FAIL => ErrorKind::Io,
            _ => ErrorKind::Internal,
        }
    }
}

pub fn to_hresult(kind: ErrorKind) -> HResult {
    match kind {
        ErrorKind::Internal => E_UNEXPECTED,
        ErrorKind::InvalidArgument => E_INVALIDARG,
        ErrorKind::Pointer => E_POINTER,
        ErrorKind::OutOfMemory => E_OUTOFMEMORY,
        ErrorKind::HandleInvalid => E_HANDLE,
        ErrorKind::NoInterface => E_NOINTERFACE,
        ErrorKind::Io => E_FAIL,
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::InvalidArgument => 2,
        ErrorKind::Pointer => 2,
        ErrorKind::OutOfMemory => 3,
        ErrorKind::HandleInvalid => 4,
        ErrorKind::NoInterface => 5,
        ErrorKind::Io => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_exit_code, to_hresult};
    use crate::core::hresult::{E_FAIL, E_HANDLE, E_INVALIDARG, HResult};

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::InvalidArgument, 2),
            (ErrorKind::Pointer, 2),
            (ErrorKind::OutOfMemory, 3),
            (ErrorKind::HandleInvalid, 4),
            (ErrorKind::NoInterface, 5),
            (ErrorKind::Io, 6),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn hresult_mapping_round_trips_known_kinds() {
        for kind in [
            ErrorKind::InvalidArgument,
            ErrorKind::Pointer,
            ErrorKind::OutOfMemory,
            ErrorKind::HandleInvalid,
            ErrorKind::NoInterface,
            ErrorKind::Internal,
            ErrorKind::Io,
        ] {
            assert_eq!(ErrorKind::from_hresult(to_hresult(kind)), kind);
        }
        assert_eq!(ErrorKind::from_hresult(E_FAIL), ErrorKind::Io);
        assert_eq!(
            ErrorKind::from_hresult(HResult(0x8004_1234_u32 as i32)),
            ErrorKind::Internal
        );
    }

    #[test]
    fn foreign_hresult_is_preserved() {
        let custom = HResult(0x8004_1234_u32 as i32);
        let err = Error::new(ErrorKind::Internal).with_hresult(custom);
        assert_eq!(err.hresult(), custom);

        let err = Error::new(ErrorKind::HandleInvalid);
        assert_eq!(err.hresult(), E_HANDLE);
        assert_ne!(err.hresult(), E_INVALIDARG);
    }

    #[test]
    fn display_includes_context() {
        let err = Error::new(ErrorKind::InvalidArgument)
            .with_message("interior nul")
            .with_index(4);
        let text = err.to_string();
        assert!(text.starts_with("InvalidArgument: interior nul"));
        assert!(text.contains("(index: 4)"));
    }
}
