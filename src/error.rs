//! Error types.
//!
//! Two kinds of failure exist and they never mix:
//!
//! - [`HandlerError`] travels *down the chain*. A handler signals it by
//!   returning `Err`, and from then on only error handlers run.
//! - [`Error`] is an infrastructure failure of the server itself: a bad
//!   address or a socket that cannot be bound.

use std::any::Any;
use std::fmt;
use std::net::AddrParseError;

// ── HandlerError ──────────────────────────────────────────────────────────────

/// Where a [`HandlerError`] came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Raised deliberately by a handler, e.g. a path parameter failed a check.
    Validation,
    /// An awaited external operation failed.
    Upstream,
    /// The handler panicked; the pipeline caught it and forwarded it.
    Panic,
}

/// The value carried down the error path of a chain.
///
/// Handlers usually build one from a message:
///
/// ```rust
/// use relay::{ErrorKind, HandlerError};
///
/// let err: HandlerError = "invalid userId".into();
/// assert_eq!(err.kind(), ErrorKind::Validation);
/// assert_eq!(err.to_string(), "invalid userId");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HandlerError {
    kind: ErrorKind,
    message: String,
}

impl HandlerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, message)
    }

    /// Builds an error from a caught panic payload.
    pub(crate) fn panicked(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_owned()
        };
        Self::new(ErrorKind::Panic, message)
    }

    pub fn kind(&self) -> ErrorKind { self.kind }
    pub fn message(&self) -> &str { &self.message }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HandlerError {}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::validation(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::validation(message)
    }
}

// ── Error ─────────────────────────────────────────────────────────────────────

/// The error type returned by relay's fallible server operations.
///
/// Application-level failures are [`HandlerError`]s and end up as
/// [`Response`](crate::Response) values. This type surfaces infrastructure
/// failures only: parsing the listen address or binding the socket.
#[derive(Debug)]
pub enum Error {
    Addr(AddrParseError),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addr(e) => write!(f, "invalid address: {e}"),
            Self::Io(e)   => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Addr(e) => Some(e),
            Self::Io(e)   => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<AddrParseError> for Error {
    fn from(e: AddrParseError) -> Self {
        Self::Addr(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_keep_their_message() {
        let err = HandlerError::panicked(Box::new("boom"));
        assert_eq!(err.kind(), ErrorKind::Panic);
        assert_eq!(err.message(), "boom");

        let err = HandlerError::panicked(Box::new(String::from("formatted boom")));
        assert_eq!(err.message(), "formatted boom");

        let err = HandlerError::panicked(Box::new(42_u8));
        assert_eq!(err.message(), "handler panicked");
    }

    #[test]
    fn strings_convert_to_validation_errors() {
        let err = HandlerError::from(String::from("user not found"));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "user not found");
    }

    #[test]
    fn bad_address_reports_its_source() {
        let err: Error = "not an address".parse::<std::net::SocketAddr>().unwrap_err().into();
        assert!(err.to_string().starts_with("invalid address"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
