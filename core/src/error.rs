//! Error taxonomy for the ZenMoney client.
//!
//! # Design
//! Every failure is an `Error` carrying one of four `ErrorKind`s, a
//! human-readable message and an optional wrapped cause. Callers branch on
//! `kind()` to pick a remediation (ask for a new token, back off, check
//! connectivity) and walk `source()` for diagnostics. No kind is retried by
//! the client itself; retry happens only at the transport level.

use std::fmt;

/// Boxed cause stored inside an `Error`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Category of a client failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The authentication token is missing or empty.
    InvalidToken,

    /// Local data could not be encoded, decoded, or failed validation.
    InvalidRequest,

    /// The server answered with an HTTP status of 400 or above.
    ServerError,

    /// The HTTP exchange itself failed: connection, timeout, cancellation or
    /// a broken response body.
    NetworkError,
}

impl ErrorKind {
    /// Stable upper-case code used in the string form of an `Error`.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidToken => "INVALID_TOKEN",
            ErrorKind::InvalidRequest => "INVALID_REQUEST",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::NetworkError => "NETWORK_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A categorized client failure with an optional underlying cause.
///
/// Renders as `"<KIND>: <message>"`, or `"<KIND>: <message>: <cause>"` when a
/// cause is attached.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}{}", cause_suffix(.source))]
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    source: Option<BoxError>,
}

fn cause_suffix(source: &Option<BoxError>) -> String {
    match source {
        Some(cause) => format!(": {cause}"),
        None => String::new(),
    }
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Build an error that wraps `cause`.
    pub fn with_source(kind: ErrorKind, message: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: Some(cause.into()),
        }
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidToken, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, message)
    }

    /// A `ServerError` for the given HTTP status. The response body is not
    /// inspected.
    pub fn server_status(status: u16) -> Self {
        Self {
            kind: ErrorKind::ServerError,
            message: format!("server returned error status: {status}"),
            status: Some(status),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status that produced a `ServerError`, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_invalid_token(&self) -> bool {
        self.kind == ErrorKind::InvalidToken
    }

    pub fn is_invalid_request(&self) -> bool {
        self.kind == ErrorKind::InvalidRequest
    }

    pub fn is_server(&self) -> bool {
        self.kind == ErrorKind::ServerError
    }

    pub fn is_network(&self) -> bool {
        self.kind == ErrorKind::NetworkError
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::io;

    use super::*;

    #[test]
    fn display_without_cause() {
        let err = Error::invalid_token("token is not provided");
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
        assert_eq!(err.to_string(), "INVALID_TOKEN: token is not provided");
        assert!(err.source().is_none());
    }

    #[test]
    fn display_with_cause() {
        let root = io::Error::new(io::ErrorKind::ConnectionRefused, "root error");
        let err = Error::with_source(ErrorKind::NetworkError, "network issue occurred", root);
        assert_eq!(err.to_string(), "NETWORK_ERROR: network issue occurred: root error");

        let cause = err.source().unwrap();
        let io_err = cause.downcast_ref::<io::Error>().unwrap();
        assert_eq!(io_err.kind(), io::ErrorKind::ConnectionRefused);
    }

    #[test]
    fn server_status_records_code() {
        let err = Error::server_status(503);
        assert!(err.is_server());
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "SERVER_ERROR: server returned error status: 503");
    }

    #[test]
    fn kind_codes_are_stable() {
        assert_eq!(ErrorKind::InvalidToken.to_string(), "INVALID_TOKEN");
        assert_eq!(ErrorKind::InvalidRequest.to_string(), "INVALID_REQUEST");
        assert_eq!(ErrorKind::ServerError.to_string(), "SERVER_ERROR");
        assert_eq!(ErrorKind::NetworkError.to_string(), "NETWORK_ERROR");
    }

    #[test]
    fn nested_causes_are_walkable() {
        let inner = Error::invalid_request("bad payload");
        let outer = Error::with_source(ErrorKind::NetworkError, "wrapped", inner);
        let chain: Vec<String> = std::iter::successors(outer.source(), |&e| e.source())
            .map(|e| e.to_string())
            .collect();
        assert_eq!(chain, vec!["INVALID_REQUEST: bad payload".to_string()]);
    }
}
