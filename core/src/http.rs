//! HTTP exchange types described as plain data.
//!
//! # Design
//! The client builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network, so every encode/decode step can be tested
//! deterministically. A `Transport` (see `transport.rs`) performs the actual
//! exchange and hands back a `RawResponse` whose body is still a stream; the
//! request sender drains it into an `HttpResponse`.
//!
//! Bodies are raw bytes: the API speaks JSON, but the sender hands bytes to
//! the decoder untouched.

use std::fmt;
use std::io::Read;

/// An HTTP request described as plain data. Every endpoint of the API is a
/// JSON `POST`, so no method is carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A response as returned by a `Transport`: status and headers are known,
/// the body has not been read yet.
///
/// Dropping the value releases the underlying connection, so the body is
/// closed on every exit path of the sender.
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Box<dyn Read>,
}

impl RawResponse {
    /// Wrap an in-memory body. Handy for transports that buffer eagerly.
    pub fn from_bytes(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body: Box::new(std::io::Cursor::new(body)),
        }
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
