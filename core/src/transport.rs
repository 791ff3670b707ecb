//! Pluggable HTTP transport and retry sleep strategy.
//!
//! # Design
//! The client never names an HTTP library directly. It hands a plain-data
//! `HttpRequest` to a `Transport` and receives a `RawResponse` whose body is
//! still unread. Any `Err` from `send` is a transport-level failure
//! (connection refused, DNS, timeout, cancellation) and is eligible for
//! retry; HTTP error statuses must come back as `Ok` so the client can
//! classify them.
//!
//! `Sleep` abstracts the fixed wait between retries so tests can count waits
//! instead of blocking on the wall clock.

use std::io::{self, Read};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::trace;

use crate::cancel::CancelToken;
use crate::error::BoxError;
use crate::http::{HttpRequest, RawResponse};

/// How often `UreqTransport` checks the cancel token while an exchange runs.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Executes one HTTP exchange.
pub trait Transport: Send + Sync {
    /// Send `request`, aborting the exchange once `timeout` has elapsed or
    /// `cancel` is done.
    fn send(
        &self,
        request: &HttpRequest,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<RawResponse, BoxError>;
}

/// Blocks the current thread between retry attempts.
pub trait Sleep: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// `Sleep` backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Default transport built on a pooled `ureq` agent.
///
/// The agent is configured to return 4xx/5xx responses as data rather than
/// `Err`, so only real transport failures surface as errors. Each exchange
/// runs on a worker thread while the caller polls the cancel token; a
/// cancelled caller returns at once and the worker finishes within
/// `timeout`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of an exchange run on the worker thread. The body is drained
/// there; a failed read is kept so the sender can report it as a body
/// failure rather than a transport failure.
struct Exchange {
    status: u16,
    headers: Vec<(String, String)>,
    body: io::Result<Vec<u8>>,
}

impl Exchange {
    fn into_raw(self) -> RawResponse {
        match self.body {
            Ok(bytes) => RawResponse::from_bytes(self.status, self.headers, bytes),
            Err(err) => RawResponse {
                status: self.status,
                headers: self.headers,
                body: Box::new(FailedBody(Some(err))),
            },
        }
    }
}

/// Reader that replays a body read failure.
struct FailedBody(Option<io::Error>);

impl Read for FailedBody {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(self
            .0
            .take()
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "response body already failed")))
    }
}

fn exchange(agent: &ureq::Agent, request: &HttpRequest, timeout: Duration) -> Result<Exchange, ureq::Error> {
    let mut builder = agent.post(&request.url);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let response = builder
        .config()
        .timeout_global(Some(timeout))
        .build()
        .send(request.body.as_slice())?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let mut body = Vec::new();
    let body = response
        .into_body()
        .into_reader()
        .read_to_end(&mut body)
        .map(|_| body);

    Ok(Exchange { status, headers, body })
}

impl Transport for UreqTransport {
    fn send(
        &self,
        request: &HttpRequest,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<RawResponse, BoxError> {
        let (tx, rx) = mpsc::channel();
        let agent = self.agent.clone();
        let owned = request.clone();
        thread::Builder::new()
            .name("zenmoney-http".to_string())
            .spawn(move || {
                // The caller may have given up already; nobody to tell then.
                let _ = tx.send(exchange(&agent, &owned, timeout));
            })?;

        loop {
            match rx.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(outcome) => return Ok(outcome?.into_raw()),
                Err(RecvTimeoutError::Timeout) if cancel.is_cancelled() => {
                    trace!(url = %request.url, "exchange abandoned");
                    let err = io::Error::new(io::ErrorKind::Interrupted, "exchange abandoned on cancellation");
                    return Err(err.into());
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(io::Error::other("transport worker exited without a result").into());
                }
            }
        }
    }
}
