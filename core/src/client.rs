//! ZenMoney API client: request building, sending with retry, and the sync
//! facade.
//!
//! # Design
//! Each operation is split the same way:
//! - `build_*` turns typed input into a plain-data `HttpRequest` (no I/O),
//! - `execute` runs the exchange through the configured `Transport`,
//!   retrying transport failures with a fixed wait,
//! - `parse_*` turns an `HttpResponse` into typed output (no I/O).
//!
//! Hosts that want to own the network can call `build_*`/`parse_*` directly.
//! The client holds only immutable configuration, so one instance can be
//! shared across threads; concurrent calls are independent.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::cancel::CancelToken;
use crate::config::{ClientBuilder, ClientConfig};
use crate::error::{BoxError, Error, ErrorKind, Result};
use crate::http::{HttpRequest, HttpResponse, RawResponse};
use crate::models::{Transaction, TransactionDraft};
use crate::transport::{Sleep, Transport};
use crate::types::{EntityType, Request, Response};

const DIFF_ENDPOINT: &str = "diff/";
const SUGGEST_ENDPOINT: &str = "suggest/";

/// Client for the ZenMoney synchronization API.
#[derive(Clone)]
pub struct ZenMoneyClient {
    token: String,
    base_url: String,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleep>,
}

impl fmt::Debug for ZenMoneyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZenMoneyClient")
            .field("base_url", &self.base_url)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ZenMoneyClient {
    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(token)
    }

    /// Client with default configuration. Fails with `InvalidToken` when
    /// `token` is empty.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::builder(token).build()
    }

    pub(crate) fn from_parts(
        token: String,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleep>,
    ) -> Self {
        Self {
            token,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config,
            transport,
            sleeper,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Sync facade
    // -----------------------------------------------------------------------

    /// Send `request` to the diff endpoint and decode the answer.
    pub fn sync(&self, request: &Request, cancel: &CancelToken) -> Result<Response> {
        let http_request = self.build_diff(request)?;
        let response = self.execute(&http_request, cancel)?;
        self.parse_diff(response)
    }

    /// Fetch the entire dataset.
    pub fn full_sync(&self, cancel: &CancelToken) -> Result<Response> {
        self.sync(&Request::full(now()), cancel)
    }

    /// Fetch every change after `last_sync`, usually the previous response's
    /// `server_time()`.
    ///
    /// The client timestamp sent is never behind `last_sync`, so a server
    /// clock running ahead of the local one does not fail the request.
    pub fn sync_since(&self, last_sync: DateTime<Utc>, cancel: &CancelToken) -> Result<Response> {
        let since = last_sync.timestamp();
        self.sync(&Request::since(now().max(since), since), cancel)
    }

    /// Refresh `entity_types` in full along with the regular changes. An empty
    /// slice yields a plain diff request.
    pub fn force_sync_entities(
        &self,
        entity_types: &[EntityType],
        cancel: &CancelToken,
    ) -> Result<Response> {
        self.sync(&Request::force(now(), entity_types), cancel)
    }

    // -----------------------------------------------------------------------
    // Suggestions
    // -----------------------------------------------------------------------

    /// Ask the server to fill in merchant and categories for `transaction`.
    pub fn suggest(&self, transaction: &TransactionDraft, cancel: &CancelToken) -> Result<Transaction> {
        let request = self.build_suggest(transaction)?;
        let response = self.execute(&request, cancel)?;
        self.parse_suggest(response)
    }

    /// Batch form of `suggest`; results keep the input order.
    pub fn suggest_batch(
        &self,
        transactions: &[TransactionDraft],
        cancel: &CancelToken,
    ) -> Result<Vec<Transaction>> {
        let request = self.build_suggest_batch(transactions)?;
        let response = self.execute(&request, cancel)?;
        self.parse_suggest_batch(response)
    }

    // -----------------------------------------------------------------------
    // Request building
    // -----------------------------------------------------------------------

    pub fn build_diff(&self, request: &Request) -> Result<HttpRequest> {
        request.validate()?;
        self.build_request(DIFF_ENDPOINT, request)
    }

    pub fn build_suggest(&self, transaction: &TransactionDraft) -> Result<HttpRequest> {
        self.build_request(SUGGEST_ENDPOINT, transaction)
    }

    pub fn build_suggest_batch(&self, transactions: &[TransactionDraft]) -> Result<HttpRequest> {
        self.build_request(SUGGEST_ENDPOINT, transactions)
    }

    fn build_request<T>(&self, endpoint: &str, body: &T) -> Result<HttpRequest>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(body).map_err(|e| {
            Error::with_source(ErrorKind::InvalidRequest, "failed to marshal request body", e)
        })?;
        Ok(HttpRequest {
            url: format!("{}/{endpoint}", self.base_url),
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Authorization".to_string(), format!("Bearer {}", self.token)),
            ],
            body,
        })
    }

    // -----------------------------------------------------------------------
    // Sending
    // -----------------------------------------------------------------------

    /// Run `request` through the transport.
    ///
    /// Transport failures are retried up to `retry_attempts` more times with
    /// `retry_wait` between attempts, unless `cancel` is done. A token that is
    /// done when an attempt returns fails the call with `NetworkError`, even
    /// if a response arrived. HTTP statuses are never retried: 400 and above
    /// fail with `ServerError`.
    pub fn execute(&self, request: &HttpRequest, cancel: &CancelToken) -> Result<HttpResponse> {
        let raw = self.send_with_retry(request, cancel)?;
        let response = read_response(raw)?;
        check_status(&response)?;
        Ok(response)
    }

    fn send_with_retry(&self, request: &HttpRequest, cancel: &CancelToken) -> Result<RawResponse> {
        let attempts = self.config.retry_attempts.saturating_add(1);
        let mut last_error: Option<BoxError> = None;

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                debug!(attempt, url = %request.url, "request cancelled before attempt");
                break;
            }

            let timeout = cancel.bound(self.config.timeout);
            trace!(attempt, attempts, url = %request.url, ?timeout, "sending request");

            let outcome = self.transport.send(request, timeout, cancel);
            if cancel.is_cancelled() {
                debug!(attempt, url = %request.url, "request cancelled during attempt");
                return Err(match outcome {
                    Ok(_) => Error::network("request cancelled"),
                    Err(err) => Error::with_source(ErrorKind::NetworkError, "request cancelled", err),
                });
            }

            match outcome {
                Ok(raw) => {
                    debug!(attempt, status = raw.status, url = %request.url, "received response");
                    return Ok(raw);
                }
                Err(err) => {
                    debug!(attempt, attempts, url = %request.url, error = %err, "transport failure");
                    last_error = Some(err);
                    if attempt < attempts {
                        self.sleeper.sleep(cancel.bound(self.config.retry_wait));
                    }
                }
            }
        }

        Err(match last_error {
            Some(err) => Error::with_source(
                ErrorKind::NetworkError,
                "failed to send request after retries",
                err,
            ),
            None => Error::network("request cancelled"),
        })
    }

    // -----------------------------------------------------------------------
    // Response parsing
    // -----------------------------------------------------------------------

    pub fn parse_diff(&self, response: HttpResponse) -> Result<Response> {
        check_status(&response)?;
        decode(&response.body)
    }

    pub fn parse_suggest(&self, response: HttpResponse) -> Result<Transaction> {
        check_status(&response)?;
        decode(&response.body)
    }

    pub fn parse_suggest_batch(&self, response: HttpResponse) -> Result<Vec<Transaction>> {
        check_status(&response)?;
        decode(&response.body)
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

/// Drain the body of `raw`. The connection is released when `raw` drops,
/// whichever way this returns.
fn read_response(mut raw: RawResponse) -> Result<HttpResponse> {
    let mut body = Vec::new();
    raw.body.read_to_end(&mut body).map_err(|e| {
        Error::with_source(ErrorKind::NetworkError, "failed to read response body", e)
    })?;
    Ok(HttpResponse {
        status: raw.status,
        headers: std::mem::take(&mut raw.headers),
        body,
    })
}

fn check_status(response: &HttpResponse) -> Result<()> {
    if response.status >= 400 {
        return Err(Error::server_status(response.status));
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        Error::with_source(ErrorKind::InvalidRequest, "failed to unmarshal response", e)
    })
}
