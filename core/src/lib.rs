//! Typed client for the ZenMoney synchronization API.
//!
//! # Overview
//! Wraps the `diff/` endpoint (full, incremental and forced synchronization)
//! and the `suggest/` endpoint (merchant and category suggestions) behind a
//! `ZenMoneyClient`. Requests carry a bearer token; transport failures are
//! retried a fixed number of times with a fixed wait; every failure surfaces
//! as an `Error` with one of four `ErrorKind`s.
//!
//! # Design
//! - `ZenMoneyClient` holds only immutable configuration and is cheap to
//!   clone and share between threads.
//! - Each operation is split into `build_*` (produces an `HttpRequest`) and
//!   `parse_*` (consumes an `HttpResponse`), so hosts can run the I/O
//!   themselves. The networked methods compose both with `execute`.
//! - HTTP and sleeping sit behind the `Transport` and `Sleep` traits; the
//!   default transport is a pooled `ureq` agent.
//! - Cancellation is caller-driven through `CancelToken`; the default
//!   transport abandons an in-flight exchange once the token is cancelled.

pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod transport;
pub mod types;

pub use cancel::CancelToken;
pub use client::ZenMoneyClient;
pub use config::{ClientBuilder, ClientConfig};
pub use error::{BoxError, Error, ErrorKind, Result};
pub use http::{HttpRequest, HttpResponse, RawResponse};
pub use models::{
    Account, AccountType, Budget, Company, Deletion, Instrument, Interval, Merchant, Reminder,
    ReminderMarker, ReminderMarkerState, Tag, Transaction, TransactionDraft, User,
};
pub use transport::{Sleep, ThreadSleep, Transport, UreqTransport};
pub use types::{EntityType, Request, Response};
