//! Connection settings and client construction.
//!
//! `ClientConfig` is a plain value fixed at construction time; a built
//! `ZenMoneyClient` never mutates it. `ClientBuilder` layers the token,
//! configuration and the pluggable transport/sleep strategy.

use std::sync::Arc;
use std::time::Duration;

use crate::client::ZenMoneyClient;
use crate::error::{Error, ErrorKind, Result};
use crate::transport::{Sleep, ThreadSleep, Transport, UreqTransport};

pub const DEFAULT_BASE_URL: &str = "https://api.zenmoney.ru/v8/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(1);

/// Static connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Upper bound for a single HTTP exchange.
    pub timeout: Duration,
    /// Extra attempts after the first one fails at the transport level.
    pub retry_attempts: u32,
    /// Fixed pause between attempts.
    pub retry_wait: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_wait: DEFAULT_RETRY_WAIT,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `ZENMONEY_BASE_URL`, `ZENMONEY_TIMEOUT_SECS`,
    /// `ZENMONEY_RETRY_ATTEMPTS` and `ZENMONEY_RETRY_WAIT_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(url) = lookup("ZENMONEY_BASE_URL") {
            config.base_url = url;
        }
        if let Some(secs) = lookup("ZENMONEY_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(parse_number("ZENMONEY_TIMEOUT_SECS", &secs)?);
        }
        if let Some(attempts) = lookup("ZENMONEY_RETRY_ATTEMPTS") {
            config.retry_attempts = parse_number("ZENMONEY_RETRY_ATTEMPTS", &attempts)?;
        }
        if let Some(millis) = lookup("ZENMONEY_RETRY_WAIT_MS") {
            config.retry_wait = Duration::from_millis(parse_number("ZENMONEY_RETRY_WAIT_MS", &millis)?);
        }
        Ok(config)
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim().parse().map_err(|e| {
        Error::with_source(
            ErrorKind::InvalidRequest,
            format!("invalid value for {key}: {raw:?}"),
            e,
        )
    })
}

/// Builder for `ZenMoneyClient`.
pub struct ClientBuilder {
    token: String,
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    sleeper: Option<Arc<dyn Sleep>>,
}

impl ClientBuilder {
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            config: ClientConfig::default(),
            transport: None,
            sleeper: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn retry_policy(mut self, attempts: u32, wait: Duration) -> Self {
        self.config.retry_attempts = attempts;
        self.config.retry_wait = wait;
        self
    }

    /// Use a custom HTTP transport instead of the default `ureq` agent.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom wait strategy between retries.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleep>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Validate the token and build the client. Performs no I/O.
    pub fn build(self) -> Result<ZenMoneyClient> {
        if self.token.trim().is_empty() {
            return Err(Error::invalid_token("token is not provided"));
        }
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(UreqTransport::new()));
        let sleeper = self.sleeper.unwrap_or_else(|| Arc::new(ThreadSleep));
        Ok(ZenMoneyClient::from_parts(
            self.token,
            self.config,
            transport,
            sleeper,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_production() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://api.zenmoney.ru/v8/");
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("ZENMONEY_BASE_URL", "http://localhost:3000/"),
            ("ZENMONEY_TIMEOUT_SECS", "5"),
            ("ZENMONEY_RETRY_ATTEMPTS", "0"),
            ("ZENMONEY_RETRY_WAIT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:3000/");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry_attempts, 0);
        assert_eq!(config.retry_wait, Duration::from_millis(250));
    }

    #[test]
    fn malformed_number_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[("ZENMONEY_RETRY_ATTEMPTS", "many")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(err.to_string().contains("ZENMONEY_RETRY_ATTEMPTS"));
    }

    #[test]
    fn empty_token_fails_before_any_io() {
        let err = ZenMoneyClient::builder("").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);

        let err = ZenMoneyClient::builder("   ").build().unwrap_err();
        assert!(err.is_invalid_token());
    }

    #[test]
    fn builder_applies_settings() {
        let client = ZenMoneyClient::builder("token")
            .base_url("http://localhost:3000")
            .timeout(Duration::from_secs(45))
            .retry_policy(5, Duration::from_secs(2))
            .build()
            .unwrap();
        let config = client.config();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.timeout, Duration::from_secs(45));
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.retry_wait, Duration::from_secs(2));
    }
}
