//! Caller-supplied cancellation for in-flight operations.
//!
//! A `CancelToken` combines an explicit cancel flag with an optional
//! deadline. The request sender consults it before and after each attempt
//! and bounds each transport exchange by the time that remains; transports
//! poll it while an exchange is in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cloneable cancellation handle. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that is never done unless `cancel` is called.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once `cancel` was called or the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.remaining() == Some(Duration::ZERO)
    }

    /// Time left until the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Clamp `timeout` to the time left on this token.
    pub fn bound(&self, timeout: Duration) -> Duration {
        match self.remaining() {
            Some(left) => timeout.min(left),
            None => timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_live() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert_eq!(token.remaining(), None);
        assert_eq!(token.bound(Duration::from_secs(5)), Duration::from_secs(5));
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn expired_deadline_counts_as_cancelled() {
        let token = CancelToken::with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(token.is_cancelled());
        assert_eq!(token.bound(Duration::from_secs(30)), Duration::ZERO);
    }

    #[test]
    fn bound_clamps_to_remaining_time() {
        let token = CancelToken::with_timeout(Duration::from_secs(2));
        let bounded = token.bound(Duration::from_secs(30));
        assert!(bounded <= Duration::from_secs(2));
        assert!(bounded > Duration::from_secs(1));
    }
}
