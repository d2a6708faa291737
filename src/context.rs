//! Per-request deadline and cancellation.

use crate::error::{GeoQueryError, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Deadline and cancellation token carried by every facade call.
///
/// `timeout` bounds the indexed attempt only; when unset the facade uses
/// `Config::indexed_timeout_ms`. The fallback path is bounded by its working
/// set and stops early only on cancellation.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Share a token owned by the caller, e.g. one tied to an HTTP request.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(GeoQueryError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ctx = QueryContext::new();
        assert_eq!(ctx.timeout(), None);
        assert!(!ctx.is_cancelled());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn test_shared_token_cancels() {
        let token = CancellationToken::new();
        let ctx = QueryContext::new()
            .with_timeout(Duration::from_millis(10))
            .with_cancellation(token.clone());
        assert_eq!(ctx.timeout(), Some(Duration::from_millis(10)));

        token.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.check(), Err(GeoQueryError::Cancelled));
    }
}
