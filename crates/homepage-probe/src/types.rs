use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A completed homepage request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub status: u16,
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum FetchError {
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("connection failed: {reason}")]
    Connect { reason: String },

    #[error("homepage answered with HTTP {status}")]
    Status { status: u16 },

    #[error("request failed: {reason}")]
    Request { reason: String },
}

impl FetchError {
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// Only 2xx and 3xx count as a page that loaded.
#[inline]
pub fn is_loaded_status(status: u16) -> bool {
    (200..400).contains(&status)
}

/// Issues a single GET against the site homepage. Implementations must not
/// retry: a slow or failing response is the signal being measured.
#[async_trait]
pub trait HomepageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchResponse, FetchError>;
}

#[async_trait]
impl<F: HomepageFetcher + ?Sized> HomepageFetcher for Box<F> {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchResponse, FetchError> {
        (**self).fetch(url, timeout).await
    }
}

#[async_trait]
impl<F: HomepageFetcher + ?Sized> HomepageFetcher for std::sync::Arc<F> {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchResponse, FetchError> {
        (**self).fetch(url, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loaded_status_range() {
        assert!(!is_loaded_status(199));
        assert!(is_loaded_status(200));
        assert!(is_loaded_status(301));
        assert!(is_loaded_status(399));
        assert!(!is_loaded_status(404));
        assert!(!is_loaded_status(500));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FetchError::Timeout { timeout_ms: 30_000 }.to_string(),
            "request timed out after 30000ms"
        );
        assert_eq!(
            FetchError::Status { status: 500 }.to_string(),
            "homepage answered with HTTP 500"
        );
        assert!(FetchError::Timeout { timeout_ms: 1 }.is_timeout());
        assert!(!FetchError::Status { status: 500 }.is_timeout());
    }
}
