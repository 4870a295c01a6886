use crate::types::{is_loaded_status, FetchError, FetchResponse, HomepageFetcher};
use async_trait::async_trait;
use reqwest::{redirect, Client};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;
use url::Url;

/// Query parameter appended when cache busting is on.
pub const CACHE_BUST_PARAM: &str = "plugin_profiler";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub follow_redirects: bool,
    pub cache_bust: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("plugin-profiler/{}", env!("CARGO_PKG_VERSION")),
            follow_redirects: true,
            cache_bust: true,
        }
    }
}

/// [`HomepageFetcher`] backed by a reqwest client.
///
/// The body is read to the end so the measurement covers the full page
/// render, not just the time to first header.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let policy = if config.follow_redirects {
            redirect::Policy::limited(5)
        } else {
            redirect::Policy::none()
        };

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(policy)
            .build()
            .map_err(|e| FetchError::Request {
                reason: e.to_string(),
            })?;

        Ok(Self { client, config })
    }

    fn target(&self, url: &Url) -> Url {
        let mut target = url.clone();
        if self.config.cache_bust {
            let nonce = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default();
            target
                .query_pairs_mut()
                .append_pair(CACHE_BUST_PARAM, &nonce.to_string());
        }
        target
    }

    async fn send(&self, url: Url, timeout: Duration) -> Result<u16, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(e, timeout))?;

        let status = response.status().as_u16();
        response
            .bytes()
            .await
            .map_err(|e| classify_error(e, timeout))?;
        Ok(status)
    }
}

fn classify_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    } else if error.is_connect() {
        FetchError::Connect {
            reason: error.to_string(),
        }
    } else {
        FetchError::Request {
            reason: error.to_string(),
        }
    }
}

#[async_trait]
impl HomepageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let target = self.target(url);
        debug!("Fetching {}", target);

        let start = Instant::now();
        // The client timeout covers the request; this ceiling also covers
        // a body that trickles in forever.
        let status = match tokio::time::timeout(timeout, self.send(target, timeout)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        };
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        if !is_loaded_status(status) {
            return Err(FetchError::Status { status });
        }
        Ok(FetchResponse { status, elapsed_ms })
    }
}
