//! I/O boundaries behind traits.
//!
//! The resolver talks to HTTP and to time only through [`HttpFetch`] and
//! [`Clock`], so the retry, rate-limit, and caching logic can be exercised
//! deterministically against scripted implementations.

use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::{ResolveError, Result};

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// Asynchronous HTTP POST of a form-encoded query.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn post(&self, url: &str, query: String) -> Result<FetchResponse>;
}

/// Time source and sleeper.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
    async fn sleep_ms(&self, ms: u64);
}

// ---------------------------------------------------------------------------
// Production implementations
// ---------------------------------------------------------------------------

pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    pub fn new() -> Self {
        ReqwestFetch {
            client: reqwest::Client::builder()
                .user_agent(concat!("rds-locate/", env!("CARGO_PKG_VERSION")))
                .build()
                .expect("client construction cannot fail with these options"),
        }
    }
}

impl Default for ReqwestFetch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetch {
    async fn post(&self, url: &str, query: String) -> Result<FetchResponse> {
        let resp = self
            .client
            .post(url)
            .form(&[("data", query.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ResolveError::Timeout
                } else {
                    ResolveError::Network(e.to_string())
                }
            })?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| ResolveError::Network(e.to_string()))?;
        Ok(FetchResponse { status, body })
    }
}

pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_monotonic_enough() {
        let clock = SystemClock;
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
        assert!(a > 1_600_000_000_000); // after 2020
    }
}
