//! Dashboard polling: authenticated fetch, payload extraction, retry.

pub mod auth;
pub mod parse;

use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;
use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderValue, USER_AGENT};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use veyor_config::{AuthSettings, DashboardConfig, TrackedConfig};
use veyor_model::ScanRecord;

use self::parse::RecordFilter;

/// Backoff never grows past this, regardless of retry count.
const RETRY_CAP: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("dashboard request failed")]
    Http(#[from] reqwest::Error),

    #[error("failed to read cookie file {path}")]
    CookieFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cookie file {path} contains no usable cookies")]
    NoCookies { path: PathBuf },

    #[error("dashboard fetch failed after {attempts} attempts")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<IngestError>,
    },
}

impl IngestError {
    /// Whether the orchestrator should treat this as transient and count it
    /// toward the consecutive-failure escalation rather than aborting.
    pub fn is_transient(&self) -> bool {
        matches!(self, IngestError::Http(_) | IngestError::Exhausted { .. })
    }
}

/// Fetches the dashboard feed and reduces it to engine-ready scan batches.
#[derive(Debug)]
pub struct DashboardClient {
    http: reqwest::Client,
    url: Url,
    filter: RecordFilter,
    cookie_path: PathBuf,
    max_retries: u32,
    retry_base: Duration,
}

impl DashboardClient {
    pub fn new(
        dashboard: &DashboardConfig,
        tracked: &TrackedConfig,
        auth: &AuthSettings,
    ) -> Result<Self, IngestError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("veyor-agent/0.1"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(DashboardClient {
            http,
            url: dashboard.url.clone(),
            filter: RecordFilter::new(
                tracked.locations.iter().cloned(),
                tracked.statuses.iter().cloned(),
            ),
            cookie_path: auth.cookie_path.clone(),
            max_retries: dashboard.max_retries,
            retry_base: dashboard.retry_base,
        })
    }

    /// One authenticated fetch-and-extract pass.
    pub async fn fetch(&self) -> Result<Vec<ScanRecord>, IngestError> {
        // Re-read the cookie file each poll; the SSO helper rotates it
        // underneath us.
        let cookies = auth::load_cookie_header(&self.cookie_path)?;

        let response = self
            .http
            .get(self.url.clone())
            .header(COOKIE, cookies)
            .send()
            .await?
            .error_for_status()?;
        let payload: serde_json::Value = response.json().await?;

        let scraped_at = chrono::Utc::now();
        let records =
            parse::extract_records(&payload, &self.filter, scraped_at);
        info!(count = records.len(), "extracted valid scan records");
        Ok(records)
    }

    /// Fetch with capped exponential backoff and jitter between attempts.
    ///
    /// Exhaustion comes back as `IngestError::Exhausted`, the transient
    /// signal the orchestrator counts toward its failure escalation.
    pub async fn fetch_with_retry(
        &self,
    ) -> Result<Vec<ScanRecord>, IngestError> {
        let mut last_error: Option<IngestError> = None;
        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay =
                    jittered(backoff_delay(self.retry_base, attempt, RETRY_CAP));
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "dashboard fetch failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            match self.fetch().await {
                Ok(records) => return Ok(records),
                Err(err) => {
                    warn!(%err, attempt, "dashboard fetch attempt failed");
                    last_error = Some(err);
                }
            }
        }
        Err(IngestError::Exhausted {
            attempts: self.max_retries,
            source: Box::new(last_error.unwrap_or(IngestError::NoCookies {
                path: self.cookie_path.clone(),
            })),
        })
    }
}

/// Exponential backoff for retry `attempt` (1-based for delays), capped.
fn backoff_delay(base: Duration, attempt: u32, cap: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(multiplier).min(cap)
}

/// Spread a delay across 50%..150% of its nominal value.
fn jittered(delay: Duration) -> Duration {
    let factor = rand::rng().random_range(0.5..1.5);
    delay.mul_f64(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_secs(5);
        let cap = Duration::from_secs(60);
        assert_eq!(backoff_delay(base, 1, cap), Duration::from_secs(5));
        assert_eq!(backoff_delay(base, 2, cap), Duration::from_secs(10));
        assert_eq!(backoff_delay(base, 3, cap), Duration::from_secs(20));
        assert_eq!(backoff_delay(base, 4, cap), Duration::from_secs(40));
        assert_eq!(backoff_delay(base, 5, cap), cap);
        assert_eq!(backoff_delay(base, 30, cap), cap);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let nominal = Duration::from_secs(10);
        for _ in 0..100 {
            let delay = jittered(nominal);
            assert!(delay >= Duration::from_secs(5));
            assert!(delay < Duration::from_secs(15));
        }
    }
}
