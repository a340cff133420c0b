//! Telemetry reporting via a query-string HTTP GET endpoint
//!
//! `GET <endpoint_base>/send.json?x-aio-key=<key>[&temp=<t>]&status=<s>`
//!
//! Readings are awaited and their status code surfaced; lifecycle pings are
//! detached and their result ignored.

use chrono::{DateTime, TimeZone};
use std::fmt;
use std::future::Future;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::sensors::tmp102::Temperature;
use crate::shared::clock_label;

pub const STATUS_INITIALISING: &str = "Initialising";
pub const STATUS_FINISHED: &str = "Finished";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("{0}")]
    Transport(String),
}

/// Result of the last reading submission, kept for display only
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Delivered(String),
    Failed(String),
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportOutcome::Delivered(code) => f.write_str(code),
            ReportOutcome::Failed(message) => write!(f, "Exception: {}", message),
        }
    }
}

impl From<Result<String, ReportError>> for ReportOutcome {
    fn from(result: Result<String, ReportError>) -> Self {
        match result {
            Ok(code) => ReportOutcome::Delivered(code),
            Err(ReportError::Transport(message)) => ReportOutcome::Failed(message),
        }
    }
}

/// Network seam: issue a GET and return the stringified status code
pub trait Transport: Clone + Send + Sync + 'static {
    fn get(&self, url: &str) -> impl Future<Output = Result<String, ReportError>> + Send;
}

#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, ReportError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", concat!("tmp102-telemetry/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| ReportError::Transport(format!("HTTP request failed: {}", e)))?;

        // Status is opaque: any class counts as delivered
        Ok(response.status().to_string())
    }
}

/// `Running (H:MM)` status text for a reading taken at `now`
pub fn running_status<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!("Running ({})", clock_label(now))
}

#[derive(Debug, Clone)]
pub struct Reporter<T> {
    transport: T,
    endpoint_base: String,
    key: String,
}

impl<T: Transport> Reporter<T> {
    pub fn new(transport: T, endpoint_base: &str, key: &str) -> Self {
        Self {
            transport,
            endpoint_base: endpoint_base.trim_end_matches('/').to_string(),
            key: key.to_string(),
        }
    }

    fn url(&self, temperature: Option<Temperature>, status: &str) -> String {
        let mut url = format!(
            "{}/send.json?x-aio-key={}",
            self.endpoint_base,
            urlencoding::encode(&self.key)
        );
        if let Some(temperature) = temperature {
            url.push_str("&temp=");
            url.push_str(&temperature.display());
        }
        url.push_str("&status=");
        url.push_str(&urlencoding::encode(status));
        url
    }

    /// Detached lifecycle ping. Never blocks the caller; the outcome is only logged.
    ///
    /// The returned handle may be awaited (e.g. with a timeout at shutdown) or dropped.
    pub fn report_status(&self, status: &str) -> JoinHandle<()> {
        let transport = self.transport.clone();
        let url = self.url(None, status);
        let status = status.to_string();

        tokio::spawn(async move {
            match transport.get(&url).await {
                Ok(code) => tracing::debug!("Status '{}' reported: {}", status, code),
                Err(e) => tracing::debug!("Status '{}' not reported: {}", status, e),
            }
        })
    }

    /// Send a reading and wait for the response. No retry.
    pub async fn report_reading(
        &self,
        temperature: Temperature,
        status: &str,
    ) -> Result<String, ReportError> {
        let url = self.url(Some(temperature), status);
        let result = self.transport.get(&url).await;

        match &result {
            Ok(code) => tracing::info!("Reported {} C: {}", temperature.display(), code),
            Err(e) => tracing::warn!("Report of {} C failed: {}", temperature.display(), e),
        }
        result
    }
}
