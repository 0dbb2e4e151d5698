#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! HTTP client for the solar flare REST API.
//!
//! Wraps the endpoints the dashboard consumes:
//!
//! * `GET /solar-flares` and `GET /solar-flares/{flr_id}` for records,
//! * `POST /start-data-collection` to queue a backend collection job,
//! * `GET /analysis/*` for precomputed aggregates.
//!
//! Reads are retried on transient failures (see [`retry`]). The collection
//! trigger is sent exactly once.

pub mod retry;

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use solar_flares_flare_models::{
    ActivitySummary, DateRange, FlareRecord, LongestFlare, PeakFrequency,
};

/// Base URL used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Errors from API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response was received (connect failure, timeout, body read
    /// failure).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status.
    #[error("HTTP {status}: {detail}")]
    Status {
        /// Numeric HTTP status.
        status: u16,
        /// The backend's explanation, or the canonical status reason.
        detail: String,
    },

    /// The response body did not match the expected shape.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of what went wrong.
        message: String,
    },

    /// The configured base URL cannot be used to build request URLs.
    #[error("Invalid URL: {message}")]
    InvalidUrl {
        /// Description of what went wrong.
        message: String,
    },
}

impl ApiError {
    /// HTTP status of an error response, if there was one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server answered 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404))
    }

    /// Whether the server answered with a 4xx status.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }
}

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Retries for idempotent reads.
    pub read_retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            read_retries: 2,
        }
    }
}

/// Body returned by `POST /start-data-collection`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CollectionStarted {
    /// Free-form status text, if the backend sent one.
    #[serde(default)]
    pub status: Option<String>,
}

/// Client for the solar flare API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    read_retries: u32,
}

impl ApiClient {
    /// Builds a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if the base URL does not parse, or
    /// [`ApiError::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl {
            message: format!("{base_url}: {e}"),
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            read_retries: config.read_retries,
        })
    }

    /// The base URL requests are issued against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Fetches stored flares, optionally limited to `range`.
    ///
    /// A 404 means "no records" and yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any other failure after retries.
    pub async fn list_flares(
        &self,
        range: Option<&DateRange>,
    ) -> Result<Vec<FlareRecord>, ApiError> {
        self.fetch_flares(range, self.read_retries).await
    }

    /// Like [`Self::list_flares`] but with a single attempt, for callers
    /// that run their own retry loop.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any failure other than 404.
    pub async fn list_flares_once(
        &self,
        range: Option<&DateRange>,
    ) -> Result<Vec<FlareRecord>, ApiError> {
        self.fetch_flares(range, 0).await
    }

    async fn fetch_flares(
        &self,
        range: Option<&DateRange>,
        retries: u32,
    ) -> Result<Vec<FlareRecord>, ApiError> {
        let url = self.endpoint("solar-flares");
        log::debug!("GET {url} range={range:?}");

        let result = retry::send_json(
            || {
                let request = self.http.get(&url);
                match range {
                    Some(range) => request.query(range),
                    None => request,
                }
            },
            retries,
        )
        .await;

        match result {
            Err(e) if e.is_not_found() => {
                log::debug!("{url} returned 404, treating as empty");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Fetches one flare by its upstream identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] with status 404 if no such flare
    /// exists, or another [`ApiError`] on failure.
    pub async fn get_flare(&self, flr_id: &str) -> Result<FlareRecord, ApiError> {
        let mut url = reqwest::Url::parse(&self.endpoint("solar-flares")).map_err(|e| {
            ApiError::InvalidUrl {
                message: e.to_string(),
            }
        })?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl {
                message: format!("{} cannot be a base URL", self.base_url),
            })?
            .push(flr_id);

        log::debug!("GET {url}");
        retry::send_json(|| self.http.get(url.clone()), self.read_retries).await
    }

    /// Asks the backend to collect data for `range`.
    ///
    /// Sent exactly once. A 2xx answer whose body is not the expected JSON
    /// still counts as accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] if the backend refuses the request, or
    /// [`ApiError::Http`] if it cannot be reached.
    pub async fn start_data_collection(
        &self,
        range: &DateRange,
    ) -> Result<CollectionStarted, ApiError> {
        let url = self.endpoint("start-data-collection");
        log::debug!("POST {url} range={range}");

        let response = retry::send_once(|| self.http.post(&url).json(range)).await?;
        let status = response.status();

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Collection request accepted ({status}) but body unreadable: {e}");
                return Ok(CollectionStarted::default());
            }
        };

        Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
            log::debug!("Collection acknowledgement is not JSON ({e}), using default status");
            CollectionStarted::default()
        }))
    }

    /// `GET /analysis/peak-frequency`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on failure after retries.
    pub async fn peak_frequency(&self, range: &DateRange) -> Result<PeakFrequency, ApiError> {
        self.analysis("peak-frequency", range).await
    }

    /// `GET /analysis/activity-summary`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on failure after retries.
    pub async fn activity_summary(&self, range: &DateRange) -> Result<ActivitySummary, ApiError> {
        self.analysis("activity-summary", range).await
    }

    /// `GET /analysis/longest-flare`.
    ///
    /// The backend answers 404 when the range holds no flares; that is
    /// surfaced as `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any other failure after retries.
    pub async fn longest_flare(&self, range: &DateRange) -> Result<Option<LongestFlare>, ApiError> {
        match self.analysis("longest-flare", range).await {
            Ok(flare) => Ok(Some(flare)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn analysis<T: DeserializeOwned>(
        &self,
        name: &str,
        range: &DateRange,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(&format!("analysis/{name}"));
        log::debug!("GET {url} range={range}");
        retry::send_json(|| self.http.get(&url).query(range), self.read_retries).await
    }
}
