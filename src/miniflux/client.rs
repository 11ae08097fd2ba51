//! Blocking Miniflux API client. Basic auth, JSON decoding, and HTTP status mapping.
//!
//! No retries and no pagination: one request per call.

use super::error::ApiError;
use super::{EntryQuery, FeedReader};
use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::model::{Category, EntryResultSet};
use reqwest::blocking::Response;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("miniflux-epub/", env!("CARGO_PKG_VERSION"));
const API_PREFIX: &str = "/v1";

/// Normalize a Miniflux base URL to its API root: trailing `/` removed, `/v1` appended if missing.
pub fn api_base(input: &str) -> Result<String, ApiError> {
    let trimmed = input.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|e| ApiError::InvalidUrl {
        input: input.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::InvalidUrl {
            input: input.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    if trimmed.ends_with(API_PREFIX) {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{}{}", trimmed, API_PREFIX))
    }
}

/// Error body Miniflux returns on failures, e.g. `{"error_message": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_message: String,
}

/// Blocking client for one Miniflux account.
pub struct MinifluxClient {
    inner: reqwest::blocking::Client,
    base: String,
    username: String,
    password: String,
}

impl MinifluxClient {
    /// Builder for a client against `base_url` (e.g. `https://reader.miniflux.app/`).
    pub fn builder(base_url: impl Into<String>) -> MinifluxClientBuilder {
        MinifluxClientBuilder {
            base_url: base_url.into(),
            username: String::new(),
            password: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// API root this client sends requests to, ending in `/v1`.
    pub fn base(&self) -> &str {
        &self.base
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base, path);
        tracing::debug!(%url, ?query, "GET");
        let response = self
            .inner
            .get(&url)
            .query(query)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .map_err(|e| ApiError::Network {
                url: url.clone(),
                source: e,
            })?;
        let response = check_status(response, &url)?;
        response
            .json::<T>()
            .map_err(|e| ApiError::Decode { url, source: e })
    }
}

fn check_status(response: Response, url: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = url.to_string();
    match status.as_u16() {
        401 => Err(ApiError::Unauthorized { url }),
        403 => Err(ApiError::Forbidden { url }),
        404 => Err(ApiError::NotFound { url }),
        code => {
            let reason = status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string();
            let message = response
                .text()
                .ok()
                .and_then(|body| serde_json::from_str::<ErrorBody>(&body).ok())
                .map(|b| b.error_message)
                .unwrap_or(reason);
            Err(ApiError::HttpStatus {
                status: code,
                url,
                message,
            })
        }
    }
}

impl FeedReader for MinifluxClient {
    fn categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get_json("/categories", &[])
    }

    fn entries(&self, query: &EntryQuery) -> Result<EntryResultSet, ApiError> {
        let mut set: EntryResultSet = self.get_json("/entries", &query.to_params())?;
        if set.entries.len() > query.limit {
            tracing::warn!(
                returned = set.entries.len(),
                limit = query.limit,
                "server returned more entries than requested; truncating"
            );
            set.entries.truncate(query.limit);
        }
        tracing::debug!(
            total = set.total,
            fetched = set.entries.len(),
            "fetched entries"
        );
        Ok(set)
    }
}

/// Builder for [MinifluxClient] with credentials and timeout.
pub struct MinifluxClientBuilder {
    base_url: String,
    username: String,
    password: String,
    timeout_secs: u64,
}

impl MinifluxClientBuilder {
    /// Basic-auth credentials sent with every request.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<MinifluxClient, ApiError> {
        let base = api_base(&self.base_url)?;
        let inner = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(ApiError::Client)?;
        Ok(MinifluxClient {
            inner,
            base,
            username: self.username,
            password: self.password,
        })
    }
}
