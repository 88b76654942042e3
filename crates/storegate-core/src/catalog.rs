use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CATALOG_URL: &str = "https://itunes.apple.com/lookup";
pub const DEFAULT_COUNTRY: &str = "il";

const USER_AGENT: &str = concat!("storegate/", env!("CARGO_PKG_VERSION"));

/// Store-assigned identifier of an app within the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppId(String);

impl AppId {
    /// Returns `None` for absent, empty, or whitespace-only identifiers.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let trimmed = raw?.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog lookup URL: {details}")]
    InvalidUrl { details: String },
    #[error("{0}")]
    Request(#[source] reqwest::Error),
    #[error("catalog lookup failed with HTTP {status}{body_snippet}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body_snippet: String,
    },
    #[error("Invalid response")]
    MalformedResponse { details: String },
    #[error("app {app_id} not found in catalog")]
    NotFound { app_id: String },
}

impl CatalogError {
    fn malformed(details: impl Into<String>) -> Self {
        Self::MalformedResponse {
            details: details.into(),
        }
    }
}

/// Source of truth for the latest published version of an app.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_latest_version(&self, app_id: &AppId) -> Result<String, CatalogError>;
}

#[derive(Deserialize)]
struct LookupResponse {
    results: Vec<LookupRecord>,
}

#[derive(Deserialize)]
struct LookupRecord {
    #[serde(default)]
    version: Option<String>,
}

/// Catalog client for the iTunes lookup API.
#[derive(Debug, Clone)]
pub struct ItunesCatalog {
    client: reqwest::Client,
    base_url: String,
    country: String,
    timeout: Option<Duration>,
}

impl ItunesCatalog {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_CATALOG_URL.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// A zero timeout is treated as no timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|timeout| !timeout.is_zero());
        self
    }

    /// Build the lookup URL for `app_id`.
    ///
    /// # Errors
    /// Returns [`CatalogError::InvalidUrl`] when the configured base URL cannot
    /// be parsed.
    pub fn lookup_url(&self, app_id: &AppId) -> Result<reqwest::Url, CatalogError> {
        reqwest::Url::parse_with_params(
            &self.base_url,
            &[("id", app_id.as_str()), ("country", self.country.as_str())],
        )
        .map_err(|error| CatalogError::InvalidUrl {
            details: format!("{}: {error}", self.base_url),
        })
    }
}

#[async_trait]
impl CatalogSource for ItunesCatalog {
    async fn fetch_latest_version(&self, app_id: &AppId) -> Result<String, CatalogError> {
        let url = self.lookup_url(app_id)?;
        debug!("Looking up latest version at {url}");

        let mut request = self.client.get(url).header("User-Agent", USER_AGENT);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(CatalogError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body_snippet = response
                .text()
                .await
                .ok()
                .map(|body| response_snippet(&body, 160))
                .unwrap_or_default();
            return Err(CatalogError::HttpStatus {
                status,
                body_snippet,
            });
        }

        let body = response.text().await.map_err(CatalogError::Request)?;
        parse_lookup_response(&body, app_id)
    }
}

/// Extract the first record's `version` from a lookup response body.
///
/// # Errors
/// Returns [`CatalogError::MalformedResponse`] when the body is not JSON, has
/// no `results` array, or the first record has no `version`, and
/// [`CatalogError::NotFound`] when `results` is empty.
pub fn parse_lookup_response(body: &str, app_id: &AppId) -> Result<String, CatalogError> {
    let response: LookupResponse = serde_json::from_str(body).map_err(|error| {
        debug!("Catalog response could not be parsed: {error}");
        CatalogError::malformed(error.to_string())
    })?;

    let first = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| CatalogError::NotFound {
            app_id: app_id.to_string(),
        })?;

    first
        .version
        .ok_or_else(|| CatalogError::malformed("first result has no version field"))
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}
