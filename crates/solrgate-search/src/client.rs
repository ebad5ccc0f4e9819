//! HTTP client for the backend Solr collection.

use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use solrgate_config::{ParamMap, SolrConfig};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::response::{SearchResponse, SuggestResponse, extract_error_message};

/// Longest query string written to the logs.
pub const MAX_LOGGED_QUERY: usize = 256;

#[derive(Debug, Error)]
pub enum SolrError {
    /// Solr answered with a non-success status. `message` is the extracted
    /// `error.msg`, never the raw body.
    #[error("solr returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("solr request timed out: {0}")]
    Timeout(String),

    #[error("failed to connect to solr: {0}")]
    Connect(String),

    #[error("solr request failed: {0}")]
    Request(String),

    #[error("invalid solr response: {0}")]
    Decode(String),

    #[error("invalid solr url: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for SolrError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SolrError::Timeout(e.to_string())
        } else if e.is_connect() {
            SolrError::Connect(e.to_string())
        } else {
            SolrError::Request(e.to_string())
        }
    }
}

/// A successful response, body untouched.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct SolrClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SolrClient {
    pub fn new(config: &SolrConfig) -> Result<Self, SolrError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SolrError::Request(format!("failed to build http client: {e}")))?;
        Self::with_client(http, &config.base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, SolrError> {
        let base_url =
            Url::parse(base_url).map_err(|e| SolrError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SolrError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn handler_url(&self, handler: &str, params: &ParamMap) -> Result<Url, SolrError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SolrError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(handler);
        url.query_pairs_mut().extend_pairs(
            params
                .iter()
                .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str()))),
        );
        Ok(url)
    }

    /// Send `params` to `handler` and return the body as is.
    #[instrument(skip_all, fields(handler = %handler))]
    pub async fn execute(&self, handler: &str, params: &ParamMap) -> Result<RawResponse, SolrError> {
        let url = self.handler_url(handler, params)?;
        debug!(
            path = url.path(),
            query = truncate(url.query().unwrap_or(""), MAX_LOGGED_QUERY),
            "Sending solr request"
        );

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if !status.is_success() {
            let message = extract_error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
            warn!(
                status = status.as_u16(),
                error = %message,
                query = truncate(url.query().unwrap_or(""), MAX_LOGGED_QUERY),
                "Solr request failed"
            );
            return Err(SolrError::Status {
                status: status.as_u16(),
                message,
            });
        }

        info!(status = status.as_u16(), bytes = body.len(), "Solr request completed");
        Ok(RawResponse {
            status: status.as_u16(),
            content_type,
            body,
        })
    }

    /// Run a search and decode the JSON response.
    pub async fn search(&self, handler: &str, params: &ParamMap) -> Result<SearchResponse, SolrError> {
        self.execute_json(handler, params).await
    }

    /// Run a suggest request and decode the JSON response.
    pub async fn suggest(
        &self,
        handler: &str,
        params: &ParamMap,
    ) -> Result<SuggestResponse, SolrError> {
        self.execute_json(handler, params).await
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        handler: &str,
        params: &ParamMap,
    ) -> Result<T, SolrError> {
        let mut params = params.clone();
        params.insert("wt".to_string(), vec!["json".to_string()]);
        let raw = self.execute(handler, &params).await?;
        serde_json::from_str(&raw.body).map_err(|e| SolrError::Decode(e.to_string()))
    }
}

/// Cut `s` to at most `max` bytes on a character boundary.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
