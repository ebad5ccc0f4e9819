//! Entitlement lookup: who is calling, and which documents they may see.
//!
//! The entitlement service turns a [`CallerDescriptor`] into a filter-query
//! fragment that is ANDed onto every search the caller makes. A failed lookup
//! is always an error. It never degrades to "no restriction".

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solrgate_config::EntitlementConfig;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::strip::tag_filter;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntitlementError {
    #[error("entitlement service unavailable: {0}")]
    Unavailable(String),
}

/// Identity of the caller as forwarded by the fronting proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallerDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub groups: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl CallerDescriptor {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

/// Filter clauses restricting results to what one caller may see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessFilter {
    clauses: Vec<String>,
}

impl AccessFilter {
    pub fn new(clauses: Vec<String>) -> Self {
        Self { clauses }
    }

    /// A single fragment; blank means unrestricted.
    pub fn from_fragment(fragment: &str) -> Self {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            Self::default()
        } else {
            Self::new(vec![fragment.to_string()])
        }
    }

    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Clauses carrying the access marker, as sent to Solr.
    pub fn tagged_clauses(&self) -> Vec<String> {
        self.clauses.iter().map(|c| tag_filter(c)).collect()
    }
}

#[async_trait]
pub trait AccessFilterSupplier: Send + Sync {
    async fn fetch(&self, caller: &CallerDescriptor) -> Result<AccessFilter, EntitlementError>;
}

/// Supplier used when entitlement checks are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

#[async_trait]
impl AccessFilterSupplier for Unrestricted {
    async fn fetch(&self, _caller: &CallerDescriptor) -> Result<AccessFilter, EntitlementError> {
        Ok(AccessFilter::default())
    }
}

#[derive(Debug, Deserialize)]
struct FilterResponse {
    #[serde(default)]
    filter: Option<String>,
}

/// Entitlement service reached over HTTP: `POST <url>` with the caller as
/// JSON, answered by `{"filter": "..."}`.
#[derive(Debug, Clone)]
pub struct HttpEntitlementClient {
    http: reqwest::Client,
    url: Url,
}

impl HttpEntitlementClient {
    pub fn new(config: &EntitlementConfig) -> Result<Self, EntitlementError> {
        let raw = config
            .url
            .as_deref()
            .ok_or_else(|| EntitlementError::Unavailable("no entitlement url configured".into()))?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EntitlementError::Unavailable(format!("failed to build http client: {e}")))?;
        Self::with_client(http, raw)
    }

    pub fn with_client(http: reqwest::Client, url: &str) -> Result<Self, EntitlementError> {
        let url = Url::parse(url)
            .map_err(|e| EntitlementError::Unavailable(format!("invalid url {url}: {e}")))?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl AccessFilterSupplier for HttpEntitlementClient {
    async fn fetch(&self, caller: &CallerDescriptor) -> Result<AccessFilter, EntitlementError> {
        let response = self
            .http
            .post(self.url.clone())
            .json(caller)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Entitlement request failed");
                if e.is_timeout() {
                    EntitlementError::Unavailable("request timed out".into())
                } else {
                    EntitlementError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Entitlement service returned an error");
            return Err(EntitlementError::Unavailable(format!("status {status}")));
        }

        let body: FilterResponse = response
            .json()
            .await
            .map_err(|e| EntitlementError::Unavailable(format!("invalid response: {e}")))?;
        let fragment = body
            .filter
            .ok_or_else(|| EntitlementError::Unavailable("response has no filter".into()))?;

        debug!(user = ?caller.user, empty = fragment.trim().is_empty(), "Fetched access filter");
        Ok(AccessFilter::from_fragment(&fragment))
    }
}

/// The supplier described by `config`.
pub fn supplier_from_config(
    config: &EntitlementConfig,
) -> Result<Arc<dyn AccessFilterSupplier>, EntitlementError> {
    if config.enabled {
        Ok(Arc::new(HttpEntitlementClient::new(config)?))
    } else {
        Ok(Arc::new(Unrestricted))
    }
}
