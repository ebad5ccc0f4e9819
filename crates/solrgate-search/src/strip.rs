//! Removal of the gateway's own access filter from echoed response params.
//!
//! The entitlement filter is sent with a reserved local-params prefix so it
//! can be told apart from caller filters. When Solr echoes the request params
//! back, every marked filter is cut from the body before it reaches the
//! caller. A body without any marked filter means the backend did not see
//! the filter the gateway sent, so stripping fails instead of passing the
//! body through.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Reserved prefix carried by every access-filter clause the gateway adds.
pub const ACCESS_MARKER: &str = "{!cache=true tag=solrgate_access}";

static XML_MARKED_STR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"<str(?:\s[^>]*)?>{}[^<]*</str>",
        regex::escape(ACCESS_MARKER)
    ))
    .expect("Invalid access marker regex")
});

#[derive(Debug, Error)]
pub enum StripError {
    #[error("response carries no marked access filter")]
    MarkerNotFound,

    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Serialization of a Solr response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Xml,
}

impl ResponseFormat {
    /// Pick the format from the response content type, falling back to the
    /// requested `wt`. Solr answers JSON unless asked otherwise.
    pub fn detect(content_type: Option<&str>, wt: Option<&str>) -> Self {
        if let Some(ct) = content_type {
            if ct.contains("xml") {
                return Self::Xml;
            }
            if ct.contains("json") {
                return Self::Json;
            }
        }
        match wt {
            Some("xml") => Self::Xml,
            _ => Self::Json,
        }
    }
}

/// Prefix `clause` with [`ACCESS_MARKER`].
pub fn tag_filter(clause: &str) -> String {
    format!("{ACCESS_MARKER}{clause}")
}

pub fn is_tagged(value: &str) -> bool {
    value.starts_with(ACCESS_MARKER)
}

/// Remove every marked filter from `body`.
pub fn strip_access_filters(body: &str, format: ResponseFormat) -> Result<String, StripError> {
    match format {
        ResponseFormat::Json => strip_json(body),
        ResponseFormat::Xml => strip_xml(body),
    }
}

fn strip_json(body: &str) -> Result<String, StripError> {
    let mut value: Value =
        serde_json::from_str(body).map_err(|e| StripError::InvalidJson(e.to_string()))?;
    if strip_value(&mut value) == 0 {
        return Err(StripError::MarkerNotFound);
    }
    serde_json::to_string(&value).map_err(|e| StripError::InvalidJson(e.to_string()))
}

/// Returns how many marked strings were removed below `value`.
fn strip_value(value: &mut Value) -> usize {
    match value {
        Value::Object(map) => {
            let before = map.len();
            map.retain(|_, v| !matches!(v, Value::String(s) if is_tagged(s)));
            let mut removed = before - map.len();
            for child in map.values_mut() {
                removed += strip_value(child);
            }
            removed
        }
        Value::Array(items) => {
            let before = items.len();
            items.retain(|v| !matches!(v, Value::String(s) if is_tagged(s)));
            let mut removed = before - items.len();
            for child in items.iter_mut() {
                removed += strip_value(child);
            }
            removed
        }
        _ => 0,
    }
}

fn strip_xml(body: &str) -> Result<String, StripError> {
    if !XML_MARKED_STR.is_match(body) {
        return Err(StripError::MarkerNotFound);
    }
    Ok(XML_MARKED_STR.replace_all(body, "").into_owned())
}
