//! Parameter maps as they travel between request, configuration and backend.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::form_urlencoded;

/// Ordered multi-valued parameter map (`name -> values`).
///
/// Insertion order is preserved so that evaluation and forwarding are
/// deterministic for a given request.
pub type ParamMap = IndexMap<String, Vec<String>>;

/// A single scalar as written in the configuration file.
///
/// TOML lets operators write `rows = 10` or `rows = "10"`; both end up as the
/// string `"10"` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One or many configured values for a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValues {
    One(ParamValue),
    Many(Vec<ParamValue>),
}

impl ParamValues {
    /// Render the values as wire strings.
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            Self::One(v) => vec![v.to_string()],
            Self::Many(vs) => vs.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Convert a configured map into a wire-level [`ParamMap`].
pub fn to_param_map(configured: &IndexMap<String, ParamValues>) -> ParamMap {
    configured
        .iter()
        .map(|(k, v)| (k.clone(), v.to_strings()))
        .collect()
}

/// Parse an `application/x-www-form-urlencoded` query string into a [`ParamMap`].
///
/// Repeated keys accumulate values in order: `fq=a&fq=b` gives `fq -> [a, b]`.
pub fn parse_query(query: &str) -> ParamMap {
    let mut params = ParamMap::new();
    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
        params.entry(k.into_owned()).or_default().push(v.into_owned());
    }
    params
}

/// Encode a [`ParamMap`] back into a query string.
pub fn encode_query(params: &ParamMap) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, values) in params {
        for v in values {
            serializer.append_pair(k, v);
        }
    }
    serializer.finish()
}
