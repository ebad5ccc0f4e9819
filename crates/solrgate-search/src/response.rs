//! Solr JSON response shapes used by the gateway.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseHeader {
    #[serde(default)]
    pub status: i32,
    #[serde(rename = "QTime", default)]
    pub qtime: i64,
    /// Echoed request params, when `echoParams` asks for them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocList {
    pub num_found: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_found_exact: Option<bool>,
    #[serde(default)]
    pub docs: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub response_header: ResponseHeader,
    pub response: DocList,
}

/// One autosuggest candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub term: String,
    #[serde(default)]
    pub weight: i64,
    #[serde(default)]
    pub payload: String,
}

impl Suggestion {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            weight: 0,
            payload: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestResult {
    pub num_found: u64,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

/// `suggest.<dictionary>.<query>` as returned by the suggest component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestResponse {
    #[serde(default)]
    pub response_header: ResponseHeader,
    #[serde(default)]
    pub suggest: IndexMap<String, IndexMap<String, SuggestResult>>,
}

impl SuggestResponse {
    /// Every `(dictionary, query)` result list.
    pub fn results_mut(&mut self) -> impl Iterator<Item = &mut SuggestResult> {
        self.suggest.values_mut().flat_map(|d| d.values_mut())
    }
}

/// `error.msg` of a Solr error body, if the body is JSON and carries one.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("msg")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search_response() {
        let body = json!({
            "responseHeader": {"status": 0, "QTime": 3},
            "response": {"numFound": 2, "start": 0, "numFoundExact": true, "docs": [{"id": "1"}, {"id": "2"}]}
        });
        let parsed: SearchResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.response_header.qtime, 3);
        assert_eq!(parsed.response.num_found, 2);
        assert_eq!(parsed.response.num_found_exact, Some(true));
        assert_eq!(parsed.response.docs.len(), 2);
    }

    #[test]
    fn test_suggest_results_are_editable() {
        let body = json!({
            "responseHeader": {"status": 0, "QTime": 1},
            "suggest": {"titles": {"rus": {"numFound": 3, "suggestions": [
                {"term": "rust", "weight": 10, "payload": ""},
                {"term": "rusty", "weight": 5, "payload": "x"},
                {"term": "russet", "weight": 1, "payload": ""}
            ]}}}
        });
        let mut parsed: SuggestResponse = serde_json::from_value(body).unwrap();
        for result in parsed.results_mut() {
            result.suggestions.retain(|c| c.term.starts_with("rust"));
        }
        let result = &parsed.suggest["titles"]["rus"];
        assert_eq!(result.num_found, 3);
        assert_eq!(result.suggestions.len(), 2);
        assert_eq!(result.suggestions[1].payload, "x");
    }

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"responseHeader":{"status":400},"error":{"msg":"undefined field foo","code":400}}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("undefined field foo")
        );
        assert_eq!(extract_error_message("<html>oops</html>"), None);
    }
}
