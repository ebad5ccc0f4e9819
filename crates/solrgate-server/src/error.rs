//! Request-level errors and their HTTP mapping.
//!
//! Error bodies follow Solr's own shape, `{"responseHeader": {...},
//! "error": {"msg": ..., "code": ...}}`, so clients written against Solr
//! keep working. Denials additionally carry the admission decision.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use solrgate_policy::{Decision, Rejection};
use solrgate_search::{EntitlementError, FilterError, MergerError, SolrError, StripError};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    /// The admission evaluator refused the request.
    #[error("request denied: {}", .0.reasons.join("; "))]
    Denied(Decision),

    #[error("no handler configuration for '{0}'")]
    UnknownHandler(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Backend(#[from] SolrError),

    #[error(transparent)]
    Entitlement(#[from] EntitlementError),

    #[error("access filter missing from backend response: {0}")]
    Strip(#[from] StripError),

    #[error("parameter merge failed: {0}")]
    Merger(#[from] MergerError),

    #[error("request timed out after {0} ms")]
    Timeout(u64),
}

impl From<FilterError> for ApiError {
    fn from(e: FilterError) -> Self {
        match e {
            FilterError::Entitlement(e) => Self::Entitlement(e),
            FilterError::Probe(e) => Self::Backend(e),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Denied(decision) => match decision.rejection {
                Some(Rejection::Overweight) => StatusCode::FORBIDDEN,
                Some(Rejection::UnknownHandler) => StatusCode::NOT_FOUND,
                Some(Rejection::IllegalInput) | None => StatusCode::BAD_REQUEST,
            },
            Self::UnknownHandler(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Backend(_) | Self::Strip(_) => StatusCode::BAD_GATEWAY,
            Self::Entitlement(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Merger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Message shown to the caller.
    fn public_message(&self) -> String {
        match self {
            // Only the extracted error.msg, never transport details
            Self::Backend(SolrError::Status { message, .. }) => message.clone(),
            Self::Backend(_) => "search backend unavailable".to_string(),
            Self::Entitlement(_) => "entitlement service unavailable".to_string(),
            Self::Merger(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let code = status.as_u16();
        let mut body = json!({
            "responseHeader": {"status": code},
            "error": {"msg": self.public_message(), "code": code}
        });
        if let Self::Denied(decision) = &self {
            body["decision"] = serde_json::to_value(decision).unwrap_or_default();
        }
        (status, Json(body)).into_response()
    }
}
