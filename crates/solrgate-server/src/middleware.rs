use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

/// Bound each request by `server.read_timeout_ms` of the current runtime.
pub async fn request_timeout(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let timeout = state.runtime().config().server.read_timeout();
    match tokio::time::timeout(timeout, next.run(req)).await {
        Ok(response) => response,
        Err(_) => ApiError::Timeout(timeout.as_millis() as u64).into_response(),
    }
}
