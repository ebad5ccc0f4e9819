use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use solrgate_config::{ParamMap, ServerConfig, params::parse_query};
use solrgate_policy::Decision;
use solrgate_search::{
    AccessFilterSession, CallerDescriptor, ParallelAccessFilter, ParamMerger, ResponseFormat,
    SolrProbe, SuggestResponse, strip_access_filters,
};
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::state::{AppState, Runtime};

/// Parameter carrying the number of suggestions wanted.
const SUGGEST_COUNT: &str = "suggest.count";

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Admission decision for a query, without running it.
pub async fn explain(
    State(state): State<AppState>,
    Path(handler): Path<String>,
    RawQuery(query): RawQuery,
) -> Json<Decision> {
    let runtime = state.runtime();
    let params = parse_query(query.as_deref().unwrap_or(""));
    Json(runtime.evaluator().evaluate(&handler, &params, None))
}

/// Forward an admitted search to Solr under the caller's access filter.
#[instrument(skip_all, fields(handler = %handler))]
pub async fn search(
    State(state): State<AppState>,
    Path(handler): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let runtime = state.runtime();
    let params = parse_query(query.as_deref().unwrap_or(""));
    let merger = admit(&runtime, &handler, &params)?;

    let caller = caller_from_headers(&headers, &runtime.config().server);
    let filter = runtime.entitlement().fetch(&caller).await?;
    let filtered = !filter.is_empty();

    // Added after forced values so no handler setting can replace it
    let mut outgoing = merger.into_params();
    if filtered {
        outgoing
            .entry("fq".to_string())
            .or_default()
            .extend(filter.tagged_clauses());
    }
    let raw = runtime.solr().execute(&handler, &outgoing).await?;

    let format = ResponseFormat::detect(raw.content_type.as_deref(), first(&outgoing, "wt"));
    let body = if filtered && echoes_params(&outgoing) {
        strip_access_filters(&raw.body, format)?
    } else {
        raw.body
    };

    let content_type = raw.content_type.unwrap_or_else(|| match format {
        ResponseFormat::Json => "application/json".to_string(),
        ResponseFormat::Xml => "application/xml".to_string(),
    });
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response())
}

/// Run an admitted suggest request and keep only suggestions the caller
/// can actually find.
#[instrument(skip_all, fields(handler = %handler))]
pub async fn suggest(
    State(state): State<AppState>,
    Path(handler): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Json<SuggestResponse>, ApiError> {
    let runtime = state.runtime();
    let settings = &runtime.config().suggest;
    let params = parse_query(query.as_deref().unwrap_or(""));

    let wanted = match first(&params, SUGGEST_COUNT) {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| ApiError::BadRequest(format!("{SUGGEST_COUNT} must be a count")))?,
        None => settings.default_count,
    };

    let mut merger = admit(&runtime, &handler, &params)?;
    merger.put(
        SUGGEST_COUNT,
        wanted.saturating_mul(settings.overfetch).to_string(),
    )?;
    let outgoing = merger.into_params();
    let mut response = runtime.solr().suggest(&handler, &outgoing).await?;

    let caller = caller_from_headers(&headers, &runtime.config().server);
    let session = AccessFilterSession::new(runtime.entitlement(), caller);
    let filter = ParallelAccessFilter::new(
        SolrProbe::new(runtime.solr().clone(), settings),
        settings.parallelism,
    );
    for result in response.results_mut() {
        let kept = filter.filter(&session, &result.suggestions, wanted).await?;
        debug!(
            candidates = result.suggestions.len(),
            kept = kept.len(),
            "Filtered suggestions"
        );
        result.num_found = kept.len() as u64;
        result.suggestions = kept;
    }
    Ok(Json(response))
}

/// Evaluate `params` for `handler` and, when admitted, seed a merger with
/// the handler's defaults, forced values and the user's params.
fn admit(runtime: &Runtime, handler: &str, params: &ParamMap) -> Result<ParamMerger, ApiError> {
    let decision = runtime.evaluator().evaluate(handler, params, None);
    if !decision.allowed {
        return Err(ApiError::Denied(decision));
    }
    debug!(weight = decision.weight, "Request admitted");

    let config = runtime.config();
    let handler_config = config
        .handler(handler)
        .ok_or_else(|| ApiError::UnknownHandler(handler.to_string()))?;
    let mut merger = ParamMerger::new(
        handler_config.default_params(),
        handler_config.forced_params(),
    )
    .with_cumulative(config.cumulative_params.iter().cloned());
    for (key, values) in params {
        merger.put_all(key, values.iter().cloned())?;
    }
    Ok(merger)
}

fn first<'a>(params: &'a ParamMap, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|v| v.first())
        .map(String::as_str)
}

/// Whether Solr will echo our filter back. Stock handlers echo explicit
/// params unless told `echoParams=none`.
fn echoes_params(params: &ParamMap) -> bool {
    first(params, "echoParams") != Some("none")
}

pub(crate) fn caller_from_headers(headers: &HeaderMap, server: &ServerConfig) -> CallerDescriptor {
    let text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let mut caller = CallerDescriptor::anonymous();
    if let Some(user) = text(&server.user_header) {
        caller = caller.with_user(user);
    }
    if let Some(groups) = text(&server.groups_header) {
        caller = caller.with_groups(
            groups
                .split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty()),
        );
    }
    if let Some(forwarded) = text("x-forwarded-for")
        && let Some(address) = forwarded.split(',').next()
    {
        caller = caller.with_address(address.trim());
    }
    caller
}
