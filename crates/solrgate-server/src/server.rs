use std::net::SocketAddr;

use axum::{Router, middleware, routing::get};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::{AppState, Runtime};
use crate::{handlers, middleware as app_middleware};

pub struct SolrgateServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.runtime().config().server.body_limit_bytes;
    Router::new()
        .route("/health", get(handlers::health))
        .route("/solr/{handler}", get(handlers::search))
        .route("/suggest/{handler}", get(handlers::suggest))
        .route("/policy/{handler}", get(handlers::explain))
        // Middleware stack (order: timeout -> compression/cors/trace -> body limit)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::request_timeout,
        ))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct ServerBuilder {
    addr: Option<SocketAddr>,
    runtime: Runtime,
}

impl ServerBuilder {
    pub fn new(runtime: Runtime) -> Self {
        Self {
            addr: None,
            runtime,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    /// Build the server together with the state handle used for reloads.
    pub fn build(self) -> (SolrgateServer, AppState) {
        let addr = self.addr.unwrap_or_else(|| self.runtime.config().addr());
        let state = AppState::new(self.runtime);
        let app = build_app(state.clone());
        (SolrgateServer { addr, app }, state)
    }
}

impl SolrgateServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
