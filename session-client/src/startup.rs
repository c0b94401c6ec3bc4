use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use session_core::middleware::request_id_middleware;
use session_core::observability::extract_request_id;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::{AuthFailureStrategy, ClientFactory, Transport};
use crate::handlers::{
    app::{health_check, index},
    pages::{dashboard, metrics},
    session::{sign_in, sign_out},
};
use crate::session::MemoryCookieStore;
use crate::AppState;

/// Client factory for server-rendered requests. Every client it hands out is
/// built for a request context, so the ambient store stays empty.
pub fn server_client_factory(transport: Arc<dyn Transport>) -> ClientFactory {
    ClientFactory::new(
        transport,
        Arc::new(MemoryCookieStore::new()),
        AuthFailureStrategy::Declarative,
    )
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(sign_in))
        .route("/sign-out", post(sign_out))
        .route("/dashboard", get(dashboard))
        .route("/metrics", get(metrics))
        .route("/health", get(health_check))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id =
                    extract_request_id(request.headers()).unwrap_or_else(|| "-".to_string());

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Outermost, so the span above sees the generated id
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
