use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::changes::changes_router;
use super::extensions::extensions_router;
use crate::service::{ChangeFeed, ExtensionService};

pub struct AppState {
    pub extensions: ExtensionService,
    pub changes: ChangeFeed,
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", extensions_router())
        .nest("/api/v1", changes_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
