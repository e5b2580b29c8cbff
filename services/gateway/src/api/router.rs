use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::ApiState;

pub fn create_router(state: Arc<ApiState>, request_timeout: Duration) -> Router {
    // Leave room for the provider round trip plus a page fetch when summarizing.
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout.saturating_mul(2)));

    Router::new()
        .route("/api/weather", post(handlers::fetch_weather))
        .route("/api/search", post(handlers::search_web))
        .route("/api/assistant", post(handlers::ask_assistant))
        .route("/api/summarize", post(handlers::summarize_page))
        .route("/api/usage", get(handlers::list_usage))
        .route("/api/usage/:service_id", get(handlers::get_usage))
        .route("/health", get(handlers::health_check))
        .with_state(state)
        .layer(middleware)
}
