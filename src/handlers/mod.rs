mod generate;
mod health;
mod metrics;
mod robots;

pub use generate::page_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use robots::robots_handler;

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::state::AppState;

// every path that isn't one of the fixed routes is a page
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/robots.txt", get(robots_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/", get(page_handler))
        .route("/{*path}", get(page_handler))
        .with_state(state)
}
