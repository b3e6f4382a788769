use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::cache::topic;
use crate::error::PageError;
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::pages::Outcome;
use crate::render::{page_document, title_for};
use crate::state::AppState;

// HTTP status for a failed generation
pub fn status_for(err: &PageError) -> StatusCode {
    match err {
        PageError::UpstreamUnavailable { timed_out: true, .. } => StatusCode::GATEWAY_TIMEOUT,
        PageError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        PageError::UpstreamRejected { .. } | PageError::UpstreamMalformed(_) => {
            StatusCode::BAD_GATEWAY
        }
        PageError::Configuration(_) | PageError::CacheUnavailable(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// GET handler for every page path
pub async fn page_handler(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let page = state.pages.get_or_generate(uri.path()).await;

    let status = match &page.outcome {
        Outcome::GenerationFailed(err) => status_for(err),
        _ => StatusCode::OK,
    };
    let document = page_document(&title_for(topic(&page.key)), &page.html);

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    info!(
        path = %page.key,
        outcome = page.outcome.as_str(),
        status = status.as_u16(),
        "Served page"
    );

    (
        status,
        [("x-page-outcome", page.outcome.as_str())],
        Html(document),
    )
        .into_response()
}
