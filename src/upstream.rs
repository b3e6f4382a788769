//! Client for the text-generation API (OpenRouter chat completions).

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::{PageError, Result};
use crate::models::{ChatRequest, ChatResponse, ErrorBody, GenerationRequest};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

const APP_TITLE: &str = "page-oracle";

// longest upstream error text we carry into logs and error pages
const MAX_ERROR_LEN: usize = 300;

/// Anything that can turn a prompt into an HTML fragment.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    referer: String,
}

impl OpenRouterClient {
    /// Every request made by this client gives up after `timeout`.
    pub fn new(
        base_url: &str,
        api_key: &str,
        referer: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PageError::Configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            referer: referer.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl Generator for OpenRouterClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!(model = %request.model, "Calling upstream");

        let res = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", APP_TITLE)
            .json(&ChatRequest::from(request))
            .send()
            .await
            .map_err(transport_error)?;

        let status = res.status();
        let body = res.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(PageError::UpstreamRejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        parse_completion(&body)
    }
}

fn transport_error(err: reqwest::Error) -> PageError {
    if err.is_timeout() {
        PageError::timed_out(err.to_string())
    } else {
        PageError::unavailable(err.to_string())
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_LEN).collect()
}

// `error.message` from an OpenRouter error body, else the raw body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => truncate(&parsed.error.message),
        _ if body.trim().is_empty() => "empty response body".to_string(),
        _ => truncate(body.trim()),
    }
}

/// Pull the generated text out of a successful response body.
pub fn parse_completion(body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| PageError::UpstreamMalformed(format!("invalid JSON: {e}")))?;

    if let Some(err) = parsed.error {
        let status = err
            .code
            .as_ref()
            .and_then(|c| c.as_u64())
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(502);
        return Err(PageError::UpstreamRejected {
            status,
            message: truncate(&err.message),
        });
    }

    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| PageError::UpstreamMalformed("response has no choices".to_string()))?
        .message
        .content
        .unwrap_or_default();

    let html = strip_code_fence(&content);
    if html.is_empty() {
        return Err(PageError::UpstreamMalformed("empty completion".to_string()));
    }
    Ok(html)
}

/// Models like to wrap HTML in ```html fences even when told not to.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let inner = match rest.split_once('\n') {
        Some((tag, body)) if is_language_tag(tag) => body,
        _ => rest,
    };
    let inner = inner.trim_end();
    inner.strip_suffix("```").unwrap_or(inner).trim().to_string()
}

// `html`, `HTML`, `xhtml+xml`, or nothing at all
fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    /// Deterministic generator for tests: `<h1>{prompt}</h1>` or a fixed body.
    pub struct FakeGenerator {
        pub calls: AtomicUsize,
        pub enabled: AtomicBool,
        fixed: Option<String>,
        // when set, every call waits here so concurrent calls overlap
        barrier: Option<Arc<Barrier>>,
    }

    impl FakeGenerator {
        pub fn echo() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                enabled: AtomicBool::new(true),
                fixed: None,
                barrier: None,
            }
        }

        pub fn fixed(html: &str) -> Self {
            Self {
                fixed: Some(html.to_string()),
                ..Self::echo()
            }
        }

        pub fn failing() -> Self {
            let fake = Self::echo();
            fake.disable();
            fake
        }

        pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
            self.barrier = Some(barrier);
            self
        }

        pub fn disable(&self) {
            self.enabled.store(false, Ordering::SeqCst);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Generator for FakeGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            if !self.enabled.load(Ordering::SeqCst) {
                return Err(PageError::unavailable("upstream disabled"));
            }
            Ok(match &self.fixed {
                Some(html) => html.clone(),
                None => format!("<h1>{}</h1>", request.prompt),
            })
        }
    }
}
