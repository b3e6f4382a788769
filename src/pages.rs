use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, PageCache, normalize_path, topic};
use crate::error::PageError;
use crate::metrics::{
    CACHE_HITS, CACHE_MISSES, CACHE_SIZE, CACHE_WRITE_ERRORS, GENERATION_FAILURES,
};
use crate::models::GenerationRequest;
use crate::prompt::PromptTemplate;
use crate::render::error_fragment;
use crate::upstream::Generator;

// How a page body was obtained
#[derive(Debug, Clone)]
pub enum Outcome {
    ServedCached,
    Generated,
    GenerationFailed(PageError),
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServedCached => "served_cached",
            Self::Generated => "generated",
            Self::GenerationFailed(_) => "generation_failed",
        }
    }
}

/// Result of one page lookup: the HTML fragment and where it came from.
/// On failure `html` is a safe error fragment.
#[derive(Debug, Clone)]
pub struct Page {
    pub key: String,
    pub html: String,
    pub outcome: Outcome,
}

/// Serves a fragment for any path, generating it upstream on a cache miss.
pub struct PageService {
    cache: Arc<dyn PageCache>,
    generator: Arc<dyn Generator>,
    template: PromptTemplate,
    model: String,
    ttl: Option<Duration>, // None = keep forever
}

impl PageService {
    pub fn new(
        cache: Arc<dyn PageCache>,
        generator: Arc<dyn Generator>,
        template: PromptTemplate,
        model: impl Into<String>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            cache,
            generator,
            template,
            model: model.into(),
            ttl,
        }
    }

    /// One lookup, at most one upstream call, at most one cache write.
    ///
    /// Concurrent misses for the same path may both generate; the last write
    /// wins and each write replaces the entry whole.
    pub async fn get_or_generate(&self, raw_path: &str) -> Page {
        let key = normalize_path(raw_path);

        // check cache first
        match self.cache.get(&key).await {
            Ok(Some(entry)) if entry.is_fresh(self.ttl) => {
                CACHE_HITS.inc();
                debug!(key = %key, "Cache HIT");
                return Page {
                    key,
                    html: entry.html,
                    outcome: Outcome::ServedCached,
                };
            }
            Ok(Some(_)) => debug!(key = %key, "Cache entry expired"),
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Cache read failed, treating as miss"),
        }
        CACHE_MISSES.inc();

        let request = GenerationRequest {
            prompt: self.template.render(topic(&key)),
            model: self.model.clone(),
        };

        match self.generator.generate(&request).await {
            Ok(html) => {
                self.store(&key, &html).await;
                Page {
                    key,
                    html,
                    outcome: Outcome::Generated,
                }
            }
            Err(e) => {
                GENERATION_FAILURES.inc();
                warn!(key = %key, kind = e.kind(), error = %e, "Generation failed");
                Page {
                    key,
                    html: error_fragment(&e),
                    outcome: Outcome::GenerationFailed(e),
                }
            }
        }
    }

    // caching is best effort, a failed write still serves the page
    async fn store(&self, key: &str, html: &str) {
        if let Err(e) = self.cache.put(key, CacheEntry::new(html)).await {
            CACHE_WRITE_ERRORS.inc();
            warn!(key, error = %e, "Could not store generated page");
            return;
        }
        if let Ok(size) = self.cache.len().await {
            CACHE_SIZE.set(size as f64);
        }
    }
}
