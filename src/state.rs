use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{DiskCache, MemoryCache, PageCache};
use crate::config::{CacheBackend, Settings};
use crate::error::Result;
use crate::pages::PageService;
use crate::upstream::OpenRouterClient;

pub const DEFAULT_ROBOTS: &str = "User-agent: *\nAllow: /\n";

// app's shared state
pub struct AppState {
    pub pages: PageService,
    pub robots: String, // body of /robots.txt
}

impl AppState {
    pub fn new(pages: PageService, robots: impl Into<String>) -> Self {
        Self {
            pages,
            robots: robots.into(),
        }
    }

    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let cache: Arc<dyn PageCache> = match settings.cache_backend {
            CacheBackend::Memory => Arc::new(MemoryCache::new()),
            CacheBackend::Disk => match DiskCache::open(&settings.cache_dir).await {
                Ok(cache) => {
                    info!("Caching pages in {}", cache.dir().display());
                    Arc::new(cache)
                }
                // keep serving, every request just becomes a miss
                Err(e) => {
                    warn!(
                        "Cache directory {} unusable ({}), pages will not be cached",
                        settings.cache_dir.display(),
                        e
                    );
                    Arc::new(DiskCache::new(&settings.cache_dir))
                }
            },
        };

        let generator = Arc::new(OpenRouterClient::new(
            &settings.base_url,
            &settings.api_key,
            &settings.referer,
            settings.upstream_timeout,
        )?);

        let pages = PageService::new(
            cache,
            generator,
            settings.template.clone(),
            settings.model.clone(),
            settings.cache_ttl,
        );

        Ok(Self::new(pages, load_robots(&settings.robots_file).await))
    }
}

async fn load_robots(path: &Path) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(body) => body,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not read {}: {}", path.display(), e);
            }
            DEFAULT_ROBOTS.to_string()
        }
    }
}
