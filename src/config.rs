use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PageError, Result};
use crate::prompt::PromptTemplate;
use crate::upstream::DEFAULT_BASE_URL;

pub const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CacheBackend {
    Disk,
    Memory,
}

// CLI argument structure, every option can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "page-oracle")]
#[command(about = "Generates HTML pages for any path with an LLM and caches them")]
pub struct Args {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// OpenRouter credential, "none" counts as unset
    #[arg(long, env = "OPENROUTER_API_KEY", default_value = "none", hide_env_values = true)]
    pub api_key: String,

    /// Model identifier passed to OpenRouter
    #[arg(short, long, env = "OPENROUTER_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Chat completions API base url
    #[arg(long, env = "OPENROUTER_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Prompt template file, wins over --prompt-template when it exists
    #[arg(long, env = "PROMPT_FILE", default_value = "prompt.txt")]
    pub prompt_file: PathBuf,

    /// Inline prompt template with a {path} placeholder
    #[arg(long, env = "PROMPT_TEMPLATE")]
    pub prompt_template: Option<String>,

    /// Where generated pages are kept
    #[arg(long, env = "CACHE_DIR", default_value = "cache")]
    pub cache_dir: PathBuf,

    /// Keep pages on disk or only in memory
    #[arg(long, value_enum, env = "CACHE_BACKEND", default_value_t = CacheBackend::Disk)]
    pub cache_backend: CacheBackend,

    // Cache TTL in seconds (0 = never expire)
    #[arg(short, long, env = "CACHE_TTL", default_value_t = 86400)]
    pub cache_ttl: u64,

    /// Upstream request timeout in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT", default_value_t = 60)]
    pub upstream_timeout: u64,

    /// HTTP-Referer sent to OpenRouter
    #[arg(long, env = "OPENROUTER_REFERER", default_value = "http://localhost:9999")]
    pub referer: String,

    /// Served verbatim at /robots.txt
    #[arg(long, env = "ROBOTS_FILE", default_value = "robots.txt")]
    pub robots_file: PathBuf,

    /// Verbose logging
    #[arg(long)]
    pub debug: bool,
}

/// Validated settings, built once at startup and passed around by reference.
#[derive(Clone)]
pub struct Settings {
    pub addr: String,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub template: PromptTemplate,
    pub cache_dir: PathBuf,
    pub cache_backend: CacheBackend,
    pub cache_ttl: Option<Duration>,
    pub upstream_timeout: Duration,
    pub referer: String,
    pub robots_file: PathBuf,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("addr", &self.addr)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("template", &self.template.source())
            .field("cache_dir", &self.cache_dir)
            .field("cache_backend", &self.cache_backend)
            .field("cache_ttl", &self.cache_ttl)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("referer", &self.referer)
            .field("robots_file", &self.robots_file)
            .finish()
    }
}

impl Settings {
    pub fn from_args(args: Args) -> Result<Self> {
        let api_key = args.api_key.trim();
        if api_key.is_empty() || api_key.eq_ignore_ascii_case("none") {
            return Err(PageError::Configuration(
                "OPENROUTER_API_KEY is not set".to_string(),
            ));
        }

        let model = args.model.trim();
        if model.is_empty() {
            return Err(PageError::Configuration(
                "OPENROUTER_MODEL must not be empty".to_string(),
            ));
        }

        if args.upstream_timeout == 0 {
            return Err(PageError::Configuration(
                "upstream timeout must be at least one second".to_string(),
            ));
        }

        let template = PromptTemplate::load(&args.prompt_file, args.prompt_template.as_deref())?;

        Ok(Self {
            addr: format!("{}:{}", args.host, args.port),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: args.base_url,
            template,
            cache_dir: args.cache_dir,
            cache_backend: args.cache_backend,
            cache_ttl: (args.cache_ttl > 0).then(|| Duration::from_secs(args.cache_ttl)),
            upstream_timeout: Duration::from_secs(args.upstream_timeout),
            referer: args.referer,
            robots_file: args.robots_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // explicit flags for everything the environment could otherwise supply
    fn parse(tmp: &TempDir, extra: &[&str]) -> Args {
        let prompt_file = tmp.path().join("prompt.txt");
        let mut argv = vec![
            "page-oracle".to_string(),
            "--prompt-file".to_string(),
            prompt_file.display().to_string(),
            "--prompt-template".to_string(),
            "Page about {path}".to_string(),
            "--model".to_string(),
            DEFAULT_MODEL.to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn placeholder_api_key_is_a_configuration_error() {
        let tmp = TempDir::new().unwrap();
        for key in ["none", "NONE", "", "   "] {
            let err = Settings::from_args(parse(&tmp, &["--api-key", key])).unwrap_err();
            assert!(matches!(err, PageError::Configuration(_)), "{key:?}");
        }
    }

    #[test]
    fn valid_args_build_settings() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::from_args(parse(
            &tmp,
            &["--api-key", "sk-or-123", "--port", "8080", "--cache-ttl", "60"],
        ))
        .unwrap();

        assert_eq!(settings.api_key, "sk-or-123");
        assert_eq!(settings.addr.rsplit(':').next(), Some("8080"));
        assert_eq!(settings.cache_ttl, Some(Duration::from_secs(60)));
        assert_eq!(settings.template.render("x"), "Page about x");
    }

    #[test]
    fn zero_ttl_means_no_expiry() {
        let tmp = TempDir::new().unwrap();
        let settings =
            Settings::from_args(parse(&tmp, &["--api-key", "k", "--cache-ttl", "0"])).unwrap();
        assert_eq!(settings.cache_ttl, None);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let result =
            Settings::from_args(parse(&tmp, &["--api-key", "k", "--upstream-timeout", "0"]));
        assert!(result.is_err());
    }

    #[test]
    fn debug_output_hides_api_key() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::from_args(parse(&tmp, &["--api-key", "sk-secret"])).unwrap();
        let printed = format!("{settings:?}");
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn memory_backend_flag() {
        let tmp = TempDir::new().unwrap();
        let args = parse(&tmp, &["--api-key", "k", "--cache-backend", "memory"]);
        assert_eq!(args.cache_backend, CacheBackend::Memory);
    }
}
