use thiserror::Error;

/// Everything that can go wrong while serving a generated page.
#[derive(Debug, Clone, Error)]
pub enum PageError {
    /// Missing or placeholder settings, detected at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Could not reach the generation API (connect error, timeout, broken transfer).
    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable { message: String, timed_out: bool },

    /// The generation API answered but refused the request (rate limit, bad model, auth).
    #[error("Upstream rejected the request ({status}): {message}")]
    UpstreamRejected { status: u16, message: String },

    /// The generation API answered with something we cannot use.
    #[error("Upstream returned malformed content: {0}")]
    UpstreamMalformed(String),

    /// Cache directory or file could not be read or written.
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),
}

impl PageError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
            timed_out: true,
        }
    }

    // short machine-readable name, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::UpstreamRejected { .. } => "upstream_rejected",
            Self::UpstreamMalformed(_) => "upstream_malformed",
            Self::CacheUnavailable(_) => "cache_unavailable",
        }
    }
}

impl From<std::io::Error> for PageError {
    fn from(err: std::io::Error) -> Self {
        Self::CacheUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_displays_status() {
        let err = PageError::UpstreamRejected {
            status: 429,
            message: "rate limited".into(),
        };
        assert_eq!(
            err.to_string(),
            "Upstream rejected the request (429): rate limited"
        );
        assert_eq!(err.kind(), "upstream_rejected");
    }

    #[test]
    fn io_error_becomes_cache_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: PageError = io.into();
        assert!(matches!(err, PageError::CacheUnavailable(_)));
    }

    #[test]
    fn timeout_is_flagged() {
        let err = PageError::timed_out("30s elapsed");
        assert!(matches!(
            err,
            PageError::UpstreamUnavailable { timed_out: true, .. }
        ));
    }
}
