use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{PageError, Result};

pub const PLACEHOLDER: &str = "{path}";

pub const DEFAULT_TEMPLATE: &str = r#"Generate a webpage about "{path}".
The content should be informative and engaging.
Return only the HTML content for the body (no <html>, <head>, or <body> tags).
Use semantic HTML elements and include proper headings."#;

// Where the template text came from, for the startup log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    File(PathBuf),
    Env,
    Default,
}

/// Prompt sent upstream, with `{path}` marking where the page topic goes.
/// Loaded once at startup and never changed afterwards.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
    source: TemplateSource,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>, source: TemplateSource) -> Result<Self> {
        let text = text.into();
        if !text.contains(PLACEHOLDER) {
            return Err(PageError::Configuration(format!(
                "prompt template from {source:?} has no {PLACEHOLDER} placeholder"
            )));
        }
        Ok(Self { text, source })
    }

    /// Pick the template: the file wins if it exists, then the env value,
    /// then the built-in default.
    pub fn load(file: &Path, env_value: Option<&str>) -> Result<Self> {
        if file.is_file() {
            let text = std::fs::read_to_string(file).map_err(|e| {
                PageError::Configuration(format!(
                    "cannot read prompt file {}: {e}",
                    file.display()
                ))
            })?;
            return Self::new(text, TemplateSource::File(file.to_path_buf()));
        }

        if let Some(text) = env_value.filter(|t| !t.trim().is_empty()) {
            return Self::new(text, TemplateSource::Env);
        }

        info!("No prompt file or PROMPT_TEMPLATE set, using the built-in template");
        Self::new(DEFAULT_TEMPLATE, TemplateSource::Default)
    }

    pub fn render(&self, topic: &str) -> String {
        self.text.replace(PLACEHOLDER, topic)
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }
}
