//! Converter configuration.
//!
//! Settings are layered: built-in defaults, then an optional configuration
//! file (format picked from its extension), then `GIRDOC_*` environment
//! variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix, e.g. `GIRDOC_MAX_NESTING_DEPTH=32`.
pub const ENV_PREFIX: &str = "GIRDOC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Maximum recursion depth for list items, quotes and sections.
    pub max_nesting_depth: usize,
    /// Name substituted for the instance parameter of the current function.
    pub self_name: String,
    /// Prefix of virtual method slots (`GtkWidgetClass.show()` -> `do_show`).
    pub vfunc_prefix: String,
    /// Language used for multi-line code blocks without a `language` attribute.
    pub default_code_language: String,
    /// Try `#Types` -> `Type` and `#Type` -> `Types` when a reference misses.
    pub plural_fallback: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 64,
            self_name: "self".to_string(),
            vfunc_prefix: "do_".to_string(),
            default_code_language: "none".to_string(),
            plural_fallback: true,
        }
    }
}

impl ConverterConfig {
    /// Load the configuration, optionally reading `path` on top of the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .prefix_separator("_"),
        );

        let settings = builder
            .build()
            .with_context(|| match path {
                Some(p) => format!("Failed to read converter config {}", p.display()),
                None => "Failed to read converter config from environment".to_string(),
            })?;

        let config: ConverterConfig = settings
            .try_deserialize()
            .context("Invalid converter configuration")?;

        Ok(config.sanitized())
    }

    /// Clamp values that would make the converter useless.
    fn sanitized(mut self) -> Self {
        if self.max_nesting_depth == 0 {
            log::warn!("max_nesting_depth of 0 is not usable, using 1");
            self.max_nesting_depth = 1;
        }
        if self.default_code_language.trim().is_empty() {
            self.default_code_language = "none".to_string();
        }
        self
    }
}
