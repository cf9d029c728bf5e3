//! Engine configuration
//!
//! Loaded from a JSON file:
//!
//! ```json
//! {
//!   "enabled": true,
//!   "hint_threshold": 5,
//!   "languages": [
//!     { "language": "text", "suffix": "." },
//!     { "language": "query", "suffix": "..", "supports_injected": true, "line_comment": "--" }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::commands::builtin::default_providers;
use crate::commands::LanguageRegistry;
use crate::completion::hint::{JsonHintStore, DEFAULT_HINT_THRESHOLD};
use crate::trigger::TriggerConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("language '{0}' has an empty trigger suffix")]
    EmptySuffix(String),

    #[error("language '{language}' trigger suffix {suffix:?} is longer than 2 characters")]
    SuffixTooLong { language: String, suffix: String },

    #[error("language '{0}' is configured more than once")]
    DuplicateLanguage(String),
}

/// Trigger support for one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub language: String,
    pub suffix: String,
    #[serde(default)]
    pub filter_suffix: Option<char>,
    #[serde(default)]
    pub supports_injected: bool,
    /// Token used by the built-in `commentLine` command
    #[serde(default = "default_line_comment")]
    pub line_comment: String,
}

fn default_line_comment() -> String {
    "#".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_hint_threshold() -> u32 {
    DEFAULT_HINT_THRESHOLD
}

impl LanguageConfig {
    pub fn new(language: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            suffix: suffix.into(),
            filter_suffix: None,
            supports_injected: false,
            line_comment: default_line_comment(),
        }
    }

    pub fn trigger(&self) -> TriggerConfig {
        TriggerConfig {
            suffix: self.suffix.clone(),
            filter_suffix: self.filter_suffix,
            supports_injected: self.supports_injected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_hint_threshold")]
    pub hint_threshold: u32,
    /// Usage-hint counter location; defaults to the user config directory
    #[serde(default)]
    pub hint_store: Option<PathBuf>,
    #[serde(default)]
    pub languages: Vec<LanguageConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hint_threshold: DEFAULT_HINT_THRESHOLD,
            hint_store: None,
            languages: vec![LanguageConfig::new("text", ".")],
        }
    }
}

impl EngineConfig {
    /// Reads and validates a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&raw)?;
        info!(
            "Loaded config from {:?} ({} languages)",
            path,
            config.languages.len()
        );
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// At most one configuration per language; suffixes of one or two chars
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for lang in &self.languages {
            match lang.suffix.chars().count() {
                0 => return Err(ConfigError::EmptySuffix(lang.language.clone())),
                1 | 2 => {}
                _ => {
                    return Err(ConfigError::SuffixTooLong {
                        language: lang.language.clone(),
                        suffix: lang.suffix.clone(),
                    });
                }
            }
            if !seen.insert(lang.language.as_str()) {
                return Err(ConfigError::DuplicateLanguage(lang.language.clone()));
            }
        }
        Ok(())
    }

    /// Registers every configured language with the built-in providers
    pub fn build_registry(&self) -> LanguageRegistry {
        let mut registry = LanguageRegistry::new();
        for lang in &self.languages {
            registry.register(
                lang.language.clone(),
                lang.trigger(),
                default_providers(&lang.line_comment),
            );
        }
        debug!("Built language registry for {} languages", self.languages.len());
        registry
    }

    /// Hint store at the configured path, or the default location
    pub fn hint_store(&self) -> Option<JsonHintStore> {
        self.hint_store
            .clone()
            .or_else(JsonHintStore::default_path)
            .map(JsonHintStore::new)
    }

    pub fn feature_flag(&self) -> FeatureFlag {
        FeatureFlag::new(self.enabled)
    }
}

/// Shared on/off switch for the whole engine
#[derive(Debug, Clone)]
pub struct FeatureFlag(Arc<AtomicBool>);

impl FeatureFlag {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Relaxed);
    }
}

impl Default for FeatureFlag {
    fn default() -> Self {
        Self::new(true)
    }
}
