//! Trigger detection and trigger-free buffer derivation
//!
//! A trigger is a short suffix (`.` or `..`, per language) typed right after an
//! expression. [`scanner`] finds it before the caret; [`derived`] produces the
//! buffer as if it had never been typed.

pub mod derived;
pub mod scanner;

use serde::{Deserialize, Serialize};

pub use derived::{build_derived, DerivedBuffer};
pub use scanner::{scan, MatchKind, TriggerMatch, RECOVERY_WINDOW};

/// Per-language trigger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Primary suffix, one or two characters
    pub suffix: String,
    /// Optional secondary "filter" character typed after the suffix
    #[serde(default)]
    pub filter_suffix: Option<char>,
    /// Whether sessions may open inside injected fragments of this language
    #[serde(default)]
    pub supports_injected: bool,
}

impl TriggerConfig {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            filter_suffix: None,
            supports_injected: false,
        }
    }

    pub fn with_filter_suffix(mut self, c: char) -> Self {
        self.filter_suffix = Some(c);
        self
    }

    pub fn with_injected_support(mut self) -> Self {
        self.supports_injected = true;
        self
    }

    /// Text trimmed on insertion: the suffix followed by the filter character
    pub fn insertion_suffix(&self) -> String {
        let mut s = self.suffix.clone();
        if let Some(c) = self.filter_suffix {
            s.push(c);
        }
        s
    }

    /// Two-character suffix made of the same character twice (e.g. `..`)
    pub fn palindromic_char(&self) -> Option<char> {
        let mut chars = self.suffix.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(a), Some(b), None) if a == b => Some(a),
            _ => None,
        }
    }
}
