//! Registries for command providers and per-language trigger support
//!
//! [`CommandProviderRegistry`] holds the providers of one language in
//! registration order. [`LanguageRegistry`] maps a language id to at most one
//! [`LanguageSupport`] (trigger configuration plus providers).
//!
//! # Example
//!
//! ```rust,ignore
//! let mut providers = CommandProviderRegistry::new();
//! providers.register(Arc::new(SurroundWithProvider));
//!
//! let mut languages = LanguageRegistry::new();
//! languages.register("text", TriggerConfig::new("."), providers);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::provider::CommandProvider;
use crate::trigger::TriggerConfig;

/// Ordered set of providers for one language
///
/// Unlike most registries, providers are not sorted: invocation order is
/// registration order, and result ordering is left to ranking.
#[derive(Clone, Default)]
pub struct CommandProviderRegistry {
    providers: Vec<Arc<dyn CommandProvider>>,
}

impl CommandProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider
    pub fn register(&mut self, provider: Arc<dyn CommandProvider>) {
        let name = provider.name().to_string();
        trace!("Registering command provider: {}", name);
        self.providers.push(provider);
        debug!(
            "Registered command provider '{}' (total: {})",
            name,
            self.providers.len()
        );
    }

    /// All providers in registration order
    pub fn get_all(&self) -> &[Arc<dyn CommandProvider>] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for CommandProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

/// Trigger configuration and providers of one language
#[derive(Debug, Clone)]
pub struct LanguageSupport {
    pub config: TriggerConfig,
    pub providers: CommandProviderRegistry,
}

/// Lookup table from language id to its trigger support
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    languages: HashMap<String, LanguageSupport>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the support for `language`
    ///
    /// A language has at most one configuration; a second registration
    /// replaces the first.
    pub fn register(
        &mut self,
        language: impl Into<String>,
        config: TriggerConfig,
        providers: CommandProviderRegistry,
    ) {
        let language = language.into();
        debug!(
            "Registering trigger support for '{}' (suffix {:?}, {} providers)",
            language,
            config.suffix,
            providers.len()
        );
        if self
            .languages
            .insert(language.clone(), LanguageSupport { config, providers })
            .is_some()
        {
            warn!("Replaced existing trigger support for '{}'", language);
        }
    }

    pub fn get(&self, language: &str) -> Option<&LanguageSupport> {
        self.languages.get(language)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }
}
