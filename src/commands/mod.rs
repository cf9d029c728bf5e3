//! Command descriptors, providers and their registries

pub mod builtin;
pub mod descriptor;
pub mod provider;
pub mod registry;

pub use descriptor::{CommandAction, CommandDescriptor, HighlightSpec};
pub use provider::{CommandProvider, DerivedView, ProviderContext, ProviderError};
pub use registry::{CommandProviderRegistry, LanguageRegistry, LanguageSupport};
