//! Command descriptors produced by providers

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use serde::Serialize;

use crate::editor::{Editor, FileContext};

/// Range a provider wants highlighted while its command is selected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightSpec {
    /// Range in derived-buffer coordinates
    pub range: Range<usize>,
    pub style_key: String,
    /// Higher priorities paint on top
    pub priority: i32,
}

impl HighlightSpec {
    pub fn new(range: Range<usize>, style_key: impl Into<String>, priority: i32) -> Self {
        Self {
            range,
            style_key: style_key.into(),
            priority,
        }
    }
}

/// Side-effecting body of a command
///
/// Runs on the UI context inside a named undo step. `offset` is where the
/// trigger started, in host-buffer coordinates, after the trigger text has
/// been removed.
pub trait CommandAction: Send + Sync {
    fn execute(&self, offset: usize, file: &FileContext, editor: &mut Editor);
}

impl<F> CommandAction for F
where
    F: Fn(usize, &FileContext, &mut Editor) + Send + Sync,
{
    fn execute(&self, offset: usize, file: &FileContext, editor: &mut Editor) {
        self(offset, file, editor)
    }
}

/// One offered structural command
#[derive(Clone)]
pub struct CommandDescriptor {
    pub name: String,
    pub icon: Option<String>,
    /// Display tie-breaker; higher sorts first
    pub priority: Option<i32>,
    /// Ranges shown while the command is selected
    pub highlights: Vec<HighlightSpec>,
    action: Arc<dyn CommandAction>,
}

impl CommandDescriptor {
    pub fn new(name: impl Into<String>, action: impl CommandAction + 'static) -> Self {
        Self {
            name: name.into(),
            icon: None,
            priority: None,
            highlights: Vec::new(),
            action: Arc::new(action),
        }
    }

    /// Convenience constructor for closure-bodied commands
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(usize, &FileContext, &mut Editor) + Send + Sync + 'static,
    {
        Self::new(name, f)
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_highlight(mut self, highlight: HighlightSpec) -> Self {
        self.highlights.push(highlight);
        self
    }

    pub fn action(&self) -> Arc<dyn CommandAction> {
        Arc::clone(&self.action)
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("icon", &self.icon)
            .field("priority", &self.priority)
            .field("highlights", &self.highlights)
            .finish_non_exhaustive()
    }
}
