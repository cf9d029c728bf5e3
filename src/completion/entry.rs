//! Popup entries wrapping command descriptors

use serde::Serialize;

use crate::commands::{CommandDescriptor, HighlightSpec};

/// Priority floor for commands that do not declare one
pub const DEFAULT_COMMAND_PRIORITY: i32 = -110;

/// Offset applied to declared priorities so commands sort below symbols
pub const COMMAND_PRIORITY_SHIFT: i32 = 100;

/// Maps a provider-declared priority to the popup priority
pub fn resolve_priority(declared: Option<i32>) -> i32 {
    declared.map_or(DEFAULT_COMMAND_PRIORITY, |p| p - COMMAND_PRIORITY_SHIFT)
}

/// A command as shown in the popup, with the metadata needed to decorate
/// the buffer and to remove the trigger on commit
#[derive(Debug, Clone)]
pub struct PopupEntry {
    pub descriptor: CommandDescriptor,
    /// Host-buffer offset where the trigger starts
    pub host_start_offset: usize,
    /// Configured suffix plus filter character
    pub trigger_suffix: String,
    /// Provider highlights translated into host coordinates
    pub highlights: Vec<HighlightSpec>,
    pub resolved_priority: i32,
}

impl PopupEntry {
    /// Wraps `descriptor`; `host_shift` translates derived offsets to host ones
    pub fn new(
        descriptor: CommandDescriptor,
        host_start_offset: usize,
        trigger_suffix: String,
        host_shift: usize,
    ) -> Self {
        let highlights = descriptor
            .highlights
            .iter()
            .cloned()
            .map(|mut h| {
                h.range = h.range.start + host_shift..h.range.end + host_shift;
                h
            })
            .collect();
        let resolved_priority = resolve_priority(descriptor.priority);
        Self {
            descriptor,
            host_start_offset,
            trigger_suffix,
            highlights,
            resolved_priority,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn icon(&self) -> Option<&str> {
        self.descriptor.icon.as_deref()
    }

    pub fn summary(&self) -> EntrySummary<'_> {
        EntrySummary {
            name: self.name(),
            icon: self.icon(),
            priority: self.resolved_priority,
            host_start_offset: self.host_start_offset,
        }
    }
}

/// Serializable view of an entry
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary<'a> {
    pub name: &'a str,
    pub icon: Option<&'a str>,
    pub priority: i32,
    pub host_start_offset: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{Editor, FileContext};

    fn noop(_: usize, _: &FileContext, _: &mut Editor) {}

    #[test]
    fn test_priority_floor() {
        assert_eq!(resolve_priority(None), -110);
        assert_eq!(resolve_priority(Some(10)), -90);
        assert_eq!(resolve_priority(Some(0)), -100);
    }

    #[test]
    fn test_highlight_is_shifted_to_host() {
        let descriptor = CommandDescriptor::from_fn("x", noop)
            .with_highlight(HighlightSpec::new(2..5, "s", 1));
        let entry = PopupEntry::new(descriptor, 25, ".".to_string(), 20);
        assert_eq!(entry.highlights[0].range, 22..25);
        assert_eq!(entry.resolved_priority, -110);
    }
}
