//! Embedded-language fragments of a host document
//!
//! An injected region is a contiguous span of a host buffer whose content is
//! treated as a separate document in another language (a query string inside a
//! source file, a script inside markup). The fragment has its own offset space
//! starting at zero; this module translates between the two.

use std::ops::Range;

use ropey::Rope;
use tracing::trace;

/// A fragment of a host buffer with its own language and offset space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedRegion {
    /// Language of the fragment content
    language: String,
    /// Span of the fragment content in host coordinates
    host_range: Range<usize>,
}

impl InjectedRegion {
    /// Creates a region covering `host_range` of the host buffer.
    ///
    /// # Arguments
    /// * `language` - Language identifier of the injected content
    /// * `host_range` - Char range of the content (delimiters excluded)
    pub fn new(language: impl Into<String>, host_range: Range<usize>) -> Self {
        Self {
            language: language.into(),
            host_range,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn host_range(&self) -> Range<usize> {
        self.host_range.clone()
    }

    pub fn len(&self) -> usize {
        self.host_range.end - self.host_range.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a host offset falls within the fragment (end inclusive)
    pub fn contains_host(&self, offset: usize) -> bool {
        self.host_range.start <= offset && offset <= self.host_range.end
    }

    /// Maps a fragment-local offset to host coordinates
    pub fn to_host(&self, local: usize) -> usize {
        self.host_range.start + local.min(self.len())
    }

    /// Maps a host offset into the fragment
    ///
    /// # Returns
    /// Local offset, or `None` if the host offset lies outside the fragment
    pub fn from_host(&self, offset: usize) -> Option<usize> {
        if !self.contains_host(offset) {
            return None;
        }
        let local = offset - self.host_range.start;
        trace!(
            "Mapped host offset {} -> fragment offset {} (fragment {}..{})",
            offset, local, self.host_range.start, self.host_range.end
        );
        Some(local)
    }

    /// Extracts the fragment's text from the host buffer
    pub fn text_in(&self, host: &Rope) -> Rope {
        let end = self.host_range.end.min(host.len_chars());
        let start = self.host_range.start.min(end);
        Rope::from(host.slice(start..end))
    }

    /// Updates the host span after the host buffer changed
    ///
    /// `delta` is positive for an insertion of `delta` chars at `at` and
    /// negative for a removal of `-delta` chars starting at `at`.
    pub(crate) fn apply_host_edit(&mut self, at: usize, delta: isize) {
        if delta >= 0 {
            let d = delta as usize;
            if at < self.host_range.start {
                self.host_range.start += d;
                self.host_range.end += d;
            } else if at <= self.host_range.end {
                self.host_range.end += d;
            }
        } else {
            let removed = at..at + delta.unsigned_abs();
            let map = |x: usize| {
                if x <= removed.start {
                    x
                } else if x >= removed.end {
                    x - (removed.end - removed.start)
                } else {
                    removed.start
                }
            };
            self.host_range = map(self.host_range.start)..map(self.host_range.end);
        }
    }
}
