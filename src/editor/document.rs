//! Text buffer backing an editor
//!
//! Offsets throughout the crate are `char` indices into the rope, matching
//! `ropey`'s native indexing.

use std::ops::Range;

use ropey::Rope;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use super::injection::InjectedRegion;

/// Identity of the file a command runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContext {
    pub uri: Url,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("range {start}..{end} is outside the buffer (length {len})")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("inverted range {start}..{end}")]
    Inverted { start: usize, end: usize },
}

/// A text buffer with its identity and embedded-language layout.
#[derive(Debug, Clone)]
pub struct Document {
    uri: Url,
    language: String,
    text: Rope,
    /// Scratch buffers (consoles, previews) never get trigger completion.
    ephemeral: bool,
    injections: Vec<InjectedRegion>,
}

impl Document {
    pub fn new(uri: Url, language: impl Into<String>, text: &str) -> Self {
        Self {
            uri,
            language: language.into(),
            text: Rope::from_str(text),
            ephemeral: false,
            injections: Vec::new(),
        }
    }

    /// Creates a scratch document that is not backed by a real file.
    pub fn scratch(uri: Url, language: impl Into<String>, text: &str) -> Self {
        Self {
            ephemeral: true,
            ..Self::new(uri, language, text)
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn text(&self) -> &Rope {
        &self.text
    }

    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub fn file_context(&self) -> FileContext {
        FileContext {
            uri: self.uri.clone(),
            language: self.language.clone(),
        }
    }

    /// Registers an embedded-language fragment of this document.
    pub fn add_injection(&mut self, region: InjectedRegion) {
        self.injections.push(region);
        self.injections.sort_by_key(|r| r.host_range().start);
    }

    /// Returns the injected fragment whose content covers `offset`, if any.
    ///
    /// The end of a fragment counts as inside it so that a caret placed right
    /// after the last injected character still resolves to the fragment.
    pub fn injection_at(&self, offset: usize) -> Option<&InjectedRegion> {
        self.injections.iter().find(|r| r.contains_host(offset))
    }

    pub fn slice(&self, range: Range<usize>) -> Result<String, EditError> {
        self.check_range(&range)?;
        Ok(self.text.slice(range).to_string())
    }

    pub(crate) fn check_range(&self, range: &Range<usize>) -> Result<(), EditError> {
        if range.start > range.end {
            return Err(EditError::Inverted {
                start: range.start,
                end: range.end,
            });
        }
        if range.end > self.text.len_chars() {
            return Err(EditError::OutOfBounds {
                start: range.start,
                end: range.end,
                len: self.text.len_chars(),
            });
        }
        Ok(())
    }

    pub(crate) fn insert(&mut self, offset: usize, text: &str) -> Result<(), EditError> {
        self.check_range(&(offset..offset))?;
        self.text.insert(offset, text);
        self.shift_injections(offset, text.chars().count() as isize);
        Ok(())
    }

    pub(crate) fn remove(&mut self, range: Range<usize>) -> Result<String, EditError> {
        self.check_range(&range)?;
        let removed = self.text.slice(range.clone()).to_string();
        self.text.remove(range.clone());
        self.shift_injections(range.start, -((range.end - range.start) as isize));
        Ok(removed)
    }

    /// Keeps fragment host ranges in sync with edits made in the host buffer.
    fn shift_injections(&mut self, at: usize, delta: isize) {
        for region in &mut self.injections {
            region.apply_host_edit(at, delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new(Url::parse("file:///tmp/a.txt").unwrap(), "text", text)
    }

    #[test]
    fn test_remove_and_insert() {
        let mut d = doc("foo.bar.");
        assert_eq!(d.remove(7..8).unwrap(), ".");
        assert_eq!(d.text().to_string(), "foo.bar");
        d.insert(0, "(").unwrap();
        assert_eq!(d.text().to_string(), "(foo.bar");
    }

    #[test]
    fn test_out_of_bounds_is_rejected_without_mutation() {
        let mut d = doc("abc");
        assert!(matches!(d.remove(2..9), Err(EditError::OutOfBounds { .. })));
        assert!(matches!(d.remove(2..1), Err(EditError::Inverted { .. })));
        assert_eq!(d.text().to_string(), "abc");
    }

    #[test]
    fn test_scratch_documents_are_ephemeral() {
        let d = Document::scratch(Url::parse("scratch:///console").unwrap(), "text", "x");
        assert!(d.is_ephemeral());
        assert!(!doc("x").is_ephemeral());
    }

    #[test]
    fn test_injections_follow_host_edits() {
        let mut d = doc("say \"abc.\" now");
        d.add_injection(InjectedRegion::new("text", 5..9));
        assert!(d.injection_at(7).is_some());
        d.insert(0, ">>").unwrap();
        let region = d.injection_at(9).unwrap();
        assert_eq!(region.host_range(), 7..11);
    }
}
