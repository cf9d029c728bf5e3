//! Backward scan for a trigger suffix before the caret
//!
//! Scanning runs in two phases:
//! 1. **Immediate**: the longest prefix of the suffix that ends exactly at the
//!    caret (`foo.|`, `foo..|`).
//! 2. **Recovery**: when the user kept typing a filter pattern after the
//!    trigger (`foo.ren|`), walk back at most [`RECOVERY_WINDOW`] characters
//!    over alphanumerics and spaces looking for the suffix.
//!
//! The scan is pure and never panics for any offset.

use ropey::Rope;
use serde::Serialize;

/// Maximum distance (in chars) the recovery phase walks back from the caret
pub const RECOVERY_WINDOW: usize = 30;

/// How much of the configured suffix was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchKind {
    /// Only the first character of a multi-character suffix (mid-typing)
    PartialSuffix,
    /// The entire suffix
    FullSuffix,
}

/// A trigger found before the caret
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerMatch {
    pub kind: MatchKind,
    /// The suffix characters that matched
    pub matched_text: String,
    /// Filter text typed between the trigger and the caret
    pub preceding_pattern: String,
}

impl TriggerMatch {
    fn new(kind: MatchKind, matched_text: String, preceding_pattern: String) -> Self {
        Self {
            kind,
            matched_text,
            preceding_pattern,
        }
    }

    /// Chars from the start of the trigger to the caret
    pub fn span_len(&self) -> usize {
        self.matched_text.chars().count() + self.preceding_pattern.chars().count()
    }

    pub fn is_full(&self) -> bool {
        self.kind == MatchKind::FullSuffix
    }
}

/// Finds the trigger suffix before `offset`
///
/// # Arguments
/// * `text` - Buffer to scan
/// * `offset` - Caret position (char index)
/// * `suffix` - Configured trigger suffix
///
/// # Returns
/// The match, or `None` if no trigger precedes the caret
pub fn scan(text: &Rope, offset: usize, suffix: &str) -> Option<TriggerMatch> {
    let suffix: Vec<char> = suffix.chars().collect();
    if suffix.is_empty() || offset == 0 || offset > text.len_chars() {
        return None;
    }

    immediate_match(text, offset, &suffix).or_else(|| recover(text, offset, &suffix))
}

fn immediate_match(text: &Rope, offset: usize, suffix: &[char]) -> Option<TriggerMatch> {
    (1..=suffix.len().min(offset))
        .rev()
        .find(|&k| (0..k).all(|i| text.char(offset - k + i) == suffix[i]))
        .map(|k| {
            let kind = classify(k, suffix.len());
            TriggerMatch::new(kind, suffix[..k].iter().collect(), String::new())
        })
}

fn recover(text: &Rope, offset: usize, suffix: &[char]) -> Option<TriggerMatch> {
    let first = suffix[0];
    let palindromic = suffix.len() == 2 && suffix[0] == suffix[1];

    for distance in 1..=RECOVERY_WINDOW.min(offset) {
        let pos = offset - distance;
        let c = text.char(pos);

        if !c.is_alphanumeric() && !suffix.contains(&c) && c != ' ' {
            return None;
        }

        // A full window beats a first-character match at the same distance.
        if window_matches(text, pos, offset, suffix) {
            let pattern_start = pos + suffix.len();
            return Some(TriggerMatch::new(
                MatchKind::FullSuffix,
                suffix.iter().collect(),
                text.slice(pattern_start..offset).to_string(),
            ));
        }

        if c == first {
            let pattern = text.slice(pos + 1..offset).to_string();
            if palindromic && pos > 0 && text.char(pos - 1) == first {
                return Some(TriggerMatch::new(
                    MatchKind::FullSuffix,
                    suffix.iter().collect(),
                    pattern,
                ));
            }
            return Some(TriggerMatch::new(
                classify(1, suffix.len()),
                first.to_string(),
                pattern,
            ));
        }

        if suffix.contains(&c) {
            return None;
        }
    }

    None
}

fn window_matches(text: &Rope, pos: usize, offset: usize, suffix: &[char]) -> bool {
    pos + suffix.len() <= offset
        && suffix
            .iter()
            .enumerate()
            .all(|(i, &s)| text.char(pos + i) == s)
}

fn classify(consumed: usize, suffix_len: usize) -> MatchKind {
    if consumed == suffix_len {
        MatchKind::FullSuffix
    } else {
        MatchKind::PartialSuffix
    }
}
