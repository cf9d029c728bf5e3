//! Ranking and sorting of popup items
//!
//! Trigger commands share the popup with ordinary completion items. Ordering
//! (in order of priority):
//! 1. Bucket - ordinary items first, trigger commands after (HIGHEST PRIORITY)
//! 2. Resolved priority - higher is better
//! 3. Re-ranker score (trigger commands only) - higher is better
//! 4. Original order - the sort is stable
//!
//! The re-ranker only breaks ties inside the trigger bucket at equal priority;
//! it can never move an item across buckets or past a different priority.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::entry::PopupEntry;

/// An item in the completion popup
#[derive(Debug, Clone)]
pub enum LookupItem {
    /// Ordinary completion item from outside this engine
    Symbol { label: String, priority: i32 },
    /// Trigger command
    Command(PopupEntry),
}

impl LookupItem {
    pub fn label(&self) -> &str {
        match self {
            LookupItem::Symbol { label, .. } => label,
            LookupItem::Command(entry) => entry.name(),
        }
    }

    fn bucket(&self) -> u8 {
        match self {
            LookupItem::Symbol { .. } => 0,
            LookupItem::Command(_) => 1,
        }
    }

    fn priority(&self) -> i32 {
        match self {
            LookupItem::Symbol { priority, .. } => *priority,
            LookupItem::Command(entry) => entry.resolved_priority,
        }
    }
}

/// Signals available to a re-ranker
#[derive(Debug, Clone, Copy)]
pub struct RerankContext {
    /// Host offset where the trigger starts
    pub trigger_start: usize,
    pub caret: usize,
}

/// Learned or heuristic scorer for trigger commands
pub trait Reranker: Send + Sync {
    fn score(&self, entry: &PopupEntry, ctx: &RerankContext) -> f64;

    /// Called when the user commits `name`
    fn record_selection(&self, _name: &str) {}
}

/// Prefers commands the user picked more often
#[derive(Debug, Default)]
pub struct UsageReranker {
    counts: RwLock<HashMap<String, u32>>,
}

impl UsageReranker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, name: &str) -> u32 {
        self.counts.read().get(name).copied().unwrap_or(0)
    }
}

impl Reranker for UsageReranker {
    fn score(&self, entry: &PopupEntry, _ctx: &RerankContext) -> f64 {
        f64::from(self.count(entry.name()))
    }

    fn record_selection(&self, name: &str) {
        *self.counts.write().entry(name.to_string()).or_insert(0) += 1;
    }
}

/// Criteria for ranking popup items
#[derive(Clone)]
pub struct RankingCriteria {
    pub reranker: Option<Arc<dyn Reranker>>,
    pub context: RerankContext,
}

impl RankingCriteria {
    pub fn new(context: RerankContext) -> Self {
        Self {
            reranker: None,
            context,
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }
}

/// Sorts popup items (best first)
///
/// # Arguments
/// * `items` - Ordinary items and trigger commands, in arrival order
/// * `criteria` - Ranking criteria
pub fn rank_items(items: Vec<LookupItem>, criteria: &RankingCriteria) -> Vec<LookupItem> {
    let scores: Vec<f64> = items.iter().map(|item| score_of(item, criteria)).collect();
    let mut indexed: Vec<(usize, LookupItem)> = items.into_iter().enumerate().collect();

    indexed.sort_by(|(ia, a), (ib, b)| {
        a.bucket()
            .cmp(&b.bucket())
            .then_with(|| b.priority().cmp(&a.priority()))
            .then_with(|| {
                scores[*ib]
                    .partial_cmp(&scores[*ia])
                    .unwrap_or(Ordering::Equal)
            })
    });

    indexed.into_iter().map(|(_, item)| item).collect()
}

/// Sorts trigger commands on their own
pub fn rank_commands(entries: Vec<PopupEntry>, criteria: &RankingCriteria) -> Vec<PopupEntry> {
    let items = entries.into_iter().map(LookupItem::Command).collect();
    rank_items(items, criteria)
        .into_iter()
        .filter_map(|item| match item {
            LookupItem::Command(entry) => Some(entry),
            LookupItem::Symbol { .. } => None,
        })
        .collect()
}

/// Re-ranker score; ordinary items always score zero
fn score_of(item: &LookupItem, criteria: &RankingCriteria) -> f64 {
    match (item, criteria.reranker.as_ref()) {
        (LookupItem::Command(entry), Some(reranker)) => {
            let score = reranker.score(entry, &criteria.context);
            if score.is_finite() { score } else { 0.0 }
        }
        _ => 0.0,
    }
}
