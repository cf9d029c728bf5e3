//! Trigger-completion sessions: coordination, ranking, commit and decorations

pub mod context;
pub mod decoration;
pub mod engine;
pub mod entry;
pub mod hint;
pub mod insertion;
pub mod ranking;
pub mod session;

pub use context::{CompletionKind, CompletionRequest, CompletionTarget, IndexingState, Rejection};
pub use decoration::{DecorationState, PopupBehavior, PromptLayout, PROMPT_STYLE};
pub use engine::{collect_commands, Cancelled, CommandCompletionEngine, PreparedSession};
pub use entry::{resolve_priority, EntrySummary, PopupEntry, DEFAULT_COMMAND_PRIORITY};
pub use hint::{HintStore, HintStoreError, JsonHintStore, UsageHintCounter, DEFAULT_HINT_THRESHOLD, HINT_TEXT};
pub use insertion::{commit_entry, CommitError, CommitTarget, REMOVE_TRIGGER_STEP};
pub use ranking::{rank_commands, rank_items, LookupItem, RankingCriteria, RerankContext, Reranker, UsageReranker};
pub use session::{CommandSession, KeystrokeOutcome, SessionPhase};
