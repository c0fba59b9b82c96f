//! The spine: an append-only, order-preserving ledger of turns.
//!
//! Append is the only mutation. Nothing is edited or reordered in place;
//! a correction is a new appended entry. The in-memory spine is unbounded —
//! retention caps apply to the *views*: the persisted view keeps the most
//! recent 200 entries, the provider context window keeps a tail of 8. The
//! two policies are independent and must not be conflated.

use serde::{Deserialize, Serialize};

use crate::constants::{CONTEXT_WINDOW, SPINE_PERSIST_CAP};
use crate::round::RoundRecord;

/// Who produced a spine entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "assistant" => Role::Assistant,
            _ => Role::User,
        }
    }
}

/// One ledger entry. A user turn and its paired assistant turn share the
/// same `RoundRecord`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpineEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    pub record: RoundRecord,
}

/// Append-only turn ledger.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Spine {
    entries: Vec<SpineEntry>,
}

impl Spine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<SpineEntry>) -> Self {
        Self { entries }
    }

    /// Append one entry. Round numbers must be non-decreasing across the
    /// sequence; the session constructs them that way by design.
    pub fn append(&mut self, entry: SpineEntry) {
        debug_assert!(
            self.entries
                .last()
                .is_none_or(|last| entry.record.round >= last.record.round),
            "spine rounds must be non-decreasing"
        );
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SpineEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&SpineEntry> {
        self.entries.last()
    }

    /// The most recent `n` entries, in original relative order.
    pub fn tail(&self, n: usize) -> &[SpineEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// What the persistence layer stores: at most the most recent 200.
    pub fn persisted_view(&self) -> &[SpineEntry] {
        self.tail(SPINE_PERSIST_CAP)
    }

    /// The slice handed to the candidate provider as conversation context.
    pub fn context_window(&self) -> &[SpineEntry] {
        self.tail(CONTEXT_WINDOW)
    }

    /// Round records of user turns, oldest first — the session's round
    /// history as reconstructable from the ledger.
    pub fn user_records(&self) -> Vec<RoundRecord> {
        self.entries
            .iter()
            .filter(|e| e.role == Role::User)
            .map(|e| e.record.clone())
            .collect()
    }
}
