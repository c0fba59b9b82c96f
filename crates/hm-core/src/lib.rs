//! Hyperloop cognition and collapse engine.
//!
//! Scores each conversational turn into a bounded coherence value via prime
//! factorization of a round-derived integer, selects one winner from N
//! candidate responses (deterministic rank or weighted draw), accumulates a
//! monotone voltage `V`, folds round activity into a 32x32 coherence field,
//! and keeps the append-only spine ledger behind it all.
//!
//! Zero I/O — pure math engine with no opinions about transport or
//! persistence.

pub mod collapse;
pub mod constants;
pub mod factor;
pub mod field;
pub mod lexical;
pub mod round;
pub mod serde_compat;
pub mod session;
pub mod spine;
pub mod time;

pub use collapse::{
    CandidateState, CollapseResult, PLACEHOLDER_CONTENT, build_superposition, collapse,
    collapse_weighted, wave_phase_for,
};
pub use constants::{
    CONTEXT_WINDOW, FIRE_THRESHOLD, GRID, INITIAL_V, INTERFERENCE_SAMPLES, POLY_C_CEILING,
    ROUND_OFFSET, SEED_FIRE_COUNT, SEED_V, SPINE_PERSIST_CAP,
};
pub use factor::{Factorization, factorize, is_prime};
pub use field::CoherenceField;
pub use lexical::{jitter, message_digest, semantic_depth, token_count};
pub use round::{RoundRecord, round6, score_round};
pub use serde_compat::{CURRENT_VERSION, export_json, import_json};
pub use session::{Session, TurnOutcome};
pub use spine::{Role, Spine, SpineEntry};
pub use time::{now_iso8601, now_unix_secs, unix_to_iso8601};
