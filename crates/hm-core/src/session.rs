//! Per-conversation session state.
//!
//! One `Session` owns everything that outlives a single turn: the voltage
//! accumulator, fire count, wave phase, total round counter, the spine, and
//! the in-memory round history. There is no process-wide instance; whoever
//! serves a conversation constructs (or resumes) a session and passes it
//! where needed. Concurrent sessions are fully independent.

use std::f64::consts::{PI, TAU};

use rand::Rng;
use uuid::Uuid;

use crate::collapse::{CandidateState, CollapseResult, build_superposition, collapse, collapse_weighted};
use crate::constants::INITIAL_V;
use crate::field::CoherenceField;
use crate::round::{RoundRecord, score_round};
use crate::spine::{Role, Spine, SpineEntry};
use crate::time::now_iso8601;

/// Everything a single turn produces for downstream consumers.
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub record: RoundRecord,
    /// The winning candidate's content.
    pub response: String,
    pub collapse: CollapseResult,
    /// Field folded from the full round history including this turn.
    pub field: CoherenceField,
    /// Wave phase after this turn.
    pub wave_phase: f64,
}

pub struct Session {
    pub id: Uuid,
    rounds: Vec<RoundRecord>,
    spine: Spine,
    v: f64,
    fire_count: u32,
    wave_phase: f64,
    /// Lifetime round counter. Survives spine retention truncation, so round
    /// numbers stay strictly increasing even after old entries are dropped.
    total_rounds: u64,
}

impl Session {
    /// Fresh session: V starts at 0.5, everything else empty.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            rounds: Vec::new(),
            spine: Spine::new(),
            v: INITIAL_V,
            fire_count: 0,
            wave_phase: 0.0,
            total_rounds: 0,
        }
    }

    /// Rebuild a session from persisted state. The round history comes back
    /// from the user-role entries of the loaded spine.
    pub fn resume(
        id: Uuid,
        v: f64,
        fire_count: u32,
        wave_phase: f64,
        total_rounds: u64,
        spine: Spine,
    ) -> Self {
        let rounds = spine.user_records();
        Self {
            id,
            rounds,
            spine,
            v,
            fire_count,
            wave_phase,
            total_rounds,
        }
    }

    pub fn v(&self) -> f64 {
        self.v
    }

    pub fn fire_count(&self) -> u32 {
        self.fire_count
    }

    pub fn wave_phase(&self) -> f64 {
        self.wave_phase
    }

    pub fn total_rounds(&self) -> u64 {
        self.total_rounds
    }

    pub fn spine(&self) -> &Spine {
        &self.spine
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    /// Score the upcoming turn without committing anything. Pure with respect
    /// to session state; `advance` recomputes the identical record.
    pub fn peek_round(&self, user_text: &str) -> RoundRecord {
        score_round(self.total_rounds, user_text, self.v, &self.rounds)
    }

    /// Deterministic fallback response for a failed candidate boundary,
    /// embedding the would-be round's voltage and fire state.
    pub fn fallback_response(record: &RoundRecord) -> String {
        format!(
            "V={:.6} | {} | round {}",
            record.v,
            if record.fire { "FIRE" } else { "stable" },
            record.round
        )
    }

    /// Run one full turn under the canonical deterministic collapse policy.
    pub fn advance(&mut self, user_text: &str, candidates: &[String]) -> TurnOutcome {
        let record = self.peek_round(user_text);
        let states = build_superposition(candidates, record.poly_c);
        let result = collapse(states, record.poly_c, record.omega_k, record.v);
        self.commit(user_text, record, result)
    }

    /// Run one full turn under the stochastic weighted-draw policy.
    pub fn advance_with_rng<R: Rng + ?Sized>(
        &mut self,
        user_text: &str,
        candidates: &[String],
        rng: &mut R,
    ) -> TurnOutcome {
        let record = self.peek_round(user_text);
        let states: Vec<CandidateState> = build_superposition(candidates, record.poly_c);
        let result = collapse_weighted(states, record.poly_c, record.round, record.v, rng);
        self.commit(user_text, record, result)
    }

    /// Apply a scored round and its collapse to session state: accumulate V,
    /// count the fire, advance the wave phase, append both ledger entries,
    /// and refold the field.
    fn commit(&mut self, user_text: &str, record: RoundRecord, result: CollapseResult) -> TurnOutcome {
        self.total_rounds += 1;
        self.v = record.v;
        if record.fire {
            self.fire_count += 1;
        }
        self.wave_phase = (self.wave_phase + record.poly_c * PI).rem_euclid(TAU);

        let timestamp = now_iso8601();
        self.spine.append(SpineEntry {
            role: Role::User,
            content: user_text.to_string(),
            timestamp: timestamp.clone(),
            record: record.clone(),
        });
        self.spine.append(SpineEntry {
            role: Role::Assistant,
            content: result.winner.content.clone(),
            timestamp,
            record: record.clone(),
        });
        self.rounds.push(record.clone());

        let field = CoherenceField::fold(&self.rounds);
        TurnOutcome {
            response: result.winner.content.clone(),
            record,
            collapse: result,
            field,
            wave_phase: self.wave_phase,
        }
    }

    /// Refold the coherence field from the full round history.
    pub fn fold_field(&self) -> CoherenceField {
        CoherenceField::fold(&self.rounds)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
