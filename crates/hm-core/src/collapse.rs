//! Candidate scoring and collapse selection.
//!
//! N candidate response texts become weighted states; exactly one wins.
//! The canonical policy is the deterministic top-score sort. The stochastic
//! weighted draw survives as [`collapse_weighted`] with an injectable RNG so
//! tests stay reproducible. Both policies emit the same artifact set:
//! interference pattern, entanglement map, decoherence count.

use std::collections::HashMap;
use std::f64::consts::{PI, TAU};
use std::time::Instant;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{INTERFERENCE_SAMPLES, ROUND_PHASE_STRIDE};
use crate::factor::is_prime;

/// Response content substituted when the candidate source yields nothing.
pub const PLACEHOLDER_CONTENT: &str = "signal received. topology processing...";

/// One of N simultaneous response candidates evaluated before collapse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateState {
    pub id: String,
    pub content: String,
    pub amplitude: f64,
    pub phase: f64,
    pub coherence_score: f64,
    /// True only on the eventual winner.
    pub collapsed: bool,
}

/// Output of one collapse operation. Transient: scoped to a single call,
/// never persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollapseResult {
    pub winner: CandidateState,
    /// All candidates, ranked by selection weight, highest first.
    pub superposition: Vec<CandidateState>,
    /// Fixed 64-sample interference pattern, values in [-1, 1].
    pub interference_pattern: Vec<f64>,
    /// Wall-clock duration of the operation in milliseconds. Informational.
    pub collapse_time_ms: f64,
    /// Count of non-winning candidates.
    pub decoherence_events: usize,
    /// Candidate id → entanglement with the winner, in [0, 1]; winner is 1.0.
    pub entanglement_map: HashMap<String, f64>,
}

/// Assign each candidate an amplitude, phase, and coherence score.
///
/// Phases spread evenly over the circle. Amplitude carries an explicit
/// ordering bias, `(1/√N) * (1 + 0.1*(N-i-1)/N)`: the primary candidate is
/// marginally favored over the probes that follow it. The bias is part of
/// the numeric contract and is preserved here.
///
/// An empty candidate list is defaulted to a single placeholder state so a
/// collapse can never produce an undefined winner.
pub fn build_superposition(candidates: &[String], poly_c: f64) -> Vec<CandidateState> {
    if candidates.is_empty() {
        return build_superposition(&[PLACEHOLDER_CONTENT.to_string()], poly_c);
    }

    let n = candidates.len() as f64;
    candidates
        .iter()
        .enumerate()
        .map(|(i, content)| {
            let phase = TAU * i as f64 / n;
            let amplitude = (1.0 / n.sqrt()) * (1.0 + 0.1 * (n - i as f64 - 1.0) / n);
            let word_count = content.split_whitespace().count() as f64;
            let coherence_score = (word_count / 50.0 * 0.4 + poly_c * 0.6).clamp(0.0, 1.0);
            CandidateState {
                id: format!("state_{i}"),
                content: content.clone(),
                amplitude,
                phase,
                coherence_score,
                collapsed: false,
            }
        })
        .collect()
}

/// Deterministic selection weight for ranking.
fn selection_score(s: &CandidateState, omega_k: u32, v: f64) -> f64 {
    let topology_fit = 1.0 + 0.15 * omega_k as f64 * s.coherence_score;
    let v_resonance = (v * s.phase).sin() * 0.1 + 0.9;
    s.amplitude * s.amplitude * s.coherence_score * topology_fit * v_resonance
}

/// Canonical deterministic collapse: rank by selection score, take the top.
pub fn collapse(
    states: Vec<CandidateState>,
    poly_c: f64,
    omega_k: u32,
    v: f64,
) -> CollapseResult {
    let start = Instant::now();
    let states = if states.is_empty() {
        build_superposition(&[], poly_c)
    } else {
        states
    };

    let mut ranked: Vec<(f64, CandidateState)> = states
        .iter()
        .map(|s| (selection_score(s, omega_k, v), s.clone()))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    finish(start, states, ranked)
}

/// Global wave phase the stochastic draw interferes against.
pub fn wave_phase_for(v: f64, round: u64) -> f64 {
    v * TAU + round as f64 * ROUND_PHASE_STRIDE
}

/// Stochastic collapse variant: weighted random draw.
///
/// Each candidate's selection probability is proportional to a non-negative
/// interference amplitude against the global wave phase. On prime rounds a
/// coherence correction boosts coherent states and damps incoherent ones.
/// The RNG is injected; a seeded RNG makes the draw reproducible.
pub fn collapse_weighted<R: Rng + ?Sized>(
    states: Vec<CandidateState>,
    poly_c: f64,
    round: u64,
    v: f64,
    rng: &mut R,
) -> CollapseResult {
    let start = Instant::now();
    let states = if states.is_empty() {
        build_superposition(&[], poly_c)
    } else {
        states
    };

    let global = wave_phase_for(v, round);
    let prime_round = is_prime(round);

    let mut ranked: Vec<(f64, CandidateState)> = states
        .iter()
        .map(|s| {
            let correction = if prime_round {
                if s.coherence_score > 0.4 { 1.15 } else { 0.75 }
            } else {
                1.0
            };
            let amplitude = (s.amplitude * correction).min(1.0);
            let weight = (amplitude * (0.5 + 0.5 * (s.phase - global).cos())).max(0.0);
            (weight, s.clone())
        })
        .collect();

    let total: f64 = ranked.iter().map(|(w, _)| w).sum();
    let mut cursor = rng.random::<f64>() * total;
    let mut chosen = 0;
    for (i, (w, _)) in ranked.iter().enumerate() {
        cursor -= w;
        if cursor <= 0.0 {
            chosen = i;
            break;
        }
    }

    // Promote the drawn state to the head so ranking reflects the outcome,
    // then order the rest by weight.
    let drawn = ranked.remove(chosen);
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.insert(0, drawn);

    finish(start, states, ranked)
}

/// Shared artifact construction: winner, pattern, map, timings.
fn finish(
    start: Instant,
    states: Vec<CandidateState>,
    ranked: Vec<(f64, CandidateState)>,
) -> CollapseResult {
    let mut winner = ranked[0].1.clone();
    winner.collapsed = true;

    let interference_pattern = interference_pattern(&states);
    let entanglement_map = entanglement_map(&states, &winner);
    let decoherence_events = states.len() - 1;
    let superposition: Vec<CandidateState> = ranked.into_iter().map(|(_, s)| s).collect();

    CollapseResult {
        winner,
        superposition,
        interference_pattern,
        collapse_time_ms: start.elapsed().as_secs_f64() * 1e3,
        decoherence_events,
        entanglement_map,
    }
}

/// 64-sample interference pattern: each sample integrates
/// `amplitude * cos(t*phase + coherence*π)` over all states, squashed
/// through tanh into [-1, 1].
fn interference_pattern(states: &[CandidateState]) -> Vec<f64> {
    let mut pattern = vec![0.0; INTERFERENCE_SAMPLES];
    for (x, sample) in pattern.iter_mut().enumerate() {
        let t = TAU * x as f64 / INTERFERENCE_SAMPLES as f64;
        let sum: f64 = states
            .iter()
            .map(|s| s.amplitude * (t * s.phase + s.coherence_score * PI).cos())
            .sum();
        *sample = sum.tanh();
    }
    pattern
}

/// Winner maps to 1.0; everyone else decays with phase distance from the
/// winner, weighted by their own coherence.
fn entanglement_map(states: &[CandidateState], winner: &CandidateState) -> HashMap<String, f64> {
    states
        .iter()
        .map(|s| {
            let value = if s.id == winner.id {
                1.0
            } else {
                let phase_diff = (s.phase - winner.phase).abs() % TAU;
                (1.0 - phase_diff / PI).max(0.0) * s.coherence_score
            };
            (s.id.clone(), value)
        })
        .collect()
}
