use serde::{Deserialize, Serialize};

use crate::constants::GRID;
use crate::round::RoundRecord;

/// Fixed 32x32 accumulator of round activity, values in [0, 1].
///
/// Consumed only by visualization, but the fold must be re-derivable
/// bit-for-bit from the round history: no hidden incremental-only state,
/// no randomness.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoherenceField {
    pub cells: [[f64; GRID]; GRID],
}

impl Default for CoherenceField {
    fn default() -> Self {
        Self::zero()
    }
}

impl CoherenceField {
    pub fn zero() -> Self {
        Self {
            cells: [[0.0; GRID]; GRID],
        }
    }

    /// Fold an entire round history into a fresh grid.
    pub fn fold(rounds: &[RoundRecord]) -> Self {
        let mut field = Self::zero();
        for record in rounds {
            field.splat(record);
        }
        field
    }

    /// Add one round's Gaussian-like splat.
    ///
    /// The record's plot position maps linearly onto the grid:
    /// `collapse_vector[0]` over [-5, 5] → x, `v` over [0, 10] → y, both
    /// clamped into bounds. Fire rounds splat wider (radius 3 vs 2) and at
    /// full strength; quiet rounds splat at `poly_c`. Out-of-bounds offsets
    /// are skipped, not wrapped. Cells saturate at 1.0.
    pub fn splat(&mut self, record: &RoundRecord) {
        let max = (GRID - 1) as f64;
        let cx = ((record.collapse_vector[0] + 5.0) / 10.0 * max)
            .round()
            .clamp(0.0, max) as i64;
        let cy = (record.v / 10.0 * max).round().clamp(0.0, max) as i64;

        let (strength, spread) = if record.fire {
            (1.0, 3i64)
        } else {
            (record.poly_c, 2i64)
        };

        for dy in -spread..=spread {
            for dx in -spread..=spread {
                let nx = cx + dx;
                let ny = cy + dy;
                if nx < 0 || nx >= GRID as i64 || ny < 0 || ny >= GRID as i64 {
                    continue;
                }
                let d2 = (dx * dx + dy * dy) as f64;
                let contribution = strength * (-d2 / (spread * spread) as f64).exp();
                let cell = &mut self.cells[ny as usize][nx as usize];
                *cell = (*cell + contribution).min(1.0);
            }
        }
    }

    /// Interference wash for the visualization consumer: each cell picks its
    /// pattern sample by column and modulates it by a row-phased sine, scaled
    /// down to a gentle ripple. Returns a new grid; `self` is untouched.
    pub fn wave_overlay(&self, pattern: &[f64], wave_phase: f64) -> Self {
        if pattern.is_empty() {
            return self.clone();
        }
        let mut out = self.clone();
        for y in 0..GRID {
            for x in 0..GRID {
                let idx = x * pattern.len() / GRID;
                let wave = pattern[idx] * (wave_phase + y as f64 * 0.3).sin() * 0.15;
                out.cells[y][x] = (self.cells[y][x] + wave).clamp(0.0, 1.0);
            }
        }
        out
    }

    /// Maximum cell value, for quick sanity displays.
    pub fn peak(&self) -> f64 {
        self.cells
            .iter()
            .flatten()
            .copied()
            .fold(0.0, f64::max)
    }
}
