/// Additive offset from the 0-based round index to the factorized integer N.
pub const ROUND_OFFSET: u64 = 83;

/// Coherence score at or above which a round fires.
pub const FIRE_THRESHOLD: f64 = 0.5;

/// Upper clamp for the per-round coherence score.
pub const POLY_C_CEILING: f64 = 0.95;

/// Voltage increment per unit of coherence: delta_V = 0.08 * poly_c.
pub const DELTA_V_RATE: f64 = 0.08;

/// Starting voltage for a fresh session.
pub const INITIAL_V: f64 = 0.5;

/// Seed voltage when persisted state cannot be read.
pub const SEED_V: f64 = 7.259260;

/// Seed fire count when persisted state cannot be read.
pub const SEED_FIRE_COUNT: u32 = 35;

/// Coherence field grid dimension (GRID x GRID cells).
pub const GRID: usize = 32;

/// Number of samples in a collapse interference pattern.
pub const INTERFERENCE_SAMPLES: usize = 64;

/// Persisted spine retention cap: older entries beyond this are dropped.
pub const SPINE_PERSIST_CAP: usize = 200;

/// Spine tail handed to the candidate provider as conversation context.
pub const CONTEXT_WINDOW: usize = 8;

/// Per-round stride of the global wave phase in the stochastic collapse.
pub const ROUND_PHASE_STRIDE: f64 = 0.314;
