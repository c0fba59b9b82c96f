//! JSON serde for the session snapshot wire format.
//!
//! The wire format uses camelCase field names (except the historical
//! `V_accumulated`, `omega_k`, `tau`, and `poly_c` spellings) and tolerant
//! defaults: a snapshot missing optional fields still imports, seeded with
//! the same defaults the persistence boundary uses.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::round::RoundRecord;
use crate::session::Session;
use crate::spine::{Role, Spine, SpineEntry};
use crate::time::now_iso8601;

pub const CURRENT_VERSION: &str = "1.0.0";

// --- Wire format types ---

#[derive(Serialize, Deserialize, Debug)]
pub struct WireSnapshot {
    pub version: String,
    #[serde(rename = "sessionId", default)]
    pub session_id: String,
    #[serde(rename = "totalRounds", default)]
    pub total_rounds: u64,
    #[serde(rename = "V_accumulated", default)]
    pub v_accumulated: f64,
    #[serde(rename = "fireCount", default)]
    pub fire_count: u32,
    #[serde(rename = "wavePhase", default)]
    pub wave_phase: f64,
    #[serde(rename = "lastUpdated", default)]
    pub last_updated: String,
    #[serde(default)]
    pub spine: Vec<WireEntry>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WireEntry {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
    pub cognition: WireCognition,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WireCognition {
    pub round: u64,
    #[serde(rename = "messageDigest", default)]
    pub message_digest: u32,
    #[serde(rename = "tokenCount", default)]
    pub token_count: usize,
    #[serde(rename = "semanticDepth", default)]
    pub semantic_depth: f64,
    pub omega_k: u32,
    pub tau: u64,
    #[serde(default)]
    pub topo: f64,
    pub poly_c: f64,
    pub fire: bool,
    #[serde(rename = "deltaV", default)]
    pub delta_v: f64,
    #[serde(rename = "V")]
    pub v: f64,
    #[serde(rename = "collapseVector", default)]
    pub collapse_vector: [f64; 3],
    #[serde(rename = "entanglementStrength", default)]
    pub entanglement_strength: f64,
}

// --- Conversion: Wire ↔ Domain ---

impl WireSnapshot {
    pub fn from_session(session: &Session) -> Self {
        WireSnapshot {
            version: CURRENT_VERSION.to_string(),
            session_id: session.id.to_string(),
            total_rounds: session.total_rounds(),
            v_accumulated: session.v(),
            fire_count: session.fire_count(),
            wave_phase: session.wave_phase(),
            last_updated: now_iso8601(),
            spine: session
                .spine()
                .persisted_view()
                .iter()
                .map(entry_to_wire)
                .collect(),
        }
    }

    pub fn into_session(self) -> Session {
        let id = Uuid::parse_str(&self.session_id).unwrap_or_else(|_| Uuid::new_v4());
        let entries: Vec<SpineEntry> = self.spine.into_iter().map(wire_to_entry).collect();
        Session::resume(
            id,
            self.v_accumulated,
            self.fire_count,
            self.wave_phase,
            self.total_rounds,
            Spine::from_entries(entries),
        )
    }
}

fn entry_to_wire(entry: &SpineEntry) -> WireEntry {
    let r = &entry.record;
    WireEntry {
        role: entry.role.as_str().to_string(),
        content: entry.content.clone(),
        timestamp: entry.timestamp.clone(),
        cognition: WireCognition {
            round: r.round,
            message_digest: r.message_digest,
            token_count: r.token_count,
            semantic_depth: r.semantic_depth,
            omega_k: r.omega_k,
            tau: r.tau,
            topo: r.topo,
            poly_c: r.poly_c,
            fire: r.fire,
            delta_v: r.delta_v,
            v: r.v,
            collapse_vector: r.collapse_vector,
            entanglement_strength: r.entanglement_strength,
        },
    }
}

fn wire_to_entry(wire: WireEntry) -> SpineEntry {
    let c = wire.cognition;
    SpineEntry {
        role: Role::from_str_lossy(&wire.role),
        content: wire.content,
        timestamp: wire.timestamp,
        record: RoundRecord {
            round: c.round,
            message_digest: c.message_digest,
            token_count: c.token_count,
            semantic_depth: c.semantic_depth,
            omega_k: c.omega_k,
            tau: c.tau,
            topo: c.topo,
            poly_c: c.poly_c,
            fire: c.fire,
            delta_v: c.delta_v,
            v: c.v,
            collapse_vector: c.collapse_vector,
            entanglement_strength: c.entanglement_strength,
        },
    }
}

/// Deserialize a snapshot JSON string into a session.
pub fn import_json(json: &str) -> Result<Session, serde_json::Error> {
    let wire: WireSnapshot = serde_json::from_str(json)?;
    Ok(wire.into_session())
}

/// Serialize a session to snapshot JSON.
pub fn export_json(session: &Session) -> Result<String, serde_json::Error> {
    let wire = WireSnapshot::from_session(session);
    serde_json::to_string_pretty(&wire)
}
