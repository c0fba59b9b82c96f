use std::path::Path;

use rusqlite::{Connection, Transaction, params};
use uuid::Uuid;

use hm_core::{
    Role, RoundRecord, SEED_FIRE_COUNT, SEED_V, Session, Spine, SpineEntry, now_iso8601,
};

use crate::error::{Result, StoreError};
use crate::schema;

/// SQLite-backed store for session state and the spine ledger.
///
/// The spine table is append-only from the engine's point of view; the only
/// deletion is the retention sweep that drops rows beyond the 200 most
/// recent per session.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM metadata WHERE key = ?1")?;
        let result = stmt.query_row([key], |row| row.get(0)).ok();
        Ok(result)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Save ---

    /// Full rewrite of one session: stats row plus the persisted spine view.
    pub fn save_session(&self, session: &Session) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        upsert_session_on(&tx, session)?;
        tx.execute(
            "DELETE FROM spine WHERE session_id = ?1",
            [session.id.to_string()],
        )?;
        for entry in session.spine().persisted_view() {
            insert_entry_on(&tx, session.id, entry)?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Targeted append after one turn: upsert stats, insert the turn's two
    /// ledger entries, sweep retention. No full rewrite.
    pub fn record_turn(&self, session: &Session) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        upsert_session_on(&tx, session)?;
        for entry in session.spine().tail(2) {
            insert_entry_on(&tx, session.id, entry)?;
        }
        enforce_retention_on(&tx, session.id)?;

        tx.commit()?;
        Ok(())
    }

    // --- Load ---

    /// Load a session if its stats row exists.
    pub fn load_session(&self, id: Uuid) -> Result<Option<Session>> {
        let id_str = id.to_string();
        let stats = self
            .conn
            .query_row(
                "SELECT v, fire_count, wave_phase, total_rounds FROM sessions WHERE id = ?1",
                [&id_str],
                |row| {
                    Ok((
                        row.get::<_, f64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .ok();

        let Some((v, fire_count, wave_phase, total_rounds)) = stats else {
            return Ok(None);
        };

        let spine = self.load_spine(&id_str)?;
        Ok(Some(Session::resume(
            id,
            v,
            fire_count as u32,
            wave_phase,
            total_rounds as u64,
            spine,
        )))
    }

    /// Boundary read with safe defaults: any failure or absence yields the
    /// seeded session rather than an error. The engine's invariants hold on
    /// the fallback path exactly as on the happy path.
    pub fn load_or_seed(&self, id: Uuid) -> Session {
        match self.load_session(id) {
            Ok(Some(session)) => session,
            Ok(None) => Session::resume(id, SEED_V, SEED_FIRE_COUNT, 0.0, 0, Spine::new()),
            Err(e) => {
                tracing::warn!("session read failed, seeding defaults: {e}");
                Session::resume(id, SEED_V, SEED_FIRE_COUNT, 0.0, 0, Spine::new())
            }
        }
    }

    fn load_spine(&self, session_id: &str) -> Result<Spine> {
        let mut stmt = self.conn.prepare(
            "SELECT role, content, timestamp, round, message_digest, token_count,
                    semantic_depth, omega_k, tau, topo, poly_c, fire, delta_v, v,
                    cv_x, cv_y, cv_z, entanglement
             FROM spine WHERE session_id = ?1 ORDER BY id",
        )?;

        let entries = stmt
            .query_map([session_id], |row| {
                let role: String = row.get(0)?;
                let content: String = row.get(1)?;
                let timestamp: String = row.get(2)?;
                let record = RoundRecord {
                    round: row.get::<_, i64>(3)? as u64,
                    message_digest: row.get::<_, i64>(4)? as u32,
                    token_count: row.get::<_, i64>(5)? as usize,
                    semantic_depth: row.get(6)?,
                    omega_k: row.get::<_, i64>(7)? as u32,
                    tau: row.get::<_, i64>(8)? as u64,
                    topo: row.get(9)?,
                    poly_c: row.get(10)?,
                    fire: row.get::<_, i64>(11)? != 0,
                    delta_v: row.get(12)?,
                    v: row.get(13)?,
                    collapse_vector: [row.get(14)?, row.get(15)?, row.get(16)?],
                    entanglement_strength: row.get(17)?,
                };
                Ok(SpineEntry {
                    role: Role::from_str_lossy(&role),
                    content,
                    timestamp,
                    record,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Spine::from_entries(entries))
    }

    // --- Queries ---

    pub fn session_ids(&self) -> Result<Vec<Uuid>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM sessions ORDER BY last_updated")?;

        stmt.query_map([], |row| row.get::<_, String>(0))?
            .map(|r| {
                let id_str = r?;
                parse_uuid(&id_str)
            })
            .collect()
    }

    pub fn spine_len(&self, id: Uuid) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM spine WHERE session_id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Flush the WAL into the main database file.
    pub fn checkpoint_truncate(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

fn upsert_session_on(tx: &Transaction<'_>, session: &Session) -> Result<()> {
    tx.execute(
        "INSERT INTO sessions (id, v, fire_count, wave_phase, total_rounds, last_updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            v = excluded.v,
            fire_count = excluded.fire_count,
            wave_phase = excluded.wave_phase,
            total_rounds = excluded.total_rounds,
            last_updated = excluded.last_updated",
        params![
            session.id.to_string(),
            session.v(),
            session.fire_count() as i64,
            session.wave_phase(),
            session.total_rounds() as i64,
            now_iso8601(),
        ],
    )?;
    Ok(())
}

fn insert_entry_on(tx: &Transaction<'_>, session_id: Uuid, entry: &SpineEntry) -> Result<()> {
    let r = &entry.record;
    tx.execute(
        "INSERT INTO spine (session_id, role, content, timestamp, round, message_digest,
                            token_count, semantic_depth, omega_k, tau, topo, poly_c, fire,
                            delta_v, v, cv_x, cv_y, cv_z, entanglement)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            session_id.to_string(),
            entry.role.as_str(),
            entry.content,
            entry.timestamp,
            r.round as i64,
            r.message_digest as i64,
            r.token_count as i64,
            r.semantic_depth,
            r.omega_k as i64,
            r.tau as i64,
            r.topo,
            r.poly_c,
            r.fire as i64,
            r.delta_v,
            r.v,
            r.collapse_vector[0],
            r.collapse_vector[1],
            r.collapse_vector[2],
            r.entanglement_strength,
        ],
    )?;
    Ok(())
}

/// Drop the oldest rows beyond the retention cap, per session.
fn enforce_retention_on(tx: &Transaction<'_>, session_id: Uuid) -> Result<()> {
    let removed = tx.execute(
        "DELETE FROM spine WHERE session_id = ?1 AND id NOT IN (
             SELECT id FROM spine WHERE session_id = ?1
             ORDER BY id DESC LIMIT ?2)",
        params![
            session_id.to_string(),
            hm_core::SPINE_PERSIST_CAP as i64
        ],
    )?;
    if removed > 0 {
        tracing::debug!("retention sweep dropped {removed} spine rows");
    }
    Ok(())
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("invalid UUID '{s}': {e}")))
}
