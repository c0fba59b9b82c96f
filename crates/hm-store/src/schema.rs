use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    // Checkpoint every ~400KB instead of the default ~4MB — keeps WAL files small
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    // Force-checkpoint stale WAL data into the main DB on startup.
    // Errors are non-fatal — in-memory DBs and fresh files legitimately fail this.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::info!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id           TEXT PRIMARY KEY,
            v            REAL NOT NULL,
            fire_count   INTEGER NOT NULL DEFAULT 0,
            wave_phase   REAL NOT NULL DEFAULT 0,
            total_rounds INTEGER NOT NULL DEFAULT 0,
            last_updated TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS spine (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id     TEXT NOT NULL REFERENCES sessions(id),
            role           TEXT NOT NULL,
            content        TEXT NOT NULL,
            timestamp      TEXT NOT NULL DEFAULT '',
            round          INTEGER NOT NULL,
            message_digest INTEGER NOT NULL DEFAULT 0,
            token_count    INTEGER NOT NULL DEFAULT 0,
            semantic_depth REAL NOT NULL DEFAULT 0,
            omega_k        INTEGER NOT NULL,
            tau            INTEGER NOT NULL,
            topo           REAL NOT NULL DEFAULT 1,
            poly_c         REAL NOT NULL,
            fire           INTEGER NOT NULL DEFAULT 0,
            delta_v        REAL NOT NULL DEFAULT 0,
            v              REAL NOT NULL,
            cv_x           REAL NOT NULL DEFAULT 0,
            cv_y           REAL NOT NULL DEFAULT 0,
            cv_z           REAL NOT NULL DEFAULT 0,
            entanglement   REAL NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_spine_session ON spine(session_id);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}
