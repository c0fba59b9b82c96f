use std::fs;
use std::path::Path;

use uuid::Uuid;

use hm_core::{export_json, import_json};

use crate::error::{Result, StoreError};
use crate::store::Store;

impl Store {
    /// Import a snapshot JSON file into this store.
    pub fn import_json_file(&self, path: &Path) -> Result<Uuid> {
        let json = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        let session = import_json(&json)
            .map_err(|e| StoreError::InvalidData(format!("invalid JSON: {e}")))?;
        self.save_session(&session)?;
        Ok(session.id)
    }

    /// Export one session from this store to a snapshot JSON file.
    pub fn export_json_file(&self, id: Uuid, path: &Path) -> Result<()> {
        let json = self.export_json_string(id)?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }

    /// Export one session from this store as a snapshot JSON string.
    pub fn export_json_string(&self, id: Uuid) -> Result<String> {
        let session = self
            .load_session(id)?
            .ok_or_else(|| StoreError::InvalidData(format!("no such session: {id}")))?;
        export_json(&session)
            .map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
    }
}
