use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

use super::types::HistoryData;
use super::HistoryError;

/// Key holding the serialized history of the anonymous user.
pub const HISTORY_KEY: &str = "nutrilife_history";

/// SQLite-backed key-value table.
/// All operations are synchronous (rusqlite is blocking).
/// Callers in async contexts should use `tokio::task::spawn_blocking`.
pub struct KeyValueStore {
    conn: Connection,
}

impl KeyValueStore {
    /// Open or create the key-value database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| HistoryError::Local(format!("Failed to create data dir: {}", e)))?;
        }

        let conn = Connection::open(db_path).map_err(|e| {
            HistoryError::Local(format!("Failed to open local store at {:?}: {}", db_path, e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| HistoryError::Local(format!("Failed to create kv table: {}", e)))?;

        Ok(Self { conn })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, HistoryError> {
        self.conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| HistoryError::Local(format!("Lookup of '{}' failed: {}", key, e)))
    }

    /// Store `value` under `key`, overwriting any previous value.
    pub fn put(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .map_err(|e| HistoryError::Local(format!("Failed to store '{}': {}", key, e)))?;
        Ok(())
    }
}

/// The anonymous user's history slot on local disk.
#[derive(Debug, Clone)]
pub struct LocalSlot {
    db_path: PathBuf,
}

impl LocalSlot {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Read the stored history.
    ///
    /// A missing slot, unreadable database, malformed JSON, or a value
    /// without both history arrays all yield an empty history.
    pub fn load(&self) -> HistoryData {
        let raw = match KeyValueStore::open(&self.db_path).and_then(|kv| kv.get(HISTORY_KEY)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return HistoryData::default(),
            Err(e) => {
                warn!("Error reading local history: {}", e);
                return HistoryData::default();
            }
        };

        match parse_history(&raw) {
            Some(history) => {
                info!(
                    "Loaded local history: {} products, {} overhauls",
                    history.products.len(),
                    history.overhauls.len()
                );
                history
            }
            None => {
                warn!("Local history is malformed, starting fresh");
                HistoryData::default()
            }
        }
    }

    pub fn save(&self, history: &HistoryData) -> Result<(), HistoryError> {
        let json = serde_json::to_string(history)
            .map_err(|e| HistoryError::Local(format!("Failed to serialize history: {}", e)))?;
        KeyValueStore::open(&self.db_path)?.put(HISTORY_KEY, &json)
    }
}

fn parse_history(raw: &str) -> Option<HistoryData> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    if !value["products"].is_array() || !value["overhauls"].is_array() {
        return None;
    }
    serde_json::from_value(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn slot(dir: &TempDir) -> LocalSlot {
        LocalSlot::new(dir.path().join("history.db"))
    }

    #[test]
    fn test_load_missing_slot_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(slot(&dir).load().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let slot = slot(&dir);
        let history = HistoryData::default();
        slot.save(&history).unwrap();
        assert_eq!(slot.load(), history);
    }

    #[test]
    fn test_malformed_json_resets() {
        let dir = TempDir::new().unwrap();
        let slot = slot(&dir);
        let kv = KeyValueStore::open(slot.path()).unwrap();
        kv.put(HISTORY_KEY, "{not json").unwrap();
        assert!(slot.load().is_empty());
    }

    #[test]
    fn test_missing_arrays_reset() {
        let dir = TempDir::new().unwrap();
        let slot = slot(&dir);
        let kv = KeyValueStore::open(slot.path()).unwrap();
        kv.put(HISTORY_KEY, r#"{"products": []}"#).unwrap();
        assert!(slot.load().is_empty());

        kv.put(HISTORY_KEY, r#"{"products": {}, "overhauls": []}"#).unwrap();
        assert!(slot.load().is_empty());
    }

    #[test]
    fn test_kv_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let kv = KeyValueStore::open(&dir.path().join("kv.db")).unwrap();
        kv.put("k", "one").unwrap();
        kv.put("k", "two").unwrap();
        assert_eq!(kv.get("k").unwrap(), Some("two".to_string()));
        assert_eq!(kv.get("missing").unwrap(), None);
    }
}
