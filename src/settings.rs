//! Settings database: durable storage for the query history

use crate::error::QuranSearchError;
use crate::history::HistoryEntry;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};

pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Open the settings database, creating it and its tables if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, QuranSearchError> {
        let store = Self { path: path.into() };

        if let Some(parent) = store.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        store.init()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connection(&self) -> Result<Connection, QuranSearchError> {
        Connection::open(&self.path).map_err(|e| {
            QuranSearchError::Storage(format!(
                "unable to open database file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn init(&self) -> Result<(), QuranSearchError> {
        let conn = self.connection()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS search_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                raw_query TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Stored history, oldest first.
    pub fn load(&self) -> Result<Vec<HistoryEntry>, QuranSearchError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT raw_query, created_at FROM search_history ORDER BY id")?;
        let entries = stmt
            .query_map([], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Replace the stored history with `entries`.
    pub fn save(&self, entries: &[HistoryEntry]) -> Result<(), QuranSearchError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM search_history", [])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO search_history (raw_query, created_at) VALUES (?1, ?2)")?;
            for entry in entries {
                stmt.execute(params![entry.raw_query, entry.timestamp.to_rfc3339()])?;
            }
        }
        tx.commit()?;
        tracing::debug!("Saved {} history entries", entries.len());
        Ok(())
    }

    pub fn clear(&self) -> Result<(), QuranSearchError> {
        self.connection()?
            .execute("DELETE FROM search_history", [])?;
        Ok(())
    }
}

fn row_to_entry(row: &Row) -> rusqlite::Result<HistoryEntry> {
    let raw_query: String = row.get(0)?;
    let created_at: String = row.get(1)?;
    // Unreadable timestamps are not worth losing the entry over.
    let timestamp = DateTime::parse_from_rfc3339(&created_at)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    Ok(HistoryEntry {
        raw_query,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(queries: &[&str]) -> Vec<HistoryEntry> {
        queries.iter().map(|q| HistoryEntry::new(*q)).collect()
    }

    #[test]
    fn test_save_and_load_preserve_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(dir.path().join("settings.db")).unwrap();
        assert!(store.load().unwrap().is_empty());

        let saved = entries(&["2 255", "الرحمن", "%عليهم%"]);
        store.save(&saved).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(dir.path().join("settings.db")).unwrap();
        store.save(&entries(&["a", "b"])).unwrap();
        store.save(&entries(&["c"])).unwrap();

        let loaded: Vec<String> = store.load().unwrap().into_iter().map(|e| e.raw_query).collect();
        assert_eq!(loaded, vec!["c"]);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_reopen_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.db");
        HistoryStore::open(&path)
            .unwrap()
            .save(&entries(&["1"]))
            .unwrap();

        let reopened = HistoryStore::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap().len(), 1);
    }
}
