use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::tracker::UsageLedger;

use super::error::StorageError;
use super::{LedgerStore, LEDGER_JSON_FILENAME};

/// Ledger kept as a single JSON document:
/// `{ "day": "YYYY-MM-DD", "counters": { "<service>": n } }`.
///
/// Writes land in a sibling temp file first and are renamed over the ledger,
/// so readers see either the old document or the new one.
pub struct JsonFileLedgerStore {
    path: PathBuf,
}

impl JsonFileLedgerStore {
    pub fn new(data_dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(data_dir)?;
        Ok(Self::at(data_dir.join(LEDGER_JSON_FILENAME)))
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for JsonFileLedgerStore {
    fn load(&self) -> Result<Option<UsageLedger>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)?;
        let ledger = serde_json::from_str(&raw).map_err(|err| {
            StorageError::Corrupt(format!("{}: {err}", self.path.display()))
        })?;
        Ok(Some(ledger))
    }

    fn save(&self, ledger: &UsageLedger) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let body = serde_json::to_vec_pretty(ledger)
            .map_err(|err| StorageError::Corrupt(err.to_string()))?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&body)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|err| StorageError::Io(err.error))?;

        debug!(path = %self.path.display(), day = %ledger.day, "wrote usage ledger");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileLedgerStore::new(dir.path()).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn document_matches_the_published_schema() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileLedgerStore::new(dir.path()).unwrap();
        let ledger = UsageLedger {
            day: NaiveDate::from_ymd_opt(2024, 7, 8).unwrap(),
            counters: [("assistant".to_string(), 4), ("weather".to_string(), 0)]
                .into_iter()
                .collect(),
        };
        store.save(&ledger).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({
                "day": "2024-07-08",
                "counters": { "assistant": 4, "weather": 0 }
            })
        );
    }

    #[test]
    fn garbage_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileLedgerStore::new(dir.path()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.load(), Err(StorageError::Corrupt(_))));
    }
}
