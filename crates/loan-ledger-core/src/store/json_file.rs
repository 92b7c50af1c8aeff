use chrono::Utc;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{LedgerStore, DEFAULT_KEY};
use crate::loans::Ledger;
use crate::{LedgerError, LedgerResult};

/// Stores the ledger as `<dir>/<key>.json`.
///
/// Writes go to a sibling temp file that is renamed over the entry, so a
/// failed write leaves the previous contents in place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
    key: String,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        JsonFileStore {
            dir: dir.into(),
            key: key.into(),
        }
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore::new(dir, DEFAULT_KEY)
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!(".{}.json.tmp", self.key))
    }

    /// A fresh `<key>.json.corrupt-<timestamp>` name. Earlier backups are
    /// never reused.
    fn backup_path(&self) -> PathBuf {
        let base = format!(
            "{}.json.corrupt-{}",
            self.key,
            Utc::now().format("%Y%m%dT%H%M%S%3f")
        );
        let mut candidate = self.dir.join(&base);
        let mut n = 1;
        while candidate.exists() {
            candidate = self.dir.join(format!("{base}-{n}"));
            n += 1;
        }
        candidate
    }

    /// Read and parse the entry. `Ok(None)` when it does not exist yet.
    pub fn read(&self) -> LedgerResult<Option<Ledger>> {
        let path = self.path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(LedgerError::SerializationError(format!(
                    "Failed to decode '{}': {}",
                    path.display(),
                    e
                )))
            }
            Err(e) => {
                return Err(LedgerError::Storage(format!(
                    "Failed to read '{}': {}",
                    path.display(),
                    e
                )))
            }
        };
        let contents = String::from_utf8(bytes).map_err(|e| {
            LedgerError::SerializationError(format!(
                "'{}' is not valid UTF-8: {}",
                path.display(),
                e
            ))
        })?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let ledger = serde_json::from_str(&contents).map_err(|e| {
            LedgerError::SerializationError(format!("Failed to parse '{}': {}", path.display(), e))
        })?;
        Ok(Some(ledger))
    }

    /// Move a corrupt entry aside so the next save does not destroy it.
    fn quarantine(&self, path: &Path) {
        let backup = self.backup_path();
        match fs::rename(path, &backup) {
            Ok(()) => warn!(backup = %backup.display(), "corrupt ledger moved aside"),
            Err(e) => warn!(error = %e, "could not move corrupt ledger aside"),
        }
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Ledger {
        match self.read() {
            Ok(Some(ledger)) => {
                debug!(path = %self.path().display(), loans = ledger.len(), "ledger loaded");
                ledger
            }
            Ok(None) => Ledger::new(),
            Err(LedgerError::SerializationError(reason)) => {
                warn!(%reason, "stored ledger is corrupt; starting with an empty ledger");
                self.quarantine(&self.path());
                Ledger::new()
            }
            Err(e) => {
                warn!(error = %e, "stored ledger is unreadable; starting with an empty ledger");
                Ledger::new()
            }
        }
    }

    fn save(&self, ledger: &Ledger) -> LedgerResult<()> {
        fs::create_dir_all(&self.dir)?;
        let raw = serde_json::to_string_pretty(ledger)?;
        let temp = self.temp_path();
        let written = fs::write(&temp, raw).and_then(|()| fs::rename(&temp, self.path()));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        debug!(path = %self.path().display(), loans = ledger.len(), "ledger saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_key() {
        let store = JsonFileStore::new("/tmp/ledger", "my-loans");
        assert_eq!(store.path(), PathBuf::from("/tmp/ledger/my-loans.json"));
        assert_eq!(
            JsonFileStore::in_dir("/data").path(),
            PathBuf::from("/data/loans.json")
        );
    }

    #[test]
    fn test_backup_names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        let first = store.backup_path();
        fs::write(&first, "old").unwrap();
        let second = store.backup_path();
        assert_ne!(first, second);
        assert!(second
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("loans.json.corrupt-")));
    }

    #[test]
    fn test_missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        assert!(store.read().unwrap().is_none());
        assert!(store.load().is_empty());
    }
}
