use super::KeyValueStore;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// All keys live in a single JSON object file, rewritten on every change
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store file {}", path.display()))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)
                    .with_context(|| format!("Store file {} is not a JSON object", path.display()))?
            }
        } else {
            BTreeMap::new()
        };

        debug!(target: "store", "Opened {} with {} keys", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Sibling temp file, renamed over the target
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace store file {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        debug!(target: "store", "Set {} ({} bytes)", key, value.len());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("LIST_OPTIONS").unwrap(), None);
        store.set("LIST_OPTIONS", r#"{"maxLines":4}"#).unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("LIST_OPTIONS").unwrap().as_deref(),
            Some(r#"{"maxLines":4}"#)
        );
    }

    #[test]
    fn remove_deletes_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");

        let mut store = FileStore::open(&path).unwrap();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.remove("a").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("a").unwrap(), None);
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").unwrap();

        assert!(FileStore::open(&path).is_err());
    }
}
