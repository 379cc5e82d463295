use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::Storage;

/// Stores each key as `<dir>/<key>.json`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create storage directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read storage file: {}", key))?;
        Ok(Some(contents))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path(key);
        // Write-then-rename so a crash never leaves a half-written record
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        std::fs::write(&tmp, value)
            .with_context(|| format!("Failed to write storage file: {}", key))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace storage file: {}", key))?;
        debug!(key, bytes = value.len(), "Storage record written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove storage file: {}", key))?;
            debug!(key, "Storage record removed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_set_get_remove() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = FileStore::new(dir.path().join("nested")).expect("Failed to create store");

        assert_eq!(store.get("user").expect("get"), None);

        store.set("user", r#"{"a":1}"#).expect("set");
        assert_eq!(store.get("user").expect("get").as_deref(), Some(r#"{"a":1}"#));
        assert!(store.dir().join("user.json").exists());
        assert!(!store.dir().join("user.json.tmp").exists());

        store.set("user", r#"{"a":2}"#).expect("overwrite");
        assert_eq!(store.get("user").expect("get").as_deref(), Some(r#"{"a":2}"#));

        store.remove("user").expect("remove");
        assert_eq!(store.get("user").expect("get"), None);

        // Removing a missing key is fine
        store.remove("user").expect("remove missing");
    }
}
