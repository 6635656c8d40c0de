//! Atomic file-backed profile storage

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::locks::KeyedLocks;
use crate::profile::{Items, Payload, ProfileName};

/// Prefix of in-flight temporary files; never a valid profile name
const TEMP_PREFIX: &str = ".tmp-";

/// Accepted on-disk shapes. Writes always produce `List` with one element.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredPayload {
    List(Vec<Items>),
    Single(Items),
}

/// Profile storage rooted at one data directory
///
/// Owns the directory exclusively: nothing else in the process touches
/// profile files.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    write_locks: KeyedLocks,
}

impl FileStore {
    /// Open (and create if needed) the data directory
    ///
    /// Temporary files left behind by an interrupted write are removed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::from_io(&dir, e))?;

        let metadata = fs::metadata(&dir)
            .await
            .map_err(|e| StoreError::from_io(&dir, e))?;
        if metadata.permissions().readonly() {
            warn!("Profile directory {} is read-only; writes will fail", dir.display());
        }

        let store = Self {
            dir,
            write_locks: KeyedLocks::new(),
        };
        store.sweep_temp_files().await?;
        Ok(store)
    }

    /// Data directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Destination path of a profile file
    pub fn path_for(&self, name: &ProfileName) -> PathBuf {
        self.dir.join(name.file_name())
    }

    /// Read a profile's items
    ///
    /// Returns `Ok(None)` when the file does not exist. If the file holds
    /// several mappings, the first one is returned.
    pub async fn read(&self, name: &ProfileName) -> Result<Option<Items>> {
        Ok(self
            .read_payload(name)
            .await?
            .map(|payload| payload.into_iter().next().unwrap_or_default()))
    }

    /// Read the complete on-disk content of a profile
    pub async fn read_payload(&self, name: &ProfileName) -> Result<Option<Payload>> {
        let path = self.path_for(name);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::from_io(&path, e)),
        };

        let stored: StoredPayload =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse { path, source })?;

        Ok(Some(match stored {
            StoredPayload::List(list) => list,
            StoredPayload::Single(items) => vec![items],
        }))
    }

    /// Replace a profile's content
    ///
    /// The items are wrapped in a one-element array, written to a temporary
    /// file, synced and renamed over the destination. Writes to the same
    /// profile are serialized.
    pub async fn write(&self, name: &ProfileName, items: &Items) -> Result<()> {
        let content = serde_json::to_vec_pretty(&[items]).map_err(StoreError::Serialize)?;
        let path = self.path_for(name);
        let temp_path = self.temp_path(name);

        let _guard = self.write_locks.lock(name.as_str()).await;

        if let Err(e) = write_synced(&temp_path, &content).await {
            remove_quietly(&temp_path).await;
            return Err(StoreError::from_io(&path, e));
        }

        if let Err(e) = fs::rename(&temp_path, &path).await {
            remove_quietly(&temp_path).await;
            return Err(StoreError::from_io(&path, e));
        }

        debug!("Wrote profile {} ({} items)", name, items.len());
        Ok(())
    }

    /// Delete a profile file
    ///
    /// Deleting a profile that does not exist succeeds; the return value tells
    /// whether a file was actually removed.
    pub async fn delete(&self, name: &ProfileName) -> Result<bool> {
        let path = self.path_for(name);
        let _guard = self.write_locks.lock(name.as_str()).await;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted profile {}", name);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::from_io(&path, e)),
        }
    }

    /// Whether a profile file exists
    pub async fn exists(&self, name: &ProfileName) -> Result<bool> {
        let path = self.path_for(name);
        match fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::from_io(&path, e)),
        }
    }

    /// Names of all stored profiles, sorted
    pub async fn list(&self) -> Result<Vec<ProfileName>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| StoreError::from_io(&self.dir, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::from_io(&self.dir, e))?
        {
            let file_name = entry.file_name();
            let Some(stem) = file_name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(name) = ProfileName::new(stem) {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    fn temp_path(&self, name: &ProfileName) -> PathBuf {
        self.dir
            .join(format!("{}{}-{}", TEMP_PREFIX, Uuid::new_v4(), name.file_name()))
    }

    async fn sweep_temp_files(&self) -> Result<()> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| StoreError::from_io(&self.dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::from_io(&self.dir, e))?
        {
            let is_temp = entry
                .file_name()
                .to_str()
                .map_or(false, |n| n.starts_with(TEMP_PREFIX));
            if is_temp {
                debug!("Removing stale temp file {}", entry.path().display());
                remove_quietly(&entry.path()).await;
            }
        }
        Ok(())
    }
}

async fn write_synced(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(content).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove temp file {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Scalar;
    use tempfile::TempDir;

    fn name(s: &str) -> ProfileName {
        ProfileName::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_read_missing_profile_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        assert!(store.read(&name("missing")).await.unwrap().is_none());
        assert!(!store.exists(&name("missing")).await.unwrap());
    }

    #[tokio::test]
    async fn test_write_produces_canonical_array() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let mut items = Items::new();
        items.insert("score", "0");
        store.write(&name("demo"), &items).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("demo.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!([{"score": "0"}]));
        assert!(raw.contains("\n  {"), "file should be pretty-printed");
    }

    #[tokio::test]
    async fn test_write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let mut items = Items::new();
        items.insert("title", "Final");
        items.insert("round", 3);
        items.insert("live", true);
        items.insert("note", Scalar::Null);
        store.write(&name("demo"), &items).await.unwrap();

        assert_eq!(store.read(&name("demo")).await.unwrap(), Some(items));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        assert!(!store.delete(&name("ghost")).await.unwrap());

        store.write(&name("demo"), &Items::new()).await.unwrap();
        assert!(store.delete(&name("demo")).await.unwrap());
        assert!(!store.delete(&name("demo")).await.unwrap());
        assert!(store.read(&name("demo")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("broken.json"), "[{\"a\": ").unwrap();

        let err = store.read(&name("broken")).await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_nested_values_on_disk_are_parse_errors() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("nested.json"), r#"[{"a": {"b": 1}}]"#).unwrap();

        assert!(matches!(
            store.read(&name("nested")).await,
            Err(StoreError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_reads_bare_object_and_multi_instance_files() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("bare.json"), r#"{"a": 1}"#).unwrap();
        std::fs::write(dir.path().join("multi.json"), r#"[{"a": 1}, {"b": 2}]"#).unwrap();
        std::fs::write(dir.path().join("empty.json"), "[]").unwrap();

        let bare = store.read(&name("bare")).await.unwrap().unwrap();
        assert_eq!(bare.get("a"), Some(&Scalar::from(1)));

        let multi = store.read_payload(&name("multi")).await.unwrap().unwrap();
        assert_eq!(multi.len(), 2);
        let first = store.read(&name("multi")).await.unwrap().unwrap();
        assert!(first.contains_key("a") && !first.contains_key("b"));

        let empty = store.read(&name("empty")).await.unwrap().unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_temp_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        store.write(&name("beta"), &Items::new()).await.unwrap();
        store.write(&name("alpha"), &Items::new()).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("bad name.json"), "[]").unwrap();

        let names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_open_sweeps_stale_temp_files() {
        let dir = TempDir::new().unwrap();
        let stale = dir.path().join(".tmp-1234-demo.json");
        std::fs::write(&stale, "[{").unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(!stale.exists());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        for i in 0..5 {
            let mut items = Items::new();
            items.insert("n", i);
            store.write(&name("demo"), &items).await.unwrap();
        }

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(TEMP_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }
}
