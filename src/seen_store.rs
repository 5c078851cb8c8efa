// =============================================================================
// seen_store.rs — THE LONG MEMORY
// =============================================================================
//
// Between runs the process remembers exactly one thing: which announcement
// URLs it has already shouted about. That memory is a JSON array of SHA-256
// fingerprints, living either in a file next to the binary or under a single
// Redis key when several hosts share the job.
//
// Losing the memory is survivable (a few repeat alerts). Refusing to run
// because the memory is garbled is not, so every load failure becomes an
// empty set and a warn! line.
// =============================================================================

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// The set of fingerprints already notified.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeenSet {
    fingerprints: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.fingerprints.contains(fingerprint)
    }

    /// Returns `false` when the fingerprint was already present.
    pub fn insert(&mut self, fingerprint: impl Into<String>) -> bool {
        self.fingerprints.insert(fingerprint.into())
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Fingerprints in ascending order, the on-disk representation.
    pub fn sorted(&self) -> Vec<String> {
        let mut v: Vec<String> = self.fingerprints.iter().cloned().collect();
        v.sort_unstable();
        v
    }

    fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&self.sorted())?)
    }

    fn from_json(raw: &str) -> Result<Self, StoreError> {
        let list: Vec<String> = serde_json::from_str(raw)?;
        Ok(list.into_iter().collect())
    }
}

impl FromIterator<String> for SeenSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            fingerprints: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Where the set lives, for log lines.
    fn describe(&self) -> String;

    async fn load(&self) -> Result<SeenSet, StoreError>;

    /// Replace the whole backing resource with `set`.
    async fn persist(&self, set: &SeenSet) -> Result<(), StoreError>;

    /// Load, degrading any failure to "nothing seen yet".
    async fn load_or_empty(&self) -> SeenSet {
        match self.load().await {
            Ok(set) => {
                if set.is_empty() {
                    info!(store = %self.describe(), "Seen-set empty, every recent listing is new");
                } else {
                    info!(store = %self.describe(), entries = set.len(), "Seen-set loaded");
                }
                set
            }
            Err(e) => {
                warn!(store = %self.describe(), error = %e, "Seen-set unreadable, starting empty");
                SeenSet::new()
            }
        }
    }
}

// -----------------------------------------------------------------------------
// File backend
// -----------------------------------------------------------------------------

pub struct FileSeenStore {
    path: PathBuf,
}

impl FileSeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl SeenStore for FileSeenStore {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn load(&self) -> Result<SeenSet, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No seen-set file yet, first run");
                return Ok(SeenSet::new());
            }
            Err(e) => return Err(e.into()),
        };
        SeenSet::from_json(&raw)
    }

    async fn persist(&self, set: &SeenSet) -> Result<(), StoreError> {
        let json = set.to_json()?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), entries = set.len(), "Seen-set persisted");
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Redis backend
// -----------------------------------------------------------------------------

/// Same JSON array, stored under one key. `SET` replaces the value in one step.
pub struct RedisSeenStore {
    client: redis::Client,
    key: String,
}

impl RedisSeenStore {
    pub fn new(redis_url: &str, key: impl Into<String>) -> Result<Self, StoreError> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
            key: key.into(),
        })
    }
}

#[async_trait]
impl SeenStore for RedisSeenStore {
    fn describe(&self) -> String {
        format!("redis:{}", self.key)
    }

    async fn load(&self) -> Result<SeenSet, StoreError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = con.get(&self.key).await?;
        match raw {
            Some(raw) => SeenSet::from_json(&raw),
            None => Ok(SeenSet::new()),
        }
    }

    async fn persist(&self, set: &SeenSet) -> Result<(), StoreError> {
        let json = set.to_json()?;
        let mut con = self.client.get_multiplexed_async_connection().await?;
        con.set::<_, _, ()>(&self.key, json).await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSeenStore::new(dir.path().join("seen.json"));
        let set = store.load().await.unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        std::fs::write(&path, "{ not an array").unwrap();
        let store = FileSeenStore::new(&path);

        assert!(matches!(store.load().await, Err(StoreError::Json(_))));
        assert!(store.load_or_empty().await.is_empty());
    }

    #[tokio::test]
    async fn wrong_shape_is_also_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        std::fs::write(&path, r#"[1, 2, 3]"#).unwrap();
        assert!(FileSeenStore::new(&path).load_or_empty().await.is_empty());
    }

    #[tokio::test]
    async fn persist_writes_sorted_array_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        let store = FileSeenStore::new(&path);

        let set: SeenSet = ["ccc", "aaa", "bbb"].iter().map(|s| s.to_string()).collect();
        store.persist(&set).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let on_disk: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(on_disk, vec!["aaa", "bbb", "ccc"]);
        assert!(!dir.path().join("seen.json.tmp").exists());

        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded, set);
    }

    #[tokio::test]
    async fn persist_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSeenStore::new(dir.path().join("seen.json"));

        let first: SeenSet = ["old".to_string()].into_iter().collect();
        store.persist(&first).await.unwrap();
        let second: SeenSet = ["new".to_string()].into_iter().collect();
        store.persist(&second).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert!(loaded.contains("new"));
        assert!(!loaded.contains("old"));
    }

    #[test]
    fn insert_reports_novelty() {
        let mut set = SeenSet::new();
        assert!(set.insert("abc"));
        assert!(!set.insert("abc"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn redis_store_rejects_malformed_url() {
        assert!(RedisSeenStore::new("not a url", "k").is_err());
    }
}
