use anyhow::Context;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("artifact {0} already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// Durable home for report artifacts, addressed by file name.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    fn describe(&self) -> String;

    /// Publishes `bytes` under `name` and returns the artifact identifier.
    ///
    /// Create-only: an existing name is never overwritten. The name must not be
    /// readable through [`ArtifactStore::get`] until the bytes are fully written.
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String, StoreError>;

    async fn get(&self, name: &str) -> anyhow::Result<Option<Vec<u8>>>;

    async fn list(&self) -> anyhow::Result<Vec<String>>;

    async fn delete(&self, name: &str) -> anyhow::Result<bool>;
}

/// Artifacts as files in one directory.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> anyhow::Result<PathBuf> {
        anyhow::ensure!(
            !name.is_empty()
                && !name.starts_with('.')
                && !name.contains(['/', '\\'])
                && Path::new(name).file_name().is_some(),
            "invalid artifact name: {name:?}"
        );
        Ok(self.root.join(name))
    }

    async fn write_temp(&self, tmp: &Path, bytes: &[u8]) -> anyhow::Result<()> {
        let mut file = tokio::fs::File::create(tmp)
            .await
            .with_context(|| format!("failed to create {}", tmp.display()))?;
        file.write_all(bytes)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        file.flush().await.context("failed to flush report file")?;
        file.sync_all().await.context("failed to sync report file")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ArtifactStore for LocalDirStore {
    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }

    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String, StoreError> {
        let target = self.path_for(name)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("failed to create report dir {}", self.root.display()))?;

        // Dot-prefixed temp names are invisible to get/list.
        let tmp = self
            .root
            .join(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()));

        if let Err(err) = self.write_temp(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }

        // hard_link fails on an existing target, which gives create-only semantics.
        let linked = tokio::fs::hard_link(&tmp, &target).await;
        if let Err(err) = tokio::fs::remove_file(&tmp).await {
            tracing::warn!(path = %tmp.display(), error = %err, "failed to remove temp report file");
        }

        match linked {
            Ok(()) => Ok(name.to_string()),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists(name.to_string()))
            }
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!("failed to publish {}", target.display()))
                .into()),
        }
    }

    async fn get(&self, name: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.path_for(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    async fn list(&self) -> anyhow::Result<Vec<String>> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to list {}", self.root.display()))
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await.context("failed to read dir entry")? {
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> anyhow::Result<bool> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).with_context(|| format!("failed to delete {}", path.display())),
        }
    }
}

/// In-process store, for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    artifacts: tokio::sync::RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ArtifactStore for MemoryStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String, StoreError> {
        let mut artifacts = self.artifacts.write().await;
        if artifacts.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        artifacts.insert(name.to_string(), bytes.to_vec());
        Ok(name.to_string())
    }

    async fn get(&self, name: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.artifacts.read().await.get(name).cloned())
    }

    async fn list(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.artifacts.read().await.keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> anyhow::Result<bool> {
        Ok(self.artifacts.write().await.remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_store_round_trips_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path().join("reports"));

        let id = store.put("report-A-1.pdf", b"first").await.unwrap();
        assert_eq!(id, "report-A-1.pdf");
        assert_eq!(store.get(&id).await.unwrap().as_deref(), Some(&b"first"[..]));

        let err = store.put("report-A-1.pdf", b"second").await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(store.get(&id).await.unwrap().as_deref(), Some(&b"first"[..]));
    }

    #[tokio::test]
    async fn local_store_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());
        store.put("report-A-1.pdf", b"x").await.unwrap();
        let _ = store.put("report-A-1.pdf", b"y").await;

        let mut entries = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        entries.sort();
        assert_eq!(entries, ["report-A-1.pdf"]);
    }

    #[tokio::test]
    async fn local_store_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());
        assert!(store.get("../secret").await.is_err());
        assert!(store.get(".hidden").await.is_err());
        assert!(store.put("a/b.pdf", b"x").await.is_err());
    }

    #[tokio::test]
    async fn local_store_missing_artifact_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());
        assert_eq!(store.get("report-A-1.pdf").await.unwrap(), None);
        assert!(!store.delete("report-A-1.pdf").await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn local_store_fails_when_root_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("reports");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let store = LocalDirStore::new(&blocker);
        let err = store.put("report-A-1.pdf", b"x").await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[tokio::test]
    async fn memory_store_lists_and_deletes() {
        let store = MemoryStore::new();
        store.put("b", b"2").await.unwrap();
        store.put("a", b"1").await.unwrap();
        assert_eq!(store.list().await.unwrap(), ["a", "b"]);
        assert!(store.delete("a").await.unwrap());
        assert_eq!(store.list().await.unwrap(), ["b"]);
    }
}
