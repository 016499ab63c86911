//! Where drained histograms end up

use super::events::WorkerHandle;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;

/// Artifact name for a worker: unique per process id, so two workers never
/// write the same file no matter which finishes first.
pub fn artifact_name(handle: WorkerHandle) -> String {
    format!("file{}.hist", handle.0)
}

#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Store one self-contained artifact and return where it went.
    async fn persist(&self, name: &str, contents: &str) -> io::Result<PathBuf>;
}

/// Writes artifacts as files in one directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArtifactSink for FileSink {
    async fn persist(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o644)
            .open(&path)
            .await?;
        file.write_all(contents.as_bytes()).await?;
        file.flush().await?;

        Ok(path)
    }
}

/// Keeps artifacts in memory, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    artifacts: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.lock().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        // Inserts are single calls, so a poisoned map is still whole
        self.artifacts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn persist(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        self.lock().insert(name.to_string(), contents.to_string());
        Ok(PathBuf::from(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_name_uses_pid() {
        assert_eq!(artifact_name(WorkerHandle(4242)), "file4242.hist");
    }

    #[tokio::test]
    async fn test_file_sink_creates_dir_and_overwrites() {
        let temp = TempDir::new().unwrap();
        let sink = FileSink::new(temp.path().join("nested").join("out"));

        let path = sink.persist("file1.hist", "first\n").await.unwrap();
        assert_eq!(path, sink.dir().join("file1.hist"));

        sink.persist("file1.hist", "second\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_sink_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let sink = FileSink::new(temp.path());
        let path = sink.persist("file2.hist", "a 0\n").await.unwrap();

        let mode = std::fs::metadata(path).unwrap().permissions().mode();
        // umask may strip bits but never adds write for group/other
        assert_eq!(mode & 0o022, 0);
        assert_eq!(mode & 0o600, 0o600);
    }

    #[tokio::test]
    async fn test_memory_sink_records_artifacts() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.persist("file9.hist", "z 1\n").await.unwrap();
        sink.persist("file3.hist", "a 1\n").await.unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.names(), vec!["file3.hist", "file9.hist"]);
        assert_eq!(sink.get("file9.hist").as_deref(), Some("z 1\n"));
    }
}
