//! File-backed and in-process [`StateStore`] implementations.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use proposalgen_shared::{FieldValue, ProjectState, ProposalError, Result};
use tracing::{debug, warn};

use crate::StateStore;

// ---------------------------------------------------------------------------
// JsonStateStore
// ---------------------------------------------------------------------------

/// The project record as one pretty-printed JSON file.
///
/// `write` is read–modify–write and every save goes through a temp file plus
/// rename, so a crash never leaves a half-written record behind.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> ProjectState {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "state file not found, using defaults");
                return ProjectState::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file unreadable, using defaults");
                return ProjectState::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "state file corrupt, using defaults");
            ProjectState::default()
        })
    }

    fn save(&self, state: &ProjectState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ProposalError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| ProposalError::Storage(format!("failed to serialize state: {e}")))?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "projectinfo.json".into());
        let tmp = self.path.with_file_name(format!(".{file_name}.tmp"));

        std::fs::write(&tmp, json).map_err(|e| ProposalError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| ProposalError::io(&self.path, e))?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }
}

#[async_trait]
impl StateStore for JsonStateStore {
    async fn reset(&mut self) -> Result<()> {
        self.save(&ProjectState::skeleton())
    }

    async fn read(&self) -> ProjectState {
        self.load()
    }

    async fn write(&mut self, value: FieldValue) -> Result<()> {
        let mut state = self.load();
        state.set(value);
        self.save(&state)
    }
}

// ---------------------------------------------------------------------------
// MemoryStateStore
// ---------------------------------------------------------------------------

/// In-process record; nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    state: ProjectState,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing record.
    pub fn with_state(state: ProjectState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &ProjectState {
        &self.state
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn reset(&mut self) -> Result<()> {
        self.state = ProjectState::skeleton();
        Ok(())
    }

    async fn read(&self) -> ProjectState {
        self.state.clone()
    }

    async fn write(&mut self, value: FieldValue) -> Result<()> {
        self.state.set(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proposalgen_shared::{FieldKey, NOT_SPECIFIED, Timeline};
    use uuid::Uuid;

    fn temp_state_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("pg_state_{}", Uuid::now_v7()))
            .join("projectinfo.json")
    }

    #[tokio::test]
    async fn reset_writes_full_skeleton() {
        let path = temp_state_path();
        let mut store = JsonStateStore::new(&path);
        store.reset().await.expect("reset");

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        for key in FieldKey::ALL {
            assert!(raw.get(key.as_str()).is_some(), "missing {key}");
        }
        assert_eq!(raw["SCOPE"], NOT_SPECIFIED);
        assert!(!path.with_file_name(".projectinfo.json.tmp").exists());
    }

    #[tokio::test]
    async fn write_replaces_one_key() {
        let path = temp_state_path();
        let mut store = JsonStateStore::new(&path);
        store.reset().await.unwrap();

        store
            .write(FieldValue::Scope("Build a chatbot.".into()))
            .await
            .unwrap();
        store
            .write(FieldValue::Timeline(Timeline {
                total_duration: "5".into(),
                milestones: Vec::new(),
            }))
            .await
            .unwrap();

        let state = store.read().await;
        assert_eq!(state.scope, "Build a chatbot.");
        assert_eq!(state.timeline.total_duration, "5");
        assert_eq!(state.plan, NOT_SPECIFIED);
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_default() {
        let path = temp_state_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ this is not json").unwrap();

        let store = JsonStateStore::new(&path);
        assert_eq!(store.read().await, ProjectState::default());
    }

    #[tokio::test]
    async fn missing_file_reads_as_default() {
        let store = JsonStateStore::new(temp_state_path());
        assert_eq!(store.read().await, ProjectState::default());
    }

    #[tokio::test]
    async fn write_recovers_from_corrupt_file() {
        let path = temp_state_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[]").unwrap();

        let mut store = JsonStateStore::new(&path);
        store
            .write(FieldValue::Plan("Frontend\n- React".into()))
            .await
            .unwrap();
        let state = store.read().await;
        assert_eq!(state.plan, "Frontend\n- React");
        assert_eq!(state.key_deliverables, vec![NOT_SPECIFIED]);
    }

    #[tokio::test]
    async fn memory_store_reset_discards_content() {
        let mut store = MemoryStateStore::new();
        store
            .write(FieldValue::Assumptions(vec!["Client supplies data".into()]))
            .await
            .unwrap();
        assert_eq!(store.state().assumptions, vec!["Client supplies data"]);

        store.reset().await.unwrap();
        assert_eq!(store.read().await, ProjectState::skeleton());
    }
}
