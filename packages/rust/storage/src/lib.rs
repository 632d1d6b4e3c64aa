//! Project-state persistence.
//!
//! [`StateStore`] is the contract every backend implements: reset to the
//! skeleton, read the whole record, replace one field. Backends:
//!
//! - [`JsonStateStore`]: one flat JSON file (the default)
//! - [`MemoryStateStore`]: in-process, for tests and one-shot runs
//! - [`RunStateStore`]: rows in a libSQL database, one record per [`RunId`]
//!
//! **Access rules for the database:** the CLI opens it read-write via
//! [`Storage::open`]; listing and inspection use [`Storage::open_readonly`].

mod file;
mod migrations;

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database, params};
use proposalgen_shared::{FieldKey, FieldValue, ProjectState, ProposalError, Result, RunId};
use tracing::warn;

pub use file::{JsonStateStore, MemoryStateStore};

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// The single mutable project record shared by extraction and assembly.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Overwrite the record with the all-default skeleton.
    async fn reset(&mut self) -> Result<()>;

    /// The whole record. Unreadable storage yields the default record.
    async fn read(&self) -> ProjectState;

    /// Replace the value stored under `value.key()`.
    async fn write(&mut self, value: FieldValue) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Summary row for one recorded run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub id: String,
    pub created_at: String,
    pub input_sha256: String,
    /// Number of fields written for this run.
    pub fields: u32,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ProposalError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ProposalError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| ProposalError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ProposalError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| ProposalError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    ProposalError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(ProposalError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Run operations
    // -----------------------------------------------------------------------

    /// Record a new run for an input with the given digest.
    pub async fn create_run(&self, input_sha256: &str) -> Result<RunId> {
        self.check_writable()?;
        let id = RunId::new();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO runs (id, created_at, input_sha256) VALUES (?1, ?2, ?3)",
                params![id.to_string(), now.as_str(), input_sha256],
            )
            .await
            .map_err(|e| ProposalError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// All runs, newest first.
    pub async fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let mut rows = self
            .conn
            .query(
                "SELECT r.id, r.created_at, r.input_sha256,
                        (SELECT COUNT(*) FROM project_fields f WHERE f.run_id = r.id)
                 FROM runs r ORDER BY r.id DESC",
                params![],
            )
            .await
            .map_err(|e| ProposalError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(RunSummary {
                id: row
                    .get::<String>(0)
                    .map_err(|e| ProposalError::Storage(e.to_string()))?,
                created_at: row
                    .get::<String>(1)
                    .map_err(|e| ProposalError::Storage(e.to_string()))?,
                input_sha256: row
                    .get::<String>(2)
                    .map_err(|e| ProposalError::Storage(e.to_string()))?,
                fields: row.get::<u32>(3).unwrap_or(0),
            });
        }
        Ok(results)
    }

    /// Most recently created run, if any.
    pub async fn latest_run(&self) -> Result<Option<RunId>> {
        let runs = self.list_runs().await?;
        runs.first()
            .map(|r| {
                r.id.parse::<RunId>()
                    .map_err(|e| ProposalError::Storage(format!("bad run id '{}': {e}", r.id)))
            })
            .transpose()
    }

    /// A [`StateStore`] view over one run's record.
    pub fn run_store(&self, run_id: RunId) -> RunStateStore<'_> {
        RunStateStore {
            storage: self,
            run_id,
        }
    }

    // -----------------------------------------------------------------------
    // Field operations
    // -----------------------------------------------------------------------

    async fn delete_fields(&self, run_id: &RunId) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "DELETE FROM project_fields WHERE run_id = ?1",
                params![run_id.to_string()],
            )
            .await
            .map_err(|e| ProposalError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn ensure_run(&self, run_id: &RunId) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT OR IGNORE INTO runs (id, created_at) VALUES (?1, ?2)",
                params![run_id.to_string(), now.as_str()],
            )
            .await
            .map_err(|e| ProposalError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn upsert_field(&self, run_id: &RunId, value: &FieldValue) -> Result<()> {
        self.check_writable()?;
        let json = serde_json::to_string(&value.to_json())
            .map_err(|e| ProposalError::Storage(e.to_string()))?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO project_fields (run_id, field, value_json, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(run_id, field) DO UPDATE SET
                    value_json = excluded.value_json,
                    updated_at = excluded.updated_at",
                params![
                    run_id.to_string(),
                    value.key().as_str(),
                    json.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(|e| ProposalError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn load_fields(&self, run_id: &RunId) -> Result<ProjectState> {
        let mut rows = self
            .conn
            .query(
                "SELECT field, value_json FROM project_fields WHERE run_id = ?1",
                params![run_id.to_string()],
            )
            .await
            .map_err(|e| ProposalError::Storage(e.to_string()))?;

        let mut state = ProjectState::default();
        while let Ok(Some(row)) = rows.next().await {
            let field = row
                .get::<String>(0)
                .map_err(|e| ProposalError::Storage(e.to_string()))?;
            let raw = row
                .get::<String>(1)
                .map_err(|e| ProposalError::Storage(e.to_string()))?;

            let Ok(key) = field.parse::<FieldKey>() else {
                warn!(%run_id, field, "ignoring unknown stored field");
                continue;
            };
            let decoded = serde_json::from_str(&raw)
                .and_then(|json| FieldValue::from_json(key, json));
            match decoded {
                Ok(value) => state.set(value),
                Err(e) => warn!(%run_id, field, error = %e, "stored field corrupt, using default"),
            }
        }
        Ok(state)
    }
}

// ---------------------------------------------------------------------------
// RunStateStore
// ---------------------------------------------------------------------------

/// One run's record inside a [`Storage`] database.
pub struct RunStateStore<'a> {
    storage: &'a Storage,
    run_id: RunId,
}

impl RunStateStore<'_> {
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }
}

#[async_trait]
impl StateStore for RunStateStore<'_> {
    async fn reset(&mut self) -> Result<()> {
        self.storage.ensure_run(&self.run_id).await?;
        self.storage.delete_fields(&self.run_id).await?;
        let skeleton = ProjectState::skeleton();
        for key in FieldKey::ALL {
            self.storage
                .upsert_field(&self.run_id, &skeleton.get(key))
                .await?;
        }
        Ok(())
    }

    async fn read(&self) -> ProjectState {
        match self.storage.load_fields(&self.run_id).await {
            Ok(state) => state,
            Err(e) => {
                warn!(run_id = %self.run_id, error = %e, "run state unreadable, using defaults");
                ProjectState::default()
            }
        }
    }

    async fn write(&mut self, value: FieldValue) -> Result<()> {
        self.storage.ensure_run(&self.run_id).await?;
        self.storage.upsert_field(&self.run_id, &value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proposalgen_shared::{DeliveryTeam, NOT_SPECIFIED, TeamMember};
    use uuid::Uuid;

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("pg_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("pg_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn run_lifecycle() {
        let storage = test_storage().await;
        let run_id = storage.create_run("abc123").await.expect("create run");

        let mut store = storage.run_store(run_id.clone());
        store.reset().await.expect("reset");
        store
            .write(FieldValue::DeliveryTeam(DeliveryTeam {
                team_members: vec![TeamMember::new("Sean Oldenburger")],
            }))
            .await
            .expect("write");

        let state = store.read().await;
        assert_eq!(state.delivery_team.team_members[0].name, "Sean Oldenburger");
        assert_eq!(state.scope, NOT_SPECIFIED);

        let runs = storage.list_runs().await.expect("list runs");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].input_sha256, "abc123");
        assert_eq!(runs[0].fields, 10);
        assert_eq!(storage.latest_run().await.unwrap(), Some(run_id));
    }

    #[tokio::test]
    async fn runs_are_isolated() {
        let storage = test_storage().await;
        let first = storage.create_run("one").await.unwrap();
        let second = storage.create_run("two").await.unwrap();

        storage
            .run_store(first.clone())
            .write(FieldValue::Scope("first scope".into()))
            .await
            .unwrap();
        storage
            .run_store(second.clone())
            .write(FieldValue::Scope("second scope".into()))
            .await
            .unwrap();

        assert_eq!(storage.run_store(first).read().await.scope, "first scope");
        assert_eq!(storage.run_store(second.clone()).read().await.scope, "second scope");
        assert_eq!(storage.latest_run().await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn reset_clears_previous_fields() {
        let storage = test_storage().await;
        let mut store = storage.run_store(RunId::new());
        store.write(FieldValue::Plan("old plan".into())).await.unwrap();
        store.reset().await.unwrap();
        assert_eq!(store.read().await, ProjectState::skeleton());
    }

    #[tokio::test]
    async fn unknown_run_reads_default() {
        let storage = test_storage().await;
        let store = storage.run_store(RunId::new());
        assert_eq!(store.read().await, ProjectState::default());
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("pg_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.expect("open rw");
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.expect("open ro");
        assert!(ro.create_run("x").await.is_err());
        let mut store = ro.run_store(RunId::new());
        assert!(store.write(FieldValue::Plan("p".into())).await.is_err());
        assert!(ro.list_runs().await.expect("list").is_empty());
    }
}
