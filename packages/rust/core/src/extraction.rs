//! Extraction orchestrator.
//!
//! Runs every registered stage in order against one input text. Each stage
//! sees the current record (projected on its read-set), calls the completion
//! service once and writes its own field. A failed or uninterpretable
//! completion never aborts the run: the stage's fallback value is written and
//! the outcome is recorded as defaulted.

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use proposalgen_reference::ReferenceData;
use proposalgen_shared::{FieldKey, Result};
use proposalgen_storage::StateStore;

use crate::completion::CompletionClient;
use crate::stages::{StageContext, StageRegistry, build_messages};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What happened to one field during extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Extracted,
    /// The fallback value was written instead.
    Defaulted { reason: String },
}

impl StageOutcome {
    pub fn is_extracted(&self) -> bool {
        matches!(self, Self::Extracted)
    }
}

/// Per-stage outcomes in execution order.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    pub outcomes: Vec<(FieldKey, StageOutcome)>,
    pub elapsed: Duration,
}

impl ExtractionReport {
    pub fn outcome(&self, key: FieldKey) -> Option<&StageOutcome> {
        self.outcomes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, outcome)| outcome)
    }

    /// Number of fields that fell back to their default.
    pub fn defaulted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| !outcome.is_extracted())
            .count()
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for extraction.
pub trait ExtractionProgress: Send + Sync {
    /// Called before stage `current` (1-based) of `total` starts.
    fn stage_started(&self, key: FieldKey, current: usize, total: usize);
    /// Called once the stage's field has been written.
    fn stage_finished(&self, key: FieldKey, outcome: &StageOutcome);
}

/// No-op progress for headless/test usage.
pub struct SilentExtractionProgress;

impl ExtractionProgress for SilentExtractionProgress {
    fn stage_started(&self, _key: FieldKey, _current: usize, _total: usize) {}
    fn stage_finished(&self, _key: FieldKey, _outcome: &StageOutcome) {}
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Drives the stage registry against a completion client.
pub struct Extractor<'a> {
    registry: StageRegistry,
    client: &'a dyn CompletionClient,
    reference: &'a ReferenceData,
}

impl<'a> Extractor<'a> {
    pub fn new(client: &'a dyn CompletionClient, reference: &'a ReferenceData) -> Self {
        Self {
            registry: StageRegistry::new(),
            client,
            reference,
        }
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Populate every field of `store` from `input`.
    ///
    /// Does not reset the store. Only a store write failure is an error.
    #[instrument(skip_all, fields(stages = self.registry.len(), input_len = input.len()))]
    pub async fn extract(
        &self,
        input: &str,
        store: &mut dyn StateStore,
        progress: &dyn ExtractionProgress,
    ) -> Result<ExtractionReport> {
        let start = Instant::now();
        let ctx = StageContext {
            reference: self.reference,
        };
        let total = self.registry.len();
        let mut outcomes = Vec::with_capacity(total);

        for (i, stage) in self.registry.stages().iter().enumerate() {
            let key = stage.key();
            progress.stage_started(key, i + 1, total);

            let state = store.read().await;
            let messages = build_messages(stage.as_ref(), &ctx, &state, input);

            let interpreted = match self.client.complete(&messages, stage.output_mode()).await {
                Ok(completion) => stage.interpret(completion, &ctx),
                Err(e) => Err(e.into()),
            };

            let (value, outcome) = match interpreted {
                Ok(value) => {
                    debug!(field = %key, "stage extracted");
                    (value, StageOutcome::Extracted)
                }
                Err(e) => {
                    warn!(field = %key, error = %e, "stage failed, writing default");
                    (
                        stage.fallback(&ctx),
                        StageOutcome::Defaulted {
                            reason: e.to_string(),
                        },
                    )
                }
            };

            store.write(value).await?;
            progress.stage_finished(key, &outcome);
            outcomes.push((key, outcome));
        }

        let report = ExtractionReport {
            outcomes,
            elapsed: start.elapsed(),
        };
        info!(
            defaulted = report.defaulted(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "extraction complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proposalgen_reference::DEFAULT_TEAM;
    use proposalgen_shared::{
        FieldValue, NOT_SPECIFIED, ProjectState, ProposalError, TeamMember,
    };
    use proposalgen_storage::MemoryStateStore;
    use serde_json::json;

    use crate::completion::{CompletionError, MockCompletionClient};

    fn scripted_client() -> MockCompletionClient {
        MockCompletionClient::new()
            .with_json(
                FieldKey::BasicInfo,
                json!({"BASIC_INFO": {
                    "PROJECT TITLE": "Knowledge Hub",
                    "CLIENT": "Capital Legal",
                    "AUTHOR": "Sam"
                }}),
            )
            .with_text(FieldKey::Plan, "- Discovery\n- Build")
            .with_json(FieldKey::Scope, json!({"SCOPE": "A retrieval chatbot."}))
            .with_json(
                FieldKey::KeyDeliverables,
                json!({"KEY_DELIVERABLES": ["MVP chatbot"]}),
            )
            .with_json(
                FieldKey::Timeline,
                json!({"MILESTONES": [{"DESCRIPTION": "Build", "ESTIMATED_TIME": "5"}]}),
            )
            .with_json(
                FieldKey::DeliveryTeam,
                json!({"TEAM_MEMBERS": [{"NAME": "Sean"}]}),
            )
    }

    #[tokio::test]
    async fn failing_client_still_fills_every_field() {
        let client = MockCompletionClient::failing();
        let reference = ReferenceData::default();
        let mut store = MemoryStateStore::new();

        let report = Extractor::new(&client, &reference)
            .extract("Build a chatbot", &mut store, &SilentExtractionProgress)
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 10);
        assert_eq!(report.defaulted(), 10);

        let state = store.read().await;
        assert_eq!(state.plan, NOT_SPECIFIED);
        assert_eq!(state.key_deliverables, vec![NOT_SPECIFIED.to_string()]);
        assert_eq!(state.timeline.total_duration, NOT_SPECIFIED);
        let team: Vec<_> = state
            .delivery_team
            .team_members
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(team, DEFAULT_TEAM);
        assert!(state.past_projects.past_projects.is_empty());
    }

    #[tokio::test]
    async fn stages_run_in_field_order() {
        let client = scripted_client();
        let reference = ReferenceData::default();
        let mut store = MemoryStateStore::new();

        Extractor::new(&client, &reference)
            .extract("input", &mut store, &SilentExtractionProgress)
            .await
            .unwrap();

        assert_eq!(client.called_fields(), FieldKey::ALL.to_vec());
    }

    #[tokio::test]
    async fn failures_are_isolated_per_field() {
        let client = scripted_client();
        let reference = ReferenceData::default();
        let mut store = MemoryStateStore::new();

        let report = Extractor::new(&client, &reference)
            .extract("input", &mut store, &SilentExtractionProgress)
            .await
            .unwrap();

        assert_eq!(report.outcome(FieldKey::Scope), Some(&StageOutcome::Extracted));
        assert!(matches!(
            report.outcome(FieldKey::Assumptions),
            Some(StageOutcome::Defaulted { .. })
        ));

        let state = store.read().await;
        assert_eq!(state.basic_info.project_title, "Knowledge Hub");
        assert_eq!(state.basic_info.author, "Samuel Cunningham");
        assert_eq!(state.scope, "A retrieval chatbot.");
        assert_eq!(state.timeline.total_duration, "5");
        assert_eq!(
            state.delivery_team.team_members,
            vec![TeamMember::new("Sean Oldenburger")]
        );
    }

    #[tokio::test]
    async fn later_stages_see_earlier_fields() {
        let client = scripted_client();
        let reference = ReferenceData::default();
        let mut store = MemoryStateStore::new();

        Extractor::new(&client, &reference)
            .extract("input", &mut store, &SilentExtractionProgress)
            .await
            .unwrap();

        let calls = client.calls();
        let scope_call = calls
            .iter()
            .find(|c| c.field == Some(FieldKey::Scope))
            .unwrap();
        assert!(scope_call.messages[1].content.contains("- Discovery"));
        assert!(!scope_call.messages[1].content.contains("A retrieval chatbot."));
    }

    #[tokio::test]
    async fn reset_and_extract_is_idempotent() {
        let client = scripted_client();
        let reference = ReferenceData::default();
        let extractor = Extractor::new(&client, &reference);
        let mut store = MemoryStateStore::new();

        let mut runs = Vec::new();
        for _ in 0..2 {
            store.reset().await.unwrap();
            extractor
                .extract("input", &mut store, &SilentExtractionProgress)
                .await
                .unwrap();
            runs.push(store.read().await);
        }
        assert_eq!(runs[0], runs[1]);
    }

    struct ReadOnlyStore;

    #[async_trait]
    impl StateStore for ReadOnlyStore {
        async fn reset(&mut self) -> Result<()> {
            Ok(())
        }

        async fn read(&self) -> ProjectState {
            ProjectState::skeleton()
        }

        async fn write(&mut self, _value: FieldValue) -> Result<()> {
            Err(ProposalError::Storage("read-only".into()))
        }
    }

    #[tokio::test]
    async fn store_write_failure_propagates() {
        let client = MockCompletionClient::new()
            .with_failure(FieldKey::BasicInfo, CompletionError::Empty);
        let reference = ReferenceData::default();

        let err = Extractor::new(&client, &reference)
            .extract("input", &mut ReadOnlyStore, &SilentExtractionProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, ProposalError::Storage(_)));
        assert_eq!(client.calls().len(), 1);
    }
}
