//! End-to-end `generate` pipeline: reset → extract → overrides → assemble →
//! write → publish.

use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use proposalgen_docx::{WrittenDocument, write_document};
use proposalgen_reference::ReferenceData;
use proposalgen_shared::{BasicInfoField, FieldValue, ProposalError, Result};
use proposalgen_storage::StateStore;

use crate::assembler::{AssembleOptions, assemble};
use crate::completion::CompletionClient;
use crate::extraction::{ExtractionProgress, ExtractionReport, Extractor, StageOutcome};
use crate::publish::{PublishStatus, Publisher};

/// Timestamp format shared by the local and published file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// Manually supplied BASIC_INFO values that replace extracted ones.
#[derive(Debug, Clone, Default)]
pub struct BasicInfoOverrides {
    pub project_title: Option<String>,
    pub company_name: Option<String>,
    pub client: Option<String>,
    pub project_manager: Option<String>,
    pub author: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub project_description: Option<String>,
}

impl BasicInfoOverrides {
    /// Non-blank overrides as `(field, value)` pairs.
    pub fn entries(&self) -> Vec<(BasicInfoField, &str)> {
        [
            (BasicInfoField::ProjectTitle, &self.project_title),
            (BasicInfoField::CompanyName, &self.company_name),
            (BasicInfoField::Client, &self.client),
            (BasicInfoField::ProjectManager, &self.project_manager),
            (BasicInfoField::Author, &self.author),
            (BasicInfoField::StartDate, &self.start_date),
            (BasicInfoField::EndDate, &self.end_date),
            (BasicInfoField::ProjectDescription, &self.project_description),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (field, v))
        })
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Replace the given sub-fields of BASIC_INFO in `store`.
    pub async fn apply(&self, store: &mut dyn StateStore) -> Result<()> {
        let entries = self.entries();
        if entries.is_empty() {
            return Ok(());
        }
        let mut info = store.read().await.basic_info;
        for (field, value) in &entries {
            info.set(*field, *value);
        }
        store.write(FieldValue::BasicInfo(info)).await?;
        info!(count = entries.len(), "applied manual overrides");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Request / result
// ---------------------------------------------------------------------------

/// Per-call inputs.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub input: String,
    pub overrides: BasicInfoOverrides,
    pub output_dir: PathBuf,
    /// Drives the file names; the change-log date comes from `AssembleOptions`.
    pub generated_at: NaiveDateTime,
    /// `false` skips the publish step even when a publisher is configured.
    pub publish: bool,
}

/// Long-lived collaborators.
pub struct PipelineDeps<'a> {
    pub client: &'a dyn CompletionClient,
    pub reference: &'a ReferenceData,
    pub publisher: Option<&'a dyn Publisher>,
    pub options: AssembleOptions,
}

/// Result of a pipeline run.
#[derive(Debug)]
pub struct GenerateResult {
    pub document: WrittenDocument,
    pub publish: PublishStatus,
    /// `None` for `render`, which does not extract.
    pub extraction: Option<ExtractionReport>,
    /// sha256 of the input text.
    pub input_sha256: Option<String>,
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each extraction stage.
    fn stage(&self, field: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &GenerateResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn stage(&self, _field: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &GenerateResult) {}
}

/// Forwards extraction progress to the pipeline reporter.
struct PipelineExtractionProgress<'a> {
    inner: &'a dyn ProgressReporter,
}

impl ExtractionProgress for PipelineExtractionProgress<'_> {
    fn stage_started(&self, key: proposalgen_shared::FieldKey, current: usize, total: usize) {
        self.inner.stage(key.as_str(), current, total);
    }

    fn stage_finished(&self, _key: proposalgen_shared::FieldKey, _outcome: &StageOutcome) {}
}

/// Hex sha256 of the input text.
pub fn input_digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Local file name for a proposal generated at `at`.
pub fn output_file_name(at: &NaiveDateTime) -> String {
    format!("project_proposal_{}.docx", at.format(FILE_TIMESTAMP_FORMAT))
}

/// Blob name for a proposal generated at `at`.
pub fn publish_name(at: &NaiveDateTime) -> String {
    format!("proposal_{}.docx", at.format(FILE_TIMESTAMP_FORMAT))
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full pipeline.
///
/// 1. Reject blank input
/// 2. Reset the record
/// 3. Extract every field
/// 4. Apply manual overrides
/// 5. Assemble the document
/// 6. Write the `.docx`
/// 7. Publish (non-fatal)
#[instrument(skip_all, fields(input_len = request.input.len(), output_dir = %request.output_dir.display()))]
pub async fn generate(
    request: &GenerateRequest,
    deps: &PipelineDeps<'_>,
    store: &mut dyn StateStore,
    progress: &dyn ProgressReporter,
) -> Result<GenerateResult> {
    let start = Instant::now();

    if request.input.trim().is_empty() {
        return Err(ProposalError::validation("no input provided"));
    }
    let digest = input_digest(&request.input);
    info!(input_sha256 = %digest, "starting generate pipeline");

    // --- Phase 1: Reset ---
    progress.phase("Resetting project state");
    store.reset().await?;

    // --- Phase 2: Extract ---
    progress.phase("Extracting proposal fields");
    let extractor = Extractor::new(deps.client, deps.reference);
    let report = extractor
        .extract(
            &request.input,
            store,
            &PipelineExtractionProgress { inner: progress },
        )
        .await?;

    // --- Phases 3-6 ---
    let mut result = finish(request, deps, store, progress).await?;
    result.extraction = Some(report);
    result.input_sha256 = Some(digest);
    result.elapsed = start.elapsed();

    progress.done(&result);
    Ok(result)
}

/// Assemble, write and publish from the record already in `store`.
#[instrument(skip_all, fields(output_dir = %request.output_dir.display()))]
pub async fn render(
    request: &GenerateRequest,
    deps: &PipelineDeps<'_>,
    store: &mut dyn StateStore,
    progress: &dyn ProgressReporter,
) -> Result<GenerateResult> {
    let start = Instant::now();
    let mut result = finish(request, deps, store, progress).await?;
    result.elapsed = start.elapsed();
    progress.done(&result);
    Ok(result)
}

async fn finish(
    request: &GenerateRequest,
    deps: &PipelineDeps<'_>,
    store: &mut dyn StateStore,
    progress: &dyn ProgressReporter,
) -> Result<GenerateResult> {
    let start = Instant::now();

    progress.phase("Applying overrides");
    request.overrides.apply(store).await?;

    progress.phase("Assembling document");
    let state = store.read().await;
    let document = assemble(&state, deps.reference, &deps.options);

    progress.phase("Writing proposal");
    let path = request
        .output_dir
        .join(output_file_name(&request.generated_at));
    let written = write_document(&document, &path)?;

    let publish = match deps.publisher.filter(|_| request.publish) {
        Some(publisher) => {
            progress.phase("Publishing");
            match publisher
                .publish(&written.path, &publish_name(&request.generated_at))
                .await
            {
                Ok(url) => PublishStatus::Published(url),
                Err(e) => {
                    warn!(error = %e, "publish failed, keeping local proposal");
                    PublishStatus::Failed(e.to_string())
                }
            }
        }
        None => PublishStatus::Skipped,
    };

    info!(path = %written.path.display(), sha256 = %written.sha256, "proposal ready");
    Ok(GenerateResult {
        document: written,
        publish,
        extraction: None,
        input_sha256: None,
        elapsed: start.elapsed(),
    })
}
