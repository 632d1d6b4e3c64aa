//! MCP server exposing proposal generation as a single tool over stdio.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use proposalgen_core::assembler::AssembleOptions;
use proposalgen_core::completion::CompletionClient;
use proposalgen_core::pipeline::{self, GenerateRequest, PipelineDeps, SilentProgress, input_digest};
use proposalgen_core::publish::{PublishStatus, Publisher};
use proposalgen_reference::ReferenceData;
use proposalgen_shared::AppConfig;
use proposalgen_storage::{JsonStateStore, Storage};

/// Reply for blank tool input.
pub(crate) const NO_INPUT: &str = "No input provided.";

// ---------------------------------------------------------------------------
// Tool parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct GenerateProposalParams {
    #[schemars(description = "Free-form project notes, brief or meeting transcript")]
    pub user_input: String,
}

// ---------------------------------------------------------------------------
// ProposalService
// ---------------------------------------------------------------------------

/// Where tool calls keep their project record.
pub(crate) enum ProposalState {
    /// The shared JSON file; calls are serialized on the lock.
    File(Mutex<JsonStateStore>),
    /// One libSQL run per call.
    Runs(Storage),
}

/// Everything a tool call needs to run the pipeline.
pub(crate) struct ProposalService {
    pub config: AppConfig,
    pub client: Box<dyn CompletionClient>,
    pub reference: ReferenceData,
    pub publisher: Option<Box<dyn Publisher>>,
    pub state: ProposalState,
    pub output_dir: PathBuf,
}

impl ProposalService {
    /// Run the full pipeline and return the user-facing publish message.
    ///
    /// The local file is removed once it has been uploaded.
    pub(crate) async fn generate_proposal(&self, user_input: &str) -> proposalgen_shared::Result<String> {
        let input = user_input.trim();
        if input.is_empty() {
            return Ok(NO_INPUT.to_string());
        }

        let generated_at = chrono::Local::now().naive_local();
        let request = GenerateRequest {
            input: input.to_string(),
            overrides: Default::default(),
            output_dir: self.output_dir.clone(),
            generated_at,
            publish: true,
        };
        let deps = PipelineDeps {
            client: self.client.as_ref(),
            reference: &self.reference,
            publisher: self.publisher.as_deref(),
            options: AssembleOptions::from_config(&self.config, generated_at.date()),
        };

        let result = match &self.state {
            ProposalState::File(store) => {
                let mut store = store.lock().await;
                pipeline::generate(&request, &deps, &mut *store, &SilentProgress).await?
            }
            ProposalState::Runs(storage) => {
                let run_id = storage.create_run(&input_digest(input)).await?;
                let mut store = storage.run_store(run_id);
                pipeline::generate(&request, &deps, &mut store, &SilentProgress).await?
            }
        };

        if matches!(result.publish, PublishStatus::Published(_)) {
            let path = &result.document.path;
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed local proposal"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove local proposal"),
            }
        }

        Ok(result.publish.to_string())
    }
}

// ---------------------------------------------------------------------------
// ProposalMcpServer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct ProposalMcpServer {
    service: Arc<ProposalService>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ProposalMcpServer {
    pub(crate) fn new(service: ProposalService) -> Self {
        Self {
            service: Arc::new(service),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Generate a formatted .docx project proposal from free-form project notes and return where to download it"
    )]
    async fn get_generated_proposal(
        &self,
        Parameters(p): Parameters<GenerateProposalParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match self.service.generate_proposal(&p.user_input).await {
            Ok(message) => Ok(CallToolResult::success(vec![Content::text(message)])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Error generating proposal: {e}"
            ))])),
        }
    }
}

#[tool_handler]
impl ServerHandler for ProposalMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Proposal generator: turns project notes into a formatted .docx proposal".into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Serve on stdin/stdout until the client disconnects.
pub(crate) async fn serve_stdio(service: ProposalService) -> color_eyre::eyre::Result<()> {
    info!("proposal MCP server starting on stdio");
    let running = ProposalMcpServer::new(service)
        .serve(rmcp::transport::stdio())
        .await?;
    running.waiting().await?;
    Ok(())
}
