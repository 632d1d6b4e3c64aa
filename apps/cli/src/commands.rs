//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use proposalgen_core::assembler::AssembleOptions;
use proposalgen_core::completion::OpenRouterClient;
use proposalgen_core::extraction::{ExtractionProgress, Extractor, StageOutcome};
use proposalgen_core::pipeline::{
    BasicInfoOverrides, GenerateRequest, GenerateResult, PipelineDeps, ProgressReporter,
    input_digest,
};
use proposalgen_core::publish::{AzureBlobPublisher, Publisher};
use proposalgen_reference::ReferenceData;
use proposalgen_shared::{
    AppConfig, FieldKey, RunId, StateBackend, expand_home, init_config, load_config,
};
use proposalgen_storage::{JsonStateStore, StateStore, Storage};

use crate::mcp::{ProposalService, ProposalState, serve_stdio};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// proposalgen: generate client proposals from a project brief.
#[derive(Parser)]
#[command(
    name = "proposalgen",
    version,
    about = "Extract proposal fields from a project brief and render a formatted .docx proposal.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Where the project brief comes from. Stdin is read when neither is given.
#[derive(Args, Debug, Default)]
pub(crate) struct InputArgs {
    /// Read the brief from a file.
    #[arg(short, long, conflicts_with = "text")]
    pub input: Option<PathBuf>,

    /// Pass the brief inline.
    #[arg(short, long)]
    pub text: Option<String>,
}

/// Manual BASIC_INFO values that replace extracted ones.
#[derive(Args, Debug, Default)]
pub(crate) struct OverrideArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub manager: Option<String>,
    #[arg(long)]
    pub author: Option<String>,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

impl From<OverrideArgs> for BasicInfoOverrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            project_title: args.title,
            company_name: args.company,
            client: args.client,
            project_manager: args.manager,
            author: args.author,
            start_date: args.start,
            end_date: args.end,
            project_description: args.description,
        }
    }
}

/// Output and publishing flags shared by `generate` and `render`.
#[derive(Args, Debug, Default)]
pub(crate) struct OutputArgs {
    /// Output directory (defaults to `defaults.output_dir`).
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Do not upload the proposal even if publishing is configured.
    #[arg(long)]
    pub no_publish: bool,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract fields from a brief and write the proposal.
    Generate {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        overrides: OverrideArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// OpenRouter model ID (defaults to `openrouter.default_model`).
        #[arg(long)]
        model: Option<String>,
    },

    /// Reset the project state and extract fields only; prints the state JSON.
    Extract {
        #[command(flatten)]
        input: InputArgs,

        /// OpenRouter model ID (defaults to `openrouter.default_model`).
        #[arg(long)]
        model: Option<String>,
    },

    /// Write a proposal from the stored project state.
    Render {
        /// Run to render (sqlite backend; defaults to the latest run).
        #[arg(long)]
        run: Option<String>,

        #[command(flatten)]
        overrides: OverrideArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Inspect or reset the stored project state.
    State {
        #[command(subcommand)]
        action: StateAction,
    },

    /// Extraction runs recorded by the sqlite backend.
    Runs {
        #[command(subcommand)]
        action: RunsAction,
    },

    /// MCP server exposing proposal generation as a tool.
    #[command(name = "mcp")]
    Mcp {
        #[command(subcommand)]
        action: McpAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// State subcommands.
#[derive(Subcommand)]
pub(crate) enum StateAction {
    /// Print the project state as JSON.
    Show {
        #[arg(long)]
        run: Option<String>,
    },
    /// Reset the project state to its defaults.
    Reset {
        #[arg(long)]
        run: Option<String>,
    },
}

/// Runs subcommands.
#[derive(Subcommand)]
pub(crate) enum RunsAction {
    /// List recorded runs, newest first.
    List,
}

/// MCP subcommands.
#[derive(Subcommand)]
pub(crate) enum McpAction {
    /// Serve the `get_generated_proposal` tool over stdio.
    Serve {
        /// Output directory (defaults to `defaults.output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "proposalgen=info",
        1 => "proposalgen=debug",
        _ => "proposalgen=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate {
            input,
            overrides,
            output,
            model,
        } => cmd_generate(input, overrides.into(), output, model).await,
        Command::Extract { input, model } => cmd_extract(input, model).await,
        Command::Render {
            run,
            overrides,
            output,
        } => cmd_render(run.as_deref(), overrides.into(), output).await,
        Command::State { action } => match action {
            StateAction::Show { run } => cmd_state_show(run.as_deref()).await,
            StateAction::Reset { run } => cmd_state_reset(run.as_deref()).await,
        },
        Command::Runs { action } => match action {
            RunsAction::List => cmd_runs_list().await,
        },
        Command::Mcp { action } => match action {
            McpAction::Serve { out } => cmd_mcp_serve(out).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

/// Read the brief from `--input`, `--text` or stdin.
fn read_input(args: &InputArgs) -> Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if let Some(path) = &args.input {
        return std::fs::read_to_string(path)
            .map_err(|e| eyre!("cannot read input file '{}': {e}", path.display()));
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .map_err(|e| eyre!("cannot read input from stdin: {e}"))?;
    Ok(buf)
}

fn completion_client(config: &AppConfig, model: Option<String>) -> Result<OpenRouterClient> {
    let mut config = config.clone();
    if let Some(model) = model {
        config.openrouter.default_model = model;
    }
    let client = OpenRouterClient::from_config(&config)?;
    info!(model = client.model(), "using completion model");
    Ok(client)
}

fn reference_data(config: &AppConfig) -> ReferenceData {
    ReferenceData::load(&expand_home(&config.defaults.data_dir))
}

/// Configured publisher, or `None` when publishing is off or unavailable.
fn publisher(config: &AppConfig, no_publish: bool) -> Option<AzureBlobPublisher> {
    if no_publish {
        return None;
    }
    match AzureBlobPublisher::from_config(config) {
        Ok(publisher) => publisher,
        Err(e) => {
            warn!(error = %e, "publishing disabled");
            None
        }
    }
}

fn output_dir(config: &AppConfig, out: Option<PathBuf>) -> PathBuf {
    out.unwrap_or_else(|| expand_home(&config.defaults.output_dir))
}

fn parse_run(run: &str) -> Result<RunId> {
    run.parse()
        .map_err(|e| eyre!("invalid run id '{run}': {e}"))
}

async fn open_storage(config: &AppConfig) -> Result<Storage> {
    Ok(Storage::open(&expand_home(&config.state.db_path)).await?)
}

/// The requested run, or the latest one.
async fn resolve_run(storage: &Storage, run: Option<&str>) -> Result<RunId> {
    match run {
        Some(run) => parse_run(run),
        None => storage
            .latest_run()
            .await?
            .ok_or_else(|| eyre!("no runs recorded yet; run `proposalgen generate` first")),
    }
}

fn warn_run_ignored(run: Option<&str>) {
    if run.is_some() {
        warn!("--run only applies to the sqlite state backend; ignoring");
    }
}

// ---------------------------------------------------------------------------
// generate / extract / render
// ---------------------------------------------------------------------------

async fn cmd_generate(
    input: InputArgs,
    overrides: BasicInfoOverrides,
    output: OutputArgs,
    model: Option<String>,
) -> Result<()> {
    let config = load_config()?;
    let input = read_input(&input)?;
    let client = completion_client(&config, model)?;
    let reference = reference_data(&config);
    let publisher = publisher(&config, output.no_publish);

    let generated_at = chrono::Local::now().naive_local();
    let request = GenerateRequest {
        input,
        overrides,
        output_dir: output_dir(&config, output.out),
        generated_at,
        publish: !output.no_publish,
    };
    let deps = PipelineDeps {
        client: &client,
        reference: &reference,
        publisher: publisher.as_ref().map(|p| p as &dyn Publisher),
        options: AssembleOptions::from_config(&config, generated_at.date()),
    };

    let reporter = CliProgress::new();
    let result = match config.state.backend {
        StateBackend::Json => {
            let mut store = JsonStateStore::new(expand_home(&config.state.json_path));
            proposalgen_core::pipeline::generate(&request, &deps, &mut store, &reporter).await?
        }
        StateBackend::Sqlite => {
            let storage = open_storage(&config).await?;
            let run_id = storage.create_run(&input_digest(&request.input)).await?;
            info!(%run_id, "recording run");
            let mut store = storage.run_store(run_id);
            proposalgen_core::pipeline::generate(&request, &deps, &mut store, &reporter).await?
        }
    };

    print_result(&result);
    Ok(())
}

async fn cmd_extract(input: InputArgs, model: Option<String>) -> Result<()> {
    let config = load_config()?;
    let input = read_input(&input)?;
    if input.trim().is_empty() {
        return Err(eyre!("no input provided"));
    }
    let client = completion_client(&config, model)?;
    let reference = reference_data(&config);
    let extractor = Extractor::new(&client, &reference);
    let progress = CliProgress::new();

    let state = match config.state.backend {
        StateBackend::Json => {
            let mut store = JsonStateStore::new(expand_home(&config.state.json_path));
            store.reset().await?;
            extractor.extract(&input, &mut store, &progress).await?;
            store.read().await
        }
        StateBackend::Sqlite => {
            let storage = open_storage(&config).await?;
            let run_id = storage.create_run(&input_digest(&input)).await?;
            let mut store = storage.run_store(run_id.clone());
            store.reset().await?;
            extractor.extract(&input, &mut store, &progress).await?;
            eprintln!("  Run: {run_id}");
            store.read().await
        }
    };
    progress.spinner.finish_and_clear();

    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

async fn cmd_render(
    run: Option<&str>,
    overrides: BasicInfoOverrides,
    output: OutputArgs,
) -> Result<()> {
    let config = load_config()?;
    let reference = reference_data(&config);
    let publisher = publisher(&config, output.no_publish);
    // Rendering never calls the completion service.
    let client = proposalgen_core::completion::MockCompletionClient::failing();

    let generated_at = chrono::Local::now().naive_local();
    let request = GenerateRequest {
        input: String::new(),
        overrides,
        output_dir: output_dir(&config, output.out),
        generated_at,
        publish: !output.no_publish,
    };
    let deps = PipelineDeps {
        client: &client,
        reference: &reference,
        publisher: publisher.as_ref().map(|p| p as &dyn Publisher),
        options: AssembleOptions::from_config(&config, generated_at.date()),
    };

    let reporter = CliProgress::new();
    let result = match config.state.backend {
        StateBackend::Json => {
            warn_run_ignored(run);
            let mut store = JsonStateStore::new(expand_home(&config.state.json_path));
            proposalgen_core::pipeline::render(&request, &deps, &mut store, &reporter).await?
        }
        StateBackend::Sqlite => {
            let storage = open_storage(&config).await?;
            let run_id = resolve_run(&storage, run).await?;
            let mut store = storage.run_store(run_id);
            proposalgen_core::pipeline::render(&request, &deps, &mut store, &reporter).await?
        }
    };

    print_result(&result);
    Ok(())
}

fn print_result(result: &GenerateResult) {
    println!();
    println!("  {}", result.publish);
    println!("  Path:    {}", result.document.path.display());
    println!("  SHA-256: {}", result.document.sha256);
    println!("  Size:    {} bytes", result.document.size_bytes);
    if let Some(report) = &result.extraction {
        println!("  Fields:");
        for (key, outcome) in &report.outcomes {
            match outcome {
                StageOutcome::Extracted => println!("    {:<20} extracted", key.as_str()),
                StageOutcome::Defaulted { reason } => {
                    println!("    {:<20} defaulted ({reason})", key.as_str())
                }
            }
        }
    }
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// state / runs
// ---------------------------------------------------------------------------

async fn cmd_state_show(run: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let state = match config.state.backend {
        StateBackend::Json => {
            warn_run_ignored(run);
            JsonStateStore::new(expand_home(&config.state.json_path))
                .read()
                .await
        }
        StateBackend::Sqlite => {
            let storage = Storage::open_readonly(&expand_home(&config.state.db_path)).await?;
            let run_id = resolve_run(&storage, run).await?;
            storage.run_store(run_id).read().await
        }
    };
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

async fn cmd_state_reset(run: Option<&str>) -> Result<()> {
    let config = load_config()?;
    match config.state.backend {
        StateBackend::Json => {
            warn_run_ignored(run);
            let path = expand_home(&config.state.json_path);
            JsonStateStore::new(&path).reset().await?;
            println!("Project state reset at: {}", path.display());
        }
        StateBackend::Sqlite => {
            let storage = open_storage(&config).await?;
            let run_id = resolve_run(&storage, run).await?;
            storage.run_store(run_id.clone()).reset().await?;
            println!("Project state reset for run: {run_id}");
        }
    }
    Ok(())
}

async fn cmd_runs_list() -> Result<()> {
    let config = load_config()?;
    let db_path = expand_home(&config.state.db_path);
    if !Path::new(&db_path).exists() {
        println!("No runs recorded.");
        return Ok(());
    }

    let storage = Storage::open_readonly(&db_path).await?;
    let runs = storage.list_runs().await?;
    if runs.is_empty() {
        println!("No runs recorded.");
        return Ok(());
    }

    println!("{:<38} {:<27} {:>6}  INPUT", "ID", "CREATED", "FIELDS");
    for run in runs {
        let digest: String = run.input_sha256.chars().take(12).collect();
        println!(
            "{:<38} {:<27} {:>6}  {digest}",
            run.id, run.created_at, run.fields
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// mcp
// ---------------------------------------------------------------------------

async fn cmd_mcp_serve(out: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let client = completion_client(&config, None)?;
    let reference = reference_data(&config);
    let publisher = publisher(&config, false);
    if publisher.is_none() {
        warn!("publishing is not configured; proposals stay in the output directory");
    }

    let state = match config.state.backend {
        StateBackend::Json => ProposalState::File(tokio::sync::Mutex::new(JsonStateStore::new(
            expand_home(&config.state.json_path),
        ))),
        StateBackend::Sqlite => ProposalState::Runs(open_storage(&config).await?),
    };

    let service = ProposalService {
        output_dir: output_dir(&config, out),
        client: Box::new(client),
        reference,
        publisher: publisher.map(|p| Box::new(p) as Box<dyn Publisher>),
        state,
        config,
    };
    serve_stdio(service).await
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn stage(&self, field: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Extracting [{current}/{total}] {field}"));
    }

    fn done(&self, _result: &GenerateResult) {
        self.spinner.finish_and_clear();
    }
}

impl ExtractionProgress for CliProgress {
    fn stage_started(&self, key: FieldKey, current: usize, total: usize) {
        self.stage(key.as_str(), current, total);
    }

    fn stage_finished(&self, _key: FieldKey, _outcome: &StageOutcome) {}
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
