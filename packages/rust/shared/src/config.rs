//! Application configuration for the proposal generator.
//!
//! User config lives at `~/.proposalgen/proposalgen.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProposalError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "proposalgen.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".proposalgen";

// ---------------------------------------------------------------------------
// Config structs (matching proposalgen.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// OpenRouter settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Letterhead branding.
    #[serde(default)]
    pub branding: BrandingConfig,

    /// Budget constants.
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Project-state backend.
    #[serde(default)]
    pub state: StateConfig,

    /// Blob publication.
    #[serde(default)]
    pub publish: PublishConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Where generated proposals are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory holding the reference catalogues.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory holding the logo and team photos.
    #[serde(default = "default_images_dir")]
    pub images_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            data_dir: default_data_dir(),
            images_dir: default_images_dir(),
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}
fn default_data_dir() -> String {
    "data".into()
}
fn default_images_dir() -> String {
    "images".into()
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Chat-completions base URL (any OpenAI-compatible endpoint).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used by every extraction stage.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            default_model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_timeout_secs() -> u64 {
    120
}

/// `[branding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandingConfig {
    #[serde(default = "default_company_name")]
    pub company_name: String,

    /// Logo file name, resolved against `defaults.images_dir`.
    #[serde(default = "default_logo")]
    pub logo: String,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            company_name: default_company_name(),
            logo: default_logo(),
        }
    }
}

fn default_company_name() -> String {
    "AI Advancements".into()
}
fn default_logo() -> String {
    "Logo.png".into()
}

/// `[pricing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Developer day rate used for the effort line.
    #[serde(default = "default_day_rate")]
    pub day_rate: f64,

    /// Tax applied to the total (0.10 = 10% GST).
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            day_rate: default_day_rate(),
            tax_rate: default_tax_rate(),
        }
    }
}

fn default_day_rate() -> f64 {
    1600.0
}
fn default_tax_rate() -> f64 {
    0.10
}

/// Which [`StateConfig`] backend holds the project record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// One flat JSON file.
    #[default]
    Json,
    /// libSQL database, one record per run.
    Sqlite,
}

/// `[state]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default)]
    pub backend: StateBackend,

    #[serde(default = "default_json_path")]
    pub json_path: String,

    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: StateBackend::default(),
            json_path: default_json_path(),
            db_path: default_db_path(),
        }
    }
}

fn default_json_path() -> String {
    "~/.proposalgen/state/projectinfo.json".into()
}
fn default_db_path() -> String {
    "~/.proposalgen/proposalgen.db".into()
}

/// `[publish]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Blob container URL; publishing is skipped when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_url: Option<String>,

    /// Name of the env var holding the SAS token.
    #[serde(default = "default_sas_token_env")]
    pub sas_token_env: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            container_url: None,
            sas_token_env: default_sas_token_env(),
        }
    }
}

fn default_sas_token_env() -> String {
    "AZURE_STORAGE_SAS_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.proposalgen/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ProposalError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.proposalgen/proposalgen.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ProposalError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ProposalError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ProposalError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ProposalError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ProposalError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the OpenRouter API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    read_api_key(config).map(|_| ())
}

/// Read the OpenRouter API key from the configured env var.
pub fn read_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ProposalError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
        assert!(toml_str.contains("AI Advancements"));
        assert!(!toml_str.contains("container_url"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.pricing.day_rate, 1600.0);
        assert_eq!(parsed.openrouter.api_key_env, "OPENROUTER_API_KEY");
        assert_eq!(parsed.state.backend, StateBackend::Json);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[pricing]
day_rate = 1800

[state]
backend = "sqlite"

[publish]
container_url = "https://acct.blob.core.windows.net/proposals"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.pricing.day_rate, 1800.0);
        assert!((config.pricing.tax_rate - 0.10).abs() < f64::EPSILON);
        assert_eq!(config.state.backend, StateBackend::Sqlite);
        assert_eq!(config.state.db_path, "~/.proposalgen/proposalgen.db");
        assert_eq!(
            config.publish.container_url.as_deref(),
            Some("https://acct.blob.core.windows.net/proposals")
        );
        assert_eq!(config.branding.logo, "Logo.png");
    }

    #[test]
    fn load_config_from_reports_parse_errors() {
        let path = std::env::temp_dir().join(format!("pg-config-{}.toml", uuid::Uuid::now_v7()));
        std::fs::write(&path, "[pricing\nday_rate = ").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.openrouter.api_key_env = "PG_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }

    #[test]
    fn expand_home_handles_tilde() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("relative"), PathBuf::from("relative"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/x.json"), home.join("x.json"));
        }
    }
}
