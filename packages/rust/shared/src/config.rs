//! Application configuration for alignwatch.
//!
//! User config lives at `~/.alignwatch/alignwatch.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AlignwatchError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "alignwatch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".alignwatch";

// ---------------------------------------------------------------------------
// Config structs (matching alignwatch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Results server connection.
    #[serde(default)]
    pub server: ServerConfig,

    /// Endpoint path templates.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Status polling schedule.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Sequence highlighting.
    #[serde(default)]
    pub highlight: HighlightConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL all endpoint templates are resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Name of the env var holding a bearer token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            token_env: default_token_env(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_token_env() -> String {
    "ALIGNWATCH_TOKEN".into()
}

/// `[endpoints]` section. `{job_id}`, `{target}`, `{input}` and `{key}`
/// are substituted per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_status_path")]
    pub status: String,
    #[serde(default = "default_artifact_path")]
    pub artifact: String,
    #[serde(default = "default_hits_path")]
    pub hits: String,
    #[serde(default = "default_frames_path")]
    pub frames: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            status: default_status_path(),
            artifact: default_artifact_path(),
            hits: default_hits_path(),
            frames: default_frames_path(),
        }
    }
}

fn default_status_path() -> String {
    "status/{job_id}".into()
}
fn default_artifact_path() -> String {
    "retrieveArtifact?key={key}".into()
}
fn default_hits_path() -> String {
    "hits/{job_id}/{target}".into()
}
fn default_frames_path() -> String {
    "frames/{job_id}/{input}".into()
}

/// `[polling]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay before the very first status check.
    #[serde(default = "default_warmup_delay_ms")]
    pub warmup_delay_ms: u64,

    /// Delay after the first non-terminal status.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Multiplier applied after every non-terminal status.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Upper bound for the delay between checks.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            warmup_delay_ms: default_warmup_delay_ms(),
            base_delay_ms: default_base_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_warmup_delay_ms() -> u64 {
    1_000
}
fn default_base_delay_ms() -> u64 {
    2_000
}
fn default_backoff_factor() -> f64 {
    1.5
}
fn default_max_delay_ms() -> u64 {
    30_000
}

/// `[highlight]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// How long a copied span stays marked as copied.
    #[serde(default = "default_copy_reset_ms")]
    pub copy_reset_ms: u64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            copy_reset_ms: default_copy_reset_ms(),
        }
    }
}

fn default_copy_reset_ms() -> u64 {
    2_000
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime polling schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub warmup_delay: Duration,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl PollConfig {
    /// Reject schedules that could not back off monotonically.
    pub fn validate(&self) -> Result<()> {
        if self.warmup_delay.is_zero() || self.base_delay.is_zero() || self.max_delay.is_zero() {
            return Err(AlignwatchError::config("poll delays must be positive"));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor <= 1.0 {
            return Err(AlignwatchError::config(format!(
                "backoff_factor must be > 1 (got {})",
                self.backoff_factor
            )));
        }
        if self.warmup_delay >= self.base_delay {
            return Err(AlignwatchError::config(
                "warmup_delay_ms must be shorter than base_delay_ms",
            ));
        }
        if self.max_delay < self.base_delay {
            return Err(AlignwatchError::config(
                "max_delay_ms must not be below base_delay_ms",
            ));
        }
        Ok(())
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollConfig {
    fn from(config: &PollingConfig) -> Self {
        Self {
            warmup_delay: Duration::from_millis(config.warmup_delay_ms),
            base_delay: Duration::from_millis(config.base_delay_ms),
            backoff_factor: config.backoff_factor,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Runtime HTTP client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, always ending in `/` so templates join as relative paths.
    pub base_url: Url,
    pub timeout: Duration,
    /// Bearer token for requests to the results server itself.
    pub token: Option<String>,
    pub endpoints: EndpointsConfig,
}

impl ClientConfig {
    /// Build a client config for `base_url` with default endpoints.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            timeout: Duration::from_secs(default_timeout_secs()),
            token: None,
            endpoints: EndpointsConfig::default(),
        })
    }

    /// Resolve from the app config, reading the token from the configured env var.
    pub fn from_app(config: &AppConfig) -> Result<Self> {
        let token = std::env::var(&config.server.token_env)
            .ok()
            .filter(|t| !t.is_empty());
        Ok(Self {
            base_url: parse_base_url(&config.server.base_url)?,
            timeout: Duration::from_secs(config.server.timeout_secs),
            token,
            endpoints: config.endpoints.clone(),
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)
        .map_err(|e| AlignwatchError::config(format!("invalid base_url '{raw}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(AlignwatchError::config(format!(
            "base_url '{raw}' cannot be used as a base"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.alignwatch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AlignwatchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.alignwatch/alignwatch.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| AlignwatchError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        AlignwatchError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AlignwatchError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AlignwatchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AlignwatchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
