use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaserowConfig {
    #[serde(default = "default_table_url")]
    pub table_url: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default = "default_false")]
    pub debug_journal: bool,
}

/// Numeric `msgType.id` codes that select a non-default category.
///
/// These differ between Baserow deployments, so they are never hard-coded
/// outside of the defaults below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageTypeCodes {
    #[serde(default = "default_secret_code")]
    pub secret: i64,
    #[serde(default = "default_system_code")]
    pub system: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldsConfig {
    #[serde(default = "default_date_field")]
    pub date: String,
    /// Link-row fields consulted for the display name, highest priority first.
    #[serde(default = "default_name_fields")]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub baserow: BaserowConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub message_types: MessageTypeCodes,
    #[serde(default)]
    pub fields: FieldsConfig,
}

impl Default for BaserowConfig {
    fn default() -> Self {
        Self {
            table_url: default_table_url(),
            token_env: default_token_env(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            debug_journal: false,
        }
    }
}

impl Default for MessageTypeCodes {
    fn default() -> Self {
        Self {
            secret: default_secret_code(),
            system: default_system_code(),
        }
    }
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            date: default_date_field(),
            names: default_name_fields(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            baserow: BaserowConfig::default(),
            output: OutputConfig::default(),
            message_types: MessageTypeCodes::default(),
            fields: FieldsConfig::default(),
        }
    }
}

fn default_table_url() -> String {
    "https://showcase.newhideaway.com/api/database/rows/table/787/".to_string()
}

fn default_token_env() -> String {
    "BASEROW_TOKEN".to_string()
}

fn default_timeout_seconds() -> f64 {
    30.0
}

fn default_output_dir() -> String {
    "content/messages".to_string()
}

fn default_secret_code() -> i64 {
    4753
}

fn default_system_code() -> i64 {
    4754
}

fn default_date_field() -> String {
    "Send-Date".to_string()
}

fn default_name_fields() -> Vec<String> {
    vec![
        "nickname".to_string(),
        "characterlink".to_string(),
        "character".to_string(),
    ]
}

fn default_false() -> bool {
    false
}

pub fn expand_path(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{}", home.to_string_lossy(), stripped);
        }
    }
    path.to_string()
}

fn home_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".hideaway").join("config.toml"))
}

fn repo_default_config_path() -> PathBuf {
    PathBuf::from("config/hideaway.toml")
}

/// Where the configuration came from, so callers can tell an explicit request
/// apart from a fallback that may legitimately be missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLocation {
    Explicit(PathBuf),
    Discovered(PathBuf),
    Defaults,
}

fn resolve_config_location_with_overrides(
    raw_path: Option<PathBuf>,
    env_keys: &[&str],
    home_path: Option<PathBuf>,
    repo_default: PathBuf,
) -> ConfigLocation {
    if let Some(path) = raw_path {
        return ConfigLocation::Explicit(path);
    }

    for key in env_keys {
        if let Ok(value) = std::env::var(key) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return ConfigLocation::Explicit(PathBuf::from(trimmed));
            }
        }
    }

    if let Some(path) = home_path {
        if path.exists() {
            return ConfigLocation::Discovered(path);
        }
    }

    if repo_default.exists() {
        return ConfigLocation::Discovered(repo_default);
    }

    ConfigLocation::Defaults
}

pub fn resolve_config_location(raw_path: Option<PathBuf>) -> ConfigLocation {
    resolve_config_location_with_overrides(
        raw_path,
        &["HIDEAWAY_CONFIG"],
        home_config_path(),
        repo_default_config_path(),
    )
}

fn normalize_config(mut cfg: AppConfig) -> Result<AppConfig> {
    let timeout = cfg.baserow.timeout_seconds;
    if !timeout.is_finite() || timeout <= 0.0 {
        bail!("baserow.timeout_seconds must be a positive number, got {timeout}");
    }
    cfg.output.dir = expand_path(&cfg.output.dir);
    cfg.fields.names.retain(|name| !name.trim().is_empty());
    Ok(cfg)
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read config {}", path.as_ref().display()))?;
    let cfg: AppConfig = toml::from_str(&content).context("failed to parse TOML config")?;
    normalize_config(cfg)
}

pub fn load_config_from(location: &ConfigLocation) -> Result<AppConfig> {
    match location {
        ConfigLocation::Explicit(path) | ConfigLocation::Discovered(path) => load_config(path),
        ConfigLocation::Defaults => normalize_config(AppConfig::default()),
    }
}
