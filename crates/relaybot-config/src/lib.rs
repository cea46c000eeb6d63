use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use relaybot_types::{ConcurrencyPolicy, DuplicatePolicy};

/// Environment variable that overrides `discord.bot_token`.
pub const TOKEN_ENV: &str = "DISCORD_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
}

/// Discord connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token. `DISCORD_TOKEN` takes precedence when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    /// Gateway intent names (e.g. "guilds", "guild_members").
    #[serde(default = "default_intents")]
    pub intents: Vec<String>,
}

fn default_intents() -> Vec<String> {
    ["guilds", "guild_members", "guild_moderation", "guild_messages"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            intents: default_intents(),
        }
    }
}

/// Component dispatch table policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentConfig {
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    #[serde(default)]
    pub concurrency: ConcurrencyPolicy,
    /// Expiry applied to registrations that don't set their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_ttl_secs: Option<u64>,
    /// Answer interactions for unknown custom ids with `stale_message`.
    /// When false they are left for other listeners.
    #[serde(default = "default_true")]
    pub claim_unknown: bool,
    #[serde(default = "default_stale_message")]
    pub stale_message: String,
    /// Reply when a component is clicked while its handler is still running.
    #[serde(default = "default_busy_message")]
    pub busy_message: String,
}

fn default_true() -> bool {
    true
}

fn default_stale_message() -> String {
    "This is no longer active.".to_string()
}

fn default_busy_message() -> String {
    "This is already being processed.".to_string()
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::default(),
            concurrency: ConcurrencyPolicy::default(),
            default_ttl_secs: None,
            claim_unknown: true,
            stale_message: default_stale_message(),
            busy_message: default_busy_message(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Top-level relaybot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayBotConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub components: ComponentConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl RelayBotConfig {
    /// Copy with the bot token masked, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.discord.bot_token.is_some() {
            config.discord.bot_token = Some("<redacted>".to_string());
        }
        config
    }
}

/// Resolve the relaybot config directory (~/.relaybot/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".relaybot"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.relaybot/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Where a loaded configuration came from. Lets the binary report it once
/// logging is initialised, since loading happens before that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// False when `path` did not exist and defaults were used.
    pub file_found: bool,
    /// Whether `DISCORD_TOKEN` supplied the bot token.
    pub token_from_env: bool,
}

/// Load configuration from `path`, or from the default location when `None`.
///
/// Loads `.env` first, then applies environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<RelayBotConfig, ConfigError> {
    load_config_with_source(path).map(|(config, _)| config)
}

/// Like [`load_config`], also reporting where the configuration came from.
pub fn load_config_with_source(
    path: Option<&Path>,
) -> Result<(RelayBotConfig, ConfigSource), ConfigError> {
    let _ = dotenvy::dotenv();

    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };
    let file_found = path.exists();
    let mut config = load_config_from(&path)?;
    let token_from_env = apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok((
        config,
        ConfigSource {
            path,
            file_found,
            token_from_env,
        },
    ))
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<RelayBotConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(RelayBotConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: RelayBotConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
///
/// Returns whether the bot token was taken from the environment.
pub fn apply_env_overrides<F>(config: &mut RelayBotConfig, lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
        Some(token) => {
            tracing::debug!("Using bot token from {TOKEN_ENV}");
            config.discord.bot_token = Some(token);
            true
        }
        None => false,
    }
}
