//! Configuration and settings management
//!
//! Settings are layered from optional `config/*` files and the environment.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default location of the SQLite database file.
pub const DEFAULT_DATABASE_PATH: &str = "data/bot.sqlite3";
/// Default plug-in manifest directory.
pub const DEFAULT_COMMANDS_DIR: &str = "commands";
/// Default command prefix.
pub const DEFAULT_COMMAND_PREFIX: &str = "/";
/// Default bound on outstanding pending interactions.
pub const DEFAULT_PENDING_MAX_CAPACITY: u64 = 10_000;
/// Special database path selecting the volatile in-memory backend.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Build the layered configuration source shared by every settings struct.
///
/// Order (later wins): `config/default`, `config/{RUN_MODE}`, `config/local`,
/// `APP__*` environment, plain environment variables.
///
/// # Errors
///
/// Returns a `ConfigError` if a present source cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Environment::default() maps UPPER_SNAKE_CASE to snake_case keys
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

/// Dispatcher, registry and storage settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoreSettings {
    /// SQLite file path, or `:memory:` for a volatile store.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory scanned for command manifests.
    #[serde(default = "default_commands_dir")]
    pub commands_dir: PathBuf,

    /// Manifest files to skip (comma/semicolon/whitespace separated).
    #[serde(rename = "commands_skip")]
    pub commands_skip_str: Option<String>,

    /// Prefix that introduces a command token.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Log every inbound non-command message.
    #[serde(default)]
    pub log_messages: bool,

    /// Maximum number of outstanding pending interactions.
    #[serde(default = "default_pending_max_capacity")]
    pub pending_max_capacity: u64,

    /// Optional expiry for pending interactions.
    pub pending_ttl_secs: Option<u64>,

    /// Serialize read-modify-write updates per entity id.
    #[serde(default = "default_true")]
    pub serialize_entity_updates: bool,
}

fn default_database_path() -> String {
    DEFAULT_DATABASE_PATH.to_string()
}

fn default_commands_dir() -> PathBuf {
    PathBuf::from(DEFAULT_COMMANDS_DIR)
}

fn default_command_prefix() -> String {
    DEFAULT_COMMAND_PREFIX.to_string()
}

const fn default_pending_max_capacity() -> u64 {
    DEFAULT_PENDING_MAX_CAPACITY
}

const fn default_true() -> bool {
    true
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            commands_dir: default_commands_dir(),
            commands_skip_str: None,
            command_prefix: default_command_prefix(),
            log_messages: false,
            pending_max_capacity: DEFAULT_PENDING_MAX_CAPACITY,
            pending_ttl_secs: None,
            serialize_entity_updates: true,
        }
    }
}

impl CoreSettings {
    /// Load settings from files and environment.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        build_config()?.try_deserialize()
    }

    /// Manifest file names excluded from loading.
    #[must_use]
    pub fn commands_skip(&self) -> Vec<String> {
        self.commands_skip_str
            .as_deref()
            .map(|s| {
                s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                    .filter(|token| !token.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the volatile in-memory store is selected.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.database_path == IN_MEMORY_DATABASE
    }
}
