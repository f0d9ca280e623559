//! Command plug-ins.
//!
//! A command is a YAML manifest in the commands directory whose
//! `entry_point` names a compiled [`CommandHandler`] in the
//! [`HandlerCatalog`]. The [`CommandRegistry`] indexes loaded commands by
//! name and alias.

pub mod builtin;
mod catalog;
mod manifest;
mod registry;

pub use catalog::HandlerCatalog;
pub use manifest::{CommandConfig, CommandManifest};
pub use registry::{CommandRegistry, LoadFailure, RegistryReport};

use crate::dispatch::RequestContext;
use crate::pending::PendingInteraction;
use crate::event::Sender;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Placeholder in `usage` replaced by the prefixed command name.
pub const USAGE_NAME_PLACEHOLDER: &str = "{pn}";

/// Errors produced while loading a command manifest.
#[derive(Debug, Error)]
pub enum CommandLoadError {
    /// The manifest file could not be read.
    #[error("Failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
    /// The manifest is not valid YAML for the expected shape.
    #[error("Invalid manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// `config.name` is missing or empty.
    #[error("Manifest is missing `config.name`")]
    MissingName,
    /// `entry_point` is missing or empty.
    #[error("Manifest is missing `entry_point`")]
    MissingEntryPoint,
    /// A name or alias cannot be typed as a command.
    #[error("Invalid command token `{0}`")]
    InvalidToken(String),
    /// No compiled handler is registered under the entry point.
    #[error("Unknown entry point `{0}`")]
    UnknownEntryPoint(String),
    /// The name is already owned by another command.
    #[error("Command name `{name}` is already registered by `{owner}`")]
    NameTaken {
        /// Rejected name.
        name: String,
        /// Command that owns it.
        owner: String,
    },
    /// An alias is already owned by another command.
    #[error("Alias `{alias}` is already registered by `{owner}`")]
    AliasTaken {
        /// Rejected alias.
        alias: String,
        /// Command that owns it.
        owner: String,
    },
}

/// A registered command.
pub struct CommandDescriptor {
    /// Name, aliases and free-form metadata.
    pub config: CommandConfig,
    /// Catalog id the handler was bound from.
    pub entry_point: String,
    /// Compiled handler.
    pub handler: Arc<dyn CommandHandler>,
    /// Manifest the command was loaded from.
    pub source: PathBuf,
}

impl CommandDescriptor {
    /// Canonical (lower-cased) name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Usage line with the name placeholder expanded.
    #[must_use]
    pub fn usage(&self, prefix: &str) -> Option<String> {
        self.config.usage.as_deref().map(|usage| {
            usage.replace(USAGE_NAME_PLACEHOLDER, &format!("{prefix}{}", self.name()))
        })
    }
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("config", &self.config)
            .field("entry_point", &self.entry_point)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Everything a handler receives for one command message.
pub struct Invocation {
    /// Helper bound to the triggering message.
    pub ctx: RequestContext,
    /// Whitespace-separated arguments after the token.
    pub args: Vec<String>,
    /// Token as typed, lower-cased (may be an alias).
    pub token: String,
    /// The resolved command.
    pub command: Arc<CommandDescriptor>,
}

/// Input that resumed a pending interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUpInput {
    /// An inline button was pressed.
    Callback {
        /// Who pressed it.
        sender: Sender,
        /// Button payload.
        data: Option<String>,
    },
    /// The author replied with text.
    Reply {
        /// Reply text.
        text: String,
    },
}

/// A resumed interaction.
pub struct FollowUp {
    /// Helper bound to the originating message for callbacks, or to the
    /// reply message for text replies.
    pub ctx: RequestContext,
    /// Stored interaction metadata.
    pub interaction: Arc<PendingInteraction>,
    /// What resumed it.
    pub input: FollowUpInput,
}

/// Capability implemented by every command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Run the command.
    async fn execute(&self, invocation: Invocation) -> anyhow::Result<()>;

    /// Resume a pending interaction registered by this command.
    async fn on_follow_up(&self, follow_up: FollowUp) -> anyhow::Result<()> {
        let _ = follow_up;
        Ok(())
    }
}
