//! Command manifest format.

use super::CommandLoadError;
use lazy_regex::regex_is_match;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// `config` block of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandConfig {
    /// Command name.
    #[serde(default)]
    pub name: String,
    /// Alternative tokens.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// One-line description.
    pub description: Option<String>,
    /// Usage text; `{pn}` expands to the prefixed name.
    pub usage: Option<String>,
    /// Grouping used by `help`.
    pub category: Option<String>,
    /// Cooldown in seconds (informational).
    pub cooldown: Option<u64>,
    /// Author credit.
    pub author: Option<String>,
}

/// A parsed manifest file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandManifest {
    /// Command metadata.
    #[serde(default)]
    pub config: CommandConfig,
    /// Handler catalog id.
    #[serde(default)]
    pub entry_point: Option<String>,
}

impl CommandManifest {
    /// Parse manifest text.
    ///
    /// # Errors
    ///
    /// `Yaml` on malformed input.
    pub fn parse(raw: &str) -> Result<Self, CommandLoadError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Read and parse a manifest file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Yaml` if it does not parse.
    pub fn from_file(path: &Path) -> Result<Self, CommandLoadError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Check the contract and normalise tokens to lower case.
    ///
    /// Aliases repeating the name or each other are dropped.
    ///
    /// # Errors
    ///
    /// `MissingName`, `MissingEntryPoint` or `InvalidToken`.
    pub fn validate(mut self) -> Result<(CommandConfig, String), CommandLoadError> {
        let name = self.config.name.trim().to_lowercase();
        if name.is_empty() {
            return Err(CommandLoadError::MissingName);
        }
        ensure_token(&name)?;

        let entry_point = self
            .entry_point
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .ok_or(CommandLoadError::MissingEntryPoint)?;

        let mut aliases: Vec<String> = Vec::with_capacity(self.config.aliases.len());
        for alias in &self.config.aliases {
            let alias = alias.trim().to_lowercase();
            ensure_token(&alias)?;
            if alias != name && !aliases.contains(&alias) {
                aliases.push(alias);
            }
        }

        self.config.name = name;
        self.config.aliases = aliases;
        Ok((self.config, entry_point))
    }
}

// Same word class the dispatcher's command pattern captures.
fn ensure_token(token: &str) -> Result<(), CommandLoadError> {
    if regex_is_match!(r"^\w+$", token) {
        Ok(())
    } else {
        Err(CommandLoadError::InvalidToken(token.to_string()))
    }
}
