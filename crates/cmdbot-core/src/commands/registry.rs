//! Command registry built from the manifest directory.

use super::{CommandDescriptor, CommandLoadError, CommandManifest, HandlerCatalog};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// A manifest that could not be registered.
#[derive(Debug)]
pub struct LoadFailure {
    /// Offending file.
    pub file: PathBuf,
    /// Why it was rejected.
    pub error: CommandLoadError,
}

/// Summary of a directory scan.
#[derive(Debug, Default)]
pub struct RegistryReport {
    /// Number of registered commands.
    pub loaded: usize,
    /// Files ignored because of the skip list.
    pub skipped: Vec<String>,
    /// Rejected candidates, in scan order.
    pub failures: Vec<LoadFailure>,
}

/// Immutable name/alias index of loaded commands.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<CommandDescriptor>>,
    // lower-cased name or alias -> position in `commands`
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    /// Registry with no commands.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Scan `dir` for `*.yaml` / `*.yml` manifests and register each one.
    ///
    /// Files are visited in name order, so the first of two colliding
    /// candidates wins. Failures are collected in the report and never stop
    /// the scan; a missing directory yields an empty registry.
    #[must_use]
    pub fn load(dir: &Path, skip: &[String], catalog: &HandlerCatalog) -> (Self, RegistryReport) {
        let mut registry = Self::empty();
        let mut report = RegistryReport::default();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    commands_dir = %dir.display(),
                    error = %err,
                    "Commands directory unavailable, no commands loaded"
                );
                return (registry, report);
            }
        };

        let mut candidates: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "Failed to read commands directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if !matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("yaml" | "yml")
            ) {
                continue;
            }
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string();
            if skip.iter().any(|s| *s == file_name) {
                report.skipped.push(file_name);
                continue;
            }
            candidates.push(path);
        }
        candidates.sort();

        for path in candidates {
            match Self::load_candidate(&path, catalog).and_then(|d| registry.register(d)) {
                Ok(()) => report.loaded += 1,
                Err(error) => {
                    warn!(file = %path.display(), error = %error, "Skipping command manifest");
                    report.failures.push(LoadFailure { file: path, error });
                }
            }
        }

        info!(
            loaded = report.loaded,
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            commands = ?registry.commands.iter().map(|c| c.name()).collect::<Vec<_>>(),
            "Command registry loaded"
        );
        (registry, report)
    }

    fn load_candidate(
        path: &Path,
        catalog: &HandlerCatalog,
    ) -> Result<CommandDescriptor, CommandLoadError> {
        let (config, entry_point) = CommandManifest::from_file(path)?.validate()?;
        let handler = catalog
            .get(&entry_point)
            .ok_or_else(|| CommandLoadError::UnknownEntryPoint(entry_point.clone()))?;
        Ok(CommandDescriptor {
            config,
            entry_point,
            handler,
            source: path.to_path_buf(),
        })
    }

    /// Add a descriptor whose name and aliases are already lower-cased.
    ///
    /// Nothing is indexed unless the name and every alias are free.
    ///
    /// # Errors
    ///
    /// `NameTaken` or `AliasTaken` naming the current owner.
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<(), CommandLoadError> {
        let name = descriptor.name().to_string();
        if let Some(owner) = self.owner_of(&name) {
            return Err(CommandLoadError::NameTaken { name, owner });
        }
        for alias in &descriptor.config.aliases {
            if let Some(owner) = self.owner_of(alias) {
                return Err(CommandLoadError::AliasTaken {
                    alias: alias.clone(),
                    owner,
                });
            }
        }

        let position = self.commands.len();
        self.index.insert(name, position);
        for alias in &descriptor.config.aliases {
            self.index.insert(alias.clone(), position);
        }
        self.commands.push(Arc::new(descriptor));
        Ok(())
    }

    fn owner_of(&self, token: &str) -> Option<String> {
        self.index
            .get(token)
            .and_then(|&i| self.commands.get(i))
            .map(|c| c.name().to_string())
    }

    /// Look up a command by name or alias, case-insensitively.
    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<Arc<CommandDescriptor>> {
        self.index
            .get(&token.to_lowercase())
            .and_then(|&i| self.commands.get(i))
            .cloned()
    }

    /// Commands in registration order.
    #[must_use]
    pub fn commands(&self) -> &[Arc<CommandDescriptor>] {
        &self.commands
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
