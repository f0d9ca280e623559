//! Process-scoped application state.

use crate::commands::CommandRegistry;
use crate::config::CoreSettings;
use crate::pending::PendingInteractions;
use crate::storage::{
    DocumentBackend, EntityStore, MemoryBackend, Namespace, SqliteBackend, StoreError,
};
use crate::transport::ChatTransport;
use std::sync::Arc;
use tracing::warn;

/// Everything shared by the dispatcher and every request context.
pub struct AppState {
    /// Loaded settings.
    pub settings: CoreSettings,
    /// Command index, immutable after startup.
    pub registry: CommandRegistry,
    /// Per-user documents.
    pub users: EntityStore,
    /// Per-chat documents.
    pub threads: EntityStore,
    /// Outstanding follow-ups.
    pub pending: PendingInteractions,
    /// Outbound messaging.
    pub transport: Arc<dyn ChatTransport>,
    /// This bot's username, used to ignore commands meant for other bots.
    pub bot_username: Option<String>,
}

impl AppState {
    /// Assemble the state; both stores share `backend`.
    #[must_use]
    pub fn new(
        settings: CoreSettings,
        registry: CommandRegistry,
        backend: Arc<dyn DocumentBackend>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        let serialize = settings.serialize_entity_updates;
        Self {
            users: EntityStore::new(Namespace::Users, backend.clone(), serialize),
            threads: EntityStore::new(Namespace::Threads, backend, serialize),
            pending: PendingInteractions::from_settings(&settings),
            settings,
            registry,
            transport,
            bot_username: None,
        }
    }

    /// Set the bot username.
    #[must_use]
    pub fn with_bot_username(mut self, username: Option<String>) -> Self {
        self.bot_username = username;
        self
    }
}

/// Open the backend selected by `database_path`.
///
/// # Errors
///
/// `Unavailable` if the SQLite file cannot be opened.
pub async fn open_backend(settings: &CoreSettings) -> Result<Arc<dyn DocumentBackend>, StoreError> {
    if settings.is_in_memory() {
        warn!("Using in-memory document store, data will not survive a restart");
        return Ok(Arc::new(MemoryBackend::new()));
    }
    let backend = SqliteBackend::open(&settings.database_path).await?;
    backend.check_connection().await?;
    Ok(Arc::new(backend))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_backend_is_selected() -> Result<(), StoreError> {
        let settings = CoreSettings {
            database_path: ":memory:".into(),
            ..CoreSettings::default()
        };
        let backend = open_backend(&settings).await?;
        backend.put(Namespace::Users, 1, "{}".into()).await?;
        assert!(backend.contains(Namespace::Users, 1).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_sqlite_file_is_created() -> Result<(), StoreError> {
        let dir = tempfile::tempdir().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let path = dir.path().join("db").join("bot.sqlite3");
        let settings = CoreSettings {
            database_path: path.display().to_string(),
            ..CoreSettings::default()
        };

        open_backend(&settings).await?;
        assert!(path.exists());
        Ok(())
    }
}
