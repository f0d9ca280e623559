//! Pending-interaction table
//!
//! Maps a message the bot sent to the command that should handle a later
//! button press on it or a text reply to it.

use crate::config::CoreSettings;
use crate::event::{InboundEvent, MessageRef};
use crate::transport::SentMessage;
use moka::future::Cache;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Which follow-up event resumes the interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    /// An inline button press on the sent message.
    Callback,
    /// A text reply to the sent message.
    Reply,
}

/// State handed back to the command on resume.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeState {
    /// Show usage for `command`.
    Help {
        /// Command whose help was requested.
        command: String,
    },
    /// Command-defined state.
    Custom(Value),
}

/// Metadata stored for one outstanding follow-up.
#[derive(Debug, Clone)]
pub struct PendingInteraction {
    /// Event that triggered the prompt.
    pub origin: InboundEvent,
    /// The prompt message the bot sent.
    pub response: SentMessage,
    /// Command token that resumes the interaction.
    pub command: String,
    /// Command-specific resume state.
    pub state: ResumeState,
    /// Only this user may resume a `Reply` interaction.
    pub author_id: Option<i64>,
    /// Follow-up kind.
    pub kind: InteractionKind,
}

/// Process-wide table of pending interactions.
///
/// Cheap to clone; clones share entries. Bounded by capacity and an optional
/// time-to-live.
#[derive(Clone)]
pub struct PendingInteractions {
    cache: Cache<MessageRef, Arc<PendingInteraction>>,
}

impl PendingInteractions {
    /// Creates a table holding at most `max_capacity` entries
    ///
    /// With `ttl` set, entries expire that long after they were registered.
    #[must_use]
    pub fn new(max_capacity: u64, ttl: Option<Duration>) -> Self {
        let builder = Cache::builder().max_capacity(max_capacity);
        let cache = match ttl {
            Some(ttl) => builder.time_to_live(ttl).build(),
            None => builder.build(),
        };
        Self { cache }
    }

    /// Table sized from settings.
    #[must_use]
    pub fn from_settings(settings: &CoreSettings) -> Self {
        Self::new(
            settings.pending_max_capacity,
            settings.pending_ttl_secs.map(Duration::from_secs),
        )
    }

    /// Register `interaction` under its response message, replacing any
    /// previous entry for the same message.
    pub async fn register(&self, interaction: PendingInteraction) {
        let key = interaction.response.message_ref();
        debug!(
            chat_id = key.chat_id,
            message_id = key.message_id,
            command = %interaction.command,
            kind = ?interaction.kind,
            "Pending interaction registered"
        );
        self.cache.insert(key, Arc::new(interaction)).await;
    }

    /// Look up an entry without consuming it.
    pub async fn get(&self, key: &MessageRef) -> Option<Arc<PendingInteraction>> {
        self.cache.get(key).await
    }

    /// Remove and return an entry.
    pub async fn take(&self, key: &MessageRef) -> Option<Arc<PendingInteraction>> {
        self.cache.remove(key).await
    }

    /// Number of live entries (approximate until pending tasks run).
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction(message_id: i32, command: &str) -> PendingInteraction {
        PendingInteraction {
            origin: InboundEvent::default(),
            response: SentMessage {
                chat_id: 10,
                message_id,
                text: None,
            },
            command: command.to_string(),
            state: ResumeState::Help {
                command: "echo".into(),
            },
            author_id: Some(1),
            kind: InteractionKind::Callback,
        }
    }

    #[tokio::test]
    async fn test_register_then_get() {
        let table = PendingInteractions::new(100, None);
        table.register(interaction(5, "help")).await;

        let found = table.get(&MessageRef::new(10, 5)).await;
        assert_eq!(found.map(|i| i.command.clone()), Some("help".to_string()));
        assert!(table.get(&MessageRef::new(11, 5)).await.is_none());
    }

    #[tokio::test]
    async fn test_later_write_overwrites() {
        let table = PendingInteractions::new(100, None);
        table.register(interaction(5, "help")).await;
        table.register(interaction(5, "note")).await;
        table.cache.run_pending_tasks().await;

        assert_eq!(table.entry_count(), 1);
        let found = table.get(&MessageRef::new(10, 5)).await;
        assert_eq!(found.map(|i| i.command.clone()), Some("note".to_string()));
    }

    #[tokio::test]
    async fn test_take_consumes_entry() {
        let table = PendingInteractions::new(100, None);
        table.register(interaction(5, "help")).await;

        assert!(table.take(&MessageRef::new(10, 5)).await.is_some());
        assert!(table.take(&MessageRef::new(10, 5)).await.is_none());
    }

    #[tokio::test]
    async fn test_ttl_expires_entries() {
        let table = PendingInteractions::new(100, Some(Duration::from_millis(50)));
        table.register(interaction(5, "help")).await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(table.get(&MessageRef::new(10, 5)).await.is_none());
    }
}
