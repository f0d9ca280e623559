//! Testing helpers and mock utilities.

use crate::app::AppState;
use crate::commands::CommandRegistry;
use crate::config::CoreSettings;
use crate::event::{ChatProfile, InboundEvent, Sender};
use crate::storage::MemoryBackend;
use crate::transport::{ChatTransport, MockChatTransport, SentMessage};
use std::sync::Arc;

/// Application state over an in-memory store and the given transport.
#[must_use]
pub fn app_with(transport: impl ChatTransport + 'static) -> Arc<AppState> {
    app_with_registry(transport, CommandRegistry::empty())
}

/// Like [`app_with`] but with preloaded commands.
#[must_use]
pub fn app_with_registry(
    transport: impl ChatTransport + 'static,
    registry: CommandRegistry,
) -> Arc<AppState> {
    Arc::new(AppState::new(
        CoreSettings::default(),
        registry,
        Arc::new(MemoryBackend::new()),
        Arc::new(transport),
    ))
}

/// Message with id 5 from user 1 in private chat 10.
#[must_use]
pub fn sample_event(text: &str) -> InboundEvent {
    InboundEvent {
        chat: ChatProfile {
            id: 10,
            kind: "private".into(),
            first_name: Some("Ada".into()),
            ..ChatProfile::default()
        },
        sender: Some(Sender {
            id: 1,
            first_name: "Ada".into(),
            username: Some("ada".into()),
            ..Sender::default()
        }),
        message_id: 5,
        text: Some(text.to_string()),
        reply_to: None,
    }
}

/// A sent message value.
#[must_use]
pub fn sent(chat_id: i64, message_id: i32, text: &str) -> SentMessage {
    SentMessage {
        chat_id,
        message_id,
        text: Some(text.to_string()),
    }
}

/// Transport mock that accepts any message and numbers replies from 1000.
#[must_use]
pub fn mock_transport_accepting_all() -> MockChatTransport {
    let mut mock = MockChatTransport::new();
    let counter = std::sync::atomic::AtomicI32::new(1000);
    mock.expect_send_message().returning(move |chat_id, text, _| {
        let id = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(sent(chat_id, id, text))
    });
    mock.expect_edit_message_text()
        .returning(|chat_id, message_id, text, _| Ok(sent(chat_id, message_id, text)));
    mock.expect_answer_callback().returning(|_, _| Ok(()));
    mock.expect_send_chat_action().returning(|_, _| Ok(()));
    mock
}
