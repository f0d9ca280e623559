//! Outbound transport abstraction.
//!
//! The dispatcher and request context only ever talk to a [`ChatTransport`];
//! platform adapters implement it.

use crate::event::MessageRef;
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by transports
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The platform rejected the request
    #[error("{0}")]
    Api(String),
    /// The request never reached the platform
    #[error("Network error: {0}")]
    Network(String),
}

/// Text markup mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// HTML subset.
    Html,
    /// `MarkdownV2`.
    MarkdownV2,
}

/// A callback button in an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    /// Button label.
    pub text: String,
    /// Payload delivered with the callback.
    pub callback_data: String,
}

impl InlineButton {
    /// Create a callback button.
    #[must_use]
    pub fn callback(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Per-message send options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Message to reply to.
    pub reply_to: Option<i32>,
    /// Markup mode.
    pub parse_mode: Option<ParseMode>,
    /// Inline keyboard rows.
    pub keyboard: Vec<Vec<InlineButton>>,
    /// Send silently.
    pub disable_notification: bool,
}

impl SendOptions {
    /// Reply to `message_id`.
    #[must_use]
    pub const fn reply_to(mut self, message_id: i32) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    /// Use the given markup mode.
    #[must_use]
    pub const fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    /// Append one keyboard row.
    #[must_use]
    pub fn button_row(mut self, row: Vec<InlineButton>) -> Self {
        self.keyboard.push(row);
        self
    }
}

/// A message the bot sent or edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Chat id.
    pub chat_id: i64,
    /// Message id.
    pub message_id: i32,
    /// Text as delivered.
    pub text: Option<String>,
}

impl SentMessage {
    /// Reference to the sent message.
    #[must_use]
    pub const fn message_ref(&self) -> MessageRef {
        MessageRef::new(self.chat_id, self.message_id)
    }
}

/// Presence indicator shown while a command works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatAction {
    /// "typing…"
    #[default]
    Typing,
    /// Uploading a photo.
    UploadPhoto,
    /// Recording a video.
    RecordVideo,
    /// Uploading a video.
    UploadVideo,
    /// Recording a voice note.
    RecordVoice,
    /// Uploading a voice note.
    UploadVoice,
    /// Uploading a file.
    UploadDocument,
    /// Choosing a sticker.
    ChooseSticker,
}

/// Outbound messaging operations needed by commands.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a text message.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        options: &SendOptions,
    ) -> Result<SentMessage, TransportError>;

    /// Replace the text of a message.
    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        options: &SendOptions,
    ) -> Result<SentMessage, TransportError>;

    /// Delete a message.
    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError>;

    /// Set a single emoji reaction on a message.
    async fn set_reaction(
        &self,
        chat_id: i64,
        message_id: i32,
        emoji: &str,
        is_big: bool,
    ) -> Result<(), TransportError>;

    /// Show a chat action indicator.
    async fn send_chat_action(&self, chat_id: i64, action: ChatAction)
        -> Result<(), TransportError>;

    /// Acknowledge a button press, optionally with a toast.
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<String>,
    ) -> Result<(), TransportError>;
}
