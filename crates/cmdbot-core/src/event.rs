//! Transport-neutral inbound events.

use crate::storage::{to_document, Document, StoreError};
use serde::{Deserialize, Serialize};

/// Address of a single message: chat plus message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    /// Chat the message lives in.
    pub chat_id: i64,
    /// Message id within the chat.
    pub message_id: i32,
}

impl MessageRef {
    /// Build a reference.
    #[must_use]
    pub const fn new(chat_id: i64, message_id: i32) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }
}

/// Author of a message or button press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Sender {
    /// Platform user id.
    pub id: i64,
    /// Whether the account is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// First name.
    pub first_name: String,
    /// Last name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Username without the leading `@`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// IETF language tag of the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl Sender {
    /// Profile snapshot stored by `refresh`.
    ///
    /// # Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn profile(&self) -> Result<Document, StoreError> {
        to_document(serde_json::to_value(self)?)
    }
}

/// Chat an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChatProfile {
    /// Platform chat id (negative for groups).
    pub id: i64,
    /// `private`, `group`, `supergroup` or `channel`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Group title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Public username of the chat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// First name for private chats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
}

impl ChatProfile {
    /// Profile snapshot stored by `refresh`.
    ///
    /// # Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn profile(&self) -> Result<Document, StoreError> {
        to_document(serde_json::to_value(self)?)
    }
}

/// An inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InboundEvent {
    /// Chat the message arrived in.
    pub chat: ChatProfile,
    /// Author; absent for anonymous channel posts.
    pub sender: Option<Sender>,
    /// Message id within the chat.
    pub message_id: i32,
    /// Text or caption.
    pub text: Option<String>,
    /// Id of the message this one replies to.
    pub reply_to: Option<i32>,
}

impl InboundEvent {
    /// Chat id shortcut.
    #[must_use]
    pub const fn chat_id(&self) -> i64 {
        self.chat.id
    }

    /// Sender id, if any.
    #[must_use]
    pub fn sender_id(&self) -> Option<i64> {
        self.sender.as_ref().map(|s| s.id)
    }

    /// Reference to this message.
    #[must_use]
    pub const fn message_ref(&self) -> MessageRef {
        MessageRef::new(self.chat.id, self.message_id)
    }

    /// Reference to the message this one replies to.
    #[must_use]
    pub fn reply_ref(&self) -> Option<MessageRef> {
        self.reply_to.map(|id| MessageRef::new(self.chat.id, id))
    }
}

/// A press on an inline button.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallbackEvent {
    /// Callback id used to acknowledge the press.
    pub id: String,
    /// Who pressed the button.
    pub sender: Sender,
    /// Message carrying the button, when still accessible.
    pub message: Option<MessageRef>,
    /// Callback payload attached to the button.
    pub data: Option<String>,
}
