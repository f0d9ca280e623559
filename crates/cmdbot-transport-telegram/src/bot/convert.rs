//! Conversion of teloxide types into transport-neutral events.

use cmdbot_core::event::{CallbackEvent, ChatProfile, InboundEvent, MessageRef, Sender};
use cmdbot_core::transport::SentMessage;
use teloxide::types::{CallbackQuery, Chat, Message, User};

/// Author snapshot.
#[must_use]
pub fn sender(user: &User) -> Sender {
    Sender {
        id: user.id.0.cast_signed(),
        is_bot: user.is_bot,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        language_code: user.language_code.clone(),
    }
}

fn chat_kind(chat: &Chat) -> &'static str {
    if chat.is_private() {
        "private"
    } else if chat.is_supergroup() {
        "supergroup"
    } else if chat.is_channel() {
        "channel"
    } else {
        "group"
    }
}

/// Chat snapshot.
#[must_use]
pub fn chat_profile(chat: &Chat) -> ChatProfile {
    ChatProfile {
        id: chat.id.0,
        kind: chat_kind(chat).to_string(),
        title: chat.title().map(str::to_string),
        username: chat.username().map(str::to_string),
        first_name: chat.first_name().map(str::to_string),
    }
}

/// Inbound message; captions stand in for text on media messages.
#[must_use]
pub fn inbound_event(msg: &Message) -> InboundEvent {
    InboundEvent {
        chat: chat_profile(&msg.chat),
        sender: msg.from.as_ref().map(sender),
        message_id: msg.id.0,
        text: msg.text().or_else(|| msg.caption()).map(str::to_string),
        reply_to: msg.reply_to_message().map(|reply| reply.id.0),
    }
}

/// Button press.
#[must_use]
pub fn callback_event(q: &CallbackQuery) -> CallbackEvent {
    CallbackEvent {
        id: q.id.0.clone(),
        sender: sender(&q.from),
        message: q
            .message
            .as_ref()
            .map(|msg| MessageRef::new(msg.chat().id.0, msg.id().0)),
        data: q.data.clone(),
    }
}

/// Confirmation of a sent or edited message.
#[must_use]
pub fn sent_message(msg: &Message) -> SentMessage {
    SentMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        text: msg.text().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn user_json() -> Value {
        json!({
            "id": 42,
            "is_bot": false,
            "first_name": "Grace",
            "username": "grace",
            "language_code": "en"
        })
    }

    fn group_message(message_id: i32, text: &str) -> Value {
        json!({
            "message_id": message_id,
            "date": 1_700_000_000,
            "chat": { "id": -100_123, "type": "supergroup", "title": "Builders" },
            "from": user_json(),
            "text": text
        })
    }

    #[test]
    fn test_group_message_conversion() -> Result<(), serde_json::Error> {
        let mut raw = group_message(7, "/echo hi");
        raw["reply_to_message"] = group_message(3, "earlier");
        let msg: Message = serde_json::from_value(raw)?;

        let event = inbound_event(&msg);

        assert_eq!(event.chat_id(), -100_123);
        assert_eq!(event.chat.kind, "supergroup");
        assert_eq!(event.chat.title.as_deref(), Some("Builders"));
        assert_eq!(event.message_id, 7);
        assert_eq!(event.text.as_deref(), Some("/echo hi"));
        assert_eq!(event.reply_to, Some(3));
        assert_eq!(
            event.sender,
            Some(Sender {
                id: 42,
                is_bot: false,
                first_name: "Grace".into(),
                last_name: None,
                username: Some("grace".into()),
                language_code: Some("en".into()),
            })
        );
        Ok(())
    }

    #[test]
    fn test_private_chat_profile() -> Result<(), serde_json::Error> {
        let msg: Message = serde_json::from_value(json!({
            "message_id": 1,
            "date": 1_700_000_000,
            "chat": { "id": 42, "type": "private", "first_name": "Grace", "username": "grace" },
            "from": user_json(),
            "text": "hello"
        }))?;

        let event = inbound_event(&msg);

        assert_eq!(event.chat.kind, "private");
        assert_eq!(event.chat.first_name.as_deref(), Some("Grace"));
        assert_eq!(event.chat.title, None);
        assert_eq!(event.reply_to, None);
        Ok(())
    }

    #[test]
    fn test_callback_conversion() -> Result<(), serde_json::Error> {
        let query: CallbackQuery = serde_json::from_value(json!({
            "id": "4382",
            "from": user_json(),
            "chat_instance": "-8765",
            "data": "echo",
            "message": group_message(500, "Invalid Usage")
        }))?;

        let event = callback_event(&query);

        assert_eq!(event.id, "4382");
        assert_eq!(event.sender.id, 42);
        assert_eq!(event.message, Some(MessageRef::new(-100_123, 500)));
        assert_eq!(event.data.as_deref(), Some("echo"));
        Ok(())
    }

    #[test]
    fn test_sent_message_conversion() -> Result<(), serde_json::Error> {
        let msg: Message = serde_json::from_value(group_message(9, "done"))?;
        assert_eq!(
            sent_message(&msg),
            SentMessage {
                chat_id: -100_123,
                message_id: 9,
                text: Some("done".into()),
            }
        );
        Ok(())
    }
}
