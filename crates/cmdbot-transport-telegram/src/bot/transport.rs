//! [`ChatTransport`] over the Telegram Bot API.

use super::convert::sent_message;
use super::resilient::{retry_telegram_operation, transport_error};
use async_trait::async_trait;
use cmdbot_core::transport::{
    ChatAction, ChatTransport, InlineButton, ParseMode, SendOptions, SentMessage, TransportError,
};
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ReactionType,
    ReplyParameters,
};
use teloxide::{ApiError, RequestError};
use tracing::debug;

/// Telegram implementation of the outbound transport.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Wrap a bot handle.
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

const fn parse_mode(mode: ParseMode) -> teloxide::types::ParseMode {
    match mode {
        ParseMode::Html => teloxide::types::ParseMode::Html,
        ParseMode::MarkdownV2 => teloxide::types::ParseMode::MarkdownV2,
    }
}

const fn chat_action(action: ChatAction) -> teloxide::types::ChatAction {
    use teloxide::types::ChatAction as Tg;
    match action {
        ChatAction::Typing => Tg::Typing,
        ChatAction::UploadPhoto => Tg::UploadPhoto,
        ChatAction::RecordVideo => Tg::RecordVideo,
        ChatAction::UploadVideo => Tg::UploadVideo,
        ChatAction::RecordVoice => Tg::RecordVoice,
        ChatAction::UploadVoice => Tg::UploadVoice,
        ChatAction::UploadDocument => Tg::UploadDocument,
        ChatAction::ChooseSticker => Tg::ChooseSticker,
    }
}

fn keyboard(rows: &[Vec<InlineButton>]) -> Option<InlineKeyboardMarkup> {
    if rows.is_empty() {
        return None;
    }
    Some(InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|button| {
                InlineKeyboardButton::callback(button.text.clone(), button.callback_data.clone())
            })
            .collect::<Vec<_>>()
    })))
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        options: &SendOptions,
    ) -> Result<SentMessage, TransportError> {
        let message = retry_telegram_operation(|| async {
            let mut req = self.bot.send_message(ChatId(chat_id), text);
            if let Some(reply_to) = options.reply_to {
                req = req.reply_parameters(ReplyParameters::new(MessageId(reply_to)));
            }
            if let Some(mode) = options.parse_mode {
                req = req.parse_mode(parse_mode(mode));
            }
            if let Some(markup) = keyboard(&options.keyboard) {
                req = req.reply_markup(markup);
            }
            if options.disable_notification {
                req = req.disable_notification(true);
            }
            req.await
        })
        .await
        .map_err(transport_error)?;

        Ok(sent_message(&message))
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        options: &SendOptions,
    ) -> Result<SentMessage, TransportError> {
        let result = retry_telegram_operation(|| async {
            let mut req = self
                .bot
                .edit_message_text(ChatId(chat_id), MessageId(message_id), text);
            if let Some(mode) = options.parse_mode {
                req = req.parse_mode(parse_mode(mode));
            }
            if let Some(markup) = keyboard(&options.keyboard) {
                req = req.reply_markup(markup);
            }
            req.await
        })
        .await;

        match result {
            Ok(message) => Ok(sent_message(&message)),
            Err(RequestError::Api(ApiError::MessageNotModified)) => {
                debug!(chat_id, message_id, "Edit skipped, text unchanged");
                Ok(SentMessage {
                    chat_id,
                    message_id,
                    text: Some(text.to_string()),
                })
            }
            Err(e) => Err(transport_error(e)),
        }
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError> {
        retry_telegram_operation(|| async {
            self.bot
                .delete_message(ChatId(chat_id), MessageId(message_id))
                .await
        })
        .await
        .map(|_| ())
        .map_err(transport_error)
    }

    async fn set_reaction(
        &self,
        chat_id: i64,
        message_id: i32,
        emoji: &str,
        is_big: bool,
    ) -> Result<(), TransportError> {
        retry_telegram_operation(|| async {
            self.bot
                .set_message_reaction(ChatId(chat_id), MessageId(message_id))
                .reaction(vec![ReactionType::Emoji {
                    emoji: emoji.to_string(),
                }])
                .is_big(is_big)
                .await
        })
        .await
        .map(|_| ())
        .map_err(transport_error)
    }

    async fn send_chat_action(
        &self,
        chat_id: i64,
        action: ChatAction,
    ) -> Result<(), TransportError> {
        retry_telegram_operation(|| async {
            self.bot
                .send_chat_action(ChatId(chat_id), chat_action(action))
                .await
        })
        .await
        .map(|_| ())
        .map_err(transport_error)
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<String>,
    ) -> Result<(), TransportError> {
        retry_telegram_operation(|| async {
            let mut req = self
                .bot
                .answer_callback_query(CallbackQueryId(callback_id.to_string()));
            if let Some(text) = text.clone() {
                req = req.text(text);
            }
            req.await
        })
        .await
        .map(|_| ())
        .map_err(transport_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_keyboard_is_omitted() {
        assert!(keyboard(&[]).is_none());
    }

    #[test]
    fn test_keyboard_rows_are_preserved() {
        let rows = vec![
            vec![InlineButton::callback("Help", "help")],
            vec![
                InlineButton::callback("Yes", "yes"),
                InlineButton::callback("No", "no"),
            ],
        ];

        let markup = keyboard(&rows);

        let shape: Vec<usize> = markup
            .map(|m| m.inline_keyboard.iter().map(Vec::len).collect())
            .unwrap_or_default();
        assert_eq!(shape, vec![1, 2]);
    }

    #[test]
    fn test_parse_mode_mapping() {
        assert_eq!(
            parse_mode(ParseMode::Html),
            teloxide::types::ParseMode::Html
        );
        assert_eq!(
            parse_mode(ParseMode::MarkdownV2),
            teloxide::types::ParseMode::MarkdownV2
        );
    }
}
