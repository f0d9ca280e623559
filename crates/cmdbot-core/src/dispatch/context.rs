//! Per-invocation message helper.

use crate::app::AppState;
use crate::commands::CommandRegistry;
use crate::event::InboundEvent;
use crate::pending::{InteractionKind, PendingInteraction, PendingInteractions, ResumeState};
use crate::storage::EntityStore;
use crate::transport::{ChatAction, InlineButton, SendOptions, SentMessage, TransportError};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sent instead of an empty message body.
pub const MISSING_BODY: &str = "Must include Body";
/// Command resumed by help buttons.
pub const HELP_COMMAND: &str = "help";
/// Default body of the usage prompt.
pub const INVALID_USAGE: &str = "Invalid Usage";
/// Reaction used when none or an unsupported one is requested.
pub const DEFAULT_REACTION: &str = "👍";

/// Emoji accepted as message reactions.
pub const REACTION_EMOJIS: &[&str] = &[
    "👍", "👎", "❤", "🔥", "🥰", "👏", "😁", "🤔", "🤯", "😱", "🤬", "😢", "🎉", "🤩", "🤮", "💩",
    "🙏", "👌", "🕊", "🤡", "🥱", "🥴", "😍", "🐳", "❤‍🔥", "🌚", "🌭", "💯", "🤣", "⚡", "🍌",
    "🏆", "💔", "🤨", "😐", "🍓", "🍾", "💋", "🖕", "😈", "😴", "😭", "🤓", "👻", "👨‍💻", "👀",
    "🎃", "🙈", "😇", "😨", "🤝", "✍", "🤗", "🫡", "🎅", "🎄", "☃", "💅", "🤪", "🗿", "🆒",
    "💘", "🙉", "🦄", "😘", "💊", "🙊", "😎", "👾", "🤷‍♂", "🤷", "🤷‍♀", "😡",
];

/// Helper bound to one inbound message.
///
/// Cheap to clone. `send` and `reply` never fail: problems are reported
/// into the chat and surface as `None`.
#[derive(Clone)]
pub struct RequestContext {
    app: Arc<AppState>,
    event: Arc<InboundEvent>,
    command: String,
}

impl RequestContext {
    /// Bind a helper to `event` on behalf of `command`.
    #[must_use]
    pub fn new(app: Arc<AppState>, event: InboundEvent, command: impl Into<String>) -> Self {
        Self {
            app,
            event: Arc::new(event),
            command: command.into(),
        }
    }

    /// The triggering message.
    #[must_use]
    pub fn event(&self) -> &InboundEvent {
        &self.event
    }

    /// Name of the command this helper runs for.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Shared application state.
    #[must_use]
    pub fn app(&self) -> &Arc<AppState> {
        &self.app
    }

    /// User document store.
    #[must_use]
    pub fn users(&self) -> &EntityStore {
        &self.app.users
    }

    /// Thread document store.
    #[must_use]
    pub fn threads(&self) -> &EntityStore {
        &self.app.threads
    }

    /// Loaded commands.
    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.app.registry
    }

    /// Pending-interaction table.
    #[must_use]
    pub fn pending(&self) -> &PendingInteractions {
        &self.app.pending
    }

    /// Configured command prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.app.settings.command_prefix
    }

    /// Send `text` to the event's chat.
    pub async fn send(&self, text: &str, options: SendOptions) -> Option<SentMessage> {
        self.deliver(text, options).await
    }

    /// Send `text` as a reply to the triggering message.
    pub async fn reply(&self, text: &str, options: SendOptions) -> Option<SentMessage> {
        self.deliver(text, options.reply_to(self.event.message_id))
            .await
    }

    async fn deliver(&self, text: &str, options: SendOptions) -> Option<SentMessage> {
        if text.is_empty() {
            self.diagnostic(MISSING_BODY).await;
            return None;
        }
        match self
            .app
            .transport
            .send_message(self.event.chat_id(), text, &options)
            .await
        {
            Ok(sent) => Some(sent),
            Err(e) => {
                warn!(chat_id = self.event.chat_id(), error = %e, "Failed to send message");
                self.diagnostic(&e.to_string()).await;
                None
            }
        }
    }

    async fn diagnostic(&self, text: &str) {
        let chat_id = self.event.chat_id();
        if let Err(e) = self
            .app
            .transport
            .send_message(chat_id, text, &SendOptions::default())
            .await
        {
            warn!(chat_id, error = %e, "Failed to deliver diagnostic message");
        }
    }

    /// Delete a message, by default in the event's chat.
    ///
    /// Returns `false` (after reporting into the chat) on failure.
    pub async fn delete(&self, message_id: i32, chat_id: Option<i64>) -> bool {
        let chat_id = chat_id.unwrap_or_else(|| self.event.chat_id());
        match self.app.transport.delete_message(chat_id, message_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(chat_id, message_id, error = %e, "Failed to delete message");
                self.diagnostic(&e.to_string()).await;
                false
            }
        }
    }

    /// Replace the text of a message, by default in the event's chat.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    pub async fn edit(
        &self,
        text: &str,
        message_id: i32,
        chat_id: Option<i64>,
        options: SendOptions,
    ) -> Result<SentMessage, TransportError> {
        let chat_id = chat_id.unwrap_or_else(|| self.event.chat_id());
        self.app
            .transport
            .edit_message_text(chat_id, message_id, text, &options)
            .await
    }

    /// React to a message, by default the triggering one.
    ///
    /// Unsupported emoji fall back to [`DEFAULT_REACTION`].
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    pub async fn react(
        &self,
        emoji: Option<&str>,
        message_id: Option<i32>,
        is_big: bool,
    ) -> Result<(), TransportError> {
        let emoji = emoji
            .filter(|e| REACTION_EMOJIS.contains(e))
            .unwrap_or(DEFAULT_REACTION);
        let message_id = message_id.unwrap_or(self.event.message_id);
        self.app
            .transport
            .set_reaction(self.event.chat_id(), message_id, emoji, is_big)
            .await
    }

    /// Show a chat action. Failures are ignored.
    pub async fn indicator(&self, action: ChatAction, chat_id: Option<i64>) {
        let chat_id = chat_id.unwrap_or_else(|| self.event.chat_id());
        if let Err(e) = self.app.transport.send_chat_action(chat_id, action).await {
            debug!(chat_id, error = %e, "Chat action not delivered");
        }
    }

    /// Reply with a single help button for `command` (default `help`).
    ///
    /// The message text is `toast`, falling back to `body`; the button label
    /// is `body`, falling back to the upper-cased command. Pressing the
    /// button resumes the `help` command with the lower-cased command name.
    pub async fn prompt_help(
        &self,
        command: Option<&str>,
        body: Option<&str>,
        toast: Option<&str>,
    ) -> Option<SentMessage> {
        let command = command.unwrap_or(HELP_COMMAND).to_lowercase();
        let label = body.map_or_else(|| command.to_uppercase(), str::to_string);
        let text = toast.or(body).unwrap_or(&label).to_string();

        let options =
            SendOptions::default().button_row(vec![InlineButton::callback(label, &command)]);
        let sent = self.reply(&text, options).await?;

        self.app
            .pending
            .register(PendingInteraction {
                origin: (*self.event).clone(),
                response: sent.clone(),
                command: HELP_COMMAND.to_string(),
                state: ResumeState::Help { command },
                author_id: self.event.sender_id(),
                kind: InteractionKind::Callback,
            })
            .await;
        Some(sent)
    }

    /// Usage prompt for failed input validation.
    ///
    /// Same as [`Self::prompt_help`] with `help` / `Invalid Usage` defaults.
    pub async fn syntax(
        &self,
        command: Option<&str>,
        body: Option<&str>,
        toast: Option<&str>,
    ) -> Option<SentMessage> {
        self.prompt_help(
            Some(command.unwrap_or(HELP_COMMAND)),
            Some(body.unwrap_or(INVALID_USAGE)),
            toast,
        )
        .await
    }

    /// Route the sender's next text reply to `sent` back to this command.
    pub async fn await_reply(&self, sent: &SentMessage, state: Value) {
        self.app
            .pending
            .register(PendingInteraction {
                origin: (*self.event).clone(),
                response: sent.clone(),
                command: self.command.clone(),
                state: ResumeState::Custom(state),
                author_id: self.event.sender_id(),
                kind: InteractionKind::Reply,
            })
            .await;
    }

    /// Tell the chat that the command failed.
    pub(crate) async fn report_failure(&self, error: &str) {
        let text = format!("❌ {}{} failed: {error}", self.prefix(), self.command);
        self.diagnostic(&text).await;
    }
}
