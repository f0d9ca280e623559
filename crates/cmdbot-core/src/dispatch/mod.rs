//! Inbound event dispatch.
//!
//! Every command or follow-up runs in its own task; the caller never waits
//! for a handler. Handler errors and panics are logged and reported into
//! the chat.

mod context;
mod parser;

pub use context::{
    RequestContext, DEFAULT_REACTION, HELP_COMMAND, INVALID_USAGE, MISSING_BODY, REACTION_EMOJIS,
};
pub use parser::{CommandParser, ParsedCommand};

use crate::app::AppState;
use crate::commands::{FollowUp, FollowUpInput, Invocation};
use crate::event::{CallbackEvent, InboundEvent};
use crate::pending::InteractionKind;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

/// What happened to an inbound event.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Not a command and not a follow-up.
    Ignored,
    /// A command token that no command owns.
    Unknown(String),
    /// A button press on a message with no pending interaction.
    Stale,
    /// A handler task was started.
    Spawned(JoinHandle<()>),
}

impl DispatchOutcome {
    /// Wait for the spawned handler, if any.
    ///
    /// # Errors
    ///
    /// Returns the `JoinError` if the task was cancelled.
    pub async fn wait(self) -> Result<(), JoinError> {
        match self {
            Self::Spawned(handle) => handle.await,
            _ => Ok(()),
        }
    }
}

/// Routes inbound events to command handlers.
pub struct Dispatcher {
    app: Arc<AppState>,
    parser: CommandParser,
}

impl Dispatcher {
    /// Create a dispatcher using the configured prefix and bot username.
    ///
    /// # Errors
    ///
    /// Returns a `regex::Error` if the command pattern cannot be built.
    pub fn new(app: Arc<AppState>) -> Result<Self, regex::Error> {
        let parser = CommandParser::new(&app.settings.command_prefix, app.bot_username.as_deref())?;
        Ok(Self { app, parser })
    }

    /// Shared application state.
    #[must_use]
    pub fn app(&self) -> &Arc<AppState> {
        &self.app
    }

    /// Handle one inbound message.
    pub async fn dispatch(&self, event: InboundEvent) -> DispatchOutcome {
        if self.app.settings.log_messages {
            observe(&event);
        }

        let Some(parsed) = event.text.as_deref().and_then(|t| self.parser.parse(t)) else {
            return self.route_reply(event).await;
        };

        let Some(command) = self.app.registry.resolve(&parsed.token) else {
            debug!(token = %parsed.token, chat_id = event.chat_id(), "Unknown command ignored");
            return DispatchOutcome::Unknown(parsed.token);
        };

        info!(
            command = %command.name(),
            chat_id = event.chat_id(),
            user_id = ?event.sender_id(),
            "Dispatching command"
        );
        let ctx = RequestContext::new(self.app.clone(), event, command.name());
        let handler = command.handler.clone();
        let invocation = Invocation {
            ctx: ctx.clone(),
            args: parsed.args,
            token: parsed.token,
            command,
        };
        DispatchOutcome::Spawned(spawn_supervised(ctx, async move {
            handler.execute(invocation).await
        }))
    }

    // A text reply to a message awaiting one resumes the command that asked.
    async fn route_reply(&self, event: InboundEvent) -> DispatchOutcome {
        let Some(key) = event.reply_ref() else {
            return DispatchOutcome::Ignored;
        };
        let Some(interaction) = self.app.pending.get(&key).await else {
            return DispatchOutcome::Ignored;
        };
        if interaction.kind != InteractionKind::Reply {
            return DispatchOutcome::Ignored;
        }
        if interaction.author_id.is_some() && interaction.author_id != event.sender_id() {
            debug!(chat_id = key.chat_id, "Reply from a different user ignored");
            return DispatchOutcome::Ignored;
        }
        let Some(text) = event.text.clone() else {
            return DispatchOutcome::Ignored;
        };
        let Some(command) = self.app.registry.resolve(&interaction.command) else {
            warn!(command = %interaction.command, "Pending reply for unknown command");
            return DispatchOutcome::Unknown(interaction.command.clone());
        };

        self.app.pending.take(&key).await;
        info!(command = %command.name(), chat_id = key.chat_id, "Resuming command from reply");
        let ctx = RequestContext::new(self.app.clone(), event, command.name());
        let handler = command.handler.clone();
        let follow_up = FollowUp {
            ctx: ctx.clone(),
            interaction,
            input: FollowUpInput::Reply { text },
        };
        DispatchOutcome::Spawned(spawn_supervised(ctx, async move {
            handler.on_follow_up(follow_up).await
        }))
    }

    /// Handle one inline button press.
    pub async fn dispatch_callback(&self, callback: CallbackEvent) -> DispatchOutcome {
        let interaction = match &callback.message {
            Some(key) => self.app.pending.get(key).await,
            None => None,
        };
        let Some(interaction) = interaction.filter(|i| i.kind == InteractionKind::Callback) else {
            debug!(callback_id = %callback.id, "Callback without pending interaction");
            self.acknowledge(&callback.id).await;
            return DispatchOutcome::Stale;
        };
        self.acknowledge(&callback.id).await;

        let Some(command) = self.app.registry.resolve(&interaction.command) else {
            warn!(command = %interaction.command, "Pending callback for unknown command");
            return DispatchOutcome::Unknown(interaction.command.clone());
        };

        info!(
            command = %command.name(),
            user_id = callback.sender.id,
            "Resuming command from callback"
        );
        let ctx = RequestContext::new(self.app.clone(), interaction.origin.clone(), command.name());
        let handler = command.handler.clone();
        let follow_up = FollowUp {
            ctx: ctx.clone(),
            interaction,
            input: FollowUpInput::Callback {
                sender: callback.sender,
                data: callback.data,
            },
        };
        DispatchOutcome::Spawned(spawn_supervised(ctx, async move {
            handler.on_follow_up(follow_up).await
        }))
    }

    async fn acknowledge(&self, callback_id: &str) {
        if let Err(e) = self.app.transport.answer_callback(callback_id, None).await {
            warn!(callback_id, error = %e, "Failed to answer callback query");
        }
    }
}

fn observe(event: &InboundEvent) {
    info!(
        chat_id = event.chat_id(),
        user_id = ?event.sender_id(),
        message_id = event.message_id,
        text = event.text.as_deref().unwrap_or_default(),
        "Inbound message"
    );
}

fn spawn_supervised<F>(ctx: RequestContext, task: F) -> JoinHandle<()>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let chat_id = ctx.event().chat_id();
        match AssertUnwindSafe(task).catch_unwind().await {
            Ok(Ok(())) => debug!(command = %ctx.command(), chat_id, "Command completed"),
            Ok(Err(e)) => {
                error!(command = %ctx.command(), chat_id, error = %e, "Command failed");
                ctx.report_failure(&e.to_string()).await;
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!(command = %ctx.command(), chat_id, panic = %reason, "Command panicked");
                ctx.report_failure(&reason).await;
            }
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{
        CommandConfig, CommandDescriptor, CommandHandler, CommandRegistry,
    };
    use crate::event::{MessageRef, Sender};
    use crate::testing::{app_with_registry, mock_transport_accepting_all, sample_event, sent};
    use crate::transport::MockChatTransport;
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Probe {
        executed: AtomicUsize,
        resumed: AtomicUsize,
    }

    #[async_trait]
    impl CommandHandler for Probe {
        async fn execute(&self, invocation: Invocation) -> anyhow::Result<()> {
            self.executed.fetch_add(1, Ordering::SeqCst);
            match invocation.args.first().map(String::as_str) {
                Some("fail") => anyhow::bail!("boom"),
                Some("panic") => panic!("kaboom"),
                _ => Ok(()),
            }
        }

        async fn on_follow_up(&self, _follow_up: FollowUp) -> anyhow::Result<()> {
            self.resumed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn registry_with(handler: Arc<dyn CommandHandler>) -> CommandRegistry {
        let mut registry = CommandRegistry::empty();
        let registered = registry.register(CommandDescriptor {
            config: CommandConfig {
                name: "probe".into(),
                aliases: vec!["p".into()],
                ..CommandConfig::default()
            },
            entry_point: "probe".into(),
            handler,
            source: PathBuf::from("probe.yaml"),
        });
        assert!(registered.is_ok());
        registry
    }

    fn dispatcher(transport: MockChatTransport, probe: Arc<Probe>) -> Result<Dispatcher, regex::Error> {
        Dispatcher::new(app_with_registry(transport, registry_with(probe)))
    }

    #[tokio::test]
    async fn test_alias_dispatches_once() -> anyhow::Result<()> {
        let probe = Arc::new(Probe::default());
        let dispatcher = dispatcher(MockChatTransport::new(), probe.clone())?;

        dispatcher.dispatch(sample_event("/P")).await.wait().await?;

        assert_eq!(probe.executed.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[derive(Default)]
    struct Gate {
        release: Notify,
        finished: AtomicUsize,
    }

    #[async_trait]
    impl CommandHandler for Gate {
        async fn execute(&self, invocation: Invocation) -> anyhow::Result<()> {
            if invocation.args.first().map(String::as_str) == Some("hold") {
                self.release.notified().await;
            }
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_returns_before_handler_finishes() -> anyhow::Result<()> {
        let gate = Arc::new(Gate::default());
        let dispatcher = Dispatcher::new(app_with_registry(
            MockChatTransport::new(),
            registry_with(gate.clone()),
        ))?;

        let outcome = tokio::time::timeout(
            Duration::from_secs(1),
            dispatcher.dispatch(sample_event("/probe hold")),
        )
        .await?;
        let DispatchOutcome::Spawned(held) = outcome else {
            anyhow::bail!("blocking command was not spawned");
        };

        // a later event still runs to completion while the first is parked
        tokio::time::timeout(Duration::from_secs(1), dispatcher.dispatch(sample_event("/probe")))
            .await?
            .wait()
            .await?;
        assert_eq!(gate.finished.load(Ordering::SeqCst), 1);
        assert!(!held.is_finished());

        gate.release.notify_one();
        held.await?;
        assert_eq!(gate.finished.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_plain_text_is_ignored() -> anyhow::Result<()> {
        let probe = Arc::new(Probe::default());
        let dispatcher = dispatcher(MockChatTransport::new(), probe.clone())?;

        let outcome = dispatcher.dispatch(sample_event("just chatting")).await;

        assert!(matches!(outcome, DispatchOutcome::Ignored));
        assert_eq!(probe.executed.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_handler_error_is_reported_in_chat() -> anyhow::Result<()> {
        let mut transport = MockChatTransport::new();
        transport
            .expect_send_message()
            .withf(|chat_id, text, _| *chat_id == 10 && text == "❌ /probe failed: boom")
            .times(1)
            .returning(|chat_id, text, _| Ok(sent(chat_id, 1, text)));
        let dispatcher = dispatcher(transport, Arc::new(Probe::default()))?;

        dispatcher.dispatch(sample_event("/probe fail")).await.wait().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() -> anyhow::Result<()> {
        let mut transport = MockChatTransport::new();
        transport
            .expect_send_message()
            .withf(|_, text, _| text == "❌ /probe failed: kaboom")
            .times(1)
            .returning(|chat_id, text, _| Ok(sent(chat_id, 1, text)));
        let dispatcher = dispatcher(transport, Arc::new(Probe::default()))?;

        dispatcher.dispatch(sample_event("/probe panic")).await.wait().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_callback_is_acknowledged() -> anyhow::Result<()> {
        let mut transport = MockChatTransport::new();
        transport
            .expect_answer_callback()
            .withf(|id, text| id == "cb-1" && text.is_none())
            .times(1)
            .returning(|_, _| Ok(()));
        let dispatcher = dispatcher(transport, Arc::new(Probe::default()))?;

        let outcome = dispatcher
            .dispatch_callback(CallbackEvent {
                id: "cb-1".into(),
                sender: Sender::default(),
                message: Some(MessageRef::new(10, 404)),
                data: Some("probe".into()),
            })
            .await;

        assert!(matches!(outcome, DispatchOutcome::Stale));
        Ok(())
    }

    #[tokio::test]
    async fn test_reply_resumes_only_for_author() -> anyhow::Result<()> {
        let probe = Arc::new(Probe::default());
        let dispatcher = dispatcher(mock_transport_accepting_all(), probe.clone())?;
        let ctx = RequestContext::new(dispatcher.app().clone(), sample_event("/probe"), "probe");
        ctx.await_reply(&sent(10, 50, "What?"), json!(null)).await;

        let mut stranger = sample_event("not yours");
        stranger.reply_to = Some(50);
        stranger.sender = Some(Sender {
            id: 2,
            ..Sender::default()
        });
        assert!(matches!(
            dispatcher.dispatch(stranger).await,
            DispatchOutcome::Ignored
        ));

        let mut answer = sample_event("forty-two");
        answer.reply_to = Some(50);
        dispatcher.dispatch(answer).await.wait().await?;
        assert_eq!(probe.resumed.load(Ordering::SeqCst), 1);

        // consumed
        let mut again = sample_event("again");
        again.reply_to = Some(50);
        assert!(matches!(
            dispatcher.dispatch(again).await,
            DispatchOutcome::Ignored
        ));
        Ok(())
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "handler panicked");
    }
}
