use crate::bot::convert::{callback_event, inbound_event};
use crate::bot::TelegramTransport;
use crate::config::BotSettings;
use cmdbot_core::app::{open_backend, AppState};
use cmdbot_core::commands::{builtin, CommandRegistry};
use cmdbot_core::dispatch::Dispatcher as CommandDispatcher;
use cmdbot_core::storage::DocumentBackend;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{error, info, warn};

/// Run the Telegram transport runtime.
pub async fn run_bot(settings: Arc<BotSettings>) {
    let backend = init_storage(&settings).await;
    let registry = init_registry(&settings);

    let bot = Bot::new(settings.telegram.telegram_token.clone());
    let bot_username = resolve_bot_username(&bot, &settings).await;
    let transport = Arc::new(TelegramTransport::new(bot.clone()));

    let app = AppState::new(settings.core.as_ref().clone(), registry, backend, transport)
        .with_bot_username(bot_username);
    let dispatcher = match CommandDispatcher::new(Arc::new(app)) {
        Ok(d) => Arc::new(d),
        Err(e) => {
            error!(
                "Invalid command prefix {:?}: {}",
                settings.core.command_prefix, e
            );
            std::process::exit(1);
        }
    };
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn init_storage(settings: &BotSettings) -> Arc<dyn DocumentBackend> {
    match open_backend(settings.core.as_ref()).await {
        Ok(backend) => {
            info!(
                "Document store initialized ({}).",
                settings.core.database_path
            );
            backend
        }
        Err(e) => {
            error!("Failed to initialize document store: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_registry(settings: &BotSettings) -> CommandRegistry {
    let (registry, _report) = CommandRegistry::load(
        &settings.core.commands_dir,
        &settings.core.commands_skip(),
        &builtin::catalog(),
    );
    if registry.is_empty() {
        warn!(
            "No commands loaded from {}, the bot will ignore every command",
            settings.core.commands_dir.display()
        );
    }
    registry
}

async fn resolve_bot_username(bot: &Bot, settings: &BotSettings) -> Option<String> {
    if let Some(name) = settings.telegram.username() {
        return Some(name.to_string());
    }
    match bot.get_me().await {
        Ok(me) => {
            let username = me.user.username.clone();
            info!("Authorized as @{}", username.as_deref().unwrap_or("?"));
            username
        }
        Err(e) => {
            warn!(
                "Could not resolve bot username, `/cmd@name` mentions will not be filtered: {}",
                e
            );
            None
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(Update::filter_message().endpoint(handle_message))
}

async fn handle_message(
    msg: Message,
    dispatcher: Arc<CommandDispatcher>,
) -> Result<(), teloxide::RequestError> {
    // Returns once the command task is spawned.
    dispatcher.dispatch(inbound_event(&msg)).await;
    respond(())
}

async fn handle_callback(
    q: CallbackQuery,
    dispatcher: Arc<CommandDispatcher>,
) -> Result<(), teloxide::RequestError> {
    dispatcher.dispatch_callback(callback_event(&q)).await;
    respond(())
}
