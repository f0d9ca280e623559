//! Telegram transport settings.

use cmdbot_core::config::CoreSettings;
use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Telegram transport settings loaded from environment variables.
#[derive(Deserialize, Serialize, Clone, Default)]
pub struct TelegramSettings {
    /// Telegram Bot API token.
    pub telegram_token: String,
    /// Bot username used to match `/cmd@username` mentions.
    /// Resolved through `getMe` when unset.
    pub bot_username: Option<String>,
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("telegram_token", &"[TELEGRAM_TOKEN]")
            .field("bot_username", &self.bot_username)
            .finish()
    }
}

impl TelegramSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        cmdbot_core::config::build_config()?.try_deserialize()
    }

    /// Configured username without a leading `@`, if any.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.bot_username
            .as_deref()
            .map(|name| name.trim().trim_start_matches('@'))
            .filter(|name| !name.is_empty())
    }
}

/// Combined settings used by the Telegram transport layer.
#[derive(Clone)]
pub struct BotSettings {
    /// Dispatcher, registry and storage settings.
    pub core: Arc<CoreSettings>,
    /// Telegram-specific settings.
    pub telegram: Arc<TelegramSettings>,
}

impl BotSettings {
    /// Create a new combined settings bundle.
    #[must_use]
    pub fn new(core: CoreSettings, telegram: TelegramSettings) -> Self {
        Self {
            core: Arc::new(core),
            telegram: Arc::new(telegram),
        }
    }
}

/// Initial delay between Bot API retries (milliseconds).
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Upper bound on a single retry delay (milliseconds).
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4_000;
/// Number of retries after the first attempt.
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;

#[cfg(test)]
mod tests {
    use super::TelegramSettings;
    use config::Config;

    #[test]
    fn test_username_normalization() {
        let mut settings = TelegramSettings {
            telegram_token: "dummy".to_string(),
            bot_username: None,
        };
        assert_eq!(settings.username(), None);

        settings.bot_username = Some("@my_bot".to_string());
        assert_eq!(settings.username(), Some("my_bot"));

        settings.bot_username = Some("  plain_bot ".to_string());
        assert_eq!(settings.username(), Some("plain_bot"));

        settings.bot_username = Some("@".to_string());
        assert_eq!(settings.username(), None);
    }

    #[test]
    fn test_deserialize_from_overrides() -> Result<(), config::ConfigError> {
        let settings: TelegramSettings = Config::builder()
            .set_override("telegram_token", "123:abc")?
            .set_override("bot_username", "helper_bot")?
            .build()?
            .try_deserialize()?;

        assert_eq!(settings.telegram_token, "123:abc");
        assert_eq!(settings.username(), Some("helper_bot"));
        Ok(())
    }

    #[test]
    fn test_debug_hides_token() {
        let settings = TelegramSettings {
            telegram_token: "123456789:secret".to_string(),
            bot_username: None,
        };
        assert!(!format!("{settings:?}").contains("secret"));
    }
}
