/// Conversion of Telegram updates into transport-neutral events
pub mod convert;
/// Resilient Bot API calls with automatic retry
pub mod resilient;
/// [`cmdbot_core::transport::ChatTransport`] implementation over teloxide
pub mod transport;

pub use transport::TelegramTransport;
