//! Telegram command relay for Askbot.

pub mod formatting;
pub mod relay;

pub use relay::TelegramRelay;
