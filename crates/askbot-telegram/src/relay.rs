//! The command relay — one `/gpt` command handled end to end.
//!
//! Flow per command: allow-list check → argument normalization → length
//! guard → transient "thinking" indicator → single completion call →
//! best-effort indicator removal → chunked reply delivery. All screening
//! happens before any upstream call; every failure path ends in exactly one
//! outbound chat message.

use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::types::{BotCommand, UpdateKind};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use askbot_core::config::Config;
use askbot_providers::CompletionProvider;

use crate::formatting::{normalize_question, split_text};

/// Per-message character cap, a safety margin below Telegram's 4096 limit.
pub const CHUNK_MAX_CHARS: usize = 4000;

const THINKING_TEXT: &str = "🤔 Thinking…";
const NOT_ALLOWED_TEXT: &str = "❌ The bot does not work in this chat.";
const AUTH_ERROR_TEXT: &str =
    "❌ The completion API rejected the request. Check the API key and account balance.";
const APOLOGY_TEXT: &str = "❌ Sorry, something went wrong. Please try again later.";

// ─────────────────────────────────────────────
// Screening
// ─────────────────────────────────────────────

/// Why a question was turned away before any upstream call.
#[derive(Debug, PartialEq, Eq)]
pub enum Rejection {
    /// Chat is not in the allow-list.
    NotAllowed,
    /// Nothing left after normalization.
    Empty,
    /// Normalized question exceeds the configured cap (carried for the message).
    TooLong(usize),
}

impl Rejection {
    /// The fixed reply sent for this rejection.
    pub fn message(&self) -> String {
        match self {
            Rejection::NotAllowed => NOT_ALLOWED_TEXT.to_string(),
            Rejection::Empty => "Please write a message after the /gpt command.\n\
                 Example: /gpt \"Hi, how are you?\""
                .to_string(),
            Rejection::TooLong(max) => {
                format!("❌ The message is too long. Maximum {max} characters.")
            }
        }
    }
}

/// Screen one incoming ask: authorization, normalization, length guard.
///
/// Pure — no I/O — so a rejection here provably makes no upstream call.
pub fn screen_question(config: &Config, chat_id: i64, args: &str) -> Result<String, Rejection> {
    if !config.telegram.allowed_chats.contains(chat_id) {
        return Err(Rejection::NotAllowed);
    }

    let question = normalize_question(args);
    if question.is_empty() {
        return Err(Rejection::Empty);
    }

    let max = config.telegram.max_question_chars;
    if question.chars().count() > max {
        return Err(Rejection::TooLong(max));
    }

    Ok(question)
}

// ─────────────────────────────────────────────
// Reply selection
// ─────────────────────────────────────────────

/// Deterministic placeholder sent when the upstream call fails.
///
/// The user sees their own question echoed back, not an error page.
pub fn fallback_response(question: &str) -> String {
    format!(
        "You asked: \"{question}\"\n\n\
         The assistant is still being set up, so I can't answer that just yet. \
         Please try again a little later."
    )
}

/// Run the completion and map its outcome to the reply text.
///
/// Auth/quota failures get a specific fixed message; every other failure
/// gets the fallback placeholder. Raw provider errors never reach the chat.
pub async fn completion_reply(provider: &dyn CompletionProvider, question: &str) -> String {
    match provider.complete(question).await {
        Ok(text) => text,
        Err(e) if e.is_auth() => {
            warn!(error = %e, "completion rejected for auth/quota reasons");
            AUTH_ERROR_TEXT.to_string()
        }
        Err(e) => {
            warn!(error = %e, "completion failed, replying with fallback");
            fallback_response(question)
        }
    }
}

// ─────────────────────────────────────────────
// Command parsing
// ─────────────────────────────────────────────

/// Split a command line into the command token and its argument text,
/// stripping any `@botname` suffix (e.g. `/gpt@askbot question`).
pub fn parse_command(text: &str) -> (&str, &str) {
    let (command, args) = match text.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest),
        None => (text, ""),
    };
    let command = command.split('@').next().unwrap_or(command);
    (command, args)
}

/// Whether a command token is the ask command or its historical `/GTP` alias.
pub fn is_ask_command(command: &str) -> bool {
    command.eq_ignore_ascii_case("/gpt") || command.eq_ignore_ascii_case("/gtp")
}

// ─────────────────────────────────────────────
// TelegramRelay
// ─────────────────────────────────────────────

/// Telegram bot relay using manual long polling.
pub struct TelegramRelay {
    config: Arc<Config>,
    provider: Arc<dyn CompletionProvider>,
    /// Shutdown signal.
    shutdown: Arc<Notify>,
}

impl TelegramRelay {
    /// Create a new relay over the given provider.
    pub fn new(config: Arc<Config>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            config,
            provider,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Run the long-polling loop until [`TelegramRelay::stop`] is called.
    pub async fn run(&self) -> Result<()> {
        let bot = Bot::new(&self.config.telegram.token);

        let commands = vec![
            BotCommand::new("start", "Start the bot"),
            BotCommand::new("help", "Show usage"),
            BotCommand::new("gpt", "Ask the assistant a question"),
        ];
        if let Err(e) = bot.set_my_commands(commands).await {
            warn!(error = %e, "failed to set bot commands menu");
        }

        info!(
            bot = %self.config.telegram.bot_name,
            "telegram relay connected, polling for updates"
        );

        let mut offset: i32 = 0;

        loop {
            tokio::select! {
                updates = bot.get_updates().offset(offset).timeout(30).send() => {
                    match updates {
                        Ok(updates) => {
                            for update in &updates {
                                offset = (update.id.0 as i32).wrapping_add(1);
                                self.handle_update(&bot, update).await;
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "telegram polling error");
                            tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    info!("telegram relay shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Signal the polling loop to stop.
    pub fn stop(&self) {
        self.shutdown.notify_waiters();
    }

    /// Handle one incoming update; only command messages are of interest.
    async fn handle_update(&self, bot: &Bot, update: &Update) {
        let message = match &update.kind {
            UpdateKind::Message(msg) => msg,
            _ => return,
        };

        let Some(text) = message.text() else { return };
        if !text.starts_with('/') {
            return;
        }

        self.handle_command(bot, message.chat.id, text).await;
    }

    /// Dispatch a command. Nothing escapes this boundary: an error in the
    /// ask flow is logged and answered with one fixed apology message.
    async fn handle_command(&self, bot: &Bot, chat: ChatId, text: &str) {
        let (command, args) = parse_command(text);

        match command {
            "/start" => {
                let _ = bot.send_message(chat, self.greeting()).await;
            }
            "/help" => {
                let _ = bot.send_message(chat, self.help_text()).await;
            }
            c if is_ask_command(c) => {
                if let Err(e) = self.handle_ask(bot, chat, args).await {
                    error!(chat = chat.0, error = %e, "ask flow failed");
                    let _ = bot.send_message(chat, APOLOGY_TEXT).await;
                }
            }
            _ => {
                debug!(command = command, "unknown command, ignoring");
            }
        }
    }

    /// The ask pipeline for one `/gpt` command.
    async fn handle_ask(&self, bot: &Bot, chat: ChatId, args: &str) -> Result<()> {
        let question = match screen_question(&self.config, chat.0, args) {
            Ok(question) => question,
            Err(rejection) => {
                debug!(chat = chat.0, rejection = ?rejection, "question rejected before upstream call");
                bot.send_message(chat, rejection.message())
                    .await
                    .context("failed to send rejection reply")?;
                return Ok(());
            }
        };

        debug!(chat = chat.0, chars = question.chars().count(), "relaying question");

        let thinking = bot
            .send_message(chat, THINKING_TEXT)
            .await
            .context("failed to send thinking indicator")?;

        let reply = completion_reply(self.provider.as_ref(), &question).await;

        // Indicator cleanup is best-effort and must never abort the flow.
        if let Err(e) = bot.delete_message(chat, thinking.id).await {
            debug!(chat = chat.0, error = %e, "failed to delete thinking indicator");
        }

        for chunk in split_text(&reply, CHUNK_MAX_CHARS) {
            bot.send_message(chat, chunk)
                .await
                .context("failed to send reply chunk")?;
        }

        Ok(())
    }

    fn greeting(&self) -> String {
        format!(
            "🤖 Hi! I'm {name}, a bot with GPT.\n\
             Use /gpt \"your question\" to talk to me.\n\n\
             Example: /gpt \"Write a carbonara recipe\"",
            name = self.config.telegram.bot_name
        )
    }

    fn help_text(&self) -> String {
        format!(
            "🤖 {name} commands:\n\n\
             /gpt \"your question\" — ask the assistant\n\
             /help — show this message\n\n\
             Examples:\n\
             /gpt \"Write a carbonara recipe\"\n\
             /gpt \"Explain quantum physics in simple words\"\n\n\
             ⚡ The bot answers in: {chats}",
            name = self.config.telegram.bot_name,
            chats = self.config.telegram.allowed_chats.describe()
        )
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
