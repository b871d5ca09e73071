//! Configuration — built once at startup from environment variables.
//!
//! The original deployment configured everything through `.env`; we keep the
//! same variable names where they existed (`TELEGRAM_BOT_TOKEN`, `BOT_NAME`,
//! `ALLOWED_GROUP_IDS`, `GPT_MODEL`, `GPT_MAX_TOKENS`, `GPT_TEMPERATURE`).
//!
//! Nothing in request handling reads the environment: the loaded [`Config`]
//! is passed down explicitly and is immutable for the process lifetime.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::warn;

/// Default inbound question length cap, in characters.
pub const DEFAULT_MAX_QUESTION_CHARS: usize = 2000;

/// Default provider request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ─────────────────────────────────────────────
// Provider style
// ─────────────────────────────────────────────

/// Which upstream completion API shape to speak.
///
/// Selected once via `LLM_PROVIDER`; the relay logic is identical for all
/// three, only the HTTP request/response shape differs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderStyle {
    /// OpenAI-compatible `/chat/completions` with Bearer auth.
    OpenAi,
    /// Yandex Foundation Models `/foundationModels/v1/completion` with Api-Key auth.
    Yandex,
    /// DeepSeek `/chat/completions` (OpenAI shape plus explicit `stream: false`).
    DeepSeek,
}

impl ProviderStyle {
    /// Parse the `LLM_PROVIDER` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(ProviderStyle::OpenAi),
            "yandex" => Some(ProviderStyle::Yandex),
            "deepseek" => Some(ProviderStyle::DeepSeek),
            _ => None,
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn key_env(&self) -> &'static str {
        match self {
            ProviderStyle::OpenAi => "OPENAI_API_KEY",
            ProviderStyle::Yandex => "YANDEX_API_KEY",
            ProviderStyle::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }

    /// Default API base URL.
    pub fn default_api_base(&self) -> &'static str {
        match self {
            ProviderStyle::OpenAi => "https://api.openai.com/v1",
            ProviderStyle::Yandex => "https://llm.api.cloud.yandex.net",
            ProviderStyle::DeepSeek => "https://api.deepseek.com",
        }
    }

    /// Default model when `GPT_MODEL` is unset.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderStyle::OpenAi => "gpt-3.5-turbo",
            ProviderStyle::Yandex => "yandexgpt-lite",
            ProviderStyle::DeepSeek => "deepseek-chat",
        }
    }
}

impl fmt::Display for ProviderStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderStyle::OpenAi => "openai",
            ProviderStyle::Yandex => "yandex",
            ProviderStyle::DeepSeek => "deepseek",
        };
        f.write_str(name)
    }
}

// ─────────────────────────────────────────────
// Allow-list
// ─────────────────────────────────────────────

/// Which chats may use the completion command.
///
/// `ALLOWED_GROUP_IDS=all` means no restriction; otherwise a comma-separated
/// list of Telegram chat ids. Membership is a pure function of (chat id, set).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowedChats {
    /// The `all` sentinel — every chat is permitted.
    All,
    /// Explicit set of permitted chat ids.
    Only(HashSet<i64>),
}

impl AllowedChats {
    /// Parse the `ALLOWED_GROUP_IDS` value.
    ///
    /// Entries that are not valid chat ids are skipped with a warning rather
    /// than locking the bot out of every chat.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("all") {
            return AllowedChats::All;
        }

        let mut ids = HashSet::new();
        for entry in raw.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            match entry.parse::<i64>() {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(_) => {
                    warn!(entry = %entry, "ignoring non-numeric chat id in ALLOWED_GROUP_IDS");
                }
            }
        }
        AllowedChats::Only(ids)
    }

    /// Whether a chat is permitted to use the bot.
    pub fn contains(&self, chat_id: i64) -> bool {
        match self {
            AllowedChats::All => true,
            AllowedChats::Only(ids) => ids.contains(&chat_id),
        }
    }

    /// Human-readable form for `/help` and `status` output.
    pub fn describe(&self) -> String {
        match self {
            AllowedChats::All => "all chats".to_string(),
            AllowedChats::Only(ids) => {
                let mut sorted: Vec<i64> = ids.iter().copied().collect();
                sorted.sort_unstable();
                let rendered: Vec<String> = sorted.iter().map(i64::to_string).collect();
                rendered.join(", ")
            }
        }
    }
}

// ─────────────────────────────────────────────
// Config sections
// ─────────────────────────────────────────────

/// Telegram-side settings.
#[derive(Clone, Debug)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub token: String,
    /// Display name used in the greeting and help text.
    pub bot_name: String,
    /// Chats permitted to use `/gpt`.
    pub allowed_chats: AllowedChats,
    /// Maximum question length after normalization, in characters.
    pub max_question_chars: usize,
}

/// Upstream completion provider settings.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// Which API shape to speak.
    pub style: ProviderStyle,
    /// API key for the selected provider.
    pub api_key: String,
    /// Endpoint base override (`LLM_API_BASE`). None = provider default.
    pub api_base: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Completion token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Bound on the single upstream attempt.
    pub timeout: Duration,
    /// Yandex folder id for the `gpt://<folder>/<model>` model URI.
    pub folder_id: Option<String>,
}

impl ProviderConfig {
    /// Effective API base: override or the provider default.
    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or_else(|| self.style.default_api_base())
    }
}

/// Root configuration, loaded once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub provider: ProviderConfig,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Missing mandatory variables (`TELEGRAM_BOT_TOKEN`, the provider API
    /// key, `YANDEX_FOLDER_ID` for Yandex) are errors; the caller treats
    /// them as fatal at startup.
    pub fn from_env() -> Result<Self> {
        Self::from_source(&|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_source(source: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let token = match source("TELEGRAM_BOT_TOKEN") {
            Some(t) if !t.trim().is_empty() => t,
            _ => bail!("TELEGRAM_BOT_TOKEN is not set"),
        };

        let style = match source("LLM_PROVIDER") {
            Some(raw) => match ProviderStyle::parse(&raw) {
                Some(style) => style,
                None => bail!("unknown LLM_PROVIDER '{raw}' (expected openai, yandex or deepseek)"),
            },
            None => ProviderStyle::OpenAi,
        };

        let api_key = match source(style.key_env()) {
            Some(k) if !k.trim().is_empty() => k,
            _ => bail!("{} is not set", style.key_env()),
        };

        let folder_id = source("YANDEX_FOLDER_ID").filter(|v| !v.trim().is_empty());
        if style == ProviderStyle::Yandex && folder_id.is_none() {
            bail!("YANDEX_FOLDER_ID is required when LLM_PROVIDER=yandex");
        }

        let allowed_chats = AllowedChats::parse(
            &source("ALLOWED_GROUP_IDS").unwrap_or_else(|| "all".to_string()),
        );

        Ok(Config {
            telegram: TelegramConfig {
                token,
                bot_name: source("BOT_NAME").unwrap_or_else(|| "AskBot".to_string()),
                allowed_chats,
                max_question_chars: parse_or_default(
                    source,
                    "GPT_MAX_QUESTION_CHARS",
                    DEFAULT_MAX_QUESTION_CHARS,
                ),
            },
            provider: ProviderConfig {
                style,
                api_key,
                api_base: source("LLM_API_BASE").filter(|v| !v.trim().is_empty()),
                model: source("GPT_MODEL")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| style.default_model().to_string()),
                max_tokens: parse_or_default(source, "GPT_MAX_TOKENS", 500),
                temperature: parse_or_default(source, "GPT_TEMPERATURE", 0.7),
                timeout: Duration::from_secs(parse_or_default(
                    source,
                    "GPT_REQUEST_TIMEOUT_SECS",
                    DEFAULT_TIMEOUT_SECS,
                )),
                folder_id,
            },
        })
    }
}

/// Parse a numeric variable, keeping the default on absence or a bad value.
fn parse_or_default<T: FromStr + Copy>(
    source: &dyn Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    match source(name) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(var = name, value = %raw, "unparseable numeric value, using default");
                default
            }
        },
        None => default,
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
