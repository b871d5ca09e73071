//! Askbot CLI — entry point.
//!
//! # Commands
//!
//! - `askbot run [--logs]` — start the Telegram relay (long polling)
//! - `askbot status` — show the loaded configuration with masked credentials

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use askbot_core::config::Config;
use askbot_providers::{mask_key, CompletionClient};
use askbot_telegram::TelegramRelay;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 🤖 Askbot — Telegram relay for LLM completions
#[derive(Parser)]
#[command(name = "askbot", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot (long polling until interrupted)
    Run {
        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration with credentials masked
    Status,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Deployment configuration lives in `.env`; absence is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { logs } => {
            init_logging(logs);
            run().await
        }
        Commands::Status => status(),
    }
}

// ─────────────────────────────────────────────
// Run command
// ─────────────────────────────────────────────

async fn run() -> Result<()> {
    // Missing mandatory configuration is fatal: exit without serving.
    let config = Config::from_env().context("invalid configuration")?;

    print_banner(&config);
    info!(
        bot = %config.telegram.bot_name,
        provider = %config.provider.style,
        model = %config.provider.model,
        "🚀 starting"
    );

    let provider = Arc::new(CompletionClient::new(config.provider.clone()));
    let relay = TelegramRelay::new(Arc::new(config), provider);
    relay.run().await
}

/// Print the startup banner.
fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!(
        "{}  v{}",
        format!("🤖 {}", config.telegram.bot_name).cyan().bold(),
        version.dimmed()
    );
    println!();
}

// ─────────────────────────────────────────────
// Status command
// ─────────────────────────────────────────────

fn status() -> Result<()> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("{} {e:#}", "✗".red());
            return Ok(());
        }
    };

    println!();
    println!("{}", format!("🤖 {}", config.telegram.bot_name).cyan().bold());
    println!();
    println!("  {}    {}", "provider".dimmed(), config.provider.style);
    println!("  {}       {}", "model".dimmed(), config.provider.model);
    println!("  {}    {}", "api base".dimmed(), config.provider.api_base());
    println!(
        "  {}     {}",
        "api key".dimmed(),
        mask_key(&config.provider.api_key)
    );
    println!(
        "  {}   {}",
        "bot token".dimmed(),
        mask_key(&config.telegram.token)
    );
    println!(
        "  {}       {}",
        "chats".dimmed(),
        config.telegram.allowed_chats.describe()
    );
    println!(
        "  {}  {} chars in, {} tokens out, {}s timeout",
        "limits".dimmed(),
        config.telegram.max_question_chars,
        config.provider.max_tokens,
        config.provider.timeout.as_secs()
    );
    println!();

    Ok(())
}

// ─────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("askbot_core=debug,askbot_providers=debug,askbot_telegram=debug,info")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
