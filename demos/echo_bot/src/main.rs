//! Echo Bot
//!
//! A small bot showing the main pieces of the maxbot SDK:
//!
//! - free-text handlers with an exact-text filter (`ping`)
//! - commands with aliases (`/echo`, `/say`)
//! - a two-step conversation kept in an [`FsmStore`] (`/name`)
//! - a per-user counter kept in FSM data (`/count`)
//!
//! # Usage
//!
//! ```bash
//! MAXBOT_BOT__ACCESS_TOKEN=... cargo run --package echo-bot
//! cargo run --package echo-bot -- --config maxbot.toml --profile production
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use maxbot::prelude::*;
use maxbot::runtime::config::ConfigLoader;
use serde_json::json;
use tracing::{info, warn};

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "echo-bot", about = "Echo bot for the Max messenger")]
struct Args {
    /// Configuration file; searched in the current directory if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile (development, production, ...).
    #[arg(short, long)]
    profile: Option<String>,
}

/// Conversation stages of the `/name` flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    AwaitingName,
}

type Store = Arc<FsmStore<Stage>>;

// ============================================================================
// Handlers
// ============================================================================

async fn log_message(ctx: MessageContext) {
    let sender = ctx
        .message
        .sender
        .as_ref()
        .map(|u| u.display_name().to_owned())
        .unwrap_or_default();
    info!(sender = %sender, chat = ?ctx.message.recipient.chat_id, "{}", ctx.text());
}

async fn ping(ctx: MessageContext) -> HandlerResult {
    ctx.reply("pong").await?;
    Ok(())
}

async fn echo(ctx: CommandContext) -> HandlerResult {
    let text = if ctx.args.is_empty() {
        format!("Usage: /{} <text>", ctx.name)
    } else {
        ctx.args.clone()
    };
    ctx.reply(text).await?;
    Ok(())
}

async fn greet(ctx: BotStartContext) -> HandlerResult {
    let name = ctx.payload.user.display_name().to_owned();
    ctx.reply(format!("Hi {name}! Try /echo, /name or /count.")).await?;
    Ok(())
}

async fn ask_name(ctx: CommandContext, store: Store) -> HandlerResult {
    let Some(user_id) = ctx.message.sender_id() else {
        return Ok(());
    };
    store.cursor(user_id).change_state(Stage::AwaitingName);
    ctx.reply("What is your name?").await?;
    Ok(())
}

async fn receive_name(ctx: MessageContext, store: Store) -> HandlerResult {
    let Some(user_id) = ctx.message.sender_id() else {
        return Ok(());
    };
    let fsm = store.cursor(user_id);
    let name = ctx.text().trim().to_owned();
    fsm.update_data(FsmData::from([("name".to_owned(), json!(name))]));
    fsm.clear_state();
    ctx.reply(format!("Nice to meet you, {name}!")).await?;
    Ok(())
}

async fn count(ctx: CommandContext, store: Store) -> HandlerResult {
    let Some(user_id) = ctx.message.sender_id() else {
        return Ok(());
    };
    let fsm = store.cursor(user_id);

    if ctx.args == "reset" {
        fsm.clear_data();
        ctx.reply("Counter reset.").await?;
        return Ok(());
    }

    let next = fsm.get_data_as::<u64>("count").unwrap_or(0) + 1;
    fsm.update_data(FsmData::from([("count".to_owned(), json!(next))]));

    let greeting = match fsm.get_data_as::<String>("name") {
        Ok(name) => format!("{name}, you"),
        Err(_) => "You".to_owned(),
    };
    ctx.reply(format!("{greeting} called /count {next} time(s).")).await?;
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn register_handlers(registry: &mut HandlerRegistry, store: &Store) -> Result<()> {
    registry.on_ready(|bot: Arc<Bot>| async move {
        info!(username = ?bot.username(), "Echo bot is ready");
    });

    registry.on_message(log_message);
    registry.on_message_filtered("ping", ping);

    let awaiting = Arc::clone(store);
    let receiving = Arc::clone(store);
    registry.on_message_filtered(
        Filter::predicate(move |ctx: &MessageContext| {
            !ctx.text().starts_with('/')
                && ctx
                    .message
                    .sender_id()
                    .is_some_and(|id| awaiting.get_state(id) == Some(Stage::AwaitingName))
        }),
        move |ctx: MessageContext| receive_name(ctx, Arc::clone(&receiving)),
    );

    registry.on_bot_start(greet);
    registry.on_button_callback(|ctx: CallbackContext| async move {
        warn!(payload = ctx.payload(), "Unexpected button press");
    });

    registry
        .on_command("echo", &["say"], echo)
        .context("registering /echo")?;

    let names = Arc::clone(store);
    registry
        .on_command("name", &[], move |ctx: CommandContext| {
            ask_name(ctx, Arc::clone(&names))
        })
        .context("registering /name")?;

    let counters = Arc::clone(store);
    registry
        .on_command("count", &[], move |ctx: CommandContext| {
            count(ctx, Arc::clone(&counters))
        })
        .context("registering /count")?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new().with_current_dir();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    if let Some(profile) = &args.profile {
        loader = loader.profile(profile);
    }
    let config = loader.load_validated().context("loading configuration")?;

    let mut runtime = BotRuntime::from_config(&config)?;
    let store: Store = Arc::new(FsmStore::new());
    register_handlers(runtime.registry_mut(), &store)?;

    runtime.run().await?;
    Ok(())
}
