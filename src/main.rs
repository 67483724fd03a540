//! # Chat Commands Console
//!
//! Runs the command framework against stdin so commands can be tried
//! without a chat client.
//!
//! This is the entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - The framework with a few sample commands
//! - The stdin event loop

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use chat_commands::config::Settings;
use chat_commands::domain::{Category, CommandEvent, Embed, GateResult};
use chat_commands::infrastructure::metrics;
use chat_commands::presentation::console::{line_to_event, ConsolePlatform};
use chat_commands::{Framework, FrameworkBuilder};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    chat_commands::telemetry::init_tracing();

    info!("Starting command console...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        prefix = %settings.framework.default_prefix,
        default_cooldown_ms = settings.rate_limit.default_cooldown_ms,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let framework = FrameworkBuilder::from_settings(&settings).build(Arc::new(ConsolePlatform::new()))?;
    register_commands(&framework)?;

    info!(commands = framework.registry().len(), "Reading commands from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut message_id = 0_i64;
    while let Some(line) = lines.next_line().await? {
        message_id += 1;
        if let Some(event) = line_to_event(&line, message_id) {
            framework.submit(event)?;
        }
    }

    framework.shutdown().await;
    tracing::debug!(metrics = %metrics::gather_metrics(), "Final metrics");
    Ok(())
}

fn register_commands(framework: &Framework) -> Result<()> {
    framework.add_middleware("argument_limit", |event: &CommandEvent| {
        if event.arguments.len() > 20 {
            GateResult::deny_with("That is a lot of arguments.")
        } else {
            GateResult::allow()
        }
    });
    framework.add_afterware("audit", |event: CommandEvent| async move {
        info!(command = %event.command.name(), user_id = event.user_id(), "Command completed");
    });
    framework.add_category(Category::new("Fun").description("Toys").middleware("argument_limit"))?;

    framework.register(
        framework
            .command("ping")
            .description("Check that the bot answers")
            .cooldown(Duration::from_secs(3))
            .afterware("audit")
            .hybrid(|event: CommandEvent| async move {
                event.respond().content("Pong!").respond().await?;
                anyhow::Ok(())
            }),
    )?;

    framework.register(
        framework
            .command("say")
            .description("Repeat a sentence")
            .category("Fun")
            .shortcut("echo")
            .format("say :[text:rest()]")
            .on_message(|event: CommandEvent| async move {
                let text = event.arguments.get("text").unwrap_or_else(|| "...".to_string());
                event.respond().content(text).suppress_mentions().respond().await?;
                anyhow::Ok(())
            }),
    )?;

    framework.register(
        framework
            .command("quiz")
            .description("Start a quiz")
            .category("Fun")
            .no_cooldown()
            .format("quiz :[difficulty::(easy,medium,hard)]")
            .on_message(|event: CommandEvent| async move {
                let reply = match event.arguments.get("difficulty") {
                    Some(difficulty) => Embed::new()
                        .title("Quiz")
                        .description(format!("Starting a {} quiz.", difficulty.to_lowercase())),
                    None => Embed::new()
                        .title("Quiz")
                        .description("Pick a difficulty: easy, medium or hard."),
                };
                event.respond().embed(reply).respond().await?;
                anyhow::Ok(())
            }),
    )?;

    let registry = framework.registry().clone();
    framework.register(
        framework
            .command("help")
            .description("List commands")
            .no_cooldown()
            .on_message(move |event: CommandEvent| {
                let registry = registry.clone();
                async move {
                    let mut embed = Embed::new().title("Commands");
                    for command in registry.all() {
                        embed = embed.field(command.name(), command.description(), false);
                    }
                    event.respond().embed(embed).respond().await?;
                    anyhow::Ok(())
                }
            }),
    )?;

    Ok(())
}
