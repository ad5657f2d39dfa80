//! mbot CLI Binary
//!
//! Command-line interface for running and inspecting the bot.

use anyhow::Context;
use clap::Parser;
use mbot::logging::init_logging;
use mbot::tooling::cli::{Cli, CliContext};
use std::process;

fn initialize(cli: &Cli) -> anyhow::Result<CliContext> {
    let context = CliContext::new(cli.settings.clone(), cli.commands.clone())
        .context("Error loading settings")?;
    let logging = cli.logging_config(&context.settings().logging);
    init_logging(Some(&logging)).context("Error initializing logging")?;
    Ok(context)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let context = match initialize(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };

    // Execute command
    match context.execute(&cli.command).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
