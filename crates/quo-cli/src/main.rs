//! Quo CLI - Spending analysis over exported bank transactions
//!
//! Usage:
//!   quo classify "Fuel Retailing"        Show a label's super-category
//!   quo group --file tx.json             Group spending into super-categories
//!   quo subscriptions --file tx.csv      Detect recurring charges
//!   quo analyze --file tx.json --json    Full report as JSON

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Reports go to stdout; keep logs off it so --json output stays parseable
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    let rules_path = cli.rules.as_deref();

    match cli.command {
        Commands::Classify { labels } => commands::cmd_classify(rules_path, &labels, cli.json),
        Commands::Group { input, period } => {
            commands::cmd_group(rules_path, &input, period, cli.json)
        }
        Commands::Unknown { input } => commands::cmd_unknown(rules_path, &input, cli.json),
        Commands::Subscriptions { input } => {
            commands::cmd_subscriptions(rules_path, &input, cli.json)
        }
        Commands::Trends { input, months } => commands::cmd_trends(&input, months, cli.json),
        Commands::Savings { input } => commands::cmd_savings(rules_path, &input, cli.json),
        Commands::Budget {
            input,
            income,
            savings_goal,
            fixed,
        } => commands::cmd_budget(rules_path, &input, income, savings_goal, fixed, cli.json),
        Commands::Analyze { input, months } => {
            commands::cmd_analyze(rules_path, &input, months, cli.json).await
        }
        Commands::Rules { dump } => commands::cmd_rules(rules_path, dump),
    }
}
