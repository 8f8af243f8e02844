//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use quo_core::DEFAULT_WINDOW_MONTHS;

/// Quo - Understand where the money goes
#[derive(Parser)]
#[command(name = "quo")]
#[command(about = "Transaction categorization and spending pattern analysis", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Rules file (defaults to the data directory copy, then the built-in tables)
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print reports as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Transaction file options shared by every analysis command
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Transaction file (.json array or .csv with a header row)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Amounts are signed: keep debits (negative) as expenses, drop credits
    #[arg(long)]
    pub signed: bool,

    /// Keep transfer rows (dropped by default)
    #[arg(long)]
    pub include_transfers: bool,

    /// Keep loan interest/repayment rows (dropped by default)
    #[arg(long)]
    pub include_loans: bool,
}

/// Time slice for the grouping report, anchored at the latest transaction
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Month,
    Year,
    All,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the super-category for one or more provider labels
    Classify {
        /// Provider category labels
        #[arg(required = true)]
        labels: Vec<String>,
    },

    /// Group spending into super-categories
    Group {
        #[command(flatten)]
        input: InputArgs,

        /// Period to group: month, year, all
        #[arg(short, long, value_enum, default_value = "all")]
        period: Period,
    },

    /// Break down generic ("Unknown", "Other") categories by keyword
    Unknown {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Detect recurring subscriptions and report their cost
    Subscriptions {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Monthly spending trends
    Trends {
        #[command(flatten)]
        input: InputArgs,

        /// Trailing window in months
        #[arg(short, long, default_value_t = DEFAULT_WINDOW_MONTHS)]
        months: u32,
    },

    /// Find savings opportunities in recent spending
    Savings {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Recommend a monthly budget
    Budget {
        #[command(flatten)]
        input: InputArgs,

        /// Monthly income
        #[arg(long)]
        income: f64,

        /// Monthly savings goal
        #[arg(long)]
        savings_goal: f64,

        /// Fixed monthly expense as NAME=AMOUNT (repeatable)
        ///
        /// Example: --fixed Rent=1800 --fixed Insurance=120
        #[arg(long = "fixed", value_parser = parse_fixed_expense)]
        fixed: Vec<(String, f64)>,
    },

    /// Run grouping, subscriptions and trends together
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Trailing trend window in months
        #[arg(short, long, default_value_t = DEFAULT_WINDOW_MONTHS)]
        months: u32,
    },

    /// Show which rules file is in effect
    Rules {
        /// Print the resolved rule tables as JSON
        #[arg(long)]
        dump: bool,
    },
}

/// Parse `NAME=AMOUNT`
pub fn parse_fixed_expense(s: &str) -> Result<(String, f64), String> {
    let (name, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=AMOUNT, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing expense name in '{}'", s));
    }
    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|_| format!("invalid amount in '{}'", s))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("amount must be a non-negative number in '{}'", s));
    }
    Ok((name.to_string(), amount))
}
