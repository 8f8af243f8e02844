//! Shared command utilities
//!
//! This module contains:
//! - `load_rules` - Resolve the rules file in effect
//! - `load_input` - Read, normalize and filter a transaction file
//! - `anchor_date` / `slice_period` - Date anchoring for exported files
//! - `print_json` - Pretty JSON output for `--json`

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use quo_core::store::read_path;
use quo_core::{RawAmount, RawTransaction, RuleBook, TransactionSet};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cli::{InputArgs, Period};

/// Load rules from `--rules`, the data directory, or the built-in tables
pub fn load_rules(path: Option<&Path>) -> Result<RuleBook> {
    let (rules, source) = RuleBook::resolve(path).context("Failed to load rules")?;
    debug!("Using {}", source);
    Ok(rules)
}

/// Read the transaction file and apply the input flags
pub fn load_input(input: &InputArgs) -> Result<TransactionSet> {
    let mut records = read_path(&input.file)
        .with_context(|| format!("Failed to read {}", input.file.display()))?;

    if input.signed {
        records = debits_only(records);
    }

    let set = TransactionSet::from_raw(records);
    if !set.exclusions().is_empty() {
        warn!(
            "Skipped {} of {} records in {}",
            set.exclusions().len(),
            set.len() + set.exclusions().len(),
            input.file.display()
        );
    }

    let set = set.without_modes(!input.include_transfers, !input.include_loans);
    info!(
        "Loaded {} transactions ({} excluded)",
        set.len(),
        set.exclusions().len()
    );
    Ok(set)
}

/// Keep debits as positive expenses and drop credits.
///
/// Rows whose amount cannot be read pass through untouched so the store
/// excludes and counts them.
pub fn debits_only(records: Vec<RawTransaction>) -> Vec<RawTransaction> {
    let before = records.len();
    let debits: Vec<RawTransaction> = records
        .into_iter()
        .filter_map(|mut r| match r.amount.value() {
            Some(amount) if amount > 0.0 => None,
            Some(amount) => {
                r.amount = RawAmount::Number(amount.abs());
                Some(r)
            }
            None => Some(r),
        })
        .collect();
    debug!("Dropped {} credit rows", before - debits.len());
    debits
}

/// Date of the latest transaction, or now for an empty set.
///
/// Exported files describe the past, so windows ("last 90 days", "trailing
/// six months") are measured back from the newest record rather than today.
pub fn anchor_date(set: &TransactionSet) -> DateTime<Utc> {
    set.iter().map(|t| t.date).max().unwrap_or_else(Utc::now)
}

/// Restrict a set to the calendar month or year of its latest transaction
pub fn slice_period(set: &TransactionSet, period: Period) -> TransactionSet {
    let latest = anchor_date(set);
    let bounds = match period {
        Period::All => None,
        Period::Month => NaiveDate::from_ymd_opt(latest.year(), latest.month(), 1)
            .map(|start| (start, Months::new(1))),
        Period::Year => {
            NaiveDate::from_ymd_opt(latest.year(), 1, 1).map(|start| (start, Months::new(12)))
        }
    };

    let Some((start, length)) = bounds else {
        return set.clone();
    };
    let Some(end) = start.checked_add_months(length) else {
        return set.clone();
    };

    let to_utc = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    match (to_utc(start), to_utc(end)) {
        (Some(from), Some(to)) => {
            debug!("Slicing {:?} period: {} to {}", period, from, to);
            set.between(from, to)
        }
        _ => set.clone(),
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    println!("{}", json);
    Ok(())
}
