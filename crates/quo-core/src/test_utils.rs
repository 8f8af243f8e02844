//! Test utilities for quo-core
//!
//! Fixture builders for transactions and transaction files, shared by the
//! unit tests, the integration tests and the CLI tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::{CategoryTotal, Transaction};

/// Midnight UTC on the given day
pub fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Shorthand for [`Transaction::new`] with a calendar date
pub fn tx(description: &str, category: &str, day: DateTime<Utc>, amount: f64) -> Transaction {
    Transaction::new(description, category, day, amount)
}

/// `count` charges of `amount`, the first at `start`, each following the
/// previous one by the next gap in `gaps` (cycled)
pub fn charge_series(
    description: &str,
    category: &str,
    start: DateTime<Utc>,
    gaps: &[i64],
    count: usize,
    amount: f64,
) -> Vec<Transaction> {
    let mut date = start;
    let mut series = Vec::with_capacity(count);
    for i in 0..count {
        series.push(tx(description, category, date, amount));
        if !gaps.is_empty() {
            date += Duration::days(gaps[i % gaps.len()]);
        }
    }
    series
}

/// One transaction per entry, dated the 15th of consecutive months from
/// `(year, month)`
pub fn monthly_totals(year: i32, month: u32, category: &str, totals: &[f64]) -> Vec<Transaction> {
    totals
        .iter()
        .enumerate()
        .map(|(i, &amount)| {
            let index = (month - 1) as i32 + i as i32;
            let y = year + index.div_euclid(12);
            let m = index.rem_euclid(12) as u32 + 1;
            tx("Monthly spend", category, date(y, m, 15), amount)
        })
        .collect()
}

/// Category totals from `(name, amount)` pairs
pub fn category_totals(pairs: &[(&str, f64)]) -> Vec<CategoryTotal> {
    pairs
        .iter()
        .map(|(name, amount)| CategoryTotal::new(*name, *amount))
        .collect()
}

/// Write transactions as a JSON array of raw records
pub fn write_json(dir: &Path, name: &str, transactions: &[Transaction]) -> PathBuf {
    let records: Vec<serde_json::Value> = transactions
        .iter()
        .map(|t| {
            serde_json::json!({
                "description": t.description,
                "category": t.category,
                "date": t.date.to_rfc3339(),
                "amount": t.amount,
            })
        })
        .collect();

    let path = dir.join(name);
    let content = serde_json::to_string_pretty(&records).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

/// Write a CSV file with a header row and the given data lines
pub fn write_csv(dir: &Path, name: &str, header: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{}", header).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    path
}

/// A few months of mixed household spending with two clear subscriptions
pub fn household_snapshot() -> Vec<Transaction> {
    let mut txs = Vec::new();
    let start = date(2024, 1, 5);

    txs.extend(charge_series(
        "NETFLIX.COM",
        "Streaming Services",
        start,
        &[31, 29, 31, 30, 31],
        6,
        15.99,
    ));
    txs.extend(charge_series(
        "Spotify Premium",
        "Music Services",
        date(2024, 1, 12),
        &[30, 29, 31],
        6,
        11.99,
    ));

    for i in 0..6i64 {
        let day = start + Duration::days(i * 30 + 2);
        txs.push(tx(
            "Coles Supermarket",
            "Supermarket and Grocery Stores",
            day,
            150.0 + 12.5 * i as f64,
        ));
        txs.push(tx("Shell Coles Express", "Fuel Retailing", day, 60.0 + i as f64));
        txs.push(tx("POS PURCHASE 4412", "Unknown", day, 20.0 + 3.0 * i as f64));
    }

    txs
}
