//! Transaction store
//!
//! A [`TransactionSet`] is the immutable snapshot every analyzer reads from.
//! Records are validated once at construction; anything that would break an
//! analyzer (unparsable, negative or non-finite amounts, unparsable dates) is
//! skipped and recorded as an [`Exclusion`] instead of aborting the whole
//! batch.
//!
//! Readers for the two flat input formats (JSON array, CSV with headers) also
//! live here so callers get [`RawTransaction`]s they can normalize before
//! building a set.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{
    CategoryTotal, MonthKey, RawAmount, RawTransaction, Transaction, TransactionMode,
};

/// Description used when the provider sent none
pub const DEFAULT_DESCRIPTION: &str = "No Description";
/// Category used when the provider sent none
pub const DEFAULT_CATEGORY: &str = "No Category";

/// Why a record was left out of a set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    InvalidAmount { value: String },
    NegativeAmount { amount: f64 },
    NonFiniteAmount,
    InvalidDate { value: String },
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAmount { value } => write!(f, "unparsable amount '{}'", value),
            Self::NegativeAmount { amount } => write!(f, "negative amount {}", amount),
            Self::NonFiniteAmount => write!(f, "non-finite amount"),
            Self::InvalidDate { value } => write!(f, "unparsable date '{}'", value),
        }
    }
}

/// A record skipped during construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    /// Position in the input batch
    pub index: usize,
    pub id: Option<String>,
    pub reason: ExclusionReason,
}

/// Ordered, validated snapshot of transactions
#[derive(Debug, Clone, Default)]
pub struct TransactionSet {
    transactions: Vec<Transaction>,
    exclusions: Vec<Exclusion>,
    by_month: BTreeMap<MonthKey, Vec<usize>>,
}

impl TransactionSet {
    /// Build a set from already-typed transactions
    pub fn new(transactions: Vec<Transaction>) -> Self {
        let mut accepted = Vec::with_capacity(transactions.len());
        let mut exclusions = Vec::new();

        for (index, mut tx) in transactions.into_iter().enumerate() {
            if let Some(reason) = check_amount(tx.amount) {
                exclusions.push(exclude(index, tx.id.clone(), reason));
                continue;
            }
            if tx.id.is_none() {
                tx.id = Some(tx.fingerprint());
            }
            accepted.push(tx);
        }

        Self::assemble(accepted, exclusions)
    }

    /// Validate and convert boundary records
    pub fn from_raw(records: Vec<RawTransaction>) -> Self {
        let mut accepted = Vec::with_capacity(records.len());
        let mut exclusions = Vec::new();

        for (index, raw) in records.into_iter().enumerate() {
            match convert(raw) {
                Ok(tx) => accepted.push(tx),
                Err((id, reason)) => exclusions.push(exclude(index, id, reason)),
            }
        }

        Self::assemble(accepted, exclusions)
    }

    fn assemble(transactions: Vec<Transaction>, exclusions: Vec<Exclusion>) -> Self {
        let mut by_month: BTreeMap<MonthKey, Vec<usize>> = BTreeMap::new();
        for (i, tx) in transactions.iter().enumerate() {
            by_month.entry(tx.month_key()).or_default().push(i);
        }

        debug!(
            "Built transaction set: {} accepted, {} excluded, {} months",
            transactions.len(),
            exclusions.len(),
            by_month.len()
        );

        Self {
            transactions,
            exclusions,
            by_month,
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    /// Months with at least one transaction, oldest first
    pub fn months(&self) -> impl Iterator<Item = MonthKey> + '_ {
        self.by_month.keys().copied()
    }

    /// Transactions that fall in `month`, in input order
    pub fn in_month(&self, month: MonthKey) -> Vec<&Transaction> {
        self.by_month
            .get(&month)
            .map(|idx| idx.iter().map(|&i| &self.transactions[i]).collect())
            .unwrap_or_default()
    }

    pub fn monthly_totals(&self) -> BTreeMap<MonthKey, f64> {
        self.by_month
            .iter()
            .map(|(month, idx)| {
                let total = idx.iter().map(|&i| self.transactions[i].amount).sum();
                (*month, total)
            })
            .collect()
    }

    /// Sum per raw category label, in first-appearance order
    pub fn category_totals(&self) -> Vec<CategoryTotal> {
        category_totals(&self.transactions)
    }

    pub fn total(&self) -> f64 {
        self.transactions.iter().map(|t| t.amount).sum()
    }

    /// New set holding the transactions that match `predicate`.
    ///
    /// Exclusions recorded while building this set carry over.
    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&Transaction) -> bool,
    {
        let kept = self
            .transactions
            .iter()
            .filter(|t| predicate(t))
            .cloned()
            .collect();
        Self::assemble(kept, self.exclusions.clone())
    }

    /// Transactions with `start <= date < end`
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.filter(|t| t.date >= start && t.date < end)
    }

    /// Drop transfers and/or loan rows
    pub fn without_modes(&self, transfers: bool, loans: bool) -> Self {
        self.filter(|t| !(transfers && t.mode.is_transfer()) && !(loans && t.mode.is_loan()))
    }
}

/// Sum per raw category label, in first-appearance order
pub fn category_totals(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    let mut order: Vec<CategoryTotal> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for tx in transactions {
        match index.get(tx.category.as_str()) {
            Some(&i) => order[i].amount += tx.amount,
            None => {
                index.insert(tx.category.as_str(), order.len());
                order.push(CategoryTotal::new(tx.category.clone(), tx.amount));
            }
        }
    }

    order
}

fn exclude(index: usize, id: Option<String>, reason: ExclusionReason) -> Exclusion {
    warn!(
        "Excluding record {} ({}): {}",
        index,
        id.as_deref().unwrap_or("no id"),
        reason
    );
    Exclusion { index, id, reason }
}

fn check_amount(amount: f64) -> Option<ExclusionReason> {
    if !amount.is_finite() {
        Some(ExclusionReason::NonFiniteAmount)
    } else if amount < 0.0 {
        Some(ExclusionReason::NegativeAmount { amount })
    } else {
        None
    }
}

type Rejected = (Option<String>, ExclusionReason);

fn convert(raw: RawTransaction) -> std::result::Result<Transaction, Rejected> {
    let Some(amount) = raw.amount.value() else {
        let value = raw.amount.to_string();
        return Err((raw.id, ExclusionReason::InvalidAmount { value }));
    };
    if let Some(reason) = check_amount(amount) {
        return Err((raw.id, reason));
    }
    let Some(date) = parse_date(&raw.date) else {
        return Err((raw.id, ExclusionReason::InvalidDate { value: raw.date }));
    };

    let description = raw
        .description
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());
    let category = raw
        .category
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let mode = raw
        .mode
        .filter(|s| !s.trim().is_empty())
        .map(TransactionMode::from)
        .unwrap_or_default();

    let mut tx = Transaction::new(description, category, date, amount).with_mode(mode);
    tx.id = match raw.id.filter(|s| !s.trim().is_empty()) {
        Some(id) => Some(id),
        None => Some(tx.fingerprint()),
    };
    Ok(tx)
}

/// Parse the date shapes providers send.
///
/// RFC 3339 (offsets converted to UTC), `YYYY-MM-DDTHH:MM:SS` and
/// `YYYY-MM-DD HH:MM:SS` (taken as UTC), `YYYY-MM-DD` (midnight UTC).
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];
    for fmt in formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse an amount string, handling currency symbols, commas and
/// accounting-style parentheses
pub(crate) fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned
        .parse::<f64>()
        .map_err(|_| Error::InvalidData(format!("Unable to parse amount: {}", s)))
}

/// Read a JSON array of raw records
pub fn read_json<R: Read>(reader: R) -> Result<Vec<RawTransaction>> {
    let records: Vec<RawTransaction> = serde_json::from_reader(reader)?;
    debug!("Parsed {} JSON records", records.len());
    Ok(records)
}

/// Read CSV with headers `id,description,category,date,amount,mode`.
///
/// Only the `date` and `amount` columns are required; header names are
/// matched case-insensitively and column order is free. Amount cells are kept
/// as text and validated when the set is built.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RawTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    };

    let date_col =
        column("date").ok_or_else(|| Error::InvalidData("Missing 'date' column".into()))?;
    let amount_col =
        column("amount").ok_or_else(|| Error::InvalidData("Missing 'amount' column".into()))?;
    let id_col = column("id");
    let description_col = column("description");
    let category_col = column("category");
    let mode_col = column("mode");

    let mut records = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let field = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .map(|s| s.to_string())
                .filter(|s| !s.is_empty())
        };

        records.push(RawTransaction {
            id: field(id_col),
            description: field(description_col),
            category: field(category_col),
            date: record.get(date_col).unwrap_or_default().to_string(),
            amount: record
                .get(amount_col)
                .filter(|s| !s.is_empty())
                .map(|s| RawAmount::Text(s.to_string()))
                .unwrap_or_default(),
            mode: field(mode_col),
        });
    }

    debug!("Parsed {} CSV records", records.len());
    Ok(records)
}

/// Read raw records from a `.json` or `.csv` file
pub fn read_path(path: &Path) -> Result<Vec<RawTransaction>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    let reader = BufReader::new(File::open(path)?);

    match extension.as_deref() {
        Some("json") => read_json(reader),
        Some("csv") => read_csv(reader),
        _ => Err(Error::InvalidData(format!(
            "Unsupported input format: {} (expected .json or .csv)",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    fn raw(date: &str, amount: f64) -> RawTransaction {
        RawTransaction {
            date: date.to_string(),
            amount: amount.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_date_shapes() {
        let rfc = parse_date("2024-01-15T10:00:00+02:00").unwrap();
        assert_eq!(rfc.hour(), 8);

        let naive = parse_date("2024-01-15T10:00:00").unwrap();
        assert_eq!(naive.hour(), 10);

        let day = parse_date("2024-01-15").unwrap();
        assert_eq!((day.year(), day.month(), day.day(), day.hour()), (2024, 1, 15, 0));

        assert!(parse_date("15/01/2024").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_from_raw_applies_defaults() {
        let set = TransactionSet::from_raw(vec![raw("2024-01-15", 12.5)]);
        assert_eq!(set.len(), 1);

        let tx = &set.transactions()[0];
        assert_eq!(tx.description, DEFAULT_DESCRIPTION);
        assert_eq!(tx.category, DEFAULT_CATEGORY);
        assert_eq!(tx.mode, TransactionMode::Payment);
        assert!(tx.id.as_deref().unwrap().starts_with("fp-"));
    }

    #[test]
    fn test_bad_records_are_excluded_not_fatal() {
        let mut bad_date = raw("yesterday", 5.0);
        bad_date.id = Some("tx-2".to_string());

        let set = TransactionSet::from_raw(vec![
            raw("2024-01-15", 10.0),
            raw("2024-01-16", -3.0),
            bad_date,
            raw("2024-01-17", f64::NAN),
        ]);

        assert_eq!(set.len(), 1);
        assert_eq!(set.exclusions().len(), 3);
        assert_eq!(set.exclusions()[0].index, 1);
        assert!(matches!(
            set.exclusions()[0].reason,
            ExclusionReason::NegativeAmount { .. }
        ));
        assert_eq!(set.exclusions()[1].id.as_deref(), Some("tx-2"));
        assert!(matches!(
            set.exclusions()[2].reason,
            ExclusionReason::NonFiniteAmount
        ));
    }

    #[test]
    fn test_month_buckets_and_totals() {
        let d = |m, day| Utc.with_ymd_and_hms(2024, m, day, 12, 0, 0).unwrap();
        let set = TransactionSet::new(vec![
            Transaction::new("A", "Food", d(2, 1), 10.0),
            Transaction::new("B", "Fuel", d(1, 3), 20.0),
            Transaction::new("C", "Food", d(2, 9), 5.0),
        ]);

        let months: Vec<_> = set.months().collect();
        assert_eq!(months, vec![MonthKey::new(2024, 1), MonthKey::new(2024, 2)]);
        assert_eq!(set.monthly_totals()[&MonthKey::new(2024, 2)], 15.0);
        assert_eq!(set.in_month(MonthKey::new(2024, 2)).len(), 2);

        let totals = set.category_totals();
        assert_eq!(totals[0], CategoryTotal::new("Food", 15.0));
        assert_eq!(totals[1], CategoryTotal::new("Fuel", 20.0));
    }

    #[test]
    fn test_filter_returns_new_set() {
        let d = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let set = TransactionSet::new(vec![
            Transaction::new("Rent", "Housing", d, 1000.0).with_mode(TransactionMode::Transfer),
            Transaction::new("Interest", "Loan", d, 50.0).with_mode(TransactionMode::LoanInterest),
            Transaction::new("Coffee", "Cafe", d, 4.0),
        ]);

        let payments = set.without_modes(true, true);
        assert_eq!(payments.len(), 1);
        assert_eq!(set.len(), 3);
        assert_eq!(set.without_modes(false, true).len(), 2);
    }

    #[test]
    fn test_read_csv_flexible_headers() {
        let data = "Date,Amount,Description,Category\n\
                    2024-03-01,\"$1,200.00\",Rent,Housing\n\
                    2024-03-02,4.50,Coffee,\n";
        let records = read_csv(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].amount.value(), Some(1200.0));
        assert_eq!(records[1].category, None);
        assert_eq!(records[0].id, None);

        let set = TransactionSet::from_raw(records);
        assert_eq!(set.transactions()[1].category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_read_csv_requires_amount() {
        let data = "date,description\n2024-03-01,Rent\n";
        assert!(matches!(read_csv(data.as_bytes()), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_read_csv_keeps_rows_with_bad_amounts() {
        let data = "date,description,amount\n\
                    2024-03-01,Rent,1800.00\n\
                    2024-03-02,Coffee,N/A\n\
                    2024-03-03,Fuel,\n\
                    2024-03-04,Refund,(12.00)\n";
        let records = read_csv(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[2].amount, RawAmount::Missing);

        let set = TransactionSet::from_raw(records);
        assert_eq!(set.len(), 1);
        assert_eq!(set.total(), 1800.0);

        let reasons: Vec<_> = set.exclusions().iter().map(|e| &e.reason).collect();
        assert_eq!(
            reasons,
            vec![
                &ExclusionReason::InvalidAmount {
                    value: "N/A".to_string()
                },
                &ExclusionReason::InvalidAmount {
                    value: "<missing>".to_string()
                },
                &ExclusionReason::NegativeAmount { amount: -12.0 },
            ]
        );
        assert_eq!(set.exclusions()[0].index, 1);
    }

    #[test]
    fn test_read_json_mixed_amount_shapes() {
        let data = r#"[
            {"id": "a", "date": "2024-01-05", "amount": 20},
            {"id": "b", "date": "2024-01-06", "amount": "12.50"},
            {"id": "c", "date": "2024-01-07", "amount": null},
            {"id": "d", "date": "2024-01-08", "amount": "twelve"},
            {"id": "e", "date": "2024-01-09", "amount": {"value": 3}},
            {"id": "f", "date": "2024-01-10"}
        ]"#;
        let records = read_json(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 6);

        let set = TransactionSet::from_raw(records);
        assert_eq!(set.len(), 2);
        assert_eq!(set.total(), 32.5);

        let excluded: Vec<_> = set
            .exclusions()
            .iter()
            .map(|e| e.id.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(excluded, vec!["c", "d", "e", "f"]);
        assert!(set
            .exclusions()
            .iter()
            .all(|e| matches!(e.reason, ExclusionReason::InvalidAmount { .. })));
    }

    #[test]
    fn test_read_json() {
        let data = r#"[
            {"id": "t1", "description": "NETFLIX", "category": "Streaming Services",
             "date": "2024-01-05T00:00:00Z", "amount": 15.99, "mode": "payment"},
            {"date": "2024-01-06", "amount": 3.0, "mode": "loan-interest"}
        ]"#;
        let records = read_json(data.as_bytes()).unwrap();
        let set = TransactionSet::from_raw(records);
        assert_eq!(set.len(), 2);
        assert_eq!(set.transactions()[0].id.as_deref(), Some("t1"));
        assert_eq!(set.transactions()[1].mode, TransactionMode::LoanInterest);
    }
}
