//! Unknown-transaction text analyzer
//!
//! Breaks down transactions with useless category labels ("Unknown",
//! "Other", ...) by the words in their descriptions. Two strategies:
//!
//! - [`analyze_unknown`]: the most frequent description keywords become
//!   sub-category labels
//! - [`analyze_by_merchant_patterns`]: the first two keywords act as a
//!   merchant key
//!
//! Both are greedy and single-pass; results are keyed in a `BTreeMap` so
//! iteration order is stable.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;
use tracing::debug;

use crate::models::Transaction;
use crate::rules::RuleBook;
use crate::store::TransactionSet;

/// Label for transactions that fit no keyword or merchant group
pub const OTHER_LABEL: &str = "Other";

/// Keywords that can become sub-category labels
const MAX_LABELS: usize = 20;
/// Minimum occurrences for a keyword to become a label
const MIN_LABEL_COUNT: usize = 3;
/// Minimum members for a merchant group to stand on its own
const MIN_MERCHANT_GROUP: usize = 2;

/// Sub-category label -> member transactions
pub type SubcategoryMap = BTreeMap<String, Vec<Transaction>>;

fn punctuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid regex"))
}

/// Title-case a lowercase keyword phrase ("coles express" -> "Coles Express").
///
/// Any non-alphabetic character starts a new word.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Splits descriptions into meaningful keywords
#[derive(Debug, Clone, Copy)]
pub struct KeywordExtractor<'a> {
    rules: &'a RuleBook,
}

impl Default for KeywordExtractor<'static> {
    fn default() -> Self {
        Self::new(RuleBook::builtin())
    }
}

impl<'a> KeywordExtractor<'a> {
    pub fn new(rules: &'a RuleBook) -> Self {
        Self { rules }
    }

    /// Lowercase, strip punctuation, split, and drop stop words, tokens of
    /// two characters or fewer and purely numeric tokens. Order is kept.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let cleaned = punctuation_re().replace_all(&lowered, " ");

        cleaned
            .split_whitespace()
            .filter(|word| !self.rules.is_stop_word(word))
            .filter(|word| word.chars().count() > 2)
            .filter(|word| !word.chars().all(char::is_numeric))
            .map(str::to_string)
            .collect()
    }
}

/// Keyword breakdown of special-labelled transactions, built-in rules
pub fn analyze_unknown(transactions: &[Transaction]) -> SubcategoryMap {
    analyze_unknown_with(RuleBook::builtin(), transactions)
}

pub fn analyze_unknown_with(rules: &RuleBook, transactions: &[Transaction]) -> SubcategoryMap {
    let extractor = KeywordExtractor::new(rules);

    let unknown: Vec<(&Transaction, Vec<String>)> = transactions
        .iter()
        .filter(|tx| rules.is_special_label(&tx.category))
        .map(|tx| (tx, extractor.extract(&tx.description)))
        .collect();

    // Frequency in first-seen order so ties keep a stable ranking
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    for (_, keywords) in &unknown {
        for keyword in keywords {
            match position.get(keyword.as_str()) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    position.insert(keyword.as_str(), counts.len());
                    counts.push((keyword.as_str(), 1));
                }
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let labels: BTreeSet<&str> = counts
        .iter()
        .take(MAX_LABELS)
        .filter(|(_, count)| *count >= MIN_LABEL_COUNT)
        .map(|(keyword, _)| *keyword)
        .collect();

    let mut grouped = SubcategoryMap::new();
    for (tx, keywords) in &unknown {
        let label = keywords
            .iter()
            .find(|k| labels.contains(k.as_str()))
            .map(|k| title_case(k))
            .unwrap_or_else(|| OTHER_LABEL.to_string());
        grouped.entry(label).or_default().push((*tx).clone());
    }

    debug!(
        "Unknown-label analysis: {} transactions, {} labels",
        unknown.len(),
        labels.len()
    );

    grouped
}

/// Merchant-key breakdown, built-in rules
pub fn analyze_by_merchant_patterns(transactions: &[Transaction]) -> SubcategoryMap {
    analyze_by_merchant_patterns_with(RuleBook::builtin(), transactions)
}

pub fn analyze_by_merchant_patterns_with(
    rules: &RuleBook,
    transactions: &[Transaction],
) -> SubcategoryMap {
    let extractor = KeywordExtractor::new(rules);
    let mut merchants = SubcategoryMap::new();

    for tx in transactions {
        let keywords = extractor.extract(&tx.description);
        let key = if keywords.is_empty() {
            OTHER_LABEL.to_string()
        } else {
            title_case(&keywords[..keywords.len().min(2)].join(" "))
        };
        merchants.entry(key).or_default().push(tx.clone());
    }

    let mut grouped = SubcategoryMap::new();
    let mut other = merchants.remove(OTHER_LABEL).unwrap_or_default();
    for (key, members) in merchants {
        if members.len() >= MIN_MERCHANT_GROUP {
            grouped.insert(key, members);
        } else {
            other.extend(members);
        }
    }
    grouped.insert(OTHER_LABEL.to_string(), other);

    grouped
}

/// One sub-category in an enhanced breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcategorySummary {
    pub name: String,
    pub amount: f64,
    pub count: usize,
}

/// A raw category with an optional keyword breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedCategory {
    pub name: String,
    pub total: f64,
    pub transaction_count: usize,
    /// Present for broad labels only, amount descending
    pub subcategories: Option<Vec<SubcategorySummary>>,
}

/// Per raw category totals, breaking broad labels down further.
///
/// Special labels use [`analyze_unknown`]; other broad labels use merchant
/// patterns. Categories appear in first-appearance order.
pub fn enhanced_breakdown(rules: &RuleBook, set: &TransactionSet) -> Vec<EnhancedCategory> {
    let mut order: Vec<(&str, Vec<Transaction>)> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    for tx in set.iter() {
        match position.get(tx.category.as_str()) {
            Some(&i) => order[i].1.push(tx.clone()),
            None => {
                position.insert(tx.category.as_str(), order.len());
                order.push((tx.category.as_str(), vec![tx.clone()]));
            }
        }
    }

    order
        .into_iter()
        .map(|(name, transactions)| {
            let total = transactions.iter().map(|t| t.amount).sum();
            let subcategories = if rules.is_broad_label(name) || rules.is_special_label(name) {
                let breakdown = if rules.is_special_label(name) {
                    analyze_unknown_with(rules, &transactions)
                } else {
                    analyze_by_merchant_patterns_with(rules, &transactions)
                };
                Some(summarize_subcategories(breakdown))
            } else {
                None
            };

            EnhancedCategory {
                name: name.to_string(),
                total,
                transaction_count: transactions.len(),
                subcategories,
            }
        })
        .collect()
}

fn summarize_subcategories(breakdown: SubcategoryMap) -> Vec<SubcategorySummary> {
    let mut summaries: Vec<SubcategorySummary> = breakdown
        .into_iter()
        .filter(|(_, txs)| !txs.is_empty())
        .map(|(name, txs)| SubcategorySummary {
            name,
            amount: txs.iter().map(|t| t.amount).sum(),
            count: txs.len(),
        })
        .collect();
    summaries.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    summaries
}

/// Keyword -> co-occurring keyword -> number of days both appeared
pub type CooccurrenceMatrix = BTreeMap<String, BTreeMap<String, usize>>;

/// Count keyword pairs that appear on the same calendar day (UTC).
///
/// The matrix is symmetric; a keyword never pairs with itself.
pub fn keyword_cooccurrence(rules: &RuleBook, transactions: &[Transaction]) -> CooccurrenceMatrix {
    let extractor = KeywordExtractor::new(rules);

    let mut daily: BTreeMap<NaiveDate, BTreeSet<String>> = BTreeMap::new();
    for tx in transactions {
        daily
            .entry(tx.date.date_naive())
            .or_default()
            .extend(extractor.extract(&tx.description));
    }

    let mut matrix = CooccurrenceMatrix::new();
    for keywords in daily.values() {
        let keywords: Vec<&String> = keywords.iter().collect();
        for (i, a) in keywords.iter().enumerate() {
            for b in &keywords[i + 1..] {
                *matrix
                    .entry((*a).clone())
                    .or_default()
                    .entry((*b).clone())
                    .or_default() += 1;
                *matrix
                    .entry((*b).clone())
                    .or_default()
                    .entry((*a).clone())
                    .or_default() += 1;
            }
        }
    }

    matrix
}
