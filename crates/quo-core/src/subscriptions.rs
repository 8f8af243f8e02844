//! Subscription detection
//!
//! Finds recurring charges by grouping transactions on a normalized merchant
//! signature plus the rounded amount, then checking that the gaps between
//! charges settle into a known billing cadence.
//!
//! Detection pipeline:
//! 1. Normalize descriptions into merchant signatures
//! 2. Group by signature and whole-unit amount (two or more charges)
//! 3. Classify the mean interval into a [`Frequency`] band
//! 4. Score interval consistency against the band's nominal interval
//! 5. Assign a subscription category from the rule tables
//! 6. Score confidence and keep the confident candidates

use chrono::{Days, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use tracing::debug;

use crate::models::{Frequency, Transaction};
use crate::rules::RuleBook;

/// Longest candidate display name, in characters
const MAX_NAME_CHARS: usize = 50;

/// Category given to charges that only match a generic subscription keyword
pub const OTHER_SUBSCRIPTION: &str = "Other Subscription";

/// Detection thresholds
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    /// Groups scoring below this interval consistency are dropped (0-1)
    pub min_consistency: f64,
    /// Candidates must score strictly above this confidence (0-1)
    pub min_confidence: f64,
    /// Monthly subscription total above which the health report warns
    pub high_monthly_cost: f64,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            min_consistency: 0.7,
            min_confidence: 0.6,
            high_monthly_cost: 200.0,
        }
    }
}

/// A recurring charge that passed the confidence filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionCandidate {
    /// Most recent description, truncated
    pub name: String,
    /// Normalized merchant signature the group was keyed on
    pub signature: String,
    /// Most recent charge
    pub amount: f64,
    pub frequency: Frequency,
    pub last_charged: NaiveDate,
    pub next_expected: NaiveDate,
    pub occurrences: usize,
    pub consistency_score: f64,
    pub confidence: f64,
    pub category: String,
}

impl SubscriptionCandidate {
    /// Cost of this subscription expressed per month
    pub fn monthly_cost(&self) -> f64 {
        self.amount * self.frequency.monthly_factor()
    }
}

fn long_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{4,}\b").expect("valid regex"))
}

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#\d+").expect("valid regex"))
}

fn masked_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\d+").expect("valid regex"))
}

fn punctuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid regex"))
}

/// Reduce a description to a merchant signature.
///
/// Lowercases, strips long numbers plus `#`/`*` reference numbers, turns
/// punctuation into spaces and keeps the first three words longer than two
/// characters.
pub fn normalize_description(description: &str) -> String {
    let lowered = description.to_lowercase();
    let stripped = long_number_re().replace_all(&lowered, "");
    let stripped = reference_re().replace_all(&stripped, "");
    let stripped = masked_number_re().replace_all(&stripped, "");
    let cleaned = punctuation_re().replace_all(&stripped, " ");

    cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `max(0, 1 - mean(|interval - expected| / expected))`
fn interval_consistency(intervals: &[i64], expected: i64) -> f64 {
    if intervals.is_empty() || expected <= 0 {
        return 0.0;
    }
    let expected = expected as f64;
    let mean_deviation = intervals
        .iter()
        .map(|&i| (i as f64 - expected).abs() / expected)
        .sum::<f64>()
        / intervals.len() as f64;
    (1.0 - mean_deviation).max(0.0)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Recurring-charge detector over a rule book
#[derive(Debug, Clone)]
pub struct SubscriptionDetector<'a> {
    rules: &'a RuleBook,
    config: SubscriptionConfig,
}

impl Default for SubscriptionDetector<'static> {
    fn default() -> Self {
        Self::new(RuleBook::builtin())
    }
}

impl<'a> SubscriptionDetector<'a> {
    pub fn new(rules: &'a RuleBook) -> Self {
        Self {
            rules,
            config: SubscriptionConfig::default(),
        }
    }

    pub fn with_config(rules: &'a RuleBook, config: SubscriptionConfig) -> Self {
        Self { rules, config }
    }

    pub fn config(&self) -> &SubscriptionConfig {
        &self.config
    }

    /// Detect confident subscriptions, highest charge first
    pub fn detect(&self, transactions: &[Transaction]) -> Vec<SubscriptionCandidate> {
        // Groups in first-appearance order so equal amounts sort stably
        let mut groups: Vec<(String, Vec<&Transaction>)> = Vec::new();
        let mut index: HashMap<(String, i64), usize> = HashMap::new();

        for tx in transactions {
            let signature = normalize_description(&tx.description);
            let amount_key = tx.amount.round_ties_even() as i64;
            match index.get(&(signature.clone(), amount_key)) {
                Some(&i) => groups[i].1.push(tx),
                None => {
                    index.insert((signature.clone(), amount_key), groups.len());
                    groups.push((signature, vec![tx]));
                }
            }
        }

        let mut candidates: Vec<SubscriptionCandidate> = groups
            .into_iter()
            .filter(|(_, members)| members.len() >= 2)
            .filter_map(|(signature, members)| self.analyze_group(signature, members))
            .collect();

        candidates.sort_by(|a, b| b.amount.total_cmp(&a.amount));

        debug!(
            "Subscription detection: {} transactions, {} candidates",
            transactions.len(),
            candidates.len()
        );

        candidates
    }

    fn analyze_group(
        &self,
        signature: String,
        members: Vec<&Transaction>,
    ) -> Option<SubscriptionCandidate> {
        // Category and bonuses read the first charge as it appeared in input
        let first_description = members.first()?.description.to_lowercase();

        let mut sorted = members;
        sorted.sort_by_key(|tx| tx.date);

        let intervals: Vec<i64> = sorted
            .windows(2)
            .map(|pair| (pair[1].date - pair[0].date).num_days())
            .collect();
        if intervals.is_empty() {
            return None;
        }

        let mean_interval = intervals.iter().sum::<i64>() as f64 / intervals.len() as f64;
        let frequency = Frequency::from_mean_interval(mean_interval)?;
        let expected_days = frequency.expected_interval_days();

        let consistency_score = interval_consistency(&intervals, expected_days);
        if consistency_score < self.config.min_consistency {
            debug!(
                "Dropping '{}': consistency {:.2} below threshold",
                signature, consistency_score
            );
            return None;
        }

        let occurrences = sorted.len();
        let category = self.detect_category(&first_description);
        let confidence = self.confidence(consistency_score, occurrences, &first_description);
        if confidence <= self.config.min_confidence {
            debug!(
                "Dropping '{}': confidence {:.2} too low",
                signature, confidence
            );
            return None;
        }

        let latest = sorted.last()?;
        let last_charged = latest.date.date_naive();
        let next_expected = last_charged.checked_add_days(Days::new(expected_days as u64))?;

        Some(SubscriptionCandidate {
            name: truncate_chars(&latest.description, MAX_NAME_CHARS),
            signature,
            amount: latest.amount,
            frequency,
            last_charged,
            next_expected,
            occurrences,
            consistency_score,
            confidence,
            category,
        })
    }

    /// Known service, then category keywords, then generic subscription words
    pub fn detect_category(&self, description: &str) -> String {
        let desc = description.to_lowercase();

        if let Some(service) = self
            .rules
            .known_services
            .iter()
            .find(|s| desc.contains(s.fragment.as_str()))
        {
            return service.category.clone();
        }

        if let Some(rule) = self
            .rules
            .category_keywords
            .iter()
            .find(|r| r.keywords.iter().any(|k| desc.contains(k.as_str())))
        {
            return rule.category.clone();
        }

        if self.has_subscription_keyword(&desc) {
            return OTHER_SUBSCRIPTION.to_string();
        }

        "Other".to_string()
    }

    fn has_subscription_keyword(&self, desc: &str) -> bool {
        self.rules
            .subscription_keywords
            .iter()
            .any(|k| desc.contains(k.as_str()))
    }

    fn is_known_service(&self, desc: &str) -> bool {
        self.rules
            .known_services
            .iter()
            .any(|s| desc.contains(s.fragment.as_str()))
    }

    fn confidence(&self, consistency: f64, occurrences: usize, desc: &str) -> f64 {
        let mut confidence = consistency * 0.4;

        confidence += if occurrences >= 6 {
            0.3
        } else if occurrences >= 3 {
            0.2
        } else {
            0.1
        };

        if self.has_subscription_keyword(desc) {
            confidence += 0.2;
        }
        if self.is_known_service(desc) {
            confidence += 0.1;
        }

        confidence.min(1.0)
    }

    /// Cost summary and warnings over detected subscriptions
    pub fn analyze_health(&self, subscriptions: &[SubscriptionCandidate]) -> HealthReport {
        if subscriptions.is_empty() {
            return HealthReport::default();
        }

        let mut total_monthly = 0.0;
        let mut by_category: Vec<(&str, f64)> = Vec::new();
        for sub in subscriptions {
            let monthly = sub.monthly_cost();
            total_monthly += monthly;
            match by_category.iter_mut().find(|(c, _)| *c == sub.category) {
                Some((_, amount)) => *amount += monthly,
                None => by_category.push((sub.category.as_str(), monthly)),
            }
        }

        let mut insights = Vec::new();

        if total_monthly > self.config.high_monthly_cost {
            insights.push(HealthInsight {
                kind: HealthInsightKind::Warning,
                message: format!(
                    "Your subscriptions total ${:.2}/month, which is quite high",
                    total_monthly
                ),
                suggestion: "Consider auditing subscriptions you rarely use".to_string(),
            });
        }

        let top = by_category.iter().fold(None::<&(&str, f64)>, |best, entry| match best {
            Some(b) if b.1 >= entry.1 => Some(b),
            _ => Some(entry),
        });
        if let Some((category, amount)) = top {
            if *amount > total_monthly * 0.5 {
                insights.push(HealthInsight {
                    kind: HealthInsightKind::Info,
                    message: format!("Over 50% of subscription spending is on {}", category),
                    suggestion: format!("Review if you need all {} subscriptions", category),
                });
            }
        }

        let duplicates = detect_duplicate_services(subscriptions);
        if !duplicates.is_empty() {
            insights.push(HealthInsight {
                kind: HealthInsightKind::Warning,
                message: format!(
                    "Potential duplicate services detected: {}",
                    duplicates.join(", ")
                ),
                suggestion: "You might be paying for similar services".to_string(),
            });
        }

        HealthReport {
            total_count: subscriptions.len(),
            total_monthly_cost: total_monthly,
            total_annual_cost: total_monthly * 12.0,
            category_breakdown: by_category
                .into_iter()
                .map(|(c, amount)| (c.to_string(), amount))
                .collect(),
            insights,
            duplicates,
        }
    }
}

/// Overlapping-service heuristics by subscription category
fn detect_duplicate_services(subscriptions: &[SubscriptionCandidate]) -> Vec<String> {
    fn count(subscriptions: &[SubscriptionCandidate], categories: &[&str]) -> usize {
        subscriptions
            .iter()
            .filter(|s| categories.contains(&s.category.as_str()))
            .count()
    }

    let mut duplicates = Vec::new();
    if count(subscriptions, &["Streaming", "Video Streaming"]) >= 3 {
        duplicates.push("Multiple streaming services".to_string());
    }
    if count(subscriptions, &["Music", "Music Streaming"]) >= 2 {
        duplicates.push("Multiple music services".to_string());
    }
    if count(subscriptions, &["Storage"]) >= 2 {
        duplicates.push("Multiple cloud storage services".to_string());
    }
    duplicates
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthInsightKind {
    Warning,
    Info,
}

impl HealthInsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthInsightKind::Warning => "warning",
            HealthInsightKind::Info => "info",
        }
    }
}

impl std::fmt::Display for HealthInsightKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthInsight {
    pub kind: HealthInsightKind,
    pub message: String,
    pub suggestion: String,
}

/// Subscription cost summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub total_count: usize,
    pub total_monthly_cost: f64,
    pub total_annual_cost: f64,
    /// Monthly-equivalent cost per subscription category
    pub category_breakdown: BTreeMap<String, f64>,
    pub insights: Vec<HealthInsight>,
    pub duplicates: Vec<String>,
}

/// Detect subscriptions with the built-in rules and default thresholds
pub fn detect_subscriptions(transactions: &[Transaction]) -> Vec<SubscriptionCandidate> {
    SubscriptionDetector::default().detect(transactions)
}

/// Health report with default thresholds
pub fn analyze_subscription_health(subscriptions: &[SubscriptionCandidate]) -> HealthReport {
    SubscriptionDetector::default().analyze_health(subscriptions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series(
        description: &str,
        amount: f64,
        start_day: u32,
        every: i64,
        count: usize,
    ) -> Vec<Transaction> {
        let start = Utc.with_ymd_and_hms(2024, 1, start_day, 9, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                Transaction::new(
                    description,
                    "Entertainment Services",
                    start + Duration::days(every * i as i64),
                    amount,
                )
            })
            .collect()
    }

    fn candidate(category: &str, amount: f64, frequency: Frequency) -> SubscriptionCandidate {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        SubscriptionCandidate {
            name: category.to_string(),
            signature: category.to_lowercase(),
            amount,
            frequency,
            last_charged: day,
            next_expected: day,
            occurrences: 3,
            consistency_score: 1.0,
            confidence: 0.9,
            category: category.to_string(),
        }
    }

    #[test]
    fn test_normalize_description() {
        assert_eq!(normalize_description("NETFLIX.COM 123456 #998 *4421"), "netflix com");
        assert_eq!(
            normalize_description("Spotify P1A2B3 Stockholm Sweden"),
            "spotify p1a2b3 stockholm"
        );
        assert_eq!(normalize_description("AB CD"), "");
    }

    #[test]
    fn test_interval_consistency() {
        assert_eq!(interval_consistency(&[30, 30, 30], 30), 1.0);
        assert!((interval_consistency(&[27, 33], 30) - 0.9).abs() < 1e-9);
        assert_eq!(interval_consistency(&[90], 30), 0.0);
        assert_eq!(interval_consistency(&[], 30), 0.0);
    }

    #[test]
    fn test_detect_monthly_known_service() {
        let mut txs = series("NETFLIX.COM 4421", 15.99, 5, 30, 4);
        txs.extend(series("Random Cafe", 4.5, 2, 3, 6));

        let found = detect_subscriptions(&txs);
        assert_eq!(found.len(), 1);

        let netflix = &found[0];
        assert_eq!(netflix.frequency, Frequency::Monthly);
        assert_eq!(netflix.category, "Video Streaming");
        assert_eq!(netflix.occurrences, 4);
        assert_eq!(netflix.consistency_score, 1.0);
        // 0.4 + 0.2 (>=3) + 0.1 (known service)
        assert!((netflix.confidence - 0.7).abs() < 1e-9);
        assert_eq!(
            netflix.next_expected,
            netflix.last_charged + chrono::Days::new(30)
        );
    }

    #[test]
    fn test_intervals_between_bands_are_dropped() {
        // Perfectly regular, known service with a keyword, but no cadence fits
        for every in [20, 50, 120, 200] {
            let txs = series("Netflix Premium Subscription", 15.99, 1, every, 6);
            assert!(detect_subscriptions(&txs).is_empty(), "{} days", every);
        }

        let txs = series("Netflix Premium Subscription", 15.99, 1, 30, 6);
        assert_eq!(detect_subscriptions(&txs).len(), 1);
    }

    #[test]
    fn test_two_plain_charges_are_not_confident() {
        // 0.4 + 0.1 = 0.5, no keyword or known-service bonus
        let txs = series("Local Bakery", 12.0, 1, 30, 2);
        assert!(detect_subscriptions(&txs).is_empty());
    }

    #[test]
    fn test_irregular_intervals_rejected() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let txs: Vec<Transaction> = [0, 10, 60, 90]
            .iter()
            .map(|d| Transaction::new("Spotify Premium", "Music", start + Duration::days(*d), 11.99))
            .collect();
        // Mean interval 30 but deviations (20 + 20 + 0) / 3 / 30 ~ 0.44
        assert!(detect_subscriptions(&txs).is_empty());
    }

    #[test]
    fn test_amount_changes_split_groups() {
        let mut txs = series("Spotify Premium", 11.99, 1, 30, 3);
        let later = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();
        txs.push(Transaction::new("Spotify Premium", "Music", later, 13.99));

        let found = detect_subscriptions(&txs);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].occurrences, 3);
        assert_eq!(found[0].amount, 11.99);
    }

    #[test]
    fn test_output_sorted_by_amount() {
        let mut txs = series("Spotify Premium", 11.99, 1, 30, 3);
        txs.extend(series("Adobe Creative Cloud", 54.99, 3, 30, 3));
        txs.extend(series("Gym Membership Weekly", 20.0, 2, 7, 8));

        let found = detect_subscriptions(&txs);
        let amounts: Vec<f64> = found.iter().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![54.99, 20.0, 11.99]);
        assert_eq!(found[1].frequency, Frequency::Weekly);
        assert_eq!(found[1].category, "Fitness");
    }

    #[test]
    fn test_category_fallbacks() {
        let detector = SubscriptionDetector::default();
        assert_eq!(detector.detect_category("XBOX LIVE"), "Gaming");
        assert_eq!(detector.detect_category("Acme renewal"), OTHER_SUBSCRIPTION);
        assert_eq!(detector.detect_category("Acme Co"), "Other");
    }

    #[test]
    fn test_name_truncated() {
        let long = "A".repeat(80) + " Premium";
        let txs = series(&long, 9.0, 1, 30, 3);
        let found = detect_subscriptions(&txs);
        assert_eq!(found[0].name.chars().count(), 50);
    }

    #[test]
    fn test_health_report_empty() {
        let report = analyze_subscription_health(&[]);
        assert_eq!(report.total_count, 0);
        assert_eq!(report.total_monthly_cost, 0.0);
        assert!(report.insights.is_empty());
    }

    #[test]
    fn test_health_monthly_conversions() {
        let subs = vec![
            candidate("Software", 120.0, Frequency::Annual),
            candidate("Storage", 30.0, Frequency::Quarterly),
            candidate("Fitness", 12.0, Frequency::BiWeekly),
            candidate("News/Media", 3.0, Frequency::Weekly),
        ];
        let report = analyze_subscription_health(&subs);
        // 10 + 10 + 26 + 13
        assert!((report.total_monthly_cost - 59.0).abs() < 1e-9);
        assert!((report.total_annual_cost - 708.0).abs() < 1e-9);
        assert!((report.category_breakdown["Fitness"] - 26.0).abs() < 1e-9);
        assert!(report.insights.is_empty());
    }

    #[test]
    fn test_health_warnings_and_duplicates() {
        let subs = vec![
            candidate("Video Streaming", 120.0, Frequency::Monthly),
            candidate("Streaming", 50.0, Frequency::Monthly),
            candidate("Video Streaming", 20.0, Frequency::Monthly),
            candidate("Music Streaming", 12.0, Frequency::Monthly),
            candidate("Music", 10.0, Frequency::Monthly),
        ];
        let report = analyze_subscription_health(&subs);

        assert_eq!(
            report.duplicates,
            vec!["Multiple streaming services", "Multiple music services"]
        );
        assert_eq!(report.insights.len(), 3);
        assert_eq!(report.insights[0].kind, HealthInsightKind::Warning);
        assert_eq!(
            report.insights[0].message,
            "Your subscriptions total $212.00/month, which is quite high"
        );
        assert_eq!(report.insights[1].kind, HealthInsightKind::Info);
        assert!(report.insights[1].message.ends_with("Video Streaming"));
        assert!(report.insights[2].message.contains("Multiple music services"));
    }

    #[test]
    fn test_health_flags_duplicate_storage() {
        let subs = vec![
            candidate("Storage", 9.99, Frequency::Monthly),
            candidate("Video Streaming", 15.99, Frequency::Monthly),
            candidate("Storage", 2.99, Frequency::Monthly),
            candidate("Video Streaming", 10.99, Frequency::Monthly),
        ];
        let report = analyze_subscription_health(&subs);

        // Two streaming services stay under the streaming threshold
        assert_eq!(report.duplicates, vec!["Multiple cloud storage services"]);
        assert_eq!(report.insights.len(), 2);
        assert!(report.insights[0].message.ends_with("Video Streaming"));
        assert_eq!(report.insights[1].kind, HealthInsightKind::Warning);
        assert_eq!(
            report.insights[1].message,
            "Potential duplicate services detected: Multiple cloud storage services"
        );
    }
}
