//! Savings opportunities and budget recommendations
//!
//! Both work over the trailing 90 days of spending (treated as three months):
//! - [`find_savings_opportunities`]: frequent small purchases, categories
//!   above typical shares, recurring charges and late-night spending
//! - [`recommend_budget`]: splits income left after fixed expenses and a
//!   savings goal across current categories, with caps for discretionary ones

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::models::Transaction;
use crate::rules::RuleBook;
use crate::subscriptions::SubscriptionDetector;

/// Savings analysis thresholds
#[derive(Debug, Clone)]
pub struct SavingsConfig {
    /// Days of history analyzed
    pub lookback_days: i64,
    /// Months the lookback is divided into for monthly figures
    pub months_in_window: f64,
    /// Same-description purchases needed to count as high frequency
    pub high_frequency_min_count: usize,
    /// Average purchase range (inclusive) for high-frequency opportunities
    pub small_purchase_range: (f64, f64),
    /// Fraction of frequent small purchases assumed avoidable
    pub small_purchase_reduction: f64,
    /// Typical spend share per category keyword, matched case-insensitively
    pub typical_shares: Vec<(String, f64)>,
    /// Share must exceed `typical * factor` to flag overspending
    pub overspend_factor: f64,
    /// Charge range (inclusive) considered for the subscription audit
    pub subscription_range: (f64, f64),
    /// Late-night share of total spend that triggers a behavioral opportunity
    pub late_night_share: f64,
    /// Fraction of late-night spend assumed avoidable
    pub late_night_reduction: f64,
    /// Opportunities summed into the total potential
    pub top_for_total: usize,
    /// Opportunities returned
    pub max_opportunities: usize,
}

impl Default for SavingsConfig {
    fn default() -> Self {
        Self {
            lookback_days: 90,
            months_in_window: 3.0,
            high_frequency_min_count: 10,
            small_purchase_range: (2.0, 20.0),
            small_purchase_reduction: 0.5,
            typical_shares: vec![
                ("eating out".to_string(), 0.10),
                ("entertainment".to_string(), 0.05),
                ("shopping".to_string(), 0.10),
                ("groceries".to_string(), 0.15),
            ],
            overspend_factor: 1.5,
            subscription_range: (5.0, 200.0),
            late_night_share: 0.1,
            late_night_reduction: 0.7,
            top_for_total: 5,
            max_opportunities: 10,
        }
    }
}

/// Kind of savings opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    /// Frequent small purchases at the same place
    HighFrequency,
    /// Category share well above typical budgets
    CategoryOverspending,
    /// Recurring charge worth reviewing
    Subscription,
    /// Late-night spending
    Behavioral,
}

impl OpportunityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityKind::HighFrequency => "high_frequency",
            OpportunityKind::CategoryOverspending => "category_overspending",
            OpportunityKind::Subscription => "subscription",
            OpportunityKind::Behavioral => "behavioral",
        }
    }
}

impl std::fmt::Display for OpportunityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OpportunityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high_frequency" => Ok(OpportunityKind::HighFrequency),
            "category_overspending" => Ok(OpportunityKind::CategoryOverspending),
            "subscription" => Ok(OpportunityKind::Subscription),
            "behavioral" => Ok(OpportunityKind::Behavioral),
            _ => Err(format!("Unknown opportunity kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Moderate,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Moderate => "moderate",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsOpportunity {
    pub kind: OpportunityKind,
    pub title: String,
    pub description: String,
    pub suggestion: String,
    /// Estimated monthly saving
    pub savings_potential: f64,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsTip {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsReport {
    /// Highest potential first
    pub opportunities: Vec<SavingsOpportunity>,
    /// Sum over the top few opportunities
    pub total_savings_potential: f64,
    pub analysis_period: String,
    pub tips: Vec<SavingsTip>,
}

/// Savings and budget analysis over a rule book
#[derive(Debug, Clone)]
pub struct SavingsAnalyzer<'a> {
    rules: &'a RuleBook,
    config: SavingsConfig,
}

impl Default for SavingsAnalyzer<'static> {
    fn default() -> Self {
        Self::new(RuleBook::builtin())
    }
}

impl<'a> SavingsAnalyzer<'a> {
    pub fn new(rules: &'a RuleBook) -> Self {
        Self {
            rules,
            config: SavingsConfig::default(),
        }
    }

    pub fn with_config(rules: &'a RuleBook, config: SavingsConfig) -> Self {
        Self { rules, config }
    }

    fn recent<'t>(
        &self,
        transactions: &'t [Transaction],
        now: DateTime<Utc>,
    ) -> Vec<&'t Transaction> {
        let start = now - Duration::days(self.config.lookback_days);
        transactions.iter().filter(|t| t.date >= start).collect()
    }

    pub fn find_opportunities(
        &self,
        transactions: &[Transaction],
        now: DateTime<Utc>,
    ) -> SavingsReport {
        let recent = self.recent(transactions, now);
        let months = self.config.months_in_window;

        let category_spending = totals_by(&recent, |t| t.category.as_str());
        let total_spending: f64 = category_spending.iter().map(|(_, amount)| amount).sum();

        let mut opportunities = Vec::new();
        opportunities.extend(self.high_frequency(&recent));
        opportunities.extend(self.category_overspending(&category_spending, total_spending));
        opportunities.extend(self.subscription_audit(&recent));

        let late_night: f64 = recent
            .iter()
            .filter(|t| {
                let hour = t.date.hour();
                hour >= 22 || hour <= 4
            })
            .map(|t| t.amount)
            .sum();
        if late_night > total_spending * self.config.late_night_share {
            let monthly_late_night = late_night / months;
            opportunities.push(SavingsOpportunity {
                kind: OpportunityKind::Behavioral,
                title: "Reduce late-night spending".to_string(),
                description: format!(
                    "You spend ${:.0}/month between 10pm-4am",
                    monthly_late_night
                ),
                suggestion: "Late-night purchases are often impulsive".to_string(),
                savings_potential: monthly_late_night * self.config.late_night_reduction,
                difficulty: Difficulty::Moderate,
            });
        }

        opportunities.sort_by(|a, b| b.savings_potential.total_cmp(&a.savings_potential));

        let total_savings_potential = opportunities
            .iter()
            .take(self.config.top_for_total)
            .map(|o| o.savings_potential)
            .sum();
        let tips = savings_tips(&opportunities);
        opportunities.truncate(self.config.max_opportunities);

        debug!(
            "Savings analysis: {} recent transactions, {} opportunities",
            recent.len(),
            opportunities.len()
        );

        SavingsReport {
            opportunities,
            total_savings_potential,
            analysis_period: "Last 3 months".to_string(),
            tips,
        }
    }

    fn high_frequency(&self, recent: &[&Transaction]) -> Vec<SavingsOpportunity> {
        let (low, high) = self.config.small_purchase_range;
        let mut merchants: Vec<(&str, usize, f64)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for tx in recent {
            match index.get(tx.description.as_str()) {
                Some(&i) => {
                    merchants[i].1 += 1;
                    merchants[i].2 += tx.amount;
                }
                None => {
                    index.insert(tx.description.as_str(), merchants.len());
                    merchants.push((tx.description.as_str(), 1, tx.amount));
                }
            }
        }

        merchants
            .into_iter()
            .filter(|(_, count, _)| *count >= self.config.high_frequency_min_count)
            .filter_map(|(merchant, count, spent)| {
                let average = spent / count as f64;
                if !(low..=high).contains(&average) {
                    return None;
                }
                let monthly_total = count as f64 / self.config.months_in_window * average;
                let savings = monthly_total * self.config.small_purchase_reduction;
                Some(SavingsOpportunity {
                    kind: OpportunityKind::HighFrequency,
                    title: "Reduce frequent small purchases".to_string(),
                    description: format!(
                        "You spend ~${:.0}/month at {}",
                        monthly_total,
                        merchant.chars().take(30).collect::<String>()
                    ),
                    suggestion: format!(
                        "Reducing by {:.0}% could save ${:.0}/month",
                        self.config.small_purchase_reduction * 100.0,
                        savings
                    ),
                    savings_potential: savings,
                    difficulty: Difficulty::Easy,
                })
            })
            .collect()
    }

    fn category_overspending(
        &self,
        category_spending: &[(&str, f64)],
        total_spending: f64,
    ) -> Vec<SavingsOpportunity> {
        let months = self.config.months_in_window;
        let mut opportunities = Vec::new();

        for (category, amount) in category_spending {
            let share = if total_spending > 0.0 {
                amount / total_spending
            } else {
                0.0
            };
            let lowered = category.to_lowercase();

            for (keyword, typical) in &self.config.typical_shares {
                if !lowered.contains(keyword.as_str())
                    || share <= typical * self.config.overspend_factor
                {
                    continue;
                }
                let excess = amount / months - total_spending / months * typical;
                opportunities.push(SavingsOpportunity {
                    kind: OpportunityKind::CategoryOverspending,
                    title: format!("Reduce {} spending", category),
                    description: format!(
                        "You spend {:.0}% on {} (typical: {:.0}%)",
                        share * 100.0,
                        category,
                        typical * 100.0
                    ),
                    suggestion: format!(
                        "Reducing to typical levels could save ${:.0}/month",
                        excess
                    ),
                    savings_potential: excess,
                    difficulty: Difficulty::Moderate,
                });
            }
        }

        opportunities
    }

    fn subscription_audit(&self, recent: &[&Transaction]) -> Vec<SavingsOpportunity> {
        let (low, high) = self.config.subscription_range;
        let candidates: Vec<Transaction> = recent
            .iter()
            .filter(|t| (low..=high).contains(&t.amount))
            .map(|t| (*t).clone())
            .collect();

        SubscriptionDetector::new(self.rules)
            .detect(&candidates)
            .into_iter()
            .map(|sub| SavingsOpportunity {
                kind: OpportunityKind::Subscription,
                title: "Review subscriptions".to_string(),
                description: format!(
                    "Recurring charge: {} - ${:.2}/{}",
                    sub.name, sub.amount, sub.frequency
                ),
                suggestion: "Consider if this subscription is still needed".to_string(),
                savings_potential: sub.amount,
                difficulty: Difficulty::Easy,
            })
            .collect()
    }

    pub fn recommend_budget(
        &self,
        transactions: &[Transaction],
        now: DateTime<Utc>,
        request: &BudgetRequest,
    ) -> BudgetPlan {
        let recent = self.recent(transactions, now);
        let months = self.config.months_in_window;

        let monthly_spending: Vec<(&str, f64)> = totals_by(&recent, |t| t.category.as_str())
            .into_iter()
            .map(|(category, amount)| (category, amount / months))
            .collect();
        let current_total: f64 = monthly_spending.iter().map(|(_, amount)| amount).sum();

        let fixed_total: f64 = request.fixed_expenses.values().sum();
        let available = request.income - fixed_total - request.savings_goal;

        let mut category_budgets = Vec::new();
        let mut adjustments = Vec::new();

        if available > 0.0 {
            for (category, current) in &monthly_spending {
                let share = if current_total > 0.0 {
                    current / current_total
                } else {
                    0.0
                };
                let recommended = capped_allocation(category, available * share, available);

                category_budgets.push(CategoryBudget {
                    category: category.to_string(),
                    current: *current,
                    recommended,
                    difference: recommended - current,
                    action: if recommended < *current {
                        BudgetAction::Reduce
                    } else {
                        BudgetAction::Maintain
                    },
                });

                if recommended < current * 0.8 {
                    adjustments.push(BudgetAdjustment {
                        category: category.to_string(),
                        current: *current,
                        target: recommended,
                        reduction_needed: current - recommended,
                        tips: reduction_tips(category),
                    });
                }
            }
        }

        let mut warnings = Vec::new();
        if available < current_total * 0.5 {
            warnings.push(
                "Your savings goal may be too aggressive given current spending".to_string(),
            );
            warnings.push("Consider reducing fixed expenses or increasing income".to_string());
        }

        debug!(
            "Budget plan: {:.2} available, {} categories, {} adjustments",
            available,
            category_budgets.len(),
            adjustments.len()
        );

        BudgetPlan {
            summary: BudgetSummary {
                monthly_income: request.income,
                fixed_expenses: fixed_total,
                savings_goal: request.savings_goal,
                available_for_variable: available,
                current_variable_spending: current_total,
                deficit_or_surplus: available - current_total,
            },
            category_budgets,
            adjustments,
            warnings,
        }
    }
}

/// Sum amounts per key, keeping first-appearance order
fn totals_by<'t, F>(transactions: &[&'t Transaction], key: F) -> Vec<(&'t str, f64)>
where
    F: Fn(&'t Transaction) -> &'t str,
{
    let mut totals: Vec<(&str, f64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for tx in transactions {
        let k = key(*tx);
        match index.get(k) {
            Some(&i) => totals[i].1 += tx.amount,
            None => {
                index.insert(k, totals.len());
                totals.push((k, tx.amount));
            }
        }
    }
    totals
}

/// Proportional allocation with discretionary caps and a grocery floor
fn capped_allocation(category: &str, proportional: f64, available: f64) -> f64 {
    let lowered = category.to_lowercase();
    if lowered.contains("eating out") {
        proportional.min(available * 0.15)
    } else if lowered.contains("entertainment") {
        proportional.min(available * 0.10)
    } else if lowered.contains("groceries") {
        proportional.max(available * 0.20)
    } else {
        proportional
    }
}

/// Advice for each opportunity kind present, in a fixed order
pub fn savings_tips(opportunities: &[SavingsOpportunity]) -> Vec<SavingsTip> {
    let has = |kind: OpportunityKind| opportunities.iter().any(|o| o.kind == kind);
    let tip = |title: &str, description: &str| SavingsTip {
        title: title.to_string(),
        description: description.to_string(),
    };

    let mut tips = Vec::new();
    if has(OpportunityKind::HighFrequency) {
        tips.push(tip(
            "Batch your purchases",
            "Consider buying in bulk or preparing at home to reduce frequent small purchases",
        ));
    }
    if has(OpportunityKind::Subscription) {
        tips.push(tip(
            "Subscription audit",
            "Set a monthly reminder to review all subscriptions and cancel unused ones",
        ));
    }
    if has(OpportunityKind::CategoryOverspending) {
        tips.push(tip(
            "Set category budgets",
            "Use the 50/30/20 rule: 50% needs, 30% wants, 20% savings",
        ));
    }
    if has(OpportunityKind::Behavioral) {
        tips.push(tip(
            "Implement cooling-off periods",
            "Wait 24 hours before making non-essential purchases",
        ));
    }
    tips
}

/// Category-specific ideas for cutting back
pub fn reduction_tips(category: &str) -> Vec<String> {
    const TIPS: &[(&str, [&str; 3])] = &[
        (
            "eating out",
            [
                "Meal prep on Sundays",
                "Limit dining out to once per week",
                "Use restaurant deals and happy hours",
            ],
        ),
        (
            "entertainment",
            [
                "Look for free local events",
                "Share streaming subscriptions",
                "Set a monthly entertainment budget",
            ],
        ),
        (
            "shopping",
            [
                "Create a 30-day wish list before buying",
                "Unsubscribe from marketing emails",
                "Shop with a list",
            ],
        ),
        (
            "transport",
            [
                "Consider carpooling",
                "Use public transport when possible",
                "Combine errands to save fuel",
            ],
        ),
    ];

    let lowered = category.to_lowercase();
    TIPS.iter()
        .find(|(key, _)| lowered.contains(key))
        .map(|(_, tips)| tips.iter().map(|t| t.to_string()).collect())
        .unwrap_or_else(|| {
            vec![
                "Track all purchases in this category".to_string(),
                "Set a weekly budget limit".to_string(),
            ]
        })
}

/// Monthly figures supplied by the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetRequest {
    pub income: f64,
    pub savings_goal: f64,
    #[serde(default)]
    pub fixed_expenses: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetAction {
    Reduce,
    Maintain,
}

impl BudgetAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetAction::Reduce => "reduce",
            BudgetAction::Maintain => "maintain",
        }
    }
}

impl std::fmt::Display for BudgetAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub monthly_income: f64,
    pub fixed_expenses: f64,
    pub savings_goal: f64,
    pub available_for_variable: f64,
    pub current_variable_spending: f64,
    pub deficit_or_surplus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBudget {
    pub category: String,
    pub current: f64,
    pub recommended: f64,
    pub difference: f64,
    pub action: BudgetAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAdjustment {
    pub category: String,
    pub current: f64,
    pub target: f64,
    pub reduction_needed: f64,
    pub tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetPlan {
    pub summary: BudgetSummary,
    /// Categories in first-appearance order
    pub category_budgets: Vec<CategoryBudget>,
    pub adjustments: Vec<BudgetAdjustment>,
    pub warnings: Vec<String>,
}

/// Savings opportunities with the built-in rules and default thresholds
pub fn find_savings_opportunities(
    transactions: &[Transaction],
    now: DateTime<Utc>,
) -> SavingsReport {
    SavingsAnalyzer::default().find_opportunities(transactions, now)
}

/// Budget plan with default thresholds
pub fn recommend_budget(
    transactions: &[Transaction],
    now: DateTime<Utc>,
    request: &BudgetRequest,
) -> BudgetPlan {
    SavingsAnalyzer::default().recommend_budget(transactions, now, request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn tx(description: &str, category: &str, days_ago: i64, hour: u32, amount: f64) -> Transaction {
        let date = (now() - Duration::days(days_ago)).with_hour(hour).unwrap();
        Transaction::new(description, category, date, amount)
    }

    fn coffees() -> Vec<Transaction> {
        // Every third day, too irregular for a weekly cadence
        (0..12)
            .map(|i| tx("Corner Coffee", "Cafes", 5 + i * 3, 8, 5.0))
            .collect()
    }

    #[test]
    fn test_high_frequency_small_purchases() {
        let mut txs = coffees();
        txs.push(tx("Rent", "Housing", 10, 9, 1000.0));

        let report = find_savings_opportunities(&txs, now());
        assert_eq!(report.opportunities.len(), 1);

        let coffee = &report.opportunities[0];
        assert_eq!(coffee.kind, OpportunityKind::HighFrequency);
        // 12 purchases / 3 months * $5 = $20/month, half of it saved
        assert!((coffee.savings_potential - 10.0).abs() < 1e-9);
        assert_eq!(coffee.description, "You spend ~$20/month at Corner Coffee");
        assert_eq!(coffee.difficulty, Difficulty::Easy);
        assert_eq!(report.tips[0].title, "Batch your purchases");
    }

    #[test]
    fn test_old_transactions_ignored() {
        let txs: Vec<Transaction> = (0..12)
            .map(|i| tx("Corner Coffee", "Cafes", 120 + i * 3, 8, 5.0))
            .collect();
        let report = find_savings_opportunities(&txs, now());
        assert!(report.opportunities.is_empty());
        assert_eq!(report.total_savings_potential, 0.0);
        assert!(report.tips.is_empty());
    }

    #[test]
    fn test_category_overspending() {
        let txs = vec![
            tx("Fancy Bistro", "Eating Out", 10, 19, 400.0),
            tx("Rent", "Housing", 20, 9, 600.0),
        ];
        let report = find_savings_opportunities(&txs, now());

        let over = report
            .opportunities
            .iter()
            .find(|o| o.kind == OpportunityKind::CategoryOverspending)
            .unwrap();
        // 400/3 - 1000/3 * 0.10
        assert!((over.savings_potential - 100.0).abs() < 1e-9);
        assert_eq!(over.description, "You spend 40% on Eating Out (typical: 10%)");
        assert!(report
            .tips
            .iter()
            .any(|t| t.title == "Set category budgets"));
    }

    #[test]
    fn test_late_night_spending() {
        let txs = vec![
            tx("Online Store", "Electronics", 5, 23, 300.0),
            tx("Rent", "Housing", 20, 9, 700.0),
        ];
        let report = find_savings_opportunities(&txs, now());

        let late = report
            .opportunities
            .iter()
            .find(|o| o.kind == OpportunityKind::Behavioral)
            .unwrap();
        assert!((late.savings_potential - 70.0).abs() < 1e-9);
        assert_eq!(late.description, "You spend $100/month between 10pm-4am");
    }

    #[test]
    fn test_subscription_audit_and_totals() {
        let mut txs: Vec<Transaction> = (0..3)
            .map(|i| tx("Spotify Premium", "Music", 1 + i * 30, 9, 11.99))
            .collect();
        txs.extend(coffees());

        let report = find_savings_opportunities(&txs, now());
        let kinds: Vec<_> = report.opportunities.iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![OpportunityKind::Subscription, OpportunityKind::HighFrequency]
        );
        assert!((report.total_savings_potential - 21.99).abs() < 1e-9);
        assert_eq!(report.tips.len(), 2);
    }

    #[test]
    fn test_budget_caps_and_adjustments() {
        let txs = vec![
            tx("Restaurants", "Eating Out", 10, 19, 900.0),
            tx("Supermarket", "Groceries", 11, 10, 300.0),
            tx("Train", "Transport", 12, 8, 300.0),
        ];
        let mut fixed = BTreeMap::new();
        fixed.insert("Rent".to_string(), 1500.0);
        let request = BudgetRequest {
            income: 3000.0,
            savings_goal: 1000.0,
            fixed_expenses: fixed,
        };

        let plan = recommend_budget(&txs, now(), &request);
        assert!((plan.summary.available_for_variable - 500.0).abs() < 1e-9);
        assert!((plan.summary.current_variable_spending - 500.0).abs() < 1e-9);

        let eating = &plan.category_budgets[0];
        assert_eq!(eating.category, "Eating Out");
        assert!((eating.recommended - 75.0).abs() < 1e-9);
        assert_eq!(eating.action, BudgetAction::Reduce);

        let groceries = &plan.category_budgets[1];
        assert!((groceries.recommended - 100.0).abs() < 1e-9);
        assert_eq!(groceries.action, BudgetAction::Maintain);

        assert_eq!(plan.adjustments.len(), 1);
        assert_eq!(plan.adjustments[0].tips[0], "Meal prep on Sundays");
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_budget_warnings_when_goal_too_aggressive() {
        let txs = vec![tx("Train", "Transport", 12, 8, 900.0)];
        let request = BudgetRequest {
            income: 2000.0,
            savings_goal: 1900.0,
            fixed_expenses: BTreeMap::new(),
        };

        let plan = recommend_budget(&txs, now(), &request);
        assert_eq!(plan.warnings.len(), 2);
        assert_eq!(plan.adjustments[0].tips[0], "Consider carpooling");
    }

    #[test]
    fn test_budget_without_available_income() {
        let txs = vec![tx("Train", "Transport", 12, 8, 300.0)];
        let request = BudgetRequest {
            income: 1000.0,
            savings_goal: 1000.0,
            fixed_expenses: BTreeMap::new(),
        };
        let plan = recommend_budget(&txs, now(), &request);
        assert!(plan.category_budgets.is_empty());
        assert!((plan.summary.deficit_or_surplus + 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_reduction_tips_default() {
        assert_eq!(reduction_tips("Pets")[1], "Set a weekly budget limit");
        assert_eq!(reduction_tips("Online Shopping")[2], "Shop with a list");
    }
}
