//! Analysis engine - runs the independent analyzers over one snapshot
//!
//! Grouping, subscription detection and trend analysis share nothing but the
//! read-only [`TransactionSet`], so the engine runs them as blocking tasks
//! and joins the results into a single [`AnalysisReport`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::classify::CategoryClassifier;
use crate::error::{Error, Result};
use crate::grouping::{self, CategoryInsights, GroupedCategories, GroupingConfig};
use crate::rules::RuleBook;
use crate::store::TransactionSet;
use crate::subscriptions::{
    HealthReport, SubscriptionCandidate, SubscriptionConfig, SubscriptionDetector,
};
use crate::text::{self, EnhancedCategory};
use crate::trends::{self, TrendConfig, TrendReport};

/// Default trailing window for trend analysis
pub const DEFAULT_WINDOW_MONTHS: u32 = 6;

/// Everything the engine produces for one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub transaction_count: usize,
    pub excluded_count: usize,
    pub categories: GroupedCategories,
    pub category_insights: CategoryInsights,
    pub enhanced_categories: Vec<EnhancedCategory>,
    pub subscriptions: Vec<SubscriptionCandidate>,
    pub subscription_health: HealthReport,
    pub trends: TrendReport,
}

#[derive(Debug)]
struct GroupingOutput {
    categories: GroupedCategories,
    insights: CategoryInsights,
    enhanced: Vec<EnhancedCategory>,
}

/// Runs grouping, subscription detection and trends concurrently
#[derive(Debug, Clone)]
pub struct AnalysisEngine {
    rules: Arc<RuleBook>,
    grouping: GroupingConfig,
    subscriptions: SubscriptionConfig,
    trends: TrendConfig,
    window_months: u32,
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new(RuleBook::builtin().clone())
    }
}

impl AnalysisEngine {
    pub fn new(rules: RuleBook) -> Self {
        Self {
            rules: Arc::new(rules),
            grouping: GroupingConfig::default(),
            subscriptions: SubscriptionConfig::default(),
            trends: TrendConfig::default(),
            window_months: DEFAULT_WINDOW_MONTHS,
        }
    }

    pub fn with_window_months(mut self, months: u32) -> Self {
        self.window_months = months;
        self
    }

    pub fn with_grouping_config(mut self, config: GroupingConfig) -> Self {
        self.grouping = config;
        self
    }

    pub fn with_subscription_config(mut self, config: SubscriptionConfig) -> Self {
        self.subscriptions = config;
        self
    }

    pub fn with_trend_config(mut self, config: TrendConfig) -> Self {
        self.trends = config;
        self
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    /// Analyze with trends anchored at the current time
    pub async fn analyze(&self, set: Arc<TransactionSet>) -> Result<AnalysisReport> {
        self.analyze_at(set, Utc::now()).await
    }

    /// Analyze with trends anchored at `now`
    pub async fn analyze_at(
        &self,
        set: Arc<TransactionSet>,
        now: DateTime<Utc>,
    ) -> Result<AnalysisReport> {
        debug!("Starting analysis of {} transactions", set.len());

        let grouping_task = {
            let (rules, set, config) = (self.rules.clone(), set.clone(), self.grouping.clone());
            tokio::task::spawn_blocking(move || run_grouping(&rules, &set, &config))
        };
        let subscription_task = {
            let (rules, set, config) =
                (self.rules.clone(), set.clone(), self.subscriptions.clone());
            tokio::task::spawn_blocking(move || run_subscriptions(&rules, &set, config))
        };
        let trend_task = {
            let (set, config, window) = (set.clone(), self.trends.clone(), self.window_months);
            tokio::task::spawn_blocking(move || run_trends(&set, window, now, &config))
        };

        let (grouping, (subscriptions, health), trends) =
            tokio::try_join!(grouping_task, subscription_task, trend_task)
                .map_err(|e| Error::Analysis(format!("Analyzer task failed: {}", e)))?;

        let report = assemble(&set, grouping, subscriptions, health, trends, now);
        info!(
            transactions = report.transaction_count,
            excluded = report.excluded_count,
            subscriptions = report.subscriptions.len(),
            "Analysis complete"
        );
        Ok(report)
    }

    /// Same analysis, run sequentially on the calling thread
    pub fn analyze_blocking(&self, set: &TransactionSet, now: DateTime<Utc>) -> AnalysisReport {
        let grouping = run_grouping(&self.rules, set, &self.grouping);
        let (subscriptions, health) =
            run_subscriptions(&self.rules, set, self.subscriptions.clone());
        let trends = run_trends(set, self.window_months, now, &self.trends);
        assemble(set, grouping, subscriptions, health, trends, now)
    }
}

fn run_grouping(
    rules: &RuleBook,
    set: &TransactionSet,
    config: &GroupingConfig,
) -> GroupingOutput {
    let classifier = CategoryClassifier::new(rules);
    let categories = grouping::group_categories_with(&classifier, &set.category_totals());
    let insights = grouping::insights_with(&categories, config);
    let enhanced = text::enhanced_breakdown(rules, set);
    GroupingOutput {
        categories,
        insights,
        enhanced,
    }
}

fn run_subscriptions(
    rules: &RuleBook,
    set: &TransactionSet,
    config: SubscriptionConfig,
) -> (Vec<SubscriptionCandidate>, HealthReport) {
    let detector = SubscriptionDetector::with_config(rules, config);
    let subscriptions = detector.detect(set.transactions());
    let health = detector.analyze_health(&subscriptions);
    (subscriptions, health)
}

fn run_trends(
    set: &TransactionSet,
    window_months: u32,
    now: DateTime<Utc>,
    config: &TrendConfig,
) -> TrendReport {
    trends::compute_trends_with(set.transactions(), window_months, now, config)
}

fn assemble(
    set: &TransactionSet,
    grouping: GroupingOutput,
    subscriptions: Vec<SubscriptionCandidate>,
    subscription_health: HealthReport,
    trends: TrendReport,
    now: DateTime<Utc>,
) -> AnalysisReport {
    AnalysisReport {
        generated_at: now,
        transaction_count: set.len(),
        excluded_count: set.exclusions().len(),
        categories: grouping.categories,
        category_insights: grouping.insights,
        enhanced_categories: grouping.enhanced,
        subscriptions,
        subscription_health,
        trends,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawAmount, RawTransaction, SuperCategory, Transaction};
    use chrono::{Duration, TimeZone};

    fn snapshot() -> TransactionSet {
        let start = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();
        let mut txs = Vec::new();
        for i in 0..5 {
            let date = start + Duration::days(30 * i);
            txs.push(Transaction::new("NETFLIX.COM", "Streaming Services", date, 15.99));
            txs.push(Transaction::new(
                "Coles",
                "Supermarket and Grocery Stores",
                date,
                120.0 + 7.0 * i as f64,
            ));
            txs.push(Transaction::new("Mystery", "Unknown", date, 8.0 + i as f64));
        }
        TransactionSet::new(txs)
    }

    #[tokio::test]
    async fn test_fan_out_matches_sequential() {
        let set = Arc::new(snapshot());
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let engine = AnalysisEngine::default();

        let concurrent = engine.analyze_at(set.clone(), now).await.unwrap();
        let sequential = engine.analyze_blocking(&set, now);
        assert_eq!(concurrent, sequential);

        assert_eq!(concurrent.transaction_count, 15);
        assert_eq!(concurrent.subscriptions.len(), 1);
        assert_eq!(concurrent.subscriptions[0].category, "Video Streaming");
        assert_eq!(
            concurrent.categories.groups[0].name,
            SuperCategory::FoodDining
        );
        assert_eq!(concurrent.trends.points.len(), 5);
    }

    #[tokio::test]
    async fn test_excluded_records_are_counted() {
        let set = TransactionSet::from_raw(vec![
            RawTransaction {
                date: "2024-01-01".to_string(),
                amount: RawAmount::Number(10.0),
                ..Default::default()
            },
            RawTransaction {
                date: "not a date".to_string(),
                amount: RawAmount::Number(10.0),
                ..Default::default()
            },
        ]);

        let report = AnalysisEngine::default()
            .analyze(Arc::new(set))
            .await
            .unwrap();
        assert_eq!(report.transaction_count, 1);
        assert_eq!(report.excluded_count, 1);
    }

    #[tokio::test]
    async fn test_empty_snapshot() {
        let report = AnalysisEngine::default()
            .with_window_months(3)
            .analyze(Arc::new(TransactionSet::default()))
            .await
            .unwrap();
        assert!(report.categories.is_empty());
        assert!(report.subscriptions.is_empty());
        assert_eq!(report.subscription_health, HealthReport::default());
        assert_eq!(report.trends.window_months, 3);
    }
}
