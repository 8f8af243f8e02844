//! Quo Core Library
//!
//! Spending analysis over a snapshot of bank transactions:
//! - Transaction ingestion from JSON/CSV with validation
//! - Super-category grouping with a TOML rule book
//! - Keyword and merchant-pattern breakdown of generic categories
//! - Recurring subscription detection and health checks
//! - Monthly trend fitting and pattern detection
//! - Savings opportunities and budget recommendations
//! - An engine that runs the independent analyzers concurrently

pub mod classify;
pub mod engine;
pub mod error;
pub mod grouping;
pub mod models;
pub mod rules;
pub mod savings;
pub mod store;
pub mod subscriptions;
pub mod text;
pub mod trends;

/// Fixture builders for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use classify::{CategoryClassifier, MatchKind};
pub use engine::{AnalysisEngine, AnalysisReport, DEFAULT_WINDOW_MONTHS};
pub use error::{Error, Result};
pub use grouping::{group_categories, insights, CategoryInsights, GroupedCategories};
pub use models::{
    CategoryTotal, Frequency, MonthKey, RawAmount, RawTransaction, SuperCategory, Transaction,
    TransactionMode,
};
pub use rules::{RuleBook, RulesSource};
pub use savings::{
    find_savings_opportunities, recommend_budget, BudgetPlan, BudgetRequest, SavingsReport,
};
pub use store::{Exclusion, ExclusionReason, TransactionSet};
pub use subscriptions::{
    analyze_subscription_health, detect_subscriptions, HealthReport, SubscriptionCandidate,
};
pub use text::{analyze_by_merchant_patterns, analyze_unknown, SubcategoryMap};
pub use trends::{compute_trends, TrendReport};
