//! Spending trend analysis
//!
//! Buckets a trailing window of transactions by calendar month, fits a
//! least-squares line through the monthly totals and looks for seasonal and
//! per-category patterns.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{CategoryTotal, MonthKey, Transaction};

/// Trend analysis thresholds
#[derive(Debug, Clone)]
pub struct TrendConfig {
    /// Monthly points needed before fitting a trend
    pub min_points: usize,
    /// Monthly points needed before looking for seasonality
    pub seasonal_min_points: usize,
    /// A month-number average above `factor * mean` counts as seasonal
    pub seasonal_factor: f64,
    /// Category slope must exceed this fraction of the category mean
    pub category_change_threshold: f64,
    /// Volatility above this fraction of the mean rates "high"
    pub high_volatility: f64,
    /// Volatility above this fraction of the mean rates "moderate"
    pub moderate_volatility: f64,
    /// Category names listed in a growth/decline pattern
    pub max_listed_categories: usize,
    /// Entries in `top_categories`
    pub top_categories: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            min_points: 3,
            seasonal_min_points: 12,
            seasonal_factor: 1.2,
            category_change_threshold: 0.1,
            high_volatility: 0.3,
            moderate_volatility: 0.15,
            max_listed_categories: 3,
            top_categories: 5,
        }
    }
}

/// Spend in one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub month: MonthKey,
    pub total: f64,
    pub categories: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRating {
    Low,
    Moderate,
    High,
}

impl VolatilityRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolatilityRating::Low => "low",
            VolatilityRating::Moderate => "moderate",
            VolatilityRating::High => "high",
        }
    }
}

impl std::fmt::Display for VolatilityRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of trend fitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrendInsights {
    /// Too few months to fit a line
    InsufficientData {
        months_analyzed: usize,
        message: String,
    },
    Fitted {
        direction: TrendDirection,
        average_monthly: f64,
        /// Extrapolated total for the month after the window, never negative
        next_month_prediction: f64,
        /// Population standard deviation of monthly totals
        volatility: f64,
        volatility_rating: VolatilityRating,
        /// Slope of the fitted line (currency per month)
        change_rate: f64,
        months_analyzed: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Seasonal,
    CategoryGrowth,
    CategoryDecline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPattern {
    pub kind: PatternKind,
    pub description: String,
}

/// Result of [`compute_trends`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub window_months: u32,
    /// Chronological
    pub points: Vec<TrendPoint>,
    pub insights: TrendInsights,
    pub patterns: Vec<TrendPattern>,
    /// Largest categories in the window, amount descending
    pub top_categories: Vec<CategoryTotal>,
}

/// Least-squares fit of `values` against their index, returns (slope, intercept)
pub(crate) fn linear_fit(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = mean(values);

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        numerator += dx * (y - mean_y);
        denominator += dx * dx;
    }

    let slope = if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    };
    (slope, mean_y - slope * mean_x)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn population_std(values: &[f64]) -> f64 {
    let m = mean(values);
    mean(&values.iter().map(|v| (v - m).powi(2)).collect::<Vec<_>>()).sqrt()
}

/// Trends over the trailing `window_months` with default thresholds
pub fn compute_trends(
    transactions: &[Transaction],
    window_months: u32,
    now: DateTime<Utc>,
) -> TrendReport {
    compute_trends_with(transactions, window_months, now, &TrendConfig::default())
}

pub fn compute_trends_with(
    transactions: &[Transaction],
    window_months: u32,
    now: DateTime<Utc>,
    config: &TrendConfig,
) -> TrendReport {
    let start = now
        .checked_sub_months(Months::new(window_months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut monthly: BTreeMap<MonthKey, BTreeMap<String, f64>> = BTreeMap::new();
    let mut category_order: Vec<CategoryTotal> = Vec::new();

    for tx in transactions.iter().filter(|t| t.date >= start) {
        *monthly
            .entry(tx.month_key())
            .or_default()
            .entry(tx.category.clone())
            .or_default() += tx.amount;

        match category_order.iter_mut().find(|c| c.name == tx.category) {
            Some(total) => total.amount += tx.amount,
            None => category_order.push(CategoryTotal::new(tx.category.clone(), tx.amount)),
        }
    }

    let points: Vec<TrendPoint> = monthly
        .into_iter()
        .map(|(month, categories)| TrendPoint {
            month,
            total: categories.values().sum(),
            categories,
        })
        .collect();

    let insights = fit_insights(&points, config);

    let mut patterns = Vec::new();
    if points.len() >= config.seasonal_min_points {
        patterns.extend(seasonal_pattern(&points, config));
    }
    let order: Vec<&str> = category_order.iter().map(|c| c.name.as_str()).collect();
    patterns.extend(category_patterns(&points, &order, config));

    let mut top_categories = category_order;
    top_categories.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    top_categories.truncate(config.top_categories);

    debug!(
        "Trend analysis: {} months in a {}-month window, {} patterns",
        points.len(),
        window_months,
        patterns.len()
    );

    TrendReport {
        window_months,
        points,
        insights,
        patterns,
        top_categories,
    }
}

fn fit_insights(points: &[TrendPoint], config: &TrendConfig) -> TrendInsights {
    if points.len() < config.min_points {
        return TrendInsights::InsufficientData {
            months_analyzed: points.len(),
            message: "Not enough data for trend analysis".to_string(),
        };
    }

    let totals: Vec<f64> = points.iter().map(|p| p.total).collect();
    let (slope, intercept) = linear_fit(&totals);
    let average = mean(&totals);
    let volatility = population_std(&totals);

    let volatility_rating = if volatility > average * config.high_volatility {
        VolatilityRating::High
    } else if volatility > average * config.moderate_volatility {
        VolatilityRating::Moderate
    } else {
        VolatilityRating::Low
    };

    TrendInsights::Fitted {
        direction: if slope > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        },
        average_monthly: average,
        next_month_prediction: (slope * totals.len() as f64 + intercept).max(0.0),
        volatility,
        volatility_rating,
        change_rate: slope,
        months_analyzed: points.len(),
    }
}

fn seasonal_pattern(points: &[TrendPoint], config: &TrendConfig) -> Option<TrendPattern> {
    // Month numbers in order of first appearance
    let mut by_month: Vec<(u32, Vec<f64>)> = Vec::new();
    for point in points {
        match by_month.iter_mut().find(|(m, _)| *m == point.month.month) {
            Some((_, totals)) => totals.push(point.total),
            None => by_month.push((point.month.month, vec![point.total])),
        }
    }

    let averages: Vec<(u32, f64)> = by_month.iter().map(|(m, t)| (*m, mean(t))).collect();
    let overall = mean(&averages.iter().map(|(_, a)| *a).collect::<Vec<_>>());

    let high_months: Vec<u32> = averages
        .iter()
        .filter(|(_, avg)| *avg > overall * config.seasonal_factor)
        .map(|(m, _)| *m)
        .collect();

    if high_months.is_empty() {
        return None;
    }

    Some(TrendPattern {
        kind: PatternKind::Seasonal,
        description: format!("Higher spending typically in months: {:?}", high_months),
    })
}

/// Growth and decline per category, listed in `order` (first appearance)
fn category_patterns(
    points: &[TrendPoint],
    order: &[&str],
    config: &TrendConfig,
) -> Vec<TrendPattern> {
    // Observed monthly amounts per category; months without spend are skipped
    let series: Vec<(&str, Vec<f64>)> = order
        .iter()
        .map(|&category| {
            let amounts = points
                .iter()
                .filter_map(|p| p.categories.get(category).copied())
                .collect();
            (category, amounts)
        })
        .collect();

    let mut growing = Vec::new();
    let mut declining = Vec::new();

    for (category, amounts) in &series {
        match amounts.len() {
            0 | 1 => {}
            2 => {
                if amounts[1] > amounts[0] * (1.0 + config.category_change_threshold) {
                    growing.push(*category);
                } else if amounts[1] < amounts[0] * (1.0 - config.category_change_threshold) {
                    declining.push(*category);
                }
            }
            _ => {
                let (slope, _) = linear_fit(amounts);
                let threshold = mean(amounts) * config.category_change_threshold;
                if slope > threshold {
                    growing.push(*category);
                } else if slope < -threshold {
                    declining.push(*category);
                }
            }
        }
    }

    let mut patterns = Vec::new();
    if !growing.is_empty() {
        growing.truncate(config.max_listed_categories);
        patterns.push(TrendPattern {
            kind: PatternKind::CategoryGrowth,
            description: format!("Increasing spending in: {}", growing.join(", ")),
        });
    }
    if !declining.is_empty() {
        declining.truncate(config.max_listed_categories);
        patterns.push(TrendPattern {
            kind: PatternKind::CategoryDecline,
            description: format!("Decreasing spending in: {}", declining.join(", ")),
        });
    }
    patterns
}
