//! Category grouping engine
//!
//! Folds raw provider category totals into super-categories and derives
//! summary insights (largest group, diversity, concentration).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::CategoryClassifier;
use crate::models::{CategoryTotal, SuperCategory};

/// Grouping insight thresholds
#[derive(Debug, Clone)]
pub struct GroupingConfig {
    /// Herfindahl index above which spending counts as concentrated (0-1)
    pub concentration_threshold: f64,
    /// Uncategorized share (percent) above which a review is recommended
    pub uncategorized_threshold: f64,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            concentration_threshold: 0.5,
            uncategorized_threshold: 20.0,
        }
    }
}

/// Spend folded into one super-category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub name: SuperCategory,
    pub total: f64,
    /// Share of the grand total, 0-100
    pub percentage: f64,
    /// Constituent raw categories, amount descending
    pub subcategories: Vec<CategoryTotal>,
}

/// Result of [`group_categories`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedCategories {
    /// Non-empty groups, total descending
    pub groups: Vec<CategoryGroup>,
    pub grand_total: f64,
}

impl GroupedCategories {
    pub fn get(&self, category: SuperCategory) -> Option<&CategoryGroup> {
        self.groups.iter().find(|g| g.name == category)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LargestGroup {
    pub name: SuperCategory,
    pub amount: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiverseGroup {
    pub name: SuperCategory,
    pub num_subcategories: usize,
}

/// Summary insights over a grouping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryInsights {
    pub largest: Option<LargestGroup>,
    pub most_diverse: Option<DiverseGroup>,
    /// Herfindahl index over group shares (1 = everything in one group)
    pub concentration_score: f64,
    pub num_groups: usize,
    pub recommendations: Vec<String>,
}

/// Group category totals with the built-in rules
pub fn group_categories(categories: &[CategoryTotal]) -> GroupedCategories {
    group_categories_with(&CategoryClassifier::default(), categories)
}

/// Group category totals with a specific classifier
pub fn group_categories_with(
    classifier: &CategoryClassifier<'_>,
    categories: &[CategoryTotal],
) -> GroupedCategories {
    let mut buckets: Vec<(SuperCategory, f64, Vec<CategoryTotal>)> = Vec::new();
    let mut grand_total = 0.0;

    for category in categories {
        grand_total += category.amount;
        let super_category = classifier.classify(&category.name);

        match buckets.iter_mut().find(|(name, _, _)| *name == super_category) {
            Some((_, total, subs)) => {
                *total += category.amount;
                subs.push(category.clone());
            }
            None => buckets.push((super_category, category.amount, vec![category.clone()])),
        }
    }

    let mut groups: Vec<CategoryGroup> = buckets
        .into_iter()
        .map(|(name, total, mut subcategories)| {
            subcategories.sort_by(|a, b| b.amount.total_cmp(&a.amount));
            let percentage = if grand_total > 0.0 {
                total / grand_total * 100.0
            } else {
                0.0
            };
            CategoryGroup {
                name,
                total,
                percentage,
                subcategories,
            }
        })
        .collect();

    groups.sort_by(|a, b| b.total.total_cmp(&a.total).then(a.name.cmp(&b.name)));

    debug!(
        "Grouped {} categories into {} super-categories",
        categories.len(),
        groups.len()
    );

    GroupedCategories {
        groups,
        grand_total,
    }
}

/// Insights with default thresholds
pub fn insights(grouped: &GroupedCategories) -> CategoryInsights {
    insights_with(grouped, &GroupingConfig::default())
}

pub fn insights_with(grouped: &GroupedCategories, config: &GroupingConfig) -> CategoryInsights {
    if grouped.is_empty() {
        return CategoryInsights::default();
    }

    // Groups are already sorted by total; the first max wins ties
    let largest = grouped.groups.first().map(|g| LargestGroup {
        name: g.name,
        amount: g.total,
        percentage: g.percentage,
    });

    let most_diverse = grouped
        .groups
        .iter()
        .fold(None::<&CategoryGroup>, |best, g| match best {
            Some(b) if b.subcategories.len() >= g.subcategories.len() => Some(b),
            _ => Some(g),
        })
        .map(|g| DiverseGroup {
            name: g.name,
            num_subcategories: g.subcategories.len(),
        });

    let concentration_score = if grouped.grand_total > 0.0 {
        grouped
            .groups
            .iter()
            .map(|g| (g.total / grouped.grand_total).powi(2))
            .sum()
    } else {
        0.0
    };

    let mut recommendations = Vec::new();
    if concentration_score > config.concentration_threshold {
        recommendations.push(
            "Your spending is highly concentrated. Consider diversifying your expenses."
                .to_string(),
        );
    }
    if let Some(uncategorized) = grouped.get(SuperCategory::Uncategorized) {
        if uncategorized.percentage > config.uncategorized_threshold {
            recommendations.push(format!(
                "{:.1}% of spending is uncategorized. Review these transactions for better insights.",
                uncategorized.percentage
            ));
        }
    }

    CategoryInsights {
        largest,
        most_diverse,
        concentration_score,
        num_groups: grouped.groups.len(),
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(items: &[(&str, f64)]) -> Vec<CategoryTotal> {
        items
            .iter()
            .map(|(name, amount)| CategoryTotal::new(*name, *amount))
            .collect()
    }

    #[test]
    fn test_group_and_sort_subcategories() {
        let grouped = group_categories(&totals(&[
            ("Pharmacies", 50.0),
            ("Health Insurance", 200.0),
            ("Fuel Retailing", 100.0),
        ]));

        assert_eq!(grouped.grand_total, 350.0);
        assert_eq!(grouped.groups[0].name, SuperCategory::HealthWellness);
        let health = grouped.get(SuperCategory::HealthWellness).unwrap();
        assert_eq!(health.total, 250.0);
        assert_eq!(health.subcategories[0].name, "Health Insurance");
        assert_eq!(health.subcategories[1].name, "Pharmacies");
        assert!(grouped.get(SuperCategory::HomeLiving).is_none());
    }

    #[test]
    fn test_zero_grand_total_has_zero_percentages() {
        let grouped = group_categories(&totals(&[("Unknown", 0.0), ("Gaming", 0.0)]));
        assert_eq!(grouped.grand_total, 0.0);
        assert!(grouped.groups.iter().all(|g| g.percentage == 0.0));

        let insights = insights(&grouped);
        assert_eq!(insights.concentration_score, 0.0);
    }

    #[test]
    fn test_empty_input() {
        let grouped = group_categories(&[]);
        assert!(grouped.is_empty());
        let insights = insights(&grouped);
        assert!(insights.largest.is_none());
        assert_eq!(insights.num_groups, 0);
    }

    #[test]
    fn test_insights_recommendations() {
        let grouped = group_categories(&totals(&[
            ("Unknown", 900.0),
            ("Other", 50.0),
            ("Gaming", 50.0),
        ]));
        let insights = insights(&grouped);

        let largest = insights.largest.unwrap();
        assert_eq!(largest.name, SuperCategory::Uncategorized);
        assert!((largest.percentage - 95.0).abs() < 1e-9);
        assert_eq!(
            insights.most_diverse.unwrap().name,
            SuperCategory::Uncategorized
        );
        // 0.95^2 + 0.05^2
        assert!((insights.concentration_score - 0.905).abs() < 1e-9);
        assert_eq!(insights.recommendations.len(), 2);
        assert!(insights.recommendations[1].starts_with("95.0% of spending"));
    }

    #[test]
    fn test_balanced_spend_has_no_recommendations() {
        let grouped = group_categories(&totals(&[
            ("Fuel Retailing", 100.0),
            ("Gaming", 100.0),
            ("Utilities", 100.0),
        ]));
        let insights = insights(&grouped);
        assert!(insights.recommendations.is_empty());
        assert_eq!(insights.num_groups, 3);
    }
}
