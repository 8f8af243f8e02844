//! Keyword classifier
//!
//! Maps a raw provider category label onto a [`SuperCategory`]:
//! special label, then exact match, then keyword substring, then
//! `Other Services`. Rules are tried in declaration order and the first hit
//! wins, so overlapping keywords (e.g. "insurance", "gas") resolve to the
//! earlier group.

use serde::{Deserialize, Serialize};

use crate::models::SuperCategory;
use crate::rules::RuleBook;

/// Which rule step produced a classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "keyword", rename_all = "snake_case")]
pub enum MatchKind {
    /// Label is one of the "no useful category" labels
    Special,
    /// Label equals one of the group's exact matches
    Exact,
    /// Lowercased label contains this keyword
    Keyword(String),
    /// Nothing matched
    Fallback,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Special => write!(f, "special label"),
            Self::Exact => write!(f, "exact match"),
            Self::Keyword(k) => write!(f, "keyword '{}'", k),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Stateless classifier over a rule book
#[derive(Debug, Clone, Copy)]
pub struct CategoryClassifier<'a> {
    rules: &'a RuleBook,
}

impl Default for CategoryClassifier<'static> {
    fn default() -> Self {
        Self::new(RuleBook::builtin())
    }
}

impl<'a> CategoryClassifier<'a> {
    pub fn new(rules: &'a RuleBook) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'a RuleBook {
        self.rules
    }

    pub fn is_special(&self, label: &str) -> bool {
        self.rules.is_special_label(label)
    }

    pub fn classify(&self, label: &str) -> SuperCategory {
        self.classify_with_reason(label).0
    }

    pub fn classify_with_reason(&self, label: &str) -> (SuperCategory, MatchKind) {
        if self.is_special(label) {
            return (SuperCategory::Uncategorized, MatchKind::Special);
        }

        for rule in &self.rules.super_categories {
            if rule.exact_matches.iter().any(|m| m == label) {
                return (rule.category, MatchKind::Exact);
            }
        }

        let lowered = label.to_lowercase();
        for rule in &self.rules.super_categories {
            if let Some(keyword) = rule.keywords.iter().find(|k| lowered.contains(k.as_str())) {
                return (rule.category, MatchKind::Keyword(keyword.clone()));
            }
        }

        (SuperCategory::OtherServices, MatchKind::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(label: &str) -> SuperCategory {
        CategoryClassifier::default().classify(label)
    }

    #[test]
    fn test_special_labels() {
        assert_eq!(classify("Unknown"), SuperCategory::Uncategorized);
        assert_eq!(classify("OTHER"), SuperCategory::Uncategorized);
        assert_eq!(classify("No Category"), SuperCategory::Uncategorized);
    }

    #[test]
    fn test_exact_match_is_case_sensitive() {
        assert_eq!(classify("Fuel Retailing"), SuperCategory::Transportation);
        let (_, kind) = CategoryClassifier::default().classify_with_reason("Fuel Retailing");
        assert_eq!(kind, MatchKind::Exact);

        // Lowercased label falls through to keywords ("fuel")
        let (cat, kind) = CategoryClassifier::default().classify_with_reason("fuel retailing");
        assert_eq!(cat, SuperCategory::Transportation);
        assert_eq!(kind, MatchKind::Keyword("fuel".to_string()));
    }

    #[test]
    fn test_exact_match_beats_earlier_keyword() {
        // Contains "store" (Shopping keyword) but is an exact Food label
        assert_eq!(
            classify("Supermarket and Grocery Stores"),
            SuperCategory::FoodDining
        );
    }

    #[test]
    fn test_first_keyword_rule_wins() {
        // "insurance" appears in Health & Wellness and Financial Services
        assert_eq!(classify("Car Insurance"), SuperCategory::HealthWellness);
        // "gas" appears in Transportation and Utilities
        assert_eq!(classify("Gas Bill"), SuperCategory::Transportation);
    }

    #[test]
    fn test_fallback() {
        assert_eq!(classify("Pet Supplies"), SuperCategory::OtherServices);
        assert_eq!(
            CategoryClassifier::default().classify_with_reason("Pet Supplies").1,
            MatchKind::Fallback
        );
    }

    #[test]
    fn test_custom_rules() {
        let rules = RuleBook::from_toml(
            r#"
[[super_category]]
name = "Home & Living"
keywords = ["pet"]
"#,
        )
        .unwrap();
        let classifier = CategoryClassifier::new(&rules);
        assert_eq!(classifier.classify("Pet Supplies"), SuperCategory::HomeLiving);
        assert_eq!(classifier.classify("Fuel Retailing"), SuperCategory::OtherServices);
    }
}
