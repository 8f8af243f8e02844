//! Classification and rules file commands

use std::path::Path;

use anyhow::Result;
use quo_core::{CategoryClassifier, MatchKind, RuleBook, SuperCategory};
use serde::Serialize;

use super::{print_json, truncate};

/// One classified label, as printed by `quo classify --json`
#[derive(Debug, Serialize)]
pub struct LabelClassification {
    pub label: String,
    pub super_category: SuperCategory,
    pub matched_by: MatchKind,
}

pub fn classify_labels(rules: &RuleBook, labels: &[String]) -> Vec<LabelClassification> {
    let classifier = CategoryClassifier::new(rules);
    labels
        .iter()
        .map(|label| {
            let (super_category, matched_by) = classifier.classify_with_reason(label);
            LabelClassification {
                label: label.clone(),
                super_category,
                matched_by,
            }
        })
        .collect()
}

pub fn cmd_classify(rules_path: Option<&Path>, labels: &[String], json: bool) -> Result<()> {
    let rules = super::load_rules(rules_path)?;
    let results = classify_labels(&rules, labels);

    if json {
        return print_json(&results);
    }

    println!();
    println!("🏷️  Classification");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:32} │ {:24} │ {}",
        "Label", "Super-category", "Matched by"
    );
    println!("   ─────────────────────────────────┼──────────────────────────┼────────────");

    for result in &results {
        println!(
            "   {:32} │ {:24} │ {}",
            truncate(&result.label, 32),
            result.super_category,
            result.matched_by
        );
    }

    Ok(())
}

pub fn cmd_rules(rules_path: Option<&Path>, dump: bool) -> Result<()> {
    let (rules, source) = RuleBook::resolve(rules_path)?;

    if dump {
        return print_json(&rules);
    }

    println!();
    println!("📜 Rules");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Source: {}", source);
    if let Some(path) = quo_core::rules::default_rules_path() {
        println!("   Override location: {}", path.display());
    }
    println!();
    println!("   Super-category rules:    {}", rules.super_categories.len());
    for rule in &rules.super_categories {
        println!(
            "      {:26} {:>3} keywords, {:>2} exact labels",
            rule.category.as_str(),
            rule.keywords.len(),
            rule.exact_matches.len()
        );
    }
    println!("   Special labels:          {}", rules.special_labels.join(", "));
    println!("   Broad labels:            {}", rules.broad_labels.join(", "));
    println!("   Stop words:              {}", rules.stop_words.len());
    println!(
        "   Subscription keywords:   {}",
        rules.subscription_keywords.len()
    );
    println!("   Known services:          {}", rules.known_services.len());
    println!(
        "   Subscription categories: {}",
        rules.category_keywords.len()
    );

    Ok(())
}
