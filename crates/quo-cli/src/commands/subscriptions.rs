//! Subscription command implementations

use std::path::Path;

use anyhow::Result;
use quo_core::subscriptions::{
    HealthInsightKind, HealthReport, SubscriptionCandidate, SubscriptionDetector,
};
use serde::Serialize;

use super::{load_input, load_rules, print_json, truncate};
use crate::cli::InputArgs;

/// Output of `quo subscriptions --json`
#[derive(Debug, Serialize)]
struct SubscriptionsReport {
    subscriptions: Vec<SubscriptionCandidate>,
    health: HealthReport,
}

pub fn cmd_subscriptions(rules_path: Option<&Path>, input: &InputArgs, json: bool) -> Result<()> {
    let rules = load_rules(rules_path)?;
    let set = load_input(input)?;

    let detector = SubscriptionDetector::new(&rules);
    let subscriptions = detector.detect(set.transactions());
    let health = detector.analyze_health(&subscriptions);

    if json {
        return print_json(&SubscriptionsReport {
            subscriptions,
            health,
        });
    }

    if subscriptions.is_empty() {
        println!("No recurring charges detected.");
        return Ok(());
    }

    println!();
    println!("📋 Detected Subscriptions");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Count: {}    Monthly: ${:.2}    Annual: ${:.2}",
        health.total_count, health.total_monthly_cost, health.total_annual_cost
    );
    println!();
    println!(
        "   {:22} │ {:>8} │ {:9} │ {:>10} │ {:>5} │ {}",
        "Name", "Amount", "Freq", "Next", "Conf", "Category"
    );
    println!("   ───────────────────────┼──────────┼───────────┼────────────┼───────┼──────────────");

    for sub in &subscriptions {
        println!(
            "   {:22} │ {:>8.2} │ {:9} │ {:>10} │ {:>5.2} │ {}",
            truncate(&sub.name, 22),
            sub.amount,
            sub.frequency.as_str(),
            sub.next_expected.to_string(),
            sub.confidence,
            sub.category
        );
    }

    if !health.category_breakdown.is_empty() {
        println!();
        println!("   By category (monthly):");
        for (category, cost) in &health.category_breakdown {
            println!("      {:24} ${:>8.2}", truncate(category, 24), cost);
        }
    }

    if !health.insights.is_empty() {
        println!();
        for insight in &health.insights {
            let icon = match insight.kind {
                HealthInsightKind::Warning => "⚠️ ",
                HealthInsightKind::Info => "💡",
            };
            println!("   {} {}", icon, insight.message);
            println!("      {}", insight.suggestion);
        }
    }

    Ok(())
}
