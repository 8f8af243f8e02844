//! Report command implementations

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use quo_core::grouping::{group_categories_with, insights_with, GroupingConfig};
use quo_core::savings::{BudgetRequest, SavingsAnalyzer};
use quo_core::text::{analyze_unknown_with, keyword_cooccurrence, CooccurrenceMatrix};
use quo_core::trends::{compute_trends, TrendInsights};
use quo_core::{
    AnalysisEngine, AnalysisReport, CategoryClassifier, CategoryInsights, GroupedCategories,
    SubcategoryMap, Transaction,
};
use serde::Serialize;

use super::{anchor_date, load_input, load_rules, print_json, slice_period, truncate};
use crate::cli::{InputArgs, Period};

/// Grouping output for `quo group --json`
#[derive(Debug, Serialize)]
struct GroupReport<'a> {
    categories: &'a GroupedCategories,
    insights: &'a CategoryInsights,
}

pub fn cmd_group(
    rules_path: Option<&Path>,
    input: &InputArgs,
    period: Period,
    json: bool,
) -> Result<()> {
    let rules = load_rules(rules_path)?;
    let set = slice_period(&load_input(input)?, period);

    let classifier = CategoryClassifier::new(&rules);
    let grouped = group_categories_with(&classifier, &set.category_totals());
    let insights = insights_with(&grouped, &GroupingConfig::default());

    if json {
        return print_json(&GroupReport {
            categories: &grouped,
            insights: &insights,
        });
    }

    println!();
    println!("📊 Spending by Category");
    println!("   Period: {:?}", period);
    println!("   ─────────────────────────────────────────────────────────────");

    if grouped.is_empty() {
        println!("   No spending found in this period.");
        return Ok(());
    }

    println!("   Total: ${:.2}", grouped.grand_total);
    println!();
    println!(
        "   {:30} │ {:>10} │ {:>6}",
        "Category", "Amount", "%"
    );
    println!("   ───────────────────────────────┼────────────┼────────");

    for group in &grouped.groups {
        println!(
            "   {:30} │ {:>10.2} │ {:>5.1}%",
            group.name.as_str(),
            group.total,
            group.percentage
        );
        for sub in &group.subcategories {
            println!(
                "   {:30} │ {:>10.2} │",
                format!("  {}", truncate(&sub.name, 28)),
                sub.amount
            );
        }
    }

    println!();
    if let Some(largest) = &insights.largest {
        println!(
            "   Largest: {} ({:.1}%)",
            largest.name, largest.percentage
        );
    }
    if let Some(diverse) = &insights.most_diverse {
        println!(
            "   Most diverse: {} ({} categories)",
            diverse.name, diverse.num_subcategories
        );
    }
    println!("   Concentration: {:.2}", insights.concentration_score);
    for recommendation in &insights.recommendations {
        println!("   💡 {}", recommendation);
    }

    Ok(())
}

/// Output of `quo unknown --json`
#[derive(Debug, Serialize)]
struct UnknownReport {
    breakdown: SubcategoryMap,
    cooccurrence: CooccurrenceMatrix,
}

/// Keyword pairs seen on the most days, each pair once
pub fn top_keyword_pairs(matrix: &CooccurrenceMatrix, limit: usize) -> Vec<(&str, &str, usize)> {
    let mut pairs: Vec<(&str, &str, usize)> = matrix
        .iter()
        .flat_map(|(a, row)| {
            row.iter()
                .filter(move |(b, _)| a < *b)
                .map(move |(b, &days)| (a.as_str(), b.as_str(), days))
        })
        .collect();
    pairs.sort_by(|x, y| y.2.cmp(&x.2));
    pairs.truncate(limit);
    pairs
}

pub fn cmd_unknown(rules_path: Option<&Path>, input: &InputArgs, json: bool) -> Result<()> {
    let rules = load_rules(rules_path)?;
    let set = load_input(input)?;
    let breakdown = analyze_unknown_with(&rules, set.transactions());

    let unknown: Vec<Transaction> = set
        .iter()
        .filter(|t| rules.is_special_label(&t.category))
        .cloned()
        .collect();
    let cooccurrence = keyword_cooccurrence(&rules, &unknown);

    if json {
        return print_json(&UnknownReport {
            breakdown,
            cooccurrence,
        });
    }

    println!();
    println!("🔎 Unknown Transactions by Keyword");
    println!("   ─────────────────────────────────────────────────────────────");

    if breakdown.is_empty() {
        println!("   No transactions with a generic category.");
        return Ok(());
    }

    let mut rows: Vec<(&String, &Vec<Transaction>, f64)> = breakdown
        .iter()
        .map(|(label, txs)| (label, txs, txs.iter().map(|t| t.amount).sum()))
        .collect();
    rows.sort_by(|a, b| b.2.total_cmp(&a.2));

    println!(
        "   {:24} │ {:>10} │ {:>5} │ {}",
        "Label", "Amount", "Count", "Example"
    );
    println!("   ─────────────────────────┼────────────┼───────┼──────────────────────");

    for (label, txs, amount) in rows {
        let example = txs.first().map(|t| t.description.as_str()).unwrap_or("");
        println!(
            "   {:24} │ {:>10.2} │ {:>5} │ {}",
            truncate(label, 24),
            amount,
            txs.len(),
            truncate(example, 30)
        );
    }

    let pairs = top_keyword_pairs(&cooccurrence, 5);
    if !pairs.is_empty() {
        println!();
        println!("   Keywords seen on the same day:");
        for (a, b, days) in pairs {
            println!("      {} + {} ({} days)", a, b, days);
        }
    }

    Ok(())
}

pub fn cmd_trends(input: &InputArgs, months: u32, json: bool) -> Result<()> {
    let set = load_input(input)?;
    let report = compute_trends(set.transactions(), months, anchor_date(&set));

    if json {
        return print_json(&report);
    }

    println!();
    println!("📈 Spending Trends (last {} months)", report.window_months);
    println!("   ─────────────────────────────────────────────────────────────");

    for point in &report.points {
        println!("   {:8} │ {:>10.2}", point.month.to_string(), point.total);
    }
    println!();

    match &report.insights {
        TrendInsights::InsufficientData {
            months_analyzed,
            message,
        } => {
            println!("   {} ({} months)", message, months_analyzed);
        }
        TrendInsights::Fitted {
            direction,
            average_monthly,
            next_month_prediction,
            volatility_rating,
            change_rate,
            ..
        } => {
            println!(
                "   Direction: {} ({:+.2}/month)",
                direction, change_rate
            );
            println!("   Average: ${:.2}/month", average_monthly);
            println!("   Next month: ${:.2}", next_month_prediction);
            println!("   Volatility: {}", volatility_rating);
        }
    }

    if !report.patterns.is_empty() {
        println!();
        for pattern in &report.patterns {
            println!("   • {}", pattern.description);
        }
    }

    if !report.top_categories.is_empty() {
        println!();
        println!("   Top categories:");
        for category in &report.top_categories {
            println!(
                "      {:30} {:>10.2}",
                truncate(&category.name, 30),
                category.amount
            );
        }
    }

    Ok(())
}

pub fn cmd_savings(rules_path: Option<&Path>, input: &InputArgs, json: bool) -> Result<()> {
    let rules = load_rules(rules_path)?;
    let set = load_input(input)?;
    let report =
        SavingsAnalyzer::new(&rules).find_opportunities(set.transactions(), anchor_date(&set));

    if json {
        return print_json(&report);
    }

    println!();
    println!("💰 Savings Opportunities ({})", report.analysis_period);
    println!("   ─────────────────────────────────────────────────────────────");

    if report.opportunities.is_empty() {
        println!("   No obvious savings opportunities found.");
        return Ok(());
    }

    println!(
        "   Potential savings: ${:.2}/month",
        report.total_savings_potential
    );
    println!();

    for opportunity in &report.opportunities {
        println!(
            "   {} [{}] ${:.2}/month",
            opportunity.title, opportunity.difficulty, opportunity.savings_potential
        );
        println!("      {}", opportunity.description);
        println!("      💡 {}", opportunity.suggestion);
    }

    if !report.tips.is_empty() {
        println!();
        for tip in &report.tips {
            println!("   ✨ {}: {}", tip.title, tip.description);
        }
    }

    Ok(())
}

pub fn cmd_budget(
    rules_path: Option<&Path>,
    input: &InputArgs,
    income: f64,
    savings_goal: f64,
    fixed: Vec<(String, f64)>,
    json: bool,
) -> Result<()> {
    anyhow::ensure!(
        income.is_finite() && income >= 0.0,
        "--income must be a non-negative number"
    );
    anyhow::ensure!(
        savings_goal.is_finite() && savings_goal >= 0.0,
        "--savings-goal must be a non-negative number"
    );

    let rules = load_rules(rules_path)?;
    let set = load_input(input)?;
    let request = budget_request(income, savings_goal, fixed);
    let plan = SavingsAnalyzer::new(&rules).recommend_budget(
        set.transactions(),
        anchor_date(&set),
        &request,
    );

    if json {
        return print_json(&plan);
    }

    let summary = &plan.summary;
    println!();
    println!("🧮 Budget Recommendation");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Income:              ${:>10.2}", summary.monthly_income);
    println!("   Fixed expenses:      ${:>10.2}", summary.fixed_expenses);
    println!("   Savings goal:        ${:>10.2}", summary.savings_goal);
    println!(
        "   Available:           ${:>10.2}",
        summary.available_for_variable
    );
    println!(
        "   Current spending:    ${:>10.2}",
        summary.current_variable_spending
    );
    println!(
        "   Surplus/deficit:     ${:>10.2}",
        summary.deficit_or_surplus
    );

    if !plan.category_budgets.is_empty() {
        println!();
        println!(
            "   {:28} │ {:>10} │ {:>10} │ {}",
            "Category", "Current", "Budget", "Action"
        );
        println!("   ─────────────────────────────┼────────────┼────────────┼──────────");
        for budget in &plan.category_budgets {
            println!(
                "   {:28} │ {:>10.2} │ {:>10.2} │ {}",
                truncate(&budget.category, 28),
                budget.current,
                budget.recommended,
                budget.action
            );
        }
    }

    for adjustment in &plan.adjustments {
        println!();
        println!(
            "   ✂️  {}: cut ${:.2}/month",
            adjustment.category, adjustment.reduction_needed
        );
        for tip in &adjustment.tips {
            println!("      • {}", tip);
        }
    }

    for warning in &plan.warnings {
        println!();
        println!("   ⚠️  {}", warning);
    }

    Ok(())
}

/// Fold repeated `--fixed` names together
pub fn budget_request(income: f64, savings_goal: f64, fixed: Vec<(String, f64)>) -> BudgetRequest {
    let mut fixed_expenses: BTreeMap<String, f64> = BTreeMap::new();
    for (name, amount) in fixed {
        *fixed_expenses.entry(name).or_insert(0.0) += amount;
    }
    BudgetRequest {
        income,
        savings_goal,
        fixed_expenses,
    }
}

pub async fn cmd_analyze(
    rules_path: Option<&Path>,
    input: &InputArgs,
    months: u32,
    json: bool,
) -> Result<()> {
    let rules = load_rules(rules_path)?;
    let set = load_input(input)?;
    let now = anchor_date(&set);

    let report = AnalysisEngine::new(rules)
        .with_window_months(months)
        .analyze_at(Arc::new(set), now)
        .await
        .context("Analysis failed")?;

    if json {
        return print_json(&report);
    }

    print_analysis(&report);
    Ok(())
}

fn print_analysis(report: &AnalysisReport) {
    println!();
    println!("📋 Spending Analysis");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Transactions: {} ({} excluded)",
        report.transaction_count, report.excluded_count
    );
    println!("   Total: ${:.2}", report.categories.grand_total);

    println!();
    println!("   Categories:");
    for group in &report.categories.groups {
        println!(
            "      {:28} {:>10.2} {:>5.1}%",
            group.name.as_str(),
            group.total,
            group.percentage
        );
    }
    for recommendation in &report.category_insights.recommendations {
        println!("      💡 {}", recommendation);
    }

    for category in &report.enhanced_categories {
        if let Some(subcategories) = &category.subcategories {
            println!();
            println!("   {} breakdown:", category.name);
            for sub in subcategories {
                println!(
                    "      {:28} {:>10.2} ({})",
                    truncate(&sub.name, 28),
                    sub.amount,
                    sub.count
                );
            }
        }
    }

    println!();
    println!(
        "   Subscriptions: {} (${:.2}/month)",
        report.subscriptions.len(),
        report.subscription_health.total_monthly_cost
    );
    for sub in &report.subscriptions {
        println!(
            "      {:24} {:>8.2}/{:<9} {}",
            truncate(&sub.name, 24),
            sub.amount,
            sub.frequency.as_str(),
            sub.category
        );
    }

    println!();
    match &report.trends.insights {
        TrendInsights::InsufficientData { message, .. } => println!("   Trend: {}", message),
        TrendInsights::Fitted {
            direction,
            average_monthly,
            ..
        } => println!(
            "   Trend: {} (average ${:.2}/month)",
            direction, average_monthly
        ),
    }
}
