//! Plain-text rendering of command results for the terminal.

use std::fmt::Write;

use chrono::{DateTime, Local, TimeZone};

use super::auth::AuthStatus;
use super::history::ActivityItem;
use crate::analyzer::{LifestyleOverhaulPlan, ProductAnalysis, Recommendation};

/// Local date and time of an epoch-millisecond timestamp.
pub fn format_timestamp(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => DateTime::from_timestamp_millis(millis)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| millis.to_string()),
    }
}

pub fn render_analysis(analysis: &ProductAnalysis) -> String {
    let mut out = String::new();
    let score = analysis.overall_score;
    let _ = writeln!(out, "{}  [{} - {}]", analysis.product_name, score, score.label());
    let _ = writeln!(out, "{}", analysis.summary);

    if !analysis.ingredients.is_empty() {
        let _ = writeln!(out, "\nIngredients:");
        for ingredient in &analysis.ingredients {
            let _ = writeln!(
                out,
                "  - {} ({}): {}",
                ingredient.name,
                ingredient.impact.as_str(),
                ingredient.description
            );
        }
    }

    if !analysis.allergens.is_empty() {
        let _ = writeln!(out, "\nAllergens: {}", analysis.allergens.join(", "));
    }

    if !analysis.alternatives.is_empty() {
        let _ = writeln!(out, "\nHealthier alternatives:");
        for alt in &analysis.alternatives {
            let _ = writeln!(out, "  - {}: {}", alt.product_name, alt.reason);
        }
    }

    if !analysis.retail_links.is_empty() {
        let _ = writeln!(out, "\nWhere to buy:");
        for link in &analysis.retail_links {
            let _ = writeln!(out, "  - {}: {}", link.retailer, link.url);
        }
    }

    if !analysis.image_url.is_empty() {
        let _ = writeln!(out, "\nImage: {}", analysis.image_url);
    }
    out
}

pub fn render_overhaul(plan: &LifestyleOverhaulPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", plan.overall_summary);

    if !plan.action_plan.is_empty() {
        let _ = writeln!(out, "\nAction plan:");
        for item in &plan.action_plan {
            let _ = writeln!(
                out,
                "  [{}] {}: {}",
                item.priority.as_str(),
                item.original_product,
                item.reason
            );
            for swap in &item.suggested_swaps {
                let _ = writeln!(out, "      -> {}: {}", swap.product_name, swap.reason);
            }
        }
    }

    if !plan.general_advice.is_empty() {
        let _ = writeln!(out, "\nGeneral advice:");
        for tip in &plan.general_advice {
            let _ = writeln!(out, "  - {}", tip);
        }
    }
    out
}

pub fn render_recommendations(recommendations: &[Recommendation]) -> String {
    let mut out = String::new();
    for (i, rec) in recommendations.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, rec.product_name);
        let _ = writeln!(out, "   {}", rec.reason);
    }
    out
}

pub fn render_activity(items: &[ActivityItem]) -> String {
    if items.is_empty() {
        return "No history yet.\n".to_string();
    }

    let mut out = String::new();
    for item in items {
        let when = format_timestamp(item.timestamp());
        match item {
            ActivityItem::Product(p) => {
                let _ = writeln!(
                    out,
                    "{}  product   [{}] {}",
                    when, p.record.overall_score, p.record.product_name
                );
            }
            ActivityItem::Overhaul(o) => {
                let _ = writeln!(
                    out,
                    "{}  overhaul  {} item(s): {}",
                    when,
                    o.record.action_plan.len(),
                    o.query
                );
            }
        }
    }
    out
}

pub fn render_auth_status(status: &AuthStatus) -> String {
    if !status.configured {
        return "Sign-in is not configured; history is kept on this device.\n".to_string();
    }
    let mut out = match &status.state.user {
        Some(user) => format!("Signed in as {} ({})\n", user.email, user.uid),
        None => "Not signed in.\n".to_string(),
    };
    if let Some(err) = &status.state.error {
        let _ = writeln!(out, "Last error: {}", err);
    }
    out
}
