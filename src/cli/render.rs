//! Plain-text rendering of report sections

use std::fmt::Write;

use rust_decimal::Decimal;

use crate::types::{
    CostDateRecord, CostSummary, MergedDailyRecord, ModelUsageRecord, ReportSummary,
    UserUsageRecord,
};

/// Widest label printed before truncation
const LABEL_WIDTH: usize = 28;

/// Format a count with thousands separators: 1234567 → "1,234,567"
pub fn format_tokens(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Money is rounded to cents here and nowhere earlier
pub fn format_usd(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

/// Cut a label to `width` characters, marking the cut with "…"
pub fn truncate_label(label: &str, width: usize) -> String {
    if label.chars().count() <= width {
        return label.to_string();
    }
    let kept: String = label.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", kept)
}

pub fn render_summary(summary: &ReportSummary, costs: Option<&CostSummary>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Window:        {} .. {}", summary.window_start, summary.window_end);
    let _ = writeln!(out, "Invocations:   {}", format_tokens(summary.total_invocations));
    let _ = writeln!(out, "Input tokens:  {}", format_tokens(summary.total_input_tokens));
    let _ = writeln!(out, "Output tokens: {}", format_tokens(summary.total_output_tokens));
    let _ = writeln!(out, "Active models: {}", summary.active_model_count);
    if let Some(costs) = costs {
        let _ = writeln!(out, "Total cost:    {}", format_usd(costs.total));
    }
    out
}

pub fn render_models(models: &[ModelUsageRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<w$} {:>14} {:>16} {:>16}",
        "MODEL",
        "INVOCATIONS",
        "INPUT",
        "OUTPUT",
        w = LABEL_WIDTH
    );
    for model in models {
        let _ = writeln!(
            out,
            "{:<w$} {:>14} {:>16} {:>16}",
            truncate_label(&model.short_name, LABEL_WIDTH),
            format_tokens(model.invocations),
            format_tokens(model.input_tokens),
            format_tokens(model.output_tokens),
            w = LABEL_WIDTH
        );
    }
    out
}

pub fn render_users(users: &[UserUsageRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<w$} {:>12} {:<w$} {:<16}",
        "ACTOR",
        "INVOCATIONS",
        "TOP MODEL",
        "TOP CLIENT",
        w = LABEL_WIDTH
    );
    for user in users {
        let _ = writeln!(
            out,
            "{:<w$} {:>12} {:<w$} {:<16}",
            truncate_label(&user.actor, LABEL_WIDTH),
            format_tokens(user.invocation_count),
            truncate_label(&user.top_model, LABEL_WIDTH),
            truncate_label(&user.top_client, 16),
            w = LABEL_WIDTH
        );
    }
    out
}

pub fn render_daily(daily: &[MergedDailyRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<10} {:>14} {:>16} {:>16}", "DATE", "INVOCATIONS", "INPUT", "OUTPUT");
    for day in daily {
        let _ = writeln!(
            out,
            "{:<10} {:>14} {:>16} {:>16}",
            day.date,
            format_tokens(day.invocations),
            format_tokens(day.input_tokens),
            format_tokens(day.output_tokens),
        );
    }
    out
}

pub fn render_costs(days: &[CostDateRecord], summary: &CostSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<10} {:>12}  TOP CATEGORIES", "DATE", "COST");
    for day in days {
        let mut categories: Vec<String> = day
            .breakdown
            .iter()
            .map(|c| format!("{} {}", truncate_label(&c.label, 24), format_usd(c.amount)))
            .collect();
        if day.omitted_categories > 0 {
            categories.push(format!("+{} more", day.omitted_categories));
        }
        let _ = writeln!(
            out,
            "{:<10} {:>12}  {}",
            day.date,
            format_usd(day.total),
            categories.join(", ")
        );
    }
    let _ = writeln!(out, "{:<10} {:>12}", "TOTAL", format_usd(summary.total));
    out
}
