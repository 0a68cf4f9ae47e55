//! Report types returned to the rendering layer

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Per-model totals over the window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelUsageRecord {
    pub entity_id: String,
    pub short_name: String,
    pub invocations: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl ModelUsageRecord {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// A label with its occurrence count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: u64,
}

/// Per-caller invocation totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserUsageRecord {
    pub actor: String,
    pub invocation_count: u64,
    pub model_breakdown: Vec<LabelCount>,
    pub client_breakdown: Vec<LabelCount>,
    pub top_model: String,
    pub top_client: String,
}

/// All metric kinds for one day, summed across models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergedDailyRecord {
    pub date: NaiveDate,
    pub invocations: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Cost of one raw billing code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostCategory {
    pub usage_type: String,
    pub label: String,
    pub amount: Decimal,
}

/// Cost of one day. `total` includes categories cut from `breakdown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostDateRecord {
    pub date: NaiveDate,
    pub total: Decimal,
    pub breakdown: Vec<CostCategory>,
    pub omitted_categories: usize,
}

/// Window-wide cost totals by billing code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct CostSummary {
    pub total: Decimal,
    pub categories: Vec<CostCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub total_invocations: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub active_model_count: usize,
}

impl ReportSummary {
    /// Totals come from the merged daily series; active models are those
    /// with at least one invocation in the window.
    pub fn from_parts(
        window_start: NaiveDate,
        window_end: NaiveDate,
        daily: &[MergedDailyRecord],
        models: &[ModelUsageRecord],
    ) -> Self {
        let mut summary = Self {
            window_start,
            window_end,
            total_invocations: 0,
            total_input_tokens: 0,
            total_output_tokens: 0,
            active_model_count: models.iter().filter(|m| m.invocations > 0).count(),
        };

        for day in daily {
            summary.total_invocations = summary.total_invocations.saturating_add(day.invocations);
            summary.total_input_tokens =
                summary.total_input_tokens.saturating_add(day.input_tokens);
            summary.total_output_tokens =
                summary.total_output_tokens.saturating_add(day.output_tokens);
        }

        summary
    }
}

/// Everything one report invocation computes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    pub summary: ReportSummary,
    pub models: Vec<ModelUsageRecord>,
    pub users: Vec<UserUsageRecord>,
    pub daily: Vec<MergedDailyRecord>,
    pub costs: Vec<CostDateRecord>,
    pub cost_summary: CostSummary,
}
