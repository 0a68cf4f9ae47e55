//! Report construction
//!
//! A `ReportBuilder` lives for one report invocation. It owns the window
//! and the label cache, so nothing computed for one report is visible to
//! the next.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::services::aggregator::{verify_total, Aggregator};
use crate::services::calendar::ReportWindow;
use crate::services::normalizer::NameCache;
use crate::services::reconciler::reconcile_all;
use crate::types::{
    AuditEvent, CostDateRecord, CostLineItem, CostSummary, MergedDailyRecord, MetricSeries,
    ModelUsageRecord, ReportError, ReportSummary, Result, UsageReport, UserUsageRecord,
};

/// Default lookback in days
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Longest lookback accepted, ten years of days
pub const MAX_WINDOW_DAYS: i64 = 3660;

/// Default number of billing categories kept per day
pub const DEFAULT_TOP_N: usize = 3;

/// Report settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub window_days: i64,
    pub top_n: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl ReportOptions {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_WINDOW_DAYS).contains(&self.window_days) {
            return Err(ReportError::Config(format!(
                "window must be between 1 and {} days, got {}",
                MAX_WINDOW_DAYS, self.window_days
            )));
        }
        if self.top_n < 1 {
            return Err(ReportError::Config(
                "cost breakdown size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Fully fetched source batches for one report
#[derive(Debug, Clone, Default)]
pub struct ReportInputs {
    pub metrics: Vec<MetricSeries>,
    pub events: Vec<AuditEvent>,
    pub costs: Vec<CostLineItem>,
}

#[derive(Debug)]
pub struct ReportBuilder {
    window: ReportWindow,
    options: ReportOptions,
    names: NameCache,
}

impl ReportBuilder {
    /// Builder for the `options.window_days` days before `end_exclusive`
    pub fn new(options: ReportOptions, end_exclusive: NaiveDate) -> Result<Self> {
        options.validate()?;
        let window = ReportWindow::ending_before(options.window_days, end_exclusive)?;
        Ok(Self {
            window,
            options,
            names: NameCache::new(),
        })
    }

    pub fn window(&self) -> &ReportWindow {
        &self.window
    }

    pub fn names(&self) -> &NameCache {
        &self.names
    }

    /// Date-complete totals of all metric kinds
    pub fn daily(&self, metrics: &[MetricSeries]) -> Result<Vec<MergedDailyRecord>> {
        reconcile_all(metrics, self.window.days())
    }

    pub fn models(&mut self, metrics: &[MetricSeries]) -> Result<Vec<ModelUsageRecord>> {
        Aggregator::model_usage(metrics, &self.window, &mut self.names.models)
    }

    /// Per-caller usage from events inside the window
    pub fn users(&mut self, events: &[AuditEvent]) -> Result<Vec<UserUsageRecord>> {
        let in_window: Vec<AuditEvent> = events
            .iter()
            .filter(|e| self.window.contains(e.date()))
            .cloned()
            .collect();
        if in_window.len() < events.len() {
            tracing::debug!(
                ignored = events.len() - in_window.len(),
                "audit events outside the window ignored"
            );
        }
        Aggregator::user_usage(&in_window, &mut self.names)
    }

    pub fn costs(&mut self, items: &[CostLineItem]) -> Result<(Vec<CostDateRecord>, CostSummary)> {
        let daily = Aggregator::daily_costs(
            items,
            &self.window,
            self.options.top_n,
            &mut self.names.usage_types,
        )?;
        let summary = Aggregator::cost_summary(items, &self.window, &mut self.names.usage_types)?;

        let daily_total = daily
            .iter()
            .fold(Decimal::ZERO, |acc, day| acc.saturating_add(day.total));
        verify_total("cost summary", daily_total, summary.total)?;

        Ok((daily, summary))
    }

    /// Summary plus the model and daily views it is computed from
    pub fn summary(
        &mut self,
        metrics: &[MetricSeries],
    ) -> Result<(ReportSummary, Vec<ModelUsageRecord>, Vec<MergedDailyRecord>)> {
        let daily = self.daily(metrics)?;
        let models = self.models(metrics)?;
        let summary =
            ReportSummary::from_parts(self.window.start(), self.window.end(), &daily, &models);

        let model_invocations = models
            .iter()
            .fold(0u64, |acc, m| acc.saturating_add(m.invocations));
        verify_total("invocations", model_invocations, summary.total_invocations)?;

        Ok((summary, models, daily))
    }

    /// Compute every view. Consumes the builder, and with it the label cache.
    pub fn build(mut self, inputs: &ReportInputs) -> Result<UsageReport> {
        let (summary, models, daily) = self.summary(&inputs.metrics)?;
        let users = self.users(&inputs.events)?;
        let (costs, cost_summary) = self.costs(&inputs.costs)?;

        tracing::info!(
            window_start = %summary.window_start,
            window_end = %summary.window_end,
            models = models.len(),
            users = users.len(),
            "report built"
        );

        Ok(UsageReport {
            summary,
            models,
            users,
            daily,
            costs,
            cost_summary,
        })
    }
}
