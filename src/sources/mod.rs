//! Source traits and fetch helpers for the metrics, audit and cost services
//!
//! Everything here runs before the core: it drains pagination, removes
//! duplicate audit events and tolerates per-model fetch failures, then
//! hands flat record batches to the report builder.

mod snapshot;

pub use snapshot::{Snapshot, SnapshotSource};

use crate::services::calendar::ReportWindow;
use crate::services::report::ReportInputs;
use crate::types::{AuditEvent, CostLineItem, DailyValue, MetricKind, MetricSeries, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Audit event names that record a model invocation
pub const DEFAULT_AUDIT_EVENTS: &[&str] = &[
    "InvokeModel",
    "InvokeModelWithResponseStream",
    "Converse",
    "ConverseStream",
];

/// Per-model daily metric sums
pub trait MetricsSource: Send + Sync {
    /// Models with any metric data in the window
    fn models(&self, window: &ReportWindow) -> Result<Vec<String>>;

    /// Daily sums of `kind` for one model. Days without activity may be absent.
    fn daily_sums(
        &self,
        model_id: &str,
        kind: MetricKind,
        window: &ReportWindow,
    ) -> Result<Vec<DailyValue>>;
}

/// One page of an audit lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditPage {
    #[serde(default)]
    pub events: Vec<AuditEvent>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// Paginated audit event lookup, one query per event name
pub trait AuditSource {
    fn page(
        &self,
        event_name: &str,
        window: &ReportWindow,
        next_token: Option<&str>,
    ) -> Result<AuditPage>;
}

/// Cost-and-usage line items grouped by day and usage type
pub trait CostSource {
    fn line_items(&self, window: &ReportWindow) -> Result<Vec<CostLineItem>>;
}

/// Lazy walk over the pages of one audit query.
///
/// Ends after the first page without a continuation token, or after the
/// first failed fetch. It cannot be restarted.
pub struct Pages<'a, S: AuditSource + ?Sized> {
    source: &'a S,
    event_name: &'a str,
    window: &'a ReportWindow,
    next_token: Option<String>,
    done: bool,
}

impl<'a, S: AuditSource + ?Sized> Pages<'a, S> {
    pub fn new(source: &'a S, event_name: &'a str, window: &'a ReportWindow) -> Self {
        Self {
            source,
            event_name,
            window,
            next_token: None,
            done: false,
        }
    }
}

impl<S: AuditSource + ?Sized> Iterator for Pages<'_, S> {
    type Item = Result<AuditPage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self
            .source
            .page(self.event_name, self.window, self.next_token.as_deref())
        {
            Ok(page) => {
                self.next_token = page.next_token.clone().filter(|t| !t.is_empty());
                self.done = self.next_token.is_none();
                Some(Ok(page))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Drain every event-name query and return the distinct events in the
/// window, oldest first.
///
/// Events seen under several queries are kept once (by event id); events
/// without an id cannot be matched and are all kept.
pub fn collect_audit_events<S, N>(
    source: &S,
    event_names: &[N],
    window: &ReportWindow,
) -> Result<Vec<AuditEvent>>
where
    S: AuditSource + ?Sized,
    N: AsRef<str>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut events: Vec<AuditEvent> = Vec::new();
    let mut duplicates = 0usize;

    for name in event_names {
        for page in Pages::new(source, name.as_ref(), window) {
            for event in page?.events {
                if let Some(id) = &event.event_id {
                    if !seen.insert(id.clone()) {
                        duplicates += 1;
                        continue;
                    }
                }
                if window.contains(event.date()) {
                    events.push(event);
                }
            }
        }
    }

    if duplicates > 0 {
        tracing::debug!(duplicates, "duplicate audit events dropped");
    }

    events.sort_by_key(|e| e.timestamp);
    Ok(events)
}

/// Fetch every (model, kind) series in parallel.
///
/// A failed fetch is logged and treated as no samples; if a whole metric
/// kind ends up empty the report builder reports it as missing data.
pub fn collect_metric_series<S>(source: &S, window: &ReportWindow) -> Result<Vec<MetricSeries>>
where
    S: MetricsSource + ?Sized,
{
    let models = source.models(window)?;
    let requests: Vec<(&str, MetricKind)> = models
        .iter()
        .flat_map(|m| MetricKind::ALL.iter().map(move |&kind| (m.as_str(), kind)))
        .collect();

    let series: Vec<MetricSeries> = requests
        .par_iter()
        .filter_map(|&(model_id, kind)| match source.daily_sums(model_id, kind, window) {
            Ok(samples) => Some(MetricSeries {
                entity_id: model_id.to_string(),
                kind,
                samples,
            }),
            Err(e) => {
                tracing::warn!(model = model_id, metric = %kind, error = %e, "metric fetch failed");
                None
            }
        })
        .collect();

    Ok(series)
}

/// Fetch all three sources for one report
pub fn fetch_inputs<S>(
    source: &S,
    audit_events: &[String],
    window: &ReportWindow,
) -> Result<ReportInputs>
where
    S: MetricsSource + AuditSource + CostSource,
{
    Ok(ReportInputs {
        metrics: collect_metric_series(source, window)?,
        events: collect_audit_events(source, audit_events, window)?,
        costs: source.line_items(window)?,
    })
}
