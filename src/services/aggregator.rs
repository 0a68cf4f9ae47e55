//! Aggregator service: group by key, rank, total
//!
//! One generic routine backs every grouped view of a report:
//! per-model metric totals, per-caller invocation counts and
//! per-date cost breakdowns.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::services::calendar::ReportWindow;
use crate::services::normalizer::{NameCache, NameMapping, UNKNOWN_LABEL};
use crate::types::{
    AuditEvent, CostCategory, CostDateRecord, CostLineItem, CostSummary, LabelCount, MetricKind,
    MetricSeries, ModelUsageRecord, ReportError, Result, UserUsageRecord,
};

/// A value that can be summed without losing precision.
/// Integer counters saturate; money stays exact.
pub trait Tally: Copy + Default {
    fn tally(self, other: Self) -> Self;
}

impl Tally for u64 {
    fn tally(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

impl Tally for Decimal {
    fn tally(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

/// Per-model sums of all three metric kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricTotals {
    pub invocations: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl MetricTotals {
    fn of(kind: MetricKind, value: u64) -> Self {
        let mut totals = Self::default();
        match kind {
            MetricKind::Invocations => totals.invocations = value,
            MetricKind::InputTokenCount => totals.input_tokens = value,
            MetricKind::OutputTokenCount => totals.output_tokens = value,
        }
        totals
    }
}

impl Tally for MetricTotals {
    fn tally(self, other: Self) -> Self {
        Self {
            invocations: self.invocations.tally(other.invocations),
            input_tokens: self.input_tokens.tally(other.input_tokens),
            output_tokens: self.output_tokens.tally(other.output_tokens),
        }
    }
}

/// Records sharing one key
#[derive(Debug, Clone)]
pub struct Group<'a, R, K, V> {
    pub key: K,
    pub total: V,
    pub records: Vec<&'a R>,
}

/// Group `records` by `key_fn`, summing `value_fn` per group.
///
/// Groups come back in first-encountered key order. Records whose key is
/// `None` have nothing to group on and are skipped.
pub fn group_by<'a, R, K, V, KF, VF>(
    records: &'a [R],
    mut key_fn: KF,
    value_fn: VF,
) -> Vec<Group<'a, R, K, V>>
where
    K: Eq + Hash + Clone,
    V: Tally,
    KF: FnMut(&R) -> Option<K>,
    VF: Fn(&R) -> V,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Group<'a, R, K, V>> = Vec::new();
    let mut skipped = 0usize;

    for record in records {
        let Some(key) = key_fn(record) else {
            skipped += 1;
            continue;
        };

        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    total: V::default(),
                    records: Vec::new(),
                });
                groups.len() - 1
            }
        };

        let group = &mut groups[slot];
        group.total = group.total.tally(value_fn(record));
        group.records.push(record);
    }

    if skipped > 0 {
        tracing::debug!(skipped, "records without a usable key skipped");
    }

    groups
}

/// Sort descending by `key`. The sort is stable, so equal values keep
/// their input order.
pub fn rank_by<T, O, F>(items: &mut [T], key: F)
where
    O: Ord,
    F: Fn(&T) -> O,
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

/// Sum of all group totals
pub fn grand_total<R, K, V: Tally>(groups: &[Group<'_, R, K, V>]) -> V {
    groups
        .iter()
        .fold(V::default(), |acc, group| acc.tally(group.total))
}

/// Grouped and ungrouped sums must agree
pub fn verify_total<V: PartialEq + Debug>(what: &str, grouped: V, ungrouped: V) -> Result<()> {
    if grouped == ungrouped {
        Ok(())
    } else {
        Err(ReportError::Invariant(format!(
            "{} grouped total {:?} != raw total {:?}",
            what, grouped, ungrouped
        )))
    }
}

/// Keep the `n` first items, returning how many were cut
pub fn top_n<T>(mut items: Vec<T>, n: usize) -> (Vec<T>, usize) {
    let omitted = items.len().saturating_sub(n);
    items.truncate(n);
    (items, omitted)
}

/// Count-ranked labels of `records`
fn ranked_labels<R, F>(records: &[&R], label_fn: F) -> Vec<LabelCount>
where
    F: FnMut(&&R) -> Option<String>,
{
    let mut groups = group_by(records, label_fn, |_| 1u64);
    rank_by(&mut groups, |g| g.total);
    groups
        .into_iter()
        .map(|g| LabelCount {
            label: g.key,
            count: g.total,
        })
        .collect()
}

fn head_label(breakdown: &[LabelCount]) -> String {
    breakdown
        .first()
        .map(|lc| lc.label.clone())
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

/// Aggregator instantiations used by a report
pub struct Aggregator;

impl Aggregator {
    /// Per-model metric totals inside the window, ranked by invocations.
    ///
    /// A model counts as observed when any of its series has a sample in
    /// the window.
    pub fn model_usage(
        series: &[MetricSeries],
        window: &ReportWindow,
        names: &mut NameMapping,
    ) -> Result<Vec<ModelUsageRecord>> {
        let in_window = |s: &MetricSeries| -> MetricTotals {
            s.samples
                .iter()
                .filter(|sample| window.contains(sample.date))
                .fold(MetricTotals::default(), |acc, sample| {
                    acc.tally(MetricTotals::of(s.kind, sample.value))
                })
        };

        let mut groups = group_by(
            series,
            |s| {
                let observed = s.samples.iter().any(|sample| window.contains(sample.date));
                (!s.entity_id.is_empty() && observed).then(|| s.entity_id.clone())
            },
            in_window,
        );

        let raw_total = series
            .iter()
            .filter(|s| !s.entity_id.is_empty())
            .fold(MetricTotals::default(), |acc, s| acc.tally(in_window(s)));
        verify_total("model metrics", grand_total(&groups), raw_total)?;

        rank_by(&mut groups, |g| g.total.invocations);

        Ok(groups
            .into_iter()
            .map(|g| ModelUsageRecord {
                short_name: names.label(&g.key).to_string(),
                entity_id: g.key,
                invocations: g.total.invocations,
                input_tokens: g.total.input_tokens,
                output_tokens: g.total.output_tokens,
            })
            .collect())
    }

    /// Per-caller invocation counts with model and client breakdowns
    pub fn user_usage(
        events: &[AuditEvent],
        cache: &mut NameCache,
    ) -> Result<Vec<UserUsageRecord>> {
        let mut groups = group_by(events, |e| Some(e.actor()), |_| 1u64);
        verify_total("user invocations", grand_total(&groups), events.len() as u64)?;
        rank_by(&mut groups, |g| g.total);

        let users = groups
            .into_iter()
            .map(|g| {
                let model_breakdown = ranked_labels(&g.records, |e| {
                    let raw = e.model_id.as_deref().unwrap_or_default();
                    Some(cache.models.label(raw).to_string())
                });
                let client_breakdown = ranked_labels(&g.records, |e| {
                    let raw = e.client_agent.as_deref().unwrap_or_default();
                    Some(cache.clients.label(raw).to_string())
                });

                UserUsageRecord {
                    top_model: head_label(&model_breakdown),
                    top_client: head_label(&client_breakdown),
                    actor: g.key,
                    invocation_count: g.total,
                    model_breakdown,
                    client_breakdown,
                }
            })
            .collect();

        Ok(users)
    }

    /// Cost per day of the window with its top `n` billing codes.
    /// Days without line items are zero.
    pub fn daily_costs(
        items: &[CostLineItem],
        window: &ReportWindow,
        n: usize,
        names: &mut NameMapping,
    ) -> Result<Vec<CostDateRecord>> {
        let groups = group_by(
            items,
            |item| window.contains(item.date).then_some(item.date),
            |item| item.amount,
        );

        let outside = items.len() - groups.iter().map(|g| g.records.len()).sum::<usize>();
        if outside > 0 {
            tracing::debug!(outside, "cost line items outside the window ignored");
        }

        let raw_total = items
            .iter()
            .filter(|item| window.contains(item.date))
            .fold(Decimal::ZERO, |acc, item| acc.tally(item.amount));
        verify_total("daily cost", grand_total(&groups), raw_total)?;

        let mut by_date: HashMap<NaiveDate, Group<'_, CostLineItem, NaiveDate, Decimal>> =
            groups.into_iter().map(|g| (g.key, g)).collect();

        let records = window
            .days()
            .iter()
            .map(|&date| match by_date.remove(&date) {
                Some(group) => {
                    let categories = cost_categories(&group.records, names);
                    let (breakdown, omitted_categories) = top_n(categories, n);
                    CostDateRecord {
                        date,
                        total: group.total,
                        breakdown,
                        omitted_categories,
                    }
                }
                None => CostDateRecord {
                    date,
                    total: Decimal::ZERO,
                    breakdown: Vec::new(),
                    omitted_categories: 0,
                },
            })
            .collect();

        Ok(records)
    }

    /// Window-wide cost by billing code, highest first
    pub fn cost_summary(
        items: &[CostLineItem],
        window: &ReportWindow,
        names: &mut NameMapping,
    ) -> Result<CostSummary> {
        let in_window: Vec<&CostLineItem> = items
            .iter()
            .filter(|item| window.contains(item.date))
            .collect();

        let categories = cost_categories(&in_window, names);
        let total = categories
            .iter()
            .fold(Decimal::ZERO, |acc, c| acc.tally(c.amount));
        let raw_total = in_window
            .iter()
            .fold(Decimal::ZERO, |acc, item| acc.tally(item.amount));
        verify_total("window cost", total, raw_total)?;

        Ok(CostSummary { total, categories })
    }
}

/// Group line items by raw billing code, ranked by amount.
/// Codes sharing a display label stay separate categories.
fn cost_categories(items: &[&CostLineItem], names: &mut NameMapping) -> Vec<CostCategory> {
    let mut groups = group_by(items, |item| Some(item.usage_type.clone()), |item| item.amount);
    rank_by(&mut groups, |g| g.total);
    groups
        .into_iter()
        .map(|g| CostCategory {
            label: names.label(&g.key).to_string(),
            usage_type: g.key,
            amount: g.total,
        })
        .collect()
}
