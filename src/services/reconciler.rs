//! Time-series reconciliation
//!
//! Metric sources only report days with activity, per model. Reports need
//! one value per calendar day, summed across models, for each metric kind.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::services::aggregator::Tally;
use crate::types::{DailyValue, MergedDailyRecord, MetricKind, MetricSeries, ReportError, Result};

/// Cross-entity daily totals of `kind`, one value per date of `range`.
///
/// Dates without samples are zero. Samples outside `range` and series
/// without an entity id are ignored.
/// Fails with [`ReportError::NoData`] if no entity reported `kind` at all,
/// so a missing source is not mistaken for a quiet window.
pub fn reconcile_daily(
    series: &[MetricSeries],
    kind: MetricKind,
    range: &[NaiveDate],
) -> Result<Vec<DailyValue>> {
    let contributing: Vec<&MetricSeries> = series
        .iter()
        .filter(|s| s.kind == kind && !s.entity_id.is_empty() && !s.samples.is_empty())
        .collect();

    if contributing.is_empty() {
        return Err(ReportError::NoData { kind });
    }

    let mut by_date: HashMap<NaiveDate, u64> = HashMap::new();
    for sample in contributing.iter().flat_map(|s| s.samples.iter()) {
        let total = by_date.entry(sample.date).or_default();
        *total = total.tally(sample.value);
    }

    tracing::debug!(
        metric = %kind,
        entities = contributing.len(),
        active_days = by_date.len(),
        "reconciled daily series"
    );

    Ok(range
        .iter()
        .map(|&date| DailyValue::new(date, by_date.get(&date).copied().unwrap_or(0)))
        .collect())
}

/// Zip the three reconciled series into per-date records.
///
/// All series must follow `range` exactly; any divergence means the
/// calendar and reconciler disagree and is reported, never patched.
pub fn merge_metric_kinds(
    invocations: &[DailyValue],
    input_tokens: &[DailyValue],
    output_tokens: &[DailyValue],
    range: &[NaiveDate],
) -> Result<Vec<MergedDailyRecord>> {
    for (kind, series) in [
        (MetricKind::Invocations, invocations),
        (MetricKind::InputTokenCount, input_tokens),
        (MetricKind::OutputTokenCount, output_tokens),
    ] {
        if series.len() != range.len() {
            return Err(ReportError::Invariant(format!(
                "{} series has {} days, window has {}",
                kind,
                series.len(),
                range.len()
            )));
        }
        if let Some((value, date)) = series
            .iter()
            .zip(range)
            .find(|(value, date)| value.date != **date)
        {
            return Err(ReportError::Invariant(format!(
                "{} series has {} where window has {}",
                kind, value.date, date
            )));
        }
    }

    Ok(range
        .iter()
        .enumerate()
        .map(|(i, &date)| MergedDailyRecord {
            date,
            invocations: invocations[i].value,
            input_tokens: input_tokens[i].value,
            output_tokens: output_tokens[i].value,
        })
        .collect())
}

/// Reconcile every metric kind and merge them over `range`
pub fn reconcile_all(
    series: &[MetricSeries],
    range: &[NaiveDate],
) -> Result<Vec<MergedDailyRecord>> {
    let invocations = reconcile_daily(series, MetricKind::Invocations, range)?;
    let input_tokens = reconcile_daily(series, MetricKind::InputTokenCount, range)?;
    let output_tokens = reconcile_daily(series, MetricKind::OutputTokenCount, range)?;
    merge_metric_kinds(&invocations, &input_tokens, &output_tokens, range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::calendar::generate_range;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    fn make_series(entity: &str, kind: MetricKind, samples: &[(u32, u64)]) -> MetricSeries {
        MetricSeries {
            entity_id: entity.to_string(),
            kind,
            samples: samples
                .iter()
                .map(|&(day, value)| DailyValue::new(date(day), value))
                .collect(),
        }
    }

    fn values(series: &[DailyValue]) -> Vec<u64> {
        series.iter().map(|v| v.value).collect()
    }

    // ========== reconcile_daily() ==========

    #[test]
    fn test_reconcile_sums_across_entities() {
        let series = vec![
            make_series("m1", MetricKind::Invocations, &[(5, 10), (6, 3)]),
            make_series("m2", MetricKind::Invocations, &[(5, 5)]),
        ];
        let range = vec![date(5), date(6)];

        let result = reconcile_daily(&series, MetricKind::Invocations, &range).unwrap();

        assert_eq!(
            result,
            vec![DailyValue::new(date(5), 15), DailyValue::new(date(6), 3)]
        );
    }

    #[test]
    fn test_reconcile_zero_fills_missing_days() {
        let series = vec![make_series("m1", MetricKind::Invocations, &[(3, 7)])];
        let range = generate_range(5, date(6)).unwrap();

        let result = reconcile_daily(&series, MetricKind::Invocations, &range).unwrap();

        assert_eq!(result.len(), 5);
        assert_eq!(values(&result), vec![0, 0, 7, 0, 0]);
        let dates: Vec<NaiveDate> = result.iter().map(|v| v.date).collect();
        assert_eq!(dates, range);
    }

    #[test]
    fn test_reconcile_follows_range_order_not_arrival() {
        let series = vec![make_series(
            "m1",
            MetricKind::InputTokenCount,
            &[(7, 3), (5, 1), (6, 2)],
        )];
        let range = vec![date(5), date(6), date(7)];

        let result = reconcile_daily(&series, MetricKind::InputTokenCount, &range).unwrap();
        assert_eq!(values(&result), vec![1, 2, 3]);
    }

    #[test]
    fn test_reconcile_ignores_other_kinds_and_out_of_range() {
        let series = vec![
            make_series("m1", MetricKind::Invocations, &[(5, 1), (9, 100)]),
            make_series("m1", MetricKind::OutputTokenCount, &[(5, 999)]),
        ];
        let range = vec![date(5), date(6)];

        let result = reconcile_daily(&series, MetricKind::Invocations, &range).unwrap();
        assert_eq!(values(&result), vec![1, 0]);
    }

    #[test]
    fn test_reconcile_conservation() {
        let series = vec![
            make_series("a", MetricKind::Invocations, &[(1, 11), (2, 22), (3, 33)]),
            make_series("b", MetricKind::Invocations, &[(2, 5), (4, 9)]),
            make_series("c", MetricKind::Invocations, &[(4, 1)]),
        ];
        let range = generate_range(4, date(5)).unwrap();

        let result = reconcile_daily(&series, MetricKind::Invocations, &range).unwrap();
        let reconciled: u64 = result.iter().map(|v| v.value).sum();
        assert_eq!(reconciled, 11 + 22 + 33 + 5 + 9 + 1);
    }

    #[test]
    fn test_reconcile_no_data_for_kind() {
        let series = vec![
            make_series("m1", MetricKind::Invocations, &[(5, 1)]),
            make_series("m2", MetricKind::InputTokenCount, &[]),
        ];
        let range = vec![date(5)];

        let err = reconcile_daily(&series, MetricKind::InputTokenCount, &range).unwrap_err();
        assert!(matches!(
            err,
            ReportError::NoData {
                kind: MetricKind::InputTokenCount
            }
        ));
    }

    #[test]
    fn test_reconcile_explicit_zero_is_data() {
        let series = vec![make_series("m1", MetricKind::OutputTokenCount, &[(5, 0)])];
        let range = vec![date(5), date(6)];

        let result = reconcile_daily(&series, MetricKind::OutputTokenCount, &range).unwrap();
        assert_eq!(values(&result), vec![0, 0]);
    }

    // ========== merge_metric_kinds() ==========

    #[test]
    fn test_merge_zips_positionally() {
        let range = vec![date(5), date(6)];
        let inv = vec![DailyValue::new(date(5), 2), DailyValue::new(date(6), 0)];
        let input = vec![DailyValue::new(date(5), 200), DailyValue::new(date(6), 0)];
        let output = vec![DailyValue::new(date(5), 20), DailyValue::new(date(6), 0)];

        let merged = merge_metric_kinds(&inv, &input, &output, &range).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged[0],
            MergedDailyRecord {
                date: date(5),
                invocations: 2,
                input_tokens: 200,
                output_tokens: 20,
            }
        );
        assert_eq!(merged[1].invocations, 0);
    }

    #[test]
    fn test_merge_length_mismatch_is_invariant_error() {
        let range = vec![date(5), date(6)];
        let full = vec![DailyValue::new(date(5), 1), DailyValue::new(date(6), 1)];
        let short = vec![DailyValue::new(date(5), 1)];

        let err = merge_metric_kinds(&full, &short, &full, &range).unwrap_err();
        assert!(matches!(err, ReportError::Invariant(_)));
        assert!(err.to_string().contains("InputTokenCount"));
    }

    #[test]
    fn test_merge_date_mismatch_is_invariant_error() {
        let range = vec![date(5), date(6)];
        let full = vec![DailyValue::new(date(5), 1), DailyValue::new(date(6), 1)];
        let shifted = vec![DailyValue::new(date(6), 1), DailyValue::new(date(7), 1)];

        let err = merge_metric_kinds(&full, &full, &shifted, &range).unwrap_err();
        assert!(matches!(err, ReportError::Invariant(_)));
    }

    // ========== reconcile_all() ==========

    #[test]
    fn test_reconcile_all_covers_window() {
        let series = vec![
            make_series("m1", MetricKind::Invocations, &[(5, 1)]),
            make_series("m1", MetricKind::InputTokenCount, &[(5, 10)]),
            make_series("m1", MetricKind::OutputTokenCount, &[(6, 4)]),
        ];
        let range = generate_range(7, date(8)).unwrap();

        let merged = reconcile_all(&series, &range).unwrap();

        assert_eq!(merged.len(), 7);
        let dates: Vec<NaiveDate> = merged.iter().map(|r| r.date).collect();
        assert_eq!(dates, range);
        assert_eq!(merged.iter().map(|r| r.output_tokens).sum::<u64>(), 4);
    }

    #[test]
    fn test_reconcile_all_is_idempotent() {
        let series = vec![
            make_series("m1", MetricKind::Invocations, &[(5, 1), (6, 2)]),
            make_series("m2", MetricKind::Invocations, &[(6, 3)]),
            make_series("m1", MetricKind::InputTokenCount, &[(5, 10)]),
            make_series("m1", MetricKind::OutputTokenCount, &[(6, 4)]),
        ];
        let range = generate_range(3, date(7)).unwrap();

        let first = reconcile_all(&series, &range).unwrap();
        let second = reconcile_all(&series, &range).unwrap();
        assert_eq!(first, second);
    }
}
