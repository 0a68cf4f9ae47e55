//! Source record types: what the metrics, audit and cost collaborators hand over

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Actor label used when no identity field resolves
pub const UNKNOWN_ACTOR: &str = "unknown";

/// Per-model metric reported by the metrics source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    Invocations,
    InputTokenCount,
    OutputTokenCount,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [
        MetricKind::Invocations,
        MetricKind::InputTokenCount,
        MetricKind::OutputTokenCount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Invocations => "Invocations",
            MetricKind::InputTokenCount => "InputTokenCount",
            MetricKind::OutputTokenCount => "OutputTokenCount",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One day's value of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyValue {
    pub date: NaiveDate,
    pub value: u64,
}

impl DailyValue {
    pub fn new(date: NaiveDate, value: u64) -> Self {
        Self { date, value }
    }
}

/// Daily samples of one metric kind for one model.
/// A missing day means zero activity, not missing data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub entity_id: String,
    pub kind: MetricKind,
    #[serde(default)]
    pub samples: Vec<DailyValue>,
}

/// Identity block of an audit event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventIdentity {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub session_issuer: Option<String>,
    #[serde(default)]
    pub arn: Option<String>,
}

/// A single model invocation recorded by the audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub identity: EventIdentity,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub client_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Resolve the calling identity.
    ///
    /// First non-empty of: user name, session issuer name, ARN suffix.
    /// Falls back to `"unknown"` so the event is still counted.
    pub fn actor(&self) -> String {
        non_empty(self.identity.user_name.as_deref())
            .or_else(|| non_empty(self.identity.session_issuer.as_deref()))
            .or_else(|| self.identity.arn.as_deref().and_then(arn_suffix))
            .unwrap_or(UNKNOWN_ACTOR)
            .to_string()
    }

    /// UTC calendar day of the event
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Last path segment of an ARN (`.../role/session` → `session`), or the
/// resource after the last `:` when the ARN has no path.
fn arn_suffix(arn: &str) -> Option<&str> {
    let arn = arn.trim();
    let tail = match arn.rfind('/') {
        Some(idx) => &arn[idx + 1..],
        None => &arn[arn.rfind(':').map(|idx| idx + 1).unwrap_or(0)..],
    };
    non_empty(Some(tail))
}

/// One cost-and-usage line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLineItem {
    pub date: NaiveDate,
    pub usage_type: String,
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_event(user: Option<&str>, issuer: Option<&str>, arn: Option<&str>) -> AuditEvent {
        AuditEvent {
            event_id: None,
            identity: EventIdentity {
                user_name: user.map(String::from),
                session_issuer: issuer.map(String::from),
                arn: arn.map(String::from),
            },
            model_id: None,
            client_agent: None,
            timestamp: Utc.with_ymd_and_hms(2026, 2, 5, 23, 59, 0).unwrap(),
        }
    }

    // ========== Actor resolution ==========

    #[test]
    fn test_actor_prefers_user_name() {
        let event = make_event(Some("alice"), Some("DevRole"), Some("arn:aws:iam::1:user/bob"));
        assert_eq!(event.actor(), "alice");
    }

    #[test]
    fn test_actor_falls_back_to_session_issuer() {
        let event = make_event(Some("  "), Some("DevRole"), None);
        assert_eq!(event.actor(), "DevRole");
    }

    #[test]
    fn test_actor_falls_back_to_arn_path_suffix() {
        let event = make_event(
            None,
            None,
            Some("arn:aws:sts::123456789012:assumed-role/DevRole/ci-runner"),
        );
        assert_eq!(event.actor(), "ci-runner");
    }

    #[test]
    fn test_actor_arn_without_path() {
        let event = make_event(None, None, Some("arn:aws:iam::123456789012:root"));
        assert_eq!(event.actor(), "root");
    }

    #[test]
    fn test_actor_unknown_when_nothing_resolves() {
        assert_eq!(make_event(None, None, None).actor(), "unknown");
        assert_eq!(make_event(None, Some(""), Some("arn:aws:iam::1:user/")).actor(), "unknown");
    }

    #[test]
    fn test_event_date_is_utc() {
        let event = make_event(None, None, None);
        assert_eq!(event.date(), NaiveDate::from_ymd_opt(2026, 2, 5).unwrap());
    }

    // ========== Serde ==========

    #[test]
    fn test_metric_kind_display() {
        assert_eq!(MetricKind::Invocations.to_string(), "Invocations");
        assert_eq!(MetricKind::ALL.len(), 3);
    }

    #[test]
    fn test_cost_line_item_accepts_string_amount() {
        let item: CostLineItem = serde_json::from_str(
            r#"{"date":"2026-02-05","usage_type":"USE1-Claude3Sonnet-input-tokens","amount":"1.2345"}"#,
        )
        .unwrap();
        assert_eq!(item.amount, rust_decimal::dec!(1.2345));
        assert_eq!(item.date.to_string(), "2026-02-05");
    }

    #[test]
    fn test_audit_event_optional_fields_default() {
        let event: AuditEvent =
            serde_json::from_str(r#"{"timestamp":"2026-02-05T10:00:00Z"}"#).unwrap();
        assert!(event.model_id.is_none());
        assert_eq!(event.actor(), "unknown");
    }
}
