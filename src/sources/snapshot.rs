//! Pre-fetched source responses stored as one JSON file

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{AuditPage, AuditSource, CostSource, MetricsSource};
use crate::services::calendar::ReportWindow;
use crate::types::{CostLineItem, DailyValue, MetricKind, MetricSeries, ReportError, Result};

/// Snapshot file layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub metrics: Vec<MetricSeries>,
    /// Audit pages per event name, in fetch order
    #[serde(default)]
    pub audit: BTreeMap<String, Vec<AuditPage>>,
    #[serde(default)]
    pub costs: Vec<CostLineItem>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| ReportError::Parse(format!("invalid snapshot: {}", e)))
    }
}

/// Serves a [`Snapshot`] through the source traits.
///
/// Audit continuation tokens are page positions, so recorded tokens in the
/// file do not need to be consistent.
#[derive(Debug)]
pub struct SnapshotSource {
    snapshot: Snapshot,
}

impl SnapshotSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(Snapshot::load(path)?))
    }
}

impl MetricsSource for SnapshotSource {
    fn models(&self, _window: &ReportWindow) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(self
            .snapshot
            .metrics
            .iter()
            .filter(|s| seen.insert(s.entity_id.as_str()))
            .map(|s| s.entity_id.clone())
            .collect())
    }

    fn daily_sums(
        &self,
        model_id: &str,
        kind: MetricKind,
        window: &ReportWindow,
    ) -> Result<Vec<DailyValue>> {
        Ok(self
            .snapshot
            .metrics
            .iter()
            .filter(|s| s.entity_id == model_id && s.kind == kind)
            .flat_map(|s| s.samples.iter().copied())
            .filter(|sample| window.contains(sample.date))
            .collect())
    }
}

impl AuditSource for SnapshotSource {
    fn page(
        &self,
        event_name: &str,
        _window: &ReportWindow,
        next_token: Option<&str>,
    ) -> Result<AuditPage> {
        let Some(pages) = self.snapshot.audit.get(event_name) else {
            return Ok(AuditPage::default());
        };

        let index = match next_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ReportError::Source(format!("bad page token '{}'", token)))?,
        };

        let events = pages
            .get(index)
            .map(|page| page.events.clone())
            .ok_or_else(|| ReportError::Source(format!("{} has no page {}", event_name, index)))?;
        let next_token = (index + 1 < pages.len()).then(|| (index + 1).to_string());

        Ok(AuditPage { events, next_token })
    }
}

impl CostSource for SnapshotSource {
    fn line_items(&self, window: &ReportWindow) -> Result<Vec<CostLineItem>> {
        Ok(self
            .snapshot
            .costs
            .iter()
            .filter(|item| window.contains(item.date))
            .cloned()
            .collect())
    }
}
