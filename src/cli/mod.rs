pub mod render;

use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::services::report::{DEFAULT_TOP_N, DEFAULT_WINDOW_DAYS};
use crate::services::{ReportBuilder, ReportOptions};
use crate::sources::{
    collect_audit_events, collect_metric_series, fetch_inputs, CostSource, SnapshotSource,
    DEFAULT_AUDIT_EVENTS,
};
use crate::types::{CostDateRecord, CostSummary};

/// Usage and cost reports for hosted model inference
#[derive(Parser)]
#[command(name = "bedusage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Window totals across all models
    Summary(ReportArgs),

    /// Per-model invocations and tokens
    Models(ReportArgs),

    /// Per-caller invocations with top model and client
    Users(ReportArgs),

    /// Date-complete daily totals
    Daily(ReportArgs),

    /// Daily cost with top billing categories
    Costs(ReportArgs),

    /// Every section as one document
    Report(ReportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Snapshot of source responses (JSON)
    #[arg(long, short, value_name = "FILE")]
    pub input: PathBuf,

    /// Lookback window in days
    #[arg(long, short, default_value_t = DEFAULT_WINDOW_DAYS)]
    pub days: i64,

    /// First day after the window (YYYY-MM-DD, UTC); defaults to today
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Billing categories shown per day
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    pub top: usize,

    /// Audit event names to query
    #[arg(long = "event", value_name = "NAME")]
    pub events: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ReportArgs {
    /// Exclusive end of the window; today (UTC) unless `--end` is given
    fn end_exclusive(&self) -> NaiveDate {
        self.end.unwrap_or_else(|| Utc::now().date_naive())
    }

    fn options(&self) -> ReportOptions {
        ReportOptions {
            window_days: self.days,
            top_n: self.top,
        }
    }

    fn audit_events(&self) -> Vec<String> {
        if self.events.is_empty() {
            DEFAULT_AUDIT_EVENTS.iter().map(|s| s.to_string()).collect()
        } else {
            self.events.clone()
        }
    }

    fn prepare(&self) -> anyhow::Result<(SnapshotSource, ReportBuilder)> {
        let builder = ReportBuilder::new(self.options(), self.end_exclusive())?;
        let source = SnapshotSource::load(&self.input)
            .with_context(|| format!("failed to load snapshot {}", self.input.display()))?;
        Ok((source, builder))
    }
}

#[derive(Serialize)]
struct CostsView {
    days: Vec<CostDateRecord>,
    summary: CostSummary,
}

fn emit<T: Serialize>(
    json: bool,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text(value));
    }
    Ok(())
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Summary(args) => {
                let (source, mut builder) = args.prepare()?;
                let metrics = collect_metric_series(&source, builder.window())?;
                let (summary, _, _) = builder.summary(&metrics)?;
                let items = source.line_items(builder.window())?;
                let (_, costs) = builder.costs(&items)?;
                emit(args.json, &summary, |s| render::render_summary(s, Some(&costs)))
            }
            Commands::Models(args) => {
                let (source, mut builder) = args.prepare()?;
                let metrics = collect_metric_series(&source, builder.window())?;
                let models = builder.models(&metrics)?;
                emit(args.json, &models, |m| render::render_models(m))
            }
            Commands::Users(args) => {
                let (source, mut builder) = args.prepare()?;
                let events =
                    collect_audit_events(&source, &args.audit_events(), builder.window())?;
                let users = builder.users(&events)?;
                emit(args.json, &users, |u| render::render_users(u))
            }
            Commands::Daily(args) => {
                let (source, builder) = args.prepare()?;
                let metrics = collect_metric_series(&source, builder.window())?;
                let daily = builder.daily(&metrics)?;
                emit(args.json, &daily, |d| render::render_daily(d))
            }
            Commands::Costs(args) => {
                let (source, mut builder) = args.prepare()?;
                let items = source.line_items(builder.window())?;
                let (days, summary) = builder.costs(&items)?;
                emit(args.json, &CostsView { days, summary }, |v| {
                    render::render_costs(&v.days, &v.summary)
                })
            }
            Commands::Report(args) => {
                let (source, builder) = args.prepare()?;
                let inputs = fetch_inputs(&source, &args.audit_events(), builder.window())?;
                let report = builder.build(&inputs)?;
                emit(args.json, &report, |r| {
                    [
                        render::render_summary(&r.summary, Some(&r.cost_summary)),
                        render::render_models(&r.models),
                        render::render_users(&r.users),
                        render::render_daily(&r.daily),
                        render::render_costs(&r.costs, &r.cost_summary),
                    ]
                    .join("\n")
                })
            }
        }
    }
}
