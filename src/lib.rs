//! bedusage: usage and cost reports for hosted model inference
//!
//! Source batches go in (per-model metric series, audit events, cost line
//! items); date-complete, ranked report structures come out.

pub mod cli;
pub mod services;
pub mod sources;
pub mod types;
