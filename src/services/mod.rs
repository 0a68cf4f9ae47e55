//! Services for reconciling and aggregating usage data

pub mod aggregator;
pub mod calendar;
pub mod normalizer;
pub mod reconciler;
pub mod report;

pub use aggregator::Aggregator;
pub use calendar::{generate_range, ReportWindow};
pub use normalizer::{NameCache, NameMapping};
pub use report::{ReportBuilder, ReportInputs, ReportOptions};
