//! Report formatting for disaggregation results.

pub mod report;

pub use report::{format_report, ApplianceSeries, Record, Report};
