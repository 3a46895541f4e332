//! Core domain logic for time billing.
//!
//! This crate contains the fundamental types and logic for:
//! - Summaries: the total / project / activity hierarchy built from recorded time
//! - Rounding: tenth-hour rounding and largest-remainder reconciliation
//! - Charges: turning reconciled durations into billable amounts

pub mod duration;
mod rounding;
mod summary;
pub mod types;

pub use rounding::{ReconcileError, charge, reconcile, round_time};
pub use summary::{Detail, ProjectTimeSummary, Reconcile, TimeEntry, TimeSummary};
pub use types::{ActivityName, ProjectName, Rate, TimeRecord, ValidationError};
