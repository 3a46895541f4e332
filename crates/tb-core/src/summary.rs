//! The total / project / activity hierarchy of billed time.
//!
//! A [`TimeSummary`] is built from exact recorded time, then passed once
//! through [`TimeSummary::rounded`] before anything is reported or invoiced.

use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::rounding::{ReconcileError, reconcile, round_time};
use crate::types::TimeRecord;

/// Anything in the summary hierarchy that carries a time value.
pub trait TimeEntry {
    /// Returns the node's representative time.
    fn time(&self) -> Duration;
}

/// A node that can be rebuilt around a new, already-rounded time.
///
/// Implementations reconcile their own children against `time`, so
/// reconciling one level reconciles everything beneath it.
pub trait Reconcile: TimeEntry + Sized {
    fn reconciled(self, time: Duration) -> Result<Self, ReconcileError>;
}

/// Time spent on one activity within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
    pub activity: String,
    #[serde(rename = "time_ms", with = "crate::duration::serde_millis")]
    pub time: Duration,
}

impl Detail {
    pub fn new(activity: impl Into<String>, time: Duration) -> Self {
        Self {
            activity: activity.into(),
            time,
        }
    }
}

impl TimeEntry for Detail {
    fn time(&self) -> Duration {
        self.time
    }
}

impl Reconcile for Detail {
    fn reconciled(self, time: Duration) -> Result<Self, ReconcileError> {
        Ok(Self { time, ..self })
    }
}

/// Time spent on one project, broken down by activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTimeSummary {
    pub name: String,
    #[serde(rename = "time_ms", with = "crate::duration::serde_millis")]
    pub time: Duration,
    pub details: Vec<Detail>,
}

impl ProjectTimeSummary {
    /// Creates a project whose time is the exact sum of its details.
    pub fn new(name: impl Into<String>, details: Vec<Detail>) -> Self {
        let time = sum_times(&details);
        Self {
            name: name.into(),
            time,
            details,
        }
    }
}

impl TimeEntry for ProjectTimeSummary {
    fn time(&self) -> Duration {
        self.time
    }
}

impl Reconcile for ProjectTimeSummary {
    fn reconciled(self, time: Duration) -> Result<Self, ReconcileError> {
        let details = reconcile(self.details, time)?;
        Ok(Self {
            name: self.name,
            time,
            details,
        })
    }
}

/// All billed time for a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimeSummary {
    #[serde(rename = "total_ms", with = "crate::duration::serde_millis")]
    pub total: Duration,
    pub projects: Vec<ProjectTimeSummary>,
}

impl TimeSummary {
    /// Creates a summary whose total is the exact sum of its projects.
    pub fn new(projects: Vec<ProjectTimeSummary>) -> Self {
        let total = sum_times(&projects);
        Self { total, projects }
    }

    /// Aggregates recorded time into an exact, unrounded summary.
    ///
    /// Projects appear in the order they are first seen in `records`, and
    /// activities in the order they are first seen within their project.
    pub fn from_entries(records: &[TimeRecord]) -> Self {
        let mut projects: Vec<(String, Vec<Detail>)> = Vec::new();
        let mut project_index: HashMap<&str, usize> = HashMap::new();

        for record in records {
            let project = *project_index
                .entry(record.project.as_str())
                .or_insert_with(|| {
                    projects.push((record.project.to_string(), Vec::new()));
                    projects.len() - 1
                });
            let details = &mut projects[project].1;

            match details
                .iter_mut()
                .find(|d| d.activity == record.activity.as_str())
            {
                Some(detail) => detail.time = detail.time + record.duration,
                None => details.push(Detail::new(record.activity.as_str(), record.duration)),
            }
        }

        Self::new(
            projects
                .into_iter()
                .map(|(name, details)| ProjectTimeSummary::new(name, details))
                .collect(),
        )
    }

    /// Rounds the summary to tenth hours at every level.
    ///
    /// The total is rounded first, projects are reconciled against it, and
    /// each project's details against the project's reconciled time. The
    /// result always has projects summing to the total and details summing
    /// to their project. A summary that is already reconciled comes back
    /// unchanged.
    pub fn rounded(&self) -> Result<Self, ReconcileError> {
        let total = round_time(self.total);
        let projects = reconcile(self.projects.clone(), total)?;
        Ok(Self { total, projects })
    }
}

impl TimeEntry for TimeSummary {
    fn time(&self) -> Duration {
        self.total
    }
}

fn sum_times<T: TimeEntry>(entries: &[T]) -> Duration {
    entries
        .iter()
        .fold(Duration::zero(), |acc, entry| acc + entry.time())
}
