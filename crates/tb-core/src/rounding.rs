//! Tenth-hour rounding and reconciliation.
//!
//! Billed time is shown to the nearest tenth of an hour at every level of a
//! summary. Rounding each level on its own lets subtotals drift away from
//! their parent, so children are instead apportioned against the parent's
//! already-rounded value using the largest-remainder method.
//!
//! # Conventions
//!
//! - Ties round half up: 0.05 h becomes 0.1 h.
//! - When the rounded children miss the parent by `delta` tenths, the
//!   `|delta|` children whose naive rounding moved furthest away from
//!   `delta`'s direction each move one tenth toward it.
//! - Equal remainders keep input order, so results are deterministic.

use std::cmp::Reverse;

use chrono::Duration;
use thiserror::Error;

use crate::duration::{TENTH_HOUR_MS, hours, is_tenth_multiple};
use crate::summary::Reconcile;

/// A set of children that cannot be made to sum to their parent.
///
/// These only arise from inconsistent input, e.g. a parent whose exact time
/// is not the sum of its children's exact times.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// A nonzero total was given for an empty list of children.
    #[error("cannot distribute {total_tenths} tenth-hour units across no entries")]
    NoChildren { total_tenths: i64 },

    /// The rounding gap is larger than the children can absorb one unit each.
    #[error("rounding gap of {delta} tenth-hour units exceeds the {available} entries able to absorb it")]
    Undistributable { delta: i64, available: usize },

    /// The parent total was not itself rounded to a tenth hour.
    #[error("parent total of {total_ms}ms is not a whole number of tenth hours")]
    UnroundedTotal { total_ms: i64 },
}

/// Converts milliseconds to whole tenth-hour units, rounding half up.
fn tenths(ms: i64) -> i64 {
    ms.saturating_add(TENTH_HOUR_MS / 2).div_euclid(TENTH_HOUR_MS)
}

fn from_tenths(units: i64) -> Duration {
    Duration::milliseconds(units.saturating_mul(TENTH_HOUR_MS))
}

/// Rounds a duration to the nearest tenth of an hour, ties rounding up.
pub fn round_time(duration: Duration) -> Duration {
    from_tenths(tenths(duration.num_milliseconds()))
}

/// Rounds each child to a tenth hour so that together they sum to `total`.
///
/// `total` must already be a whole number of tenth hours. Children come back
/// in the same order, each at most one tenth away from its own naive
/// rounding, and each rebuilt through [`Reconcile::reconciled`] so nested
/// levels are reconciled against their new value.
pub fn reconcile<N: Reconcile>(
    children: Vec<N>,
    total: Duration,
) -> Result<Vec<N>, ReconcileError> {
    let total_ms = total.num_milliseconds();
    if !is_tenth_multiple(total) {
        return Err(ReconcileError::UnroundedTotal { total_ms });
    }
    let target = total_ms / TENTH_HOUR_MS;

    if children.is_empty() {
        if target != 0 {
            return Err(ReconcileError::NoChildren {
                total_tenths: target,
            });
        }
        return Ok(children);
    }

    let mut units = Vec::with_capacity(children.len());
    let mut remainders = Vec::with_capacity(children.len());
    for child in &children {
        let exact = child.time().num_milliseconds();
        let naive = tenths(exact);
        units.push(naive);
        remainders.push(exact - naive * TENTH_HOUR_MS);
    }

    let delta = target - units.iter().sum::<i64>();
    if delta != 0 {
        let step = delta.signum();

        // A child already at zero cannot give up a unit.
        let mut candidates: Vec<usize> = (0..children.len())
            .filter(|&i| step > 0 || units[i] > 0)
            .collect();
        if step > 0 {
            candidates.sort_by_key(|&i| Reverse(remainders[i]));
        } else {
            candidates.sort_by_key(|&i| remainders[i]);
        }

        let needed = usize::try_from(delta.unsigned_abs()).unwrap_or(usize::MAX);
        if needed > candidates.len() {
            return Err(ReconcileError::Undistributable {
                delta,
                available: candidates.len(),
            });
        }
        for &i in &candidates[..needed] {
            units[i] += step;
        }

        tracing::debug!(delta, children = children.len(), "distributed rounding gap");
    }

    children
        .into_iter()
        .zip(units)
        .map(|(child, units)| child.reconciled(from_tenths(units)))
        .collect()
}

/// Computes the amount billed for a duration at an hourly rate.
///
/// No rounding is applied; callers pass reconciled durations.
pub fn charge(duration: Duration, rate: f64) -> f64 {
    hours(duration) * rate
}
