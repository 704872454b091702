use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::duration::Duration;

/// A contiguous stretch of work on an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimephasedWork {
    pub start: NaiveDateTime,
    pub finish: NaiveDateTime,
    pub total_amount: Duration,
    /// Work per nominal 8 hour day across the working span of the segment.
    pub amount_per_day: Duration,
    #[serde(default)]
    pub modified: bool,
}

/// A contiguous stretch of baseline cost on an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimephasedCost {
    pub start: NaiveDateTime,
    pub finish: NaiveDateTime,
    pub total_amount: f64,
    pub amount_per_day: f64,
}

/// All timephased curves attached to one assignment.
///
/// Baseline slot 0 is the plain baseline, slots 1..=10 are Baseline1..Baseline10.
/// A `None` slot means the file carries no curve for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimephasedData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub complete_work: Vec<TimephasedWork>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub planned_work: Vec<TimephasedWork>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actual_overtime_work: Vec<TimephasedWork>,
    pub baseline_work: [Option<Vec<TimephasedWork>>; 11],
    pub baseline_cost: [Option<Vec<TimephasedCost>>; 11],
}

impl TimephasedData {
    pub fn is_empty(&self) -> bool {
        self.complete_work.is_empty()
            && self.planned_work.is_empty()
            && self.actual_overtime_work.is_empty()
            && self.baseline_work.iter().all(Option::is_none)
            && self.baseline_cost.iter().all(Option::is_none)
    }
}
