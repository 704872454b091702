use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::duration::{Duration, TimeUnit};
use crate::enums::{AccrueType, ConstraintType, EarnedValueMethod, Priority, TaskType};
use crate::hyperlink::Hyperlink;

/// One stretch of a split task: a period of work or the gap between two of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSplit {
    pub start: NaiveDateTime,
    pub finish: NaiveDateTime,
    pub working: bool,
}

/// A task row. Every decoded attribute is optional since files routinely omit them.
///
/// `null` tasks are blank rows kept only to preserve display positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub unique_id: i32,
    pub id: Option<i32>,
    #[serde(default)]
    pub null: bool,
    pub name: Option<String>,
    pub wbs: Option<String>,
    pub notes: Option<String>,
    pub text1: Option<String>,
    pub number1: Option<f64>,
    pub outline_level: Option<i32>,
    pub parent_unique_id: Option<i32>,
    pub calendar_unique_id: Option<i32>,
    pub guid: Option<Uuid>,
    pub hyperlink: Option<Hyperlink>,

    pub start: Option<NaiveDateTime>,
    pub finish: Option<NaiveDateTime>,
    pub actual_start: Option<NaiveDateTime>,
    pub actual_finish: Option<NaiveDateTime>,
    pub baseline_start: Option<NaiveDateTime>,
    pub baseline_finish: Option<NaiveDateTime>,
    pub scheduled_start: Option<NaiveDateTime>,
    pub scheduled_finish: Option<NaiveDateTime>,
    pub constraint_date: Option<NaiveDateTime>,
    pub deadline: Option<NaiveDateTime>,
    pub created: Option<NaiveDateTime>,
    pub resume: Option<NaiveDateTime>,
    pub stop: Option<NaiveDateTime>,

    pub duration: Option<Duration>,
    pub actual_duration: Option<Duration>,
    pub remaining_duration: Option<Duration>,
    pub baseline_duration: Option<Duration>,
    pub scheduled_duration: Option<Duration>,
    pub leveling_delay: Option<Duration>,
    pub duration_units: Option<TimeUnit>,
    #[serde(default)]
    pub estimated: bool,

    pub work: Option<Duration>,
    pub actual_work: Option<Duration>,
    pub remaining_work: Option<Duration>,
    pub baseline_work: Option<Duration>,

    pub cost: Option<f64>,
    pub actual_cost: Option<f64>,
    pub fixed_cost: Option<f64>,
    pub baseline_cost: Option<f64>,
    pub fixed_cost_accrual: Option<AccrueType>,

    pub percent_complete: Option<i32>,
    pub percent_work_complete: Option<i32>,
    pub constraint_type: Option<ConstraintType>,
    pub priority: Option<Priority>,
    pub task_type: Option<TaskType>,
    pub earned_value_method: Option<EarnedValueMethod>,

    #[serde(default)]
    pub flags: [bool; 20],
    #[serde(default)]
    pub milestone: bool,
    #[serde(default)]
    pub marked: bool,
    #[serde(default)]
    pub rollup: bool,
    #[serde(default)]
    pub hide_bar: bool,
    #[serde(default)]
    pub effort_driven: bool,
    #[serde(default)]
    pub level_assignments: bool,
    #[serde(default)]
    pub leveling_can_split: bool,
    #[serde(default)]
    pub ignore_resource_calendar: bool,
    #[serde(default)]
    pub active: bool,
    /// Manually scheduled (as opposed to auto scheduled).
    #[serde(default)]
    pub manual: bool,

    /// Work periods and gaps of a task whose work is interrupted; empty otherwise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub splits: Vec<TaskSplit>,
    /// End of the completed part of a split task.
    pub split_complete_to: Option<NaiveDateTime>,

    /// Path of the inserted project this task belongs to or stands for.
    pub subproject_file: Option<String>,
    /// The task stands in for a task of another project.
    #[serde(default)]
    pub external_task: bool,
}

impl Task {
    pub fn new(unique_id: i32) -> Self {
        Self {
            unique_id,
            ..Self::default()
        }
    }

    /// Flag1..Flag20, numbered from 1.
    pub fn flag(&self, number: usize) -> bool {
        number
            .checked_sub(1)
            .and_then(|i| self.flags.get(i))
            .copied()
            .unwrap_or(false)
    }
}
