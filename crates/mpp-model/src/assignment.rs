use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::duration::{Duration, TimeUnit};
use crate::enums::{RelationType, ResourceRequestType, WorkContour};
use crate::hyperlink::Hyperlink;
use crate::timephased::TimephasedData;

/// A resource assigned to a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub unique_id: i32,
    pub task_unique_id: i32,
    /// `None` for assignments without a resource.
    pub resource_unique_id: Option<i32>,
    pub guid: Option<Uuid>,
    pub notes: Option<String>,
    pub hyperlink: Option<Hyperlink>,

    pub start: Option<NaiveDateTime>,
    pub finish: Option<NaiveDateTime>,
    pub actual_start: Option<NaiveDateTime>,
    pub actual_finish: Option<NaiveDateTime>,
    pub resume: Option<NaiveDateTime>,
    pub created: Option<NaiveDateTime>,
    pub delay: Option<Duration>,

    /// Assignment units as a percentage (100.0 is full time).
    pub units: Option<f64>,
    pub work: Option<Duration>,
    pub actual_work: Option<Duration>,
    pub remaining_work: Option<Duration>,
    pub overtime_work: Option<Duration>,
    pub cost: Option<f64>,
    pub actual_cost: Option<f64>,
    pub remaining_cost: Option<f64>,
    pub percent_work_complete: Option<i32>,
    pub variable_rate_units: Option<TimeUnit>,
    pub request_type: Option<ResourceRequestType>,
    pub work_contour: Option<WorkContour>,

    /// Baseline work and cost, slot 0 is the plain baseline and 1..=10 the numbered ones.
    pub baseline_work: [Option<Duration>; 11],
    pub baseline_cost: [Option<f64>; 11],

    #[serde(default)]
    pub flags: [bool; 20],
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub response_pending: bool,
    #[serde(default)]
    pub team_status_pending: bool,

    #[serde(default, skip_serializing_if = "TimephasedData::is_empty")]
    pub timephased: TimephasedData,
}

impl Assignment {
    pub fn new(unique_id: i32, task_unique_id: i32) -> Self {
        Self {
            unique_id,
            task_unique_id,
            ..Self::default()
        }
    }
}

/// A dependency link between two tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub unique_id: i32,
    pub predecessor_unique_id: i32,
    pub successor_unique_id: i32,
    pub relation_type: RelationType,
    pub lag: Duration,
}
