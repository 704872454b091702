use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::duration::{Duration, Rate};
use crate::enums::{AccrueType, BookingType, ResourceType};
use crate::hyperlink::Hyperlink;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub unique_id: i32,
    pub id: Option<i32>,
    pub name: Option<String>,
    pub initials: Option<String>,
    pub group: Option<String>,
    pub code: Option<String>,
    pub email_address: Option<String>,
    pub notes: Option<String>,
    pub text1: Option<String>,
    pub guid: Option<Uuid>,
    pub calendar_guid: Option<Uuid>,
    pub calendar_unique_id: Option<i32>,
    pub hyperlink: Option<Hyperlink>,
    pub resource_type: Option<ResourceType>,
    pub booking_type: Option<BookingType>,
    pub accrue_at: Option<AccrueType>,
    pub created: Option<NaiveDateTime>,

    /// Maximum units as a percentage (100.0 is one full-time resource).
    pub max_units: Option<f64>,
    pub standard_rate: Option<Rate>,
    pub overtime_rate: Option<Rate>,
    pub cost_per_use: Option<f64>,

    pub work: Option<Duration>,
    pub actual_work: Option<Duration>,
    pub remaining_work: Option<Duration>,
    pub baseline_work: Option<Duration>,
    pub cost: Option<f64>,
    pub actual_cost: Option<f64>,
    pub remaining_cost: Option<f64>,
    pub baseline_cost: Option<f64>,
    pub percent_work_complete: Option<i32>,

    #[serde(default)]
    pub flags: [bool; 20],
    #[serde(default)]
    pub budget: bool,
    #[serde(default)]
    pub generic: bool,
}

impl Resource {
    pub fn new(unique_id: i32) -> Self {
        Self {
            unique_id,
            ..Self::default()
        }
    }
}
