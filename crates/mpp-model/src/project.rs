use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assignment::{Assignment, Relation};
use crate::calendar::Calendar;
use crate::duration::{TimeDefaults, TimeUnit};
use crate::resource::Resource;
use crate::subproject::SubProject;
use crate::task::Task;

/// File format generation the document was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileGeneration {
    #[serde(rename = "mpp9")]
    Mpp9,
    #[serde(rename = "mpp12")]
    Mpp12,
    #[serde(rename = "mpp14")]
    Mpp14,
}

impl FileGeneration {
    pub fn number(self) -> u8 {
        match self {
            FileGeneration::Mpp9 => 9,
            FileGeneration::Mpp12 => 12,
            FileGeneration::Mpp14 => 14,
        }
    }
}

/// Project-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectProperties {
    pub generation: FileGeneration,
    /// Major version of the application that last saved the file, when known.
    pub application_version: Option<u32>,
    pub minutes_per_day: u32,
    pub minutes_per_week: u32,
    pub days_per_month: u32,
    pub default_duration_units: TimeUnit,
    pub default_work_units: TimeUnit,
    pub default_standard_rate: Option<f64>,
    pub default_overtime_rate: Option<f64>,
    pub currency_symbol: Option<String>,
    pub currency_code: Option<String>,
    pub currency_digits: Option<i32>,
    pub start_date: Option<NaiveDateTime>,
    pub finish_date: Option<NaiveDateTime>,
    pub status_date: Option<NaiveDateTime>,
    pub baseline_date: Option<NaiveDateTime>,
    pub default_calendar_name: Option<String>,
    pub project_file_path: Option<String>,
    pub guid: Option<Uuid>,
    #[serde(default)]
    pub password_protected: bool,
    /// User-facing aliases for custom fields, keyed by field type code.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_field_aliases: BTreeMap<u32, String>,
}

impl ProjectProperties {
    pub fn new(generation: FileGeneration) -> Self {
        Self {
            generation,
            application_version: None,
            minutes_per_day: 480,
            minutes_per_week: 2400,
            days_per_month: 20,
            default_duration_units: TimeUnit::Days,
            default_work_units: TimeUnit::Hours,
            default_standard_rate: None,
            default_overtime_rate: None,
            currency_symbol: None,
            currency_code: None,
            currency_digits: None,
            start_date: None,
            finish_date: None,
            status_date: None,
            baseline_date: None,
            default_calendar_name: None,
            project_file_path: None,
            guid: None,
            password_protected: false,
            custom_field_aliases: BTreeMap::new(),
        }
    }

    pub fn time_defaults(&self) -> TimeDefaults {
        TimeDefaults {
            minutes_per_day: self.minutes_per_day,
            minutes_per_week: self.minutes_per_week,
            days_per_month: self.days_per_month,
        }
    }
}

/// A recoverable problem encountered while decoding; the read carried on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoredError {
    pub message: String,
}

impl IgnoredError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for IgnoredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// A decoded project document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub properties: ProjectProperties,
    pub calendars: Vec<Calendar>,
    /// Tasks in display (ID) order.
    pub tasks: Vec<Task>,
    pub resources: Vec<Resource>,
    pub assignments: Vec<Assignment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,
    /// Projects inserted into this one, in the order they were first inserted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_projects: Vec<SubProject>,
    /// The resource pool this project shares.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_sub_project: Option<SubProject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored_errors: Vec<IgnoredError>,
}

impl ProjectFile {
    pub fn new(properties: ProjectProperties) -> Self {
        Self {
            properties,
            calendars: Vec::new(),
            tasks: Vec::new(),
            resources: Vec::new(),
            assignments: Vec::new(),
            relations: Vec::new(),
            sub_projects: Vec::new(),
            resource_sub_project: None,
            ignored_errors: Vec::new(),
        }
    }

    pub fn task_by_unique_id(&self, unique_id: i32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.unique_id == unique_id)
    }

    pub fn resource_by_unique_id(&self, unique_id: i32) -> Option<&Resource> {
        self.resources.iter().find(|r| r.unique_id == unique_id)
    }

    pub fn calendar_by_unique_id(&self, unique_id: i32) -> Option<&Calendar> {
        self.calendars.iter().find(|c| c.unique_id == unique_id)
    }

    pub fn calendar_by_name(&self, name: &str) -> Option<&Calendar> {
        self.calendars
            .iter()
            .find(|c| c.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    /// The calendar named by the project properties, falling back to the first base calendar.
    pub fn default_calendar(&self) -> Option<&Calendar> {
        self.properties
            .default_calendar_name
            .as_deref()
            .and_then(|name| self.calendar_by_name(name))
            .or_else(|| self.calendars.iter().find(|c| !c.is_derived()))
    }

    pub fn assignments_for_task(&self, task_unique_id: i32) -> impl Iterator<Item = &Assignment> {
        self.assignments
            .iter()
            .filter(move |a| a.task_unique_id == task_unique_id)
    }
}
