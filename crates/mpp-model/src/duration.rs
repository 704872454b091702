use serde::{Deserialize, Serialize};

use crate::InvalidCode;

/// Unit attached to a duration, work amount or rate.
///
/// The discriminants match the ordinals stored in project files, so several
/// encoded fields are decoded with `TimeUnit::try_from(code)` directly (or with
/// a `code - 1` adjustment, see the reader).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Minutes = 0,
    Hours = 1,
    Days = 2,
    Weeks = 3,
    Months = 4,
    Percent = 5,
    Years = 6,
    ElapsedMinutes = 7,
    ElapsedHours = 8,
    ElapsedDays = 9,
    ElapsedWeeks = 10,
    ElapsedMonths = 11,
    ElapsedYears = 12,
    ElapsedPercent = 13,
}

impl TimeUnit {
    pub fn is_elapsed(self) -> bool {
        matches!(
            self,
            TimeUnit::ElapsedMinutes
                | TimeUnit::ElapsedHours
                | TimeUnit::ElapsedDays
                | TimeUnit::ElapsedWeeks
                | TimeUnit::ElapsedMonths
                | TimeUnit::ElapsedYears
                | TimeUnit::ElapsedPercent
        )
    }

    /// Number of minutes represented by one unit, using the project's working-time
    /// settings for the non-elapsed day/week/month/year units.
    ///
    /// Percent units have no fixed length and return `None`.
    pub fn minutes_per_unit(self, defaults: &TimeDefaults) -> Option<f64> {
        let minutes_per_day = f64::from(defaults.minutes_per_day);
        let minutes_per_week = f64::from(defaults.minutes_per_week);
        let days_per_month = f64::from(defaults.days_per_month);
        Some(match self {
            TimeUnit::Minutes | TimeUnit::ElapsedMinutes => 1.0,
            TimeUnit::Hours | TimeUnit::ElapsedHours => 60.0,
            TimeUnit::Days => minutes_per_day,
            TimeUnit::Weeks => minutes_per_week,
            TimeUnit::Months => minutes_per_day * days_per_month,
            TimeUnit::Years => minutes_per_week * 52.0,
            TimeUnit::ElapsedDays => ELAPSED_MINUTES_PER_DAY,
            TimeUnit::ElapsedWeeks => ELAPSED_MINUTES_PER_DAY * 7.0,
            TimeUnit::ElapsedMonths => ELAPSED_MINUTES_PER_DAY * 30.0,
            TimeUnit::ElapsedYears => ELAPSED_MINUTES_PER_DAY * 365.0,
            TimeUnit::Percent | TimeUnit::ElapsedPercent => return None,
        })
    }
}

impl TryFrom<i32> for TimeUnit {
    type Error = InvalidCode;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => TimeUnit::Minutes,
            1 => TimeUnit::Hours,
            2 => TimeUnit::Days,
            3 => TimeUnit::Weeks,
            4 => TimeUnit::Months,
            5 => TimeUnit::Percent,
            6 => TimeUnit::Years,
            7 => TimeUnit::ElapsedMinutes,
            8 => TimeUnit::ElapsedHours,
            9 => TimeUnit::ElapsedDays,
            10 => TimeUnit::ElapsedWeeks,
            11 => TimeUnit::ElapsedMonths,
            12 => TimeUnit::ElapsedYears,
            13 => TimeUnit::ElapsedPercent,
            _ => return Err(InvalidCode::new("time unit", code)),
        })
    }
}

const ELAPSED_MINUTES_PER_DAY: f64 = 1440.0;

/// Project-wide working-time settings used to convert between duration units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDefaults {
    pub minutes_per_day: u32,
    pub minutes_per_week: u32,
    pub days_per_month: u32,
}

impl Default for TimeDefaults {
    fn default() -> Self {
        Self {
            minutes_per_day: 480,
            minutes_per_week: 2400,
            days_per_month: 20,
        }
    }
}

/// A length of time expressed in a specific unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Duration {
    pub value: f64,
    pub unit: TimeUnit,
}

impl Duration {
    pub fn new(value: f64, unit: TimeUnit) -> Self {
        Self { value, unit }
    }

    pub fn minutes(value: f64) -> Self {
        Self::new(value, TimeUnit::Minutes)
    }

    pub fn hours(value: f64) -> Self {
        Self::new(value, TimeUnit::Hours)
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }

    /// Converts to minutes. Percent durations cannot be converted.
    pub fn to_minutes(&self, defaults: &TimeDefaults) -> Option<f64> {
        Some(self.value * self.unit.minutes_per_unit(defaults)?)
    }

    /// Converts to another unit, returning `self` unchanged when either unit is
    /// a percentage.
    pub fn convert(&self, unit: TimeUnit, defaults: &TimeDefaults) -> Duration {
        if unit == self.unit {
            return *self;
        }
        match (
            self.unit.minutes_per_unit(defaults),
            unit.minutes_per_unit(defaults),
        ) {
            (Some(from), Some(to)) if to != 0.0 => Duration::new(self.value * from / to, unit),
            _ => *self,
        }
    }

    /// Compares two durations after normalising them to minutes.
    pub fn approx_eq(&self, other: &Duration, defaults: &TimeDefaults) -> bool {
        match (self.to_minutes(defaults), other.to_minutes(defaults)) {
            (Some(a), Some(b)) => (a - b).abs() < DURATION_EPSILON,
            _ => self == other,
        }
    }
}

const DURATION_EPSILON: f64 = 0.00001;

/// A monetary rate per unit of time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub amount: f64,
    pub unit: TimeUnit,
}

impl Rate {
    pub fn new(amount: f64, unit: TimeUnit) -> Self {
        Self { amount, unit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_unit_codes_follow_file_ordinals() {
        assert_eq!(TimeUnit::try_from(2), Ok(TimeUnit::Days));
        assert_eq!(TimeUnit::try_from(13), Ok(TimeUnit::ElapsedPercent));
        assert!(TimeUnit::try_from(14).is_err());
        assert!(TimeUnit::try_from(-1).is_err());
    }

    #[test]
    fn converts_days_using_project_defaults() {
        let defaults = TimeDefaults {
            minutes_per_day: 450,
            ..TimeDefaults::default()
        };
        let d = Duration::new(2.0, TimeUnit::Days);
        assert_eq!(d.to_minutes(&defaults), Some(900.0));
        assert_eq!(d.convert(TimeUnit::Hours, &defaults), Duration::hours(15.0));
    }

    #[test]
    fn elapsed_days_ignore_working_time() {
        let defaults = TimeDefaults::default();
        let d = Duration::new(1.0, TimeUnit::ElapsedDays);
        assert_eq!(d.to_minutes(&defaults), Some(1440.0));
    }

    #[test]
    fn percent_durations_are_not_converted() {
        let defaults = TimeDefaults::default();
        let d = Duration::new(50.0, TimeUnit::Percent);
        assert_eq!(d.to_minutes(&defaults), None);
        assert_eq!(d.convert(TimeUnit::Hours, &defaults), d);
    }
}
