use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::duration::{Duration, TimeDefaults, TimeUnit};

/// How a day of the week is treated by a calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    NonWorking,
    Working,
    /// Inherit the day from the base calendar.
    Default,
}

/// A single working period within a day. `minutes` may run past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingRange {
    pub start: NaiveTime,
    pub minutes: u32,
}

impl WorkingRange {
    pub fn new(start: NaiveTime, minutes: u32) -> Self {
        Self { start, minutes }
    }

    fn on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = date.and_time(self.start);
        (start, offset_by(start, TimeDelta::minutes(i64::from(self.minutes))))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub day_type: DayType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<WorkingRange>,
}

impl CalendarDay {
    pub fn non_working() -> Self {
        Self {
            day_type: DayType::NonWorking,
            ranges: Vec::new(),
        }
    }

    pub fn inherited() -> Self {
        Self {
            day_type: DayType::Default,
            ranges: Vec::new(),
        }
    }

    pub fn working(mut ranges: Vec<WorkingRange>) -> Self {
        ranges.sort_by_key(|r| r.start);
        Self {
            day_type: if ranges.is_empty() {
                DayType::NonWorking
            } else {
                DayType::Working
            },
            ranges,
        }
    }

    /// Monday to Friday default: 08:00-12:00 and 13:00-17:00.
    pub fn standard() -> Self {
        Self::working(standard_ranges())
    }
}

fn standard_ranges() -> Vec<WorkingRange> {
    let at = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN);
    vec![
        WorkingRange::new(at(8), 240),
        WorkingRange::new(at(13), 240),
    ]
}

/// Dates (inclusive) where the week pattern is replaced. Empty `ranges` means non-working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarException {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<WorkingRange>,
}

impl CalendarException {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// A project, base or resource calendar.
///
/// `days` is indexed from Sunday (0) to Saturday (6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub unique_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_unique_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_unique_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<uuid::Uuid>,
    pub days: [CalendarDay; 7],
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<CalendarException>,
}

impl Calendar {
    pub fn new(unique_id: i32) -> Self {
        Self {
            unique_id,
            name: None,
            parent_unique_id: None,
            resource_unique_id: None,
            guid: None,
            days: std::array::from_fn(|_| CalendarDay::non_working()),
            exceptions: Vec::new(),
        }
    }

    /// A base calendar with the default Monday to Friday working week.
    pub fn standard(unique_id: i32, name: impl Into<String>) -> Self {
        let mut calendar = Self::new(unique_id);
        calendar.name = Some(name.into());
        for weekday in 1..=5 {
            calendar.days[weekday] = CalendarDay::standard();
        }
        calendar
    }

    pub fn is_derived(&self) -> bool {
        self.parent_unique_id.is_some()
    }

    pub fn day(&self, weekday: chrono::Weekday) -> &CalendarDay {
        &self.days[weekday.num_days_from_sunday() as usize]
    }

    /// Flattens inherited days and exceptions from `base` into a standalone calendar.
    ///
    /// The calendar's own exceptions take precedence over the base calendar's.
    pub fn resolve(&self, base: Option<&Calendar>) -> Calendar {
        let mut resolved = self.clone();
        let Some(base) = base else {
            for day in &mut resolved.days {
                if day.day_type == DayType::Default {
                    *day = CalendarDay::non_working();
                }
            }
            return resolved;
        };

        for (day, base_day) in resolved.days.iter_mut().zip(base.days.iter()) {
            if day.day_type == DayType::Default {
                *day = base_day.clone();
                if day.day_type == DayType::Default {
                    *day = CalendarDay::non_working();
                }
            }
        }
        for exception in &base.exceptions {
            let overlaps = resolved
                .exceptions
                .iter()
                .any(|own| own.from <= exception.to && exception.from <= own.to);
            if !overlaps {
                resolved.exceptions.push(exception.clone());
            }
        }
        resolved.exceptions.sort_by_key(|e| e.from);
        resolved
    }

    /// Working ranges in effect on `date`, taking exceptions into account.
    pub fn ranges_for(&self, date: NaiveDate) -> &[WorkingRange] {
        if let Some(exception) = self.exceptions.iter().find(|e| e.contains(date)) {
            return &exception.ranges;
        }
        let day = self.day(date.weekday());
        match day.day_type {
            DayType::Working => &day.ranges,
            DayType::NonWorking | DayType::Default => &[],
        }
    }

    pub fn is_working_date(&self, date: NaiveDate) -> bool {
        !self.ranges_for(date).is_empty()
    }

    fn has_any_working_time(&self) -> bool {
        self.days.iter().any(|d| !d.ranges.is_empty())
            || self.exceptions.iter().any(|e| !e.ranges.is_empty())
    }

    /// Working intervals ordered by start, beginning with the day before `from`
    /// so ranges running past midnight are not missed.
    fn intervals_from(
        &self,
        from: NaiveDate,
    ) -> impl Iterator<Item = (NaiveDateTime, NaiveDateTime)> + '_ {
        let working = self.has_any_working_time();
        let first = from.pred_opt().unwrap_or(from);
        first
            .iter_days()
            .take(if working { MAX_SEARCH_DAYS } else { 0 })
            .flat_map(move |date| self.ranges_for(date).iter().map(move |r| r.on(date)))
    }
}

/// Upper bound on how far working-time searches walk forward.
const MAX_SEARCH_DAYS: usize = 366 * 20;

/// Date arithmetic over working time.
pub trait WorkingTime {
    /// The earliest working instant at or after `t`.
    fn next_working_instant_at_or_after(&self, t: NaiveDateTime) -> NaiveDateTime;

    /// The instant reached after `minutes` of working time from `t`.
    ///
    /// The result is the end of the last consumed working period rather than the
    /// start of the following one.
    fn add_working_minutes(&self, t: NaiveDateTime, minutes: f64) -> NaiveDateTime;

    /// Working minutes between `a` and `b` (zero when `b <= a`).
    fn working_minutes_between(&self, a: NaiveDateTime, b: NaiveDateTime) -> f64;

    fn add_duration(
        &self,
        t: NaiveDateTime,
        duration: &Duration,
        defaults: &TimeDefaults,
    ) -> NaiveDateTime {
        if duration.unit.is_elapsed() {
            let minutes = duration.to_minutes(defaults).unwrap_or(0.0);
            return offset_by(t, minutes_delta(minutes));
        }
        match duration.to_minutes(defaults) {
            Some(minutes) => self.add_working_minutes(t, minutes),
            None => t,
        }
    }

    fn work_between(
        &self,
        a: NaiveDateTime,
        b: NaiveDateTime,
        unit: TimeUnit,
        defaults: &TimeDefaults,
    ) -> Duration {
        Duration::minutes(self.working_minutes_between(a, b)).convert(unit, defaults)
    }
}

/// Converts fractional minutes into a `TimeDelta` with millisecond precision.
///
/// Saturates at the representable range; NaN is zero.
pub fn minutes_delta(minutes: f64) -> TimeDelta {
    if minutes.is_nan() {
        return TimeDelta::zero();
    }
    let millis = (minutes * 60_000.0).round();
    let saturated = if millis < 0.0 { TimeDelta::MIN } else { TimeDelta::MAX };
    TimeDelta::try_milliseconds(millis as i64).unwrap_or(saturated)
}

/// `t` moved by `delta`, or `t` itself when the result leaves the representable range.
pub fn offset_by(t: NaiveDateTime, delta: TimeDelta) -> NaiveDateTime {
    t.checked_add_signed(delta).unwrap_or(t)
}

impl WorkingTime for Calendar {
    fn next_working_instant_at_or_after(&self, t: NaiveDateTime) -> NaiveDateTime {
        self.intervals_from(t.date())
            .find(|(_, end)| *end > t)
            .map(|(start, _)| start.max(t))
            .unwrap_or(t)
    }

    fn add_working_minutes(&self, t: NaiveDateTime, minutes: f64) -> NaiveDateTime {
        if minutes <= 0.0 {
            return t;
        }
        let mut remaining = minutes_delta(minutes);
        for (start, end) in self.intervals_from(t.date()) {
            if end <= t {
                continue;
            }
            let start = start.max(t);
            let available = end - start;
            if available >= remaining {
                return start + remaining;
            }
            remaining -= available;
        }
        offset_by(t, minutes_delta(minutes))
    }

    fn working_minutes_between(&self, a: NaiveDateTime, b: NaiveDateTime) -> f64 {
        if b <= a {
            return 0.0;
        }
        let mut total = TimeDelta::zero();
        for (start, end) in self.intervals_from(a.date()) {
            if start >= b {
                break;
            }
            let start = start.max(a);
            let end = end.min(b);
            if end > start {
                total += end - start;
            }
        }
        total.num_milliseconds() as f64 / 60_000.0
    }
}
