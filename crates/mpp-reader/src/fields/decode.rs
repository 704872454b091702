//! Typed decoding of raw field bytes.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use uuid::Uuid;

use mpp_model::{
    AccrueType, BookingType, ConstraintType, DataType, Duration, EarnedValueMethod, Priority,
    ProjectProperties, Rate, ResourceRequestType, TaskType, TimeDefaults, TimeUnit, WorkGroup,
};

use crate::blocks::bytes::{f64_at, guid_at, i32_at, u16_at, u8_at, unicode_string_at};

/// Var data durations of this size hold the display text of a custom field.
const DURATION_TEXT_BLOB_LEN: usize = 512;
const DURATION_UNITS_MASK: u16 = 0x1F;
const TENTHS_PER_DAY: i64 = 24 * 60 * 10;

/// Day zero of stored dates.
pub(crate) fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1983, 12, 31)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldValue {
    Date(NaiveDateTime),
    Integer(i32),
    Number(f64),
    Duration(Duration),
    TimeUnit(TimeUnit),
    Rate(Rate),
    Boolean(bool),
    Guid(Uuid),
    Text(String),
    Binary(Vec<u8>),
    Constraint(ConstraintType),
    Priority(Priority),
    TaskType(TaskType),
    Accrue(AccrueType),
    WorkGroup(WorkGroup),
    EarnedValueMethod(EarnedValueMethod),
    RequestType(ResourceRequestType),
    BookingType(BookingType),
}

impl FieldValue {
    /// Extracts the payload when it has type `T`.
    pub fn get<T: TryFrom<FieldValue>>(self) -> Option<T> {
        T::try_from(self).ok()
    }
}

macro_rules! value_conversions {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        $(
            impl TryFrom<FieldValue> for $ty {
                type Error = FieldValue;

                fn try_from(value: FieldValue) -> Result<Self, Self::Error> {
                    match value {
                        FieldValue::$variant(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }
        )+
    };
}

value_conversions! {
    Date => NaiveDateTime,
    Integer => i32,
    Number => f64,
    Duration => Duration,
    TimeUnit => TimeUnit,
    Rate => Rate,
    Boolean => bool,
    Guid => Uuid,
    Text => String,
    Binary => Vec<u8>,
    Constraint => ConstraintType,
    Priority => Priority,
    TaskType => TaskType,
    Accrue => AccrueType,
    WorkGroup => WorkGroup,
    EarnedValueMethod => EarnedValueMethod,
    RequestType => ResourceRequestType,
    BookingType => BookingType,
}

/// Project settings the decoder depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DecodeContext {
    pub defaults: TimeDefaults,
    pub default_duration_units: TimeUnit,
}

impl Default for DecodeContext {
    fn default() -> Self {
        Self {
            defaults: TimeDefaults::default(),
            default_duration_units: TimeUnit::Days,
        }
    }
}

impl DecodeContext {
    pub fn new(properties: &ProjectProperties) -> Self {
        Self {
            defaults: properties.time_defaults(),
            default_duration_units: properties.default_duration_units,
        }
    }
}

/// Reads a timestamp stored as a time (tenths of a minute) followed by a day count.
pub(crate) fn timestamp_at(data: &[u8], offset: usize) -> Option<NaiveDateTime> {
    let time = u16_at(data, offset)?;
    let days = u16_at(data, offset + 2)?;
    if days <= 1 || days == u16::MAX || time == u16::MAX {
        return None;
    }
    // Tiny day counts with a seconds component are displayed as NA by the application.
    if days < 100 && time % 10 != 0 {
        return None;
    }
    Some(epoch() + TimeDelta::days(i64::from(days)) + TimeDelta::seconds(i64::from(time) * 6))
}

/// Reads a timestamp stored as a single count of tenths of a minute since the epoch.
pub(crate) fn timestamp_from_tenths(data: &[u8], offset: usize) -> Option<NaiveDateTime> {
    let tenths = i32_at(data, offset)?;
    Some(epoch() + TimeDelta::seconds(i64::from(tenths) * 6))
}

/// Reads a date stored as a bare day count.
pub(crate) fn date_at(data: &[u8], offset: usize) -> Option<NaiveDate> {
    let days = u16_at(data, offset)?;
    if days == u16::MAX {
        return None;
    }
    Some(epoch().date() + TimeDelta::days(i64::from(days)))
}

/// Maps a stored duration unit code to a [`TimeUnit`].
pub(crate) fn duration_units(code: u16, default_units: TimeUnit) -> TimeUnit {
    match code & DURATION_UNITS_MASK {
        3 => TimeUnit::Minutes,
        4 => TimeUnit::ElapsedMinutes,
        5 => TimeUnit::Hours,
        6 => TimeUnit::ElapsedHours,
        8 => TimeUnit::ElapsedDays,
        9 => TimeUnit::Weeks,
        10 => TimeUnit::ElapsedWeeks,
        11 => TimeUnit::Months,
        12 => TimeUnit::ElapsedMonths,
        19 => TimeUnit::Percent,
        20 => TimeUnit::ElapsedPercent,
        21 => default_units,
        _ => TimeUnit::Days,
    }
}

/// Converts tenths of a minute to `units` with fixed conversion factors.
pub(crate) fn duration_from_tenths(tenths: f64, units: TimeUnit) -> Duration {
    let value = match units {
        TimeUnit::Minutes | TimeUnit::ElapsedMinutes => tenths / 10.0,
        TimeUnit::Hours | TimeUnit::ElapsedHours => tenths / 600.0,
        TimeUnit::Days => tenths / 4800.0,
        TimeUnit::ElapsedDays => tenths / 14400.0,
        TimeUnit::Weeks => tenths / 24000.0,
        TimeUnit::ElapsedWeeks => tenths / 100800.0,
        TimeUnit::Months => tenths / 96000.0,
        TimeUnit::ElapsedMonths => tenths / 432000.0,
        _ => tenths,
    };
    Duration::new(value, units)
}

/// Converts tenths of a minute to `units`, honouring the project's working-time settings
/// for the day, week and month units. `-1` marks an absent duration.
pub(crate) fn adjusted_duration(tenths: i32, units: TimeUnit, defaults: &TimeDefaults) -> Option<Duration> {
    if tenths == -1 {
        return None;
    }
    let tenths = f64::from(tenths);
    let per_unit = |tenths_per_unit: f64| {
        if tenths_per_unit == 0.0 {
            0.0
        } else {
            tenths / tenths_per_unit
        }
    };
    let minutes_per_day = f64::from(defaults.minutes_per_day);
    let value = match units {
        TimeUnit::Days => per_unit(minutes_per_day * 10.0),
        TimeUnit::ElapsedDays => tenths / TENTHS_PER_DAY as f64,
        TimeUnit::Weeks => per_unit(f64::from(defaults.minutes_per_week) * 10.0),
        TimeUnit::ElapsedWeeks => tenths / (TENTHS_PER_DAY * 7) as f64,
        TimeUnit::Months => per_unit(minutes_per_day * f64::from(defaults.days_per_month) * 10.0),
        TimeUnit::ElapsedMonths => tenths / (TENTHS_PER_DAY * 30) as f64,
        _ => return Some(duration_from_tenths(tenths, units)),
    };
    Some(Duration::new(value, units))
}

fn short(data: &[u8], offset: usize) -> Option<i32> {
    u16_at(data, offset).map(i32::from)
}

fn code<T: TryFrom<i32>>(data: &[u8], offset: usize) -> Option<T> {
    short(data, offset).and_then(|code| T::try_from(code).ok())
}

fn percentage(data: &[u8], offset: usize) -> Option<FieldValue> {
    short(data, offset)
        .filter(|value| (0..=100).contains(value))
        .map(FieldValue::Integer)
}

fn currency(data: &[u8], offset: usize) -> Option<f64> {
    let amount = f64_at(data, offset)?;
    // Amounts below a tenth of a cent are rounding noise.
    let amount = if amount.abs() < 0.1 { 0.0 } else { amount };
    Some(amount / 100.0)
}

fn work(data: &[u8], offset: usize) -> Option<Duration> {
    let amount = f64_at(data, offset)?;
    // Under one minute.
    let amount = if amount.abs() < 1000.0 { 0.0 } else { amount };
    Some(Duration::hours(amount / 60000.0))
}

fn work_units(data: &[u8], offset: usize) -> Option<TimeUnit> {
    match u8_at(data, offset)? {
        0 => None,
        code => TimeUnit::try_from(i32::from(code) - 1).ok(),
    }
}

fn rate_units(data: &[u8], offset: usize) -> Option<TimeUnit> {
    TimeUnit::try_from(short(data, offset)? - 1).ok()
}

/// Rules shared by fixed and variable data.
fn common_value(data_type: DataType, data: &[u8], offset: usize, default_units: TimeUnit) -> Option<FieldValue> {
    Some(match data_type {
        DataType::Date => FieldValue::Date(timestamp_at(data, offset)?),
        DataType::Integer => FieldValue::Integer(i32_at(data, offset)?),
        DataType::TimeUnits => FieldValue::TimeUnit(duration_units(u16_at(data, offset)?, default_units)),
        DataType::Constraint => FieldValue::Constraint(code(data, offset)?),
        DataType::Priority => FieldValue::Priority(Priority(short(data, offset)?)),
        DataType::TaskType => FieldValue::TaskType(code(data, offset)?),
        DataType::Accrue => FieldValue::Accrue(code(data, offset)?),
        DataType::WorkGroup => FieldValue::WorkGroup(code(data, offset)?),
        DataType::EarnedValueMethod => FieldValue::EarnedValueMethod(code(data, offset)?),
        DataType::ResourceRequestType => FieldValue::RequestType(code(data, offset)?),
        DataType::Percentage => percentage(data, offset)?,
        DataType::Short => FieldValue::Integer(short(data, offset)?),
        DataType::Boolean => FieldValue::Boolean(short(data, offset)? != 0),
        DataType::Delay => FieldValue::Duration(duration_from_tenths(
            f64::from(short(data, offset)?),
            TimeUnit::Hours,
        )),
        DataType::WorkUnits => FieldValue::TimeUnit(work_units(data, offset)?),
        DataType::RateUnits => FieldValue::TimeUnit(rate_units(data, offset)?),
        DataType::Currency | DataType::Units => FieldValue::Number(currency(data, offset)?),
        DataType::Rate => FieldValue::Rate(Rate::new(f64_at(data, offset)?, TimeUnit::Hours)),
        DataType::Work => FieldValue::Duration(work(data, offset)?),
        DataType::Guid => FieldValue::Guid(guid_at(data, offset)?),
        _ => return None,
    })
}

/// Decodes a value stored at `offset` of a fixed data record. `units` supplies the unit
/// of a duration value.
pub(crate) fn fixed_value(
    data_type: DataType,
    data: &[u8],
    offset: usize,
    units: impl FnOnce() -> TimeUnit,
    ctx: &DecodeContext,
) -> Option<FieldValue> {
    match data_type {
        DataType::Duration => {
            let tenths = i32_at(data, offset)?;
            adjusted_duration(tenths, units(), &ctx.defaults).map(FieldValue::Duration)
        }
        DataType::Binary
        | DataType::String
        | DataType::Notes
        | DataType::Numeric
        | DataType::BookingType => None,
        other => common_value(other, data, offset, ctx.default_duration_units),
    }
}

/// Decodes a value held in a variable data blob.
pub(crate) fn var_value(
    data_type: DataType,
    blob: &[u8],
    units: impl FnOnce() -> TimeUnit,
    ctx: &DecodeContext,
) -> Option<FieldValue> {
    match data_type {
        DataType::Duration => {
            if blob.len() == DURATION_TEXT_BLOB_LEN {
                return unicode_string_at(blob, 0).map(FieldValue::Text);
            }
            let tenths = i32_at(blob, 0)?;
            adjusted_duration(tenths, units(), &ctx.defaults).map(FieldValue::Duration)
        }
        DataType::String | DataType::Notes => unicode_string_at(blob, 0).map(FieldValue::Text),
        DataType::Numeric => f64_at(blob, 0).map(FieldValue::Number),
        DataType::BookingType => code(blob, 0).map(FieldValue::BookingType),
        DataType::Binary => Some(FieldValue::Binary(blob.to_vec())),
        other => common_value(other, blob, 0, ctx.default_duration_units),
    }
}
