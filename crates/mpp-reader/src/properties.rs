//! Project-wide settings held in the root `Props` stream.

use mpp_model::{FieldKind, ProjectProperties, ResourceField, TaskField, TimeUnit};
use uuid::Uuid;

use crate::blocks::bytes::{i16_at, u8_at, unicode_string_at};
use crate::blocks::Props;
use crate::container::FormatInfo;
use crate::fields::{duration_units, timestamp_at};

const PROJECT_START_DATE: i32 = 37748738;
const PROJECT_FINISH_DATE: i32 = 37748739;
const DEFAULT_CALENDAR_NAME: i32 = 37748750;
const CURRENCY_SYMBOL: i32 = 37748752;
const CURRENCY_DIGITS: i32 = 37748754;
const DURATION_UNITS: i32 = 37748757;
const WORK_UNITS: i32 = 37748758;
const MINUTES_PER_DAY: i32 = 37748765;
const MINUTES_PER_WEEK: i32 = 37748766;
const STANDARD_RATE: i32 = 37748767;
const OVERTIME_RATE: i32 = 37748768;
const GUID: i32 = 37748777;
const STATUS_DATE: i32 = 37748805;
const DAYS_PER_MONTH: i32 = 37753743;
const BASELINE_DATE: i32 = 37753749;
const CURRENCY_CODE: i32 = 37753787;
const PASSWORD_FLAG: i32 = 893386752;
const PROJECT_FILE_PATH: i32 = 893386760;
const TASK_FIELD_NAME_ALIASES: i32 = 1048577;
const RESOURCE_FIELD_NAME_ALIASES: i32 = 1048578;

const PASSWORD_REQUIRED_TO_READ: u8 = 0x01;

/// Position of a field in the alias lists.
const TASK_ALIAS_SLOTS: &[(usize, TaskField)] = &[(118, TaskField::Text1), (149, TaskField::Number1)];
const RESOURCE_ALIAS_SLOTS: &[(usize, ResourceField)] = &[(52, ResourceField::Text1)];

/// Decodes the root properties stream.
pub(crate) fn read_properties(props: &Props, format: FormatInfo) -> ProjectProperties {
    let mut properties = ProjectProperties::new(format.generation);
    properties.application_version = format.application_version;

    if let Some(minutes) = props.int(MINUTES_PER_DAY).filter(|m| *m > 0) {
        properties.minutes_per_day = minutes as u32;
    }
    if let Some(minutes) = props.int(MINUTES_PER_WEEK).filter(|m| *m > 0) {
        properties.minutes_per_week = minutes as u32;
    }
    if let Some(days) = props.short(DAYS_PER_MONTH).filter(|d| *d > 0) {
        properties.days_per_month = days as u32;
    }
    if let Some(code) = props.short(DURATION_UNITS) {
        properties.default_duration_units = duration_units(code as u16, TimeUnit::Days);
    }
    if let Some(unit) = props
        .short(WORK_UNITS)
        .and_then(|code| TimeUnit::try_from(i32::from(code) - 1).ok())
    {
        properties.default_work_units = unit;
    }

    properties.default_standard_rate = props.double(STANDARD_RATE);
    properties.default_overtime_rate = props.double(OVERTIME_RATE);
    properties.currency_symbol = props.unicode_string(CURRENCY_SYMBOL);
    properties.currency_code = props.unicode_string(CURRENCY_CODE);
    properties.currency_digits = props.bytes(CURRENCY_DIGITS).and_then(|b| i16_at(b, 0)).map(i32::from);

    let timestamp = |key| props.bytes(key).and_then(|b| timestamp_at(b, 0));
    properties.start_date = timestamp(PROJECT_START_DATE);
    properties.finish_date = timestamp(PROJECT_FINISH_DATE);
    properties.status_date = timestamp(STATUS_DATE);
    properties.baseline_date = timestamp(BASELINE_DATE);

    properties.default_calendar_name = props.unicode_string(DEFAULT_CALENDAR_NAME);
    properties.project_file_path = props.unicode_string(PROJECT_FILE_PATH);
    properties.guid = props.bytes(GUID).and_then(read_guid);
    properties.password_protected = props
        .bytes(PASSWORD_FLAG)
        .and_then(|b| u8_at(b, 0))
        .is_some_and(|flag| flag & PASSWORD_REQUIRED_TO_READ != 0);

    read_aliases(&mut properties, props.bytes(TASK_FIELD_NAME_ALIASES), TASK_ALIAS_SLOTS);
    read_aliases(&mut properties, props.bytes(RESOURCE_FIELD_NAME_ALIASES), RESOURCE_ALIAS_SLOTS);

    properties
}

/// Generation 9 writes the GUID as text, later generations as 16 raw bytes.
fn read_guid(data: &[u8]) -> Option<Uuid> {
    if data.len() > 16 {
        let text = unicode_string_at(data, 0)?;
        return Uuid::parse_str(text.trim_matches(|c| c == '{' || c == '}')).ok();
    }
    crate::blocks::bytes::guid_at(data, 0)
}

/// Alias lists are consecutive NUL-terminated UTF-16 strings, one per field slot.
fn read_aliases<F: FieldKind>(properties: &mut ProjectProperties, data: Option<&[u8]>, slots: &[(usize, F)]) {
    let Some(data) = data else {
        return;
    };
    let mut offset = 0;
    let mut slot = 0;
    while offset < data.len() {
        let Some(alias) = unicode_string_at(data, offset) else {
            break;
        };
        offset += (alias.encode_utf16().count() + 1) * 2;
        if !alias.is_empty() {
            if let Some((_, field)) = slots.iter().find(|(index, _)| *index == slot) {
                properties.custom_field_aliases.insert(field.type_code(), alias);
            }
        }
        slot += 1;
    }
}
