//! Base, derived and resource calendars from the `TBkndCal` storage.
//!
//! Each fixed record holds one or more 12-byte entries (calendar id, base calendar id,
//! resource id). The working week and the exceptions live in a variable data blob: seven
//! 60-byte day blocks followed by the exception list.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveTime;
use mpp_model::{Calendar, CalendarDay, CalendarException, WorkingRange};

use crate::blocks::bytes::{guid_at, i16_at, i32_at, u16_at, unicode_string_at};
use crate::blocks::Props;
use crate::error::IgnoredErrors;
use crate::fields::date_at;
use crate::generation::{CalendarLayout, ExceptionLayout};
use crate::storage::EntityStreams;

const CALENDAR_NAME_KEY: u16 = 1;
const CALENDAR_HOURS_KEY: u16 = 8;

/// Props entry holding the hours blob used for base calendars without one.
const DEFAULT_CALENDAR_HOURS: i32 = 37753736;

const ENTRY_LEN: usize = 12;
const CALENDAR_ID_OFFSET: usize = 0;
const BASE_ID_OFFSET: usize = 4;
const RESOURCE_ID_OFFSET: usize = 8;

const DAY_BLOCK_LEN: usize = 60;
const DEFAULT_DAY_FLAG: i16 = 1;
const MAX_PERIODS: usize = 5;
const PERIOD_STARTS_OFFSET: usize = 8;
const PERIOD_DURATIONS_OFFSET: usize = 20;

const EXCEPTION_COUNT_OFFSET: usize = 420;
const EXCEPTIONS_OFFSET: usize = 424;

/// Calendars read from a file, plus the resource each resource calendar belongs to.
#[derive(Debug, Clone, Default)]
pub(crate) struct CalendarSet {
    pub calendars: Vec<Calendar>,
    /// Resource unique id to calendar unique id.
    pub resource_calendars: BTreeMap<i32, i32>,
}

pub(crate) fn read_calendars(
    streams: &EntityStreams,
    layout: &CalendarLayout,
    props: &Props,
    errors: &mut IgnoredErrors,
) -> CalendarSet {
    let default_hours = props.bytes(DEFAULT_CALENDAR_HOURS);
    let default_week = default_hours.map(|data| read_week(data, layout.hours_offset, None, true));

    let mut set = CalendarSet::default();
    let mut seen = HashSet::new();

    for index in 0..streams.fixed.record_count() {
        let Some(record) = streams.fixed.record(index) else {
            continue;
        };
        let guid = streams
            .fixed2
            .as_ref()
            .and_then(|fixed2| fixed2.record(index))
            .and_then(|data| guid_at(data, 0));

        for entry in record.chunks_exact(ENTRY_LEN) {
            let (Some(unique_id), Some(base_id), Some(resource_id)) = (
                i32_at(entry, CALENDAR_ID_OFFSET),
                i32_at(entry, BASE_ID_OFFSET),
                i32_at(entry, RESOURCE_ID_OFFSET),
            ) else {
                continue;
            };
            if unique_id <= 0 || !seen.insert(unique_id) {
                continue;
            }

            let hours = streams.var.blob(unique_id, CALENDAR_HOURS_KEY);
            let mut calendar = Calendar::new(unique_id);
            calendar.guid = guid;

            if base_id <= 0 || base_id == unique_id {
                calendar.name = streams
                    .var
                    .unicode_string(unique_id, CALENDAR_NAME_KEY)
                    .filter(|name| !name.is_empty());
                match hours.or(default_hours) {
                    Some(data) => {
                        calendar.days = read_week(data, layout.hours_offset, default_week.as_ref(), true);
                        calendar.exceptions = read_exceptions(data, &layout.exception, unique_id, errors);
                    }
                    None => calendar.days = standard_week(),
                }
                // Base calendars occasionally carry a resource id; keep it if unclaimed.
                if resource_id > 0 {
                    set.resource_calendars.entry(resource_id).or_insert(unique_id);
                }
            } else {
                calendar.parent_unique_id = Some(base_id);
                match hours {
                    Some(data) => {
                        calendar.days = read_week(data, layout.hours_offset, None, false);
                        calendar.exceptions = read_exceptions(data, &layout.exception, unique_id, errors);
                    }
                    None => calendar.days = std::array::from_fn(|_| CalendarDay::inherited()),
                }
                if resource_id > 0 {
                    calendar.resource_unique_id = Some(resource_id);
                    set.resource_calendars.insert(resource_id, unique_id);
                }
            }
            set.calendars.push(calendar);
        }
    }

    drop_orphans(&mut set, errors);
    set
}

/// Removes derived calendars whose base calendar is missing or unnamed.
fn drop_orphans(set: &mut CalendarSet, errors: &mut IgnoredErrors) {
    let named_bases: HashSet<i32> = set
        .calendars
        .iter()
        .filter(|c| c.name.is_some())
        .map(|c| c.unique_id)
        .collect();
    let mut removed = HashSet::new();
    set.calendars.retain(|calendar| match calendar.parent_unique_id {
        Some(base) if !named_bases.contains(&base) => {
            errors.record(format!(
                "calendar {} refers to unknown base calendar {base}",
                calendar.unique_id
            ));
            removed.insert(calendar.unique_id);
            false
        }
        _ => true,
    });
    set.resource_calendars
        .retain(|_, calendar| !removed.contains(calendar));
}

/// Monday to Friday standard days, weekends off.
fn standard_week() -> [CalendarDay; 7] {
    std::array::from_fn(|weekday| match weekday {
        1..=5 => CalendarDay::standard(),
        _ => CalendarDay::non_working(),
    })
}

/// Decodes the seven day blocks, Sunday first.
///
/// A day flagged as default inherits from the base calendar; for a base calendar it takes
/// the project default week when one exists and the standard week otherwise.
fn read_week(
    data: &[u8],
    hours_offset: usize,
    default_week: Option<&[CalendarDay; 7]>,
    is_base: bool,
) -> [CalendarDay; 7] {
    let standard = standard_week();
    std::array::from_fn(|weekday| {
        let offset = hours_offset + weekday * DAY_BLOCK_LEN;
        let flag = i16_at(data, offset).unwrap_or(DEFAULT_DAY_FLAG);
        if flag == DEFAULT_DAY_FLAG {
            if !is_base {
                return CalendarDay::inherited();
            }
            return default_week
                .map(|week| week[weekday].clone())
                .unwrap_or_else(|| standard[weekday].clone());
        }
        let count = u16_at(data, offset + 2).map_or(0, usize::from);
        CalendarDay::working(read_periods(
            data,
            count,
            offset + PERIOD_STARTS_OFFSET,
            offset + PERIOD_DURATIONS_OFFSET,
        ))
    })
}

/// Working periods stored as parallel arrays of start times and durations.
fn read_periods(data: &[u8], count: usize, starts: usize, durations: usize) -> Vec<WorkingRange> {
    (0..count.min(MAX_PERIODS))
        .filter_map(|k| {
            let start = time_at(data, starts + k * 2)?;
            let tenths = i32_at(data, durations + k * 4)?;
            Some(WorkingRange::new(start, u32::try_from(tenths / 10).unwrap_or(0)))
        })
        .collect()
}

/// A time of day stored in tenths of a minute; whole minutes are kept.
fn time_at(data: &[u8], offset: usize) -> Option<NaiveTime> {
    let tenths = u32::from(u16_at(data, offset)?);
    let seconds = (tenths / 10) * 60 % 86_400;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
}

fn read_exceptions(
    data: &[u8],
    layout: &ExceptionLayout,
    unique_id: i32,
    errors: &mut IgnoredErrors,
) -> Vec<CalendarException> {
    if data.len() <= EXCEPTION_COUNT_OFFSET {
        return Vec::new();
    }
    let count = u16_at(data, EXCEPTION_COUNT_OFFSET).unwrap_or(0);
    let mut exceptions = Vec::new();
    let mut offset = EXCEPTIONS_OFFSET;

    for _ in 0..count {
        if offset + layout.block_len > data.len() {
            errors.record(format!("calendar {unique_id}: exception block at {offset} is truncated"));
            break;
        }
        let block = &data[offset..];
        let count = u16_at(block, layout.period_count_offset).map_or(0, usize::from);
        let ranges = read_periods(block, count, layout.starts_offset, layout.durations_offset);

        let mut name = None;
        let mut name_len = 0;
        if let Some(len_offset) = layout.name_len_offset {
            let len = i32_at(block, len_offset).and_then(|len| usize::try_from(len).ok()).unwrap_or(0);
            name_len = len.div_ceil(4) * 4;
            if len != 0 {
                name = unicode_string_at(block, layout.block_len).filter(|n| !n.is_empty());
            }
        }

        if let (Some(from), Some(to)) = (date_at(block, 0), date_at(block, 2)) {
            exceptions.push(CalendarException {
                from,
                to,
                name,
                ranges,
            });
        }
        offset += layout.block_len + name_len;
    }

    exceptions.sort_by_key(|e| e.from);
    exceptions
}
