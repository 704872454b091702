//! Completed and planned work curves.
//!
//! Both curves are a header followed by fixed-size records. Each record holds the
//! cumulative work reached (thousandths of a minute) and the working time elapsed since
//! the curve origin (eightieths of a minute). The first record is the origin; every
//! following record closes one segment.

use chrono::NaiveDateTime;
use mpp_model::{TimephasedWork, WorkContour, WorkingTime};

use super::{work_segment, CurveContext};
use crate::blocks::bytes::{f64_at, i32_at, u16_at};
use crate::error::IgnoredErrors;

const COUNT_OFFSET: usize = 0;
const PLANNED_TOTAL_OFFSET: usize = 16;
const TRAILER_OFFSET: usize = 24;
const CONTOUR_OFFSET: usize = 28;

const OFFSET_UNITS_PER_MINUTE: f64 = 80.0;
const WORK_UNITS_PER_MINUTE: f64 = 1000.0;

/// Longest working span a curve may cover.
const MAX_SPAN_MINUTES: f64 = 366.0 * 20.0 * 24.0 * 60.0;

/// Planned record flags marking a segment edited by the user.
const PLANNED_MODIFIED_MASK: u16 = 0x3000;

struct CurveLayout {
    name: &'static str,
    records_at: usize,
    record_len: usize,
    flags_at: usize,
}

const COMPLETED: CurveLayout = CurveLayout {
    name: "completed",
    records_at: 32,
    record_len: 20,
    flags_at: 16,
};

const PLANNED: CurveLayout = CurveLayout {
    name: "planned",
    records_at: 40,
    record_len: 28,
    flags_at: 22,
};

/// One decoded curve record, in minutes.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    offset: f64,
    cumulative: f64,
    flags: u16,
}

/// Decodes a completed work curve starting at `origin`. The last segment ends at `finish`
/// when known, otherwise at the elapsed total recorded in the header.
pub(crate) fn completed_work(
    data: &[u8],
    ctx: &CurveContext<'_>,
    origin: NaiveDateTime,
    finish: Option<NaiveDateTime>,
    errors: &mut IgnoredErrors,
) -> Vec<TimephasedWork> {
    let points = read_points(data, &COMPLETED, ctx, errors);
    let finish = finish.or_else(|| trailer_finish(data, ctx, origin));
    assemble(&points, ctx, origin, finish, |points, i| {
        i > 0 && points[i].flags != points[i - 1].flags
    })
}

/// Decodes a planned work curve starting at `origin`. `units` is the assignment's
/// percentage allocation, used when the curve only records the remaining total.
pub(crate) fn planned_work(
    data: &[u8],
    ctx: &CurveContext<'_>,
    origin: NaiveDateTime,
    finish: Option<NaiveDateTime>,
    units: f64,
    errors: &mut IgnoredErrors,
) -> Vec<TimephasedWork> {
    if u16_at(data, COUNT_OFFSET) == Some(0) {
        return remaining_work(data, ctx, origin, units, errors);
    }
    let points = read_points(data, &PLANNED, ctx, errors);
    let finish = finish.or_else(|| trailer_finish(data, ctx, origin));
    assemble(&points, ctx, origin, finish, |points, i| {
        let flags = points[i].flags;
        flags & PLANNED_MODIFIED_MASK != 0 || (i > 0 && flags == 0)
    })
}

/// The contour recorded in a planned work curve.
pub(crate) fn work_contour(data: &[u8]) -> Option<WorkContour> {
    u16_at(data, CONTOUR_OFFSET).and_then(|code| WorkContour::try_from(i32::from(code)).ok())
}

/// A planned curve without records: the whole remaining total as one segment.
fn remaining_work(
    data: &[u8],
    ctx: &CurveContext<'_>,
    origin: NaiveDateTime,
    units: f64,
    errors: &mut IgnoredErrors,
) -> Vec<TimephasedWork> {
    let Some(total) = f64_at(data, PLANNED_TOTAL_OFFSET).map(|w| w / WORK_UNITS_PER_MINUTE) else {
        return Vec::new();
    };
    if total <= 0.0 || units <= 0.0 || total.is_nan() || units.is_nan() {
        return Vec::new();
    }
    let span = total * 100.0 / units;
    if !span.is_finite() || span > MAX_SPAN_MINUTES {
        errors.record(format!(
            "assignment {}: planned work total {total} minutes at {units}% is out of range",
            ctx.assignment
        ));
        return Vec::new();
    }
    let calendar = ctx.calendar;
    let start = calendar.next_working_instant_at_or_after(origin);
    let finish = calendar.add_working_minutes(start, span);
    if finish <= start {
        return Vec::new();
    }
    vec![work_segment(calendar, start, finish, total, false)]
}

fn trailer_finish(data: &[u8], ctx: &CurveContext<'_>, origin: NaiveDateTime) -> Option<NaiveDateTime> {
    let elapsed = i32_at(data, TRAILER_OFFSET).filter(|t| *t > 0)?;
    Some(
        ctx.calendar
            .add_working_minutes(origin, f64::from(elapsed) / OFFSET_UNITS_PER_MINUTE),
    )
}

/// Reads the records of a curve. Offsets never move backwards; an offset outside the
/// elapsed total of the header repeats the previous one.
fn read_points(data: &[u8], layout: &CurveLayout, ctx: &CurveContext<'_>, errors: &mut IgnoredErrors) -> Vec<Point> {
    let count = usize::from(u16_at(data, COUNT_OFFSET).unwrap_or(0));
    let trailer = i32_at(data, TRAILER_OFFSET).filter(|t| *t > 0);
    let mut points: Vec<Point> = Vec::with_capacity(count);
    let mut last_offset = 0.0;

    for index in 0..count {
        let at = layout.records_at + index * layout.record_len;
        let Some(record) = data.get(at..at + layout.record_len) else {
            errors.record(format!(
                "assignment {}: {} work curve truncated after {index} of {count} records",
                ctx.assignment, layout.name
            ));
            break;
        };
        let (Some(raw_offset), Some(cumulative), Some(flags)) =
            (i32_at(record, 0), f64_at(record, 4), u16_at(record, layout.flags_at))
        else {
            break;
        };
        let in_range = raw_offset >= 0 && trailer.map_or(true, |t| raw_offset <= t);
        if in_range {
            last_offset = (f64::from(raw_offset) / OFFSET_UNITS_PER_MINUTE).max(last_offset);
        }
        points.push(Point {
            offset: last_offset,
            cumulative: cumulative.trunc() / WORK_UNITS_PER_MINUTE,
            flags,
        });
    }
    points
}

/// Turns consecutive records into segments. A segment that would collapse to a single
/// instant hands its work to its neighbour so the curve total is preserved.
fn assemble(
    points: &[Point],
    ctx: &CurveContext<'_>,
    origin: NaiveDateTime,
    last_finish: Option<NaiveDateTime>,
    modified: impl Fn(&[Point], usize) -> bool,
) -> Vec<TimephasedWork> {
    let calendar = ctx.calendar;
    let mut segments: Vec<TimephasedWork> = Vec::new();
    let mut carried = 0.0;

    for index in 1..points.len() {
        let (from, to) = (points[index - 1], points[index]);
        let work = (to.cumulative - from.cumulative).max(0.0) + carried;
        carried = 0.0;

        let start = calendar.next_working_instant_at_or_after(calendar.add_working_minutes(origin, from.offset));
        let finish = match last_finish {
            Some(finish) if index + 1 == points.len() => finish,
            _ => calendar.add_working_minutes(origin, to.offset),
        };

        if finish <= start {
            match segments.last_mut() {
                Some(previous) => add_minutes(previous, calendar, work),
                None => carried = work,
            }
            continue;
        }
        segments.push(work_segment(calendar, start, finish, work, modified(points, index)));
    }

    if carried > 0.0 {
        log::debug!("assignment {}: work curve collapsed to a single instant", ctx.assignment);
    }
    segments
}

fn add_minutes(segment: &mut TimephasedWork, calendar: &mpp_model::Calendar, minutes: f64) {
    let total = segment.total_amount.value * 60.0 + minutes;
    *segment = work_segment(calendar, segment.start, segment.finish, total, segment.modified);
}
