//! Timephased work and cost curves.
//!
//! Curves are stored as variable data blobs on assignments. Work curves hold cumulative
//! totals against working-time offsets and are placed on the assignment calendar; baseline
//! curves hold cumulative totals against absolute timestamps.

mod baseline;
mod splits;
mod work;

use chrono::NaiveDateTime;
use mpp_model::{
    Assignment, Calendar, Duration, TimeDefaults, TimephasedCost, TimephasedWork, WorkingTime,
};

use crate::error::IgnoredErrors;

pub(crate) use splits::apply_splits;

use baseline::{baseline_cost, baseline_work};
use work::{completed_work, planned_work, work_contour};

/// Minutes in the nominal day used for per-day amounts.
const NOMINAL_DAY_MINUTES: f64 = 480.0;

/// Where the segments of one assignment's curves are placed.
#[derive(Clone, Copy)]
pub(crate) struct CurveContext<'a> {
    pub calendar: &'a Calendar,
    pub assignment: i32,
}

/// The raw curve blobs of one assignment. Baseline slot 0 is the plain baseline.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TimephasedBlobs<'a> {
    pub complete: Option<&'a [u8]>,
    pub planned: Option<&'a [u8]>,
    pub actual_overtime: Option<&'a [u8]>,
    pub baseline_work: [Option<&'a [u8]>; 11],
    pub baseline_cost: [Option<&'a [u8]>; 11],
}

impl TimephasedBlobs<'_> {
    fn has_work_curves(&self) -> bool {
        self.complete.is_some() || self.planned.is_some()
    }
}

/// Decodes every curve of `assignment` onto its calendar.
pub(crate) fn read_assignment_curves(
    assignment: &mut Assignment,
    blobs: &TimephasedBlobs<'_>,
    calendar: &Calendar,
    read_baselines: bool,
    errors: &mut IgnoredErrors,
) {
    let ctx = CurveContext {
        calendar,
        assignment: assignment.unique_id,
    };

    if let Some(origin) = assignment.actual_start.or(assignment.start) {
        let completed_finish = assignment.actual_finish.or(assignment.resume);
        if let Some(data) = blobs.complete {
            assignment.timephased.complete_work = completed_work(data, &ctx, origin, completed_finish, errors);
        }
        if let Some(data) = blobs.actual_overtime {
            assignment.timephased.actual_overtime_work = completed_work(data, &ctx, origin, completed_finish, errors);
        }
    }

    let planned_origin = assignment
        .timephased
        .complete_work
        .last()
        .map(|segment| segment.finish)
        .or(assignment.resume)
        .or(assignment.start);
    if let (Some(data), Some(origin)) = (blobs.planned, planned_origin) {
        let units = assignment.units.filter(|u| *u > 0.0).unwrap_or(100.0);
        assignment.timephased.planned_work = planned_work(data, &ctx, origin, assignment.finish, units, errors);
        if assignment.work_contour.is_none() {
            assignment.work_contour = work_contour(data);
        }
    }

    if !blobs.has_work_curves() {
        if let (Some(start), Some(finish), Some(work)) = (assignment.start, assignment.finish, assignment.work) {
            assignment.timephased.planned_work = flat_work(calendar, start, finish, work);
        }
    }

    if read_baselines {
        for slot in 0..blobs.baseline_work.len() {
            if let Some(data) = blobs.baseline_work[slot] {
                assignment.timephased.baseline_work[slot] = baseline_work(data, &ctx, errors);
            }
            if let Some(data) = blobs.baseline_cost[slot] {
                assignment.timephased.baseline_cost[slot] = baseline_cost(data, &ctx, errors);
            }
        }
    }
}

/// A single segment spreading `work` evenly between `start` and `finish`.
pub(crate) fn flat_work(
    calendar: &Calendar,
    start: NaiveDateTime,
    finish: NaiveDateTime,
    work: Duration,
) -> Vec<TimephasedWork> {
    let start = calendar.next_working_instant_at_or_after(start);
    if finish <= start {
        return Vec::new();
    }
    let minutes = work.to_minutes(&TimeDefaults::default()).unwrap_or(0.0);
    vec![work_segment(calendar, start, finish, minutes, false)]
}

/// Builds a work segment of `minutes`, deriving its per-day amount from the calendar.
pub(crate) fn work_segment(
    calendar: &Calendar,
    start: NaiveDateTime,
    finish: NaiveDateTime,
    minutes: f64,
    modified: bool,
) -> TimephasedWork {
    TimephasedWork {
        start,
        finish,
        total_amount: Duration::hours(minutes / 60.0),
        amount_per_day: Duration::hours(per_day(calendar, start, finish, minutes) / 60.0),
        modified,
    }
}

pub(crate) fn cost_segment(
    calendar: &Calendar,
    start: NaiveDateTime,
    finish: NaiveDateTime,
    amount: f64,
) -> TimephasedCost {
    TimephasedCost {
        start,
        finish,
        total_amount: amount,
        amount_per_day: per_day(calendar, start, finish, amount),
    }
}

/// Scales `amount` to a nominal 8 hour day over the working span of `start..finish`.
fn per_day(calendar: &Calendar, start: NaiveDateTime, finish: NaiveDateTime, amount: f64) -> f64 {
    let span = calendar.working_minutes_between(start, finish);
    if span <= 0.0 {
        return amount;
    }
    amount * NOMINAL_DAY_MINUTES / span
}
