//! Baseline work and cost curves.
//!
//! The header declares a tier count and the offset of the tier table. Each 20-byte tier
//! holds a cumulative total and the timestamp at which it was reached; the final tier is a
//! summary and carries no segment.

use chrono::NaiveDateTime;
use mpp_model::{TimephasedCost, TimephasedWork, WorkingTime};

use super::{cost_segment, work_segment, CurveContext};
use crate::blocks::bytes::{f64_at, u16_at, u32_at};
use crate::error::IgnoredErrors;
use crate::fields::timestamp_from_tenths;

const COUNT_OFFSET: usize = 0;
const TABLE_OFFSET: usize = 4;
const TIER_LEN: usize = 20;
const TIER_TIMESTAMP_OFFSET: usize = 16;
/// Curves need an opening tier, at least one segment tier and the summary tier.
const MIN_TIERS: usize = 3;

const WORK_UNITS_PER_MINUTE: f64 = 1000.0;
const COST_UNITS_PER_CURRENCY: f64 = 100.0;
const COST_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tier {
    cumulative: f64,
    end: NaiveDateTime,
}

/// Decodes a baseline work curve. Returns `None` when the curve holds no segment tiers.
pub(crate) fn baseline_work(
    data: &[u8],
    ctx: &CurveContext<'_>,
    errors: &mut IgnoredErrors,
) -> Option<Vec<TimephasedWork>> {
    let tiers = read_tiers(data, ctx, "work", errors)?;
    let calendar = ctx.calendar;
    let mut segments: Vec<TimephasedWork> = Vec::new();
    let mut carried = 0.0;

    for pair in tiers.windows(2) {
        let work = (pair[1].cumulative - pair[0].cumulative) / WORK_UNITS_PER_MINUTE + carried;
        carried = 0.0;
        let start = calendar.next_working_instant_at_or_after(pair[0].end);
        let finish = pair[1].end;
        if finish <= start {
            // Fold into the previous segment, or the next one when none exists yet.
            match segments.last_mut() {
                Some(previous) => {
                    let total = previous.total_amount.value * 60.0 + work;
                    *previous = work_segment(calendar, previous.start, previous.finish, total, false);
                }
                None => carried = work,
            }
            continue;
        }
        segments.push(work_segment(calendar, start, finish, work, false));
    }
    Some(segments)
}

/// Decodes a baseline cost curve. A tier adds a segment once the total has moved away
/// from the last emitted total; smaller movements accumulate into the next segment.
pub(crate) fn baseline_cost(
    data: &[u8],
    ctx: &CurveContext<'_>,
    errors: &mut IgnoredErrors,
) -> Option<Vec<TimephasedCost>> {
    let tiers = read_tiers(data, ctx, "cost", errors)?;
    let calendar = ctx.calendar;
    let mut segments: Vec<TimephasedCost> = Vec::new();
    let mut emitted = tiers.first().map_or(0.0, |tier| tier.cumulative);

    for pair in tiers.windows(2) {
        let amount = (pair[1].cumulative - emitted) / COST_UNITS_PER_CURRENCY;
        if amount.abs() < COST_EPSILON {
            continue;
        }
        let start = calendar.next_working_instant_at_or_after(pair[0].end);
        let finish = pair[1].end;
        if finish > start {
            segments.push(cost_segment(calendar, start, finish, amount));
        } else if let Some(previous) = segments.last_mut() {
            *previous = cost_segment(calendar, previous.start, previous.finish, previous.total_amount + amount);
        } else {
            continue;
        }
        emitted = pair[1].cumulative;
    }
    Some(segments)
}

/// Reads the usable tiers: all but the trailing summary.
fn read_tiers(data: &[u8], ctx: &CurveContext<'_>, kind: &str, errors: &mut IgnoredErrors) -> Option<Vec<Tier>> {
    let count = usize::from(u16_at(data, COUNT_OFFSET)?);
    if count < MIN_TIERS {
        return None;
    }
    let table = u32_at(data, TABLE_OFFSET)? as usize;

    let mut tiers = Vec::with_capacity(count - 1);
    for index in 0..count - 1 {
        let at = table + index * TIER_LEN;
        let tier = data.get(at..at + TIER_LEN).and_then(|tier| {
            Some(Tier {
                cumulative: f64_at(tier, 0)?,
                end: timestamp_from_tenths(tier, TIER_TIMESTAMP_OFFSET)?,
            })
        });
        match tier {
            Some(tier) => tiers.push(tier),
            None => {
                errors.record(format!(
                    "assignment {}: baseline {kind} curve truncated after {index} of {count} tiers",
                    ctx.assignment
                ));
                break;
            }
        }
    }
    Some(tiers)
}
