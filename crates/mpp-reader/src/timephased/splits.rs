//! Split tasks, recovered from the work curves of their first assignment.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use mpp_model::{Assignment, Task, TaskSplit, TimephasedWork};

/// Ranges a task needs before it counts as split: work, gap, work.
const MIN_SPLIT_RANGES: usize = 3;

fn has_work(segment: &TimephasedWork) -> bool {
    segment.total_amount.value != 0.0
}

/// Collapses each run of segments carrying work into one range and appends it to `ranges`.
///
/// With `continue_last`, the first segment extends the last range already in `ranges`.
fn push_ranges(ranges: &mut Vec<TaskSplit>, segments: &[TimephasedWork], mut continue_last: bool) {
    let mut previous: Option<&TimephasedWork> = None;
    for segment in segments {
        let joins_previous = previous.is_some_and(|p| has_work(p) && has_work(segment));
        match ranges.last_mut() {
            Some(last) if continue_last || joins_previous => last.finish = segment.finish,
            _ => ranges.push(TaskSplit {
                start: segment.start,
                finish: segment.finish,
                working: has_work(segment),
            }),
        }
        continue_last = false;
        previous = Some(segment);
    }
}

/// Work and gap ranges of a task, and the end of its completed part. `None` unless the
/// curves describe an interrupted task.
pub(crate) fn split_ranges(
    complete: &[TimephasedWork],
    planned: &[TimephasedWork],
) -> Option<(Vec<TaskSplit>, Option<NaiveDateTime>)> {
    let mut ranges = Vec::new();
    push_ranges(&mut ranges, complete, false);
    let continues = complete.last().is_some_and(has_work) && planned.first().is_some_and(has_work);
    push_ranges(&mut ranges, planned, continues);

    (ranges.len() >= MIN_SPLIT_RANGES).then(|| (ranges, complete.last().map(|segment| segment.finish)))
}

/// Sets the splits of every task from the first of its assignments that has work curves.
/// Milestones are never split.
pub(crate) fn apply_splits(tasks: &mut [Task], assignments: &[Assignment]) {
    let mut first: HashMap<i32, &Assignment> = HashMap::new();
    for assignment in assignments {
        let curves = &assignment.timephased;
        if curves.complete_work.is_empty() && curves.planned_work.is_empty() {
            continue;
        }
        first.entry(assignment.task_unique_id).or_insert(assignment);
    }

    for task in tasks.iter_mut().filter(|task| !task.milestone && task.splits.is_empty()) {
        let Some(assignment) = first.get(&task.unique_id) else {
            continue;
        };
        let curves = &assignment.timephased;
        if let Some((splits, complete_to)) = split_ranges(&curves.complete_work, &curves.planned_work) {
            log::debug!("task {} is split into {} ranges", task.unique_id, splits.len());
            task.splits = splits;
            task.split_complete_to = complete_to;
        }
    }
}
