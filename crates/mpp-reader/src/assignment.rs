//! Resource assignments from the `TBkndAssn` storage, with their timephased curves.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use mpp_model::{Assignment, AssignmentField, Calendar, ProjectFile, Resource, Task};

use crate::blocks::bytes::{i32_at, u32_at, u8_at};
use crate::blocks::Props;
use crate::container::StreamSource;
use crate::error::{IgnoredErrors, ReadError};
use crate::fields::{
    apply_fields, DecodeContext, FieldMap, Setter, ASSIGNMENT_DEFAULTS, ASSIGNMENT_FIELD_MAP_KEYS,
};
use crate::flags::FlagTable;
use crate::generation::GenerationTable;
use crate::hyperlink::read_hyperlink;
use crate::storage::EntityStreams;
use crate::timephased::{read_assignment_curves, TimephasedBlobs};
use crate::ReadOptions;

/// Resource id stored for assignments without a resource.
const NULL_RESOURCE_ID: i32 = -65535;
const META_OFFSET: usize = 4;

static ASSIGNMENT_SETTERS: &[(AssignmentField, Setter<Assignment>)] = &[
    (AssignmentField::TaskUniqueId, |a, v| {
        if let Some(id) = v.get() {
            a.task_unique_id = id;
        }
    }),
    (AssignmentField::ResourceUniqueId, |a, v| {
        a.resource_unique_id = v.get::<i32>().filter(|id| *id != NULL_RESOURCE_ID)
    }),
    (AssignmentField::Guid, |a, v| a.guid = v.get()),
    (AssignmentField::Notes, |a, v| a.notes = v.get()),
    (AssignmentField::HyperlinkData, |a, v| {
        a.hyperlink = v.get::<Vec<u8>>().and_then(|blob| read_hyperlink(&blob, true))
    }),
    (AssignmentField::Start, |a, v| a.start = v.get()),
    (AssignmentField::Finish, |a, v| a.finish = v.get()),
    (AssignmentField::ActualStart, |a, v| a.actual_start = v.get()),
    (AssignmentField::ActualFinish, |a, v| a.actual_finish = v.get()),
    (AssignmentField::Resume, |a, v| a.resume = v.get()),
    (AssignmentField::Created, |a, v| a.created = v.get()),
    (AssignmentField::AssignmentDelay, |a, v| a.delay = v.get()),
    (AssignmentField::AssignmentUnits, |a, v| a.units = v.get()),
    (AssignmentField::Work, |a, v| a.work = v.get()),
    (AssignmentField::ActualWork, |a, v| a.actual_work = v.get()),
    (AssignmentField::RemainingWork, |a, v| a.remaining_work = v.get()),
    (AssignmentField::OvertimeWork, |a, v| a.overtime_work = v.get()),
    (AssignmentField::Cost, |a, v| a.cost = v.get()),
    (AssignmentField::ActualCost, |a, v| a.actual_cost = v.get()),
    (AssignmentField::RemainingCost, |a, v| a.remaining_cost = v.get()),
    (AssignmentField::PercentWorkComplete, |a, v| a.percent_work_complete = v.get()),
    (AssignmentField::VariableRateUnits, |a, v| a.variable_rate_units = v.get()),
    (AssignmentField::ResourceRequestType, |a, v| a.request_type = v.get()),
    (AssignmentField::BaselineWork(0), |a, v| a.baseline_work[0] = v.get()),
    (AssignmentField::BaselineWork(1), |a, v| a.baseline_work[1] = v.get()),
    (AssignmentField::BaselineWork(2), |a, v| a.baseline_work[2] = v.get()),
    (AssignmentField::BaselineWork(3), |a, v| a.baseline_work[3] = v.get()),
    (AssignmentField::BaselineWork(4), |a, v| a.baseline_work[4] = v.get()),
    (AssignmentField::BaselineWork(5), |a, v| a.baseline_work[5] = v.get()),
    (AssignmentField::BaselineWork(6), |a, v| a.baseline_work[6] = v.get()),
    (AssignmentField::BaselineWork(7), |a, v| a.baseline_work[7] = v.get()),
    (AssignmentField::BaselineWork(8), |a, v| a.baseline_work[8] = v.get()),
    (AssignmentField::BaselineWork(9), |a, v| a.baseline_work[9] = v.get()),
    (AssignmentField::BaselineWork(10), |a, v| a.baseline_work[10] = v.get()),
    (AssignmentField::BaselineCost(0), |a, v| a.baseline_cost[0] = v.get()),
    (AssignmentField::BaselineCost(1), |a, v| a.baseline_cost[1] = v.get()),
    (AssignmentField::BaselineCost(2), |a, v| a.baseline_cost[2] = v.get()),
    (AssignmentField::BaselineCost(3), |a, v| a.baseline_cost[3] = v.get()),
    (AssignmentField::BaselineCost(4), |a, v| a.baseline_cost[4] = v.get()),
    (AssignmentField::BaselineCost(5), |a, v| a.baseline_cost[5] = v.get()),
    (AssignmentField::BaselineCost(6), |a, v| a.baseline_cost[6] = v.get()),
    (AssignmentField::BaselineCost(7), |a, v| a.baseline_cost[7] = v.get()),
    (AssignmentField::BaselineCost(8), |a, v| a.baseline_cost[8] = v.get()),
    (AssignmentField::BaselineCost(9), |a, v| a.baseline_cost[9] = v.get()),
    (AssignmentField::BaselineCost(10), |a, v| a.baseline_cost[10] = v.get()),
];

/// Reads the assignments of `project`'s tasks. Tasks, resources and calendars must already
/// be on `project`.
pub(crate) fn read_assignments(
    source: &mut dyn StreamSource,
    table: &GenerationTable,
    props: &Props,
    ctx: &DecodeContext,
    options: &ReadOptions,
    project: &ProjectFile,
    errors: &mut IgnoredErrors,
) -> Result<Vec<Assignment>, ReadError> {
    let map = FieldMap::load(props, ASSIGNMENT_FIELD_MAP_KEYS, table.type_is_var_key, ASSIGNMENT_DEFAULTS);
    let streams = EntityStreams::load(
        source,
        table,
        &table.assignment,
        [map.max_fixed_size(0), map.max_fixed_size(1)],
        errors,
    )?;
    let reader = AssignmentReader {
        streams: &streams,
        map: &map,
        flags: table
            .assignment_flags
            .select(project.properties.application_version),
        ctx,
        options,
    };
    Ok(reader.read(project, errors))
}

struct AssignmentReader<'a> {
    streams: &'a EntityStreams,
    map: &'a FieldMap<AssignmentField>,
    flags: &'static FlagTable<Assignment>,
    ctx: &'a DecodeContext,
    options: &'a ReadOptions,
}

impl AssignmentReader<'_> {
    fn read(&self, project: &ProjectFile, errors: &mut IgnoredErrors) -> Vec<Assignment> {
        let streams = self.streams;
        let max_size = self.map.max_fixed_size(0);
        let unique_id_offset = self.map.fixed_offset(AssignmentField::UniqueId).unwrap_or(0);
        let lookup = Lookup::new(project);
        let mut resolved: HashMap<i32, Calendar> = HashMap::new();
        let mut seen: HashSet<(i32, Option<i32>)> = HashSet::new();
        let mut assignments = Vec::new();

        for item in 0..streams.meta.item_count() {
            let Some(meta) = streams.meta.item(item) else {
                continue;
            };
            if u8_at(meta, 0) != Some(0) {
                continue;
            }
            let Some(index) = u32_at(meta, META_OFFSET)
                .and_then(|offset| streams.fixed.index_from_offset(offset as usize))
            else {
                continue;
            };
            let Some(data) = streams.fixed.record(index) else {
                continue;
            };
            let data: Cow<'_, [u8]> = if data.len() < max_size {
                let mut padded = data.to_vec();
                padded.resize(max_size, 0);
                Cow::Owned(padded)
            } else {
                Cow::Borrowed(data)
            };
            let Some(unique_id) = i32_at(&data, unique_id_offset) else {
                continue;
            };
            if !streams.var.meta().contains(unique_id) {
                continue;
            }

            let data2 = streams.fixed2.as_ref().and_then(|fixed2| fixed2.record(index));
            let mut assignment = Assignment::new(unique_id, 0);
            apply_fields(
                &mut assignment,
                ASSIGNMENT_SETTERS,
                self.map,
                unique_id,
                &[Some(&data), data2],
                &streams.var,
                self.ctx,
            );
            self.flags.apply(&mut assignment, meta, None);

            if !lookup.tasks.contains_key(&assignment.task_unique_id) {
                log::debug!(
                    "assignment {unique_id} refers to unknown task {}",
                    assignment.task_unique_id
                );
                continue;
            }
            if !seen.insert((assignment.task_unique_id, assignment.resource_unique_id)) {
                log::debug!("assignment {unique_id} repeats an existing task and resource pair");
                continue;
            }

            if self.options.read_timephased {
                let blobs = self.blobs(unique_id);
                let calendar = match lookup.assignment_calendar(&assignment) {
                    Some(calendar) => &*resolved
                        .entry(calendar.unique_id)
                        .or_insert_with(|| lookup.resolve(calendar)),
                    None => &lookup.fallback,
                };
                read_assignment_curves(&mut assignment, &blobs, calendar, self.options.read_baselines, errors);
            }
            assignments.push(assignment);
        }
        assignments
    }

    fn blobs(&self, unique_id: i32) -> TimephasedBlobs<'_> {
        let blob = |field| {
            self.map
                .var_key(field)
                .and_then(|key| self.streams.var.blob(unique_id, key))
        };
        TimephasedBlobs {
            complete: blob(AssignmentField::TimephasedActualWork),
            planned: blob(AssignmentField::TimephasedWork),
            actual_overtime: blob(AssignmentField::TimephasedActualOvertimeWork),
            baseline_work: std::array::from_fn(|slot| blob(AssignmentField::TimephasedBaselineWork(slot as u8))),
            baseline_cost: std::array::from_fn(|slot| blob(AssignmentField::TimephasedBaselineCost(slot as u8))),
        }
    }
}

/// Unique id lookups over the entities read before assignments.
struct Lookup<'a> {
    tasks: HashMap<i32, &'a Task>,
    resources: HashMap<i32, &'a Resource>,
    calendars: HashMap<i32, &'a Calendar>,
    default_calendar: Option<&'a Calendar>,
    /// Used when the project has no calendar at all.
    fallback: Calendar,
}

impl<'a> Lookup<'a> {
    fn new(project: &'a ProjectFile) -> Self {
        Self {
            tasks: project.tasks.iter().map(|t| (t.unique_id, t)).collect(),
            resources: project.resources.iter().map(|r| (r.unique_id, r)).collect(),
            calendars: project.calendars.iter().map(|c| (c.unique_id, c)).collect(),
            default_calendar: project.default_calendar(),
            fallback: Calendar::standard(0, "Standard"),
        }
    }

    /// The calendar an assignment is worked on: the resource's own calendar unless the
    /// task ignores it, then the task calendar, then the project default.
    fn assignment_calendar(&self, assignment: &Assignment) -> Option<&'a Calendar> {
        let task = self.tasks.get(&assignment.task_unique_id).copied();
        let resource_calendar = assignment
            .resource_unique_id
            .and_then(|id| self.resources.get(&id))
            .filter(|_| !task.is_some_and(|task| task.ignore_resource_calendar))
            .and_then(|resource| resource.calendar_unique_id);
        let task_calendar = task.and_then(|task| task.calendar_unique_id);

        resource_calendar
            .and_then(|id| self.calendars.get(&id).copied())
            .or_else(|| task_calendar.and_then(|id| self.calendars.get(&id).copied()))
            .or(self.default_calendar)
    }

    /// `calendar` with inherited days taken from its base calendar.
    fn resolve(&self, calendar: &Calendar) -> Calendar {
        let base = calendar
            .parent_unique_id
            .and_then(|id| self.calendars.get(&id).copied());
        calendar.resolve(base)
    }
}
