//! Tasks from the `TBkndTask` storage.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use mpp_model::{Task, TaskField};

use crate::blocks::bytes::{i32_at, i64_at, u16_at};
use crate::blocks::Props;
use crate::container::StreamSource;
use crate::error::{IgnoredErrors, ReadError};
use crate::fields::{apply_fields, DecodeContext, FieldMap, Setter, TASK_DEFAULTS, TASK_FIELD_MAP_KEYS};
use crate::flags::FlagTable;
use crate::generation::GenerationTable;
use crate::hyperlink::read_hyperlink;
use crate::reconcile::{reconcile_tasks, TaskOrder, TaskRecords, NULL_TASK_BLOCK_SIZE, TASK_ID_FIXED_OFFSET};
use crate::storage::EntityStreams;

/// Offset of the display order key in the second fixed data block.
const ORDER_KEY_OFFSET: usize = 16;
const ESTIMATED_MASK: u16 = 0x20;
/// Calendar id stored for tasks using the project calendar.
const NO_CALENDAR: i32 = -1;

static TASK_SETTERS: &[(TaskField, Setter<Task>)] = &[
    (TaskField::Name, |t, v| t.name = v.get::<String>().filter(|s| !s.is_empty())),
    (TaskField::Wbs, |t, v| t.wbs = v.get()),
    (TaskField::Notes, |t, v| t.notes = v.get()),
    (TaskField::Text1, |t, v| t.text1 = v.get()),
    (TaskField::Number1, |t, v| t.number1 = v.get()),
    (TaskField::OutlineLevel, |t, v| t.outline_level = v.get()),
    (TaskField::ParentTaskUniqueId, |t, v| t.parent_unique_id = v.get()),
    (TaskField::CalendarUniqueId, |t, v| {
        t.calendar_unique_id = v.get::<i32>().filter(|id| *id != NO_CALENDAR)
    }),
    (TaskField::Guid, |t, v| t.guid = v.get()),
    (TaskField::HyperlinkData, |t, v| {
        t.hyperlink = v.get::<Vec<u8>>().and_then(|blob| read_hyperlink(&blob, false))
    }),
    (TaskField::Start, |t, v| t.start = v.get()),
    (TaskField::Finish, |t, v| t.finish = v.get()),
    (TaskField::ActualStart, |t, v| t.actual_start = v.get()),
    (TaskField::ActualFinish, |t, v| t.actual_finish = v.get()),
    (TaskField::BaselineStart, |t, v| t.baseline_start = v.get()),
    (TaskField::BaselineFinish, |t, v| t.baseline_finish = v.get()),
    (TaskField::ScheduledStart, |t, v| t.scheduled_start = v.get()),
    (TaskField::ScheduledFinish, |t, v| t.scheduled_finish = v.get()),
    (TaskField::ConstraintDate, |t, v| t.constraint_date = v.get()),
    (TaskField::Deadline, |t, v| t.deadline = v.get()),
    (TaskField::Created, |t, v| t.created = v.get()),
    (TaskField::Resume, |t, v| t.resume = v.get()),
    (TaskField::Stop, |t, v| t.stop = v.get()),
    (TaskField::Duration, |t, v| t.duration = v.get()),
    (TaskField::ActualDuration, |t, v| t.actual_duration = v.get()),
    (TaskField::RemainingDuration, |t, v| t.remaining_duration = v.get()),
    (TaskField::BaselineDuration, |t, v| t.baseline_duration = v.get()),
    (TaskField::ScheduledDuration, |t, v| t.scheduled_duration = v.get()),
    (TaskField::LevelingDelay, |t, v| t.leveling_delay = v.get()),
    (TaskField::DurationUnits, |t, v| t.duration_units = v.get()),
    (TaskField::Work, |t, v| t.work = v.get()),
    (TaskField::ActualWork, |t, v| t.actual_work = v.get()),
    (TaskField::RemainingWork, |t, v| t.remaining_work = v.get()),
    (TaskField::BaselineWork, |t, v| t.baseline_work = v.get()),
    (TaskField::Cost, |t, v| t.cost = v.get()),
    (TaskField::ActualCost, |t, v| t.actual_cost = v.get()),
    (TaskField::FixedCost, |t, v| t.fixed_cost = v.get()),
    (TaskField::BaselineCost, |t, v| t.baseline_cost = v.get()),
    (TaskField::FixedCostAccrual, |t, v| t.fixed_cost_accrual = v.get()),
    (TaskField::PercentComplete, |t, v| t.percent_complete = v.get()),
    (TaskField::PercentWorkComplete, |t, v| t.percent_work_complete = v.get()),
    (TaskField::ConstraintType, |t, v| t.constraint_type = v.get()),
    (TaskField::Priority, |t, v| t.priority = v.get()),
    (TaskField::Type, |t, v| t.task_type = v.get()),
    (TaskField::EarnedValueMethod, |t, v| t.earned_value_method = v.get()),
];

/// Reads every task of the project, in display order.
pub(crate) fn read_tasks(
    source: &mut dyn StreamSource,
    table: &GenerationTable,
    props: &Props,
    ctx: &DecodeContext,
    application_version: Option<u32>,
    errors: &mut IgnoredErrors,
) -> Result<Vec<Task>, ReadError> {
    let map = FieldMap::load(props, TASK_FIELD_MAP_KEYS, table.type_is_var_key, TASK_DEFAULTS);
    let streams = EntityStreams::load(
        source,
        table,
        &table.task,
        [map.max_fixed_size(0), map.max_fixed_size(1)],
        errors,
    )?;
    let reader = TaskReader {
        streams: &streams,
        map: &map,
        flags: table.task_flags.select(application_version),
        keyed_order: table.task.fixed2.is_some(),
        ctx,
    };
    reader.read()
}

/// Decodes tasks from loaded streams.
struct TaskReader<'a> {
    streams: &'a EntityStreams,
    map: &'a FieldMap<TaskField>,
    flags: &'static FlagTable<Task>,
    /// Whether display order keys are stored in the second fixed data block. Otherwise
    /// tasks are ordered by their recorded id.
    keyed_order: bool,
    ctx: &'a DecodeContext,
}

/// Tasks collected so far, by unique id, with the bookkeeping needed to renumber them.
#[derive(Default)]
struct Collected {
    tasks: BTreeMap<i32, Task>,
    by_id: HashMap<i32, i32>,
    order: TaskOrder,
}

impl Collected {
    fn add(&mut self, task: Task) {
        if let Some(id) = task.id {
            self.by_id.insert(id, task.unique_id);
        }
        self.tasks.insert(task.unique_id, task);
    }

    /// Records a blank row unless one already holds display position `id`.
    fn add_null(&mut self, unique_id: i32, id: i32) {
        if self.order.has_position(id) {
            return;
        }
        let mut task = Task::new(unique_id);
        task.null = true;
        task.id = Some(id);
        self.order.add_positioned(id, unique_id);
        self.add(task);
    }

    fn remove(&mut self, unique_id: i32) {
        if let Some(task) = self.tasks.remove(&unique_id) {
            if let Some(id) = task.id {
                if self.by_id.get(&id) == Some(&unique_id) {
                    self.by_id.remove(&id);
                }
            }
        }
        self.order.remove(unique_id);
    }
}

impl TaskReader<'_> {
    fn read(&self) -> Result<Vec<Task>, ReadError> {
        let streams = self.streams;
        let max_size = self.map.max_fixed_size(0);
        let records = TaskRecords {
            meta: &streams.meta,
            fixed: &streams.fixed,
            fixed2: streams.fixed2.as_ref(),
            var_meta: streams.var.meta(),
        };
        let unique_id_offset = self.map.fixed_offset(TaskField::UniqueId).unwrap_or(0);
        let identities = reconcile_tasks(&records, unique_id_offset, max_size);

        let mut collected = Collected::default();
        for (unique_id, index) in identities.live() {
            let Some(data) = streams.fixed.record(index) else {
                continue;
            };
            if data.len() == NULL_TASK_BLOCK_SIZE {
                if let (Some(unique_id), Some(id)) = (i32_at(data, 0), i32_at(data, TASK_ID_FIXED_OFFSET)) {
                    collected.add_null(unique_id, id);
                }
                continue;
            }
            let data: Cow<'_, [u8]> = if data.len() < max_size {
                if unique_id != 0 {
                    log::debug!("skipping short task record {index} for unique id {unique_id}");
                    continue;
                }
                let mut padded = data.to_vec();
                padded.resize(max_size + 8, 0);
                Cow::Owned(padded)
            } else {
                Cow::Borrowed(data)
            };
            self.read_task(&mut collected, unique_id, index, &data);
        }

        let zero_based = collected.tasks.contains_key(&0);
        let numbering = collected.order.renumber(zero_based)?;
        let mut tasks = Vec::with_capacity(numbering.len());
        for (unique_id, id) in numbering {
            if let Some(mut task) = collected.tasks.remove(&unique_id) {
                task.id = Some(id);
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    fn read_task(&self, collected: &mut Collected, unique_id: i32, index: usize, data: &[u8]) {
        let streams = self.streams;
        let id_offset = self.map.fixed_offset(TaskField::Id).unwrap_or(TASK_ID_FIXED_OFFSET);
        let Some(id) = i32_at(data, id_offset) else {
            return;
        };

        if let Some(existing) = collected.by_id.get(&id).copied() {
            if !streams.var.meta().contains(unique_id) {
                log::debug!("task {unique_id} duplicates display id {id} and carries no data");
                return;
            }
            if collected.tasks.get(&existing).is_some_and(|task| task.name.is_none()) {
                collected.remove(existing);
            }
        }

        let data2 = streams.fixed2.as_ref().and_then(|fixed2| fixed2.record(index));
        let mut task = Task::new(unique_id);
        apply_fields(&mut task, TASK_SETTERS, self.map, unique_id, &[Some(data), data2], &streams.var, self.ctx);
        task.id = Some(id);

        let (meta, meta2) = streams.meta_items(index);
        if let Some(meta) = meta {
            self.flags.apply(&mut task, meta, meta2);
        }
        task.estimated = self
            .map
            .fixed_offset(TaskField::ActualDurationUnits)
            .and_then(|offset| u16_at(data, offset))
            .is_some_and(|units| units & ESTIMATED_MASK != 0);

        if task.name.is_none() && (task.start.is_none() || task.finish.is_none()) {
            // An unnamed, unscheduled row is a blank line.
            if let Some(id) = i32_at(data, TASK_ID_FIXED_OFFSET) {
                collected.add_null(unique_id, id);
            }
            return;
        }

        let order_key = data2
            .filter(|data2| data2.len() >= ORDER_KEY_OFFSET + 8)
            .and_then(|data2| i64_at(data2, ORDER_KEY_OFFSET));
        match order_key {
            Some(key) if self.keyed_order => collected.order.add_ordered(key, unique_id),
            _ if !self.keyed_order => collected.order.add_ordered(i64::from(id), unique_id),
            _ => collected.order.add_positioned(id, unique_id),
        }
        collected.add(task);
    }
}
