//! Predecessor links from the `TBkndCons` storage.

use std::collections::HashSet;

use mpp_model::{Duration, Relation, RelationType, Task};

use crate::blocks::bytes::{i32_at, u16_at, u32_at};
use crate::blocks::{FixedData, FixedMeta, FIXED_DATA, FIXED_META};
use crate::container::StreamSource;
use crate::error::ReadError;
use crate::fields::{adjusted_duration, duration_units, DecodeContext};
use crate::generation::{GenerationTable, RecordLayout};

const UNIQUE_ID_OFFSET: usize = 0;
const PREDECESSOR_OFFSET: usize = 4;
const SUCCESSOR_OFFSET: usize = 8;
const TYPE_OFFSET: usize = 12;
const LAG_UNITS_OFFSET: usize = 14;
const LAG_OFFSET: usize = 16;

/// Reads the relations between `tasks`. Files without a relation storage have none.
pub(crate) fn read_relations(
    source: &mut dyn StreamSource,
    table: &GenerationTable,
    ctx: &DecodeContext,
    tasks: &[Task],
) -> Result<Vec<Relation>, ReadError> {
    let layout = &table.relation;
    if !source.storage_exists(&table.storage_path(layout)) {
        log::debug!("no relation storage");
        return Ok(Vec::new());
    }
    let mut required = |stream: &str| -> Result<Vec<u8>, ReadError> {
        let path = table.stream_path(layout, stream);
        source.read_stream(&path)?.ok_or(ReadError::MissingStream(path))
    };
    let meta = FixedMeta::new(required(FIXED_META)?, layout.fixed_meta_item_size);
    let item_size = match layout.fixed {
        RecordLayout::Uniform { item_size } => item_size,
        _ => LAG_OFFSET + 4,
    };
    let fixed = FixedData::with_item_size(item_size, required(FIXED_DATA)?, false);
    Ok(decode_relations(&meta, &fixed, ctx, tasks))
}

fn decode_relations(meta: &FixedMeta, fixed: &FixedData, ctx: &DecodeContext, tasks: &[Task]) -> Vec<Relation> {
    let task_ids: HashSet<i32> = tasks.iter().map(|task| task.unique_id).collect();
    let known = |unique_id: i32| task_ids.contains(&unique_id);
    let mut relations = Vec::new();
    let mut last_unique_id = -1;

    for item in 0..meta.item_count() {
        let Some(item) = meta.item(item) else {
            continue;
        };
        // The deleted marker is a short.
        if u16_at(item, 0) != Some(0) {
            continue;
        }
        let Some(data) = u32_at(item, 4)
            .and_then(|offset| fixed.index_from_offset(offset as usize))
            .and_then(|index| fixed.record(index))
        else {
            continue;
        };
        let Some(relation) = decode_relation(data, ctx) else {
            continue;
        };

        // Stale copies repeat lower ids.
        if relation.unique_id <= last_unique_id {
            continue;
        }
        last_unique_id = relation.unique_id;

        if relation.predecessor_unique_id == relation.successor_unique_id {
            continue;
        }
        if !known(relation.predecessor_unique_id) || !known(relation.successor_unique_id) {
            log::debug!("relation {} links unknown tasks", relation.unique_id);
            continue;
        }
        relations.push(relation);
    }
    relations
}

fn decode_relation(data: &[u8], ctx: &DecodeContext) -> Option<Relation> {
    let relation_type = u16_at(data, TYPE_OFFSET)
        .and_then(|code| RelationType::try_from(i32::from(code)).ok())
        .unwrap_or_default();
    let units = duration_units(u16_at(data, LAG_UNITS_OFFSET)?, ctx.default_duration_units);
    let lag = adjusted_duration(i32_at(data, LAG_OFFSET)?, units, &ctx.defaults)
        .unwrap_or_else(|| Duration::new(0.0, units));
    Some(Relation {
        unique_id: i32_at(data, UNIQUE_ID_OFFSET)?,
        predecessor_unique_id: i32_at(data, PREDECESSOR_OFFSET)?,
        successor_unique_id: i32_at(data, SUCCESSOR_OFFSET)?,
        relation_type,
        lag,
    })
}
