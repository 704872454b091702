//! Resources from the `TBkndRsc` storage.

use std::collections::BTreeMap;

use mpp_model::{Rate, Resource, ResourceField, ResourceType, TimeDefaults, TimeUnit};

use crate::blocks::bytes::{i32_at, u8_at};
use crate::blocks::Props;
use crate::container::StreamSource;
use crate::error::{IgnoredErrors, ReadError};
use crate::fields::{
    apply_fields, DecodeContext, FieldMap, Setter, RESOURCE_DEFAULTS, RESOURCE_FIELD_MAP_KEYS,
};
use crate::flags::FlagTable;
use crate::generation::GenerationTable;
use crate::hyperlink::read_hyperlink;
use crate::reconcile::reconcile_resources;
use crate::storage::EntityStreams;

const ID_FIXED_OFFSET: usize = 4;

/// Meta byte and mask marking a work resource.
const WORK_TYPE_BYTE: usize = 9;
const WORK_TYPE_MASK: u8 = 0x02;
/// Second meta byte and mask marking a cost resource; other resources are material.
const COST_TYPE_BYTE: usize = 8;
const COST_TYPE_MASK: u8 = 0x10;

static RESOURCE_SETTERS: &[(ResourceField, Setter<Resource>)] = &[
    (ResourceField::Id, |r, v| r.id = v.get()),
    (ResourceField::Name, |r, v| r.name = v.get::<String>().filter(|s| !s.is_empty())),
    (ResourceField::Initials, |r, v| r.initials = v.get()),
    (ResourceField::Group, |r, v| r.group = v.get()),
    (ResourceField::Code, |r, v| r.code = v.get()),
    (ResourceField::EmailAddress, |r, v| r.email_address = v.get()),
    (ResourceField::Notes, |r, v| r.notes = v.get()),
    (ResourceField::Text1, |r, v| r.text1 = v.get()),
    (ResourceField::Guid, |r, v| r.guid = v.get()),
    (ResourceField::HyperlinkData, |r, v| {
        r.hyperlink = v.get::<Vec<u8>>().and_then(|blob| read_hyperlink(&blob, false))
    }),
    (ResourceField::CalendarGuid, |r, v| r.calendar_guid = v.get()),
    (ResourceField::BookingType, |r, v| r.booking_type = v.get()),
    (ResourceField::AccrueAt, |r, v| r.accrue_at = v.get()),
    (ResourceField::Created, |r, v| r.created = v.get()),
    (ResourceField::MaxUnits, |r, v| r.max_units = v.get()),
    (ResourceField::StandardRate, |r, v| r.standard_rate = v.get()),
    (ResourceField::OvertimeRate, |r, v| r.overtime_rate = v.get()),
    (ResourceField::CostPerUse, |r, v| r.cost_per_use = v.get()),
    (ResourceField::Work, |r, v| r.work = v.get()),
    (ResourceField::ActualWork, |r, v| r.actual_work = v.get()),
    (ResourceField::RemainingWork, |r, v| r.remaining_work = v.get()),
    (ResourceField::BaselineWork, |r, v| r.baseline_work = v.get()),
    (ResourceField::Cost, |r, v| r.cost = v.get()),
    (ResourceField::ActualCost, |r, v| r.actual_cost = v.get()),
    (ResourceField::RemainingCost, |r, v| r.remaining_cost = v.get()),
    (ResourceField::BaselineCost, |r, v| r.baseline_cost = v.get()),
    (ResourceField::PercentWorkComplete, |r, v| r.percent_work_complete = v.get()),
];

/// Reads every resource, in unique id order.
///
/// `resource_calendars` maps resource unique ids to the calendar owned by the resource.
pub(crate) fn read_resources(
    source: &mut dyn StreamSource,
    table: &GenerationTable,
    props: &Props,
    ctx: &DecodeContext,
    application_version: Option<u32>,
    resource_calendars: &BTreeMap<i32, i32>,
    errors: &mut IgnoredErrors,
) -> Result<Vec<Resource>, ReadError> {
    let map = FieldMap::load(props, RESOURCE_FIELD_MAP_KEYS, table.type_is_var_key, RESOURCE_DEFAULTS);
    let streams = EntityStreams::load(
        source,
        table,
        &table.resource,
        [map.max_fixed_size(0), map.max_fixed_size(1)],
        errors,
    )?;
    Ok(decode_resources(
        &streams,
        &map,
        table.resource_flags.select(application_version),
        ctx,
        resource_calendars,
    ))
}

fn decode_resources(
    streams: &EntityStreams,
    map: &FieldMap<ResourceField>,
    flags: &FlagTable<Resource>,
    ctx: &DecodeContext,
    resource_calendars: &BTreeMap<i32, i32>,
) -> Vec<Resource> {
    let unique_id_offset = map.fixed_offset(ResourceField::UniqueId).unwrap_or(0);
    let identities = reconcile_resources(&streams.meta, &streams.fixed, unique_id_offset, map.max_fixed_size(0));
    let id_offset = map.fixed_offset(ResourceField::Id).unwrap_or(ID_FIXED_OFFSET);

    let mut resources = Vec::new();
    for unique_id in streams.var.meta().unique_ids() {
        let Some(index) = identities.index_of(unique_id) else {
            continue;
        };
        let blocks = streams.blocks(index);
        let Some(data) = blocks[0] else {
            continue;
        };

        let mut resource = Resource::new(unique_id);
        apply_fields(&mut resource, RESOURCE_SETTERS, map, unique_id, &blocks, &streams.var, ctx);
        resource.id = i32_at(data, id_offset).or(resource.id);
        resource.calendar_unique_id = resource_calendars.get(&unique_id).copied();

        let rate_units = |field| -> Option<TimeUnit> {
            map.decode(field, unique_id, &blocks, &streams.var, ctx)?.get()
        };
        resource.standard_rate = resource
            .standard_rate
            .map(|rate| rate_from_hours(rate, rate_units(ResourceField::StandardRateUnits), &ctx.defaults));
        resource.overtime_rate = resource
            .overtime_rate
            .map(|rate| rate_from_hours(rate, rate_units(ResourceField::OvertimeRateUnits), &ctx.defaults));

        let (meta, meta2) = streams.meta_items(index);
        if let Some(meta) = meta {
            flags.apply(&mut resource, meta, meta2);
        }
        resource.resource_type = Some(resource_type(meta, meta2));
        resources.push(resource);
    }
    resources
}

/// Rates are stored per hour; re-expresses `rate` in the unit the resource displays.
fn rate_from_hours(rate: Rate, units: Option<TimeUnit>, defaults: &TimeDefaults) -> Rate {
    let Some(units) = units else {
        return rate;
    };
    // Flat rates of cost and material resources are stored with elapsed minutes.
    let units = if units == TimeUnit::ElapsedMinutes {
        TimeUnit::Hours
    } else {
        units
    };
    match units.minutes_per_unit(defaults) {
        Some(minutes) => Rate::new(rate.amount * minutes / 60.0, units),
        None => rate,
    }
}

fn resource_type(meta: Option<&[u8]>, meta2: Option<&[u8]>) -> ResourceType {
    let bit = |item: Option<&[u8]>, offset: usize, mask: u8| {
        item.and_then(|item| u8_at(item, offset))
            .is_some_and(|byte| byte & mask != 0)
    };
    if bit(meta, WORK_TYPE_BYTE, WORK_TYPE_MASK) {
        ResourceType::Work
    } else if bit(meta2, COST_TYPE_BYTE, COST_TYPE_MASK) {
        ResourceType::Cost
    } else {
        ResourceType::Material
    }
}
