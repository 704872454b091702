#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Write};

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use mpp_reader::MemorySource;

pub const PROJECT_DIR: &str = "/   114";
pub const ROOT_PROPS: &str = "/Props14";

const FIXED_META_HEADER: usize = 16;
const VAR_META_HEADER: usize = 20;
const PROPS_HEADER: usize = 16;

const DEFAULT_CALENDAR_NAME: i32 = 37748750;
const PASSWORD_FLAG: i32 = 893386752;

const TASK_RECORD: usize = 114;
const TASK_META_ITEM: usize = 47;
const TASK_META2_ITEM: usize = 92;
const TASK_ORDER_BLOCK: usize = 80;
const RESOURCE_RECORD: usize = 116;
const RESOURCE_META_ITEM: usize = 37;
const ASSIGNMENT_RECORD: usize = 110;
const ASSIGNMENT_META_ITEM: usize = 34;
const CALENDAR_META_ITEM: usize = 10;
const RELATION_META_ITEM: usize = 10;
const RELATION_RECORD: usize = 20;

pub const NULL_RESOURCE: i32 = -65535;

/// `day` of January 2024 at `h:m`; the 8th is a Monday.
pub fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .and_then(|d| d.and_hms_opt(h, m, 0))
        .expect("valid fixture date")
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1983, 12, 31).expect("epoch")
}

pub fn days_since_epoch(date: NaiveDate) -> u16 {
    (date - epoch()).num_days() as u16
}

/// Fixed data timestamp: tenths of a minute into the day, then the day count.
pub fn timestamp(t: NaiveDateTime) -> [u8; 4] {
    let time = (t.time().num_seconds_from_midnight() / 6) as u16;
    let mut out = [0u8; 4];
    out[0..2].copy_from_slice(&time.to_le_bytes());
    out[2..4].copy_from_slice(&days_since_epoch(t.date()).to_le_bytes());
    out
}

/// A NUL-terminated UTF-16LE string.
pub fn utf16(text: &str) -> Vec<u8> {
    text.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

fn put(data: &mut [u8], offset: usize, bytes: &[u8]) {
    data[offset..offset + bytes.len()].copy_from_slice(bytes);
}

/// Lays `records` out back to back and indexes them with a `FixedMeta` stream of
/// `item_size`-byte items. Returns `(meta, data)`.
pub fn fixed_blocks(item_size: usize, records: &[Vec<u8>]) -> (Vec<u8>, Vec<u8>) {
    let mut meta = vec![0u8; FIXED_META_HEADER];
    put(&mut meta, 8, &(records.len() as u32).to_le_bytes());
    let mut data = Vec::new();
    for record in records {
        let mut item = vec![0u8; item_size];
        put(&mut item, 4, &(data.len() as u32).to_le_bytes());
        meta.extend_from_slice(&item);
        data.extend_from_slice(record);
    }
    (meta, data)
}

/// Sets byte `offset` of item `index` in a `FixedMeta` stream.
pub fn set_meta_byte(meta: &mut [u8], item_size: usize, index: usize, offset: usize, value: u8) {
    meta[FIXED_META_HEADER + index * item_size + offset] = value;
}

/// Builds `VarMeta` (short keys) and `Var2Data` streams from `(unique id, key, blob)`.
pub fn var_blocks(blobs: &[(i32, u16, Vec<u8>)]) -> (Vec<u8>, Vec<u8>) {
    let mut meta = vec![0u8; VAR_META_HEADER];
    put(&mut meta, 8, &(blobs.len() as u32).to_le_bytes());
    let mut data = Vec::new();
    for (unique_id, key, blob) in blobs {
        meta.extend_from_slice(&unique_id.to_le_bytes());
        meta.extend_from_slice(&(data.len() as i32).to_le_bytes());
        meta.extend_from_slice(&key.to_le_bytes());
        meta.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&(blob.len() as i32).to_le_bytes());
        data.extend_from_slice(blob);
    }
    (meta, data)
}

/// A `Props` stream from `(key, payload)` pairs.
pub fn props(entries: &[(i32, Vec<u8>)]) -> Vec<u8> {
    let mut out = vec![0u8; PROPS_HEADER];
    put(&mut out, 12, &(entries.len() as u16).to_le_bytes());
    for (key, payload) in entries {
        out.extend_from_slice(&(payload.len() as i32).to_le_bytes());
        out.extend_from_slice(&key.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            out.push(0);
        }
    }
    out
}

/// A set of streams addressed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct MppFixture {
    streams: BTreeMap<String, Vec<u8>>,
}

impl MppFixture {
    /// An empty generation 14 file: only the root properties stream.
    pub fn new() -> Self {
        let mut fixture = Self::default();
        fixture.stream(ROOT_PROPS, props(&[]));
        fixture
    }

    pub fn stream(&mut self, path: &str, data: Vec<u8>) -> &mut Self {
        self.streams.insert(path.to_string(), data);
        self
    }

    pub fn entity_stream(&mut self, storage: &str, stream: &str, data: Vec<u8>) -> &mut Self {
        self.stream(&format!("{PROJECT_DIR}/{storage}/{stream}"), data)
    }

    pub fn remove_storage(&mut self, storage: &str) -> &mut Self {
        let prefix = format!("{PROJECT_DIR}/{storage}/");
        self.streams.retain(|path, _| !path.starts_with(&prefix));
        self
    }

    pub fn project_props(&mut self, entries: &[(i32, Vec<u8>)]) -> &mut Self {
        self.stream(&format!("{PROJECT_DIR}/Props"), props(entries))
    }

    fn var(&mut self, storage: &str, blobs: &[(i32, u16, Vec<u8>)]) {
        let (meta, data) = var_blocks(blobs);
        self.entity_stream(storage, "VarMeta", meta);
        self.entity_stream(storage, "Var2Data", data);
    }

    pub fn to_source(&self) -> MemorySource {
        let mut source = MemorySource::new();
        for (path, data) in &self.streams {
            source.insert(path, data.clone());
        }
        source
    }

    /// Writes the streams into a compound file.
    pub fn to_cfb_bytes(&self) -> Vec<u8> {
        let mut storages = BTreeSet::new();
        for path in self.streams.keys() {
            let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();
            for depth in 1..parts.len() {
                storages.insert(format!("/{}", parts[..depth].join("/")));
            }
        }

        let cursor = Cursor::new(Vec::new());
        let mut ole = cfb::CompoundFile::create(cursor).expect("create cfb");
        // Parents sort before their children.
        for storage in &storages {
            ole.create_storage(storage).expect("create storage");
        }
        for (path, data) in &self.streams {
            let mut stream = ole.create_stream(path).expect("create stream");
            stream.write_all(data).expect("write stream");
        }
        ole.into_inner().into_inner()
    }
}

/// A named base calendar whose hours blob keeps the default week and lists one
/// non-working exception.
pub fn base_calendar_hours(exception: NaiveDate, name: &str) -> Vec<u8> {
    let mut data = vec![0u8; 424];
    for day in 0..7 {
        put(&mut data, day * 60, &1i16.to_le_bytes());
    }
    put(&mut data, 420, &1u16.to_le_bytes());

    let label = utf16(name);
    let mut block = vec![0u8; 92];
    put(&mut block, 0, &days_since_epoch(exception).to_le_bytes());
    put(&mut block, 2, &days_since_epoch(exception).to_le_bytes());
    put(&mut block, 88, &(label.len() as i32).to_le_bytes());
    block.extend_from_slice(&label);
    block.resize(92 + label.len().div_ceil(4) * 4, 0);
    data.extend_from_slice(&block);
    data
}

fn calendar_entry(unique_id: i32, base_id: i32, resource_id: i32) -> Vec<u8> {
    [unique_id, base_id, resource_id]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

pub struct TaskRow {
    pub unique_id: i32,
    pub id: i32,
    pub name: &'static str,
    pub start: NaiveDateTime,
    pub finish: NaiveDateTime,
    pub order_key: i64,
}

fn task_record(row: &TaskRow) -> Vec<u8> {
    let mut data = vec![0u8; TASK_RECORD];
    put(&mut data, 0, &row.unique_id.to_le_bytes());
    put(&mut data, 4, &row.id.to_le_bytes());
    put(&mut data, 8, &timestamp(row.start));
    put(&mut data, 12, &timestamp(row.finish));
    // Project calendar.
    put(&mut data, 100, &(-1i32).to_le_bytes());
    data
}

fn order_block(key: i64) -> Vec<u8> {
    let mut data = vec![0u8; TASK_ORDER_BLOCK];
    put(&mut data, 16, &key.to_le_bytes());
    data
}

/// Writes `TBkndTask`: three reserved records, `rows`, then a blank row with
/// `blank_unique_id` shown at `blank_id`.
pub fn write_tasks(fixture: &mut MppFixture, rows: &[TaskRow], blank: Option<(i32, i32)>) {
    let mut records = vec![vec![0u8; TASK_RECORD]; 3];
    let mut second = vec![order_block(0); 3];
    for row in rows {
        records.push(task_record(row));
        second.push(order_block(row.order_key));
    }
    if let Some((unique_id, id)) = blank {
        let mut data = vec![0u8; 16];
        put(&mut data, 0, &unique_id.to_le_bytes());
        put(&mut data, 4, &id.to_le_bytes());
        records.push(data);
        second.push(order_block(0));
    }

    let (meta, data) = fixed_blocks(TASK_META_ITEM, &records);
    let (meta2, data2) = fixed_blocks(TASK_META2_ITEM, &second);
    fixture.entity_stream("TBkndTask", "FixedMeta", meta);
    fixture.entity_stream("TBkndTask", "FixedData", data);
    fixture.entity_stream("TBkndTask", "Fixed2Meta", meta2);
    fixture.entity_stream("TBkndTask", "Fixed2Data", data2);
    let names: Vec<(i32, u16, Vec<u8>)> = rows.iter().map(|row| (row.unique_id, 14, utf16(row.name))).collect();
    fixture.var("TBkndTask", &names);
}

pub struct ResourceRow {
    pub unique_id: u16,
    pub id: i32,
    pub name: &'static str,
    pub work_resource: bool,
}

pub fn write_resources(fixture: &mut MppFixture, rows: &[ResourceRow]) {
    let records: Vec<Vec<u8>> = rows
        .iter()
        .map(|row| {
            let mut data = vec![0u8; RESOURCE_RECORD];
            put(&mut data, 0, &row.unique_id.to_le_bytes());
            put(&mut data, 4, &row.id.to_le_bytes());
            put(&mut data, 8, &10000.0f64.to_le_bytes());
            data
        })
        .collect();
    let (mut meta, data) = fixed_blocks(RESOURCE_META_ITEM, &records);
    for (index, row) in rows.iter().enumerate() {
        if row.work_resource {
            set_meta_byte(&mut meta, RESOURCE_META_ITEM, index, 9, 0x02);
        }
    }
    fixture.entity_stream("TBkndRsc", "FixedMeta", meta);
    fixture.entity_stream("TBkndRsc", "FixedData", data);
    let names: Vec<(i32, u16, Vec<u8>)> = rows
        .iter()
        .map(|row| (i32::from(row.unique_id), 1, utf16(row.name)))
        .collect();
    fixture.var("TBkndRsc", &names);
}

pub struct AssignmentRow {
    pub unique_id: i32,
    pub task: i32,
    pub resource: i32,
    pub start: NaiveDateTime,
    pub finish: NaiveDateTime,
    pub actual_finish: Option<NaiveDateTime>,
    /// Thousandths of a minute.
    pub work: f64,
}

fn assignment_record(row: &AssignmentRow) -> Vec<u8> {
    let mut data = vec![0u8; ASSIGNMENT_RECORD];
    put(&mut data, 0, &row.unique_id.to_le_bytes());
    put(&mut data, 4, &row.task.to_le_bytes());
    put(&mut data, 8, &row.resource.to_le_bytes());
    put(&mut data, 12, &timestamp(row.start));
    put(&mut data, 16, &timestamp(row.finish));
    if let Some(actual_finish) = row.actual_finish {
        put(&mut data, 20, &timestamp(row.start));
        put(&mut data, 24, &timestamp(actual_finish));
    }
    put(&mut data, 48, &row.work.to_le_bytes());
    data
}

/// Writes `TBkndAssn`. `blobs` holds the variable data of every assignment.
pub fn write_assignments(fixture: &mut MppFixture, rows: &[AssignmentRow], blobs: &[(i32, u16, Vec<u8>)]) {
    let records: Vec<Vec<u8>> = rows.iter().map(assignment_record).collect();
    let (meta, data) = fixed_blocks(ASSIGNMENT_META_ITEM, &records);
    fixture.entity_stream("TBkndAssn", "FixedMeta", meta);
    fixture.entity_stream("TBkndAssn", "FixedData", data);
    fixture.var("TBkndAssn", blobs);
}

/// A completed work curve: `(offset in 1/80 minute, cumulative work in 1/1000 minute)`.
pub fn completed_curve(points: &[(i32, f64)], elapsed: i32) -> Vec<u8> {
    const RECORDS_AT: usize = 32;
    const RECORD_LEN: usize = 20;
    let mut data = vec![0u8; RECORDS_AT + points.len() * RECORD_LEN];
    put(&mut data, 0, &(points.len() as u16).to_le_bytes());
    put(&mut data, 24, &elapsed.to_le_bytes());
    for (index, (offset, cumulative)) in points.iter().enumerate() {
        let at = RECORDS_AT + index * RECORD_LEN;
        put(&mut data, at, &offset.to_le_bytes());
        put(&mut data, at + 4, &cumulative.to_le_bytes());
    }
    data
}

/// A baseline curve with `tiers` tiers stamped at the epoch.
pub fn baseline_curve(tiers: usize) -> Vec<u8> {
    let table = 8;
    let mut data = vec![0u8; table + tiers * 20];
    put(&mut data, 0, &(tiers as u16).to_le_bytes());
    put(&mut data, 4, &(table as u32).to_le_bytes());
    data
}

pub fn write_relations(fixture: &mut MppFixture, relations: &[(i32, i32, i32, u16, u16, i32)]) {
    let records: Vec<Vec<u8>> = relations
        .iter()
        .map(|(unique_id, predecessor, successor, code, units, lag)| {
            let mut data = vec![0u8; RELATION_RECORD];
            put(&mut data, 0, &unique_id.to_le_bytes());
            put(&mut data, 4, &predecessor.to_le_bytes());
            put(&mut data, 8, &successor.to_le_bytes());
            put(&mut data, 12, &code.to_le_bytes());
            put(&mut data, 14, &units.to_le_bytes());
            put(&mut data, 16, &lag.to_le_bytes());
            data
        })
        .collect();
    let (meta, data) = fixed_blocks(RELATION_META_ITEM, &records);
    fixture.entity_stream("TBkndCons", "FixedMeta", meta);
    fixture.entity_stream("TBkndCons", "FixedData", data);
}

/// The day the sample project's calendar takes off.
pub fn stocktake() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 9).expect("valid date")
}

/// A small generation 14 project:
///
/// * calendar 1 "Standard" with a non-working Tuesday 9 January, and calendar 3 derived
///   from it for resource 1
/// * tasks "Design" (unique id 1) and "Build" (unique id 2, shown first) plus a blank row
/// * resource 1 "Alice"
/// * assignment 1 of Alice to Design with a completed work curve and a baseline curve
///   without segments
/// * assignment 2 of Build without a resource and without curves
/// * a finish-to-start link from Design to Build with a day of lag
pub fn sample_project() -> MppFixture {
    let mut fixture = MppFixture::new();
    fixture.project_props(&[(DEFAULT_CALENDAR_NAME, utf16("Standard"))]);

    let (meta, data) = fixed_blocks(
        CALENDAR_META_ITEM,
        &[calendar_entry(1, -1, 0), calendar_entry(3, 1, 1)],
    );
    fixture.entity_stream("TBkndCal", "FixedMeta", meta);
    fixture.entity_stream("TBkndCal", "FixedData", data);
    fixture.var(
        "TBkndCal",
        &[
            (1, 1, utf16("Standard")),
            (1, 8, base_calendar_hours(stocktake(), "Stocktake")),
        ],
    );

    write_tasks(
        &mut fixture,
        &[
            TaskRow {
                unique_id: 1,
                id: 1,
                name: "Design",
                start: at(8, 8, 0),
                finish: at(10, 17, 0),
                order_key: 200,
            },
            TaskRow {
                unique_id: 2,
                id: 2,
                name: "Build",
                start: at(8, 8, 0),
                finish: at(10, 17, 0),
                order_key: 100,
            },
        ],
        Some((3, 3)),
    );

    write_resources(
        &mut fixture,
        &[ResourceRow {
            unique_id: 1,
            id: 1,
            name: "Alice",
            work_resource: true,
        }],
    );

    write_assignments(
        &mut fixture,
        &[
            AssignmentRow {
                unique_id: 1,
                task: 1,
                resource: 1,
                start: at(8, 8, 0),
                finish: at(10, 17, 0),
                actual_finish: Some(at(10, 17, 0)),
                work: 600_000.0,
            },
            AssignmentRow {
                unique_id: 2,
                task: 2,
                resource: NULL_RESOURCE,
                start: at(8, 8, 0),
                finish: at(10, 17, 0),
                actual_finish: None,
                work: 960_000.0,
            },
        ],
        &[
            (
                1,
                50,
                completed_curve(
                    &[(0, 0.0), (4800, 240_000.0), (9600, 480_000.0), (12_000, 600_000.0)],
                    12_000,
                ),
            ),
            (1, 52, baseline_curve(2)),
            (2, 71, utf16("Order steel")),
        ],
    );

    write_relations(&mut fixture, &[(1, 1, 2, 1, 7, 4800)]);
    fixture
}

pub fn password_flag() -> (i32, Vec<u8>) {
    (PASSWORD_FLAG, vec![0x01, 0, 0, 0])
}
