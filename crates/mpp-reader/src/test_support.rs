//! Builders shared by the unit tests.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::blocks::fixed_meta::build_fixed_meta;
use crate::blocks::var_data::build_var_data;
use crate::blocks::var_meta::build_var_meta;
use crate::blocks::{FIXED2_DATA, FIXED2_META, FIXED_DATA, FIXED_META, VAR2_DATA, VAR_META};
use crate::container::MemorySource;
use crate::fields::epoch;
use crate::generation::{EntityLayout, GenerationTable, RecordLayout};

/// `day` of January 2024 at `h:m`; the 8th is a Monday.
pub fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .and_then(|d| d.and_hms_opt(h, m, 0))
        .unwrap()
}

/// Total hours of a list of segments.
pub fn hours(segments: &[mpp_model::TimephasedWork]) -> Vec<f64> {
    segments.iter().map(|s| s.total_amount.value).collect()
}

/// Encodes a timestamp as stored in fixed data: tenths of a minute into the day, then the
/// day count.
pub fn timestamp_bytes(t: NaiveDateTime) -> [u8; 4] {
    let days = (t.date() - epoch().date()).num_days() as u16;
    let time = (t.time().num_seconds_from_midnight() / 6) as u16;
    let mut out = [0u8; 4];
    out[0..2].copy_from_slice(&time.to_le_bytes());
    out[2..4].copy_from_slice(&days.to_le_bytes());
    out
}

/// A NUL-terminated UTF-16LE string.
pub fn utf16(text: &str) -> Vec<u8> {
    text.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

/// Concatenates `records`, returning each record's meta `(flags, offset)` and the buffer.
pub fn back_to_back<'a>(records: impl IntoIterator<Item = (u32, &'a [u8])>) -> (Vec<(u32, u32)>, Vec<u8>) {
    let mut items = Vec::new();
    let mut buffer = Vec::new();
    for (flags, record) in records {
        items.push((flags, buffer.len() as u32));
        buffer.extend_from_slice(record);
    }
    (items, buffer)
}

/// Writes the streams of one entity storage the way `table` lays them out.
///
/// `records2` fill the second fixed data stream and are skipped when the layout has none.
/// Var data keys are written with the generation's key width.
pub fn write_entity(
    source: &mut MemorySource,
    table: &GenerationTable,
    layout: &EntityLayout,
    records: &[(u32, Vec<u8>)],
    records2: &[Vec<u8>],
    blobs: &[(i32, u16, Vec<u8>)],
) {
    let mut write = |stream: &str, data: Vec<u8>| source.insert(&table.stream_path(layout, stream), data);

    let (items, buffer) = back_to_back(records.iter().map(|(flags, record)| (*flags, record.as_slice())));
    write(FIXED_META, build_fixed_meta(layout.fixed_meta_item_size, &items));
    write(FIXED_DATA, buffer);

    if let Some(layout2) = layout.fixed2.filter(|_| !records2.is_empty()) {
        let (items2, buffer2) = back_to_back(records2.iter().map(|record| (0, record.as_slice())));
        let meta_item_size = match layout2 {
            RecordLayout::Meta { item_size, .. } => Some(item_size),
            RecordLayout::MetaCandidates { item_sizes } => item_sizes.first().copied(),
            RecordLayout::Uniform { .. } => None,
        };
        if let Some(item_size) = meta_item_size {
            write(FIXED2_META, build_fixed_meta(item_size, &items2));
        }
        write(FIXED2_DATA, buffer2);
    }

    let payloads: Vec<&[u8]> = blobs.iter().map(|(_, _, blob)| blob.as_slice()).collect();
    let (var_buffer, offsets) = build_var_data(&payloads);
    let var_items: Vec<(i32, i32, u16)> = blobs
        .iter()
        .zip(offsets)
        .map(|((unique_id, key, _), offset)| (*unique_id, offset, *key))
        .collect();
    write(VAR_META, build_var_meta(&var_items, table.var_key_width));
    write(VAR2_DATA, var_buffer);
}
