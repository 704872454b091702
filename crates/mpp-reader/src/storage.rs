//! Loads the block streams of one entity storage.

use crate::blocks::{
    FixedData, FixedMeta, VarData, VarMeta, FIXED2_DATA, FIXED2_META, FIXED_DATA, FIXED_META,
    VAR2_DATA, VAR_META,
};
use crate::container::StreamSource;
use crate::error::{IgnoredErrors, ReadError};
use crate::generation::{EntityLayout, GenerationTable, RecordLayout};

/// The decoded streams of an entity storage such as `TBkndTask`.
#[derive(Debug, Clone)]
pub(crate) struct EntityStreams {
    pub meta: FixedMeta,
    pub fixed: FixedData,
    /// Present when the layout splits records over a second meta stream.
    pub meta2: Option<FixedMeta>,
    pub fixed2: Option<FixedData>,
    pub var: VarData,
}

impl EntityStreams {
    /// Reads the storage described by `layout`. `max_sizes` are the largest fixed record
    /// extents declared by the entity's field map, per record group.
    pub fn load(
        source: &mut dyn StreamSource,
        table: &GenerationTable,
        layout: &EntityLayout,
        max_sizes: [usize; 2],
        errors: &mut IgnoredErrors,
    ) -> Result<Self, ReadError> {
        let mut required = |stream: &str| -> Result<Vec<u8>, ReadError> {
            let path = table.stream_path(layout, stream);
            source.read_stream(&path)?.ok_or(ReadError::MissingStream(path))
        };

        let var_meta = VarMeta::parse(&required(VAR_META)?, table.var_key_width);
        let var = VarData::new(var_meta, &required(VAR2_DATA)?, layout.storage, errors);
        let meta = FixedMeta::new(required(FIXED_META)?, layout.fixed_meta_item_size);
        let fixed = match layout.fixed {
            RecordLayout::Meta {
                max_expected,
                min_size,
                ..
            } => FixedData::from_meta(
                &meta,
                required(FIXED_DATA)?,
                max_expected.resolve(max_sizes[0]),
                min_size.resolve(max_sizes[0]),
            ),
            RecordLayout::MetaCandidates { .. } => FixedData::from_meta(&meta, required(FIXED_DATA)?, 0, 0),
            RecordLayout::Uniform { item_size } => {
                FixedData::with_item_size(item_size, required(FIXED_DATA)?, true)
            }
        };

        let (meta2, fixed2) = match layout.fixed2 {
            Some(layout2) => {
                let raw_meta2 = source.read_stream(&table.stream_path(layout, FIXED2_META))?;
                match source.read_stream(&table.stream_path(layout, FIXED2_DATA))? {
                    Some(data2) => split_second(layout2, raw_meta2, data2, max_sizes[1], meta.item_count()),
                    None => {
                        log::debug!("{}: no second fixed data stream", layout.storage);
                        (None, None)
                    }
                }
            }
            None => (None, None),
        };

        Ok(Self {
            meta,
            fixed,
            meta2,
            fixed2,
            var,
        })
    }

    /// The fixed data blocks of record `index`, indexed by record group.
    pub fn blocks(&self, index: usize) -> [Option<&[u8]>; 2] {
        [
            self.fixed.record(index),
            self.fixed2.as_ref().and_then(|fixed2| fixed2.record(index)),
        ]
    }

    /// Meta items of record `index` as read by the flag tables.
    pub fn meta_items(&self, index: usize) -> (Option<&[u8]>, Option<&[u8]>) {
        (
            self.meta.item(index),
            self.meta2.as_ref().and_then(|meta2| meta2.item(index)),
        )
    }
}

/// Splits the second fixed data stream. Meta-driven layouts need the `Fixed2Meta` stream;
/// without it the second group is treated as absent.
fn split_second(
    layout: RecordLayout,
    raw_meta: Option<Vec<u8>>,
    buffer: Vec<u8>,
    max_size: usize,
    record_count: usize,
) -> (Option<FixedMeta>, Option<FixedData>) {
    match (layout, raw_meta) {
        (
            RecordLayout::Meta {
                item_size,
                max_expected,
                min_size,
            },
            Some(raw),
        ) => {
            let meta = FixedMeta::new(raw, item_size);
            let data = FixedData::from_meta(&meta, buffer, max_expected.resolve(max_size), min_size.resolve(max_size));
            (Some(meta), Some(data))
        }
        (RecordLayout::MetaCandidates { item_sizes }, Some(raw)) => {
            let meta = FixedMeta::with_candidate_sizes(raw, item_sizes, record_count);
            let data = FixedData::from_meta(&meta, buffer, 0, 0);
            (Some(meta), Some(data))
        }
        (RecordLayout::Uniform { item_size }, _) => (None, Some(FixedData::with_item_size(item_size, buffer, true))),
        (_, None) => {
            log::debug!("second fixed data stream has no meta stream");
            (None, None)
        }
    }
}

#[cfg(test)]
impl EntityStreams {
    /// Assembles streams from records laid out back to back. `records` pairs each record
    /// with its meta flags; the optional second group uses 16-byte meta items.
    pub(crate) fn for_test(
        meta_item_size: usize,
        records: &[(u32, Vec<u8>)],
        records2: Option<&[Vec<u8>]>,
        blobs: &[(i32, u16, Vec<u8>)],
    ) -> Self {
        use crate::blocks::fixed_meta::build_fixed_meta;
        use crate::blocks::var_data::build_var_data;
        use crate::blocks::var_meta::build_var_meta;
        use crate::blocks::VarKeyWidth;

        use crate::test_support::back_to_back;

        let (items, buffer) = back_to_back(records.iter().map(|(flags, record)| (*flags, record.as_slice())));
        let meta = FixedMeta::new(build_fixed_meta(meta_item_size, &items), meta_item_size);
        let fixed = FixedData::from_meta(&meta, buffer, 0, 0);

        let (meta2, fixed2) = match records2 {
            Some(records2) => {
                let (items2, buffer2) = back_to_back(records2.iter().map(|record| (0, record.as_slice())));
                let meta2 = FixedMeta::new(build_fixed_meta(16, &items2), 16);
                let fixed2 = FixedData::from_meta(&meta2, buffer2, 0, 0);
                (Some(meta2), Some(fixed2))
            }
            None => (None, None),
        };

        let payloads: Vec<&[u8]> = blobs.iter().map(|(_, _, blob)| blob.as_slice()).collect();
        let (var_buffer, offsets) = build_var_data(&payloads);
        let var_items: Vec<(i32, i32, u16)> = blobs
            .iter()
            .zip(offsets)
            .map(|((unique_id, key, _), offset)| (*unique_id, offset, *key))
            .collect();
        let var_meta = VarMeta::parse(&build_var_meta(&var_items, VarKeyWidth::Short), VarKeyWidth::Short);
        let var = VarData::new(var_meta, &var_buffer, "test", &mut IgnoredErrors::default());

        Self {
            meta,
            fixed,
            meta2,
            fixed2,
            var,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::blocks::fixed_meta::build_fixed_meta;
    use crate::container::MemorySource;
    use mpp_model::FileGeneration;

    fn insert(source: &mut MemorySource, table: &GenerationTable, layout: &EntityLayout, stream: &str, data: Vec<u8>) {
        source.insert(&table.stream_path(layout, stream), data);
    }

    #[test]
    fn missing_required_stream_is_fatal() {
        let table = GenerationTable::for_generation(FileGeneration::Mpp14);
        let mut source = MemorySource::new();
        insert(&mut source, table, &table.task, VAR_META, vec![0; 20]);
        let result = EntityStreams::load(&mut source, table, &table.task, [0, 0], &mut IgnoredErrors::default());
        assert!(matches!(
            result,
            Err(ReadError::MissingStream(path)) if path == "/   114/TBkndTask/Var2Data"
        ));
    }

    #[test]
    fn second_group_is_optional() {
        let table = GenerationTable::for_generation(FileGeneration::Mpp14);
        let layout = &table.resource;
        let mut source = MemorySource::new();
        insert(&mut source, table, layout, VAR_META, vec![0; 20]);
        insert(&mut source, table, layout, VAR2_DATA, Vec::new());
        insert(&mut source, table, layout, FIXED_META, build_fixed_meta(37, &[(0, 0), (0, 8)]));
        insert(&mut source, table, layout, FIXED_DATA, vec![1; 16]);

        let streams = EntityStreams::load(&mut source, table, layout, [0, 0], &mut IgnoredErrors::default())
            .expect("streams");
        assert_eq!(streams.fixed.record_count(), 2);
        assert!(streams.fixed2.is_none());
        assert_eq!(streams.blocks(1), [Some(&[1u8; 8][..]), None]);

        insert(&mut source, table, layout, FIXED2_META, build_fixed_meta(51, &[(0, 0), (0, 4)]));
        insert(&mut source, table, layout, FIXED2_DATA, vec![2; 8]);
        let streams = EntityStreams::load(&mut source, table, layout, [0, 0], &mut IgnoredErrors::default())
            .expect("streams");
        assert_eq!(streams.blocks(0), [Some(&[1u8; 8][..]), Some(&[2u8; 4][..])]);
        assert_eq!(streams.meta_items(0).1.map(<[u8]>::len), Some(51));
    }
}
