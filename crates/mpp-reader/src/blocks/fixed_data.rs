use std::collections::HashMap;
use std::ops::Range;

use super::fixed_meta::FixedMeta;

/// An array of fixed-layout records read from a `FixedData`/`Fixed2Data` stream.
///
/// Records are addressed by sequential index or, through [`FixedData::index_from_offset`],
/// by their byte offset in the stream. Slots whose offset was unusable hold no record.
#[derive(Debug, Clone, Default)]
pub(crate) struct FixedData {
    buffer: Vec<u8>,
    records: Vec<Option<Range<usize>>>,
    /// Start offset to the first record beginning there.
    by_offset: HashMap<usize, usize>,
}

impl FixedData {
    /// Splits `buffer` using the record offsets listed in `meta`.
    ///
    /// A record runs to the next record's offset (the last one to the end of the stream).
    /// A zero size is replaced by `min_size`; a non-zero `max_expected_size` caps the size.
    pub fn from_meta(meta: &FixedMeta, buffer: Vec<u8>, max_expected_size: usize, min_size: usize) -> Self {
        let count = meta.item_count();
        let mut records = Vec::with_capacity(count);
        for index in 0..count {
            records.push(Self::record_range(meta, index, buffer.len(), max_expected_size, min_size));
        }
        Self::indexed(buffer, records)
    }

    fn indexed(buffer: Vec<u8>, records: Vec<Option<Range<usize>>>) -> Self {
        let mut by_offset = HashMap::with_capacity(records.len());
        for (index, range) in records.iter().enumerate() {
            if let Some(range) = range {
                by_offset.entry(range.start).or_insert(index);
            }
        }
        Self {
            buffer,
            records,
            by_offset,
        }
    }

    fn record_range(
        meta: &FixedMeta,
        index: usize,
        len: usize,
        max_expected_size: usize,
        min_size: usize,
    ) -> Option<Range<usize>> {
        let offset = i64::from(meta.offset(index)? as i32);
        if offset < 0 || offset > len as i64 {
            return None;
        }
        let offset = offset as usize;
        let available = len - offset;

        let mut size: i64 = if index + 1 == meta.item_count() {
            available as i64
        } else {
            i64::from(meta.offset(index + 1).unwrap_or(0) as i32) - offset as i64
        };
        if size == 0 {
            size = min_size as i64;
        }
        if size < 0 || size > available as i64 {
            size = if max_expected_size == 0 {
                available as i64
            } else {
                max_expected_size.min(available) as i64
            };
        }
        if max_expected_size != 0 && size > max_expected_size as i64 {
            size = max_expected_size as i64;
        }
        if size <= 0 {
            return None;
        }
        Some(offset..offset + size as usize)
    }

    /// Splits `buffer` into consecutive records of `item_size` bytes. When
    /// `read_remainder` is set a trailing partial record is kept.
    pub fn with_item_size(item_size: usize, buffer: Vec<u8>, read_remainder: bool) -> Self {
        if item_size == 0 {
            return Self::indexed(buffer, Vec::new());
        }
        let mut count = buffer.len() / item_size;
        if read_remainder && buffer.len() % item_size != 0 {
            count += 1;
        }
        let records = (0..count)
            .map(|index| {
                let start = index * item_size;
                Some(start..(start + item_size).min(buffer.len()))
            })
            .collect();
        Self::indexed(buffer, records)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_valid_index(&self, index: usize) -> bool {
        index < self.records.len()
    }

    pub fn record(&self, index: usize) -> Option<&[u8]> {
        let range = self.records.get(index)?.clone()?;
        self.buffer.get(range)
    }

    /// Finds the record starting at byte `offset` of the stream.
    pub fn index_from_offset(&self, offset: usize) -> Option<usize> {
        self.by_offset.get(&offset).copied()
    }
}
