use super::bytes::u32_at;

const HEADER_LEN: usize = 16;
const ITEM_COUNT_OFFSET: usize = 8;

/// Record flag marking a deleted record.
pub(crate) const DELETED_FLAG: u32 = 0x02;
/// Secondary flag observed on stale copies of a record.
pub(crate) const DELETED_SUB_FLAG: u32 = 0x04;

/// The `FixedMeta` stream: one fixed-size item per record of the matching `FixedData`
/// stream, carrying the record's flags and byte offset.
#[derive(Debug, Clone)]
pub(crate) struct FixedMeta {
    data: Vec<u8>,
    item_size: usize,
    item_count: usize,
}

impl FixedMeta {
    pub fn new(data: Vec<u8>, item_size: usize) -> Self {
        let declared = u32_at(&data, ITEM_COUNT_OFFSET).unwrap_or(0) as usize;
        let item_count = adjusted_count(data.len(), item_size, declared);
        Self {
            data,
            item_size,
            item_count,
        }
    }

    /// Picks the item size from `candidates` whose item count agrees with
    /// `expected_count` (the record count of a companion block). Falls back to the first
    /// candidate when none match.
    pub fn with_candidate_sizes(data: Vec<u8>, candidates: &[usize], expected_count: usize) -> Self {
        let declared = u32_at(&data, ITEM_COUNT_OFFSET).unwrap_or(0) as usize;
        let body = data.len().saturating_sub(HEADER_LEN);
        let item_size = candidates
            .iter()
            .copied()
            .filter(|size| *size > 0)
            .find(|size| body % size == 0 && body / size == expected_count)
            .or_else(|| {
                candidates
                    .iter()
                    .copied()
                    .filter(|size| *size > 0)
                    .find(|size| adjusted_count(data.len(), *size, declared) == expected_count)
            })
            .or_else(|| candidates.first().copied())
            .unwrap_or(0);
        Self::new(data, item_size)
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn item(&self, index: usize) -> Option<&[u8]> {
        if index >= self.item_count {
            return None;
        }
        let start = HEADER_LEN + index * self.item_size;
        self.data.get(start..start + self.item_size)
    }

    pub fn flags(&self, index: usize) -> u32 {
        self.item(index).and_then(|item| u32_at(item, 0)).unwrap_or(0)
    }

    pub fn offset(&self, index: usize) -> Option<u32> {
        self.item(index).and_then(|item| u32_at(item, 4))
    }
}

fn adjusted_count(len: usize, item_size: usize, declared: usize) -> usize {
    if item_size == 0 {
        return 0;
    }
    declared.min(len.saturating_sub(HEADER_LEN) / item_size)
}

#[cfg(test)]
pub(crate) fn build_fixed_meta(item_size: usize, items: &[(u32, u32)]) -> Vec<u8> {
    let mut out = vec![0u8; HEADER_LEN];
    out[ITEM_COUNT_OFFSET..ITEM_COUNT_OFFSET + 4].copy_from_slice(&(items.len() as u32).to_le_bytes());
    for (flags, offset) in items {
        let mut item = vec![0u8; item_size];
        item[0..4].copy_from_slice(&flags.to_le_bytes());
        item[4..8].copy_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&item);
    }
    out
}
