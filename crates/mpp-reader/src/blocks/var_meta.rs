use std::collections::BTreeMap;

use super::bytes::{i32_at, u16_at, u32_at, u8_at};

const HEADER_LEN: usize = 20;
const ITEM_COUNT_OFFSET: usize = 8;
const ITEM_LEN: usize = 12;

/// Width of the key stored in each `VarMeta` item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VarKeyWidth {
    Byte,
    Short,
}

/// The `VarMeta` stream: which variable-data keys exist for each unique id, and where
/// their payloads live in `Var2Data`.
#[derive(Debug, Clone, Default)]
pub(crate) struct VarMeta {
    entries: BTreeMap<i32, BTreeMap<u16, i32>>,
}

impl VarMeta {
    pub fn parse(data: &[u8], key_width: VarKeyWidth) -> Self {
        let declared = u32_at(data, ITEM_COUNT_OFFSET).unwrap_or(0) as usize;
        let available = data.len().saturating_sub(HEADER_LEN) / ITEM_LEN;
        let mut entries: BTreeMap<i32, BTreeMap<u16, i32>> = BTreeMap::new();
        for index in 0..declared.min(available) {
            let item = HEADER_LEN + index * ITEM_LEN;
            let (Some(unique_id), Some(offset)) = (i32_at(data, item), i32_at(data, item + 4)) else {
                break;
            };
            let key = match key_width {
                VarKeyWidth::Byte => u8_at(data, item + 8).map(u16::from),
                VarKeyWidth::Short => u16_at(data, item + 8),
            };
            let Some(key) = key else {
                break;
            };
            entries.entry(unique_id).or_default().insert(key, offset);
        }
        Self { entries }
    }

    /// Unique ids with at least one entry, ascending.
    pub fn unique_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries.keys().copied()
    }

    /// True when any variable data is recorded for `unique_id`.
    pub fn contains(&self, unique_id: i32) -> bool {
        self.entries.contains_key(&unique_id)
    }

    pub fn keys(&self, unique_id: i32) -> impl Iterator<Item = u16> + '_ {
        self.entries
            .get(&unique_id)
            .into_iter()
            .flat_map(|keys| keys.keys().copied())
    }

    pub(super) fn offsets(&self) -> impl Iterator<Item = (i32, u16, i32)> + '_ {
        self.entries.iter().flat_map(|(unique_id, keys)| {
            keys.iter().map(move |(key, offset)| (*unique_id, *key, *offset))
        })
    }
}

#[cfg(test)]
pub(crate) fn build_var_meta(items: &[(i32, i32, u16)], key_width: VarKeyWidth) -> Vec<u8> {
    let mut out = vec![0u8; HEADER_LEN];
    out[ITEM_COUNT_OFFSET..ITEM_COUNT_OFFSET + 4].copy_from_slice(&(items.len() as u32).to_le_bytes());
    for (unique_id, offset, key) in items {
        out.extend_from_slice(&unique_id.to_le_bytes());
        out.extend_from_slice(&offset.to_le_bytes());
        match key_width {
            VarKeyWidth::Byte => out.extend_from_slice(&[*key as u8, 0, 0, 0]),
            VarKeyWidth::Short => {
                out.extend_from_slice(&key.to_le_bytes());
                out.extend_from_slice(&[0, 0]);
            }
        }
    }
    out
}
