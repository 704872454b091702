use std::collections::BTreeMap;

use super::bytes::{f64_at, i16_at, i32_at, u16_at, unicode_string_at};

const HEADER_LEN: usize = 16;
const COUNT_OFFSET: usize = 12;
const ENTRY_HEADER_LEN: usize = 12;

/// A `Props` stream: a flat list of `(key, payload)` entries.
#[derive(Debug, Clone, Default)]
pub(crate) struct Props {
    entries: BTreeMap<i32, Vec<u8>>,
}

impl Props {
    pub fn parse(data: &[u8]) -> Self {
        let count = u16_at(data, COUNT_OFFSET).unwrap_or(0);
        let mut entries = BTreeMap::new();
        let mut offset = HEADER_LEN;
        for _ in 0..count {
            let (Some(size), Some(key)) = (i32_at(data, offset), i32_at(data, offset + 4)) else {
                break;
            };
            let Ok(size) = usize::try_from(size) else {
                break;
            };
            let start = offset + ENTRY_HEADER_LEN;
            let Some(payload) = start.checked_add(size).and_then(|end| data.get(start..end)) else {
                break;
            };
            entries.insert(key, payload.to_vec());
            offset = start + size + size % 2;
        }
        Self { entries }
    }

    pub fn bytes(&self, key: i32) -> Option<&[u8]> {
        self.entries.get(&key).map(Vec::as_slice)
    }

    pub fn short(&self, key: i32) -> Option<i16> {
        i16_at(self.bytes(key)?, 0)
    }

    pub fn int(&self, key: i32) -> Option<i32> {
        i32_at(self.bytes(key)?, 0)
    }

    pub fn double(&self, key: i32) -> Option<f64> {
        f64_at(self.bytes(key)?, 0)
    }

    pub fn unicode_string(&self, key: i32) -> Option<String> {
        unicode_string_at(self.bytes(key)?, 0).filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds a `Props` stream from `(key, payload)` pairs.
#[cfg(test)]
pub(crate) fn build_props(entries: &[(i32, Vec<u8>)]) -> Vec<u8> {
    let mut out = vec![0u8; HEADER_LEN];
    out[COUNT_OFFSET..COUNT_OFFSET + 2].copy_from_slice(&(entries.len() as u16).to_le_bytes());
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_padded_entries() {
        let data = build_props(&[
            (1, vec![7]),
            (2, 480i32.to_le_bytes().to_vec()),
            (3, 1.5f64.to_le_bytes().to_vec()),
        ]);
        let props = Props::parse(&data);
        assert_eq!(props.bytes(1), Some(&[7u8][..]));
        assert_eq!(props.int(2), Some(480));
        assert_eq!(props.double(3), Some(1.5));
        assert_eq!(props.int(4), None);
    }

    #[test]
    fn truncated_stream_keeps_complete_entries() {
        let mut data = build_props(&[(1, vec![1, 0]), (2, vec![1, 2, 3, 4])]);
        data.truncate(data.len() - 2);
        let props = Props::parse(&data);
        assert_eq!(props.short(1), Some(1));
        assert_eq!(props.bytes(2), None);
    }
}
