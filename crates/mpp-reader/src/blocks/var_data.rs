use std::collections::HashMap;

use super::bytes::{f64_at, i16_at, i32_at, i64_at, unicode_string_at};
use super::var_meta::VarMeta;
use crate::error::IgnoredErrors;

/// Variable-length blobs keyed by `(unique id, key)`, read from `Var2Data` using the
/// offsets listed in the companion [`VarMeta`].
#[derive(Debug, Clone, Default)]
pub(crate) struct VarData {
    meta: VarMeta,
    blobs: HashMap<(i32, u16), Vec<u8>>,
}

impl VarData {
    pub fn new(meta: VarMeta, buffer: &[u8], label: &str, errors: &mut IgnoredErrors) -> Self {
        let mut blobs = HashMap::new();
        for (unique_id, key, offset) in meta.offsets() {
            let Some(start) = usize::try_from(offset).ok().filter(|o| o + 4 <= buffer.len()) else {
                errors.record(format!(
                    "{label}: variable data offset {offset} for id {unique_id} key {key} is out of range"
                ));
                continue;
            };
            let Some(len) = i32_at(buffer, start).and_then(|len| usize::try_from(len).ok()) else {
                continue;
            };
            let Some(blob) = (start + 4)
                .checked_add(len)
                .and_then(|end| buffer.get(start + 4..end))
            else {
                continue;
            };
            blobs.insert((unique_id, key), blob.to_vec());
        }
        Self { meta, blobs }
    }

    pub fn meta(&self) -> &VarMeta {
        &self.meta
    }

    pub fn blob(&self, unique_id: i32, key: u16) -> Option<&[u8]> {
        self.blobs.get(&(unique_id, key)).map(Vec::as_slice)
    }

    pub fn short(&self, unique_id: i32, key: u16) -> Option<i16> {
        i16_at(self.blob(unique_id, key)?, 0)
    }

    pub fn int(&self, unique_id: i32, key: u16) -> Option<i32> {
        i32_at(self.blob(unique_id, key)?, 0)
    }

    pub fn long(&self, unique_id: i32, key: u16) -> Option<i64> {
        i64_at(self.blob(unique_id, key)?, 0)
    }

    pub fn double(&self, unique_id: i32, key: u16) -> Option<f64> {
        f64_at(self.blob(unique_id, key)?, 0)
    }

    pub fn unicode_string(&self, unique_id: i32, key: u16) -> Option<String> {
        unicode_string_at(self.blob(unique_id, key)?, 0)
    }
}

#[cfg(test)]
pub(crate) fn build_var_data(blobs: &[&[u8]]) -> (Vec<u8>, Vec<i32>) {
    let mut out = Vec::new();
    let mut offsets = Vec::new();
    for blob in blobs {
        offsets.push(out.len() as i32);
        out.extend_from_slice(&(blob.len() as i32).to_le_bytes());
        out.extend_from_slice(blob);
    }
    (out, offsets)
}
