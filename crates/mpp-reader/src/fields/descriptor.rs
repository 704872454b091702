use std::collections::HashMap;

use mpp_model::{DataType, FieldKind, TimeUnit};

use super::decode::{self, DecodeContext, FieldValue};
use super::defaults::DefaultField;
use crate::blocks::bytes::{i32_at, u16_at, u32_at, u8_at};
use crate::blocks::{Props, VarData};

const ENTRY_LEN: usize = 28;
const CATEGORY_META_BLOCK_0: u16 = 0x0B;
const CATEGORY_META_BLOCK_1: u16 = 0x64;
const NO_FIXED_OFFSET: u16 = 0xFFFF;

/// Number of fixed data groups a record can be split into (`FixedData` and `Fixed2Data`).
pub(crate) const MAX_GROUPS: usize = 2;

/// Where the value of a field is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldLocation {
    FixedData,
    VarData,
    MetaBit,
    Unknown,
}

/// Storage location of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldDescriptor {
    pub location: FieldLocation,
    /// Fixed data group (0 for `FixedData`, 1 for `Fixed2Data`).
    pub group: usize,
    pub fixed_offset: usize,
    pub var_key: u16,
    pub mask: u32,
    pub meta_block: usize,
}

/// Byte width of a field stored in fixed data. Zero for types never stored there.
pub(crate) fn fixed_size(data_type: DataType) -> usize {
    match data_type {
        DataType::Date | DataType::Integer | DataType::Duration => 4,
        DataType::TimeUnits
        | DataType::Constraint
        | DataType::Priority
        | DataType::Percentage
        | DataType::TaskType
        | DataType::Accrue
        | DataType::Short
        | DataType::Boolean
        | DataType::Delay
        | DataType::WorkGroup
        | DataType::RateUnits
        | DataType::EarnedValueMethod
        | DataType::ResourceRequestType => 2,
        DataType::Currency | DataType::Units | DataType::Rate | DataType::Work => 8,
        DataType::WorkUnits => 1,
        DataType::Guid => 16,
        DataType::String
        | DataType::Notes
        | DataType::Numeric
        | DataType::Binary
        | DataType::BookingType => 0,
    }
}

/// The field descriptor table of one entity class.
#[derive(Debug, Clone)]
pub(crate) struct FieldMap<F: FieldKind> {
    items: HashMap<F, FieldDescriptor>,
    max_fixed_size: [usize; MAX_GROUPS],
}

impl<F: FieldKind> FieldMap<F> {
    /// Builds the table from the first control block found under `keys` in `props`,
    /// falling back to `defaults` when the file carries none.
    pub fn load(props: &Props, keys: &[i32], type_is_var_key: bool, defaults: &[DefaultField<F>]) -> Self {
        match keys.iter().find_map(|key| props.bytes(*key)) {
            Some(data) => Self::from_control_block(data, type_is_var_key),
            None => {
                log::debug!("no field map among props keys {keys:?}, using default table");
                Self::from_defaults(defaults)
            }
        }
    }

    /// Parses a control block of 28-byte descriptor entries.
    pub fn from_control_block(data: &[u8], type_is_var_key: bool) -> Self {
        let mut map = Self {
            items: HashMap::new(),
            max_fixed_size: [0; MAX_GROUPS],
        };
        let mut group = 0usize;
        let mut last_offset = 0u16;

        for entry in data.chunks_exact(ENTRY_LEN) {
            let (Some(mask), Some(offset), Some(type_code), Some(category)) = (
                u32_at(entry, 0),
                u16_at(entry, 4),
                i32_at(entry, 12),
                u16_at(entry, 20),
            ) else {
                break;
            };
            let field = F::from_type_code(type_code as u32);
            let var_key = if type_is_var_key {
                (type_code & 0xFFFF) as u16
            } else {
                u16::from(u8_at(entry, 6).unwrap_or(0))
            };

            let (location, meta_block) = match category {
                CATEGORY_META_BLOCK_0 => (FieldLocation::MetaBit, 0),
                CATEGORY_META_BLOCK_1 => (FieldLocation::MetaBit, 1),
                _ if offset != NO_FIXED_OFFSET => {
                    if offset < last_offset {
                        group += 1;
                    }
                    last_offset = offset;
                    let size = field.map(|f| fixed_size(f.data_type())).unwrap_or(0);
                    map.track_extent(group, usize::from(offset) + size);
                    (FieldLocation::FixedData, 0)
                }
                _ if var_key != 0 => (FieldLocation::VarData, 0),
                _ => (FieldLocation::Unknown, 0),
            };

            let Some(field) = field else {
                continue;
            };
            map.items.insert(
                field,
                FieldDescriptor {
                    location,
                    group,
                    fixed_offset: usize::from(offset),
                    var_key,
                    mask,
                    meta_block,
                },
            );
        }
        map
    }

    pub fn from_defaults(defaults: &[DefaultField<F>]) -> Self {
        let mut map = Self {
            items: HashMap::new(),
            max_fixed_size: [0; MAX_GROUPS],
        };
        for default in defaults {
            let descriptor = default.descriptor();
            if descriptor.location == FieldLocation::FixedData {
                map.track_extent(
                    descriptor.group,
                    descriptor.fixed_offset + fixed_size(default.field.data_type()),
                );
            }
            map.items.insert(default.field, descriptor);
        }
        map
    }

    fn track_extent(&mut self, group: usize, end: usize) {
        if let Some(max) = self.max_fixed_size.get_mut(group) {
            *max = (*max).max(end);
        }
    }

    pub fn descriptor(&self, field: F) -> Option<&FieldDescriptor> {
        self.items.get(&field)
    }

    /// Offset of a field stored in fixed data.
    pub fn fixed_offset(&self, field: F) -> Option<usize> {
        self.descriptor(field)
            .filter(|d| d.location == FieldLocation::FixedData)
            .map(|d| d.fixed_offset)
    }

    /// Variable data key of a field stored as a blob.
    pub fn var_key(&self, field: F) -> Option<u16> {
        self.descriptor(field)
            .filter(|d| d.location == FieldLocation::VarData)
            .map(|d| d.var_key)
    }

    /// Largest end offset of any fixed field declared in `group`; zero when unknown.
    pub fn max_fixed_size(&self, group: usize) -> usize {
        self.max_fixed_size.get(group).copied().unwrap_or(0)
    }

    /// Decodes `field` for the record `unique_id`. `fixed` holds the record's fixed data
    /// blocks indexed by group.
    pub fn decode(
        &self,
        field: F,
        unique_id: i32,
        fixed: &[Option<&[u8]>],
        var: &VarData,
        ctx: &DecodeContext,
    ) -> Option<FieldValue> {
        let descriptor = self.descriptor(field)?;
        match descriptor.location {
            FieldLocation::FixedData => {
                let block = fixed.get(descriptor.group).copied().flatten()?;
                if descriptor.fixed_offset >= block.len() {
                    return None;
                }
                let units = || {
                    self.units(field, unique_id, fixed, var, ctx)
                        .unwrap_or(ctx.default_duration_units)
                };
                decode::fixed_value(field.data_type(), block, descriptor.fixed_offset, units, ctx)
            }
            FieldLocation::VarData => {
                let blob = var.blob(unique_id, descriptor.var_key)?;
                let units = || {
                    self.units(field, unique_id, fixed, var, ctx)
                        .unwrap_or(TimeUnit::Hours)
                };
                decode::var_value(field.data_type(), blob, units, ctx)
            }
            FieldLocation::MetaBit | FieldLocation::Unknown => None,
        }
    }

    fn units(
        &self,
        field: F,
        unique_id: i32,
        fixed: &[Option<&[u8]>],
        var: &VarData,
        ctx: &DecodeContext,
    ) -> Option<TimeUnit> {
        let units_field = field.units_field()?;
        self.decode(units_field, unique_id, fixed, var, ctx)?.get()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// One 28-byte control block entry. Var data fields pass `0xFFFF` as `offset`.
#[cfg(test)]
pub(crate) fn build_field_entry(mask: u32, offset: u16, var_key: u8, type_code: u32, category: u16) -> Vec<u8> {
    let mut out = vec![0u8; ENTRY_LEN];
    out[0..4].copy_from_slice(&mask.to_le_bytes());
    out[4..6].copy_from_slice(&offset.to_le_bytes());
    out[6] = var_key;
    out[12..16].copy_from_slice(&type_code.to_le_bytes());
    out[20..22].copy_from_slice(&category.to_le_bytes());
    out
}
