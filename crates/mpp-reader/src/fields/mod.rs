//! Field descriptor tables and the typed value decoder.
//!
//! Every entity storage is described by a field map (a `Props` control block) listing,
//! for each field, whether its value lives in fixed data, in a variable data blob or in
//! a bit of the fixed meta item. Entity readers pair each field with a typed setter and
//! let [`FieldMap::decode`] produce the value.

mod decode;
mod defaults;
mod descriptor;

pub(crate) use decode::{
    adjusted_duration, date_at, duration_from_tenths, duration_units, epoch, timestamp_at,
    timestamp_from_tenths, DecodeContext, FieldValue,
};
pub(crate) use defaults::{ASSIGNMENT_DEFAULTS, RESOURCE_DEFAULTS, TASK_DEFAULTS};
pub(crate) use descriptor::{FieldDescriptor, FieldLocation, FieldMap, MAX_GROUPS};
#[cfg(test)]
pub(crate) use descriptor::build_field_entry;

/// Props keys of the field maps, preferred key first.
pub(crate) const TASK_FIELD_MAP_KEYS: &[i32] = &[131092, 50331668];
pub(crate) const RESOURCE_FIELD_MAP_KEYS: &[i32] = &[131093, 50331669];
pub(crate) const ASSIGNMENT_FIELD_MAP_KEYS: &[i32] = &[131095, 50331671];

/// A typed setter applying a decoded value to an entity.
pub(crate) type Setter<E> = fn(&mut E, FieldValue);

/// Decodes every field listed in `setters` and applies the values that are present.
pub(crate) fn apply_fields<E, F: mpp_model::FieldKind>(
    entity: &mut E,
    setters: &[(F, Setter<E>)],
    map: &FieldMap<F>,
    unique_id: i32,
    fixed: &[Option<&[u8]>],
    var: &crate::blocks::VarData,
    ctx: &DecodeContext,
) {
    for (field, set) in setters {
        if let Some(value) = map.decode(*field, unique_id, fixed, var, ctx) {
            set(entity, value);
        }
    }
}
