//! Identity reconciliation: picks the authoritative record for every unique id of a fixed
//! record array, then restores the display order of tasks.
//!
//! Files that were edited and resaved many times accumulate stale copies of records.
//! Later copies supersede earlier ones, deleted records leave tombstones, and blank
//! rows are stored as short placeholder records.

use std::collections::{BTreeMap, HashMap};

use crate::blocks::bytes::{i32_at, u16_at};
use crate::blocks::fixed_meta::{DELETED_FLAG, DELETED_SUB_FLAG};
use crate::blocks::{FixedData, FixedMeta, VarMeta};
use crate::error::ReadError;

/// Size of the placeholder record stored for a blank task row.
pub(crate) const NULL_TASK_BLOCK_SIZE: usize = 16;
/// Offset of the display id inside a task record.
pub(crate) const TASK_ID_FIXED_OFFSET: usize = 4;
/// The first task records hold no tasks.
const RESERVED_TASK_RECORDS: usize = 3;
/// Share of the declared record size a record needs to be accepted as complete.
const COMPLETE_RECORD_PERCENT: usize = 75;

/// Unique id to record index, with tombstones for deleted ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct IdentityMap {
    entries: BTreeMap<i32, Option<usize>>,
}

impl IdentityMap {
    /// Live ids and their record indexes, in ascending id order.
    pub fn live(&self) -> impl Iterator<Item = (i32, usize)> + '_ {
        self.entries
            .iter()
            .filter_map(|(id, index)| index.map(|index| (*id, index)))
    }

    pub fn index_of(&self, unique_id: i32) -> Option<usize> {
        self.entries.get(&unique_id).copied().flatten()
    }

    pub fn is_tombstoned(&self, unique_id: i32) -> bool {
        matches!(self.entries.get(&unique_id), Some(None))
    }

    pub fn live_count(&self) -> usize {
        self.entries.values().filter(|index| index.is_some()).count()
    }
}

/// The task streams the reconciler inspects.
pub(crate) struct TaskRecords<'a> {
    pub meta: &'a FixedMeta,
    pub fixed: &'a FixedData,
    /// Present for generations that split task records over two streams; a record
    /// missing its second half is skipped.
    pub fixed2: Option<&'a FixedData>,
    pub var_meta: &'a VarMeta,
}

/// Builds the task identity map.
///
/// `max_size` is the declared size of a complete record (zero when unknown).
pub(crate) fn reconcile_tasks(records: &TaskRecords<'_>, unique_id_offset: usize, max_size: usize) -> IdentityMap {
    let mut entries: BTreeMap<i32, Option<usize>> = BTreeMap::new();

    for index in (RESERVED_TASK_RECORDS..records.meta.item_count()).rev() {
        let Some(data) = records.fixed.record(index) else {
            continue;
        };
        if let Some(fixed2) = records.fixed2 {
            if fixed2.record(index).is_none() {
                continue;
            }
        }
        let flags = records.meta.flags(index);

        if flags & DELETED_FLAG != 0 {
            // Deleted records only keep a short id. A later copy already seen decides.
            if let Some(unique_id) = u16_at(data, 0) {
                entries.entry(i32::from(unique_id)).or_insert(None);
            }
            continue;
        }

        if data.len() == NULL_TASK_BLOCK_SIZE {
            if let Some(unique_id) = i32_at(data, 0) {
                entries.entry(unique_id).or_insert(Some(index));
            }
            continue;
        }

        if max_size != 0 && data.len() * 100 < max_size * COMPLETE_RECORD_PERCENT {
            log::debug!("skipping incomplete task record {index} ({} of {max_size} bytes)", data.len());
            continue;
        }
        let Some(unique_id) = i32_at(data, unique_id_offset) else {
            continue;
        };
        match entries.get(&unique_id) {
            None => {
                entries.insert(unique_id, Some(index));
            }
            Some(None) => {
                let has_var_data = records.var_meta.keys(unique_id).next().is_some();
                if has_var_data && flags & DELETED_SUB_FLAG == 0 {
                    entries.insert(unique_id, Some(index));
                }
            }
            // A later copy already won.
            Some(Some(_)) => {}
        }
    }

    IdentityMap { entries }
}

/// Builds the resource identity map: the first complete record of each id wins.
pub(crate) fn reconcile_resources(
    meta: &FixedMeta,
    fixed: &FixedData,
    unique_id_offset: usize,
    max_size: usize,
) -> IdentityMap {
    let mut entries = BTreeMap::new();
    for index in 0..meta.item_count() {
        let Some(data) = fixed.record(index) else {
            continue;
        };
        if data.len() < max_size {
            continue;
        }
        if let Some(unique_id) = u16_at(data, unique_id_offset) {
            entries.entry(i32::from(unique_id)).or_insert(Some(index));
        }
    }
    IdentityMap { entries }
}

/// Display-order information collected while tasks are read.
#[derive(Debug, Clone, Default)]
pub(crate) struct TaskOrder {
    /// Order key to unique id for real tasks.
    ordered: BTreeMap<i64, i32>,
    /// Recorded display id to unique id for placeholder tasks and tasks without an
    /// order key.
    positioned: BTreeMap<i32, i32>,
}

impl TaskOrder {
    pub fn add_ordered(&mut self, key: i64, unique_id: i32) {
        self.ordered.insert(key, unique_id);
    }

    pub fn add_positioned(&mut self, id: i32, unique_id: i32) {
        self.positioned.insert(id, unique_id);
    }

    pub fn has_position(&self, id: i32) -> bool {
        self.positioned.contains_key(&id)
    }

    /// Forgets a task that was superseded after it had been ordered.
    pub fn remove(&mut self, unique_id: i32) {
        self.ordered.retain(|_, u| *u != unique_id);
        self.positioned.retain(|_, u| *u != unique_id);
    }

    /// Assigns sequential display ids: real tasks follow their order keys and each
    /// positioned task is slotted in next to the tasks it was recorded beside.
    ///
    /// Returns `(unique id, new id)` pairs in display order. Ids start at 0 when
    /// `zero_based` (a task with unique id 0 exists) and at 1 otherwise.
    pub fn renumber(&self, zero_based: bool) -> Result<Vec<(i32, i32)>, ReadError> {
        let stride = ((self.positioned.len() / 1000) as i64 + 1) * 2000;
        self.renumber_with_stride(stride, zero_based)
    }

    fn renumber_with_stride(&self, stride: i64, zero_based: bool) -> Result<Vec<(i32, i32)>, ReadError> {
        let mut slots: BTreeMap<i64, i32> = BTreeMap::new();
        let mut next = if zero_based { 0 } else { stride };
        for unique_id in self.ordered.values() {
            slots.insert(next, *unique_id);
            next += stride;
        }

        let mut offsets: HashMap<i64, i64> = HashMap::new();
        for (inserted, (id, unique_id)) in self.positioned.iter().enumerate() {
            let base = (i64::from(*id) - inserted as i64) * stride;
            let mut offset = offsets.get(&base).map_or(0, |previous| previous + 1);
            let mut target = base;
            while slots.contains_key(&target) {
                offset += 1;
                if offset >= stride {
                    return Err(ReadError::TaskOrder { unique_id: *unique_id });
                }
                target = base - (stride - offset);
            }
            offsets.insert(base, offset);
            slots.insert(target, *unique_id);
        }

        let first = if zero_based { 0 } else { 1 };
        Ok(slots
            .into_values()
            .zip(first..)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::blocks::fixed_meta::build_fixed_meta;
    use crate::blocks::var_meta::{build_var_meta, VarKeyWidth};

    const RECORD: usize = 40;

    /// Task records laid out back to back; `None` entries are placeholders.
    struct Fixture {
        meta: FixedMeta,
        fixed: FixedData,
        var_meta: VarMeta,
    }

    fn fixture(records: &[(u32, Vec<u8>)], var_ids: &[i32]) -> Fixture {
        let mut buffer = Vec::new();
        let mut items = Vec::new();
        for _ in 0..RESERVED_TASK_RECORDS {
            items.push((0, buffer.len() as u32));
            buffer.extend_from_slice(&[0u8; RECORD]);
        }
        for (flags, data) in records {
            items.push((*flags, buffer.len() as u32));
            buffer.extend_from_slice(data);
        }
        let meta = FixedMeta::new(build_fixed_meta(8, &items), 8);
        let fixed = FixedData::from_meta(&meta, buffer, 0, 0);
        let var_items: Vec<(i32, i32, u16)> = var_ids.iter().map(|id| (*id, 0, 14)).collect();
        let var_meta = VarMeta::parse(&build_var_meta(&var_items, VarKeyWidth::Short), VarKeyWidth::Short);
        Fixture { meta, fixed, var_meta }
    }

    fn task(unique_id: i32, marker: u8) -> Vec<u8> {
        let mut data = vec![marker; RECORD];
        data[0..4].copy_from_slice(&unique_id.to_le_bytes());
        data
    }

    fn null_task(unique_id: i32) -> Vec<u8> {
        let mut data = vec![0u8; NULL_TASK_BLOCK_SIZE];
        data[0..4].copy_from_slice(&unique_id.to_le_bytes());
        data
    }

    fn reconcile(f: &Fixture) -> IdentityMap {
        let records = TaskRecords {
            meta: &f.meta,
            fixed: &f.fixed,
            fixed2: None,
            var_meta: &f.var_meta,
        };
        reconcile_tasks(&records, 0, RECORD)
    }

    #[test]
    fn later_copy_of_a_record_wins() {
        let f = fixture(&[(0, task(7, 1)), (0, task(8, 1)), (0, task(7, 2))], &[7]);
        let map = reconcile(&f);
        assert_eq!(map.index_of(7), Some(5));
        assert_eq!(map.index_of(8), Some(4));
    }

    #[test]
    fn deleted_ids_are_tombstoned() {
        let f = fixture(&[(0, task(7, 1)), (DELETED_FLAG, task(7, 0))], &[]);
        let map = reconcile(&f);
        assert!(map.is_tombstoned(7));
        assert_eq!(map.live().count(), 0);
    }

    #[test]
    fn tombstone_yields_to_a_record_with_var_data() {
        let f = fixture(&[(0, task(7, 1)), (DELETED_FLAG, task(7, 0))], &[7]);
        assert_eq!(reconcile(&f).index_of(7), Some(3));

        let f = fixture(&[(DELETED_SUB_FLAG, task(7, 1)), (DELETED_FLAG, task(7, 0))], &[7]);
        assert!(reconcile(&f).is_tombstoned(7));
    }

    #[test]
    fn earlier_deleted_copy_does_not_hide_a_later_live_copy() {
        let f = fixture(&[(DELETED_FLAG, task(7, 0)), (0, task(7, 1))], &[7]);
        let map = reconcile(&f);
        assert_eq!(map.index_of(7), Some(4));
        assert!(!map.is_tombstoned(7));

        let f = fixture(&[(DELETED_FLAG, task(7, 0)), (0, task(7, 1))], &[]);
        assert_eq!(reconcile(&f).index_of(7), Some(4));
    }

    #[test]
    fn placeholders_keep_their_last_occurrence_and_short_records_are_skipped() {
        let f = fixture(
            &[(0, null_task(3)), (0, null_task(3)), (0, task(9, 1)[..20].to_vec())],
            &[],
        );
        let map = reconcile(&f);
        assert_eq!(map.index_of(3), Some(4));
        assert_eq!(map.index_of(9), None);
        assert_eq!(map.live_count(), 1);
    }

    #[test]
    fn records_of_three_quarters_the_declared_size_are_complete() {
        let f = fixture(&[(0, task(9, 1)[..30].to_vec()), (0, task(8, 1)[..29].to_vec())], &[]);
        let map = reconcile(&f);
        assert_eq!(map.index_of(9), Some(3));
        assert_eq!(map.index_of(8), None);
    }

    #[test]
    fn reserved_records_are_never_read() {
        let f = fixture(&[], &[]);
        assert_eq!(reconcile(&f), IdentityMap::default());
    }

    fn resource_records(offset: usize, records: &[(u16, usize)]) -> (FixedMeta, FixedData) {
        let mut buffer = Vec::new();
        let mut items = Vec::new();
        for (unique_id, len) in records {
            items.push((0, buffer.len() as u32));
            let mut record = vec![0xEEu8; *len];
            if let Some(slot) = record.get_mut(offset..offset + 2) {
                slot.copy_from_slice(&unique_id.to_le_bytes());
            }
            buffer.extend_from_slice(&record);
        }
        let meta = FixedMeta::new(build_fixed_meta(8, &items), 8);
        let fixed = FixedData::from_meta(&meta, buffer, 0, 0);
        (meta, fixed)
    }

    #[test]
    fn resources_keep_the_first_complete_record() {
        let (meta, fixed) = resource_records(0, &[(4, 24), (4, 24), (5, 10)]);
        let map = reconcile_resources(&meta, &fixed, 0, 24);
        assert_eq!(map.live().collect::<Vec<_>>(), vec![(4, 0)]);
    }

    #[test]
    fn resource_ids_are_read_at_the_mapped_offset() {
        let (meta, fixed) = resource_records(12, &[(4, 24), (6, 24)]);
        let map = reconcile_resources(&meta, &fixed, 12, 24);
        assert_eq!(map.live().collect::<Vec<_>>(), vec![(4, 0), (6, 1)]);
    }

    #[test]
    fn placeholders_slot_between_their_neighbours() {
        let mut order = TaskOrder::default();
        order.add_ordered(10, 100);
        order.add_ordered(30, 300);
        order.add_positioned(2, 200);
        order.add_positioned(4, 400);
        assert_eq!(
            order.renumber(false).unwrap(),
            vec![(100, 1), (200, 2), (300, 3), (400, 4)]
        );
    }

    #[test]
    fn zero_based_numbering_when_unique_id_zero_exists() {
        let mut order = TaskOrder::default();
        order.add_ordered(1, 0);
        order.add_ordered(2, 5);
        order.add_positioned(1, 9);
        assert_eq!(order.renumber(true).unwrap(), vec![(0, 0), (9, 1), (5, 2)]);
    }

    #[test]
    fn exhausted_gap_is_reported() {
        let mut order = TaskOrder::default();
        order.add_ordered(1, 1);
        order.add_ordered(2, 2);
        // Three placeholders recorded before the second task do not fit a stride of 4.
        for id in 2..5 {
            order.add_positioned(id, 100 + id);
        }
        assert!(order.renumber(false).is_ok());
        assert!(matches!(
            order.renumber_with_stride(4, false),
            Err(ReadError::TaskOrder { unique_id: 104 })
        ));
    }

    proptest! {
        #[test]
        fn renumbering_preserves_neighbours(layout in proptest::collection::vec(any::<bool>(), 1..60)) {
            let mut order = TaskOrder::default();
            for (position, is_null) in layout.iter().enumerate() {
                let id = position as i32 + 1;
                let unique_id = id * 10;
                if *is_null {
                    order.add_positioned(id, unique_id);
                } else {
                    order.add_ordered(i64::from(id) * 7, unique_id);
                }
            }

            let renumbered = order.renumber(false).unwrap();
            prop_assert_eq!(renumbered.len(), layout.len());
            let ids: Vec<i32> = renumbered.iter().map(|(_, id)| *id).collect();
            prop_assert_eq!(ids, (1..=layout.len() as i32).collect::<Vec<_>>());

            // Real tasks keep their relative order.
            let reals: Vec<i32> = renumbered
                .iter()
                .map(|(unique_id, _)| *unique_id)
                .filter(|unique_id| !layout[(*unique_id / 10 - 1) as usize])
                .collect();
            let mut sorted = reals.clone();
            sorted.sort_unstable();
            prop_assert_eq!(reals, sorted);

            // Each placeholder is preceded by exactly the real tasks that preceded it.
            for (position, (unique_id, _)) in renumbered.iter().enumerate() {
                let original = (*unique_id / 10 - 1) as usize;
                if !layout[original] {
                    continue;
                }
                let before_now = renumbered[..position]
                    .iter()
                    .filter(|(u, _)| !layout[(*u / 10 - 1) as usize])
                    .count();
                let before_then = layout[..original].iter().filter(|n| !**n).count();
                prop_assert_eq!(before_now, before_then);
            }
        }
    }
}
