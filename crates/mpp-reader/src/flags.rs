//! Boolean attributes packed into the items of the fixed meta streams.
//!
//! Their positions are not described by the field table, so each layout is a fixed table.

use mpp_model::{Assignment, Resource, Task, WorkContour};

use crate::blocks::bytes::u32_at;

/// Which meta stream a flag lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MetaBlock {
    /// The `FixedMeta` item of the record.
    Meta,
    /// The `Fixed2Meta` item of the record.
    Meta2,
}

/// A run of consecutive custom flags (`Flag1`..`Flag20`) sharing one 32-bit word, the mask
/// doubling from one flag to the next.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FlagRun {
    pub block: MetaBlock,
    pub offset: usize,
    pub first_mask: u32,
    /// Zero-based index of the first flag in the run.
    pub first_flag: usize,
    pub count: usize,
}

const fn run(offset: usize, first_mask: u32, first_flag: usize, count: usize) -> FlagRun {
    FlagRun {
        block: MetaBlock::Meta,
        offset,
        first_mask,
        first_flag,
        count,
    }
}

/// A single named flag and the setter applying it.
pub(crate) struct BitFlag<E> {
    pub block: MetaBlock,
    pub offset: usize,
    pub mask: u32,
    pub set: fn(&mut E, bool),
}

const fn meta<E>(offset: usize, mask: u32, set: fn(&mut E, bool)) -> BitFlag<E> {
    BitFlag {
        block: MetaBlock::Meta,
        offset,
        mask,
        set,
    }
}

const fn meta2<E>(offset: usize, mask: u32, set: fn(&mut E, bool)) -> BitFlag<E> {
    BitFlag {
        block: MetaBlock::Meta2,
        offset,
        mask,
        set,
    }
}

pub(crate) struct FlagTable<E: 'static> {
    pub custom: &'static [FlagRun],
    pub named: &'static [BitFlag<E>],
}

/// Entities carrying `Flag1`..`Flag20`.
pub(crate) trait CustomFlags {
    fn custom_flags_mut(&mut self) -> &mut [bool; 20];
}

impl CustomFlags for Task {
    fn custom_flags_mut(&mut self) -> &mut [bool; 20] {
        &mut self.flags
    }
}

impl CustomFlags for Resource {
    fn custom_flags_mut(&mut self) -> &mut [bool; 20] {
        &mut self.flags
    }
}

impl CustomFlags for Assignment {
    fn custom_flags_mut(&mut self) -> &mut [bool; 20] {
        &mut self.flags
    }
}

fn bit(meta: &[u8], meta2: Option<&[u8]>, block: MetaBlock, offset: usize, mask: u32) -> Option<bool> {
    let item = match block {
        MetaBlock::Meta => meta,
        MetaBlock::Meta2 => meta2?,
    };
    u32_at(item, offset).map(|word| word & mask != 0)
}

impl<E: CustomFlags> FlagTable<E> {
    /// Applies every flag whose word is present in the supplied meta items.
    pub fn apply(&self, entity: &mut E, meta: &[u8], meta2: Option<&[u8]>) {
        for run in self.custom {
            for i in 0..run.count {
                let mask = run.first_mask << i;
                if let Some(value) = bit(meta, meta2, run.block, run.offset, mask) {
                    if let Some(slot) = entity.custom_flags_mut().get_mut(run.first_flag + i) {
                        *slot = value;
                    }
                }
            }
        }
        for flag in self.named {
            if let Some(value) = bit(meta, meta2, flag.block, flag.offset, flag.mask) {
                (flag.set)(entity, value);
            }
        }
    }
}

pub(crate) static TASK_FLAGS_2010: FlagTable<Task> = FlagTable {
    custom: &[run(35, 0x40, 0, 20)],
    named: &[
        meta::<Task>(8, 0x20, |t, v| t.milestone = v),
        meta::<Task>(9, 0x40, |t, v| t.marked = v),
        meta::<Task>(10, 0x02, |t, v| t.ignore_resource_calendar = v),
        meta::<Task>(10, 0x08, |t, v| t.rollup = v),
        meta::<Task>(10, 0x80, |t, v| t.hide_bar = v),
        meta::<Task>(11, 0x10, |t, v| t.effort_driven = v),
        meta::<Task>(13, 0x04, |t, v| t.level_assignments = v),
        meta::<Task>(13, 0x02, |t, v| t.leveling_can_split = v),
        meta2::<Task>(8, 0x04, |t, v| t.active = v),
        meta2::<Task>(8, 0x08, |t, v| t.manual = v),
    ],
};

pub(crate) static TASK_FLAGS_2013: FlagTable<Task> = FlagTable {
    custom: &[run(24, 0x02, 0, 10), run(33, 0x02, 10, 10)],
    named: &[
        meta::<Task>(10, 0x02, |t, v| t.milestone = v),
        meta::<Task>(12, 0x02, |t, v| t.marked = v),
        meta::<Task>(12, 0x04, |t, v| t.rollup = v),
        meta::<Task>(12, 0x80, |t, v| t.hide_bar = v),
        meta::<Task>(13, 0x08, |t, v| t.effort_driven = v),
        meta::<Task>(16, 0x04, |t, v| t.level_assignments = v),
        meta::<Task>(16, 0x02, |t, v| t.leveling_can_split = v),
        meta::<Task>(17, 0x20, |t, v| t.ignore_resource_calendar = v),
        meta2::<Task>(8, 0x40, |t, v| t.active = v),
        meta2::<Task>(8, 0x80, |t, v| t.manual = v),
    ],
};

pub(crate) static RESOURCE_FLAGS_2010: FlagTable<Resource> = FlagTable {
    custom: &[run(28, 0x40, 0, 9), run(28, 0x20, 9, 1), run(28, 0x8000, 10, 10)],
    named: &[
        meta2::<Resource>(8, 0x20, |r, v| r.budget = v),
        meta2::<Resource>(32, 0x0400_0000, |r, v| r.generic = v),
    ],
};

pub(crate) static RESOURCE_FLAGS_2013: FlagTable<Resource> = FlagTable {
    custom: &[run(19, 0x80, 0, 9), run(19, 0x40, 9, 1), run(24, 0x80, 10, 10)],
    named: &[
        meta2::<Resource>(8, 0x20, |r, v| r.budget = v),
        meta2::<Resource>(32, 0x1000_0000, |r, v| r.generic = v),
    ],
};

fn contoured(a: &mut Assignment, v: bool) {
    if v {
        a.work_contour = Some(WorkContour::Contoured);
    }
}

pub(crate) static ASSIGNMENT_FLAGS_LEGACY: FlagTable<Assignment> = FlagTable {
    custom: &[run(28, 0x80, 0, 9), run(28, 0x40, 9, 1), run(28, 0x1_0000, 10, 10)],
    named: &[
        meta::<Assignment>(8, 0x10, contoured),
        meta::<Assignment>(8, 0x80, |a, v| a.confirmed = v),
        meta::<Assignment>(8, 0x100, |a, v| a.response_pending = v),
        meta::<Assignment>(8, 0x2_0000, |a, v| a.team_status_pending = v),
    ],
};

pub(crate) static ASSIGNMENT_FLAGS_2010: FlagTable<Assignment> = FlagTable {
    custom: &[run(28, 0x04, 0, 9), run(28, 0x02, 9, 1), run(28, 0x800, 10, 10)],
    named: &[
        meta::<Assignment>(8, 0x10, contoured),
        meta::<Assignment>(8, 0x80, |a, v| a.confirmed = v),
        meta::<Assignment>(8, 0x100, |a, v| a.response_pending = v),
        meta::<Assignment>(8, 0x2_0000, |a, v| a.team_status_pending = v),
    ],
};

pub(crate) static ASSIGNMENT_FLAGS_2013: FlagTable<Assignment> = FlagTable {
    custom: &[run(20, 0x02, 0, 9), run(20, 0x01, 9, 1), run(25, 0x08, 10, 10)],
    named: &[
        meta::<Assignment>(8, 0x4_0000, contoured),
        meta::<Assignment>(8, 0x80_0000, |a, v| a.confirmed = v),
        meta::<Assignment>(8, 0x100_0000, |a, v| a.response_pending = v),
        meta::<Assignment>(8, 0x200_0000, |a, v| a.team_status_pending = v),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    fn with_word(len: usize, offset: usize, word: u32) -> Vec<u8> {
        let mut item = vec![0u8; len];
        item[offset..offset + 4].copy_from_slice(&word.to_le_bytes());
        item
    }

    #[test]
    fn task_2010_custom_flags_start_at_0x40() {
        let meta = with_word(47, 35, 0x40 | (0x40 << 19));
        let mut task = Task::new(1);
        TASK_FLAGS_2010.apply(&mut task, &meta, None);
        assert!(task.flag(1));
        assert!(!task.flag(2));
        assert!(task.flag(20));
    }

    #[test]
    fn task_2013_named_flags_and_meta2() {
        let mut meta = vec![0u8; 47];
        meta[10] = 0x02;
        meta[13] = 0x08;
        let meta2 = with_word(92, 8, 0x80);
        let mut task = Task::new(1);
        TASK_FLAGS_2013.apply(&mut task, &meta, Some(&meta2));
        assert!(task.milestone);
        assert!(task.effort_driven);
        assert!(task.manual);
        assert!(!task.active);
    }

    #[test]
    fn meta2_flags_are_skipped_without_meta2_item() {
        let mut task = Task::new(1);
        task.active = true;
        TASK_FLAGS_2010.apply(&mut task, &[0u8; 47], None);
        assert!(task.active);
    }

    #[test]
    fn resource_flag10_precedes_flag1() {
        let meta = with_word(37, 28, 0x20);
        let mut resource = Resource::new(1);
        RESOURCE_FLAGS_2010.apply(&mut resource, &meta, None);
        assert!(resource.flags[9]);
        assert_eq!(resource.flags.iter().filter(|f| **f).count(), 1);
    }

    #[test]
    fn assignment_2013_contour_and_confirmed() {
        let meta = with_word(34, 8, 0x4_0000 | 0x80_0000);
        let mut assignment = Assignment::new(1, 2);
        ASSIGNMENT_FLAGS_2013.apply(&mut assignment, &meta, None);
        assert_eq!(assignment.work_contour, Some(WorkContour::Contoured));
        assert!(assignment.confirmed);
        assert!(!assignment.response_pending);
    }
}
