//! Per-generation constants. Each supported file generation is described by one immutable
//! [`GenerationTable`]; the decoder is parameterised by the table instead of by type.

use mpp_model::{Assignment, FileGeneration, Resource, Task};

use crate::blocks::VarKeyWidth;
use crate::flags::{self, FlagTable};

/// How the records of a `FixedData` stream are delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordLayout {
    /// Offsets come from the companion meta stream with `item_size`-byte items.
    Meta {
        item_size: usize,
        max_expected: SizeRule,
        min_size: SizeRule,
    },
    /// Offsets come from the companion meta stream, whose item size is whichever candidate
    /// agrees with the record count of group 0.
    MetaCandidates { item_sizes: &'static [usize] },
    /// Consecutive records of a fixed size.
    Uniform { item_size: usize },
}

/// A size bound used when splitting a `FixedData` stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SizeRule {
    None,
    Bytes(usize),
    /// The largest fixed-data extent declared by the field table for the group.
    FieldTableMax,
}

impl SizeRule {
    pub fn resolve(self, field_table_max: usize) -> usize {
        match self {
            SizeRule::None => 0,
            SizeRule::Bytes(n) => n,
            SizeRule::FieldTableMax => field_table_max,
        }
    }
}

const META_ONLY: SizeRule = SizeRule::None;

/// Stream layout of one entity storage.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntityLayout {
    pub storage: &'static str,
    pub fixed_meta_item_size: usize,
    pub fixed: RecordLayout,
    pub fixed2: Option<RecordLayout>,
}

/// Bit flags read from the fixed meta items, in the layouts written before and after the
/// 2013 application release.
pub(crate) struct FlagLayouts<E: 'static> {
    pub legacy: &'static FlagTable<E>,
    pub current: &'static FlagTable<E>,
}

impl<E> FlagLayouts<E> {
    /// Application version 15 (Project 2013) introduced the `current` layout.
    pub fn select(&self, application_version: Option<u32>) -> &'static FlagTable<E> {
        match application_version {
            Some(version) if version > 14 => self.current,
            _ => self.legacy,
        }
    }
}

/// Binary layout of a calendar's hours blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CalendarLayout {
    pub hours_offset: usize,
    pub exception: ExceptionLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExceptionLayout {
    pub block_len: usize,
    pub period_count_offset: usize,
    pub starts_offset: usize,
    pub durations_offset: usize,
    /// Offset of the name length; the UTF-16 name follows the fixed block.
    pub name_len_offset: Option<usize>,
}

pub(crate) struct GenerationTable {
    pub generation: FileGeneration,
    pub project_dir: &'static str,
    pub props_stream: &'static str,
    pub var_key_width: VarKeyWidth,
    /// Variable data keys equal the low 16 bits of the field type code.
    pub type_is_var_key: bool,
    pub task: EntityLayout,
    pub resource: EntityLayout,
    pub assignment: EntityLayout,
    pub calendar: EntityLayout,
    pub relation: EntityLayout,
    pub calendar_layout: CalendarLayout,
    pub task_flags: FlagLayouts<Task>,
    pub resource_flags: FlagLayouts<Resource>,
    pub assignment_flags: FlagLayouts<Assignment>,
}

const TASK_STORAGE: &str = "TBkndTask";
const RESOURCE_STORAGE: &str = "TBkndRsc";
const ASSIGNMENT_STORAGE: &str = "TBkndAssn";
const CALENDAR_STORAGE: &str = "TBkndCal";
const RELATION_STORAGE: &str = "TBkndCons";

const CALENDAR_ENTITY: EntityLayout = EntityLayout {
    storage: CALENDAR_STORAGE,
    fixed_meta_item_size: 10,
    fixed: RecordLayout::Meta {
        item_size: 10,
        max_expected: SizeRule::Bytes(12),
        min_size: SizeRule::Bytes(12),
    },
    fixed2: Some(RecordLayout::Meta {
        item_size: 9,
        max_expected: SizeRule::Bytes(48),
        min_size: META_ONLY,
    }),
};

const RELATION_ENTITY: EntityLayout = EntityLayout {
    storage: RELATION_STORAGE,
    fixed_meta_item_size: 10,
    fixed: RecordLayout::Uniform { item_size: 20 },
    fixed2: None,
};

const LEGACY_EXCEPTIONS: ExceptionLayout = ExceptionLayout {
    block_len: 64,
    period_count_offset: 6,
    starts_offset: 12,
    durations_offset: 24,
    name_len_offset: None,
};

static MPP9: GenerationTable = GenerationTable {
    generation: FileGeneration::Mpp9,
    project_dir: "/   19",
    props_stream: "/Props9",
    var_key_width: VarKeyWidth::Byte,
    type_is_var_key: false,
    task: EntityLayout {
        storage: TASK_STORAGE,
        fixed_meta_item_size: 47,
        fixed: RecordLayout::Meta {
            item_size: 47,
            max_expected: SizeRule::Bytes(768),
            min_size: SizeRule::FieldTableMax,
        },
        fixed2: None,
    },
    resource: EntityLayout {
        storage: RESOURCE_STORAGE,
        fixed_meta_item_size: 37,
        fixed: RecordLayout::Meta {
            item_size: 37,
            max_expected: META_ONLY,
            min_size: META_ONLY,
        },
        fixed2: None,
    },
    assignment: EntityLayout {
        storage: ASSIGNMENT_STORAGE,
        fixed_meta_item_size: 34,
        fixed: RecordLayout::Uniform { item_size: 142 },
        fixed2: None,
    },
    calendar: CALENDAR_ENTITY,
    relation: RELATION_ENTITY,
    calendar_layout: CalendarLayout {
        hours_offset: 4,
        exception: LEGACY_EXCEPTIONS,
    },
    task_flags: FlagLayouts {
        legacy: &flags::TASK_FLAGS_2010,
        current: &flags::TASK_FLAGS_2010,
    },
    resource_flags: FlagLayouts {
        legacy: &flags::RESOURCE_FLAGS_2010,
        current: &flags::RESOURCE_FLAGS_2010,
    },
    assignment_flags: FlagLayouts {
        legacy: &flags::ASSIGNMENT_FLAGS_LEGACY,
        current: &flags::ASSIGNMENT_FLAGS_LEGACY,
    },
};

static MPP12: GenerationTable = GenerationTable {
    generation: FileGeneration::Mpp12,
    project_dir: "/   112",
    props_stream: "/Props12",
    var_key_width: VarKeyWidth::Short,
    type_is_var_key: false,
    task: EntityLayout {
        storage: TASK_STORAGE,
        fixed_meta_item_size: 47,
        fixed: RecordLayout::Meta {
            item_size: 47,
            max_expected: SizeRule::Bytes(768),
            min_size: SizeRule::FieldTableMax,
        },
        fixed2: Some(RecordLayout::Meta {
            item_size: 86,
            max_expected: META_ONLY,
            min_size: META_ONLY,
        }),
    },
    resource: EntityLayout {
        storage: RESOURCE_STORAGE,
        fixed_meta_item_size: 37,
        fixed: RecordLayout::Meta {
            item_size: 37,
            max_expected: META_ONLY,
            min_size: META_ONLY,
        },
        fixed2: Some(RecordLayout::Meta {
            item_size: 49,
            max_expected: META_ONLY,
            min_size: META_ONLY,
        }),
    },
    assignment: EntityLayout {
        storage: ASSIGNMENT_STORAGE,
        fixed_meta_item_size: 34,
        fixed: RecordLayout::Meta {
            item_size: 34,
            max_expected: META_ONLY,
            min_size: META_ONLY,
        },
        fixed2: Some(RecordLayout::Uniform { item_size: 48 }),
    },
    calendar: CALENDAR_ENTITY,
    relation: RELATION_ENTITY,
    calendar_layout: CalendarLayout {
        hours_offset: 4,
        exception: LEGACY_EXCEPTIONS,
    },
    task_flags: FlagLayouts {
        legacy: &flags::TASK_FLAGS_2010,
        current: &flags::TASK_FLAGS_2010,
    },
    resource_flags: FlagLayouts {
        legacy: &flags::RESOURCE_FLAGS_2010,
        current: &flags::RESOURCE_FLAGS_2010,
    },
    assignment_flags: FlagLayouts {
        legacy: &flags::ASSIGNMENT_FLAGS_LEGACY,
        current: &flags::ASSIGNMENT_FLAGS_LEGACY,
    },
};

static MPP14: GenerationTable = GenerationTable {
    generation: FileGeneration::Mpp14,
    project_dir: "/   114",
    props_stream: "/Props14",
    var_key_width: VarKeyWidth::Short,
    type_is_var_key: true,
    task: EntityLayout {
        storage: TASK_STORAGE,
        fixed_meta_item_size: 47,
        fixed: RecordLayout::Meta {
            item_size: 47,
            max_expected: SizeRule::FieldTableMax,
            min_size: META_ONLY,
        },
        fixed2: Some(RecordLayout::MetaCandidates {
            item_sizes: &[92, 93, 94, 95, 96],
        }),
    },
    resource: EntityLayout {
        storage: RESOURCE_STORAGE,
        fixed_meta_item_size: 37,
        fixed: RecordLayout::Meta {
            item_size: 37,
            max_expected: META_ONLY,
            min_size: META_ONLY,
        },
        fixed2: Some(RecordLayout::MetaCandidates { item_sizes: &[50, 51] }),
    },
    assignment: EntityLayout {
        storage: ASSIGNMENT_STORAGE,
        fixed_meta_item_size: 34,
        fixed: RecordLayout::Uniform { item_size: 110 },
        fixed2: Some(RecordLayout::Uniform { item_size: 48 }),
    },
    calendar: CALENDAR_ENTITY,
    relation: RELATION_ENTITY,
    calendar_layout: CalendarLayout {
        hours_offset: 0,
        exception: ExceptionLayout {
            block_len: 92,
            period_count_offset: 14,
            starts_offset: 20,
            durations_offset: 32,
            name_len_offset: Some(88),
        },
    },
    task_flags: FlagLayouts {
        legacy: &flags::TASK_FLAGS_2010,
        current: &flags::TASK_FLAGS_2013,
    },
    resource_flags: FlagLayouts {
        legacy: &flags::RESOURCE_FLAGS_2010,
        current: &flags::RESOURCE_FLAGS_2013,
    },
    assignment_flags: FlagLayouts {
        legacy: &flags::ASSIGNMENT_FLAGS_2010,
        current: &flags::ASSIGNMENT_FLAGS_2013,
    },
};

impl GenerationTable {
    pub fn for_generation(generation: FileGeneration) -> &'static GenerationTable {
        match generation {
            FileGeneration::Mpp9 => &MPP9,
            FileGeneration::Mpp12 => &MPP12,
            FileGeneration::Mpp14 => &MPP14,
        }
    }

    /// Absolute path of a stream inside one of the project's entity storages.
    pub fn stream_path(&self, entity: &EntityLayout, stream: &str) -> String {
        format!("{}/{}/{stream}", self.project_dir, entity.storage)
    }

    pub fn storage_path(&self, entity: &EntityLayout) -> String {
        format!("{}/{}", self.project_dir, entity.storage)
    }
}
