//! Field identifiers for each entity class, numbered the way project files number them.
//!
//! A stored field type code is `class base | field index`; the index values below are
//! the ones written by the application.

use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Semantic type of a field value. Determines both the stored width and the decoding rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Date,
    Integer,
    Duration,
    TimeUnits,
    Constraint,
    Priority,
    Percentage,
    TaskType,
    Accrue,
    Short,
    Boolean,
    Delay,
    WorkGroup,
    RateUnits,
    EarnedValueMethod,
    ResourceRequestType,
    Currency,
    Units,
    Rate,
    Work,
    WorkUnits,
    Guid,
    String,
    Notes,
    Numeric,
    Binary,
    BookingType,
}

/// A field identifier of one entity class.
pub trait FieldKind: Copy + Eq + Hash + Debug + 'static {
    /// High 16 bits of every type code of this class.
    const TYPE_BASE: u32;

    fn from_index(index: u16) -> Option<Self>;
    fn index(self) -> u16;
    fn data_type(self) -> DataType;

    /// The companion field holding the unit of a duration field.
    fn units_field(self) -> Option<Self> {
        None
    }

    fn from_type_code(code: u32) -> Option<Self> {
        if code & 0xFFFF_0000 != Self::TYPE_BASE {
            return None;
        }
        Self::from_index((code & 0xFFFF) as u16)
    }

    fn type_code(self) -> u32 {
        Self::TYPE_BASE | u32::from(self.index())
    }
}

macro_rules! field_enum {
    (
        $(#[$meta:meta])*
        $name:ident, base = $base:literal {
            $($variant:ident = $index:literal : $data_type:ident),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl FieldKind for $name {
            const TYPE_BASE: u32 = $base;

            fn from_index(index: u16) -> Option<Self> {
                match index {
                    $($index => Some($name::$variant),)+
                    _ => None,
                }
            }

            fn index(self) -> u16 {
                match self {
                    $($name::$variant => $index),+
                }
            }

            fn data_type(self) -> DataType {
                match self {
                    $($name::$variant => DataType::$data_type),+
                }
            }

            fn units_field(self) -> Option<Self> {
                Self::duration_units(self)
            }
        }
    };
}

field_enum! {
    TaskField, base = 0x0B40_0000 {
        Work = 0: Work,
        BaselineWork = 1: Work,
        ActualWork = 2: Work,
        RemainingWork = 4: Work,
        Cost = 5: Currency,
        BaselineCost = 6: Currency,
        ActualCost = 7: Currency,
        FixedCost = 8: Currency,
        Name = 14: String,
        Notes = 15: Notes,
        Wbs = 16: String,
        ConstraintType = 17: Constraint,
        ConstraintDate = 18: Date,
        LevelingDelay = 20: Duration,
        Id = 23: Integer,
        Priority = 25: Priority,
        BaselineDuration = 27: Duration,
        ActualDuration = 28: Duration,
        Duration = 29: Duration,
        RemainingDuration = 31: Duration,
        PercentComplete = 32: Percentage,
        PercentWorkComplete = 33: Percentage,
        Start = 35: Date,
        Finish = 36: Date,
        ActualStart = 41: Date,
        ActualFinish = 42: Date,
        BaselineStart = 43: Date,
        BaselineFinish = 44: Date,
        Text1 = 51: String,
        OutlineLevel = 85: Short,
        UniqueId = 86: Integer,
        Number1 = 87: Numeric,
        Created = 93: Date,
        Resume = 99: Date,
        Stop = 100: Date,
        Type = 128: TaskType,
        DurationUnits = 152: TimeUnits,
        ParentTaskUniqueId = 160: Integer,
        LevelingDelayUnits = 178: TimeUnits,
        BaselineDurationUnits = 179: TimeUnits,
        ActualDurationUnits = 181: TimeUnits,
        FixedCostAccrual = 200: Accrue,
        HyperlinkData = 215: Binary,
        CalendarUniqueId = 401: Integer,
        Deadline = 437: Date,
        EarnedValueMethod = 1122: EarnedValueMethod,
        Guid = 1143: Guid,
        ScheduledStart = 1338: Date,
        ScheduledFinish = 1339: Date,
        ScheduledDuration = 1340: Duration,
    }
}

impl TaskField {
    fn duration_units(self) -> Option<Self> {
        match self {
            TaskField::Duration | TaskField::RemainingDuration | TaskField::ScheduledDuration => {
                Some(TaskField::DurationUnits)
            }
            TaskField::ActualDuration => Some(TaskField::ActualDurationUnits),
            TaskField::BaselineDuration => Some(TaskField::BaselineDurationUnits),
            TaskField::LevelingDelay => Some(TaskField::LevelingDelayUnits),
            _ => None,
        }
    }
}

field_enum! {
    ResourceField, base = 0x0C40_0000 {
        Id = 0: Integer,
        Name = 1: String,
        Initials = 2: String,
        Group = 3: String,
        MaxUnits = 4: Units,
        StandardRate = 6: Rate,
        OvertimeRate = 7: Rate,
        Text1 = 8: String,
        Code = 10: String,
        ActualCost = 11: Currency,
        Cost = 12: Currency,
        Work = 13: Work,
        ActualWork = 14: Work,
        BaselineWork = 15: Work,
        BaselineCost = 17: Currency,
        CostPerUse = 18: Currency,
        AccrueAt = 19: Accrue,
        Notes = 20: Notes,
        RemainingCost = 21: Currency,
        RemainingWork = 22: Work,
        UniqueId = 27: Integer,
        PercentWorkComplete = 29: Percentage,
        EmailAddress = 35: String,
        StandardRateUnits = 70: RateUnits,
        OvertimeRateUnits = 71: RateUnits,
        HyperlinkData = 136: Binary,
        CalendarUniqueId = 402: Integer,
        BookingType = 699: BookingType,
        Created = 726: Date,
        Guid = 728: Guid,
        CalendarGuid = 729: Guid,
    }
}

impl ResourceField {
    fn duration_units(self) -> Option<Self> {
        None
    }
}

/// Assignment field identifiers.
///
/// The slot carried by the baseline variants is 0 for the plain baseline and 1..=10
/// for Baseline1..Baseline10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssignmentField {
    UniqueId,
    TaskUniqueId,
    ResourceUniqueId,
    AssignmentUnits,
    Work,
    OvertimeWork,
    ActualWork,
    RemainingWork,
    Start,
    Finish,
    ActualStart,
    ActualFinish,
    Resume,
    AssignmentDelay,
    Cost,
    ActualCost,
    RemainingCost,
    PercentWorkComplete,
    TimephasedWork,
    TimephasedActualWork,
    TimephasedActualOvertimeWork,
    Notes,
    HyperlinkData,
    VariableRateUnits,
    ResourceRequestType,
    Created,
    Guid,
    BaselineWork(u8),
    BaselineCost(u8),
    TimephasedBaselineWork(u8),
    TimephasedBaselineCost(u8),
}

/// Index of Baseline1 work; each numbered baseline occupies a block of nine indexes.
const NUMBERED_BASELINE_BASE: u16 = 289;
const NUMBERED_BASELINE_STRIDE: u16 = 9;

impl FieldKind for AssignmentField {
    const TYPE_BASE: u32 = 0x0F40_0000;

    fn from_index(index: u16) -> Option<Self> {
        use AssignmentField::*;
        Some(match index {
            0 => UniqueId,
            1 => TaskUniqueId,
            2 => ResourceUniqueId,
            7 => AssignmentUnits,
            8 => Work,
            9 => OvertimeWork,
            10 => ActualWork,
            12 => RemainingWork,
            16 => BaselineWork(0),
            20 => Start,
            21 => Finish,
            22 => ActualStart,
            23 => ActualFinish,
            24 => Resume,
            25 => AssignmentDelay,
            26 => Cost,
            28 => ActualCost,
            29 => RemainingCost,
            32 => BaselineCost(0),
            43 => PercentWorkComplete,
            49 => TimephasedWork,
            50 => TimephasedActualWork,
            51 => TimephasedActualOvertimeWork,
            52 => TimephasedBaselineWork(0),
            53 => TimephasedBaselineCost(0),
            71 => Notes,
            150 => HyperlinkData,
            270 => VariableRateUnits,
            605 => ResourceRequestType,
            634 => Created,
            636 => Guid,
            _ => {
                let relative = index.checked_sub(NUMBERED_BASELINE_BASE)?;
                let slot = relative / NUMBERED_BASELINE_STRIDE + 1;
                if slot > 10 {
                    return None;
                }
                let slot = slot as u8;
                match relative % NUMBERED_BASELINE_STRIDE {
                    0 => BaselineWork(slot),
                    1 => BaselineCost(slot),
                    2 => TimephasedBaselineWork(slot),
                    3 => TimephasedBaselineCost(slot),
                    _ => return None,
                }
            }
        })
    }

    fn index(self) -> u16 {
        use AssignmentField::*;
        let numbered = |slot: u8, column: u16| {
            NUMBERED_BASELINE_BASE + (u16::from(slot) - 1) * NUMBERED_BASELINE_STRIDE + column
        };
        match self {
            UniqueId => 0,
            TaskUniqueId => 1,
            ResourceUniqueId => 2,
            AssignmentUnits => 7,
            Work => 8,
            OvertimeWork => 9,
            ActualWork => 10,
            RemainingWork => 12,
            Start => 20,
            Finish => 21,
            ActualStart => 22,
            ActualFinish => 23,
            Resume => 24,
            AssignmentDelay => 25,
            Cost => 26,
            ActualCost => 28,
            RemainingCost => 29,
            PercentWorkComplete => 43,
            TimephasedWork => 49,
            TimephasedActualWork => 50,
            TimephasedActualOvertimeWork => 51,
            Notes => 71,
            HyperlinkData => 150,
            VariableRateUnits => 270,
            ResourceRequestType => 605,
            Created => 634,
            Guid => 636,
            BaselineWork(0) => 16,
            BaselineCost(0) => 32,
            TimephasedBaselineWork(0) => 52,
            TimephasedBaselineCost(0) => 53,
            BaselineWork(slot) => numbered(slot, 0),
            BaselineCost(slot) => numbered(slot, 1),
            TimephasedBaselineWork(slot) => numbered(slot, 2),
            TimephasedBaselineCost(slot) => numbered(slot, 3),
        }
    }

    fn data_type(self) -> DataType {
        use AssignmentField::*;
        match self {
            UniqueId | TaskUniqueId | ResourceUniqueId => DataType::Integer,
            AssignmentUnits => DataType::Units,
            Work | OvertimeWork | ActualWork | RemainingWork | BaselineWork(_) => DataType::Work,
            Start | Finish | ActualStart | ActualFinish | Resume | Created => DataType::Date,
            AssignmentDelay => DataType::Delay,
            Cost | ActualCost | RemainingCost | BaselineCost(_) => DataType::Currency,
            PercentWorkComplete => DataType::Percentage,
            TimephasedWork
            | TimephasedActualWork
            | TimephasedActualOvertimeWork
            | TimephasedBaselineWork(_)
            | TimephasedBaselineCost(_)
            | HyperlinkData => DataType::Binary,
            Notes => DataType::Notes,
            VariableRateUnits => DataType::WorkUnits,
            ResourceRequestType => DataType::ResourceRequestType,
            Guid => DataType::Guid,
        }
    }
}
