//! Descriptor tables used when a file carries no field map of its own.

use mpp_model::{AssignmentField, ResourceField, TaskField};

use super::descriptor::{FieldDescriptor, FieldLocation};

/// One entry of a default descriptor table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DefaultField<F> {
    pub field: F,
    location: FieldLocation,
    group: usize,
    offset: usize,
    var_key: u16,
}

impl<F> DefaultField<F> {
    pub fn descriptor(&self) -> FieldDescriptor {
        FieldDescriptor {
            location: self.location,
            group: self.group,
            fixed_offset: self.offset,
            var_key: self.var_key,
            mask: 0,
            meta_block: 0,
        }
    }
}

const fn fixed<F>(field: F, group: usize, offset: usize) -> DefaultField<F> {
    DefaultField {
        field,
        location: FieldLocation::FixedData,
        group,
        offset,
        var_key: 0,
    }
}

const fn var<F>(field: F, var_key: u16) -> DefaultField<F> {
    DefaultField {
        field,
        location: FieldLocation::VarData,
        group: 0,
        offset: 0,
        var_key,
    }
}

pub(crate) static TASK_DEFAULTS: &[DefaultField<TaskField>] = &[
    fixed(TaskField::UniqueId, 0, 0),
    fixed(TaskField::Id, 0, 4),
    fixed(TaskField::Start, 0, 8),
    fixed(TaskField::Finish, 0, 12),
    fixed(TaskField::Duration, 0, 16),
    fixed(TaskField::DurationUnits, 0, 20),
    fixed(TaskField::ActualDurationUnits, 0, 22),
    fixed(TaskField::ConstraintType, 0, 24),
    fixed(TaskField::Priority, 0, 26),
    fixed(TaskField::ConstraintDate, 0, 28),
    fixed(TaskField::PercentComplete, 0, 32),
    fixed(TaskField::PercentWorkComplete, 0, 34),
    fixed(TaskField::Type, 0, 36),
    fixed(TaskField::OutlineLevel, 0, 38),
    fixed(TaskField::ActualStart, 0, 40),
    fixed(TaskField::ActualFinish, 0, 44),
    fixed(TaskField::Work, 0, 48),
    fixed(TaskField::ActualWork, 0, 56),
    fixed(TaskField::RemainingWork, 0, 64),
    fixed(TaskField::Cost, 0, 72),
    fixed(TaskField::ActualCost, 0, 80),
    fixed(TaskField::Created, 0, 88),
    fixed(TaskField::Deadline, 0, 92),
    fixed(TaskField::ParentTaskUniqueId, 0, 96),
    fixed(TaskField::CalendarUniqueId, 0, 100),
    fixed(TaskField::ActualDuration, 0, 104),
    fixed(TaskField::RemainingDuration, 0, 108),
    fixed(TaskField::FixedCostAccrual, 0, 112),
    fixed(TaskField::Guid, 1, 0),
    fixed(TaskField::BaselineStart, 1, 24),
    fixed(TaskField::BaselineFinish, 1, 28),
    fixed(TaskField::BaselineDuration, 1, 32),
    fixed(TaskField::BaselineDurationUnits, 1, 36),
    fixed(TaskField::EarnedValueMethod, 1, 38),
    fixed(TaskField::Resume, 1, 40),
    fixed(TaskField::Stop, 1, 44),
    fixed(TaskField::BaselineWork, 1, 48),
    fixed(TaskField::BaselineCost, 1, 56),
    fixed(TaskField::FixedCost, 1, 64),
    fixed(TaskField::LevelingDelay, 1, 72),
    fixed(TaskField::LevelingDelayUnits, 1, 76),
    var(TaskField::Name, 14),
    var(TaskField::Notes, 15),
    var(TaskField::Wbs, 16),
    var(TaskField::Text1, 51),
    var(TaskField::Number1, 87),
    var(TaskField::HyperlinkData, 215),
];

pub(crate) static RESOURCE_DEFAULTS: &[DefaultField<ResourceField>] = &[
    fixed(ResourceField::UniqueId, 0, 0),
    fixed(ResourceField::Id, 0, 4),
    fixed(ResourceField::MaxUnits, 0, 8),
    fixed(ResourceField::StandardRate, 0, 16),
    fixed(ResourceField::OvertimeRate, 0, 24),
    fixed(ResourceField::CostPerUse, 0, 32),
    fixed(ResourceField::Work, 0, 40),
    fixed(ResourceField::ActualWork, 0, 48),
    fixed(ResourceField::Cost, 0, 56),
    fixed(ResourceField::ActualCost, 0, 64),
    fixed(ResourceField::RemainingWork, 0, 72),
    fixed(ResourceField::RemainingCost, 0, 80),
    fixed(ResourceField::BaselineWork, 0, 88),
    fixed(ResourceField::BaselineCost, 0, 96),
    fixed(ResourceField::AccrueAt, 0, 104),
    fixed(ResourceField::StandardRateUnits, 0, 106),
    fixed(ResourceField::OvertimeRateUnits, 0, 108),
    fixed(ResourceField::PercentWorkComplete, 0, 110),
    fixed(ResourceField::Created, 0, 112),
    fixed(ResourceField::Guid, 1, 0),
    fixed(ResourceField::CalendarGuid, 1, 16),
    var(ResourceField::Name, 1),
    var(ResourceField::Initials, 2),
    var(ResourceField::Group, 3),
    var(ResourceField::Text1, 8),
    var(ResourceField::Code, 10),
    var(ResourceField::Notes, 20),
    var(ResourceField::EmailAddress, 35),
    var(ResourceField::HyperlinkData, 136),
    var(ResourceField::BookingType, 699),
];

pub(crate) static ASSIGNMENT_DEFAULTS: &[DefaultField<AssignmentField>] = &[
    fixed(AssignmentField::UniqueId, 0, 0),
    fixed(AssignmentField::TaskUniqueId, 0, 4),
    fixed(AssignmentField::ResourceUniqueId, 0, 8),
    fixed(AssignmentField::Start, 0, 12),
    fixed(AssignmentField::Finish, 0, 16),
    fixed(AssignmentField::ActualStart, 0, 20),
    fixed(AssignmentField::ActualFinish, 0, 24),
    fixed(AssignmentField::Resume, 0, 28),
    fixed(AssignmentField::AssignmentDelay, 0, 32),
    fixed(AssignmentField::VariableRateUnits, 0, 34),
    fixed(AssignmentField::PercentWorkComplete, 0, 36),
    fixed(AssignmentField::AssignmentUnits, 0, 40),
    fixed(AssignmentField::Work, 0, 48),
    fixed(AssignmentField::ActualWork, 0, 56),
    fixed(AssignmentField::RemainingWork, 0, 64),
    fixed(AssignmentField::OvertimeWork, 0, 72),
    fixed(AssignmentField::Cost, 0, 80),
    fixed(AssignmentField::ActualCost, 0, 88),
    fixed(AssignmentField::RemainingCost, 0, 96),
    fixed(AssignmentField::Created, 0, 104),
    fixed(AssignmentField::Guid, 1, 0),
    fixed(AssignmentField::BaselineWork(0), 1, 16),
    fixed(AssignmentField::BaselineCost(0), 1, 24),
    fixed(AssignmentField::ResourceRequestType, 1, 32),
    var(AssignmentField::Notes, 71),
    var(AssignmentField::HyperlinkData, 150),
    var(AssignmentField::TimephasedWork, 49),
    var(AssignmentField::TimephasedActualWork, 50),
    var(AssignmentField::TimephasedActualOvertimeWork, 51),
    var(AssignmentField::TimephasedBaselineWork(0), 52),
    var(AssignmentField::TimephasedBaselineCost(0), 53),
    var(AssignmentField::TimephasedBaselineWork(1), 291),
    var(AssignmentField::TimephasedBaselineCost(1), 292),
    var(AssignmentField::TimephasedBaselineWork(2), 300),
    var(AssignmentField::TimephasedBaselineCost(2), 301),
    var(AssignmentField::TimephasedBaselineWork(3), 309),
    var(AssignmentField::TimephasedBaselineCost(3), 310),
    var(AssignmentField::TimephasedBaselineWork(4), 318),
    var(AssignmentField::TimephasedBaselineCost(4), 319),
    var(AssignmentField::TimephasedBaselineWork(5), 327),
    var(AssignmentField::TimephasedBaselineCost(5), 328),
    var(AssignmentField::TimephasedBaselineWork(6), 336),
    var(AssignmentField::TimephasedBaselineCost(6), 337),
    var(AssignmentField::TimephasedBaselineWork(7), 345),
    var(AssignmentField::TimephasedBaselineCost(7), 346),
    var(AssignmentField::TimephasedBaselineWork(8), 354),
    var(AssignmentField::TimephasedBaselineCost(8), 355),
    var(AssignmentField::TimephasedBaselineWork(9), 363),
    var(AssignmentField::TimephasedBaselineCost(9), 364),
    var(AssignmentField::TimephasedBaselineWork(10), 372),
    var(AssignmentField::TimephasedBaselineCost(10), 373),
];
