//! Small enumerations stored in project files as integer codes.

use serde::{Deserialize, Serialize};

use crate::InvalidCode;

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident : $kind:literal {
            $($variant:ident = $code:literal),+ $(,)?
        }
        default = $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn code(self) -> i32 {
                match self {
                    $($name::$variant => $code),+
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = InvalidCode;

            fn try_from(code: i32) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    _ => Err(InvalidCode::new($kind, code)),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }
    };
}

coded_enum! {
    /// Scheduling constraint applied to a task.
    ConstraintType: "constraint type" {
        AsSoonAsPossible = 0,
        AsLateAsPossible = 1,
        MustStartOn = 2,
        MustFinishOn = 3,
        StartNoEarlierThan = 4,
        StartNoLaterThan = 5,
        FinishNoEarlierThan = 6,
        FinishNoLaterThan = 7,
    }
    default = AsSoonAsPossible
}

coded_enum! {
    /// How a cost accrues over the life of a task.
    AccrueType: "accrue type" {
        Start = 1,
        End = 2,
        Prorated = 3,
    }
    default = Prorated
}

coded_enum! {
    TaskType: "task type" {
        FixedUnits = 0,
        FixedDuration = 1,
        FixedWork = 2,
    }
    default = FixedUnits
}

coded_enum! {
    WorkGroup: "work group" {
        Default = 0,
        None = 1,
        Email = 2,
        Web = 3,
    }
    default = Default
}

coded_enum! {
    EarnedValueMethod: "earned value method" {
        PercentComplete = 0,
        PhysicalPercentComplete = 1,
    }
    default = PercentComplete
}

coded_enum! {
    ResourceRequestType: "resource request type" {
        None = 0,
        Demand = 1,
    }
    default = None
}

coded_enum! {
    BookingType: "booking type" {
        Committed = 0,
        Proposed = 1,
    }
    default = Committed
}

coded_enum! {
    /// Shape used to spread assignment work over its duration.
    WorkContour: "work contour" {
        Flat = 0,
        BackLoaded = 1,
        FrontLoaded = 2,
        DoublePeak = 3,
        EarlyPeak = 4,
        LatePeak = 5,
        Bell = 6,
        Turtle = 7,
        Contoured = 8,
    }
    default = Flat
}

coded_enum! {
    /// Relationship between a predecessor and a successor task.
    RelationType: "relation type" {
        FinishFinish = 0,
        FinishStart = 1,
        StartFinish = 2,
        StartStart = 3,
    }
    default = FinishStart
}

coded_enum! {
    ResourceType: "resource type" {
        Work = 0,
        Material = 1,
        Cost = 2,
    }
    default = Work
}

/// Task priority. Stored as the raw value (0..=1000, 500 is "medium").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    pub const MEDIUM: Priority = Priority(500);
}

impl Default for Priority {
    fn default() -> Self {
        Self::MEDIUM
    }
}
