//! `mpp-model` defines the in-memory project document produced by `mpp-reader`.
//!
//! The types are plain data (every decoded attribute is optional) with `serde`
//! derives so a decoded document can be dumped as JSON. Working-time arithmetic
//! used while decoding timephased data lives here too, behind [`WorkingTime`].

mod assignment;
mod calendar;
mod duration;
mod enums;
mod error;
mod events;
pub mod fields;
mod hyperlink;
mod project;
mod resource;
mod subproject;
mod task;
mod timephased;

pub use assignment::{Assignment, Relation};
pub use calendar::{
    minutes_delta, offset_by, Calendar, CalendarDay, CalendarException, DayType, WorkingRange, WorkingTime,
};
pub use duration::{Duration, Rate, TimeDefaults, TimeUnit};
pub use enums::{
    AccrueType, BookingType, ConstraintType, EarnedValueMethod, Priority, RelationType,
    ResourceRequestType, ResourceType, TaskType, WorkContour, WorkGroup,
};
pub use error::InvalidCode;
pub use events::ProjectListener;
pub use fields::{AssignmentField, DataType, FieldKind, ResourceField, TaskField};
pub use hyperlink::Hyperlink;
pub use project::{FileGeneration, IgnoredError, ProjectFile, ProjectProperties};
pub use resource::Resource;
pub use subproject::SubProject;
pub use task::{Task, TaskSplit};
pub use timephased::{TimephasedCost, TimephasedData, TimephasedWork};
