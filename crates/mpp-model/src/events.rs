use crate::assignment::{Assignment, Relation};
use crate::calendar::Calendar;
use crate::project::IgnoredError;
use crate::resource::Resource;
use crate::task::Task;

/// Receives entities as they are decoded.
///
/// All methods default to no-ops; `()` is the listener that ignores everything.
pub trait ProjectListener {
    fn calendar_read(&mut self, _calendar: &Calendar) {}
    fn task_read(&mut self, _task: &Task) {}
    fn resource_read(&mut self, _resource: &Resource) {}
    fn assignment_read(&mut self, _assignment: &Assignment) {}
    fn relation_read(&mut self, _relation: &Relation) {}
    fn error_ignored(&mut self, _error: &IgnoredError) {}
}

impl ProjectListener for () {}
