//! Microsoft Project `.mpp` decoder (file generations 9, 12 and 14).
//!
//! A project file is a compound file. Each entity class lives in its own storage as a set
//! of block streams: fixed-size records indexed by a meta stream, variable data blobs keyed
//! by unique id and field key, and a field map describing where each field is stored. The
//! readers in this crate reconcile stale record copies, decode typed values through the
//! field map and place timephased work curves on the assignment calendars.
//!
//! Decoding is best-effort: problems local to a record are recorded on
//! [`ProjectFile::ignored_errors`] and reading continues. Only structural problems abort
//! with a [`ReadError`].

use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

use mpp_model::{Calendar, ProjectFile, ProjectListener};

mod assignment;
mod blocks;
mod calendar;
mod container;
mod error;
mod fields;
mod flags;
mod generation;
mod hyperlink;
mod properties;
mod reconcile;
mod relation;
mod resource;
mod storage;
mod subproject;
mod task;
mod timephased;

#[cfg(test)]
mod test_support;

pub use container::{CfbSource, MemorySource, StreamSource};
pub use error::ReadError;

use blocks::{Props, PROPS};
use calendar::{read_calendars, CalendarSet};
use container::detect_format;
use error::IgnoredErrors;
use fields::DecodeContext;
use generation::GenerationTable;
use storage::EntityStreams;

/// Controls which parts of a file are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Decode the timephased work curves of assignments.
    pub read_timephased: bool,
    /// Decode baseline work and cost curves. Ignored unless `read_timephased` is set.
    pub read_baselines: bool,
    /// Read files whose password flag is set instead of failing with
    /// [`ReadError::PasswordProtected`].
    pub allow_password_protected: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            read_timephased: true,
            read_baselines: true,
            allow_password_protected: false,
        }
    }
}

/// Reads a project file from disk.
pub fn read_mpp_path(path: impl AsRef<Path>, options: &ReadOptions) -> Result<ProjectFile, ReadError> {
    let file = File::open(path.as_ref())?;
    let mut source = CfbSource::open(BufReader::new(file))?;
    read_mpp_with_listener(&mut source, options, &mut ())
}

/// Reads a project file held in memory.
pub fn read_mpp_bytes(bytes: &[u8], options: &ReadOptions) -> Result<ProjectFile, ReadError> {
    let mut source = CfbSource::open(Cursor::new(bytes))?;
    read_mpp_with_listener(&mut source, options, &mut ())
}

/// Reads a project from `source`, reporting each decoded entity to `listener`.
///
/// Entities are announced stage by stage as each storage is decoded: calendars, tasks,
/// resources, assignments, then relations. Errors ignored during a stage are announced at
/// the end of it. A read that fails part way has already announced the earlier stages.
/// Task splits come from assignment curves, so announced tasks do not carry them; the
/// returned document does.
pub fn read_mpp_with_listener(
    source: &mut dyn StreamSource,
    options: &ReadOptions,
    listener: &mut dyn ProjectListener,
) -> Result<ProjectFile, ReadError> {
    let format = detect_format(source)?;
    let table = GenerationTable::for_generation(format.generation);
    if !source.storage_exists(table.project_dir) {
        return Err(ReadError::MissingStorage(table.project_dir.to_string()));
    }

    let props_path = format!("{}/{PROPS}", table.project_dir);
    let props = source
        .read_stream(&props_path)?
        .map(|data| Props::parse(&data))
        .ok_or(ReadError::MissingStream(props_path))?;
    let properties = properties::read_properties(&props, format);
    if properties.password_protected && !options.allow_password_protected {
        return Err(ReadError::PasswordProtected);
    }
    log::debug!(
        "reading generation {} file (application version {:?})",
        format.generation.number(),
        format.application_version
    );

    let ctx = DecodeContext::new(&properties);
    let mut errors = IgnoredErrors::default();
    let mut project = ProjectFile::new(properties);

    let calendars = read_calendar_storage(source, table, &props, &mut errors)?;
    project.calendars = calendars.calendars;
    if project.calendars.is_empty() {
        log::debug!("no calendars; using the standard calendar");
        project.calendars.push(Calendar::standard(1, "Standard"));
    }
    announce(&project.calendars, |c| listener.calendar_read(c));
    errors.announce_new(listener);

    let version = format.application_version;
    project.tasks = task::read_tasks(source, table, &props, &ctx, version, &mut errors)?;
    let sub_projects = subproject::read_sub_projects(&props, format.generation, &mut errors);
    sub_projects.apply(&mut project.tasks);
    project.sub_projects = sub_projects.projects;
    project.resource_sub_project = sub_projects.resource_pool;
    announce(&project.tasks, |t| listener.task_read(t));
    errors.announce_new(listener);

    project.resources = resource::read_resources(
        source,
        table,
        &props,
        &ctx,
        version,
        &calendars.resource_calendars,
        &mut errors,
    )?;
    announce(&project.resources, |r| listener.resource_read(r));
    errors.announce_new(listener);

    project.assignments = assignment::read_assignments(source, table, &props, &ctx, options, &project, &mut errors)?;
    timephased::apply_splits(&mut project.tasks, &project.assignments);
    announce(&project.assignments, |a| listener.assignment_read(a));
    errors.announce_new(listener);

    project.relations = relation::read_relations(source, table, &ctx, &project.tasks)?;
    announce(&project.relations, |r| listener.relation_read(r));
    errors.announce_new(listener);

    project.ignored_errors = errors.into_vec();
    Ok(project)
}

fn read_calendar_storage(
    source: &mut dyn StreamSource,
    table: &GenerationTable,
    props: &Props,
    errors: &mut IgnoredErrors,
) -> Result<CalendarSet, ReadError> {
    if !source.storage_exists(&table.storage_path(&table.calendar)) {
        return Ok(CalendarSet::default());
    }
    let streams = EntityStreams::load(source, table, &table.calendar, [0, 0], errors)?;
    Ok(read_calendars(&streams, &table.calendar_layout, props, errors))
}

fn announce<T>(items: &[T], read: impl FnMut(&T)) {
    items.iter().for_each(read);
}
