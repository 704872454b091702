//! Inserted projects and the shared resource pool, from the sub-project table held in the
//! project `Props` stream.
//!
//! The table starts with a list of entry pointers. Each entry points at a 20 byte header
//! whose type byte decides which slot words follow: offsets of the task unique ids, the
//! file path and the file name. All offsets are relative to the start of the table.

use std::collections::{HashMap, HashSet};

use mpp_model::{FileGeneration, SubProject, Task};

use crate::blocks::bytes::{ansi_string_at, i32_at, u16_at, u8_at, unicode_string_at, unicode_string_of_len};
use crate::blocks::Props;
use crate::error::IgnoredErrors;

pub(crate) const SUBPROJECT_DATA: i32 = 37748898;

const TABLE_END_OFFSET: usize = 8;
const FIRST_ENTRY_OFFSET: usize = 12;
const SLOT_MASK: i32 = 0x1FFFF;
const TYPE_BYTE: usize = 16;
const ENTRY_TYPE_ID_AT_HEADER: u8 = 0xC0;

/// Bytes before the DOS path of a file reference, and between the DOS path and the size
/// of the long path block.
const FILE_REFERENCE_HEADER: usize = 22;
const DOS_PATH_TRAILER: usize = 24;
const LONG_PATH_PREFIX: usize = 2;

const FIRST_UNIQUE_ID_OFFSET: i32 = 0x0080_0000;
const UNIQUE_ID_OFFSET_STRIDE: i32 = 0x0040_0000;

/// Id type words marking an inserted task; anything else marks an external task.
const TASK_ID_TYPES: &[i32] = &[
    0x0000_0000,
    0x0B34_0000,
    0x0ABB_0000,
    0x05A1_0000,
    0x0BD5_0000,
    0x03D6_0000,
    0x0701_0000,
    0x067F_0000,
    0x067D_0000,
    0x0054_0000,
];
const TASK_ID_TYPES_9: &[i32] = &[0x0000_0000, 0x0B34_0000, 0x0ABB_0000, 0x05A1_0000, 0x02F7_0000, 0x0701_0000];
/// Id type word of entries whose path slot holds a plain UTF-16 path.
const DIRECT_PATH_TYPE: i32 = 0x0BD5_0000;
const DIRECT_PATH_TYPE_9: i32 = 0x02F7_0000;

#[derive(Debug, Clone, Copy)]
enum Slot {
    Id,
    Path,
    Name,
    Skip,
    /// 16-bit offsets followed by the given number of bytes in total.
    ShortId(usize),
    ShortPath(usize),
    ShortName(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    /// A project no longer inserted; only keeps the numbering of the ones after it.
    Placeholder,
    /// One sub-project per id slot between the first id and the path.
    Tasks,
    ResourcePool,
}

fn layout(entry_type: u8) -> (EntryKind, &'static [Slot]) {
    use Slot::*;
    match entry_type {
        0x0B | 0x99 | 0x09 | 0x0D => (EntryKind::Tasks, &[Id, Skip, Path, Name]),
        0x03 | 0x11 | 0x91 => (EntryKind::Tasks, &[Id, Path, Name, Skip]),
        0x81 | 0x83 | 0x41 => (EntryKind::Tasks, &[Id, Path, Skip, Name]),
        0x01 | 0x08 => (EntryKind::Tasks, &[Id, Path, Name]),
        ENTRY_TYPE_ID_AT_HEADER => (EntryKind::Tasks, &[Path, Name, Skip]),
        0x89 | 0x8D => (EntryKind::Tasks, &[ShortId(8), ShortPath(8), ShortName(4)]),
        0x0A => (EntryKind::Tasks, &[ShortId(4), ShortPath(4), ShortName(4)]),
        0x05 => (EntryKind::ResourcePool, &[Id, Path, Name]),
        0x45 => (EntryKind::ResourcePool, &[Id, Path, Name, Skip]),
        0x04 => (EntryKind::ResourcePool, &[Path, Name]),
        0x44 => (EntryKind::ResourcePool, &[Path, Skip, Name]),
        0x00 | 0x10 | 0x02 => (EntryKind::Placeholder, &[Skip, Skip]),
        _ => (EntryKind::Placeholder, &[Skip, Skip, Skip]),
    }
}

/// Slot offsets of one table entry.
#[derive(Debug, Clone, Copy)]
struct Entry {
    kind: EntryKind,
    unique_id: Option<usize>,
    path: Option<usize>,
    name: Option<usize>,
}

struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl Cursor<'_> {
    fn slot(&mut self) -> Option<usize> {
        let value = i32_at(self.data, self.offset)? & SLOT_MASK;
        self.offset += 4;
        usize::try_from(value).ok()
    }

    fn short_slot(&mut self, width: usize) -> Option<usize> {
        let value = u16_at(self.data, self.offset)?;
        self.offset += width;
        Some(usize::from(value))
    }

    fn entry(&mut self) -> Option<Entry> {
        let header = self.slot()?;
        let entry_type = u8_at(self.data, header.checked_add(TYPE_BYTE)?)?;
        let (kind, slots) = layout(entry_type);
        let mut entry = Entry {
            kind,
            unique_id: (entry_type == ENTRY_TYPE_ID_AT_HEADER).then_some(header),
            path: None,
            name: None,
        };
        for slot in slots {
            match *slot {
                Slot::Id => entry.unique_id = Some(self.slot()?),
                Slot::Path => entry.path = Some(self.slot()?),
                Slot::Name => entry.name = Some(self.slot()?),
                Slot::Skip => self.offset += 4,
                Slot::ShortId(width) => entry.unique_id = Some(self.short_slot(width)?),
                Slot::ShortPath(width) => entry.path = Some(self.short_slot(width)?),
                Slot::ShortName(width) => entry.name = Some(self.short_slot(width)?),
            }
        }
        Some(entry)
    }
}

/// Id type words of one file generation.
#[derive(Debug, Clone, Copy)]
struct IdTypes {
    tasks: &'static [i32],
    direct_path: i32,
}

impl IdTypes {
    fn for_generation(generation: FileGeneration) -> Self {
        match generation {
            FileGeneration::Mpp9 => Self {
                tasks: TASK_ID_TYPES_9,
                direct_path: DIRECT_PATH_TYPE_9,
            },
            _ => Self {
                tasks: TASK_ID_TYPES,
                direct_path: DIRECT_PATH_TYPE,
            },
        }
    }
}

/// Sub-projects of one document.
#[derive(Debug, Default)]
pub(crate) struct SubProjects {
    pub projects: Vec<SubProject>,
    pub resource_pool: Option<SubProject>,
}

impl SubProjects {
    /// Points tasks at the file they were inserted from, and marks the external ones.
    pub fn apply(&self, tasks: &mut [Task]) {
        let mut files: HashMap<i32, &str> = HashMap::new();
        let mut external = HashSet::new();
        for project in self.projects.iter().chain(self.resource_pool.iter()) {
            let Some(path) = project.path() else {
                continue;
            };
            if let Some(unique_id) = project.task_unique_id {
                files.insert(unique_id, path);
            }
            for unique_id in &project.external_task_unique_ids {
                files.insert(*unique_id, path);
                external.insert(*unique_id);
            }
        }
        for task in tasks {
            if let Some(path) = files.get(&task.unique_id) {
                task.subproject_file = Some((*path).to_string());
            }
            task.external_task = external.contains(&task.unique_id);
        }
    }
}

/// Reads the sub-project table. Entries that cannot be read are skipped and recorded.
pub(crate) fn read_sub_projects(props: &Props, generation: FileGeneration, errors: &mut IgnoredErrors) -> SubProjects {
    let mut found = SubProjects::default();
    let Some(data) = props.bytes(SUBPROJECT_DATA) else {
        return found;
    };
    let Some(table_end) = i32_at(data, TABLE_END_OFFSET) else {
        errors.record("sub-project table is truncated");
        return found;
    };
    let table_end = usize::try_from(table_end).unwrap_or(0);
    let types = IdTypes::for_generation(generation);

    let mut cursor = Cursor {
        data,
        offset: FIRST_ENTRY_OFFSET,
    };
    let mut index = 0;
    while cursor.offset < table_end {
        index += 1;
        let Some(entry) = cursor.entry() else {
            errors.record(format!("sub-project entry {index} is truncated"));
            break;
        };
        let (Some(path), Some(name)) = (entry.path, entry.name) else {
            continue;
        };
        match entry.kind {
            EntryKind::Placeholder => {}
            EntryKind::Tasks => {
                let Some(mut unique_id) = entry.unique_id else {
                    continue;
                };
                let mut position = index;
                while unique_id < path {
                    let Some(project) = read_sub_project(data, Some(unique_id), path, name, position, types) else {
                        errors.record(format!("sub-project {position} could not be read"));
                        break;
                    };
                    found.projects.push(project);
                    unique_id += 4;
                    position += 1;
                }
            }
            EntryKind::ResourcePool => match read_sub_project(data, entry.unique_id, path, name, index, types) {
                Some(project) => found.resource_pool = Some(project),
                None => errors.record(format!("resource pool entry {index} could not be read")),
            },
        }
    }
    log::debug!(
        "read {} sub-projects{}",
        found.projects.len(),
        if found.resource_pool.is_some() { " and a resource pool" } else { "" }
    );
    found
}

fn read_sub_project(
    data: &[u8],
    unique_id: Option<usize>,
    path: usize,
    name: usize,
    index: usize,
    types: IdTypes,
) -> Option<SubProject> {
    let id_type = match unique_id {
        Some(offset) => i32_at(data, offset.checked_add(4)?)?,
        None => 0,
    };
    let mut project = SubProject {
        unique_id_offset: i32::try_from(index - 1)
            .ok()
            .and_then(|slot| slot.checked_mul(UNIQUE_ID_OFFSET_STRIDE))
            .and_then(|offset| offset.checked_add(FIRST_UNIQUE_ID_OFFSET)),
        ..SubProject::default()
    };

    if unique_id.is_some() && id_type == types.direct_path {
        project.full_path = Some(unicode_string_at(data, path)?);
    } else {
        let (dos, full) = file_reference(data, path)?;
        project.dos_full_path = Some(dos);
        project.full_path = full;
        if let Some((dos, full)) = file_reference(data, name) {
            project.dos_file_name = Some(dos);
            project.file_name = full;
        }
    }

    if let Some(offset) = unique_id {
        let value = i32_at(data, offset)?;
        if value > 0 {
            if types.tasks.contains(&id_type) {
                project.task_unique_id = Some(value);
            } else {
                project.external_task_unique_ids.push(value);
            }
        }
    }
    Some(project)
}

/// Reads a file reference: a DOS path, optionally followed by the long path.
fn file_reference(data: &[u8], offset: usize) -> Option<(String, Option<String>)> {
    let mut offset = offset.checked_add(FILE_REFERENCE_HEADER)?;
    let dos_len = data.get(offset..)?.iter().position(|b| *b == 0)?;
    let dos = ansi_string_at(data, offset)?;
    offset += dos_len + 1 + DOS_PATH_TRAILER;

    let block = i32_at(data, offset)?;
    offset += 4;
    if block == 0 {
        return Some((dos, None));
    }
    let len = usize::try_from(i32_at(data, offset)?).ok()?;
    offset += 4 + LONG_PATH_PREFIX;
    let full = unicode_string_of_len(data, offset, len)?;
    Some((dos, Some(full)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::blocks::props::build_props;

    enum At {
        Body(usize),
        Gap,
    }

    fn file_reference_bytes(dos: &str, full: Option<&str>) -> Vec<u8> {
        let mut out = vec![0u8; FILE_REFERENCE_HEADER];
        out.extend_from_slice(dos.as_bytes());
        out.push(0);
        out.extend_from_slice(&[0u8; DOS_PATH_TRAILER]);
        match full {
            Some(full) => {
                let text: Vec<u8> = full.encode_utf16().flat_map(u16::to_le_bytes).collect();
                out.extend_from_slice(&1i32.to_le_bytes());
                out.extend_from_slice(&(text.len() as i32).to_le_bytes());
                out.extend_from_slice(&[0u8; LONG_PATH_PREFIX]);
                out.extend(text);
            }
            None => out.extend_from_slice(&0i32.to_le_bytes()),
        }
        out
    }

    /// A table with one entry of `entry_type` whose slots point into `body`.
    fn table(entry_type: u8, slots: &[At], body: &[u8]) -> Vec<u8> {
        let table_end = FIRST_ENTRY_OFFSET + 4 * (1 + slots.len());
        let header = table_end;
        let body_start = header + 20;
        let mut out = vec![0u8; TABLE_END_OFFSET];
        out.extend_from_slice(&(table_end as i32).to_le_bytes());
        out.extend_from_slice(&(header as i32).to_le_bytes());
        for slot in slots {
            let word = match slot {
                At::Body(offset) => (body_start + offset) as i32,
                At::Gap => 0,
            };
            out.extend_from_slice(&word.to_le_bytes());
        }
        let mut header_bytes = [0u8; 20];
        header_bytes[TYPE_BYTE] = entry_type;
        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(body);
        out
    }

    fn read(data: Vec<u8>) -> (SubProjects, IgnoredErrors) {
        let props = Props::parse(&build_props(&[(SUBPROJECT_DATA, data)]));
        let mut errors = IgnoredErrors::default();
        let found = read_sub_projects(&props, FileGeneration::Mpp14, &mut errors);
        (found, errors)
    }

    fn task(unique_id: i32) -> Task {
        Task::new(unique_id)
    }

    #[test]
    fn inserted_project_is_linked_to_its_task() {
        let path = file_reference_bytes("C:\\PLANS\\SUB.MPP", Some("C:\\Plans\\Sub.mpp"));
        let name = file_reference_bytes("SUB.MPP", Some("Sub.mpp"));
        let mut body = 7i32.to_le_bytes().to_vec();
        body.extend_from_slice(&path);
        body.extend_from_slice(&name);
        let data = table(0x01, &[At::Body(0), At::Body(4), At::Body(4 + path.len())], &body);

        let (found, errors) = read(data);
        assert_eq!(errors.len(), 0);
        assert_eq!(
            found.projects,
            vec![SubProject {
                task_unique_id: Some(7),
                external_task_unique_ids: Vec::new(),
                unique_id_offset: Some(0x0080_0000),
                dos_full_path: Some("C:\\PLANS\\SUB.MPP".into()),
                full_path: Some("C:\\Plans\\Sub.mpp".into()),
                dos_file_name: Some("SUB.MPP".into()),
                file_name: Some("Sub.mpp".into()),
            }]
        );

        let mut tasks = vec![task(7), task(8)];
        found.apply(&mut tasks);
        assert_eq!(tasks[0].subproject_file.as_deref(), Some("C:\\Plans\\Sub.mpp"));
        assert!(!tasks[0].external_task);
        assert_eq!(tasks[1].subproject_file, None);
    }

    #[test]
    fn each_id_slot_is_its_own_sub_project() {
        let path = file_reference_bytes("LINKED.MPP", None);
        let name = file_reference_bytes("LINKED.MPP", None);
        let mut body = Vec::new();
        // The type word of the first id is the second id, which marks an external task.
        body.extend_from_slice(&7i32.to_le_bytes());
        body.extend_from_slice(&9i32.to_le_bytes());
        body.extend_from_slice(&path);
        body.extend_from_slice(&name);
        let data = table(0x03, &[At::Body(0), At::Body(8), At::Body(8 + path.len()), At::Gap], &body);

        let (found, errors) = read(data);
        assert_eq!(errors.len(), 0);
        let summary: Vec<_> = found
            .projects
            .iter()
            .map(|p| (p.task_unique_id, p.external_task_unique_ids.clone(), p.unique_id_offset))
            .collect();
        assert_eq!(
            summary,
            vec![(None, vec![7], Some(0x0080_0000)), (Some(9), vec![], Some(0x00C0_0000))]
        );
        assert_eq!(found.projects[0].path(), Some("LINKED.MPP"));

        let mut tasks = vec![task(7), task(9)];
        found.apply(&mut tasks);
        assert!(tasks[0].external_task);
        assert_eq!(tasks[0].subproject_file.as_deref(), Some("LINKED.MPP"));
        assert!(!tasks[1].external_task);
        assert_eq!(tasks[1].subproject_file.as_deref(), Some("LINKED.MPP"));
    }

    #[test]
    fn resource_pool_entries_carry_no_task() {
        let path = file_reference_bytes("POOL.MPP", Some("\\\\server\\pool.mpp"));
        let name = file_reference_bytes("POOL.MPP", None);
        let mut body = path.clone();
        body.extend_from_slice(&name);
        let data = table(0x04, &[At::Body(0), At::Body(path.len())], &body);

        let (found, errors) = read(data);
        assert_eq!(errors.len(), 0);
        assert!(found.projects.is_empty());
        let pool = found.resource_pool.unwrap();
        assert_eq!(pool.path(), Some("\\\\server\\pool.mpp"));
        assert_eq!(pool.task_unique_id, None);
        assert_eq!(pool.file_name, None);
    }

    #[test]
    fn truncated_entries_are_skipped_and_recorded() {
        let body = 7i32.to_le_bytes().to_vec();
        let data = table(0x01, &[At::Body(0), At::Body(400), At::Body(400)], &body);
        let (found, errors) = read(data);
        assert!(found.projects.is_empty());
        assert_eq!(errors.len(), 1);

        let mut short = vec![0u8; TABLE_END_OFFSET];
        short.extend_from_slice(&1000i32.to_le_bytes());
        let (found, errors) = read(short);
        assert!(found.projects.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn placeholders_only_advance_the_numbering() {
        let (found, errors) = read(table(0x00, &[At::Gap, At::Gap], &[]));
        assert_eq!(errors.len(), 0);
        assert!(found.projects.is_empty());
        assert!(found.resource_pool.is_none());
    }
}
