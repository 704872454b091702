use serde::{Deserialize, Serialize};

/// A project inserted into this one, or the resource pool this project shares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProject {
    /// Unique id of the task the project is inserted at.
    pub task_unique_id: Option<i32>,
    /// Tasks of this project standing in for tasks of the inserted project.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_task_unique_ids: Vec<i32>,
    /// Added to the unique ids of the inserted project's tasks when shown here.
    pub unique_id_offset: Option<i32>,
    pub dos_full_path: Option<String>,
    pub full_path: Option<String>,
    pub dos_file_name: Option<String>,
    pub file_name: Option<String>,
}

impl SubProject {
    pub fn is_external_task(&self, unique_id: i32) -> bool {
        self.external_task_unique_ids.contains(&unique_id)
    }

    /// The most specific path recorded for the file.
    pub fn path(&self) -> Option<&str> {
        self.full_path.as_deref().or(self.dos_full_path.as_deref())
    }
}
