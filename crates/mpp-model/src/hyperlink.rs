use serde::{Deserialize, Serialize};

/// A hyperlink attached to a task, resource or assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperlink {
    /// Display text.
    pub text: String,
    pub address: String,
    /// Location within the target document.
    pub sub_address: String,
    pub screen_tip: Option<String>,
}
