use thiserror::Error;

/// A stored code that does not correspond to any variant of the target enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} code {code}")]
pub struct InvalidCode {
    pub kind: &'static str,
    pub code: i32,
}

impl InvalidCode {
    pub fn new(kind: &'static str, code: i32) -> Self {
        Self { kind, code }
    }
}
