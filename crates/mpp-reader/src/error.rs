use thiserror::Error;

/// Fatal errors that abort reading a whole document.
///
/// Recoverable problems never surface here; they are collected as
/// [`mpp_model::IgnoredError`] values on the decoded project instead.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read `.mpp` file: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a compound file: {0}")]
    Container(String),
    #[error("unsupported file format: {0}")]
    UnsupportedGeneration(String),
    #[error("required stream `{0}` is missing")]
    MissingStream(String),
    #[error("required storage `{0}` is missing")]
    MissingStorage(String),
    #[error("file is password protected")]
    PasswordProtected,
    #[error("unable to fix task order (task unique id {unique_id})")]
    TaskOrder { unique_id: i32 },
}

/// Collects recoverable decode problems. Each one is logged as it is recorded.
#[derive(Debug, Default)]
pub(crate) struct IgnoredErrors {
    errors: Vec<mpp_model::IgnoredError>,
    /// Errors already passed to a listener.
    announced: usize,
}

impl IgnoredErrors {
    pub fn record(&mut self, message: impl Into<String>) {
        let error = mpp_model::IgnoredError::new(message);
        log::warn!("{error}");
        self.errors.push(error);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Passes the errors recorded since the previous call to `listener`.
    pub fn announce_new(&mut self, listener: &mut dyn mpp_model::ProjectListener) {
        for error in &self.errors[self.announced..] {
            listener.error_ignored(error);
        }
        self.announced = self.errors.len();
    }

    pub fn into_vec(self) -> Vec<mpp_model::IgnoredError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use mpp_model::{IgnoredError, ProjectListener};

    use super::*;

    #[derive(Default)]
    struct Heard(Vec<String>);

    impl ProjectListener for Heard {
        fn error_ignored(&mut self, error: &IgnoredError) {
            self.0.push(error.to_string());
        }
    }

    #[test]
    fn each_error_is_announced_once() {
        let mut errors = IgnoredErrors::default();
        let mut heard = Heard::default();
        errors.record("first");
        errors.announce_new(&mut heard);
        errors.announce_new(&mut heard);
        errors.record("second");
        errors.announce_new(&mut heard);
        assert_eq!(heard.0.len(), 2);
        assert!(heard.0[1].contains("second"));
        assert_eq!(errors.into_vec().len(), 2);
    }
}
