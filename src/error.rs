//! Error types for the gene-fields application layer.

use std::path::PathBuf;

use sphere_test::SphereTestError;
use thiserror::Error;

/// Errors from reading inputs, running a test and writing reports.
#[derive(Debug, Error)]
pub enum FieldsError {
    #[error(transparent)]
    SphereTest(#[from] SphereTestError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A malformed row in a tab-separated input.
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A test name the application does not know.
    #[error("unknown test '{0}'")]
    UnknownTest(String),
}

impl FieldsError {
    pub(crate) fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

pub type Result<T, E = FieldsError> = std::result::Result<T, E>;
