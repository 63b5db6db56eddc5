//! Error taxonomy for loading, copying and encoding

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which of the two input files an operation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileRole {
    Source,
    Target,
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRole::Source => write!(f, "source"),
            FileRole::Target => write!(f, "target"),
        }
    }
}

/// Errors surfaced to the user by a load or copy job
#[derive(Debug, Error)]
pub enum SheetCopyError {
    #[error("Failed to read {role} file: {message}")]
    Decode { role: FileRole, message: String },

    #[error("Column '{label}' not found in sheet '{sheet}', please select it again")]
    ColumnNotFound { sheet: String, label: String },

    #[error("Sheet '{sheet}' does not exist in the {role} workbook")]
    InvalidSheetSelection { role: FileRole, sheet: String },

    #[error("The {role} workbook contains no sheets")]
    EmptyWorkbook { role: FileRole },

    #[error("Failed to write the processed workbook: {message}")]
    Encode { message: String },

    #[error("Please select the {what} before processing")]
    MissingSelection { what: String },

    #[error("A copy job is already running")]
    JobInProgress,

    #[error("Background task failed: {0}")]
    Task(String),
}

impl SheetCopyError {
    pub(crate) fn decode(role: FileRole, err: anyhow::Error) -> Self {
        SheetCopyError::Decode {
            role,
            message: format!("{:#}", err),
        }
    }

    pub(crate) fn encode(err: anyhow::Error) -> Self {
        SheetCopyError::Encode {
            message: format!("{:#}", err),
        }
    }
}

pub type Result<T, E = SheetCopyError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_file_role() {
        let err = SheetCopyError::decode(FileRole::Target, anyhow::anyhow!("bad zip"));
        assert_eq!(err.to_string(), "Failed to read target file: bad zip");

        let err = SheetCopyError::EmptyWorkbook {
            role: FileRole::Source,
        };
        assert_eq!(err.to_string(), "The source workbook contains no sheets");
    }

    #[test]
    fn test_context_chain_is_flattened() {
        let err = anyhow::anyhow!("unexpected EOF").context("Failed to open zip archive");
        let err = SheetCopyError::encode(err);
        assert_eq!(
            err.to_string(),
            "Failed to write the processed workbook: Failed to open zip archive: unexpected EOF"
        );
    }
}
