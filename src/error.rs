use std::path::PathBuf;

use thiserror::Error;

/// Failure taxonomy for every engine operation. Handlers attach operation
/// context with `anyhow`; nothing below is retried automatically.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input for {operation}: {reason}")]
    InvalidInput {
        operation: &'static str,
        reason: String,
    },
    #[error("columns {columns} not found in dataset")]
    MissingColumns { columns: String },
    #[error("unsupported {operation} method '{method}'")]
    UnsupportedMethod {
        operation: &'static str,
        method: String,
    },
    #[error("degree must coerce to a non-negative integer, got {0}")]
    InvalidDegree(f64),
    #[error("{operation} requires all y values to be positive")]
    NonPositiveY { operation: &'static str },
    #[error("curve fitting failed: {0}")]
    CurveFitFailed(String),
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("unsupported file type '{0}' (expected .csv or .xlsx)")]
    UnsupportedFileType(String),
    #[error("snapshot {0} not found")]
    SnapshotNotFound(String),
    #[error("audit entry {0} not found")]
    EntryNotFound(u64),
    #[error("lineage conflict: {0}")]
    LineageConflict(String),
    #[error("workspace has no dataset; run `ingest` first")]
    EmptyWorkspace,
}

impl EngineError {
    pub fn invalid_input(operation: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            operation,
            reason: reason.into(),
        }
    }

    /// Error for one or more named columns being absent.
    pub fn missing_columns(missing: &[&str]) -> Self {
        let columns = missing
            .iter()
            .map(|name| format!("'{name}'"))
            .collect::<Vec<_>>()
            .join(" and ");
        EngineError::MissingColumns { columns }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_joins_names() {
        let err = EngineError::missing_columns(&["a", "b"]);
        assert_eq!(err.to_string(), "columns 'a' and 'b' not found in dataset");
    }

    #[test]
    fn messages_name_the_failing_operation() {
        let err = EngineError::invalid_input("interpolation", "no usable rows");
        assert!(err.to_string().contains("interpolation"));
        let err = EngineError::UnsupportedMethod {
            operation: "oversampling",
            method: "bootstrap".to_string(),
        };
        assert!(err.to_string().contains("bootstrap"));
    }
}
