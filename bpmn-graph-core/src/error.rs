use crate::diagnostics::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the schema validator itself (not of the validated document —
/// document defects are reported as [`Diagnostic`]s and, with `auto_fix`,
/// repaired in place).
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema descriptor is not valid JSON: {0}")]
    BadDescriptor(#[from] serde_json::Error),
}

/// Semantic validation failure in strict mode.
#[derive(Debug, Error)]
pub enum SemanticError {
    #[error("{count} BPMN semantic violations found")]
    Violations {
        count: usize,
        diagnostics: Vec<Diagnostic>,
    },
}

/// Failures of the graph transformation.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A transformer is single-use; build a new one per run.
    #[error("transformer has already produced its output")]
    AlreadyTransformed,

    #[error("pre-structured input did not match the normalized model: {0}")]
    BadPrestructured(#[from] serde_json::Error),

    #[error("failed to write statements to {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
