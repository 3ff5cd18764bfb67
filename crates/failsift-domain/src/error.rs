//! Error types for triage domain operations

use thiserror::Error;

use crate::schema::{ClassifiedFailureId, LineId};

#[derive(Error, Debug)]
pub enum TriageError {
    /// The failure line itself is malformed; the caller must supply
    /// well-formed data before ranking.
    #[error("Invalid failure line {line}: {reason}")]
    InvalidInput { line: LineId, reason: String },

    /// A classified-failure candidate carries a bug number but the line has
    /// no match records for it. Upstream data is referentially inconsistent.
    #[error("No match records for classified failure {classified_failure} on line {line}")]
    MissingMatchGroup {
        line: LineId,
        classified_failure: ClassifiedFailureId,
    },

    /// The recorded best classification does not exist among the line's
    /// classified failures.
    #[error("Best classification {best} on line {line} not found among its classified failures")]
    UnknownBestClassification { line: LineId, best: ClassifiedFailureId },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TriageError {
    /// Whether this error is a referential inconsistency in upstream data,
    /// as opposed to a shape error in the input itself.
    pub fn is_lookup_inconsistency(&self) -> bool {
        matches!(
            self,
            TriageError::MissingMatchGroup { .. } | TriageError::UnknownBestClassification { .. }
        )
    }
}

/// Result type for triage domain operations
pub type Result<T> = std::result::Result<T, TriageError>;
