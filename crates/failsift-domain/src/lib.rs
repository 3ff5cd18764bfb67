//! Failsift Triage Domain Model
//!
//! Defines the data that flows through failure triage:
//! - FailureLine: one detected failure line with its log excerpt and candidates
//! - ClassifiedFailure: a structured candidate, optionally linked to a bug
//! - BugSuggestion: a candidate found via unstructured full-text search
//! - MatchRecord: evidence (matcher + score) tying a line to a candidate
//! - ClassificationOption: a ranked-list element with a tagged kind
//! - LineVerification: the save-contract record for a user's choice
//!
//! All objects are serializable. Option identifiers are derived from the
//! owning line id plus a sub-id and are unique within a line's option set.

pub mod error;
pub mod schema;

pub use error::{Result, TriageError};
pub use schema::{
    Bug, BugSuggestion, BugSuggestions, ClassificationOption, ClassifiedFailure,
    ClassifiedFailureId, ErrorData, FailureLine, LineId, LineVerification, MatchEvidence,
    MatchRecord, Matcher, MatcherId, MatcherRegistry, OptionId, OptionKind, SuggestionId,
};

/// Failsift domain version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
