//! Error types for the provider boundary
//!
//! Collaborator failures (fetch, save) are reported as a load/save status
//! and stay distinct from ranking errors; they never corrupt previously
//! ranked data.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Save failed: {0}")]
    Save(String),

    /// The fetch was superseded by a newer request for the same panel
    #[error("Fetch aborted by a newer request")]
    Aborted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
