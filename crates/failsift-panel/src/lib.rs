//! Failsift Triage Panel
//!
//! Coordinates everything around the ranking core for one job's worth of
//! failure lines:
//! - load-status lifecycle (pending / loading / ready / no_logs / failed /
//!   error) with single-flight fetch
//! - a wholesale-rebuilt line index with per-line selection state
//! - a typed command/event channel replacing ambient UI broadcasts
//! - save snapshots over the provider boundary and re-ranking of returned
//!   data
//!
//! The ranking core itself stays pure; this crate owns all mutable state.

pub mod error;
pub mod events;
pub mod fetch;
pub mod panel;
pub mod provider;

pub use error::ProviderError;
pub use events::{
    ChoiceKind, Direction, EventId, LineChoice, OptionTarget, PanelCommand, PanelEvent,
    PanelEventRecord,
};
pub use fetch::SingleFlightFetcher;
pub use panel::{
    AutoclassifyPanel, AutoclassifyStatus, JobContext, LineEntry, LoadStatus, SelectionState,
};
pub use provider::{ErrorLineProvider, JsonFileProvider, MemoryProvider};

/// Failsift panel version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
