//! Failsift Classification Ranking Core
//!
//! Pure, deterministic computation over already-fetched line data:
//! - `similarity`: token-overlap similarity between two free-text strings
//! - `rank`: build the ranked, deduplicated, visibility-annotated option
//!   list for one failure line
//!
//! No I/O, no blocking, no shared mutable state. Errors surface as typed
//! [`TriageError`] values and are never folded into a zero score.

pub mod rank;
pub mod similarity;

pub use rank::{rank, RankedOptions, BEST_RATIO, LOWER_CUTOFF, MAX_OPTIONS, MIN_OPTIONS};
pub use similarity::similarity;

pub use failsift_domain::{Result, TriageError};
