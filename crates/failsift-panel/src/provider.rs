//! Provider traits and implementations for error-line data
//!
//! The REST layer of the real system sits behind [`ErrorLineProvider`];
//! in-memory and file-backed implementations are provided here. The fake
//! mirrors the backend's verify semantics closely enough for workflow
//! tests: manual bug numbers create a classified failure with a
//! manual-matcher record, and bug number 0 verifies a line as ignored.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use failsift_domain::{
    Bug, ClassifiedFailure, ClassifiedFailureId, ErrorData, FailureLine, LineVerification,
    MatchRecord, MatcherId,
};

use crate::error::ProviderError;

/// Result type for provider operations
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Data-fetch and save boundary of the triage panel.
///
/// Guarantees:
/// - `fetch` returns a complete, self-consistent snapshot for one job.
/// - `verify` persists user choices and returns the updated lines; the
///   caller re-ranks against exactly the returned records.
#[async_trait]
pub trait ErrorLineProvider: Send + Sync {
    /// Fetch matchers and error lines for a job.
    async fn fetch(&self, job_id: u64) -> ProviderResult<ErrorData>;

    /// Persist user choices; returns the updated failure lines.
    async fn verify(&self, verifications: Vec<LineVerification>)
        -> ProviderResult<Vec<FailureLine>>;
}

// ---------------------------------------------------------------------------
// MemoryProvider
// ---------------------------------------------------------------------------

/// The matcher id the fake assigns to manually-entered classifications
pub const MANUAL_MATCHER: MatcherId = MatcherId(0);

/// In-memory provider backed by a `HashMap<job_id, ErrorData>`.
#[derive(Debug)]
pub struct MemoryProvider {
    jobs: Mutex<HashMap<u64, ErrorData>>,
    next_cf_id: Mutex<u64>,
    delay: Option<Duration>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    pub fn new() -> Self {
        MemoryProvider {
            jobs: Mutex::new(HashMap::new()),
            next_cf_id: Mutex::new(1_000_000),
            delay: None,
        }
    }

    /// Delay every fetch, for exercising abort behavior in tests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert_job(&self, job_id: u64, data: ErrorData) {
        self.jobs.lock().unwrap().insert(job_id, data);
    }

    fn allocate_cf_id(&self) -> ClassifiedFailureId {
        let mut next = self.next_cf_id.lock().unwrap();
        let id = ClassifiedFailureId(*next);
        *next += 1;
        id
    }

    /// Apply one verification to a stored line, mirroring the backend:
    /// a chosen classified failure becomes the verified best; a bare bug
    /// number creates a classified failure backed by the manual matcher;
    /// bug number 0 verifies the line as ignored.
    fn apply_verification(
        &self,
        line: &mut FailureLine,
        verification: &LineVerification,
    ) {
        match (verification.best_classification, verification.bug_number) {
            (Some(best), _) => {
                line.best_classification = Some(best);
            }
            (None, Some(0)) | (None, None) => {
                line.best_classification = None;
            }
            (None, Some(bug_number)) => {
                let cf_id = self.allocate_cf_id();
                line.classified_failures.push(ClassifiedFailure {
                    id: cf_id,
                    bug_number: Some(bug_number),
                    bug: Some(Bug {
                        summary: format!("Bug {bug_number}"),
                        resolution: None,
                    }),
                });
                line.matches.push(MatchRecord {
                    matcher: MANUAL_MATCHER,
                    classified_failure: cf_id,
                    score: 1.0,
                });
                line.best_classification = Some(cf_id);
            }
        }
        line.best_is_verified = true;
    }
}

#[async_trait]
impl ErrorLineProvider for MemoryProvider {
    async fn fetch(&self, job_id: u64) -> ProviderResult<ErrorData> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let jobs = self.jobs.lock().unwrap();
        jobs.get(&job_id)
            .cloned()
            .ok_or_else(|| ProviderError::Fetch(format!("unknown job {job_id}")))
    }

    async fn verify(
        &self,
        verifications: Vec<LineVerification>,
    ) -> ProviderResult<Vec<FailureLine>> {
        let mut updated = Vec::with_capacity(verifications.len());
        let mut jobs = self.jobs.lock().unwrap();

        for verification in &verifications {
            let line = jobs
                .values_mut()
                .flat_map(|data| data.error_lines.iter_mut())
                .find(|line| line.id == verification.line_id)
                .ok_or_else(|| {
                    ProviderError::Save(format!("unknown line {}", verification.line_id))
                })?;
            self.apply_verification(line, verification);
            updated.push(line.clone());
        }

        debug!(lines = updated.len(), "verified lines");
        Ok(updated)
    }
}

// ---------------------------------------------------------------------------
// JsonFileProvider
// ---------------------------------------------------------------------------

/// Read-only provider that loads one job's `ErrorData` from a JSON file.
/// Used by the CLI; `verify` is not supported.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileProvider { path: path.into() }
    }
}

#[async_trait]
impl ErrorLineProvider for JsonFileProvider {
    async fn fetch(&self, _job_id: u64) -> ProviderResult<ErrorData> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let data: ErrorData = serde_json::from_str(&raw)?;
        debug!(
            path = %self.path.display(),
            lines = data.error_lines.len(),
            "loaded error data"
        );
        Ok(data)
    }

    async fn verify(
        &self,
        _verifications: Vec<LineVerification>,
    ) -> ProviderResult<Vec<FailureLine>> {
        Err(ProviderError::Save(
            "file provider is read-only".to_string(),
        ))
    }
}
