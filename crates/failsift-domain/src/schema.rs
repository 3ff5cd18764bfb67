//! Triage domain schema definitions
//!
//! Lines are loaded once per job, read-only during ranking, and replaced
//! wholesale when a save round-trips through the data provider.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{Result, TriageError};

// ============================================================================
// 1. IDENTIFIERS
// ============================================================================

/// Identifier of a failure line within a job
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LineId(pub u64);

impl std::fmt::Display for LineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a classified failure
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClassifiedFailureId(pub u64);

impl std::fmt::Display for ClassifiedFailureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a matcher (the detector that produced a match record)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MatcherId(pub u64);

impl std::fmt::Display for MatcherId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an unstructured bug suggestion
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SuggestionId(pub u64);

impl std::fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a classification option, unique within a line's option set.
///
/// The inner string is private so an id can only be produced by one of the
/// four constructors, which guarantees uniqueness by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionId(String);

impl OptionId {
    /// Option backed by a classified failure: `"<line>-<cf>"`
    pub fn classified(line: LineId, cf: ClassifiedFailureId) -> Self {
        OptionId(format!("{}-{}", line, cf))
    }

    /// Option backed by an unstructured suggestion: `"<line>-ub-<suggestion>"`
    pub fn suggestion(line: LineId, suggestion: SuggestionId) -> Self {
        OptionId(format!("{}-ub-{}", line, suggestion))
    }

    /// The fixed manual free-entry option: `"<line>-manual"`
    pub fn manual(line: LineId) -> Self {
        OptionId(format!("{}-manual", line))
    }

    /// The fixed ignore option: `"<line>-ignore"`
    pub fn ignore(line: LineId) -> Self {
        OptionId(format!("{}-ignore", line))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// 2. LINE DATA - what the provider delivers
// ============================================================================

/// A bug linked to a classified failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bug {
    /// Bug summary text, matched against the line's log excerpt
    pub summary: String,

    /// Resolution status; `None` or empty means the bug is still open
    pub resolution: Option<String>,
}

impl Bug {
    /// Whether the bug has been resolved (non-empty resolution)
    pub fn is_resolved(&self) -> bool {
        self.resolution.as_deref().is_some_and(|r| !r.is_empty())
    }
}

/// Evidence tying a failure line to a classified failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// The matcher that produced this record
    pub matcher: MatcherId,

    /// The classified failure this record supports
    pub classified_failure: ClassifiedFailureId,

    /// Match score in [0, 1]
    pub score: f64,
}

/// A matcher definition (id + display name)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matcher {
    pub id: MatcherId,
    pub name: String,
}

/// Lookup table of matchers by id, supplied alongside error lines
#[derive(Debug, Clone, Default)]
pub struct MatcherRegistry {
    by_id: HashMap<MatcherId, Matcher>,
}

impl MatcherRegistry {
    pub fn new(matchers: Vec<Matcher>) -> Self {
        MatcherRegistry {
            by_id: matchers.into_iter().map(|m| (m.id, m)).collect(),
        }
    }

    /// Display name for a matcher, if known
    pub fn name(&self, id: MatcherId) -> Option<&str> {
        self.by_id.get(&id).map(|m| m.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// A system-detected candidate explaining a test failure.
///
/// Bug number semantics: `Some(0)` is the ignore sentinel ("intentionally
/// not classified to any bug"), `None` means unclassified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedFailure {
    pub id: ClassifiedFailureId,

    pub bug_number: Option<u64>,

    /// Linked bug, when the bug number resolves to a known bug
    pub bug: Option<Bug>,
}

impl ClassifiedFailure {
    /// Whether this candidate is the ignore sentinel (bug number 0)
    pub fn is_ignore(&self) -> bool {
        self.bug_number == Some(0)
    }

    /// Whether this candidate can appear in the scored pool: it must carry
    /// a real bug number, and the ignore sentinel never does.
    pub fn is_candidate(&self) -> bool {
        matches!(self.bug_number, Some(n) if n != 0)
    }
}

/// A candidate bug found via unstructured text search, not backed by a
/// structured match record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugSuggestion {
    pub id: SuggestionId,

    pub bug_number: u64,

    pub summary: String,

    /// Resolution status; `None` or empty means open
    pub resolution: Option<String>,
}

impl BugSuggestion {
    pub fn is_resolved(&self) -> bool {
        self.resolution.as_deref().is_some_and(|r| !r.is_empty())
    }
}

/// Unstructured search results for a line: the log excerpt used as the
/// search text plus suggestion buckets. Candidate construction concatenates
/// `open_recent` before `all_others`, so ties favor recent open bugs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BugSuggestions {
    /// The log excerpt this line was searched with
    pub search: String,

    pub open_recent: Vec<BugSuggestion>,

    pub all_others: Vec<BugSuggestion>,
}

impl BugSuggestions {
    /// All suggestions in ranking order (open_recent first)
    pub fn iter(&self) -> impl Iterator<Item = &BugSuggestion> {
        self.open_recent.iter().chain(self.all_others.iter())
    }
}

/// One detected failure line with everything ranking needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureLine {
    pub id: LineId,

    pub bug_suggestions: BugSuggestions,

    pub classified_failures: Vec<ClassifiedFailure>,

    /// Match records for all classified failures of this line
    pub matches: Vec<MatchRecord>,

    /// The currently preferred classification, system-chosen or
    /// user-confirmed
    pub best_classification: Option<ClassifiedFailureId>,

    /// Whether a human has verified the best classification
    pub best_is_verified: bool,
}

impl FailureLine {
    /// The log excerpt used for similarity scoring
    pub fn search_text(&self) -> &str {
        &self.bug_suggestions.search
    }

    /// Resolve the recorded best classification to its classified failure.
    ///
    /// Returns `Ok(None)` when no best is recorded and
    /// `UnknownBestClassification` when the recorded id does not exist on
    /// this line.
    pub fn best_classified_failure(&self) -> Result<Option<&ClassifiedFailure>> {
        match self.best_classification {
            None => Ok(None),
            Some(best) => self
                .classified_failures
                .iter()
                .find(|cf| cf.id == best)
                .map(Some)
                .ok_or(TriageError::UnknownBestClassification { line: self.id, best }),
        }
    }

    /// Whether the recorded best classification is the ignore sentinel
    pub fn best_is_ignore(&self) -> Result<bool> {
        Ok(self
            .best_classified_failure()?
            .is_some_and(ClassifiedFailure::is_ignore))
    }

    /// Match records grouped by classified-failure id
    pub fn matches_by_classified_failure(
        &self,
    ) -> HashMap<ClassifiedFailureId, Vec<&MatchRecord>> {
        let mut grouped: HashMap<ClassifiedFailureId, Vec<&MatchRecord>> = HashMap::new();
        for record in &self.matches {
            grouped.entry(record.classified_failure).or_default().push(record);
        }
        grouped
    }

    /// Shape validation, run before ranking. Duplicate ids and non-finite
    /// match scores are `InvalidInput`.
    pub fn validate(&self) -> Result<()> {
        let mut cf_ids = HashSet::new();
        for cf in &self.classified_failures {
            if !cf_ids.insert(cf.id) {
                return Err(TriageError::InvalidInput {
                    line: self.id,
                    reason: format!("duplicate classified failure id {}", cf.id),
                });
            }
        }

        let mut suggestion_ids = HashSet::new();
        for suggestion in self.bug_suggestions.iter() {
            if !suggestion_ids.insert(suggestion.id) {
                return Err(TriageError::InvalidInput {
                    line: self.id,
                    reason: format!("duplicate bug suggestion id {}", suggestion.id),
                });
            }
        }

        for record in &self.matches {
            if !record.score.is_finite() {
                return Err(TriageError::InvalidInput {
                    line: self.id,
                    reason: format!(
                        "non-finite match score for classified failure {}",
                        record.classified_failure
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Everything a provider delivers for one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    pub matchers: Vec<Matcher>,
    pub error_lines: Vec<FailureLine>,
}

// ============================================================================
// 3. CLASSIFICATION OPTIONS - the ranked-list elements
// ============================================================================

/// Match evidence attached to a classified-failure option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvidence {
    pub matcher: MatcherId,
    pub score: f64,
}

/// The four option kinds, each carrying only its relevant fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptionKind {
    /// A structured autoclassification candidate
    ClassifiedFailure {
        classified_failure_id: ClassifiedFailureId,
        bug_number: Option<u64>,
        bug_summary: Option<String>,
        bug_resolution: Option<String>,
        matches: Vec<MatchEvidence>,
    },

    /// A candidate from unstructured full-text search
    UnstructuredBug {
        bug_number: u64,
        bug_summary: String,
        bug_resolution: Option<String>,
    },

    /// Free-entry of a bug number by the user
    Manual,

    /// Intentionally not classified to any bug (bug number fixed at 0)
    Ignore,
}

impl OptionKind {
    /// Stable kind name for logs and save payloads
    pub fn name(&self) -> &'static str {
        match self {
            OptionKind::ClassifiedFailure { .. } => "classified_failure",
            OptionKind::UnstructuredBug { .. } => "unstructured_bug",
            OptionKind::Manual => "manual",
            OptionKind::Ignore => "ignore",
        }
    }
}

/// One element of a line's ranked option list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationOption {
    pub id: OptionId,

    #[serde(flatten)]
    pub kind: OptionKind,

    /// Exactly one option per line may be the best at a time
    pub is_best: bool,

    /// Hidden by the visibility cutoff policy, shown only on expand
    pub hidden: bool,

    pub score: f64,
}

impl ClassificationOption {
    /// Build an option for a classified-failure candidate with its evidence
    pub fn classified_failure(
        line: LineId,
        cf: &ClassifiedFailure,
        matches: Vec<MatchEvidence>,
    ) -> Self {
        ClassificationOption {
            id: OptionId::classified(line, cf.id),
            kind: OptionKind::ClassifiedFailure {
                classified_failure_id: cf.id,
                bug_number: cf.bug_number,
                bug_summary: cf.bug.as_ref().map(|b| b.summary.clone()),
                bug_resolution: cf.bug.as_ref().and_then(|b| b.resolution.clone()),
                matches,
            },
            is_best: false,
            hidden: false,
            score: 0.0,
        }
    }

    /// Build an option for an unstructured bug suggestion
    pub fn unstructured(line: LineId, suggestion: &BugSuggestion) -> Self {
        ClassificationOption {
            id: OptionId::suggestion(line, suggestion.id),
            kind: OptionKind::UnstructuredBug {
                bug_number: suggestion.bug_number,
                bug_summary: suggestion.summary.clone(),
                bug_resolution: suggestion.resolution.clone(),
            },
            is_best: false,
            hidden: false,
            score: 0.0,
        }
    }

    /// The fixed manual free-entry option
    pub fn manual(line: LineId) -> Self {
        ClassificationOption {
            id: OptionId::manual(line),
            kind: OptionKind::Manual,
            is_best: false,
            hidden: false,
            score: 0.0,
        }
    }

    /// The fixed ignore option
    pub fn ignore(line: LineId) -> Self {
        ClassificationOption {
            id: OptionId::ignore(line),
            kind: OptionKind::Ignore,
            is_best: false,
            hidden: false,
            score: 0.0,
        }
    }

    /// Bug number this option would classify to. Ignore is the 0 sentinel;
    /// manual has none until the user types one.
    pub fn bug_number(&self) -> Option<u64> {
        match &self.kind {
            OptionKind::ClassifiedFailure { bug_number, .. } => *bug_number,
            OptionKind::UnstructuredBug { bug_number, .. } => Some(*bug_number),
            OptionKind::Manual => None,
            OptionKind::Ignore => Some(0),
        }
    }

    pub fn classified_failure_id(&self) -> Option<ClassifiedFailureId> {
        match &self.kind {
            OptionKind::ClassifiedFailure {
                classified_failure_id,
                ..
            } => Some(*classified_failure_id),
            _ => None,
        }
    }

    pub fn bug_summary(&self) -> Option<&str> {
        match &self.kind {
            OptionKind::ClassifiedFailure { bug_summary, .. } => bug_summary.as_deref(),
            OptionKind::UnstructuredBug { bug_summary, .. } => Some(bug_summary.as_str()),
            _ => None,
        }
    }

    /// Whether the linked bug is resolved (drives the score penalty)
    pub fn is_resolved(&self) -> bool {
        let resolution = match &self.kind {
            OptionKind::ClassifiedFailure { bug_resolution, .. } => bug_resolution.as_deref(),
            OptionKind::UnstructuredBug { bug_resolution, .. } => bug_resolution.as_deref(),
            _ => None,
        };
        resolution.is_some_and(|r| !r.is_empty())
    }

    /// Match evidence, present only on classified-failure options
    pub fn matches(&self) -> Option<&[MatchEvidence]> {
        match &self.kind {
            OptionKind::ClassifiedFailure { matches, .. } => Some(matches.as_slice()),
            _ => None,
        }
    }
}

// ============================================================================
// 4. SAVE CONTRACT
// ============================================================================

/// The record persisted for one line when the user's choice is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineVerification {
    pub line_id: LineId,

    /// Chosen classified failure, when the choice was a structured candidate
    pub best_classification: Option<ClassifiedFailureId>,

    /// Chosen bug number (manual entry, suggestion, or the ignore 0)
    pub bug_number: Option<u64>,
}
