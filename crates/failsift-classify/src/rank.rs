//! Option ranking for a failure line.
//!
//! Builds the ranked, deduplicated option list a triager picks from:
//! candidate construction, best-option extraction, scoring, stable sorting,
//! the visibility cutoff policy, and the fixed extra options.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use failsift_domain::{
    ClassificationOption, FailureLine, MatchEvidence, OptionId, Result, TriageError,
};

use crate::similarity::similarity;

/// Options below this score are hidden outside the always-visible window.
pub const LOWER_CUTOFF: f64 = 0.1;

/// Options scoring less than this fraction of the best score are hidden.
pub const BEST_RATIO: f64 = 0.5;

/// Hard cap on the number of visible options.
pub const MAX_OPTIONS: usize = 10;

/// The first this-many options are always visible regardless of score.
pub const MIN_OPTIONS: usize = 3;

/// Score multiplier for candidates whose bug is already resolved.
const RESOLVED_PENALTY: f64 = 0.8;

/// The ranked option list for one line: the scored primary list plus the
/// fixed extra options (ignore, and manual unless suppressed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOptions {
    pub options: Vec<ClassificationOption>,
    pub extras: Vec<ClassificationOption>,
}

impl RankedOptions {
    /// Primary options followed by extras, in display order
    pub fn iter_all(&self) -> impl Iterator<Item = &ClassificationOption> {
        self.options.iter().chain(self.extras.iter())
    }

    /// Look up an option by id
    pub fn find(&self, id: &OptionId) -> Option<&ClassificationOption> {
        self.iter_all().find(|option| &option.id == id)
    }

    /// The option marked best, if any
    pub fn best(&self) -> Option<&ClassificationOption> {
        self.iter_all().find(|option| option.is_best)
    }

    /// The option preselected before any user interaction: the best option
    /// (always at the head of the primary list), else the top-ranked
    /// option, else the first extra.
    pub fn default_option(&self) -> Option<&ClassificationOption> {
        self.options.first().or_else(|| self.extras.first())
    }

    /// Whether any primary option is hidden (drives the expand control)
    pub fn has_hidden(&self) -> bool {
        self.options.iter().any(|option| option.hidden)
    }
}

/// Rank the classification options for one failure line.
///
/// Total over well-formed input: empty candidate sets produce an empty
/// primary list with extras still present. Referential inconsistencies in
/// the line data surface as [`TriageError`] values, never as a zero score.
pub fn rank(line: &FailureLine) -> Result<RankedOptions> {
    line.validate()?;

    // Errors here also cover a recorded best id that is missing entirely.
    let best_is_ignore = line.best_is_ignore()?;

    let match_groups = line.matches_by_classified_failure();

    // Candidates from classified failures with a real bug number. Each must
    // have recorded match evidence; a missing group means upstream data is
    // inconsistent and ranking must not silently continue.
    let mut autoclassified = Vec::new();
    for cf in line.classified_failures.iter().filter(|cf| cf.is_candidate()) {
        let records =
            match_groups
                .get(&cf.id)
                .ok_or(TriageError::MissingMatchGroup {
                    line: line.id,
                    classified_failure: cf.id,
                })?;
        let evidence = records
            .iter()
            .map(|record| MatchEvidence {
                matcher: record.matcher,
                score: record.score,
            })
            .collect();
        autoclassified.push(ClassificationOption::classified_failure(line.id, cf, evidence));
    }

    // Bug numbers already covered by autoclassification suppress the
    // corresponding unstructured suggestions.
    let autoclassified_bugs: HashSet<u64> = line
        .classified_failures
        .iter()
        .filter_map(|cf| cf.bug_number)
        .filter(|&bug| bug != 0)
        .collect();

    let suggested: Vec<ClassificationOption> = line
        .bug_suggestions
        .iter()
        .filter(|suggestion| !autoclassified_bugs.contains(&suggestion.bug_number))
        .map(|suggestion| ClassificationOption::unstructured(line.id, suggestion))
        .collect();

    // Pull the recorded best out of the scored pool; it is re-inserted at
    // the head regardless of score.
    let mut best = None;
    if !best_is_ignore {
        if let Some(best_id) = line.best_classification {
            if let Some(idx) = autoclassified
                .iter()
                .position(|option| option.classified_failure_id() == Some(best_id))
            {
                let mut option = autoclassified.remove(idx);
                option.is_best = true;
                best = Some(option);
            }
        }
    }

    // Autoclassified candidates precede suggestions, so score ties favor
    // the structured candidates under the stable sort.
    let mut options: Vec<ClassificationOption> =
        autoclassified.into_iter().chain(suggested).collect();
    score_options(line, &mut options);
    options.sort_by(|a, b| b.score.total_cmp(&a.score));

    let suppress_manual = best
        .as_ref()
        .is_some_and(|option| option.bug_number().is_some());
    if let Some(best) = best {
        options.insert(0, best);
    }

    mark_hidden(&mut options);

    let mut extras = Vec::new();
    if !suppress_manual {
        extras.push(ClassificationOption::manual(line.id));
    }
    let mut ignore = ClassificationOption::ignore(line.id);
    if best_is_ignore {
        ignore.is_best = true;
    }
    extras.push(ignore);

    debug!(
        line = %line.id,
        options = options.len(),
        extras = extras.len(),
        hidden = options.iter().filter(|o| o.hidden).count(),
        "ranked classification options"
    );

    Ok(RankedOptions { options, extras })
}

/// Score every option in the pool. Options carrying match evidence score as
/// their maximum match score; the rest score by similarity of the line's
/// log excerpt to the bug summary, reduced for already-resolved bugs.
fn score_options(line: &FailureLine, options: &mut [ClassificationOption]) {
    for option in options.iter_mut() {
        option.score = match option.matches() {
            Some(matches) if !matches.is_empty() => {
                matches.iter().map(|m| m.score).fold(0.0, f64::max)
            }
            _ => {
                let base = similarity(line.search_text(), option.bug_summary().unwrap_or(""));
                if option.is_resolved() {
                    base * RESOLVED_PENALTY
                } else {
                    base
                }
            }
        };
    }
}

/// Mark options hidden by default. An option outside the always-visible
/// window is hidden when its score misses the absolute floor, misses half
/// of the best score, or falls past the visible cap.
fn mark_hidden(options: &mut [ClassificationOption]) {
    let Some(first) = options.first() else {
        return;
    };
    let best_score = first.score;

    for (idx, option) in options.iter_mut().enumerate() {
        option.hidden = idx >= MIN_OPTIONS
            && (option.score < LOWER_CUTOFF
                || option.score < BEST_RATIO * best_score
                || idx >= MAX_OPTIONS);
    }
}
