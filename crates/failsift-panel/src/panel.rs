//! Panel state machine for one job's failure lines
//!
//! Owns the rebuildable line index, per-line selection state, and the
//! load-status lifecycle. All state is recomputed wholesale from provider
//! data on every load or save round-trip; nothing is incrementally
//! mutated, so stale entries cannot survive a data refresh.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use failsift_classify::{rank, RankedOptions};
use failsift_domain::{
    ClassificationOption, ErrorData, FailureLine, LineId, LineVerification, MatcherRegistry,
    OptionId, OptionKind, Result,
};

use crate::events::{
    ChoiceKind, Direction, LineChoice, OptionTarget, PanelCommand, PanelEvent, PanelEventRecord,
};

// ============================================================================
// STATUS TYPES
// ============================================================================

/// Lifecycle status of the panel's data load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Pending,
    Loading,
    Ready,
    NoLogs,
    ParseFailed,
    Error,
}

impl std::fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadStatus::Pending => write!(f, "pending"),
            LoadStatus::Loading => write!(f, "loading"),
            LoadStatus::Ready => write!(f, "ready"),
            LoadStatus::NoLogs => write!(f, "no_logs"),
            LoadStatus::ParseFailed => write!(f, "parse_failed"),
            LoadStatus::Error => write!(f, "error"),
        }
    }
}

/// Upstream autoclassification progress for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoclassifyStatus {
    Pending,
    CrossReferenced,
    Autoclassified,
    Failed,
}

/// Everything the panel needs to know about the job it is showing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContext {
    pub job_id: u64,
    pub has_logs: bool,
    pub logs_parsed: bool,
    pub log_parsing_failed: bool,
    pub autoclassify_status: AutoclassifyStatus,
}

// ============================================================================
// LINE ENTRY - one line plus its ranked options and selection
// ============================================================================

/// The user's current pick for a line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub option_id: OptionId,

    /// Bug number typed into the manual option, if any
    pub manual_bug_number: Option<u64>,
}

/// A loaded line with its ranked options and selection state.
///
/// Rebuilt from scratch whenever the underlying line data changes.
#[derive(Debug, Clone)]
pub struct LineEntry {
    line: FailureLine,
    ranked: RankedOptions,
    selection: SelectionState,
    show_hidden: bool,
}

impl LineEntry {
    fn new(line: FailureLine) -> Result<Self> {
        let ranked = rank(&line)?;
        let option_id = ranked
            .default_option()
            .map(|option| option.id.clone())
            // extras always contain at least the ignore option
            .unwrap_or_else(|| OptionId::ignore(line.id));
        Ok(LineEntry {
            line,
            ranked,
            selection: SelectionState {
                option_id,
                manual_bug_number: None,
            },
            show_hidden: false,
        })
    }

    pub fn line(&self) -> &FailureLine {
        &self.line
    }

    pub fn ranked(&self) -> &RankedOptions {
        &self.ranked
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    /// Whether a human has already verified this line
    pub fn verified(&self) -> bool {
        self.line.best_is_verified
    }

    /// Verified as intentionally ignored: no best classification recorded,
    /// or the best is the ignore sentinel.
    pub fn verified_ignore(&self) -> bool {
        self.line.best_is_verified
            && (self.line.best_classification.is_none()
                || matches!(self.line.best_is_ignore(), Ok(true)))
    }

    /// The currently selected option
    pub fn current_option(&self) -> Option<&ClassificationOption> {
        self.ranked.find(&self.selection.option_id)
    }

    /// Primary options visible under the current expand state
    pub fn visible_options(&self) -> impl Iterator<Item = &ClassificationOption> {
        self.ranked
            .options
            .iter()
            .filter(move |option| self.show_hidden || !option.hidden)
    }

    /// The recorded choice derived from the selected option. Manual picks
    /// contribute the typed-in bug number.
    pub fn choice(&self) -> Option<LineChoice> {
        let option = self.current_option()?;
        let kind = match &option.kind {
            OptionKind::ClassifiedFailure { .. } => ChoiceKind::ClassifiedFailure,
            OptionKind::UnstructuredBug { .. } => ChoiceKind::UnstructuredBug,
            OptionKind::Manual => ChoiceKind::Manual,
            OptionKind::Ignore => ChoiceKind::Ignore,
        };
        let bug_number = if matches!(option.kind, OptionKind::Manual) {
            self.selection.manual_bug_number
        } else {
            option.bug_number()
        };
        Some(LineChoice {
            kind,
            classified_failure_id: option.classified_failure_id(),
            bug_number,
        })
    }

    /// The save-contract record for this line's current choice
    pub fn verification(&self) -> Option<LineVerification> {
        self.choice().map(|choice| LineVerification {
            line_id: self.line.id,
            best_classification: choice.classified_failure_id,
            bug_number: choice.bug_number,
        })
    }

    /// Select an option by id; false when the id is unknown for this line
    /// or already selected.
    fn select(&mut self, option_id: OptionId) -> bool {
        if self.ranked.find(&option_id).is_none() {
            return false;
        }
        if self.selection.option_id == option_id {
            return false;
        }
        self.selection.option_id = option_id;
        true
    }
}

// ============================================================================
// PANEL
// ============================================================================

enum SaveScope {
    Selected,
    Pending,
}

/// The triage panel for one job.
pub struct AutoclassifyPanel {
    context: Option<JobContext>,
    load_status: LoadStatus,
    /// Autoclassify status at the time of the last successful load; a
    /// reload only happens when this moves from cross_referenced onward.
    autoclassify_status_on_load: Option<AutoclassifyStatus>,
    logged_in: bool,
    matchers: MatcherRegistry,
    lines: BTreeMap<LineId, LineEntry>,
    selected: BTreeSet<LineId>,
}

impl AutoclassifyPanel {
    pub fn new(logged_in: bool) -> Self {
        AutoclassifyPanel {
            context: None,
            load_status: LoadStatus::Pending,
            autoclassify_status_on_load: None,
            logged_in,
            matchers: MatcherRegistry::default(),
            lines: BTreeMap::new(),
            selected: BTreeSet::new(),
        }
    }

    pub fn load_status(&self) -> LoadStatus {
        self.load_status
    }

    pub fn context(&self) -> Option<&JobContext> {
        self.context.as_ref()
    }

    pub fn matchers(&self) -> &MatcherRegistry {
        &self.matchers
    }

    pub fn set_logged_in(&mut self, logged_in: bool) {
        self.logged_in = logged_in;
    }

    /// Switch to a different job, dropping all line and selection state.
    pub fn set_job(&mut self, context: JobContext) {
        debug!(job_id = context.job_id, "job changed");
        self.context = Some(context);
        self.lines.clear();
        self.selected.clear();
        self.autoclassify_status_on_load = None;
        self.load_status = LoadStatus::Pending;
    }

    /// Update job metadata (log/autoclassify progress) without resetting
    /// loaded lines.
    pub fn update_context(&mut self, context: JobContext) {
        self.context = Some(context);
    }

    /// Evaluate the load state; true when the caller should start a fetch.
    ///
    /// A completed load is only retried when the job moves from
    /// cross-referenced to a later autoclassify status.
    pub fn begin_build(&mut self) -> bool {
        let Some(context) = &self.context else {
            self.load_status = LoadStatus::Pending;
            return false;
        };

        if !context.logs_parsed || context.autoclassify_status == AutoclassifyStatus::Pending {
            self.load_status = LoadStatus::Pending;
            false
        } else if context.log_parsing_failed {
            self.load_status = LoadStatus::ParseFailed;
            false
        } else if !context.has_logs {
            self.load_status = LoadStatus::NoLogs;
            false
        } else if matches!(
            self.autoclassify_status_on_load,
            None | Some(AutoclassifyStatus::CrossReferenced)
        ) {
            if self.load_status != LoadStatus::Ready {
                self.load_status = LoadStatus::Loading;
            }
            true
        } else {
            false
        }
    }

    /// Record a fetch failure. Previously loaded lines are left untouched.
    pub fn mark_load_error(&mut self) {
        warn!("error line fetch failed");
        self.load_status = LoadStatus::Error;
    }

    /// Replace all panel state with freshly fetched data: rank every line,
    /// reset selections to the default option, and preselect the first
    /// line in display order.
    ///
    /// On a ranking error the previous state is left fully intact.
    pub fn load(&mut self, data: ErrorData) -> Result<Vec<PanelEventRecord>> {
        let ErrorData {
            matchers,
            error_lines,
        } = data;

        let mut entries = BTreeMap::new();
        for line in error_lines {
            let entry = LineEntry::new(line)?;
            entries.insert(entry.line.id, entry);
        }

        self.matchers = MatcherRegistry::new(matchers);
        self.lines = entries;
        self.selected.clear();
        self.load_status = LoadStatus::Ready;
        self.autoclassify_status_on_load =
            self.context.as_ref().map(|context| context.autoclassify_status);

        if let Some(first) = self.line_order().first() {
            self.selected.insert(*first);
        }

        let mut events: Vec<PanelEventRecord> = self
            .line_order()
            .into_iter()
            .filter_map(|line_id| {
                let choice = self.lines.get(&line_id)?.choice()?;
                Some(PanelEventRecord::new(PanelEvent::OptionChanged {
                    line_id,
                    choice,
                }))
            })
            .collect();
        events.push(PanelEventRecord::new(PanelEvent::SelectionChanged {
            selected: self.selected_ids(),
        }));

        info!(lines = self.lines.len(), "panel ready");
        Ok(events)
    }

    /// Lines in display order (newest line id first)
    pub fn line_order(&self) -> Vec<LineId> {
        self.lines.keys().rev().copied().collect()
    }

    pub fn line(&self, line_id: LineId) -> Option<&LineEntry> {
        self.lines.get(&line_id)
    }

    /// Selected line ids in display order
    pub fn selected_ids(&self) -> Vec<LineId> {
        self.line_order()
            .into_iter()
            .filter(|id| self.selected.contains(id))
            .collect()
    }

    pub fn selected_lines(&self) -> Vec<&LineEntry> {
        self.selected_ids()
            .into_iter()
            .filter_map(|id| self.lines.get(&id))
            .collect()
    }

    /// Lines not yet verified by a human, in display order
    pub fn pending_lines(&self) -> Vec<&LineEntry> {
        self.line_order()
            .into_iter()
            .filter_map(|id| self.lines.get(&id))
            .filter(|entry| !entry.verified())
            .collect()
    }

    /// Toggle a line in or out of the selection; `clear` replaces the
    /// selection with the target line.
    pub fn toggle_select(&mut self, line_id: LineId, clear: bool) -> Vec<PanelEventRecord> {
        if !self.lines.contains_key(&line_id) {
            return vec![];
        }
        let was_selected = self.selected.contains(&line_id);
        if clear {
            self.selected.clear();
        }
        if was_selected {
            self.selected.remove(&line_id);
        } else {
            self.selected.insert(line_id);
        }
        vec![PanelEventRecord::new(PanelEvent::SelectionChanged {
            selected: self.selected_ids(),
        })]
    }

    /// Record the bug number typed into a line's manual option.
    pub fn set_manual_bug_number(
        &mut self,
        line_id: LineId,
        bug_number: Option<u64>,
    ) -> Vec<PanelEventRecord> {
        let Some(entry) = self.lines.get_mut(&line_id) else {
            return vec![];
        };
        entry.selection.manual_bug_number = bug_number;
        if !matches!(
            entry.current_option().map(|option| &option.kind),
            Some(OptionKind::Manual)
        ) {
            return vec![];
        }
        match entry.choice() {
            Some(choice) => vec![PanelEventRecord::new(PanelEvent::OptionChanged {
                line_id,
                choice,
            })],
            None => vec![],
        }
    }

    /// Process one command from the selection collaborator.
    pub fn handle(&mut self, command: PanelCommand) -> Vec<PanelEventRecord> {
        match command {
            PanelCommand::SelectOption(target) => self.select_on_selected(target),
            PanelCommand::Ignore => self.ignore_selected(),
            PanelCommand::ToggleExpand => self.toggle_expand_selected(),
            PanelCommand::ChangeSelection { direction, clear } => {
                self.change_selection(direction, clear)
            }
            PanelCommand::Save => self.request_save(SaveScope::Selected),
            PanelCommand::SaveAll => self.request_save(SaveScope::Pending),
        }
    }

    /// All lines must have a saveable choice: ignore always is; anything
    /// else needs a classified failure or a bug number. Nothing is
    /// saveable while logged out.
    pub fn can_save(&self, lines: &[&LineEntry]) -> bool {
        self.logged_in
            && !lines.is_empty()
            && lines.iter().all(|entry| match entry.choice() {
                None => false,
                Some(choice) => match choice.kind {
                    ChoiceKind::Ignore => true,
                    _ => choice.classified_failure_id.is_some() || choice.bug_number.is_some(),
                },
            })
    }

    /// Point-in-time save snapshot for the given lines
    pub fn save_payload(&self, lines: &[&LineEntry]) -> Vec<LineVerification> {
        lines
            .iter()
            .filter_map(|entry| entry.verification())
            .collect()
    }

    /// Merge saved lines back in and re-rank them. Last write wins per
    /// line; untouched lines keep their state.
    pub fn apply_saved(&mut self, lines: Vec<FailureLine>) -> Result<Vec<PanelEventRecord>> {
        let mut rebuilt = Vec::with_capacity(lines.len());
        for line in lines {
            rebuilt.push(LineEntry::new(line)?);
        }

        let mut events = Vec::new();
        for entry in rebuilt {
            let line_id = entry.line.id;
            let choice = entry.choice();
            self.lines.insert(line_id, entry);
            if let Some(choice) = choice {
                events.push(PanelEventRecord::new(PanelEvent::OptionChanged {
                    line_id,
                    choice,
                }));
            }
        }
        info!(events = events.len(), "applied saved lines");
        Ok(events)
    }

    fn apply_option(
        &mut self,
        line_id: LineId,
        option_id: OptionId,
    ) -> Option<PanelEventRecord> {
        let entry = self.lines.get_mut(&line_id)?;
        if !entry.select(option_id) {
            return None;
        }
        let choice = entry.choice()?;
        Some(PanelEventRecord::new(PanelEvent::OptionChanged {
            line_id,
            choice,
        }))
    }

    fn select_on_selected(&mut self, target: OptionTarget) -> Vec<PanelEventRecord> {
        let mut events = Vec::new();
        for line_id in self.selected_ids() {
            let option_id = match target {
                OptionTarget::Index(idx) => {
                    let Some(entry) = self.lines.get(&line_id) else {
                        continue;
                    };
                    match entry.ranked.options.get(idx) {
                        Some(option) => option.id.clone(),
                        None => continue,
                    }
                }
                // suppressed manual options fail the select() lookup below
                OptionTarget::Manual => OptionId::manual(line_id),
            };
            events.extend(self.apply_option(line_id, option_id));
        }
        events
    }

    fn ignore_selected(&mut self) -> Vec<PanelEventRecord> {
        let mut events = Vec::new();
        for line_id in self.selected_ids() {
            events.extend(self.apply_option(line_id, OptionId::ignore(line_id)));
        }
        events
    }

    fn toggle_expand_selected(&mut self) -> Vec<PanelEventRecord> {
        let mut events = Vec::new();
        for line_id in self.selected_ids() {
            if let Some(entry) = self.lines.get_mut(&line_id) {
                entry.show_hidden = !entry.show_hidden;
                events.push(PanelEventRecord::new(PanelEvent::ExpandToggled {
                    line_id,
                    show_hidden: entry.show_hidden,
                }));
            }
        }
        events
    }

    fn change_selection(&mut self, direction: Direction, clear: bool) -> Vec<PanelEventRecord> {
        let order = self.line_order();
        let selected = self.selected_ids();

        let index_of = |id: &LineId| order.iter().position(|other| other == id);

        let target: isize = match direction {
            Direction::Next => selected
                .last()
                .and_then(index_of)
                .map(|idx| idx as isize + 1)
                .unwrap_or(0),
            Direction::Previous => selected
                .first()
                .and_then(index_of)
                .map(|idx| idx as isize - 1)
                .unwrap_or(-1),
        };

        if target < 0 || target as usize >= order.len() {
            // Moved past the panel boundary; with a multi-select extend
            // there is nothing sensible to do.
            if clear {
                return vec![PanelEventRecord::new(PanelEvent::CrossPanelNavigation {
                    direction,
                })];
            }
            return vec![];
        }

        self.toggle_select(order[target as usize], clear)
    }

    fn request_save(&self, scope: SaveScope) -> Vec<PanelEventRecord> {
        let lines = match scope {
            SaveScope::Selected => self.selected_lines(),
            SaveScope::Pending => self.pending_lines(),
        };
        if !self.can_save(&lines) {
            warn!(lines = lines.len(), "save requested but lines are not saveable");
            return vec![];
        }
        let payload = self.save_payload(&lines);
        vec![PanelEventRecord::new(PanelEvent::SaveRequested { payload })]
    }
}
