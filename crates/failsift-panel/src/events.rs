//! Typed commands and events for the triage panel
//!
//! The original workflow this models was driven by ambient broadcasts;
//! here the selection collaborator sends [`PanelCommand`] values into the
//! panel and receives [`PanelEventRecord`] values back, each with an id
//! and timestamp for audit logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use failsift_domain::{ClassifiedFailureId, LineId, LineVerification};

/// A unique event ID (UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        EventId(Uuid::new_v4())
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// Direction of a selection move between lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Previous,
}

/// Which option a select command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionTarget {
    /// 0-based index into the line's primary ranked list
    Index(usize),
    /// The manual free-entry option
    Manual,
}

/// Commands sent into the panel by the selection collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCommand {
    /// Choose an option on every selected line
    SelectOption(OptionTarget),

    /// Choose the ignore option on every selected line
    Ignore,

    /// Toggle visibility of hidden options on every selected line
    ToggleExpand,

    /// Move the line selection. `clear` replaces the selection; otherwise
    /// the target line is toggled into the existing selection.
    ChangeSelection { direction: Direction, clear: bool },

    /// Request a save of the currently selected lines
    Save,

    /// Request a save of every line still pending verification
    SaveAll,
}

/// The kind of classification the user picked for a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceKind {
    ClassifiedFailure,
    UnstructuredBug,
    Manual,
    Ignore,
}

/// A line's recorded classification choice, updated on every option change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChoice {
    pub kind: ChoiceKind,
    pub classified_failure_id: Option<ClassifiedFailureId>,
    pub bug_number: Option<u64>,
}

/// Events emitted by the panel in response to loads and commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PanelEvent {
    /// A line's chosen option changed (including the initial default)
    OptionChanged { line_id: LineId, choice: LineChoice },

    /// The set of selected lines changed
    SelectionChanged { selected: Vec<LineId> },

    /// Hidden options were shown or re-hidden for a line
    ExpandToggled { line_id: LineId, show_hidden: bool },

    /// The selection moved past the panel boundary; the surrounding UI
    /// should move to the adjacent panel
    CrossPanelNavigation { direction: Direction },

    /// A save snapshot is ready for the provider
    SaveRequested { payload: Vec<LineVerification> },
}

/// An event with its envelope metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelEventRecord {
    pub event_id: EventId,
    pub recorded_at: DateTime<Utc>,
    pub event: PanelEvent,
}

impl PanelEventRecord {
    pub fn new(event: PanelEvent) -> Self {
        PanelEventRecord {
            event_id: EventId::new(),
            recorded_at: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_unique() {
        assert_ne!(EventId::new(), EventId::new());
    }

    #[test]
    fn test_event_serialization() {
        let record = PanelEventRecord::new(PanelEvent::CrossPanelNavigation {
            direction: Direction::Next,
        });
        let json = serde_json::to_string(&record).expect("should serialize");
        let back: PanelEventRecord = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(back.event, record.event);
    }
}
