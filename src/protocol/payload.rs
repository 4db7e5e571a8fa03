//! Payload types carried by the built-in messages.
//!
//! Parser output (`parsed`, `transformed`) is kept as opaque JSON; this
//! layer only moves it between contexts.

// ============================================================================
// Imports
// ============================================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// EventPath
// ============================================================================

/// Index path locating an event inside the parsed timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPath(pub Vec<u32>);

impl From<Vec<u32>> for EventPath {
    fn from(path: Vec<u32>) -> Self {
        Self(path)
    }
}

// ============================================================================
// State
// ============================================================================

/// View-level state shared between the view and its host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    /// Dark theme enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_dark: Option<bool>,

    /// Event under the pointer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hovering_path: Option<EventPath>,

    /// Event shown in the detail panel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_path: Option<EventPath>,

    /// Tag colours, keyed by timeline then tag.
    #[serde(default)]
    pub color_map: HashMap<String, HashMap<String, String>>,
}

/// Document-level state: source text and its parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkwhenState {
    /// Raw document text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,

    /// Parser output.
    #[serde(default)]
    pub parsed: Value,

    /// Transformed event tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformed: Option<Value>,
}

// ============================================================================
// Edits
// ============================================================================

/// Character range inside the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    /// Start offset.
    pub from: u64,
    /// End offset.
    pub to: u64,
}

/// Replaces the document text, or only `at` when given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetText {
    /// Replacement text.
    pub text: String,
    /// Range to replace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<TextRange>,
}

/// ISO-8601 date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeIso {
    /// Range start.
    pub from_date_time_iso: String,
    /// Range end.
    pub to_date_time_iso: String,
}

/// Zoom level of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayScale {
    /// One second.
    Second,
    /// Fifteen seconds.
    Quarterminute,
    /// One minute.
    Minute,
    /// Fifteen minutes.
    Quarterhour,
    /// One hour.
    Hour,
    /// One day.
    Day,
    /// One month.
    Month,
    /// One year.
    Year,
    /// Ten years.
    Decade,
}

/// Creates a new event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    /// Range of the new event.
    pub date_range_iso: DateRangeIso,
    /// Parser granularity name, e.g. `day`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
    /// Insert without prompting.
    pub immediate: bool,
}

/// Moves or resizes an existing event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEventDateRange {
    /// Event to edit.
    pub path: EventPath,
    /// New range.
    pub range: DateRangeIso,
    /// Scale the edit was made at.
    pub scale: DisplayScale,
    /// Date format to write back, if the source used one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_interpolation_format: Option<String>,
}

// ============================================================================
// Navigation
// ============================================================================

/// Scrolls to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpToPath {
    /// Target event.
    pub path: EventPath,
}

/// Scrolls to a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JumpToRange {
    /// Target range.
    pub date_range_iso: DateRangeIso,
}

// ============================================================================
// Tests
// ============================================================================
