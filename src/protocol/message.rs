//! Message type tags and typed message kinds.
//!
//! | Tag | Params | Output |
//! |-----|--------|--------|
//! | `appState` | `Option<AppState>` | `Option<AppState>` |
//! | `markwhenState` | `Option<MarkwhenState>` | `Option<MarkwhenState>` |
//! | `setHoveringPath` | `EventPath` | `()` |
//! | `setDetailPath` | `EventPath` | `()` |
//! | `setText` | `SetText` | `()` |
//! | `showInEditor` | `EventPath` | `()` |
//! | `newEvent` | `NewEvent` | `()` |
//! | `editEventDateRange` | `EditEventDateRange` | `()` |
//! | `jumpToPath` | `JumpToPath` | `()` |
//! | `jumpToRange` | `JumpToRange` | `()` |
//!
//! The two state kinds double as fetch (no params) and push (params set).
//! Any other tag travels as [`MessageType::Custom`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ============================================================================
// MessageType
// ============================================================================

/// Tag identifying an envelope's payload shape.
///
/// Equality and hashing go by wire name, so `Custom("appState")` and
/// [`AppState`](Self::AppState) are the same tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    /// `appState`
    AppState,
    /// `markwhenState`
    MarkwhenState,
    /// `setHoveringPath`
    SetHoveringPath,
    /// `setDetailPath`
    SetDetailPath,
    /// `setText`
    SetText,
    /// `showInEditor`
    ShowInEditor,
    /// `newEvent`
    NewEvent,
    /// `editEventDateRange`
    EditEventDateRange,
    /// `jumpToPath`
    JumpToPath,
    /// `jumpToRange`
    JumpToRange,
    /// Caller-defined tag.
    Custom(String),
}

impl MessageType {
    /// Returns the wire name of the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AppState => "appState",
            Self::MarkwhenState => "markwhenState",
            Self::SetHoveringPath => "setHoveringPath",
            Self::SetDetailPath => "setDetailPath",
            Self::SetText => "setText",
            Self::ShowInEditor => "showInEditor",
            Self::NewEvent => "newEvent",
            Self::EditEventDateRange => "editEventDateRange",
            Self::JumpToPath => "jumpToPath",
            Self::JumpToRange => "jumpToRange",
            Self::Custom(name) => name,
        }
    }
}

impl From<&str> for MessageType {
    fn from(name: &str) -> Self {
        match name {
            "appState" => Self::AppState,
            "markwhenState" => Self::MarkwhenState,
            "setHoveringPath" => Self::SetHoveringPath,
            "setDetailPath" => Self::SetDetailPath,
            "setText" => Self::SetText,
            "showInEditor" => Self::ShowInEditor,
            "newEvent" => Self::NewEvent,
            "editEventDateRange" => Self::EditEventDateRange,
            "jumpToPath" => Self::JumpToPath,
            "jumpToRange" => Self::JumpToRange,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for MessageType {
    fn from(name: String) -> Self {
        match Self::from(name.as_str()) {
            Self::Custom(_) => Self::Custom(name),
            known => known,
        }
    }
}

impl From<MessageType> for String {
    fn from(message_type: MessageType) -> Self {
        match message_type {
            MessageType::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// MessageKind
// ============================================================================

/// Binds a [`MessageType`] to its request and response payload types.
///
/// Implement this on a marker type to add a custom message:
///
/// ```ignore
/// enum Ping {}
///
/// impl MessageKind for Ping {
///     type Params = ();
///     type Output = String;
///     fn message_type() -> MessageType {
///         MessageType::from("ping")
///     }
/// }
/// ```
pub trait MessageKind: 'static {
    /// Payload carried by the request.
    type Params: Serialize + DeserializeOwned + Send + 'static;

    /// Payload carried by the response.
    type Output: Serialize + DeserializeOwned + Send + 'static;

    /// Tag this kind travels under.
    fn message_type() -> MessageType;
}

// ============================================================================
// Kinds
// ============================================================================

macro_rules! message_kinds {
    ($($(#[$doc:meta])* $kind:ident($params:ty) -> $output:ty;)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy)]
            pub enum $kind {}

            impl MessageKind for $kind {
                type Params = $params;
                type Output = $output;

                #[inline]
                fn message_type() -> MessageType {
                    MessageType::$kind
                }
            }
        )*
    };
}

/// Marker types for the built-in Markwhen messages.
pub mod kind {
    use super::{MessageKind, MessageType};
    use crate::protocol::payload;

    message_kinds! {
        /// Fetch (no params) or push the view's app state.
        AppState(Option<payload::AppState>) -> Option<payload::AppState>;
        /// Fetch (no params) or push the parsed document state.
        MarkwhenState(Option<payload::MarkwhenState>) -> Option<payload::MarkwhenState>;
        /// Highlight the event under the pointer.
        SetHoveringPath(payload::EventPath) -> ();
        /// Open the detail panel for an event.
        SetDetailPath(payload::EventPath) -> ();
        /// Replace document text, optionally only a range.
        SetText(payload::SetText) -> ();
        /// Reveal an event's source in the editor.
        ShowInEditor(payload::EventPath) -> ();
        /// Create an event over a date range.
        NewEvent(payload::NewEvent) -> ();
        /// Move or resize an event.
        EditEventDateRange(payload::EditEventDateRange) -> ();
        /// Scroll the view to an event.
        JumpToPath(payload::JumpToPath) -> ();
        /// Scroll the view to a date range.
        JumpToRange(payload::JumpToRange) -> ();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tags_round_trip() {
        let tags = [
            MessageType::AppState,
            MessageType::MarkwhenState,
            MessageType::SetHoveringPath,
            MessageType::SetDetailPath,
            MessageType::SetText,
            MessageType::ShowInEditor,
            MessageType::NewEvent,
            MessageType::EditEventDateRange,
            MessageType::JumpToPath,
            MessageType::JumpToRange,
        ];

        for tag in tags {
            assert_eq!(MessageType::from(tag.as_str()), tag);
        }
    }

    #[test]
    fn test_custom_with_known_name_is_same_tag() {
        use rustc_hash::FxHashSet;

        let spelled = MessageType::Custom("appState".to_string());
        assert_eq!(spelled, MessageType::AppState);
        assert_ne!(spelled, MessageType::MarkwhenState);

        let mut tags = FxHashSet::default();
        tags.insert(MessageType::AppState);
        assert!(tags.contains(&spelled));
    }

    #[test]
    fn test_unknown_tag_is_custom() {
        let tag = MessageType::from("ping");
        assert_eq!(tag, MessageType::Custom("ping".to_string()));
        assert_eq!(tag.to_string(), "ping");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&MessageType::EditEventDateRange).expect("serialize");
        assert_eq!(json, "\"editEventDateRange\"");

        let parsed: MessageType = serde_json::from_str("\"markwhenState\"").expect("parse");
        assert_eq!(parsed, MessageType::MarkwhenState);
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(kind::AppState::message_type(), MessageType::AppState);
        assert_eq!(kind::SetText::message_type(), MessageType::SetText);
        assert_eq!(kind::JumpToRange::message_type(), MessageType::JumpToRange);
    }
}
