//! Protocol message types.
//!
//! This module defines the envelope exchanged between the two contexts
//! and the typed payloads it can carry.
//!
//! # Protocol Overview
//!
//! | Envelope | Direction | Purpose |
//! |----------|-----------|---------|
//! | request (`request: true`) | either | Asks the peer to run its handler for `type` |
//! | response (`response: true`) | either | Carries the handler's result, same `id` |
//!
//! Both sides send and answer requests over the same channel; the `id`
//! prefix separates this protocol from foreign traffic on shared channels.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | Wire envelope and classification |
//! | `message` | Type tags and typed message kinds |
//! | `payload` | Payload structs for the built-in kinds |

// ============================================================================
// Submodules
// ============================================================================

/// Wire envelope.
pub mod envelope;

/// Message type tags and typed kinds.
pub mod message;

/// Payload types.
pub mod payload;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::{Envelope, EnvelopeKind};
pub use message::{MessageKind, MessageType, kind};
pub use payload::{
    AppState, DateRangeIso, DisplayScale, EditEventDateRange, EventPath, JumpToPath, JumpToRange,
    MarkwhenState, NewEvent, SetText, TextRange,
};
