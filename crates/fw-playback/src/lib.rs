//! Narrative progression engine for Fabelweg.
//!
//! Walks [`fw_core::StoryGraph`] nodes as a per-user state machine, gating
//! choices on achievements and credits, and exposes the whole platform
//! behind one domain service: [`StoryService`]. Any UI or API surface
//! drives the engine through the same named commands and receives the same
//! typed events.

/// Asset prefetch seam for node transitions.
pub mod assets;
/// Error types for playback operations.
pub mod error;
/// Events emitted for UI consumption.
pub mod event;
/// The append-only playthrough history log.
pub mod history;
/// The per-user playthrough state machine.
pub mod playthrough;
/// The domain service composing catalogs, ledger, and playthroughs.
pub mod service;

/// Re-export asset seam types.
pub use assets::{AssetPrefetcher, NoopPrefetcher};
/// Re-export error types.
pub use error::{PlaybackError, PlaybackResult};
/// Re-export event types.
pub use event::{EngineEvent, RejectReason};
/// Re-export history types.
pub use history::{HistoryEntry, HistoryLog};
/// Re-export playthrough types.
pub use playthrough::{PlaybackPhase, Playthrough};
/// Re-export service types.
pub use service::{ChoiceView, PlaythroughView, StoryService};
