//! Chain Reaction - A turn-based grid game of exploding orbs
//!
//! Core modules:
//! - `sim`: Deterministic rules (board, cascade resolution, turns and victory)
//! - `orchestrator`: Single mutation entry point with the one-move-at-a-time guard
//! - `playback`: Timed orb flights for the presentation layer
//! - `sync`: Optimistic last-writer-wins state sharing between peers
//! - `settings`: Board shape, player count, timings
//! - `clock`: Wall-clock time for the move guard's safety timeout

pub mod clock;
pub mod error;
pub mod orchestrator;
pub mod playback;
pub mod settings;
pub mod sim;
pub mod sync;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ChainError;
pub use orchestrator::{MoveFrame, MoveOrchestrator, MoveRejection, Presenter};
pub use settings::{Settings, SettingsError};
pub use sync::{GameId, LocalHub, SyncAdapter, SyncedGame};

/// Game configuration constants
pub mod consts {
    /// Default board dimensions
    pub const DEFAULT_ROWS: usize = 9;
    pub const DEFAULT_COLS: usize = 6;

    /// Supported player counts
    pub const MIN_PLAYERS: u8 = 2;
    pub const MAX_PLAYERS: u8 = 4;

    /// Cascades that do not settle within this many waves are a bug
    pub const MAX_CASCADE_WAVES: u32 = 100;

    /// Held move guard is force-released after this long (seconds)
    pub const SAFETY_TIMEOUT_SECS: f32 = 3.0;

    /// Orb flight and drop-in duration (seconds)
    pub const ORB_FLIGHT_SECS: f32 = 0.5;
    /// Pause between explosion waves
    pub const WAVE_GAP_SECS: f32 = 0.05;
    /// Long cascades are compressed to fit under the safety timeout
    pub const MAX_PLAYBACK_SECS: f32 = 2.5;
}
