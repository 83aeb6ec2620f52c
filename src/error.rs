//! Crate-level error type
//!
//! Rejected moves are not errors; see [`crate::orchestrator::MoveRejection`].

use thiserror::Error;

use crate::settings::SettingsError;
use crate::sim::CascadeError;
use crate::sync::SyncError;

#[derive(Debug, Error)]
pub enum ChainError {
    /// Cascade failed to settle. Indicates a bug; prior state is kept.
    #[error("invariant violation: {0}")]
    Cascade(#[from] CascadeError),

    #[error("settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("sync: {0}")]
    Sync(#[from] SyncError),
}
