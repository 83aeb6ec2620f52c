//! Deterministic simulation module
//!
//! All gameplay rules live here. This module must be pure and deterministic:
//! - Row-major scan order only
//! - No timers, rendering, or sync dependencies
//! - Boards go in by value and come out as new values

pub mod board;
pub mod cascade;
pub mod state;

pub use board::{Board, Cell, PlayerId, threshold_for};
pub use cascade::{
    Cascade, CascadeError, ExplosionEvent, resolve_cascade, resolve_cascade_until_swept,
};
pub use state::{GameState, GameStatus, check_victory};
