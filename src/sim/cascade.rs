//! Cascade resolution
//!
//! Resolves chained explosions wave by wave until the board is stable, or,
//! once the game can be won, until the mover owns every orb. Each wave is selected from one row-major scan and committed as a batch,
//! so explosions in the same wave never observe each other's effects.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::board::{Board, PlayerId};
use crate::consts::MAX_CASCADE_WAVES;

/// One cell exploding during a cascade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplosionEvent {
    /// 0-based wave this explosion belongs to
    pub wave: u32,
    pub origin_row: usize,
    pub origin_col: usize,
    /// Owner of the exploding cell before it exploded
    pub from_owner: Option<PlayerId>,
    /// Colour every destination takes (always the mover)
    pub to_owner: PlayerId,
    /// In-bounds neighbours, up/down/left/right
    pub destinations: Vec<(usize, usize)>,
}

/// Result of resolving a cascade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cascade {
    /// Final board. Stable when `settled` is set.
    pub board: Board,
    /// Explosions in wave order, row-major within a wave
    pub events: Vec<ExplosionEvent>,
    /// Number of waves that exploded
    pub waves: u32,
    /// Orbs that had no in-bounds neighbour to land on
    pub orbs_lost: u64,
    /// False if resolution stopped early on a board swept by the mover
    pub settled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CascadeError {
    /// The board did not stabilize within the wave bound. Always a bug.
    #[error("cascade did not stabilize within {waves} waves")]
    WaveLimitExceeded { waves: u32 },
}

/// Resolve every pending explosion on `board`, attributing captures to `mover`.
///
/// Pure: the same board and mover always yield the same output. A board that
/// is already stable comes back unchanged with no events.
pub fn resolve_cascade(board: Board, mover: PlayerId) -> Result<Cascade, CascadeError> {
    resolve(board, mover, false)
}

/// Like [`resolve_cascade`], but stops before the next wave once every orb on
/// the board belongs to `mover`.
///
/// Only valid after every player has moved: the swept board is then already
/// won, and a small board saturated by one colour would otherwise never settle.
pub fn resolve_cascade_until_swept(
    board: Board,
    mover: PlayerId,
) -> Result<Cascade, CascadeError> {
    resolve(board, mover, true)
}

fn resolve(
    mut board: Board,
    mover: PlayerId,
    stop_when_swept: bool,
) -> Result<Cascade, CascadeError> {
    let mut events = Vec::new();
    let mut orbs_lost = 0u64;

    for wave in 0..=MAX_CASCADE_WAVES {
        let critical: Vec<(usize, usize)> = board
            .iter()
            .filter(|(_, cell)| cell.is_critical())
            .map(|(pos, _)| pos)
            .collect();

        if critical.is_empty() {
            log::debug!("cascade settled after {} waves ({} explosions)", wave, events.len());
            return Ok(Cascade {
                board,
                events,
                waves: wave,
                orbs_lost,
                settled: true,
            });
        }

        if stop_when_swept && board.is_swept_by(mover) {
            log::debug!("{} owns every orb after {} waves, stopping", mover, wave);
            return Ok(Cascade {
                board,
                events,
                waves: wave,
                orbs_lost,
                settled: false,
            });
        }

        if wave == MAX_CASCADE_WAVES {
            break;
        }

        // Drain every exploding cell first, then deliver, so the wave commits as one batch
        let mut deliveries = Vec::with_capacity(critical.len() * 4);
        for &(row, col) in &critical {
            let destinations = board.neighbors(row, col);
            let Some(cell) = board.get_mut(row, col) else {
                continue;
            };
            let from_owner = cell.owner;
            let threshold = cell.threshold;
            cell.count = cell.count.saturating_sub(threshold);
            if cell.count == 0 {
                cell.owner = None;
            }

            orbs_lost += u64::from(threshold).saturating_sub(destinations.len() as u64);
            deliveries.extend_from_slice(&destinations);
            events.push(ExplosionEvent {
                wave,
                origin_row: row,
                origin_col: col,
                from_owner,
                to_owner: mover,
                destinations,
            });
        }

        for (row, col) in deliveries {
            if let Some(target) = board.get_mut(row, col) {
                target.count += 1;
                target.owner = Some(mover);
            }
        }
    }

    log::error!(
        "cascade exceeded {} waves for {} ({} explosions so far)",
        MAX_CASCADE_WAVES,
        mover,
        events.len()
    );
    Err(CascadeError::WaveLimitExceeded {
        waves: MAX_CASCADE_WAVES,
    })
}
