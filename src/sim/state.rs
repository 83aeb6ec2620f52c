//! Game state and the turn/victory state machine
//!
//! Everything peers exchange through the sync document lives here.

use serde::{Deserialize, Serialize};

use super::board::{Board, PlayerId};
use super::cascade::Cascade;
use crate::consts::{MAX_PLAYERS, MIN_PLAYERS};

/// Whether the game is still running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Playing,
    Won(PlayerId),
}

/// Complete game state (serializable, exchanged with peers)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub current_player: PlayerId,
    /// Completed moves since the last reset
    pub move_count: u32,
    pub status: GameStatus,
    /// Configured number of players (2..=4)
    pub players: u8,
}

impl GameState {
    /// Fresh game: empty board, player 1 to move
    pub fn new(rows: usize, cols: usize, players: u8) -> Self {
        Self {
            board: Board::new(rows, cols),
            current_player: PlayerId::FIRST,
            move_count: 0,
            status: GameStatus::Playing,
            players,
        }
    }

    pub fn is_over(&self) -> bool {
        matches!(self.status, GameStatus::Won(_))
    }

    pub fn winner(&self) -> Option<PlayerId> {
        match self.status {
            GameStatus::Won(p) => Some(p),
            GameStatus::Playing => None,
        }
    }

    /// Every player has had a first move
    pub fn seeding_done(&self) -> bool {
        self.move_count >= u32::from(self.players)
    }

    /// The move about to be made can end the game. Victory is never declared
    /// before move 2 or before every player has moved.
    pub fn next_move_can_win(&self) -> bool {
        self.move_count + 1 >= u32::from(self.players).max(2)
    }

    /// A player is out once every player has moved and they own nothing
    pub fn is_eliminated(&self, player: PlayerId) -> bool {
        self.seeding_done() && !self.board.is_alive(player)
    }

    /// `player` may add an orb to (row, col): the cell is unowned or already theirs
    pub fn can_place(&self, row: usize, col: usize, player: PlayerId) -> bool {
        self.board
            .get(row, col)
            .is_some_and(|cell| cell.count == 0 || cell.owner == Some(player))
    }

    /// Shape checks for snapshots arriving from peers.
    ///
    /// The board must be stable, except in a game won by sweeping the board,
    /// where resolution stopped with every orb in the winner's colour.
    pub fn is_well_formed(&self) -> bool {
        let known = |p: PlayerId| (1..=self.players).contains(&p.get());
        let swept_win = matches!(self.status, GameStatus::Won(w) if self.board.is_swept_by(w));
        (MIN_PLAYERS..=MAX_PLAYERS).contains(&self.players)
            && known(self.current_player)
            && self.board.is_well_formed()
            && (self.board.is_stable() || swept_win)
            && self.board.iter().all(|(_, cell)| cell.owner.is_none_or(known))
    }

    /// Fold a resolved cascade into the next state. Consumes the move.
    pub fn after_move(&self, cascade: Cascade) -> GameState {
        let mut next = GameState {
            board: cascade.board,
            current_player: self.current_player,
            move_count: self.move_count + 1,
            status: GameStatus::Playing,
            players: self.players,
        };

        if let Some(winner) = check_victory(&next.board, next.move_count, next.players) {
            next.status = GameStatus::Won(winner);
            // Turn freezes on the winner
            next.current_player = winner;
        } else {
            next.current_player = next.next_player();
        }
        next
    }

    /// Next player in rotation, skipping eliminated players once seeding is done
    fn next_player(&self) -> PlayerId {
        let mut candidate = self.current_player;
        for _ in 0..self.players {
            candidate = candidate.rotate(self.players);
            if !self.is_eliminated(candidate) {
                return candidate;
            }
        }
        self.current_player.rotate(self.players)
    }
}

/// The sole player with orbs left, once every player has made a first move.
///
/// Never declares a winner before move 2 or on an empty board.
pub fn check_victory(board: &Board, move_count: u32, players: u8) -> Option<PlayerId> {
    if move_count < 2 || move_count < u32::from(players) {
        return None;
    }
    if board.total_orbs() == 0 {
        return None;
    }

    let mut alive = PlayerId::all(players).filter(|&p| board.is_alive(p));
    match (alive.next(), alive.next()) {
        (Some(sole), None) => Some(sole),
        _ => None,
    }
}
