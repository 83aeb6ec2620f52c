//! Move orchestration
//!
//! Single mutation entry point for a game. A move is resolved and published
//! synchronously; its playback then runs on the caller's frame loop via
//! [`MoveOrchestrator::advance`]. One move at a time is admitted: the guard
//! taken on acceptance is released when playback ends, when the presenter
//! reports it finished, or when the safety timeout fires. The timeout counts
//! both frame time and wall-clock time, so a stale guard is cleared on the next
//! submission even if the frame loop has stopped.

use crate::clock::{Clock, SystemClock};
use crate::error::ChainError;
use crate::playback::Playback;
use crate::settings::Settings;
use crate::sim::{
    ExplosionEvent, GameState, GameStatus, PlayerId, resolve_cascade, resolve_cascade_until_swept,
};

/// Why a move was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    OutOfBounds,
    /// Another move is still in flight
    Busy,
    GameOver,
    /// Cell belongs to another player
    NotYourCell,
}

/// What the presentation layer gets after each accepted move
#[derive(Debug, Clone)]
pub struct MoveFrame<'a> {
    pub placed: (usize, usize),
    pub mover: PlayerId,
    pub state: &'a GameState,
    pub events: &'a [ExplosionEvent],
}

impl MoveFrame<'_> {
    pub fn next_turn(&self) -> PlayerId {
        self.state.current_player
    }

    pub fn status(&self) -> GameStatus {
        self.state.status
    }
}

/// Presentation callback. Must not feed state back except via `submit_move`.
pub trait Presenter {
    fn present(&mut self, frame: &MoveFrame<'_>);
}

/// Exclusive in-flight flag with a safety timeout
#[derive(Debug, Clone, Default)]
pub struct MoveGuard {
    hold: Option<Hold>,
}

#[derive(Debug, Clone, Copy)]
struct Hold {
    /// Clock reading at acquisition
    acquired_at: f64,
    /// Frame time seen since acquisition
    ticked: f32,
}

impl MoveGuard {
    /// Take the guard at clock time `now`. Returns false if it is already held.
    pub fn try_acquire(&mut self, now: f64) -> bool {
        if self.hold.is_some() {
            return false;
        }
        self.hold = Some(Hold {
            acquired_at: now,
            ticked: 0.0,
        });
        true
    }

    pub fn release(&mut self) {
        self.hold = None;
    }

    pub fn is_held(&self) -> bool {
        self.hold.is_some()
    }

    /// Held for `timeout` seconds of either frame time or clock time
    pub fn is_stale(&self, now: f64, timeout: f32) -> bool {
        self.hold.is_some_and(|hold| {
            hold.ticked >= timeout || now - hold.acquired_at >= f64::from(timeout)
        })
    }

    /// Release a stale guard. Returns true if this call force-released it.
    pub fn expire(&mut self, now: f64, timeout: f32) -> bool {
        if self.is_stale(now, timeout) {
            self.hold = None;
            return true;
        }
        false
    }

    /// Age the guard by a frame. Returns true if this call force-released it.
    pub fn tick(&mut self, dt: f32, now: f64, timeout: f32) -> bool {
        let Some(hold) = self.hold.as_mut() else {
            return false;
        };
        hold.ticked += dt.max(0.0);
        self.expire(now, timeout)
    }
}

/// Owns a game's state and serializes every change to it
pub struct MoveOrchestrator {
    settings: Settings,
    state: GameState,
    guard: MoveGuard,
    playback: Option<Playback>,
    presenter: Option<Box<dyn Presenter>>,
    clock: Box<dyn Clock>,
}

impl MoveOrchestrator {
    pub fn new(settings: Settings) -> Result<Self, ChainError> {
        settings.validate()?;
        let state = GameState::new(settings.rows, settings.cols, settings.players);
        Ok(Self {
            settings,
            state,
            guard: MoveGuard::default(),
            playback: None,
            presenter: None,
            clock: Box::new(SystemClock::default()),
        })
    }

    pub fn with_presenter(mut self, presenter: Box<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Replace the wall clock used by the safety timeout
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn playback(&self) -> Option<&Playback> {
        self.playback.as_ref()
    }

    /// A move is in flight (accepted, playback not yet done)
    pub fn is_busy(&self) -> bool {
        self.guard.is_held()
            && !self
                .guard
                .is_stale(self.clock.now_secs(), self.settings.safety_timeout_secs)
    }

    /// Place an orb for the current player. `Ok(false)` if the move was rejected.
    pub fn submit_move(&mut self, row: usize, col: usize) -> Result<bool, ChainError> {
        match self.try_move(row, col)? {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    /// Like [`submit_move`](Self::submit_move) but reports why a move was rejected.
    ///
    /// The outer `Result` carries invariant violations; state is left as it
    /// was before the call in that case.
    pub fn try_move(
        &mut self,
        row: usize,
        col: usize,
    ) -> Result<Result<(), MoveRejection>, ChainError> {
        if let Err(reason) = self.check_move(row, col) {
            log::debug!("rejected move ({}, {}): {:?}", row, col, reason);
            return Ok(Err(reason));
        }
        if !self.guard.try_acquire(self.clock.now_secs()) {
            return Ok(Err(MoveRejection::Busy));
        }

        let mover = self.state.current_player;
        let mut board = self.state.board.clone();
        if let Some(cell) = board.get_mut(row, col) {
            cell.count += 1;
            cell.owner = Some(mover);
        }

        // Once the game can end, a board swept by the mover is a win, settled or not
        let resolved = if self.state.next_move_can_win() {
            resolve_cascade_until_swept(board, mover)
        } else {
            resolve_cascade(board, mover)
        };
        let mut cascade = match resolved {
            Ok(cascade) => cascade,
            Err(e) => {
                log::error!("move by {} at ({}, {}) abandoned: {}", mover, row, col, e);
                self.guard.release();
                return Err(e.into());
            }
        };

        let events = std::mem::take(&mut cascade.events);
        let next = self.state.after_move(cascade);
        log::info!(
            "move {} by {} at ({}, {}): {} explosions",
            next.move_count,
            mover,
            row,
            col,
            events.len()
        );
        if let GameStatus::Won(winner) = next.status {
            log::info!("{} wins after {} moves", winner, next.move_count);
        }

        // Publish first; playback only ever reads the published state
        self.state = next;
        self.playback = Some(Playback::schedule((row, col), mover, &events, &self.settings));
        if let Some(presenter) = self.presenter.as_mut() {
            presenter.present(&MoveFrame {
                placed: (row, col),
                mover,
                state: &self.state,
                events: &events,
            });
        }
        Ok(Ok(()))
    }

    /// Preconditions in order: bounds, busy, game over, ownership.
    /// A stale guard is cleared before the busy check.
    fn check_move(&mut self, row: usize, col: usize) -> Result<(), MoveRejection> {
        if !self.state.board.in_bounds(row, col) {
            return Err(MoveRejection::OutOfBounds);
        }
        if self
            .guard
            .expire(self.clock.now_secs(), self.settings.safety_timeout_secs)
        {
            self.on_guard_timeout();
        }
        if self.guard.is_held() {
            return Err(MoveRejection::Busy);
        }
        if self.state.is_over() {
            return Err(MoveRejection::GameOver);
        }
        if !self.state.can_place(row, col, self.state.current_player) {
            return Err(MoveRejection::NotYourCell);
        }
        Ok(())
    }

    /// Drive playback and the guard's safety timeout by `dt` seconds
    pub fn advance(&mut self, dt: f32) {
        if let Some(playback) = self.playback.as_mut() {
            if playback.advance(dt) {
                self.playback = None;
                self.guard.release();
                return;
            }
        }
        let now = self.clock.now_secs();
        if self.guard.tick(dt, now, self.settings.safety_timeout_secs) {
            self.on_guard_timeout();
        }
    }

    fn on_guard_timeout(&mut self) {
        log::warn!(
            "move guard held past {:.1}s, releasing",
            self.settings.safety_timeout_secs
        );
        self.playback = None;
    }

    /// Presenter finished its own animation early
    pub fn playback_finished(&mut self) {
        self.playback = None;
        self.guard.release();
    }

    /// Replace local state with a peer's snapshot (last writer wins).
    ///
    /// Identical snapshots are ignored. Anything else overrides an in-flight
    /// move. Returns true if the snapshot was adopted.
    pub fn adopt_remote(&mut self, remote: GameState) -> bool {
        if remote == self.state {
            return false;
        }
        if !remote.is_well_formed()
            || remote.board.rows() != self.settings.rows
            || remote.board.cols() != self.settings.cols
            || remote.players != self.settings.players
        {
            log::warn!(
                "ignoring malformed remote snapshot ({}x{}, {} players)",
                remote.board.rows(),
                remote.board.cols(),
                remote.players
            );
            return false;
        }

        log::info!(
            "adopted remote state at move {} ({} to play)",
            remote.move_count,
            remote.current_player
        );
        self.state = remote;
        self.playback = None;
        self.guard.release();
        true
    }

    /// Put back a state this orchestrator held earlier, dropping any move
    /// made since
    pub(crate) fn restore(&mut self, state: GameState) {
        self.state = state;
        self.playback = None;
        self.guard.release();
    }

    /// Start over. Abandons any playback.
    pub fn reset(&mut self) {
        self.state = GameState::new(self.settings.rows, self.settings.cols, self.settings.players);
        self.playback = None;
        self.guard.release();
        log::info!("game reset");
    }
}
