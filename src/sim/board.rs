//! Board and cell types
//!
//! The board is a fixed-size row-major grid. Thresholds are assigned once at
//! creation from each cell's position and never change afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A player, numbered from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(u8);

impl PlayerId {
    /// Player 1 always moves first
    pub const FIRST: PlayerId = PlayerId(1);

    /// Returns `None` for 0
    pub fn new(n: u8) -> Option<Self> {
        (n > 0).then_some(Self(n))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Plain modular rotation: `(p mod count) + 1`
    pub fn rotate(self, count: u8) -> Self {
        Self(self.0 % count.max(1) + 1)
    }

    /// All players of a game with `count` players, in turn order
    pub fn all(count: u8) -> impl Iterator<Item = PlayerId> {
        (1..=count).map(PlayerId)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub count: u32,
    pub owner: Option<PlayerId>,
    pub threshold: u32,
}

impl Cell {
    fn empty(threshold: u32) -> Self {
        Self {
            count: 0,
            owner: None,
            threshold,
        }
    }

    /// Cell has reached critical mass
    #[inline]
    pub fn is_critical(&self) -> bool {
        self.count >= self.threshold
    }
}

/// Explosion threshold for a position: corner 2, edge 3, interior 4
pub fn threshold_for(row: usize, col: usize, rows: usize, cols: usize) -> u32 {
    let top_or_bottom = row == 0 || row + 1 == rows;
    let left_or_right = col == 0 || col + 1 == cols;
    match (top_or_bottom, left_or_right) {
        (true, true) => 2,
        (true, false) | (false, true) => 3,
        (false, false) => 4,
    }
}

/// Rectangular grid of cells, stored row-major
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Create an empty board. Dimensions must be positive.
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(Cell::empty(threshold_for(row, col, rows, cols)));
            }
        }
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.in_bounds(row, col)
            .then(|| &self.cells[self.index(row, col)])
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        if !self.in_bounds(row, col) {
            return None;
        }
        let idx = self.index(row, col);
        Some(&mut self.cells[idx])
    }

    /// Cells with their coordinates, in row-major order
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &Cell)> {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| ((i / cols, i % cols), cell))
    }

    /// Orthogonal in-bounds neighbours in up, down, left, right order
    pub fn neighbors(&self, row: usize, col: usize) -> Vec<(usize, usize)> {
        let mut out = Vec::with_capacity(4);
        if row > 0 {
            out.push((row - 1, col));
        }
        if row + 1 < self.rows {
            out.push((row + 1, col));
        }
        if col > 0 {
            out.push((row, col - 1));
        }
        if col + 1 < self.cols {
            out.push((row, col + 1));
        }
        out
    }

    /// Total orbs on the board
    pub fn total_orbs(&self) -> u64 {
        self.cells.iter().map(|c| u64::from(c.count)).sum()
    }

    /// Orbs owned by `player`
    pub fn orbs_of(&self, player: PlayerId) -> u64 {
        self.cells
            .iter()
            .filter(|c| c.owner == Some(player))
            .map(|c| u64::from(c.count))
            .sum()
    }

    /// Player owns at least one non-empty cell
    pub fn is_alive(&self, player: PlayerId) -> bool {
        self.cells
            .iter()
            .any(|c| c.count > 0 && c.owner == Some(player))
    }

    /// No cell at or above its threshold
    pub fn is_stable(&self) -> bool {
        !self.cells.iter().any(Cell::is_critical)
    }

    /// Board holds orbs and every one of them belongs to `player`
    pub fn is_swept_by(&self, player: PlayerId) -> bool {
        self.total_orbs() > 0
            && self
                .cells
                .iter()
                .all(|c| c.count == 0 || c.owner == Some(player))
    }

    /// Shape and thresholds match a freshly created board of the same size.
    /// Used to reject malformed snapshots from peers.
    pub fn is_well_formed(&self) -> bool {
        self.rows > 0
            && self.cols > 0
            && self.rows.checked_mul(self.cols) == Some(self.cells.len())
            && self.iter().all(|((r, c), cell)| {
                cell.threshold == threshold_for(r, c, self.rows, self.cols)
                    && (cell.count > 0 || cell.owner.is_none())
            })
    }
}

impl fmt::Display for Board {
    /// Text grid: `.` for empty, otherwise `<count><player>`, e.g. `2b`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = &self.cells[self.index(row, col)];
                match cell.owner {
                    Some(p) if cell.count > 0 => {
                        let tag = (b'a' + p.get().saturating_sub(1)) as char;
                        write!(f, " {}{}", cell.count, tag)?;
                    }
                    _ => write!(f, "  .")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
