use alloc::collections::{BTreeSet, VecDeque};
use core::ops::Index;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{CellCount, Coord, Coord2, GameError, MarkOutcome, Result, SessionClock, mult};
use crate::{NeighborIterExt, ToNdIndex};

pub use generator::*;

mod generator;

/// Board configuration: square side length and mine count.
///
/// The ranges mirror the session controls: `size` in `[5, 20]` and `mines`
/// in `[1, floor(size² · 0.35)]`. The mine count is additionally bounded by
/// `size² − 9` so the safe-opening exclusion zone always leaves room for
/// every mine, which keeps placement terminating.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinesweeperConfig {
    size: Coord,
    mines: CellCount,
}

impl MinesweeperConfig {
    pub const MIN_SIZE: Coord = 5;
    pub const MAX_SIZE: Coord = 20;

    pub fn new(size: Coord, mines: CellCount) -> Result<Self> {
        if !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&size) {
            return Err(GameError::InvalidSize);
        }
        let total = mult(size, size);
        let slider_cap = total * 35 / 100;
        let placeable = total - 9;
        if mines == 0 || mines > slider_cap.min(placeable) {
            return Err(GameError::TooManyMines);
        }
        Ok(Self { size, mines })
    }

    pub(crate) const fn new_unchecked(size: Coord, mines: CellCount) -> Self {
        Self { size, mines }
    }

    pub const fn size(&self) -> Coord {
        self.size
    }

    pub const fn mines(&self) -> CellCount {
        self.mines
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.size, self.size)
    }

    pub const fn bounds(&self) -> Coord2 {
        (self.size, self.size)
    }
}

/// Mine placement plus per-cell adjacency counts.
///
/// Both are computed once when the layout is built and frozen for the life
/// of one game instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MineLayout {
    mine_mask: Array2<bool>,
    adjacency: Array2<u8>,
    mine_count: CellCount,
}

impl MineLayout {
    pub fn from_mine_mask(mine_mask: Array2<bool>) -> Self {
        let mine_count = mine_mask.iter().filter(|&&is_mine| is_mine).count() as CellCount;
        let adjacency = Array2::from_shape_fn(mine_mask.raw_dim(), |(row, col)| {
            mine_mask
                .iter_neighbors((row as Coord, col as Coord))
                .filter(|&pos| mine_mask[pos.to_nd_index()])
                .count() as u8
        });
        Self {
            mine_mask,
            adjacency,
            mine_count,
        }
    }

    pub fn from_mine_coords(size: Coord, mine_coords: &[Coord2]) -> Result<Self> {
        let mut mine_mask: Array2<bool> = Array2::default((size, size).to_nd_index());

        for &coords in mine_coords {
            if coords.0 >= size || coords.1 >= size {
                return Err(GameError::InvalidCoords);
            }
            mine_mask[coords.to_nd_index()] = true;
        }

        Ok(Self::from_mine_mask(mine_mask))
    }

    pub fn size(&self) -> Coord {
        self.mine_mask.dim().0.try_into().unwrap_or(Coord::MAX)
    }

    pub fn total_cells(&self) -> CellCount {
        self.mine_mask.len() as CellCount
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn safe_cell_count(&self) -> CellCount {
        self.total_cells() - self.mine_count
    }

    pub fn contains_mine(&self, coords: Coord2) -> bool {
        self[coords]
    }

    /// Adjacent-mine count frozen at placement time.
    pub fn adjacent_mines(&self, coords: Coord2) -> u8 {
        self.adjacency[coords.to_nd_index()]
    }
}

impl Index<Coord2> for MineLayout {
    type Output = bool;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.mine_mask[coords.to_nd_index()]
    }
}

/// Player-visible state of one Minesweeper cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MineCell {
    Hidden,
    Revealed(u8),
    Flagged,
    /// Mine shown after a loss.
    Mine,
    /// The mine that ended the game.
    Exploded,
}

impl MineCell {
    pub const fn is_revealed(self) -> bool {
        matches!(self, Self::Revealed(_) | Self::Mine | Self::Exploded)
    }

    pub const fn is_flagged(self) -> bool {
        matches!(self, Self::Flagged)
    }
}

impl Default for MineCell {
    fn default() -> Self {
        Self::Hidden
    }
}

/// Valid transitions:
/// - AwaitingFirstReveal -> InPlay (first reveal, mines placed)
/// - InPlay -> Won
/// - InPlay -> Lost
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MinesweeperState {
    AwaitingFirstReveal,
    InPlay,
    Won,
    Lost,
}

impl MinesweeperState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl Default for MinesweeperState {
    fn default() -> Self {
        Self::AwaitingFirstReveal
    }
}

/// Outcome of revealing a cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    NoChange,
    Revealed,
    Exploded,
    Won,
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// One Minesweeper session from creation to win or loss.
///
/// The mine layout is generated lazily on the first reveal so the opening
/// click and its whole 8-neighborhood are guaranteed mine-free.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinesweeperGame {
    config: MinesweeperConfig,
    layout: Option<MineLayout>,
    board: Array2<MineCell>,
    revealed_count: CellCount,
    flagged_count: CellCount,
    state: MinesweeperState,
    seed: u64,
    clock: SessionClock,
}

impl MinesweeperGame {
    /// Starts a fresh session. The configuration has already been range
    /// checked by [`MinesweeperConfig::new`], so this cannot fail and the
    /// caller's previous session stays valid until a valid one exists.
    pub fn new(config: MinesweeperConfig, seed: u64) -> Self {
        Self {
            config,
            layout: None,
            board: Array2::default(config.bounds().to_nd_index()),
            revealed_count: 0,
            flagged_count: 0,
            state: MinesweeperState::default(),
            seed,
            clock: SessionClock::new(),
        }
    }

    /// Starts a session over a fixed, pre-built layout. Used by tests and
    /// replay tooling; regular play goes through [`MinesweeperGame::new`].
    pub fn from_layout(layout: MineLayout) -> Self {
        let config = MinesweeperConfig::new_unchecked(layout.size(), layout.mine_count());
        Self {
            config,
            board: Array2::default(config.bounds().to_nd_index()),
            layout: Some(layout),
            revealed_count: 0,
            flagged_count: 0,
            state: MinesweeperState::default(),
            seed: 0,
            clock: SessionClock::new(),
        }
    }

    pub fn config(&self) -> MinesweeperConfig {
        self.config
    }

    pub fn state(&self) -> MinesweeperState {
        self.state
    }

    pub fn cell_at(&self, coords: Coord2) -> MineCell {
        self.board[coords.to_nd_index()]
    }

    pub fn layout(&self) -> Option<&MineLayout> {
        self.layout.as_ref()
    }

    pub fn has_mine_at(&self, coords: Coord2) -> bool {
        self.layout
            .as_ref()
            .is_some_and(|layout| layout.contains_mine(coords))
    }

    pub fn flags_used(&self) -> CellCount {
        self.flagged_count
    }

    pub fn mines_left(&self) -> i32 {
        i32::from(self.config.mines) - i32::from(self.flagged_count)
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.clock.elapsed_secs()
    }

    pub fn timer_active(&self) -> bool {
        self.clock.is_active()
    }

    /// One second of wall-clock time. Counted only while the game is live.
    pub fn tick(&mut self) {
        self.clock.tick();
    }

    /// Reveals a cell, cascading through zero-count regions.
    ///
    /// The first reveal of a session fixes the mine layout (excluding the
    /// clicked cell and its neighbors) and starts the clock, even when the
    /// clicked cell turns out to be flagged and nothing opens. Revealing a
    /// flagged or already-revealed cell, or acting on a finished game, is a
    /// silent no-op.
    pub fn reveal(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        let coords = self.validate_coords(coords)?;

        if self.state.is_terminal() {
            return Ok(RevealOutcome::NoChange);
        }

        if matches!(self.state, MinesweeperState::AwaitingFirstReveal) {
            if self.layout.is_none() {
                let generator = RandomMineLayoutGenerator::new(self.seed, coords);
                self.layout = Some(generator.generate(self.config));
                log::debug!(
                    "placed {mines} mines on a {size}x{size} board, opening at {coords:?}",
                    mines = self.config.mines,
                    size = self.config.size,
                );
            }
            self.clock.start();
            self.state = MinesweeperState::InPlay;
        }

        if matches!(self.board[coords.to_nd_index()], MineCell::Hidden) {
            Ok(self.reveal_cell(coords))
        } else {
            Ok(RevealOutcome::NoChange)
        }
    }

    /// Flags or unflags a hidden cell. Flag placement is capped at the mine
    /// count (over-cap attempts are silent no-ops); unflagging always
    /// succeeds. Revealed cells and finished games are no-ops.
    pub fn toggle_flag(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        use MarkOutcome::*;

        let coords = self.validate_coords(coords)?;

        if self.state.is_terminal() {
            return Ok(NoChange);
        }

        Ok(match self.board[coords.to_nd_index()] {
            MineCell::Hidden => {
                if self.flagged_count >= self.config.mines {
                    NoChange
                } else {
                    self.board[coords.to_nd_index()] = MineCell::Flagged;
                    self.flagged_count += 1;
                    Changed
                }
            }
            MineCell::Flagged => {
                self.board[coords.to_nd_index()] = MineCell::Hidden;
                self.flagged_count -= 1;
                Changed
            }
            _ => NoChange,
        })
    }

    fn reveal_cell(&mut self, coords: Coord2) -> RevealOutcome {
        if self.has_mine_at(coords) {
            self.board[coords.to_nd_index()] = MineCell::Exploded;
            self.finish(false);
            return RevealOutcome::Exploded;
        }

        let count = self.adjacent_mines(coords);
        self.board[coords.to_nd_index()] = MineCell::Revealed(count);
        self.revealed_count += 1;

        if count == 0 {
            self.flood_fill(coords);
        }

        if self.revealed_count == self.safe_cell_count() {
            self.finish(true);
            RevealOutcome::Won
        } else {
            RevealOutcome::Revealed
        }
    }

    /// Worklist traversal over the zero-count-connected region and its
    /// immediate border. Flagged cells stop the cascade.
    fn flood_fill(&mut self, origin: Coord2) {
        let mut visited = BTreeSet::from([origin]);
        let mut to_visit: VecDeque<_> = self
            .board
            .iter_neighbors(origin)
            .filter(|&pos| matches!(self.board[pos.to_nd_index()], MineCell::Hidden))
            .collect();

        while let Some(visit_coords) = to_visit.pop_front() {
            if !visited.insert(visit_coords) {
                continue;
            }

            if !matches!(self.board[visit_coords.to_nd_index()], MineCell::Hidden) {
                continue;
            }

            let visit_count = self.adjacent_mines(visit_coords);
            self.board[visit_coords.to_nd_index()] = MineCell::Revealed(visit_count);
            self.revealed_count += 1;
            log::trace!("flood fill opened {visit_coords:?}, adjacent mines: {visit_count}");

            if visit_count == 0 {
                to_visit.extend(
                    self.board
                        .iter_neighbors(visit_coords)
                        .filter(|&pos| matches!(self.board[pos.to_nd_index()], MineCell::Hidden))
                        .filter(|pos| !visited.contains(pos)),
                );
            }
        }
    }

    fn finish(&mut self, won: bool) {
        if self.state.is_terminal() {
            return;
        }

        self.state = if won {
            MinesweeperState::Won
        } else {
            MinesweeperState::Lost
        };
        self.clock.stop();
        self.expose_mines(won);
        log::debug!("game over after {}s, won: {won}", self.clock.elapsed_secs());
    }

    /// Flags every mine on a win, shows every mine on a loss.
    fn expose_mines(&mut self, won: bool) {
        for row in 0..self.config.size {
            for col in 0..self.config.size {
                let coords = (row, col);
                if !self.has_mine_at(coords) {
                    continue;
                }
                match self.board[coords.to_nd_index()] {
                    MineCell::Hidden => {
                        self.board[coords.to_nd_index()] =
                            if won { MineCell::Flagged } else { MineCell::Mine };
                    }
                    MineCell::Flagged if !won => {
                        self.board[coords.to_nd_index()] = MineCell::Mine;
                        self.flagged_count -= 1;
                    }
                    _ => {}
                }
            }
        }
        if won {
            self.flagged_count = self.config.mines;
        }
    }

    fn adjacent_mines(&self, coords: Coord2) -> u8 {
        self.layout
            .as_ref()
            .map_or(0, |layout| layout.adjacent_mines(coords))
    }

    fn safe_cell_count(&self) -> CellCount {
        self.config.total_cells() - self.config.mines
    }

    fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        if coords.0 < self.config.size && coords.1 < self.config.size {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords)
        }
    }
}
