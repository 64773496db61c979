use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{CellCount, Coord, Coord2, GameError, Result, SessionClock, ToNdIndex, mult};

/// Player marks. `X` always opens a round.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub const fn opponent(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

/// Win/draw tallies. Accumulates across rounds for the life of the session;
/// there is no reset-scores action.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub x: u32,
    pub o: u32,
    pub draws: u32,
}

/// Valid transitions: InPlay -> Won / Draw, re-entered via `new_game`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundState {
    InPlay,
    Won(Mark),
    Draw,
}

impl RoundState {
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InPlay)
    }
}

/// Outcome of placing a mark.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlaceOutcome {
    NoChange,
    Placed,
    Won(Mark),
    Draw,
}

impl PlaceOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// An N×N Tic-Tac-Toe session, `3 ≤ n ≤ 5`.
///
/// A round's board size is locked once the first mark is placed; a new size
/// is accepted again after the round ends or on an untouched board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicTacToeGame {
    size: Coord,
    board: Array2<Option<Mark>>,
    current: Mark,
    state: RoundState,
    scores: Scoreboard,
    moves: CellCount,
    clock: SessionClock,
}

impl TicTacToeGame {
    pub const MIN_SIZE: Coord = 3;
    pub const MAX_SIZE: Coord = 5;

    pub fn new(size: Coord) -> Result<Self> {
        validate_size(size)?;
        let mut clock = SessionClock::new();
        clock.start();
        Ok(Self {
            size,
            board: Array2::default((size, size).to_nd_index()),
            current: Mark::X,
            state: RoundState::InPlay,
            scores: Scoreboard::default(),
            moves: 0,
            clock,
        })
    }

    /// Starts a fresh round, keeping the scoreboard. Changing the board
    /// size is rejected with [`GameError::SizeLocked`] while a round with
    /// at least one mark is still in progress.
    pub fn new_game(&mut self, size: Coord) -> Result<()> {
        validate_size(size)?;
        if size != self.size && self.moves > 0 && !self.state.is_terminal() {
            return Err(GameError::SizeLocked);
        }

        self.size = size;
        self.board = Array2::default((size, size).to_nd_index());
        self.current = Mark::X;
        self.state = RoundState::InPlay;
        self.moves = 0;
        self.clock.reset();
        self.clock.start();
        log::debug!("new {size}x{size} round, scores: {:?}", self.scores);
        Ok(())
    }

    pub fn size(&self) -> Coord {
        self.size
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn scores(&self) -> Scoreboard {
        self.scores
    }

    pub fn current_player(&self) -> Mark {
        self.current
    }

    pub fn mark_at(&self, coords: Coord2) -> Option<Mark> {
        self.board[coords.to_nd_index()]
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.clock.elapsed_secs()
    }

    pub fn timer_active(&self) -> bool {
        self.clock.is_active()
    }

    /// One second of wall-clock time. Counted only while the round is live.
    pub fn tick(&mut self) {
        self.clock.tick();
    }

    /// Places the current player's mark. Occupied cells and finished rounds
    /// are silent no-ops. A win or a draw stops the clock and bumps the
    /// matching score counter; otherwise the turn passes to the opponent.
    pub fn place(&mut self, coords: Coord2) -> Result<PlaceOutcome> {
        let coords = self.validate_coords(coords)?;

        if self.state.is_terminal() || self.board[coords.to_nd_index()].is_some() {
            return Ok(PlaceOutcome::NoChange);
        }

        let mark = self.current;
        self.board[coords.to_nd_index()] = Some(mark);
        self.moves += 1;

        if self.is_winning_move(coords, mark) {
            self.state = RoundState::Won(mark);
            match mark {
                Mark::X => self.scores.x += 1,
                Mark::O => self.scores.o += 1,
            }
            self.clock.stop();
            log::debug!("{mark:?} wins after {} moves", self.moves);
            return Ok(PlaceOutcome::Won(mark));
        }

        if self.moves == mult(self.size, self.size) {
            self.state = RoundState::Draw;
            self.scores.draws += 1;
            self.clock.stop();
            log::debug!("round drawn");
            return Ok(PlaceOutcome::Draw);
        }

        self.current = mark.opponent();
        Ok(PlaceOutcome::Placed)
    }

    /// A move wins when its row, its column, or a full diagonal through it
    /// holds the same mark along the entire length of the board.
    fn is_winning_move(&self, (row, col): Coord2, mark: Mark) -> bool {
        let n = self.size;
        let holds = |coords: Coord2| self.board[coords.to_nd_index()] == Some(mark);

        (0..n).all(|i| holds((row, i)))
            || (0..n).all(|i| holds((i, col)))
            || (row == col && (0..n).all(|i| holds((i, i))))
            || (row + col == n - 1 && (0..n).all(|i| holds((i, n - 1 - i))))
    }

    fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        if coords.0 < self.size && coords.1 < self.size {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords)
        }
    }
}

fn validate_size(size: Coord) -> Result<()> {
    if (TicTacToeGame::MIN_SIZE..=TicTacToeGame::MAX_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(GameError::InvalidSize)
    }
}
