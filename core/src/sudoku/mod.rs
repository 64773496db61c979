use bitflags::bitflags;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{Coord, Coord2, GameError, MarkOutcome, Result, SessionClock, ToNdIndex};

mod puzzles;

pub use puzzles::Template;

const SIZE: Coord = 9;

/// Difficulty tier selecting one of the pre-authored templates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

bitflags! {
    /// Pencil notes for one cell, one bit per digit `1..=9`.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct NoteSet: u16 {
        const N1 = 1;
        const N2 = 1 << 1;
        const N3 = 1 << 2;
        const N4 = 1 << 3;
        const N5 = 1 << 4;
        const N6 = 1 << 5;
        const N7 = 1 << 6;
        const N8 = 1 << 7;
        const N9 = 1 << 8;
    }
}

impl NoteSet {
    fn digit_flag(digit: u8) -> Self {
        Self::from_bits_truncate(1 << (digit - 1))
    }

    pub fn contains_digit(self, digit: u8) -> bool {
        self.intersects(Self::digit_flag(digit))
    }

    pub fn toggle_digit(&mut self, digit: u8) {
        self.toggle(Self::digit_flag(digit));
    }

    pub fn digits(self) -> impl Iterator<Item = u8> {
        (1..=9).filter(move |&digit| self.contains_digit(digit))
    }
}

impl Default for NoteSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// One Sudoku cell as the player sees it.
///
/// `invalid` is a cached flag recomputed whenever the value is written; the
/// completion check is what decides whether the board is actually done.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SudokuCell {
    pub value: Option<u8>,
    pub fixed: bool,
    pub invalid: bool,
    pub notes: NoteSet,
}

/// Valid transitions: Ready -> InPlay -> Complete, re-entered via `new_game`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SudokuState {
    Ready,
    InPlay,
    Complete,
}

impl SudokuState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl Default for SudokuState {
    fn default() -> Self {
        Self::Ready
    }
}

/// Outcome of writing a digit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntryOutcome {
    NoChange,
    Placed,
    /// The digit duplicates another in its row, column, or box.
    Mismatch,
    /// The board is full and conflict-free. This is the celebratory signal;
    /// how long to display it is the presentation layer's concern.
    Completed,
}

impl EntryOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// Top-left corner of the 3×3 box containing `coords`.
pub const fn box_origin((row, col): Coord2) -> Coord2 {
    (row / 3 * 3, col / 3 * 3)
}

/// One Sudoku session over a fixed 9×9 template.
///
/// There is no loss state: mistakes are counted but never end the game,
/// and nothing guarantees a mis-played board remains solvable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SudokuGame {
    grid: Array2<SudokuCell>,
    state: SudokuState,
    difficulty: Option<Difficulty>,
    mistakes: u32,
    selected: Option<Coord2>,
    clock: SessionClock,
}

impl Default for SudokuGame {
    fn default() -> Self {
        Self {
            grid: Array2::default((SIZE, SIZE).to_nd_index()),
            state: SudokuState::default(),
            difficulty: None,
            mistakes: 0,
            selected: None,
            clock: SessionClock::new(),
        }
    }
}

impl SudokuGame {
    pub fn new(difficulty: Difficulty) -> Self {
        let mut game = Self::default();
        game.new_game(difficulty);
        game
    }

    /// Replaces the session wholesale: seeds the template for `difficulty`,
    /// zeroes the counters, and starts the clock.
    pub fn new_game(&mut self, difficulty: Difficulty) {
        self.grid = Array2::default((SIZE, SIZE).to_nd_index());
        for (row, digits) in puzzles::template(difficulty).iter().enumerate() {
            for (col, &digit) in digits.iter().enumerate() {
                if digit != 0 {
                    self.grid[(row, col)] = SudokuCell {
                        value: Some(digit),
                        fixed: true,
                        invalid: false,
                        notes: NoteSet::empty(),
                    };
                }
            }
        }
        self.state = SudokuState::InPlay;
        self.difficulty = Some(difficulty);
        self.mistakes = 0;
        self.selected = None;
        self.clock.reset();
        self.clock.start();
        log::debug!("seeded a {difficulty:?} puzzle");
    }

    pub fn state(&self) -> SudokuState {
        self.state
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }

    pub fn cell_at(&self, coords: Coord2) -> SudokuCell {
        self.grid[coords.to_nd_index()]
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    pub fn selected(&self) -> Option<Coord2> {
        self.selected
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.clock.elapsed_secs()
    }

    pub fn timer_active(&self) -> bool {
        self.clock.is_active()
    }

    /// One second of wall-clock time. Counted only while the puzzle is live.
    pub fn tick(&mut self) {
        self.clock.tick();
    }

    /// Writes a digit into a cell, clearing its notes. Fixed cells and
    /// boards outside live play (not yet seeded, or completed) are silent
    /// no-ops. A digit that duplicates another in its row, column, or box is
    /// still written, but the cell is marked invalid and the mistake counter
    /// goes up; mistakes never block play.
    pub fn set_value(&mut self, coords: Coord2, digit: u8) -> Result<EntryOutcome> {
        let coords = validate_coords(coords)?;
        let digit = validate_digit(digit)?;

        if !self.in_play() || self.grid[coords.to_nd_index()].fixed {
            return Ok(EntryOutcome::NoChange);
        }

        let conflict = self.placement_conflicts(coords, digit);
        let cell = &mut self.grid[coords.to_nd_index()];
        cell.value = Some(digit);
        cell.notes = NoteSet::empty();
        cell.invalid = conflict;

        if conflict {
            self.mistakes += 1;
            log::debug!(
                "digit {digit} conflicts at {coords:?}, mistakes: {}",
                self.mistakes
            );
            return Ok(EntryOutcome::Mismatch);
        }

        if self.is_complete() {
            self.state = SudokuState::Complete;
            self.clock.stop();
            log::debug!(
                "puzzle complete after {}s with {} mistakes",
                self.clock.elapsed_secs(),
                self.mistakes
            );
            return Ok(EntryOutcome::Completed);
        }

        Ok(EntryOutcome::Placed)
    }

    /// Adds or removes a pencil note. Writing a note clears any set value
    /// (notes and a value are mutually exclusive). Fixed cells and boards
    /// outside live play are silent no-ops.
    pub fn toggle_note(&mut self, coords: Coord2, digit: u8) -> Result<MarkOutcome> {
        let coords = validate_coords(coords)?;
        let digit = validate_digit(digit)?;

        if !self.in_play() || self.grid[coords.to_nd_index()].fixed {
            return Ok(MarkOutcome::NoChange);
        }

        let cell = &mut self.grid[coords.to_nd_index()];
        cell.value = None;
        cell.invalid = false;
        cell.notes.toggle_digit(digit);
        Ok(MarkOutcome::Changed)
    }

    /// Clears value, notes, and the invalid flag of a cell.
    pub fn clear_cell(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        let coords = validate_coords(coords)?;

        if !self.in_play() || self.grid[coords.to_nd_index()].fixed {
            return Ok(MarkOutcome::NoChange);
        }

        let cell = &mut self.grid[coords.to_nd_index()];
        if cell.value.is_none() && cell.notes.is_empty() && !cell.invalid {
            return Ok(MarkOutcome::NoChange);
        }
        *cell = SudokuCell::default();
        Ok(MarkOutcome::Changed)
    }

    /// Moves the selection. Fixed cells and boards outside live play are
    /// silent no-ops, matching the input surface this drives.
    pub fn select_cell(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        let coords = validate_coords(coords)?;

        if !self.in_play() || self.grid[coords.to_nd_index()].fixed {
            return Ok(MarkOutcome::NoChange);
        }

        if self.selected == Some(coords) {
            return Ok(MarkOutcome::NoChange);
        }
        self.selected = Some(coords);
        Ok(MarkOutcome::Changed)
    }

    /// Whether a cell shares the selected cell's row, column, or box.
    /// Derived on demand from the selection; never stored per cell.
    pub fn is_highlighted(&self, coords: Coord2) -> bool {
        let (row, col) = coords;
        if row >= SIZE || col >= SIZE {
            return false;
        }
        match self.selected {
            Some((sel_row, sel_col)) => {
                row == sel_row
                    || col == sel_col
                    || box_origin(coords) == box_origin((sel_row, sel_col))
            }
            None => false,
        }
    }

    /// Input is accepted only between `new_game` and completion.
    fn in_play(&self) -> bool {
        matches!(self.state, SudokuState::InPlay)
    }

    /// True when the digit would duplicate a value elsewhere in the same
    /// row, column, or box. The cell being written is excluded.
    fn placement_conflicts(&self, (row, col): Coord2, digit: u8) -> bool {
        let value = Some(digit);
        for i in 0..SIZE {
            if i != col && self.grid[(row, i).to_nd_index()].value == value {
                return true;
            }
            if i != row && self.grid[(i, col).to_nd_index()].value == value {
                return true;
            }
        }
        let (box_row, box_col) = box_origin((row, col));
        for r in box_row..box_row + 3 {
            for c in box_col..box_col + 3 {
                if (r, c) != (row, col) && self.grid[(r, c).to_nd_index()].value == value {
                    return true;
                }
            }
        }
        false
    }

    fn is_complete(&self) -> bool {
        self.grid
            .iter()
            .all(|cell| cell.value.is_some() && !cell.invalid)
    }
}

fn validate_coords(coords: Coord2) -> Result<Coord2> {
    if coords.0 < SIZE && coords.1 < SIZE {
        Ok(coords)
    } else {
        Err(GameError::InvalidCoords)
    }
}

fn validate_digit(digit: u8) -> Result<u8> {
    if (1..=9).contains(&digit) {
        Ok(digit)
    } else {
        Err(GameError::InvalidDigit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLVED_EASY: Template = [
        [5, 3, 4, 6, 7, 8, 9, 1, 2],
        [6, 7, 2, 1, 9, 5, 3, 4, 8],
        [1, 9, 8, 3, 4, 2, 5, 6, 7],
        [8, 5, 9, 7, 6, 1, 4, 2, 3],
        [4, 2, 6, 8, 5, 3, 7, 9, 1],
        [7, 1, 3, 9, 2, 4, 8, 5, 6],
        [9, 6, 1, 5, 3, 7, 2, 8, 4],
        [2, 8, 7, 4, 1, 9, 6, 3, 5],
        [3, 4, 5, 2, 8, 6, 1, 7, 9],
    ];

    #[test]
    fn new_game_seeds_fixed_cells_and_starts_clock() {
        let game = SudokuGame::new(Difficulty::Easy);

        assert_eq!(game.state(), SudokuState::InPlay);
        assert!(game.timer_active());
        assert_eq!(game.difficulty(), Some(Difficulty::Easy));

        let given = game.cell_at((0, 0));
        assert_eq!(given.value, Some(5));
        assert!(given.fixed);

        let blank = game.cell_at((0, 2));
        assert_eq!(blank.value, None);
        assert!(!blank.fixed);
    }

    #[test]
    fn unseeded_board_ignores_input_until_new_game() {
        let mut game = SudokuGame::default();
        assert_eq!(game.state(), SudokuState::Ready);

        assert_eq!(game.set_value((0, 0), 5).unwrap(), EntryOutcome::NoChange);
        assert_eq!(game.toggle_note((0, 0), 5).unwrap(), MarkOutcome::NoChange);
        assert_eq!(game.clear_cell((0, 0)).unwrap(), MarkOutcome::NoChange);
        assert_eq!(game.select_cell((0, 0)).unwrap(), MarkOutcome::NoChange);
        assert_eq!(game.cell_at((0, 0)), SudokuCell::default());
        assert_eq!(game.selected(), None);
        assert!(!game.timer_active());

        game.new_game(Difficulty::Easy);
        assert_eq!(game.set_value((0, 2), 4).unwrap(), EntryOutcome::Placed);
    }

    #[test]
    fn fixed_cells_are_immutable() {
        let mut game = SudokuGame::new(Difficulty::Easy);

        assert_eq!(game.set_value((0, 0), 9).unwrap(), EntryOutcome::NoChange);
        assert_eq!(game.toggle_note((0, 0), 1).unwrap(), MarkOutcome::NoChange);
        assert_eq!(game.clear_cell((0, 0)).unwrap(), MarkOutcome::NoChange);
        assert_eq!(game.cell_at((0, 0)).value, Some(5));
    }

    #[test]
    fn invalid_inputs_are_contract_errors() {
        let mut game = SudokuGame::new(Difficulty::Easy);

        assert_eq!(game.set_value((9, 0), 1), Err(GameError::InvalidCoords));
        assert_eq!(game.set_value((0, 2), 0), Err(GameError::InvalidDigit));
        assert_eq!(game.set_value((0, 2), 10), Err(GameError::InvalidDigit));
        assert_eq!(game.toggle_note((0, 2), 0), Err(GameError::InvalidDigit));
    }

    #[test]
    fn conflict_free_placement_is_accepted() {
        let mut game = SudokuGame::new(Difficulty::Easy);

        assert_eq!(game.set_value((0, 2), 4).unwrap(), EntryOutcome::Placed);
        let cell = game.cell_at((0, 2));
        assert_eq!(cell.value, Some(4));
        assert!(!cell.invalid);
        assert_eq!(game.mistakes(), 0);
    }

    #[test]
    fn row_duplicate_is_a_mismatch() {
        let mut game = SudokuGame::new(Difficulty::Easy);

        // (0, 0) already holds 5
        assert_eq!(game.set_value((0, 2), 5).unwrap(), EntryOutcome::Mismatch);
        assert!(game.cell_at((0, 2)).invalid);
        assert_eq!(game.mistakes(), 1);
    }

    #[test]
    fn column_duplicate_is_a_mismatch() {
        let mut game = SudokuGame::new(Difficulty::Easy);

        // (0, 0) holds 5; no 5 elsewhere in row 6 or its box
        assert_eq!(game.set_value((6, 0), 5).unwrap(), EntryOutcome::Mismatch);
    }

    #[test]
    fn box_duplicate_is_a_mismatch() {
        let mut game = SudokuGame::new(Difficulty::Easy);

        // (2, 2) holds 8; no 8 elsewhere in row 1 or column 1
        assert_eq!(game.set_value((1, 1), 8).unwrap(), EntryOutcome::Mismatch);
    }

    #[test]
    fn mistakes_never_block_further_play() {
        let mut game = SudokuGame::new(Difficulty::Easy);

        game.set_value((0, 2), 5).unwrap();
        game.set_value((0, 2), 3).unwrap();
        assert_eq!(game.mistakes(), 2);
        assert_eq!(game.set_value((0, 2), 4).unwrap(), EntryOutcome::Placed);
        assert!(!game.cell_at((0, 2)).invalid);
        assert_eq!(game.state(), SudokuState::InPlay);
    }

    #[test]
    fn notes_and_values_are_mutually_exclusive() {
        let mut game = SudokuGame::new(Difficulty::Easy);

        game.set_value((0, 2), 4).unwrap();
        game.toggle_note((0, 2), 7).unwrap();
        let cell = game.cell_at((0, 2));
        assert_eq!(cell.value, None);
        assert!(cell.notes.contains_digit(7));

        game.set_value((0, 2), 4).unwrap();
        let cell = game.cell_at((0, 2));
        assert_eq!(cell.value, Some(4));
        assert!(cell.notes.is_empty());
    }

    #[test]
    fn toggling_a_note_twice_removes_it() {
        let mut game = SudokuGame::new(Difficulty::Easy);

        game.toggle_note((0, 2), 7).unwrap();
        game.toggle_note((0, 2), 2).unwrap();
        game.toggle_note((0, 2), 7).unwrap();

        let notes = game.cell_at((0, 2)).notes;
        assert!(!notes.contains_digit(7));
        assert!(notes.contains_digit(2));
        assert_eq!(notes.digits().count(), 1);
    }

    #[test]
    fn clear_cell_resets_everything() {
        let mut game = SudokuGame::new(Difficulty::Easy);

        game.set_value((0, 2), 5).unwrap();
        assert!(game.cell_at((0, 2)).invalid);

        assert_eq!(game.clear_cell((0, 2)).unwrap(), MarkOutcome::Changed);
        assert_eq!(game.cell_at((0, 2)), SudokuCell::default());

        assert_eq!(game.clear_cell((0, 2)).unwrap(), MarkOutcome::NoChange);
    }

    #[test]
    fn selection_highlights_row_column_and_box() {
        let mut game = SudokuGame::new(Difficulty::Easy);

        assert_eq!(game.select_cell((4, 4)).unwrap(), MarkOutcome::Changed);
        assert_eq!(game.selected(), Some((4, 4)));

        assert!(game.is_highlighted((4, 0)));
        assert!(game.is_highlighted((0, 4)));
        assert!(game.is_highlighted((3, 3)));
        assert!(game.is_highlighted((4, 4)));
        assert!(!game.is_highlighted((0, 0)));
    }

    #[test]
    fn selecting_a_fixed_cell_is_a_no_op() {
        let mut game = SudokuGame::new(Difficulty::Easy);

        assert_eq!(game.select_cell((0, 0)).unwrap(), MarkOutcome::NoChange);
        assert_eq!(game.selected(), None);
    }

    #[test]
    fn full_valid_solution_completes_the_puzzle() {
        let mut game = SudokuGame::new(Difficulty::Easy);
        let mut last = EntryOutcome::NoChange;

        for row in 0..SIZE {
            for col in 0..SIZE {
                if game.cell_at((row, col)).fixed {
                    continue;
                }
                let digit = SOLVED_EASY[row as usize][col as usize];
                last = game.set_value((row, col), digit).unwrap();
                assert_ne!(last, EntryOutcome::Mismatch);
            }
        }

        assert_eq!(last, EntryOutcome::Completed);
        assert_eq!(game.state(), SudokuState::Complete);
        assert_eq!(game.mistakes(), 0);
        assert!(!game.timer_active());

        assert_eq!(game.set_value((0, 2), 1).unwrap(), EntryOutcome::NoChange);
    }

    #[test]
    fn clock_stops_at_completion_even_with_later_ticks() {
        let mut game = SudokuGame::new(Difficulty::Easy);
        game.tick();
        game.tick();

        for row in 0..SIZE {
            for col in 0..SIZE {
                if !game.cell_at((row, col)).fixed {
                    game.set_value((row, col), SOLVED_EASY[row as usize][col as usize])
                        .unwrap();
                }
            }
        }

        assert_eq!(game.elapsed_secs(), 2);
        game.tick();
        assert_eq!(game.elapsed_secs(), 2);
    }

    #[test]
    fn identical_sessions_are_equal_but_independent() {
        let mut first = SudokuGame::new(Difficulty::Medium);
        let second = SudokuGame::new(Difficulty::Medium);
        assert_eq!(first, second);

        first.set_value((0, 0), 1).unwrap();
        assert_ne!(first, second);
        assert_eq!(second.cell_at((0, 0)).value, None);
    }

    #[test]
    fn session_snapshot_round_trips_through_serde() {
        let mut game = SudokuGame::new(Difficulty::Hard);
        game.set_value((0, 1), 1).unwrap();
        game.toggle_note((0, 2), 4).unwrap();
        game.select_cell((5, 5)).unwrap();
        game.tick();

        let encoded = serde_json::to_string(&game).unwrap();
        let decoded: SudokuGame = serde_json::from_str(&encoded).unwrap();
        assert_eq!(game, decoded);
    }
}
