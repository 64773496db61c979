#![no_std]

extern crate alloc;

pub use clock::*;
pub use error::*;
pub use minesweeper::*;
pub use sudoku::*;
pub use tictactoe::*;
pub use types::*;

mod clock;
mod error;
mod minesweeper;
mod sudoku;
mod tictactoe;
mod types;

/// Outcome of an action that marks or unmarks a cell without opening it
/// (flags, pencil notes, cell clears, selection).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MarkOutcome {
    NoChange,
    Changed,
}

impl MarkOutcome {
    pub const fn has_update(self) -> bool {
        match self {
            Self::NoChange => false,
            Self::Changed => true,
        }
    }
}
