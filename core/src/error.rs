use thiserror::Error;

/// Contract and configuration violations.
///
/// Game-rule outcomes (hitting a mine, an invalid Sudoku digit, a draw) are
/// never errors; they are reported through the outcome enums. Errors are
/// reserved for calls that break the engine contract: addressing a cell
/// outside the board, or configuring a session with values the UI never
/// offers.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("coordinates outside the board")]
    InvalidCoords,
    #[error("board size outside the allowed range")]
    InvalidSize,
    #[error("mine count outside the allowed range")]
    TooManyMines,
    #[error("digit outside 1..=9")]
    InvalidDigit,
    #[error("board size is locked while a round is in progress")]
    SizeLocked,
}

pub type Result<T> = core::result::Result<T, GameError>;
