//! Sudoku SAT Solver
//!
//! This library compiles generalized N×N sudoku puzzles into CNF and solves
//! them with a SAT solver.

pub mod config;
pub mod error;
pub mod sat;
pub mod sudoku;
pub mod utils;

pub use config::Settings;
pub use error::{Error, Result};
pub use sat::{PuzzleOutcome, SolveReport, SudokuEncoder};
pub use sudoku::Board;

/// Parse a puzzle and solve it with the given settings.
pub fn solve_puzzle(input: &str, settings: Settings) -> Result<SolveReport> {
    let board = sudoku::parse_board(input)?;
    SudokuEncoder::new(settings)?.solve(board)
}
