//! Sudoku board, literal codec and grid text formats

pub mod board;
pub mod literal;
pub mod io;

pub use board::{Board, Clue, LineKind};
pub use literal::{decode_model, CompressedMapping};
pub use io::{format_grid, load_board_from_file, parse_board, to_compact_string};
