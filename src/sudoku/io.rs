//! Text formats for sudoku grids
//!
//! Two input forms are accepted:
//! - a single line with one character per cell (`0` or `.` for an empty
//!   cell, `1`-`9` then `a`-`z` for values 1-35)
//! - a multi-line grid of whitespace-separated numbers, one row per line

use super::{Board, Clue};
use super::board::block_size_for;
use crate::error::{ConfigError, Result};
use anyhow::Context;
use std::path::Path;

/// Parse a board from either the compact or the multi-line form.
pub fn parse_board(input: &str) -> Result<Board> {
    let input = input.trim();
    if input.contains('\n') {
        let cells = parse_grid(input)?;
        Board::from_grid(&cells)
    } else {
        let (side, clues) = parse_compact(input)?;
        Board::from_clues(block_size_for(side)?, &clues)
    }
}

/// Parse a one-line puzzle into its side length and clues.
///
/// Values larger than the side are returned as-is; callers skip them.
pub fn parse_compact(input: &str) -> Result<(usize, Vec<Clue>)> {
    let input = input.trim();
    let count = input.chars().count();
    let side = (count as f64).sqrt().round() as usize;
    if side == 0 || side * side != count {
        return Err(ConfigError::NotSquare { cells: count }.into());
    }

    let mut clues = Vec::new();
    for (i, ch) in input.chars().enumerate() {
        let value = match ch {
            '.' | '0' => continue,
            c => c.to_digit(36).ok_or_else(|| {
                ConfigError::MalformedClue(format!("invalid character '{}' at position {}", c, i))
            })?,
        };
        clues.push(Clue::new(i / side, i % side, value as usize));
    }
    Ok((side, clues))
}

/// Parse a whitespace-separated grid. `.` is read as an empty cell.
pub fn parse_grid(input: &str) -> Result<Vec<Vec<usize>>> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(row, line)| {
            line.split_whitespace()
                .map(|token| parse_cell(token, row))
                .collect::<Result<Vec<usize>>>()
        })
        .collect()
}

fn parse_cell(token: &str, row: usize) -> Result<usize> {
    if token == "." {
        return Ok(0);
    }
    token.parse::<usize>().map_err(|_| {
        ConfigError::MalformedClue(format!("invalid value '{}' in row {}", token, row)).into()
    })
}

/// Load a board from a text file in either form.
pub fn load_board_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Board> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read puzzle file: {}", path.as_ref().display()))?;

    parse_board(&content)
        .with_context(|| format!("Failed to parse puzzle from file: {}", path.as_ref().display()))
}

/// Render the board as rows of right-aligned, space-separated values.
pub fn format_grid(board: &Board) -> String {
    let n = board.side();
    let width = n.to_string().len();
    let mut result = String::with_capacity(n * n * (width + 1));
    for row in 0..n {
        let line: Vec<String> = (0..n)
            .map(|col| format!("{:>width$}", board.value(row, col).unwrap_or(0), width = width))
            .collect();
        result.push_str(&line.join(" "));
        result.push('\n');
    }
    result
}

/// Render the board on a single line, one base-36 digit per cell.
///
/// Grids wider than 35 have values with no single-digit form and fall back
/// to [`format_grid`].
pub fn to_compact_string(board: &Board) -> String {
    if board.side() > 35 {
        return format_grid(board);
    }
    board
        .lookup()
        .iter()
        .map(|&v| std::char::from_digit(v as u32, 36).unwrap_or('?'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "
        0 0 3 0 2 0 6 0 0
        9 0 0 3 0 5 0 0 1
        0 0 1 8 0 6 4 0 0
        0 0 8 1 0 2 9 0 0
        7 0 0 0 0 0 0 0 8
        0 0 6 7 0 8 2 0 0
        0 0 2 6 0 9 5 0 0
        8 0 0 2 0 3 0 0 9
        0 0 5 0 1 0 3 0 0";

    #[test]
    fn test_parse_multi_line() {
        let board = parse_board(EXAMPLE).unwrap();
        assert_eq!(board.size(), 3);
        assert_eq!(board.value(0, 2), Some(3));
        assert_eq!(board.value(8, 6), Some(3));
        assert_eq!(board.value(0, 0), None);
    }

    #[test]
    fn test_parse_single_row() {
        let input = "........8..3...4...9..2..6.....79.......612...6.5.2.7...8...5...1.....2.4.5.....3";
        let board = parse_board(input).unwrap();
        assert_eq!(board.size(), 3);
        assert_eq!(board.value(8, 8), Some(3));
        assert_eq!(board.value(0, 8), Some(8));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_compact("12345"),
            Err(crate::Error::Config(ConfigError::NotSquare { cells: 5 }))
        ));
        assert!(matches!(
            parse_compact("1..4..1..1..4..#"),
            Err(crate::Error::Config(ConfigError::MalformedClue(_)))
        ));
        // 3x3 grid: 9 is square but 3 is not
        assert!(parse_board("1 0 0\n0 0 0\n0 0 0").is_err());
        assert!(parse_board("1 0 0 0\n0 0 0\n0 0 0 0\n0 0 0 0").is_err());
    }

    #[test]
    fn test_out_of_range_values_ignored() {
        let board = parse_board("5..4..1..1..4..1").unwrap();
        assert_eq!(board.value(0, 0), None);
        assert_eq!(board.value(0, 3), Some(4));
    }

    #[test]
    fn test_format_round_trip() {
        let compact = "1..4..1..1..4..1";
        let board = parse_board(compact).unwrap();
        assert_eq!(to_compact_string(&board), compact.replace('.', "0"));
        assert_eq!(format_grid(&board).lines().next(), Some("1 0 0 4"));
    }

    #[test]
    fn test_load_board_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("puzzle.txt");
        std::fs::write(&path, EXAMPLE).unwrap();
        let board = load_board_from_file(&path).unwrap();
        assert_eq!(board.assigned_count(), 32);

        assert!(load_board_from_file(dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn test_compact_string_falls_back_for_wide_grids() {
        let mut board = Board::new(6).unwrap();
        board.set_value(0, 0, 36).unwrap();
        board.set_value(0, 1, 7).unwrap();

        let text = to_compact_string(&board);
        assert!(!text.contains('?'));
        assert_eq!(text.lines().count(), 36);
        let first: Vec<&str> = text.lines().next().unwrap().split_whitespace().collect();
        assert_eq!(&first[..3], &["36", "7", "0"]);
        assert_eq!(parse_board(&text).unwrap(), board);
    }
}
