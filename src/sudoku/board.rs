//! Candidate-tracking board for generalized N×N sudoku
//!
//! The board keeps one candidate bit per `(row, col, value)` literal plus
//! per-line counters of how many cells still admit each value. Every
//! mutation goes through [`Board::set_value`], which clears all conflicting
//! candidates and keeps the counters in step with the bits.

use crate::error::{ConfigError, InternalInvariantError, Result};
use crate::sudoku::io;
use serde::{Deserialize, Serialize};

/// A given value at a 0-based position. Values are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clue {
    pub row: usize,
    pub col: usize,
    pub value: usize,
}

impl Clue {
    pub fn new(row: usize, col: usize, value: usize) -> Self {
        Self { row, col, value }
    }
}

/// The three kinds of lines (houses) every value must appear in exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    Row,
    Column,
    Block,
}

impl LineKind {
    pub const ALL: [LineKind; 3] = [LineKind::Row, LineKind::Column, LineKind::Block];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// Block dimension B; the grid is B² × B².
    size: usize,
    /// Assigned value per cell, 0 when unassigned.
    lookup: Vec<usize>,
    /// One bit per raw literal, 1-indexed (slot 0 unused).
    candidates: Vec<bool>,
    row_count: Vec<usize>,
    col_count: Vec<usize>,
    block_count: Vec<usize>,
    num_candidates: usize,
}

impl Board {
    /// Create an empty board with block size `size` (side `size²`).
    pub fn new(size: usize) -> std::result::Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::EmptyBoard);
        }
        let n = size * size;
        Ok(Self {
            size,
            lookup: vec![0; n * n],
            candidates: Self::fresh_candidates(n),
            row_count: vec![n; n * n],
            col_count: vec![n; n * n],
            block_count: vec![n; n * n],
            num_candidates: n * n * n,
        })
    }

    /// Create an empty board from its side length, which must be a perfect square.
    pub fn with_side(side: usize) -> std::result::Result<Self, ConfigError> {
        Self::new(block_size_for(side)?)
    }

    /// Create a board and apply every clue through [`Board::set_value`].
    ///
    /// Clues with a value outside `1..=N` are not clues and are skipped.
    pub fn from_clues(size: usize, clues: &[Clue]) -> Result<Self> {
        let mut board = Self::new(size)?;
        let n = board.side();
        for clue in clues {
            if clue.row >= n || clue.col >= n {
                return Err(ConfigError::ClueOutOfGrid {
                    row: clue.row,
                    col: clue.col,
                    size: n,
                }
                .into());
            }
            if clue.value < 1 || clue.value > n {
                continue;
            }
            board.set_value(clue.row, clue.col, clue.value)?;
        }
        Ok(board)
    }

    /// Create a board from a square grid of values (0 = empty).
    pub fn from_grid(cells: &[Vec<usize>]) -> Result<Self> {
        let side = cells.len();
        let size = block_size_for(side)?;
        let mut clues = Vec::new();
        for (row, values) in cells.iter().enumerate() {
            if values.len() != side {
                return Err(ConfigError::MalformedClue(format!(
                    "row {} has {} cells, expected {}",
                    row,
                    values.len(),
                    side
                ))
                .into());
            }
            for (col, &value) in values.iter().enumerate() {
                clues.push(Clue::new(row, col, value));
            }
        }
        Self::from_clues(size, &clues)
    }

    /// Block dimension B.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Grid dimension N = B².
    pub fn side(&self) -> usize {
        self.size * self.size
    }

    pub fn cell_count(&self) -> usize {
        self.side() * self.side()
    }

    /// Number of raw literals, N³.
    pub fn literal_count(&self) -> usize {
        self.cell_count() * self.side()
    }

    #[inline]
    pub fn idx(&self, row: usize, col: usize) -> usize {
        row * self.side() + col
    }

    #[inline]
    pub fn block_index(&self, row: usize, col: usize) -> usize {
        (row / self.size) * self.size + col / self.size
    }

    /// Assigned value of a cell, if any.
    pub fn value(&self, row: usize, col: usize) -> Option<usize> {
        match self.lookup[self.idx(row, col)] {
            0 => None,
            v => Some(v),
        }
    }

    pub fn lookup(&self) -> &[usize] {
        &self.lookup
    }

    pub fn num_candidates(&self) -> usize {
        self.num_candidates
    }

    pub fn is_candidate(&self, row: usize, col: usize, value: usize) -> bool {
        self.candidates[self.lit_index(row, col, value)]
    }

    /// Candidate bit for a positive raw literal.
    pub fn is_candidate_lit(&self, lit: i32) -> bool {
        lit > 0 && (lit as usize) < self.candidates.len() && self.candidates[lit as usize]
    }

    /// Number of cells in `line` of `kind` that still admit `value`.
    pub fn line_count(&self, kind: LineKind, line: usize, value: usize) -> usize {
        let slot = line * self.side() + value - 1;
        match kind {
            LineKind::Row => self.row_count[slot],
            LineKind::Column => self.col_count[slot],
            LineKind::Block => self.block_count[slot],
        }
    }

    /// Cells of a row, column or block in reading order.
    pub fn line_cells(&self, kind: LineKind, line: usize) -> Vec<(usize, usize)> {
        let n = self.side();
        match kind {
            LineKind::Row => (0..n).map(|col| (line, col)).collect(),
            LineKind::Column => (0..n).map(|row| (row, line)).collect(),
            LineKind::Block => {
                let row_start = (line / self.size) * self.size;
                let col_start = (line % self.size) * self.size;
                (row_start..row_start + self.size)
                    .flat_map(|row| (col_start..col_start + self.size).map(move |col| (row, col)))
                    .collect()
            }
        }
    }

    /// Every cell sharing a row, column or block with `(row, col)`, excluding
    /// the cell itself. Cells in both the block and a row/column appear twice.
    pub fn peers(&self, row: usize, col: usize) -> Vec<(usize, usize)> {
        let block = self.block_index(row, col);
        self.line_cells(LineKind::Row, row)
            .into_iter()
            .chain(self.line_cells(LineKind::Column, col))
            .chain(self.line_cells(LineKind::Block, block))
            .filter(|&cell| cell != (row, col))
            .collect()
    }

    /// Assign `value` to a cell and eliminate every conflicting candidate.
    ///
    /// All candidate bits of the cell itself are cleared, including the
    /// assigned value, so a settled cell contributes nothing to the
    /// candidate space. Re-assigning the same value is a no-op.
    pub fn set_value(
        &mut self,
        row: usize,
        col: usize,
        value: usize,
    ) -> std::result::Result<(), InternalInvariantError> {
        let n = self.side();
        if row >= n || col >= n || value == 0 || value > n {
            return Err(InternalInvariantError::OutOfRange { row, col, value, side: n });
        }
        let idx = self.idx(row, col);
        match self.lookup[idx] {
            0 => {}
            existing if existing == value => return Ok(()),
            existing => {
                return Err(InternalInvariantError::ConflictingAssignment {
                    row,
                    col,
                    existing,
                    requested: value,
                })
            }
        }
        if !self.is_candidate(row, col, value) {
            return Err(InternalInvariantError::EliminatedCandidate { row, col, value });
        }

        self.lookup[idx] = value;
        for v in 1..=self.side() {
            self.eliminate(row, col, v);
        }
        for (r, c) in self.peers(row, col) {
            self.eliminate(r, c, value);
        }
        Ok(())
    }

    /// Clear one candidate bit, updating counters only if it was set.
    fn eliminate(&mut self, row: usize, col: usize, value: usize) -> bool {
        let lit = self.lit_index(row, col, value);
        if !self.candidates[lit] {
            return false;
        }
        self.candidates[lit] = false;
        self.num_candidates -= 1;

        let n = self.side();
        let slot = value - 1;
        self.row_count[row * n + slot] -= 1;
        self.col_count[col * n + slot] -= 1;
        let block = self.block_index(row, col);
        self.block_count[block * n + slot] -= 1;
        true
    }

    /// Assign every unassigned cell that has exactly one candidate left.
    pub fn naked_singles(&mut self) -> std::result::Result<bool, InternalInvariantError> {
        let n = self.side();
        let mut changed = false;
        for row in 0..n {
            for col in 0..n {
                if self.lookup[self.idx(row, col)] != 0 {
                    continue;
                }
                let mut remaining = (1..=n).filter(|&v| self.is_candidate(row, col, v));
                if let (Some(value), None) = (remaining.next(), remaining.next()) {
                    self.set_value(row, col, value)?;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }

    /// Assign every value that has exactly one host cell left in some line.
    pub fn hidden_singles(&mut self) -> std::result::Result<bool, InternalInvariantError> {
        let n = self.side();
        let mut changed = false;
        for kind in LineKind::ALL {
            for line in 0..n {
                for value in 1..=n {
                    if self.line_count(kind, line, value) != 1 {
                        continue;
                    }
                    let host = self
                        .line_cells(kind, line)
                        .into_iter()
                        .find(|&(r, c)| self.is_candidate(r, c, value));
                    if let Some((row, col)) = host {
                        self.set_value(row, col, value)?;
                        changed = true;
                    }
                }
            }
        }
        Ok(changed)
    }

    /// Alternate naked and hidden singles until neither makes progress.
    /// Returns the number of cells assigned.
    pub fn propagate_singles(&mut self) -> std::result::Result<usize, InternalInvariantError> {
        let before = self.assigned_count();
        loop {
            let naked = self.naked_singles()?;
            let hidden = self.hidden_singles()?;
            if !naked && !hidden {
                break;
            }
        }
        Ok(self.assigned_count() - before)
    }

    pub fn assigned_count(&self) -> usize {
        self.lookup.iter().filter(|&&v| v != 0).count()
    }

    pub fn is_solved(&self) -> bool {
        self.lookup.iter().all(|&v| v != 0)
    }

    /// Check that every row, column and block holds each value exactly once.
    pub fn is_valid_solution(&self) -> bool {
        let n = self.side();
        self.is_solved()
            && LineKind::ALL.iter().all(|&kind| {
                (0..n).all(|line| {
                    let mut seen = vec![false; n + 1];
                    self.line_cells(kind, line).into_iter().all(|(r, c)| {
                        let v = self.lookup[self.idx(r, c)];
                        !std::mem::replace(&mut seen[v], true)
                    })
                })
            })
    }

    /// Recount candidate bits and compare against the incremental counters.
    pub fn counters_consistent(&self) -> bool {
        let n = self.side();
        let bits = self.candidates.iter().filter(|&&b| b).count();
        if bits != self.num_candidates {
            return false;
        }
        LineKind::ALL.iter().all(|&kind| {
            (0..n).all(|line| {
                (1..=n).all(|value| {
                    let hosts = self
                        .line_cells(kind, line)
                        .into_iter()
                        .filter(|&(r, c)| self.is_candidate(r, c, value))
                        .count();
                    hosts == self.line_count(kind, line, value)
                })
            })
        })
    }

    /// Reset to an empty board of the same size.
    pub fn reset(&mut self) {
        let n = self.side();
        self.lookup.iter_mut().for_each(|v| *v = 0);
        self.candidates = Self::fresh_candidates(n);
        for counts in [&mut self.row_count, &mut self.col_count, &mut self.block_count] {
            counts.iter_mut().for_each(|c| *c = n);
        }
        self.num_candidates = n * n * n;
    }

    /// Reload the board with a new puzzle of the same size.
    ///
    /// With `eliminate` false the clues are only written to the lookup and
    /// the candidate bits stay full; use this when the eliminations will be
    /// replayed at the CNF level by seeding and simplifying a base formula.
    pub fn replace_from_compact_string(&mut self, input: &str, eliminate: bool) -> Result<()> {
        let (side, clues) = io::parse_compact(input)?;
        if side != self.side() {
            return Err(ConfigError::MalformedClue(format!(
                "expected {} cells, got {}",
                self.cell_count(),
                side * side
            ))
            .into());
        }

        self.reset();
        for clue in clues {
            if clue.value < 1 || clue.value > side {
                continue;
            }
            if eliminate {
                self.set_value(clue.row, clue.col, clue.value)?;
            } else {
                let idx = self.idx(clue.row, clue.col);
                self.lookup[idx] = clue.value;
            }
        }
        Ok(())
    }

    /// Write a decoded value without touching candidates.
    pub(crate) fn record(&mut self, row: usize, col: usize, value: usize) {
        let idx = self.idx(row, col);
        self.lookup[idx] = value;
    }

    #[inline]
    fn lit_index(&self, row: usize, col: usize, value: usize) -> usize {
        1 + self.idx(row, col) * self.side() + (value - 1)
    }

    fn fresh_candidates(n: usize) -> Vec<bool> {
        let mut candidates = vec![true; n * n * n + 1];
        candidates[0] = false;
        candidates
    }
}

/// Block size B for a grid with `side` cells per row.
pub fn block_size_for(side: usize) -> std::result::Result<usize, ConfigError> {
    let size = (side as f64).sqrt().round() as usize;
    if size == 0 || size * size != side {
        return Err(ConfigError::NotSquare { cells: side });
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_board() {
        let board = Board::new(3).unwrap();
        assert_eq!(board.side(), 9);
        assert_eq!(board.cell_count(), 81);
        assert_eq!(board.num_candidates(), 729);
        assert_eq!(board.line_count(LineKind::Row, 4, 7), 9);
        assert!(board.counters_consistent());
    }

    #[test]
    fn test_not_square() {
        assert_eq!(Board::with_side(10), Err(ConfigError::NotSquare { cells: 10 }));
        assert_eq!(Board::new(0), Err(ConfigError::EmptyBoard));
        assert!(Board::with_side(16).is_ok());
    }

    #[test]
    fn test_set_value_eliminates() {
        let mut board = Board::new(3).unwrap();
        board.set_value(0, 0, 5).unwrap();

        assert_eq!(board.value(0, 0), Some(5));
        for v in 1..=9 {
            assert!(!board.is_candidate(0, 0, v));
        }
        assert!(!board.is_candidate(0, 8, 5));
        assert!(!board.is_candidate(8, 0, 5));
        assert!(!board.is_candidate(2, 2, 5));
        assert!(board.is_candidate(3, 3, 5));
        assert!(board.is_candidate(0, 1, 4));

        // 9 own bits + 8 row + 8 column + 4 remaining block cells
        assert_eq!(board.num_candidates(), 729 - 29);
        assert_eq!(board.line_count(LineKind::Row, 0, 5), 0);
        assert_eq!(board.line_count(LineKind::Row, 1, 5), 6);
        assert!(board.counters_consistent());
    }

    #[test]
    fn test_set_value_idempotent_and_conflicts() {
        let mut board = Board::new(2).unwrap();
        board.set_value(0, 0, 1).unwrap();
        let snapshot = board.clone();
        board.set_value(0, 0, 1).unwrap();
        assert_eq!(board, snapshot);

        assert!(matches!(
            board.set_value(0, 0, 2),
            Err(InternalInvariantError::ConflictingAssignment { existing: 1, requested: 2, .. })
        ));
        assert!(matches!(
            board.set_value(0, 3, 1),
            Err(InternalInvariantError::EliminatedCandidate { row: 0, col: 3, value: 1 })
        ));
    }

    #[test]
    fn test_set_value_rejects_out_of_range() {
        let mut board = Board::new(2).unwrap();
        let snapshot = board.clone();
        for (row, col, value) in [(0, 0, 0), (0, 0, 5), (4, 0, 1), (0, 4, 1)] {
            assert_eq!(
                board.set_value(row, col, value),
                Err(InternalInvariantError::OutOfRange { row, col, value, side: 4 })
            );
        }
        assert_eq!(board, snapshot);
        assert!(board.counters_consistent());
    }

    #[test]
    fn test_from_clues_skips_out_of_range_values() {
        let clues = [Clue::new(0, 0, 0), Clue::new(1, 1, 10), Clue::new(2, 2, 3)];
        let board = Board::from_clues(3, &clues).unwrap();
        assert_eq!(board.assigned_count(), 1);
        assert_eq!(board.value(2, 2), Some(3));

        let outside = Board::from_clues(3, &[Clue::new(9, 0, 1)]);
        assert!(outside.is_err());
    }

    #[test]
    fn test_block_cells() {
        let board = Board::new(2).unwrap();
        assert_eq!(
            board.line_cells(LineKind::Block, 3),
            vec![(2, 2), (2, 3), (3, 2), (3, 3)]
        );
        assert_eq!(board.block_index(1, 2), 1);
        assert_eq!(board.block_index(2, 1), 2);
    }

    #[test]
    fn test_singles_solve_easy_4x4() {
        let mut board = Board::from_grid(&[
            vec![1, 0, 0, 4],
            vec![0, 4, 1, 0],
            vec![2, 0, 0, 3],
            vec![0, 3, 2, 0],
        ])
        .unwrap();
        let assigned = board.propagate_singles().unwrap();
        assert_eq!(assigned, 8);
        assert!(board.is_valid_solution());
        assert_eq!(board.num_candidates(), 0);
        assert!(board.counters_consistent());
    }

    #[test]
    fn test_hidden_single() {
        let mut board = Board::new(2).unwrap();
        // value 1 is excluded from row 0 everywhere except column 3
        board.set_value(1, 0, 1).unwrap();
        board.set_value(2, 1, 1).unwrap();
        board.set_value(3, 2, 1).unwrap();
        assert_eq!(board.line_count(LineKind::Row, 0, 1), 1);
        assert!(board.hidden_singles().unwrap());
        assert_eq!(board.value(0, 3), Some(1));
    }

    #[test]
    fn test_replace_from_compact_string() {
        let mut board = Board::new(2).unwrap();
        board.replace_from_compact_string("1..4..1..1..4..1", false).unwrap();
        assert_eq!(board.assigned_count(), 6);
        assert_eq!(board.num_candidates(), 64);

        board.replace_from_compact_string("1..4..1..1..4..1", true).unwrap();
        assert_eq!(board.assigned_count(), 6);
        assert!(board.num_candidates() < 64);
        assert!(board.counters_consistent());

        assert!(board.replace_from_compact_string("1..4", true).is_err());
    }

    proptest! {
        #[test]
        fn prop_counters_track_assignments(
            size in 2usize..=4,
            picks in proptest::collection::vec((0usize..16, 0usize..16, 1usize..=16), 0..40),
        ) {
            let mut board = Board::new(size).unwrap();
            let n = board.side();
            for (row, col, value) in picks {
                let (row, col, value) = (row % n, col % n, (value - 1) % n + 1);
                let result = board.set_value(row, col, value);
                prop_assert_eq!(result.is_ok(), board.value(row, col) == Some(value));
                prop_assert!(board.counters_consistent());
            }
        }
    }
}
