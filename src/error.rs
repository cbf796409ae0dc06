//! Error types for the sudoku SAT compiler

use thiserror::Error;

/// Invalid puzzle or grid configuration supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{cells} is not a perfect square")]
    NotSquare { cells: usize },

    #[error("block size must be positive")]
    EmptyBoard,

    #[error("clue ({row}, {col}) lies outside a {size}x{size} grid")]
    ClueOutOfGrid { row: usize, col: usize, size: usize },

    #[error("malformed clue input: {0}")]
    MalformedClue(String),

    #[error("base formula for block size {expected} cannot serve a board of block size {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("only raw-literal formulas can be reused as a base")]
    CompressedBase,
}

/// Broken internal invariant. These indicate a contradictory puzzle or a bug,
/// never a recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalInvariantError {
    #[error("cell ({row}, {col}) already holds {existing}, cannot assign {requested}")]
    ConflictingAssignment {
        row: usize,
        col: usize,
        existing: usize,
        requested: usize,
    },

    #[error("cannot assign {value} to cell ({row}, {col}) of a {side}x{side} grid")]
    OutOfRange {
        row: usize,
        col: usize,
        value: usize,
        side: usize,
    },

    #[error("value {value} is no longer a candidate for cell ({row}, {col})")]
    EliminatedCandidate { row: usize, col: usize, value: usize },

    #[error("literal {literal} contradicts the forced set {forced:?}")]
    ContradictoryLiteral { literal: i32, forced: Vec<i32> },

    #[error("clause {clause:?} must be satisfied by {literal}, which is forced false (forced set {forced:?})")]
    PropagationConflict {
        clause: Vec<i32>,
        literal: i32,
        forced: Vec<i32>,
    },
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("internal invariant violated: {0}")]
    Invariant(#[from] InternalInvariantError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("solver error: {0}")]
    Solver(String),

    #[error("worker pool error: {0}")]
    WorkerPool(String),
}

pub type Result<T> = std::result::Result<T, Error>;
