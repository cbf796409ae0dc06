//! Display and output formatting utilities

use crate::config::OutputFormat;
use crate::sat::encoder::{EncodingStatistics, PuzzleOutcome, SolveReport};
use crate::sat::explain::format_clauses;
use crate::sat::Clause;
use crate::sudoku::{to_compact_string, Board};
use anyhow::Result;
use serde::Serialize;

/// Format boards and solve reports for display
pub struct SolutionFormatter;

/// JSON shape of a solve report.
#[derive(Debug, Serialize)]
struct ReportJson<'a> {
    solution: Option<String>,
    unsat_core: Option<Vec<&'a [i32]>>,
    statistics: &'a EncodingStatistics,
}

impl SolutionFormatter {
    /// Format a board with block separators, `.` for empty cells
    pub fn format_board(board: &Board) -> String {
        let n = board.side();
        let b = board.size();
        let width = n.to_string().len();
        let separator = {
            let block = "-".repeat(b * (width + 1) + 1);
            let mut line = String::from("+");
            for _ in 0..b {
                line.push_str(&block);
                line.push('+');
            }
            line.push('\n');
            line
        };

        let mut output = String::new();
        for row in 0..n {
            if row % b == 0 {
                output.push_str(&separator);
            }
            for col in 0..n {
                if col % b == 0 {
                    output.push_str("| ");
                }
                let cell = match board.value(row, col) {
                    Some(v) => v.to_string(),
                    None => ".".to_string(),
                };
                output.push_str(&format!("{:>width$} ", cell, width = width));
            }
            output.push_str("|\n");
        }
        output.push_str(&separator);
        output
    }

    /// Format an unsatisfiable core as sorted DIMACS
    pub fn format_core(core: &[Clause]) -> String {
        format_clauses(core)
    }

    /// Format a solve report in the requested output format
    pub fn format_report(report: &SolveReport, format: OutputFormat) -> Result<String> {
        let output = match format {
            OutputFormat::Text => match &report.outcome {
                PuzzleOutcome::Solved(board) => to_compact_string(board),
                PuzzleOutcome::Unsat { .. } => "UNSAT".to_string(),
            },
            OutputFormat::Visual => match &report.outcome {
                PuzzleOutcome::Solved(board) => Self::format_board(board),
                PuzzleOutcome::Unsat { core: Some(core) } => {
                    format!("UNSAT\n{}", Self::format_core(core))
                }
                PuzzleOutcome::Unsat { core: None } => "UNSAT".to_string(),
            },
            OutputFormat::Json => {
                let (solution, unsat_core) = match &report.outcome {
                    PuzzleOutcome::Solved(board) => (Some(to_compact_string(board)), None),
                    PuzzleOutcome::Unsat { core } => (
                        None,
                        core.as_ref()
                            .map(|core| core.iter().map(|c| c.literals.as_slice()).collect()),
                    ),
                };
                serde_json::to_string_pretty(&ReportJson {
                    solution,
                    unsat_core,
                    statistics: &report.statistics,
                })?
            }
        };
        Ok(output)
    }
}

/// Color output utilities
pub struct ColorOutput;

impl ColorOutput {
    /// Format text with color (if terminal supports it)
    pub fn colored(text: &str, color: Color) -> String {
        if Self::supports_color() {
            format!("\x1b[{}m{}\x1b[0m", color.code(), text)
        } else {
            text.to_string()
        }
    }

    /// Check if terminal supports color
    fn supports_color() -> bool {
        std::env::var("NO_COLOR").is_err() && (std::env::var("TERM").unwrap_or_default() != "dumb")
    }

    /// Format success message
    pub fn success(text: &str) -> String {
        Self::colored(text, Color::Green)
    }

    /// Format error message
    pub fn error(text: &str) -> String {
        Self::colored(text, Color::Red)
    }

    /// Format warning message
    pub fn warning(text: &str) -> String {
        Self::colored(text, Color::Yellow)
    }

    /// Format info message
    pub fn info(text: &str) -> String {
        Self::colored(text, Color::Blue)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
}

impl Color {
    fn code(self) -> u8 {
        match self {
            Color::Red => 31,
            Color::Green => 32,
            Color::Yellow => 33,
            Color::Blue => 34,
        }
    }
}
