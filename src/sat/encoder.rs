//! End-to-end sudoku solving: singles pre-pass, CNF compilation,
//! simplification, SAT solving and decoding

use super::builder::{compile, CompileOptions, CompileStats};
use super::constraints::{Clause, CnfFormula};
use super::explain::{DeletionExplainer, UnsatExplainer};
use super::simplify::{SimplifyOptions, SimplifyStats};
use super::solver::SatOutcome;
use super::solver_factory::UnifiedSatSolver;
use crate::config::{Settings, SolverBackend};
use crate::error::{InternalInvariantError, Result};
use crate::sudoku::board::block_size_for;
use crate::sudoku::{to_compact_string, Board};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of solving one puzzle.
#[derive(Debug, Clone)]
pub enum PuzzleOutcome {
    Solved(Board),
    /// No solution. `core` holds a minimal unsatisfiable clause subset when
    /// explanations are enabled.
    Unsat { core: Option<Vec<Clause>> },
}

#[derive(Debug, Clone)]
pub struct SolveReport {
    pub outcome: PuzzleOutcome,
    pub statistics: EncodingStatistics,
}

/// Statistics about the SAT encoding of one puzzle
#[derive(Debug, Clone, Serialize)]
pub struct EncodingStatistics {
    pub block_size: usize,
    pub clues: usize,
    pub singles_assigned: usize,
    pub open_candidates: usize,
    pub compile: CompileStats,
    pub simplify: Option<SimplifyStats>,
    /// Unit propagation alone showed the puzzle has no solution.
    pub refuted: bool,
    pub backend: SolverBackend,
    pub solve_time_ms: f64,
    pub satisfiable: Option<bool>,
}

/// Main SAT encoder for sudoku puzzles
pub struct SudokuEncoder {
    settings: Settings,
    solver: UnifiedSatSolver,
}

impl SudokuEncoder {
    /// Create a new encoder with the given settings
    pub fn new(settings: Settings) -> Result<Self> {
        let solver = UnifiedSatSolver::new(&settings.solver)?;
        Ok(Self { settings, solver })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Apply the singles pre-pass to `board` and compile what is left.
    pub fn encode(&self, board: &mut Board) -> Result<(CnfFormula, EncodingStatistics)> {
        let clues = board.assigned_count();
        let singles_assigned = if self.settings.propagation.singles {
            board.propagate_singles()?
        } else {
            0
        };
        debug!("Singles assigned {} cells, {} candidates left", singles_assigned, board.num_candidates());

        let (mut formula, compile_stats) = compile(board, &self.settings.compile_options())?;

        let (simplify, refuted) = if self.settings.simplify.enabled {
            match simplify_instance(&mut formula, &self.settings.simplify_options())? {
                Some(stats) => (Some(stats), false),
                None => (None, true),
            }
        } else {
            (None, false)
        };

        let statistics = EncodingStatistics {
            block_size: board.size(),
            clues,
            singles_assigned,
            open_candidates: board.num_candidates(),
            compile: compile_stats,
            simplify,
            refuted,
            backend: self.solver.backend(),
            solve_time_ms: 0.0,
            satisfiable: None,
        };
        Ok((formula, statistics))
    }

    /// Encode, solve and decode one puzzle.
    pub fn solve(&self, mut board: Board) -> Result<SolveReport> {
        let (formula, mut statistics) = self.encode(&mut board)?;

        let start = Instant::now();
        let outcome = if statistics.refuted {
            SatOutcome::Unsat
        } else {
            self.solver.solve(&formula, &board)?
        };
        statistics.solve_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        statistics.satisfiable = Some(outcome.is_sat());
        info!(
            "Solver finished in {:.2}ms: {}",
            statistics.solve_time_ms,
            if outcome.is_sat() { "SAT" } else { "UNSAT" }
        );

        let outcome = match outcome {
            SatOutcome::Sat(model) => {
                formula.decode(&mut board, &model);
                if !board.is_valid_solution() {
                    warn!("Decoded board is not a valid solution");
                }
                PuzzleOutcome::Solved(board)
            }
            SatOutcome::Unsat => {
                let core = if self.settings.solver.explain_unsat {
                    Some(DeletionExplainer.explain_formula(&formula)?)
                } else {
                    None
                };
                PuzzleOutcome::Unsat { core }
            }
        };

        Ok(SolveReport { outcome, statistics })
    }
}

/// Simplify a formula whose clues are already known to be consistent.
///
/// Contradictory clues fail earlier, while seeding the forced set, so a
/// propagation conflict here means the puzzle has no solution. That case
/// returns `None` and leaves `formula` unsatisfiable as it stands.
fn simplify_instance(formula: &mut CnfFormula, options: &SimplifyOptions) -> Result<Option<SimplifyStats>> {
    match formula.simplify(options) {
        Ok(stats) => Ok(Some(stats)),
        Err(InternalInvariantError::PropagationConflict { clause, literal, .. }) => {
            debug!("Propagation refuted the puzzle: clause {:?} needs {}", clause, literal);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Solves many puzzles of one size against a single precompiled base
/// formula, specializing it per puzzle instead of re-encoding.
pub struct BatchSolver {
    base: CnfFormula,
    board: Board,
    solver: UnifiedSatSolver,
    simplify: SimplifyOptions,
}

/// Counts from a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub solved: usize,
    pub unsat: usize,
}

impl BatchSolver {
    /// Compile the base formula for an empty board of block size `size`.
    pub fn new(size: usize, settings: &Settings) -> Result<Self> {
        let board = Board::new(size)?;
        // the base is specialized by forcing literals, so it stays in raw space
        let options = CompileOptions {
            compress: false,
            ..settings.compile_options()
        };
        let (base, stats) = compile(&board, &options)?;
        info!("Base formula for {0}x{0}: {1} clauses", board.side(), stats.clauses);

        Ok(Self {
            base,
            board,
            solver: UnifiedSatSolver::new(&settings.solver)?,
            simplify: settings.simplify_options(),
        })
    }

    pub fn base(&self) -> &CnfFormula {
        &self.base
    }

    /// Solve one compact puzzle line; `None` when it has no solution.
    pub fn solve_line(&mut self, line: &str) -> Result<Option<String>> {
        self.board.replace_from_compact_string(line, false)?;
        let mut formula = self.base.specialize(&self.board)?;
        if simplify_instance(&mut formula, &self.simplify)?.is_none() {
            return Ok(None);
        }

        match self.solver.solve(&formula, &self.board)? {
            SatOutcome::Sat(model) => {
                formula.decode(&mut self.board, &model);
                Ok(Some(to_compact_string(&self.board)))
            }
            SatOutcome::Unsat => Ok(None),
        }
    }
}

/// Solve one compact puzzle per input line, writing one line per puzzle.
///
/// The puzzle size is taken from the first non-empty line. Puzzles without
/// a solution are written as `UNSAT`.
pub fn solve_many<R: BufRead, W: Write>(input: R, mut output: W, settings: &Settings) -> Result<BatchSummary> {
    let mut batch: Option<BatchSolver> = None;
    let mut summary = BatchSummary::default();

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if batch.is_none() {
            let side = (line.chars().count() as f64).sqrt().round() as usize;
            batch = Some(BatchSolver::new(block_size_for(side)?, settings)?);
        }
        let Some(solver) = batch.as_mut() else {
            continue;
        };

        match solver.solve_line(line)? {
            Some(solution) => {
                writeln!(output, "{}", solution)?;
                summary.solved += 1;
            }
            None => {
                writeln!(output, "UNSAT")?;
                summary.unsat += 1;
            }
        }
    }
    output.flush()?;
    Ok(summary)
}

impl std::fmt::Display for EncodingStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let side = self.block_size * self.block_size;
        writeln!(f, "SAT Encoding Statistics:")?;
        writeln!(f, "  Grid: {}x{}", side, side)?;
        writeln!(f, "  Clues: {}", self.clues)?;
        writeln!(f, "  Assigned by singles: {}", self.singles_assigned)?;
        writeln!(f, "  Open candidates: {}", self.open_candidates)?;
        writeln!(f, "  Builder: {}", self.compile.builder)?;
        writeln!(
            f,
            "  Variables: {} ({} auxiliary)",
            self.compile.nb_var, self.compile.aux_vars
        )?;
        writeln!(f, "  Clauses: {} + {} forced", self.compile.clauses, self.compile.forced)?;
        if let Some(simplify) = &self.simplify {
            writeln!(
                f,
                "  Simplified: {} -> {} clauses ({} propagated, {} pure)",
                simplify.clauses_before, simplify.clauses_after, simplify.propagated, simplify.pure_literals
            )?;
        }
        if self.refuted {
            writeln!(f, "  Refuted by unit propagation")?;
        }
        writeln!(f, "  Backend: {:?}", self.backend)?;
        writeln!(f, "  Solve time: {:.3}ms", self.solve_time_ms)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildMode;
    use crate::sat::cardinality::Encoding;
    use crate::sudoku::parse_board;

    const PUZZLE: &str = "100007090030020008009600500005300900010080002600004000300000010041000007007000300";
    const SOLUTION: &str = "162857493534129678789643521475312986913586742628794135356478219241935867897261354";

    fn solve_with(settings: Settings) -> SolveReport {
        let board = parse_board(PUZZLE).unwrap();
        SudokuEncoder::new(settings).unwrap().solve(board).unwrap()
    }

    fn solved_string(report: &SolveReport) -> String {
        match &report.outcome {
            PuzzleOutcome::Solved(board) => to_compact_string(board),
            PuzzleOutcome::Unsat { .. } => panic!("expected a solution"),
        }
    }

    #[test]
    fn test_default_pipeline() {
        let report = solve_with(Settings::default());
        assert_eq!(solved_string(&report), SOLUTION);
        assert_eq!(report.statistics.clues, 24);
        assert_eq!(report.statistics.satisfiable, Some(true));
    }

    #[test]
    fn test_every_configuration_agrees() {
        for compress in [true, false] {
            for encoding in [Encoding::Pairwise, Encoding::Commander, Encoding::Bimander] {
                for mode in [BuildMode::Sequential, BuildMode::Parallel] {
                    let mut settings = Settings::default();
                    settings.encoding.compress_literals = compress;
                    settings.encoding.pairwise_max = 0;
                    settings.encoding.large_encoding = encoding;
                    settings.builder.mode = mode;
                    settings.builder.workers = Some(2);
                    settings.propagation.singles = false;
                    settings.simplify.enabled = true;

                    let report = solve_with(settings);
                    assert_eq!(
                        solved_string(&report),
                        SOLUTION,
                        "compress={} encoding={:?} mode={:?}",
                        compress,
                        encoding,
                        mode
                    );
                }
            }
        }
    }

    #[test]
    fn test_unsat_with_explanation() {
        // cell (0, 0) sees 1 and 2 in its row, 3 and 4 in its column
        let board = parse_board(".12.....3...4...").unwrap();
        let mut settings = Settings::default();
        settings.propagation.singles = false;
        settings.solver.explain_unsat = true;

        let report = SudokuEncoder::new(settings).unwrap().solve(board).unwrap();
        match report.outcome {
            PuzzleOutcome::Unsat { core: Some(core) } => assert_eq!(core, vec![Clause::new(vec![])]),
            other => panic!("expected UNSAT with a core, got {:?}", other),
        }
    }

    #[test]
    fn test_unsat_found_by_simplification() {
        // same puzzle, left to the watched-literal simplifier in raw space
        for explain in [false, true] {
            let board = parse_board(".12.....3...4...").unwrap();
            let mut settings = Settings::default();
            settings.encoding.compress_literals = false;
            settings.propagation.singles = false;
            settings.simplify.enabled = true;
            settings.solver.explain_unsat = explain;

            let report = SudokuEncoder::new(settings).unwrap().solve(board).unwrap();
            assert!(report.statistics.refuted);
            assert_eq!(report.statistics.satisfiable, Some(false));
            match report.outcome {
                PuzzleOutcome::Unsat { core: None } => assert!(!explain),
                PuzzleOutcome::Unsat { core: Some(core) } => {
                    assert!(explain);
                    assert!(!core.is_empty());
                }
                other => panic!("expected UNSAT, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_batch_reports_unsolvable_lines() {
        let input = ".12.....3...4...\n1..4..1..1..4..1\n";
        let mut output = Vec::new();
        let summary = solve_many(input.as_bytes(), &mut output, &Settings::default()).unwrap();
        assert_eq!(summary, BatchSummary { solved: 1, unsat: 1 });

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "UNSAT");
        assert!(parse_board(lines[1]).unwrap().is_valid_solution());
    }

    #[test]
    fn test_contradictory_clues_are_fatal() {
        // two 1s in the first row
        let result = parse_board("1..1............");
        assert!(matches!(result, Err(crate::Error::Invariant(_))));
    }

    #[test]
    fn test_batch_solver() {
        let input = format!("{}\n\n{}\n", PUZZLE, SOLUTION);
        let mut output = Vec::new();
        let summary = solve_many(input.as_bytes(), &mut output, &Settings::default()).unwrap();
        assert_eq!(summary, BatchSummary { solved: 2, unsat: 0 });
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text, format!("{}\n{}\n", SOLUTION, SOLUTION));
    }

    #[test]
    fn test_batch_base_is_reused() {
        let mut batch = BatchSolver::new(2, &Settings::default()).unwrap();
        let clauses = batch.base().clauses().len();
        for puzzle in ["1..4..1..1..4..1", "................", ".2.43.....4.4..1"] {
            let solution = batch.solve_line(puzzle).unwrap().unwrap();
            let board = parse_board(&solution).unwrap();
            assert!(board.is_valid_solution());
            for (given, solved) in puzzle.chars().zip(solution.chars()) {
                assert!(given == '.' || given == solved);
            }
        }
        assert_eq!(batch.base().clauses().len(), clauses);
        assert!(batch.base().forced().is_empty());
    }
}
