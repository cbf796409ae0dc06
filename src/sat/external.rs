//! External solver binaries driven over stdin/stdout
//!
//! The formula is written as DIMACS to the child's stdin. Its output is
//! scanned for `s UNSATISFIABLE` or for `v` lines listing signed literals.

use super::constraints::CnfFormula;
use super::solver::SatOutcome;
use crate::error::{Error, Result};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSolver {
    program: String,
    args: Vec<String>,
}

impl ExternalSolver {
    /// Split a command line on spaces into program and arguments.
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split(' ').filter(|part| !part.is_empty()).map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| Error::Solver("empty solver command".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the solver on `formula`; the returned model has `model_len`
    /// entries (the cell variables).
    pub fn solve(&self, formula: &CnfFormula, model_len: usize) -> Result<SatOutcome> {
        debug!("Spawning external solver: {} {:?}", self.program, self.args);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Solver(format!("failed to start {}: {}", self.program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Solver("solver stdin was not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Solver("solver stdout was not captured".to_string()))?;

        let outcome = thread::scope(|scope| {
            // stdin is closed when the writer drops it
            let writer = scope.spawn(move || -> std::io::Result<()> {
                let mut w = BufWriter::new(stdin);
                formula.write_dimacs(&mut w)?;
                w.flush()
            });

            let outcome = parse_solver_output(BufReader::new(stdout), model_len);

            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {
                    warn!("{} closed its input early", self.program);
                }
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(_) => return Err(Error::Solver("DIMACS writer panicked".to_string())),
            }
            outcome
        });

        let status = child.wait()?;
        debug!("External solver exited with {}", status);
        outcome
    }
}

/// Read a solver's answer.
///
/// Literals outside `1..model_len` are dropped. The bound is strict, so the
/// literal numbered `model_len` itself never reaches the model.
pub fn parse_solver_output<R: BufRead>(reader: R, model_len: usize) -> Result<SatOutcome> {
    let mut model = vec![false; model_len];
    let mut answered = false;

    for line in reader.lines() {
        let line = line?;
        if line.starts_with("s UNSATISFIABLE") {
            return Ok(SatOutcome::Unsat);
        }
        if line.starts_with("s ") {
            answered = true;
            continue;
        }
        if !line.starts_with('v') {
            continue;
        }
        answered = true;

        for token in line.split(' ').skip(1) {
            let parsed: i64 = token.trim().parse().unwrap_or(0);
            let var = parsed.unsigned_abs() as usize;
            if var > 0 && var < model.len() {
                model[var - 1] = parsed > 0;
            }
        }
    }

    if !answered {
        return Err(Error::Solver("solver produced no result".to_string()));
    }
    Ok(SatOutcome::Sat(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sudoku::Board;
    use std::io::Cursor;

    #[test]
    fn test_command_line_split() {
        let solver = ExternalSolver::from_command_line("kissat  -q --relaxed").unwrap();
        assert_eq!(solver.program(), "kissat");
        assert_eq!(solver.args, vec!["-q", "--relaxed"]);
        assert!(ExternalSolver::from_command_line("   ").is_err());
    }

    #[test]
    fn test_parse_model() {
        let output = "c comment\ns SATISFIABLE\nv 1 -2 3\nv -4 5 0\n";
        let outcome = parse_solver_output(Cursor::new(output), 6).unwrap();
        assert_eq!(outcome, SatOutcome::Sat(vec![true, false, true, false, true, false]));
    }

    #[test]
    fn test_parse_unsat() {
        let output = "c solving\ns UNSATISFIABLE\n";
        assert_eq!(parse_solver_output(Cursor::new(output), 4).unwrap(), SatOutcome::Unsat);
    }

    #[test]
    fn test_parse_drops_last_index() {
        // the strict bound drops variable 4 of a 4-entry model
        let output = "s SATISFIABLE\nv 1 2 3 4 0\n";
        let outcome = parse_solver_output(Cursor::new(output), 4).unwrap();
        assert_eq!(outcome, SatOutcome::Sat(vec![true, true, true, false]));

        // auxiliary variables past the model are ignored
        let output = "s SATISFIABLE\nv -1 17 x 0\n";
        let outcome = parse_solver_output(Cursor::new(output), 4).unwrap();
        assert_eq!(outcome, SatOutcome::Sat(vec![false; 4]));
    }

    #[test]
    fn test_parse_no_answer() {
        assert!(parse_solver_output(Cursor::new("c nothing here\n"), 4).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_subprocess_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("solver.sh");
        let input = dir.path().join("input.cnf");
        std::fs::write(
            &script,
            format!(
                "cat > {}\necho 's SATISFIABLE'\necho 'v 1 -2 3 0'\n",
                input.display()
            ),
        )
        .unwrap();

        let board = Board::new(2).unwrap();
        let formula = CnfFormula::new(&board, false).unwrap();
        let solver = ExternalSolver::from_command_line(&format!("sh {}", script.display())).unwrap();
        let outcome = solver.solve(&formula, 64).unwrap();

        let model = outcome.model().unwrap();
        assert!(model[0] && !model[1] && model[2]);
        let written = std::fs::read_to_string(&input).unwrap();
        assert_eq!(written.lines().next(), Some("p cnf 64 0"));
    }

    #[test]
    fn test_missing_binary() {
        let board = Board::new(2).unwrap();
        let formula = CnfFormula::new(&board, false).unwrap();
        let solver = ExternalSolver::from_command_line("definitely-not-a-sat-solver-binary").unwrap();
        assert!(matches!(solver.solve(&formula, 64), Err(Error::Solver(_))));
    }
}
