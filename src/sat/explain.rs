//! Explaining UNSAT results with a minimal unsatisfiable subset of clauses

use super::constraints::{Clause, CnfFormula};
use super::solver::{SatOutcome, SatSolver};
use crate::error::{Error, Result};
use itertools::Itertools;
use tracing::debug;

/// Produces a minimal unsatisfiable subset (MUS) of an UNSAT clause set.
pub trait UnsatExplainer {
    /// Returns the MUS in sorted order, or an error if `clauses` is satisfiable.
    fn explain(&self, clauses: &[Clause]) -> Result<Vec<Clause>>;

    fn explain_formula(&self, formula: &CnfFormula) -> Result<Vec<Clause>> {
        let clauses: Vec<Clause> = formula.solver_clauses().collect();
        self.explain(&clauses)
    }
}

/// Deletion-based MUS: drop each clause in turn and keep it out whenever
/// the remainder is still UNSAT.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeletionExplainer;

impl DeletionExplainer {
    fn is_unsat(clauses: &[Clause]) -> Result<bool> {
        let mut solver = SatSolver::new();
        solver.add_clauses(clauses);
        Ok(solver.solve(0)? == SatOutcome::Unsat)
    }
}

impl UnsatExplainer for DeletionExplainer {
    fn explain(&self, clauses: &[Clause]) -> Result<Vec<Clause>> {
        if !Self::is_unsat(clauses)? {
            return Err(Error::Solver("cannot explain a satisfiable formula".to_string()));
        }

        let mut core = clauses.to_vec();
        let mut i = 0;
        while i < core.len() {
            let mut candidate = core.clone();
            candidate.remove(i);
            if Self::is_unsat(&candidate)? {
                core = candidate;
            } else {
                i += 1;
            }
        }
        debug!("Reduced {} clauses to a core of {}", clauses.len(), core.len());

        core.sort();
        Ok(core)
    }
}

/// DIMACS text for a clause set, header included.
pub fn format_clauses(clauses: &[Clause]) -> String {
    let nb_var = clauses
        .iter()
        .flat_map(|clause| clause.literals.iter())
        .map(|lit| lit.unsigned_abs())
        .max()
        .unwrap_or(0);
    let mut out = format!("p cnf {} {}\n", nb_var, clauses.len());
    for clause in clauses {
        if clause.is_empty() {
            out.push_str("0\n");
        } else {
            out.push_str(&format!("{} 0\n", clause.literals.iter().join(" ")));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::builder::{compile, CompileOptions};
    use crate::sudoku::Board;

    #[test]
    fn test_minimal_core() {
        let clauses = vec![
            Clause::new(vec![2, 3]),
            Clause::unit(1),
            Clause::unit(-2),
            Clause::new(vec![-1, 4]),
            Clause::unit(-4),
        ];
        let core = DeletionExplainer.explain(&clauses).unwrap();
        assert_eq!(core, vec![Clause::unit(-4), Clause::new(vec![-1, 4]), Clause::unit(1)]);
        assert_eq!(format_clauses(&core), "p cnf 4 3\n-4 0\n-1 4 0\n1 0\n");
    }

    #[test]
    fn test_satisfiable_is_rejected() {
        let clauses = vec![Clause::new(vec![1, 2])];
        assert!(DeletionExplainer.explain(&clauses).is_err());
    }

    #[test]
    fn test_explains_unsolvable_puzzle() {
        // cell (0, 0) sees 1 and 2 in its row, 3 and 4 in its column
        let mut board = Board::new(2).unwrap();
        board.replace_from_compact_string(".12.....3...4...", false).unwrap();
        let options = CompileOptions {
            compress: false,
            ..CompileOptions::default()
        };
        let (formula, _) = compile(&board, &options).unwrap();
        let core = DeletionExplainer.explain_formula(&formula).unwrap();
        assert_eq!(core, vec![Clause::new(vec![])]);
    }
}
