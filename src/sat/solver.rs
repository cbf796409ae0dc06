//! SAT solver integration using CaDiCaL

use super::constraints::{Clause, CnfFormula};
use crate::error::{Error, Result};
use cadical::Solver;

/// Result of a solver call. UNSAT is an ordinary outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatOutcome {
    Unsat,
    /// `model[i]` is the value of variable `i + 1`.
    Sat(Vec<bool>),
}

impl SatOutcome {
    pub fn is_sat(&self) -> bool {
        matches!(self, SatOutcome::Sat(_))
    }

    pub fn model(&self) -> Option<&[bool]> {
        match self {
            SatOutcome::Sat(model) => Some(model),
            SatOutcome::Unsat => None,
        }
    }
}

/// SAT solver wrapper for CaDiCaL
pub struct SatSolver {
    solver: Solver,
    variable_count: usize,
}

impl SatSolver {
    /// Create a new SAT solver instance
    pub fn new() -> Self {
        Self {
            solver: Solver::new(),
            variable_count: 0,
        }
    }

    /// Add clauses to the solver
    pub fn add_clauses<'a>(&mut self, clauses: impl IntoIterator<Item = &'a Clause>) {
        for clause in clauses {
            self.add_clause(clause);
        }
    }

    /// Add a single clause. An empty clause makes the problem UNSAT.
    pub fn add_clause(&mut self, clause: &Clause) {
        for &literal in &clause.literals {
            let var = literal.unsigned_abs() as usize;
            if var > self.variable_count {
                self.variable_count = var;
            }
        }
        self.solver.add_clause(clause.literals.iter().copied());
    }

    /// Add every clause of `formula`, forced units included.
    pub fn add_formula(&mut self, formula: &CnfFormula) {
        for clause in formula.solver_clauses() {
            self.add_clause(&clause);
        }
    }

    /// Solve and return a model over variables `1..=nb_var`.
    ///
    /// Variables the solver never saw are reported false.
    pub fn solve(&mut self, nb_var: usize) -> Result<SatOutcome> {
        match self.solver.solve() {
            Some(true) => Ok(SatOutcome::Sat(self.extract_model(nb_var))),
            Some(false) => Ok(SatOutcome::Unsat),
            None => Err(Error::Solver("CaDiCaL returned unknown".to_string())),
        }
    }

    fn extract_model(&self, nb_var: usize) -> Vec<bool> {
        (1..=nb_var)
            .map(|var| var <= self.variable_count && self.solver.value(var as i32) == Some(true))
            .collect()
    }
}

impl Default for SatSolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Solve `formula` in a fresh CaDiCaL instance.
pub fn solve_formula(formula: &CnfFormula) -> Result<SatOutcome> {
    let mut solver = SatSolver::new();
    solver.add_formula(formula);
    solver.solve(formula.nb_var() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_satisfiable() {
        let mut solver = SatSolver::new();

        // x1 ∨ x2, ¬x1 ∨ x2
        solver.add_clause(&Clause::new(vec![1, 2]));
        solver.add_clause(&Clause::new(vec![-1, 2]));

        let outcome = solver.solve(2).unwrap();
        let model = outcome.model().unwrap();
        assert_eq!(model.len(), 2);
        // x2 should be true to satisfy both clauses
        assert!(model[1]);
    }

    #[test]
    fn test_unsatisfiable() {
        let mut solver = SatSolver::new();
        solver.add_clause(&Clause::unit(1));
        solver.add_clause(&Clause::unit(-1));

        assert_eq!(solver.solve(1).unwrap(), SatOutcome::Unsat);
    }

    #[test]
    fn test_empty_clause_is_unsat() {
        let mut solver = SatSolver::new();
        solver.add_clause(&Clause::new(vec![1, 2]));
        solver.add_clause(&Clause::new(vec![]));
        assert_eq!(solver.solve(2).unwrap(), SatOutcome::Unsat);
    }

    #[test]
    fn test_model_padded_to_requested_length() {
        let mut solver = SatSolver::new();
        solver.add_clause(&Clause::unit(2));
        solver.add_clause(&Clause::unit(-1));
        let outcome = solver.solve(5).unwrap();
        assert_eq!(outcome.model().unwrap(), &[false, true, false, false, false][..]);
    }

    #[test]
    fn test_clauses_accumulate_between_calls() {
        let mut solver = SatSolver::new();
        solver.add_clause(&Clause::new(vec![1, -5, 3]));
        assert!(solver.solve(7).unwrap().is_sat());

        solver.add_clauses(&[Clause::unit(-1), Clause::unit(-3), Clause::unit(5)]);
        assert_eq!(solver.solve(5).unwrap(), SatOutcome::Unsat);
    }
}
