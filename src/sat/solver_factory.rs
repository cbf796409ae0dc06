//! Factory for creating SAT solver instances based on configuration

use super::constraints::CnfFormula;
use super::external::ExternalSolver;
use super::solver::{solve_formula, SatOutcome};
use crate::config::{SolverBackend, SolverConfig};
use crate::error::{Error, Result};
use crate::sudoku::Board;

/// Unified SAT solver interface that can use different backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnifiedSatSolver {
    /// In-process CaDiCaL, one fresh instance per formula.
    Cadical,
    External(ExternalSolver),
}

impl UnifiedSatSolver {
    /// Create a new solver instance based on the configured backend
    pub fn new(config: &SolverConfig) -> Result<Self> {
        match config.backend {
            SolverBackend::Cadical => Ok(UnifiedSatSolver::Cadical),
            SolverBackend::External => {
                let command = config
                    .command
                    .as_deref()
                    .ok_or_else(|| Error::Solver("no external solver command configured".to_string()))?;
                Ok(UnifiedSatSolver::External(ExternalSolver::from_command_line(command)?))
            }
        }
    }

    /// Solve `formula`, built for `board`.
    ///
    /// CaDiCaL reports every variable; the external protocol only fills the
    /// cell variables.
    pub fn solve(&self, formula: &CnfFormula, board: &Board) -> Result<SatOutcome> {
        match self {
            UnifiedSatSolver::Cadical => solve_formula(formula),
            UnifiedSatSolver::External(solver) => solver.solve(formula, formula.cell_var_count(board)),
        }
    }

    /// Get the backend type being used
    pub fn backend(&self) -> SolverBackend {
        match self {
            UnifiedSatSolver::Cadical => SolverBackend::Cadical,
            UnifiedSatSolver::External(_) => SolverBackend::External,
        }
    }
}

impl Default for UnifiedSatSolver {
    fn default() -> Self {
        UnifiedSatSolver::Cadical
    }
}
