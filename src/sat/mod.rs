//! SAT encoding, simplification and solving for sudoku boards

pub mod builder;
pub mod cardinality;
pub mod constraints;
pub mod encoder;
pub mod explain;
pub mod external;
pub mod simplify;
pub mod solver;
pub mod solver_factory;

pub use builder::{compile, CompileOptions, CompileStats, FormulaBuilder, ParallelBuilder, SequentialBuilder};
pub use cardinality::{exactly_one, CardinalityPolicy, Encoding};
pub use constraints::{Clause, CnfFormula, ForcedLiterals, LiteralValue, VariableSpace};
pub use encoder::{solve_many, BatchSolver, EncodingStatistics, PuzzleOutcome, SolveReport, SudokuEncoder};
pub use explain::{DeletionExplainer, UnsatExplainer};
pub use simplify::{SimplifyOptions, SimplifyStats};
pub use solver::{SatOutcome, SatSolver};
pub use solver_factory::UnifiedSatSolver;
