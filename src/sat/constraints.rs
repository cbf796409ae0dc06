//! Clauses, forced literals and the CNF formula for a sudoku board

use crate::error::{ConfigError, InternalInvariantError, Result};
use crate::sudoku::{decode_model, Board, CompressedMapping};
use itertools::Itertools;
use std::fmt;
use std::io::Write;

/// Represents a SAT clause (disjunction of literals)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Clause {
    pub literals: Vec<i32>, // Positive for variable, negative for negation
}

impl Clause {
    /// Create a new clause from literals
    pub fn new(literals: Vec<i32>) -> Self {
        Self { literals }
    }

    /// Create a unit clause (single literal)
    pub fn unit(literal: i32) -> Self {
        Self { literals: vec![literal] }
    }

    /// Create a binary clause (two literals)
    pub fn binary(lit1: i32, lit2: i32) -> Self {
        Self { literals: vec![lit1, lit2] }
    }

    /// Check if clause is empty (unsatisfiable)
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Check if clause is unit
    pub fn is_unit(&self) -> bool {
        self.literals.len() == 1
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    /// True when some literal of the clause is forced true.
    pub fn is_satisfied_by(&self, forced: &ForcedLiterals) -> bool {
        self.literals.iter().any(|&lit| forced.is_true(lit))
    }
}

const UNASSIGNED: u8 = 0;
const ASSIGNED_TRUE: u8 = 1;
const ASSIGNED_FALSE: u8 = 2;

/// Literals fixed before search, in insertion order, with a per-variable
/// polarity lookup. A literal and its negation are never both present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForcedLiterals {
    lits: Vec<i32>,
    lookup: Vec<u8>,
}

impl ForcedLiterals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force `lit` true. Returns whether it was newly added.
    pub fn force(&mut self, lit: i32) -> std::result::Result<bool, InternalInvariantError> {
        let var = lit.unsigned_abs() as usize;
        if var >= self.lookup.len() {
            self.lookup.resize(var + 1, UNASSIGNED);
        }
        let polarity = if lit > 0 { ASSIGNED_TRUE } else { ASSIGNED_FALSE };
        match self.lookup[var] {
            UNASSIGNED => {
                self.lookup[var] = polarity;
                self.lits.push(lit);
                Ok(true)
            }
            current if current == polarity => Ok(false),
            _ => Err(InternalInvariantError::ContradictoryLiteral {
                literal: lit,
                forced: self.lits.clone(),
            }),
        }
    }

    pub fn is_true(&self, lit: i32) -> bool {
        let polarity = if lit > 0 { ASSIGNED_TRUE } else { ASSIGNED_FALSE };
        self.lookup.get(lit.unsigned_abs() as usize) == Some(&polarity)
    }

    pub fn is_false(&self, lit: i32) -> bool {
        self.is_true(-lit)
    }

    pub fn is_assigned(&self, var: i32) -> bool {
        self.is_true(var) || self.is_false(var)
    }

    pub fn literals(&self) -> &[i32] {
        &self.lits
    }

    pub fn len(&self) -> usize {
        self.lits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }
}

/// Variable numbering used by a formula for cell literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableSpace {
    /// Cell variables are raw literals `1..=N³`.
    Raw,
    /// Cell variables are dense ids over the open candidates only.
    Compressed(CompressedMapping),
}

/// A raw cell literal resolved against what is already known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralValue {
    True,
    False,
    Var(i32),
}

/// CNF formula for one board: clauses, the next free variable and the set of
/// literals forced true at initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnfFormula {
    pub(crate) size: usize,
    pub(crate) clauses: Vec<Clause>,
    pub(crate) nb_var: i32,
    pub(crate) forced: ForcedLiterals,
    pub(crate) space: VariableSpace,
}

impl CnfFormula {
    /// Empty formula over `board`'s cell variables.
    ///
    /// In raw space the forced set is seeded from every assigned cell, the
    /// same eliminations [`Board::set_value`] performs. In compressed space
    /// settled literals are not variables at all and nothing is seeded.
    pub fn new(board: &Board, compress: bool) -> Result<Self> {
        let space = if compress {
            VariableSpace::Compressed(CompressedMapping::build(board))
        } else {
            VariableSpace::Raw
        };
        let mut formula = Self {
            size: board.size(),
            clauses: Vec::new(),
            nb_var: 0,
            forced: ForcedLiterals::new(),
            space,
        };
        formula.nb_var = formula.cell_var_count(board) as i32;
        if formula.space == VariableSpace::Raw {
            formula.seed_from_board(board)?;
        }
        Ok(formula)
    }

    /// Copy of a raw base formula with `board`'s clues forced.
    ///
    /// The result still carries every base clause; run
    /// [`CnfFormula::simplify`] to specialize it.
    pub fn specialize(&self, board: &Board) -> Result<Self> {
        if self.space != VariableSpace::Raw {
            return Err(ConfigError::CompressedBase.into());
        }
        if self.size != board.size() {
            return Err(ConfigError::SizeMismatch {
                expected: self.size,
                actual: board.size(),
            }
            .into());
        }
        let mut formula = self.clone();
        formula.seed_from_board(board)?;
        Ok(formula)
    }

    fn seed_from_board(&mut self, board: &Board) -> std::result::Result<(), InternalInvariantError> {
        let n = board.side();
        for row in 0..n {
            for col in 0..n {
                let Some(value) = board.value(row, col) else {
                    continue;
                };
                self.forced.force(board.lit(row, col, value))?;
                for other in (1..=n).filter(|&v| v != value) {
                    self.forced.force(-board.lit(row, col, other))?;
                }
                for (r, c) in board.peers(row, col) {
                    self.forced.force(-board.lit(r, c, value))?;
                }
            }
        }
        Ok(())
    }

    /// Resolve a positive raw cell literal into this formula's variables.
    pub fn resolve(&self, board: &Board, lit: i32) -> LiteralValue {
        match &self.space {
            VariableSpace::Raw => {
                if self.forced.is_true(lit) {
                    LiteralValue::True
                } else if self.forced.is_false(lit) {
                    LiteralValue::False
                } else {
                    LiteralValue::Var(lit)
                }
            }
            VariableSpace::Compressed(mapping) => match mapping.compress(lit) {
                Some(id) => LiteralValue::Var(id),
                None => {
                    let (row, col, value) = board.decompose(lit);
                    if board.value(row, col) == Some(value) {
                        LiteralValue::True
                    } else {
                        LiteralValue::False
                    }
                }
            },
        }
    }

    /// Merge generated clauses: units join the forced set, the rest are kept.
    pub fn absorb(
        &mut self,
        clauses: impl IntoIterator<Item = Clause>,
    ) -> std::result::Result<(), InternalInvariantError> {
        for clause in clauses {
            if clause.is_unit() {
                self.forced.force(clause.literals[0])?;
            } else {
                self.clauses.push(clause);
            }
        }
        Ok(())
    }

    /// Number of variables that stand for cell literals.
    pub fn cell_var_count(&self, board: &Board) -> usize {
        match &self.space {
            VariableSpace::Raw => board.literal_count(),
            VariableSpace::Compressed(mapping) => mapping.len(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn nb_var(&self) -> i32 {
        self.nb_var
    }

    pub(crate) fn set_nb_var(&mut self, nb_var: i32) {
        self.nb_var = self.nb_var.max(nb_var);
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn forced(&self) -> &ForcedLiterals {
        &self.forced
    }

    pub fn space(&self) -> &VariableSpace {
        &self.space
    }

    pub fn mapping(&self) -> Option<&CompressedMapping> {
        match &self.space {
            VariableSpace::Raw => None,
            VariableSpace::Compressed(mapping) => Some(mapping),
        }
    }

    /// Clause count as emitted, forced units included.
    pub fn clause_count(&self) -> usize {
        self.forced.len() + self.clauses.len()
    }

    /// Every clause handed to a solver: forced units first, then the rest.
    pub fn solver_clauses(&self) -> impl Iterator<Item = Clause> + '_ {
        self.forced
            .literals()
            .iter()
            .map(|&lit| Clause::unit(lit))
            .chain(self.clauses.iter().cloned())
    }

    /// Write the formula in DIMACS CNF form.
    pub fn write_dimacs<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write!(w, "{}", self)
    }

    pub fn to_dimacs_string(&self) -> String {
        self.to_string()
    }

    /// Decode a solver model (indexed by variable id - 1) into `board`.
    pub fn decode(&self, board: &mut Board, model: &[bool]) {
        decode_model(board, model, self.mapping());
    }
}

/// DIMACS CNF text: the header, forced units, then the remaining clauses.
impl fmt::Display for CnfFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "p cnf {} {}", self.nb_var, self.clause_count())?;
        for lit in self.forced.literals() {
            writeln!(f, "{} 0", lit)?;
        }
        for clause in &self.clauses {
            if clause.is_empty() {
                writeln!(f, "0")?;
            } else {
                writeln!(f, "{} 0", clause.literals.iter().join(" "))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sudoku::Clue;

    #[test]
    fn test_clause_creation() {
        let clause = Clause::new(vec![1, -2, 3]);
        assert_eq!(clause.literals, vec![1, -2, 3]);
        assert!(!clause.is_empty());
        assert!(!clause.is_unit());

        assert!(Clause::unit(5).is_unit());
        assert_eq!(Clause::binary(1, -2).literals, vec![1, -2]);
        assert!(Clause::new(vec![]).is_empty());
    }

    #[test]
    fn test_forced_literals() {
        let mut forced = ForcedLiterals::new();
        assert_eq!(forced.force(3), Ok(true));
        assert_eq!(forced.force(3), Ok(false));
        assert_eq!(forced.force(-7), Ok(true));
        assert!(forced.is_true(3));
        assert!(forced.is_false(-3));
        assert!(forced.is_false(7));
        assert!(!forced.is_assigned(100));

        let err = forced.force(-3).unwrap_err();
        assert_eq!(
            err,
            InternalInvariantError::ContradictoryLiteral {
                literal: -3,
                forced: vec![3, -7],
            }
        );
        assert_eq!(forced.literals(), &[3, -7]);
    }

    #[test]
    fn test_raw_seeding_mirrors_board() {
        let board = Board::from_clues(2, &[Clue::new(0, 0, 1)]).unwrap();
        let formula = CnfFormula::new(&board, false).unwrap();
        assert_eq!(formula.nb_var(), 64);

        // 1 positive + 3 other values + 7 peers (block cell (1,1) not in row/col)
        assert_eq!(formula.forced().len(), 1 + 3 + 3 + 3 + 1);
        assert_eq!(formula.resolve(&board, board.lit(0, 0, 1)), LiteralValue::True);
        assert_eq!(formula.resolve(&board, board.lit(0, 0, 2)), LiteralValue::False);
        assert_eq!(formula.resolve(&board, board.lit(1, 1, 1)), LiteralValue::False);
        assert_eq!(formula.resolve(&board, board.lit(1, 1, 2)), LiteralValue::Var(board.lit(1, 1, 2)));

        // every literal the bitset has cleared is decided in the forced set
        for lit in 1..=board.literal_count() as i32 {
            assert_eq!(!board.is_candidate_lit(lit), formula.forced().is_assigned(lit));
        }
    }

    #[test]
    fn test_compressed_space_resolution() {
        let board = Board::from_clues(2, &[Clue::new(0, 0, 1)]).unwrap();
        let formula = CnfFormula::new(&board, true).unwrap();
        assert!(formula.forced().is_empty());
        assert_eq!(formula.nb_var() as usize, board.num_candidates());
        assert_eq!(formula.resolve(&board, board.lit(0, 0, 1)), LiteralValue::True);
        assert_eq!(formula.resolve(&board, board.lit(0, 1, 1)), LiteralValue::False);
        assert!(matches!(
            formula.resolve(&board, board.lit(1, 1, 2)),
            LiteralValue::Var(id) if id > 0 && id as usize <= board.num_candidates()
        ));
    }

    #[test]
    fn test_specialize_rejects_mismatch() {
        let base = CnfFormula::new(&Board::new(2).unwrap(), false).unwrap();
        assert!(base.specialize(&Board::new(3).unwrap()).is_err());

        let compressed = CnfFormula::new(&Board::new(2).unwrap(), true).unwrap();
        assert!(compressed.specialize(&Board::new(2).unwrap()).is_err());
    }

    #[test]
    fn test_dimacs_output() {
        let board = Board::new(2).unwrap();
        let mut formula = CnfFormula::new(&board, false).unwrap();
        formula
            .absorb(vec![Clause::unit(5), Clause::new(vec![1, -2, 3]), Clause::new(vec![])])
            .unwrap();

        let text = formula.to_dimacs_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["p cnf 64 3", "5 0", "1 -2 3 0", "0"]);
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_dimacs_writer_errors_propagate() {
        let formula = CnfFormula::new(&Board::new(2).unwrap(), false).unwrap();
        let mut buffer = Vec::new();
        formula.write_dimacs(&mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), formula.to_dimacs_string());

        let err = formula.write_dimacs(&mut ClosedPipe).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }
}
