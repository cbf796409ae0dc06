//! Unit propagation over two watched literals, optional pure-literal
//! elimination, and removal of satisfied clauses
//!
//! This specializes a formula to what its forced literals already imply,
//! which is how a base formula for an empty board is turned into the
//! formula for one puzzle without re-encoding.

use super::constraints::{Clause, CnfFormula, ForcedLiterals};
use crate::error::InternalInvariantError;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimplifyOptions {
    /// Force every variable that occurs with a single polarity.
    ///
    /// Preserves satisfiability but not the solution set, so a formula that
    /// is later specialized further must not be simplified with it.
    pub pure_literal_elimination: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimplifyStats {
    pub pure_literals: usize,
    pub propagated: usize,
    pub clauses_before: usize,
    pub clauses_after: usize,
    pub forced_after: usize,
}

/// Watcher slot of a literal: `2(v-1)` for `v`, `2(v-1)+1` for `-v`.
#[inline]
fn lit_to_idx(lit: i32) -> usize {
    let var = lit.unsigned_abs() as usize - 1;
    if lit < 0 {
        (var << 1) + 1
    } else {
        var << 1
    }
}

impl CnfFormula {
    /// Propagate the forced set through the clauses and drop every clause
    /// it satisfies.
    ///
    /// Fails when a clause would need a literal that is already forced false.
    pub fn simplify(&mut self, options: &SimplifyOptions) -> Result<SimplifyStats, InternalInvariantError> {
        let nb_var = self.nb_var.max(0) as usize;
        let mut stats = SimplifyStats {
            clauses_before: self.clauses.len(),
            ..SimplifyStats::default()
        };

        let mut watchers: Vec<Vec<usize>> = vec![Vec::new(); 2 * nb_var];
        let mut pos_count = vec![0usize; nb_var];
        let mut neg_count = vec![0usize; nb_var];
        let mut units = Vec::new();

        for (i, clause) in self.clauses.iter().enumerate() {
            if clause.is_unit() {
                units.push(clause.literals[0]);
                continue;
            }
            for &lit in clause.literals.iter().take(2) {
                if let Some(list) = watchers.get_mut(lit_to_idx(lit)) {
                    list.push(i);
                }
            }
            if !options.pure_literal_elimination {
                continue;
            }
            for &lit in &clause.literals {
                let var = lit.unsigned_abs() as usize - 1;
                if var >= nb_var {
                    continue;
                }
                if lit > 0 {
                    pos_count[var] += 1;
                } else {
                    neg_count[var] += 1;
                }
            }
        }

        for lit in units {
            self.forced.force(lit)?;
        }

        if options.pure_literal_elimination {
            for var in 1..=nb_var as i32 {
                if self.forced.is_assigned(var) {
                    continue;
                }
                let (pos, neg) = (pos_count[var as usize - 1], neg_count[var as usize - 1]);
                let pure = match (pos, neg) {
                    (0, n) if n > 0 => -var,
                    (p, 0) if p > 0 => var,
                    _ => continue,
                };
                self.forced.force(pure)?;
                stats.pure_literals += 1;
            }
        }

        let mut queue: VecDeque<i32> = self.forced.literals().iter().copied().collect();
        while let Some(lit) = queue.pop_front() {
            stats.propagated += propagate(&mut self.clauses, &mut self.forced, &mut watchers, &mut queue, lit)?;
        }

        let forced = &self.forced;
        self.clauses.retain(|clause| !clause.is_satisfied_by(forced));

        stats.clauses_after = self.clauses.len();
        stats.forced_after = self.forced.len();
        debug!(
            "Simplified {} -> {} clauses ({} propagated, {} pure)",
            stats.clauses_before, stats.clauses_after, stats.propagated, stats.pure_literals
        );
        Ok(stats)
    }
}

/// Visit every clause watching `-lit`. Each either keeps a true watch, moves
/// its watch to a literal that is not false, or forces its other watch.
/// Returns the number of literals forced.
fn propagate(
    clauses: &mut [Clause],
    forced: &mut ForcedLiterals,
    watchers: &mut [Vec<usize>],
    queue: &mut VecDeque<i32>,
    lit: i32,
) -> Result<usize, InternalInvariantError> {
    let neg = -lit;
    let watching = match watchers.get_mut(lit_to_idx(neg)) {
        Some(list) => std::mem::take(list),
        None => return Ok(0),
    };

    let mut newly_forced = 0;
    for clause_idx in watching {
        let literals = &mut clauses[clause_idx].literals;

        // keep the other watch at index 0
        if literals[0] == neg {
            literals.swap(0, 1);
        }
        if literals[1] != neg {
            // stale entry, the watch has moved on
            continue;
        }
        if forced.is_true(literals[0]) {
            continue;
        }

        if let Some(j) = (2..literals.len()).find(|&j| !forced.is_false(literals[j])) {
            literals.swap(1, j);
            if let Some(list) = watchers.get_mut(lit_to_idx(literals[1])) {
                list.push(clause_idx);
            }
            continue;
        }

        let unit = literals[0];
        if forced.is_assigned(unit) {
            return Err(InternalInvariantError::PropagationConflict {
                clause: literals.clone(),
                literal: unit,
                forced: forced.literals().to_vec(),
            });
        }
        forced.force(unit)?;
        queue.push_back(unit);
        newly_forced += 1;
    }
    Ok(newly_forced)
}
