//! Exactly-one cardinality encodings
//!
//! Three interchangeable at-most-one encodings with different size
//! trade-offs:
//! - pairwise: k(k-1)/2 binary clauses, no auxiliary variables
//! - commander (Klieber & Kwon, 2007): groups of three under a commander
//!   variable, recursing over the commanders
//! - bimander (Nguyen & Mai, 2015): groups of two whose index is bound to
//!   ⌈log₂ m⌉ auxiliary bits
//!
//! All three accept exactly the same assignments once projected onto the
//! input literals.

use super::constraints::{Clause, LiteralValue};
use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::sync::atomic::{AtomicI32, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Pairwise,
    Commander,
    Bimander,
}

/// Source of fresh auxiliary variable ids.
pub trait VarAllocator {
    /// Reserve `count` consecutive fresh ids.
    fn allocate(&self, count: usize) -> Vec<i32>;

    /// Highest id handed out so far.
    fn current(&self) -> i32;
}

/// Single-threaded counter.
#[derive(Debug)]
pub struct SequentialCounter {
    last: Cell<i32>,
}

impl SequentialCounter {
    /// Counter whose first fresh id is `last + 1`.
    pub fn new(last: i32) -> Self {
        Self { last: Cell::new(last) }
    }
}

impl VarAllocator for SequentialCounter {
    fn allocate(&self, count: usize) -> Vec<i32> {
        let first = self.last.get() + 1;
        self.last.set(self.last.get() + count as i32);
        (first..first + count as i32).collect()
    }

    fn current(&self) -> i32 {
        self.last.get()
    }
}

/// Counter shared by concurrent encoders; each call gets a disjoint range.
#[derive(Debug)]
pub struct AtomicCounter {
    last: AtomicI32,
}

impl AtomicCounter {
    pub fn new(last: i32) -> Self {
        Self {
            last: AtomicI32::new(last),
        }
    }
}

impl VarAllocator for AtomicCounter {
    fn allocate(&self, count: usize) -> Vec<i32> {
        let first = self.last.fetch_add(count as i32, Ordering::Relaxed) + 1;
        (first..first + count as i32).collect()
    }

    fn current(&self) -> i32 {
        self.last.load(Ordering::Relaxed)
    }
}

/// Picks an encoding by group size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardinalityPolicy {
    /// Groups of at most this many literals use the pairwise encoding.
    pub pairwise_max: usize,
    /// Encoding for larger groups.
    pub large: Encoding,
}

impl CardinalityPolicy {
    /// Always use `encoding`, whatever the group size.
    pub fn fixed(encoding: Encoding) -> Self {
        Self {
            pairwise_max: 0,
            large: encoding,
        }
    }

    pub fn select(&self, k: usize) -> Encoding {
        if k <= self.pairwise_max {
            Encoding::Pairwise
        } else {
            self.large
        }
    }
}

impl Default for CardinalityPolicy {
    fn default() -> Self {
        Self {
            pairwise_max: 6,
            large: Encoding::Bimander,
        }
    }
}

/// Clauses forcing exactly one of the resolved literals true.
///
/// Already-false literals are dropped first. A single remaining literal is
/// returned as a unit clause, which the formula turns into a forced literal;
/// no open literal at all yields the empty clause.
pub fn exactly_one<A: VarAllocator + ?Sized>(
    resolved: &[LiteralValue],
    policy: &CardinalityPolicy,
    vars: &A,
) -> Vec<Clause> {
    let open: Vec<i32> = resolved
        .iter()
        .filter_map(|value| match value {
            LiteralValue::Var(lit) => Some(*lit),
            _ => None,
        })
        .collect();

    if resolved.contains(&LiteralValue::True) {
        return open.iter().map(|&lit| Clause::unit(-lit)).collect();
    }

    match open.len() {
        0 => vec![Clause::new(Vec::new())],
        1 => vec![Clause::unit(open[0])],
        k => {
            let mut result = Vec::with_capacity(1 + k * k / 2);
            result.push(Clause::new(open.clone()));
            result.extend(at_most_one(policy.select(k), &open, vars));
            result
        }
    }
}

/// Clauses allowing at most one of `lits` to be true.
pub fn at_most_one<A: VarAllocator + ?Sized>(encoding: Encoding, lits: &[i32], vars: &A) -> Vec<Clause> {
    match encoding {
        Encoding::Pairwise => pairwise(lits),
        Encoding::Commander => commander(lits, vars),
        Encoding::Bimander => bimander(lits, vars),
    }
}

fn pairwise(lits: &[i32]) -> Vec<Clause> {
    lits.iter()
        .tuple_combinations()
        .map(|(&a, &b)| Clause::binary(-a, -b))
        .collect()
}

fn commander<A: VarAllocator + ?Sized>(lits: &[i32], vars: &A) -> Vec<Clause> {
    const GROUP: usize = 3;
    if lits.len() <= GROUP {
        return pairwise(lits);
    }

    let groups: Vec<&[i32]> = lits.chunks(GROUP).collect();
    let commanders = vars.allocate(groups.len());
    let mut result = Vec::new();

    for (group, &cmd) in groups.iter().zip(&commanders) {
        result.extend(pairwise(group));
        // ¬commander → ¬lit
        result.extend(group.iter().map(|&lit| Clause::binary(cmd, -lit)));
    }

    result.push(Clause::new(commanders.clone()));
    result.extend(commander(&commanders, vars));
    result
}

fn bimander<A: VarAllocator + ?Sized>(lits: &[i32], vars: &A) -> Vec<Clause> {
    const GROUP: usize = 2;
    let groups: Vec<&[i32]> = lits.chunks(GROUP).collect();
    let bits = bin_length(groups.len());
    let aux = vars.allocate(bits);
    let mut result = Vec::new();

    for (index, group) in groups.iter().enumerate() {
        result.extend(pairwise(group));
        for &lit in group.iter() {
            for (bit, &b) in aux.iter().enumerate() {
                let polarity = if index & (1 << bit) != 0 { b } else { -b };
                // lit → bit pattern of its group
                result.push(Clause::binary(-lit, polarity));
            }
        }
    }
    result
}

/// Bits needed to number `m` groups.
fn bin_length(m: usize) -> usize {
    let mut bits = 0;
    while (1usize << bits) < m {
        bits += 1;
    }
    bits
}
