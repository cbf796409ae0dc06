//! Formula construction: one exactly-one constraint per cell and per
//! (line, value) pair, built sequentially or on a worker pool

use super::cardinality::{exactly_one, AtomicCounter, CardinalityPolicy, SequentialCounter, VarAllocator};
use super::constraints::{Clause, CnfFormula, LiteralValue};
use crate::config::BuildMode;
use crate::error::{Error, Result};
use crate::sudoku::{Board, LineKind};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Mutex;
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

/// What an exactly-one group ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// The N values of one cell.
    Cell,
    /// The N cells of a row, column or block for one value.
    Line(LineKind),
}

/// Raw positive literals of which exactly one must hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintGroup {
    pub kind: GroupKind,
    pub literals: Vec<i32>,
}

/// Every exactly-one group of the board: N² cell groups followed by N²
/// groups for each of rows, columns and blocks.
pub fn constraint_groups(board: &Board) -> Vec<ConstraintGroup> {
    let n = board.side();

    let mut groups: Vec<ConstraintGroup> = (0..n * n)
        .into_par_iter()
        .map(|idx| {
            let (row, col) = (idx / n, idx % n);
            ConstraintGroup {
                kind: GroupKind::Cell,
                literals: (1..=n).map(|value| board.lit(row, col, value)).collect(),
            }
        })
        .collect();

    for kind in LineKind::ALL {
        let lines: Vec<ConstraintGroup> = (0..n * n)
            .into_par_iter()
            .map(|slot| {
                let (line, value) = (slot / n, slot % n + 1);
                ConstraintGroup {
                    kind: GroupKind::Line(kind),
                    literals: board
                        .line_cells(kind, line)
                        .into_iter()
                        .map(|(row, col)| board.lit(row, col, value))
                        .collect(),
                }
            })
            .collect();
        groups.extend(lines);
    }
    groups
}

/// Clauses produced by a builder plus the highest variable id it used.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub clauses: Vec<Clause>,
    pub nb_var: i32,
}

/// Strategy that turns constraint groups into clauses.
///
/// Implementations only read `board` and `formula`; units in the output are
/// merged into the forced set by the caller.
pub trait FormulaBuilder {
    fn build(
        &self,
        board: &Board,
        formula: &CnfFormula,
        groups: Vec<ConstraintGroup>,
        policy: &CardinalityPolicy,
    ) -> Result<BuildOutput>;

    fn name(&self) -> &'static str;
}

fn encode_group<A: VarAllocator + ?Sized>(
    board: &Board,
    formula: &CnfFormula,
    group: &ConstraintGroup,
    policy: &CardinalityPolicy,
    vars: &A,
) -> Vec<Clause> {
    let resolved: Vec<LiteralValue> = group
        .literals
        .iter()
        .map(|&lit| formula.resolve(board, lit))
        .collect();
    exactly_one(&resolved, policy, vars)
}

/// Encodes groups one after another on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialBuilder;

impl FormulaBuilder for SequentialBuilder {
    fn build(
        &self,
        board: &Board,
        formula: &CnfFormula,
        groups: Vec<ConstraintGroup>,
        policy: &CardinalityPolicy,
    ) -> Result<BuildOutput> {
        let counter = SequentialCounter::new(formula.nb_var());
        let mut clauses = Vec::new();
        for group in &groups {
            clauses.extend(encode_group(board, formula, group, policy, &counter));
        }
        Ok(BuildOutput {
            clauses,
            nb_var: counter.current(),
        })
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}

/// Fixed pool of encoder threads pulling from one bounded work queue, with a
/// single consumer collecting clause batches.
#[derive(Debug, Clone, Copy)]
pub struct ParallelBuilder {
    workers: usize,
    queue_capacity: usize,
}

impl ParallelBuilder {
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        Self {
            workers: workers.max(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for ParallelBuilder {
    fn default() -> Self {
        Self::new(default_workers(), 64)
    }
}

impl FormulaBuilder for ParallelBuilder {
    fn build(
        &self,
        board: &Board,
        formula: &CnfFormula,
        groups: Vec<ConstraintGroup>,
        policy: &CardinalityPolicy,
    ) -> Result<BuildOutput> {
        let counter = AtomicCounter::new(formula.nb_var());
        let counter = &counter;
        let (task_tx, task_rx) = mpsc::sync_channel::<ConstraintGroup>(self.queue_capacity);
        let tasks = Mutex::new(task_rx);
        let tasks = &tasks;

        let clauses = thread::scope(|scope| -> Result<Vec<Clause>> {
            let (result_tx, result_rx) = mpsc::sync_channel::<Vec<Clause>>(self.queue_capacity);

            let consumer = thread::Builder::new()
                .name("cnf-consumer".to_string())
                .spawn_scoped(scope, move || consumer_loop(result_rx))?;

            let mut handles = Vec::with_capacity(self.workers);
            for id in 0..self.workers {
                let result_tx = result_tx.clone();
                let handle = thread::Builder::new()
                    .name(format!("cnf-worker-{}", id))
                    .spawn_scoped(scope, move || worker_loop(tasks, result_tx, board, formula, policy, counter))?;
                handles.push(handle);
            }
            // only the workers hold result senders now
            drop(result_tx);

            for group in groups {
                task_tx
                    .send(group)
                    .map_err(|_| Error::WorkerPool("every worker stopped early".to_string()))?;
            }

            // close the work queue, wait for every worker, then the consumer
            drop(task_tx);
            for (id, handle) in handles.into_iter().enumerate() {
                let processed = handle
                    .join()
                    .map_err(|_| Error::WorkerPool(format!("worker {} panicked", id)))?;
                debug!("cnf-worker-{} encoded {} groups", id, processed);
            }
            consumer
                .join()
                .map_err(|_| Error::WorkerPool("consumer panicked".to_string()))
        })?;

        Ok(BuildOutput {
            clauses,
            nb_var: counter.current(),
        })
    }

    fn name(&self) -> &'static str {
        "parallel"
    }
}

fn worker_loop(
    tasks: &Mutex<Receiver<ConstraintGroup>>,
    results: SyncSender<Vec<Clause>>,
    board: &Board,
    formula: &CnfFormula,
    policy: &CardinalityPolicy,
    counter: &AtomicCounter,
) -> usize {
    let mut processed = 0;
    loop {
        // the guard is released as soon as a group has been taken
        let next = match tasks.lock() {
            Ok(queue) => queue.recv(),
            Err(_) => break,
        };
        let Ok(group) = next else {
            break;
        };
        let clauses = encode_group(board, formula, &group, policy, counter);
        if results.send(clauses).is_err() {
            break;
        }
        processed += 1;
    }
    processed
}

fn consumer_loop(results: Receiver<Vec<Clause>>) -> Vec<Clause> {
    let mut clauses = Vec::new();
    for batch in results {
        clauses.extend(batch);
    }
    clauses
}

/// Available hardware parallelism, at least 1.
pub fn default_workers() -> usize {
    thread::available_parallelism().map(|p| p.get()).unwrap_or(1)
}

/// Options for [`compile`].
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Number cell variables densely over open candidates.
    pub compress: bool,
    pub policy: CardinalityPolicy,
    pub mode: BuildMode,
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            compress: true,
            policy: CardinalityPolicy::default(),
            mode: BuildMode::Sequential,
            workers: default_workers(),
            queue_capacity: 64,
        }
    }
}

impl CompileOptions {
    /// Builder selected by `mode`.
    pub fn builder(&self) -> Box<dyn FormulaBuilder> {
        match self.mode {
            BuildMode::Sequential => Box::new(SequentialBuilder),
            BuildMode::Parallel => Box::new(ParallelBuilder::new(self.workers, self.queue_capacity)),
        }
    }
}

/// Figures from one [`compile`] run.
#[derive(Debug, Clone, Serialize)]
pub struct CompileStats {
    pub builder: &'static str,
    pub groups: usize,
    pub cell_vars: usize,
    pub aux_vars: usize,
    pub nb_var: i32,
    pub forced: usize,
    pub clauses: usize,
    pub elapsed_ms: f64,
}

/// Compile `board` into CNF.
///
/// Clues are seeded as forced literals (raw space) or resolved away
/// (compressed space) before any group is encoded.
pub fn compile(board: &Board, options: &CompileOptions) -> Result<(CnfFormula, CompileStats)> {
    let start = Instant::now();
    let mut formula = CnfFormula::new(board, options.compress)?;
    let cell_vars = formula.cell_var_count(board);

    let groups = constraint_groups(board);
    let group_count = groups.len();
    let builder = options.builder();
    debug!("Encoding {} groups with the {} builder", group_count, builder.name());

    let output = builder.build(board, &formula, groups, &options.policy)?;
    formula.absorb(output.clauses)?;
    formula.set_nb_var(output.nb_var);

    let stats = CompileStats {
        builder: builder.name(),
        groups: group_count,
        cell_vars,
        aux_vars: formula.nb_var() as usize - cell_vars,
        nb_var: formula.nb_var(),
        forced: formula.forced().len(),
        clauses: formula.clauses().len(),
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    };
    info!(
        "Compiled {} variables ({} auxiliary), {} clauses, {} forced literals in {:.2}ms",
        stats.nb_var, stats.aux_vars, stats.clauses, stats.forced, stats.elapsed_ms
    );
    Ok((formula, stats))
}
