//! This module provides the default search engine: a time-limited, parallel branch and bound search over the boolean
//! decision variables of a compiled model.
//!
//! Every worker thread runs its own depth-first search over the complete search tree. Workers differ by the seed of
//! their random variable selection, so they explore the tree in different orders ("portfolio" parallelism). Each
//! worker keeps the current domains of all variables, a trail of the variables fixed so far and, for every cardinality
//! constraint, the number of variables fixed to true and still free. After each branching decision, the constraints
//! touching the changed variables are propagated to a fixpoint: a saturated `≤` or `=` constraint fixes its remaining
//! variables to false, a `≥` or `=` constraint needing all of its free variables fixes them to true.
//!
//! The best feasible solution, found so far, is kept in a shared data structure. Its score is used as an upper bound
//! for the branches' scores: a lower bound of the objective is computed by interval evaluation of the expression graph
//! over the current domains, and a branch is bounded as soon as it cannot improve the best solution by the objective's
//! step.
//!
//! With random variable selection, a worker restarts its search from the root whenever the number of failures since
//! the last restart reaches a limit following the Luby sequence (`RESTART_FAILURES` times 1, 1, 2, 1, 1, 2, 4, …).
//! The limits grow without bound, so the search stays complete. Only a run finishing without restart exhausts the
//! tree.
//!
//! The worker threads are stopped as soon as one of them has exhausted its search tree (which proves the best
//! solution optimal) or the deadline has passed.

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::panic;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use crate::model::constraints::Relation;
use crate::model::expr::Interval;
use crate::model::CompiledModel;
use crate::solver::{
    RawSolution, SearchEngine, SearchStrategy, ValueSelection, VariableSelection,
};

/// Failures of the first search run before a restart
const RESTART_FAILURES: u64 = 100;

/// Parallel branch and bound search engine
#[derive(Clone, Debug)]
pub struct BranchAndBound {
    num_threads: usize,
}

impl BranchAndBound {
    /// Create an engine searching with `num_threads` worker threads (at least one)
    pub fn new(num_threads: usize) -> BranchAndBound {
        BranchAndBound {
            num_threads: num_threads.max(1),
        }
    }
}

impl Default for BranchAndBound {
    fn default() -> Self {
        BranchAndBound::new(1)
    }
}

/// The shared state of the worker threads
struct SharedState {
    /// The best solution, found so far
    best_result: Option<Vec<bool>>,
    /// The score of the best solution, found so far
    best_score: i64,
    /// Number of improving solutions recorded
    solutions: u64,
}

/// Synchronization of the worker threads: the mutex-ed shared state and lock-free copies of the values, each worker
/// reads at every node.
struct Shared {
    state: Mutex<SharedState>,
    /// Copy of `state.best_score` for bounding. `i64::MAX` as long as no solution has been found.
    best_score: AtomicI64,
    /// Set when the search tree has been exhausted by any worker
    stop: AtomicBool,
}

/// Counters of a single worker's search
#[derive(Clone, Copy, Debug, Default)]
struct Stats {
    nodes: u64,
    failures: u64,
    solutions: u64,
    restarts: u64,
    exhausted: bool,
}

impl SearchEngine for BranchAndBound {
    fn search(
        &self,
        model: &CompiledModel,
        strategy: &SearchStrategy,
        time_limit: Duration,
    ) -> Option<RawSolution> {
        let start = Instant::now();
        // A time limit too large to represent is no limit at all
        let deadline = start.checked_add(time_limit);

        let watches = watches(model);
        let shared = Shared {
            state: Mutex::new(SharedState {
                best_result: None,
                best_score: i64::MAX,
                solutions: 0,
            }),
            best_score: AtomicI64::new(i64::MAX),
            stop: AtomicBool::new(false),
        };

        let mut total = Stats::default();
        thread::scope(|scope| {
            let workers: Vec<_> = (0..self.num_threads)
                .map(|i| {
                    let rng = match strategy.seed {
                        Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(i as u64)),
                        None => SmallRng::from_entropy(),
                    };
                    let mut worker = Worker::new(model, &watches, strategy, rng);
                    let shared = &shared;
                    scope.spawn(move || {
                        worker.run(shared, deadline);
                        worker.stats
                    })
                })
                .collect();

            for (i, handle) in workers.into_iter().enumerate() {
                match handle.join() {
                    Ok(stats) => {
                        debug!(
                            "Worker {}: {} nodes, {} failures, {} restarts, {} solutions{}",
                            i,
                            stats.nodes,
                            stats.failures,
                            stats.restarts,
                            stats.solutions,
                            if stats.exhausted { ", search space exhausted" } else { "" }
                        );
                        total.nodes += stats.nodes;
                        total.failures += stats.failures;
                        total.exhausted |= stats.exhausted;
                    }
                    Err(e) => panic::resume_unwind(e),
                }
            }
        });

        let state = shared.state.into_inner().unwrap();
        info!(
            "Search finished after {:?}: {} nodes, {} failures, {} improving solutions{}",
            start.elapsed(),
            total.nodes,
            total.failures,
            state.solutions,
            if total.exhausted {
                ", best solution is optimal"
            } else {
                ""
            }
        );
        state
            .best_result
            .map(|values| RawSolution::new(values, state.best_score))
    }
}

/// For every variable, the indexes of the constraints it occurs in
fn watches(model: &CompiledModel) -> Vec<Vec<usize>> {
    let mut watches = vec![Vec::new(); model.vars().len()];
    for (c, constraint) in model.constraints().iter().enumerate() {
        for var in constraint.vars.iter() {
            watches[var.index()].push(c);
        }
    }
    watches
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Domain {
    Free,
    False,
    True,
}

impl Domain {
    fn interval(self) -> Interval {
        match self {
            Domain::Free => Interval::BOOL,
            Domain::False => Interval::point(0),
            Domain::True => Interval::point(1),
        }
    }
}

/// Set of the free variables, supporting O(1) removal, random access and LIFO restoration
struct FreeSet {
    dense: Vec<usize>,
    position: Vec<usize>,
    size: usize,
}

impl FreeSet {
    fn full(n: usize) -> FreeSet {
        FreeSet {
            dense: (0..n).collect(),
            position: (0..n).collect(),
            size: n,
        }
    }

    fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn remove(&mut self, var: usize) {
        let i = self.position[var];
        let last = self.dense[self.size - 1];
        self.dense.swap(i, self.size - 1);
        self.position[last] = i;
        self.position[var] = self.size - 1;
        self.size -= 1;
    }

    /// Undo the most recent removal
    fn restore(&mut self) {
        self.size += 1;
    }

    fn get(&self, i: usize) -> usize {
        self.dense[i]
    }
}

/// An open branching decision on the DFS stack
struct Frame {
    /// Trail length before the decision
    mark: usize,
    var: usize,
    value: bool,
    /// Whether the opposite value is being explored
    retried: bool,
}

/// Search state of a single worker thread
struct Worker<'a> {
    model: &'a CompiledModel,
    watches: &'a [Vec<usize>],
    strategy: &'a SearchStrategy,
    rng: SmallRng,
    domains: Vec<Domain>,
    /// Fixed variables in the order they were fixed
    trail: Vec<usize>,
    free: FreeSet,
    /// Per constraint: number of variables fixed to true
    num_true: Vec<i64>,
    /// Per constraint: number of free variables
    num_free: Vec<i64>,
    queue: Vec<usize>,
    queued: Vec<bool>,
    bounds: Vec<Interval>,
    stats: Stats,
}

impl<'a> Worker<'a> {
    fn new(
        model: &'a CompiledModel,
        watches: &'a [Vec<usize>],
        strategy: &'a SearchStrategy,
        rng: SmallRng,
    ) -> Worker<'a> {
        let num_vars = model.vars().len();
        let constraints = model.constraints();
        Worker {
            model,
            watches,
            strategy,
            rng,
            domains: vec![Domain::Free; num_vars],
            trail: Vec::with_capacity(num_vars),
            free: FreeSet::full(num_vars),
            num_true: vec![0; constraints.len()],
            num_free: constraints.iter().map(|c| c.vars.len() as i64).collect(),
            queue: (0..constraints.len()).collect(),
            queued: vec![true; constraints.len()],
            bounds: Vec::new(),
            stats: Stats::default(),
        }
    }

    fn fix(&mut self, var: usize, value: bool) {
        self.domains[var] = if value { Domain::True } else { Domain::False };
        self.trail.push(var);
        self.free.remove(var);
        for &c in self.watches[var].iter() {
            self.num_free[c] -= 1;
            if value {
                self.num_true[c] += 1;
            }
            if !self.queued[c] {
                self.queued[c] = true;
                self.queue.push(c);
            }
        }
    }

    /// Reset all variables fixed after the trail had length `mark`
    fn undo(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let var = match self.trail.pop() {
                Some(var) => var,
                None => break,
            };
            let was_true = self.domains[var] == Domain::True;
            self.domains[var] = Domain::Free;
            self.free.restore();
            for &c in self.watches[var].iter() {
                self.num_free[c] += 1;
                if was_true {
                    self.num_true[c] -= 1;
                }
            }
        }
    }

    /// Propagate all queued constraints to a fixpoint. Returns false on a conflict.
    fn propagate(&mut self) -> bool {
        let model = self.model;
        while let Some(c) = self.queue.pop() {
            self.queued[c] = false;
            let constraint = &model.constraints()[c];
            let min = self.num_true[c];
            let max = min + self.num_free[c];
            let rhs = constraint.rhs;
            let conflict = match constraint.relation {
                Relation::Eq => min > rhs || max < rhs,
                Relation::Le => min > rhs,
                Relation::Ge => max < rhs,
            };
            if conflict {
                for c in self.queue.drain(..) {
                    self.queued[c] = false;
                }
                return false;
            }
            if self.num_free[c] == 0 {
                continue;
            }
            let implied = match constraint.relation {
                Relation::Eq | Relation::Le if min == rhs => Some(false),
                Relation::Eq | Relation::Ge if max == rhs => Some(true),
                _ => None,
            };
            if let Some(value) = implied {
                for var in constraint.vars.iter() {
                    if self.domains[var.index()] == Domain::Free {
                        self.fix(var.index(), value);
                    }
                }
            }
        }
        true
    }

    fn select_variable(&mut self) -> usize {
        match self.strategy.variables {
            VariableSelection::Random => {
                let i = self.rng.gen_range(0..self.free.size);
                self.free.get(i)
            }
            VariableSelection::First => (0..self.free.size)
                .map(|i| self.free.get(i))
                .min()
                .unwrap_or(0),
        }
    }

    fn first_value(&self, var: usize) -> bool {
        match self.strategy.values {
            ValueSelection::MaxValue => true,
            ValueSelection::MinValue => false,
            ValueSelection::Demand => {
                let constraints = self.model.constraints();
                self.watches[var].iter().any(|&c| {
                    let constraint = &constraints[c];
                    constraint.relation == Relation::Ge && self.num_true[c] < constraint.rhs
                })
            }
        }
    }

    /// Check whether the current node can still improve the best known solution
    fn is_bounded(&mut self, shared: &Shared) -> bool {
        let best = shared.best_score.load(Ordering::Relaxed);
        if best == i64::MAX {
            return false;
        }
        let objective = self.model.objective();
        let domains = &self.domains;
        self.model.exprs().bounds_into(
            |var| domains[var.index()].interval(),
            objective.expr,
            &mut self.bounds,
        );
        self.bounds[objective.expr.index()].lo > best - objective.step
    }

    /// Offer the complete assignment of the current node as a new solution
    fn record(&mut self, shared: &Shared) {
        let values: Vec<bool> = self.domains.iter().map(|d| *d == Domain::True).collect();
        let objective = self.model.objective();
        let score = self.model.objective_value(&values);

        let mut state = shared.state.lock().unwrap();
        if state.best_result.is_none() || score <= state.best_score - objective.step {
            debug!("Found solution with objective {}", score);
            state.best_result = Some(values);
            state.best_score = score;
            state.solutions += 1;
            shared.best_score.store(score, Ordering::Relaxed);
            self.stats.solutions += 1;
        }
    }

    /// Depth-first search until the tree is exhausted, another worker has exhausted its tree or the
    /// deadline passed
    fn run(&mut self, shared: &Shared, deadline: Option<Instant>) {
        let mut stack: Vec<Frame> = Vec::new();
        let mut consistent = self.propagate();
        let root = self.trail.len();
        let restarts = self.strategy.variables == VariableSelection::Random;
        let mut failures = 0;
        let mut failure_limit = RESTART_FAILURES;

        'search: loop {
            let timed_out = deadline.map_or(false, |d| Instant::now() >= d);
            if shared.stop.load(Ordering::Relaxed) || timed_out {
                return;
            }

            if consistent {
                self.stats.nodes += 1;
                if self.free.is_empty() {
                    self.record(shared);
                } else if !self.is_bounded(shared) {
                    let var = self.select_variable();
                    let value = self.first_value(var);
                    stack.push(Frame {
                        mark: self.trail.len(),
                        var,
                        value,
                        retried: false,
                    });
                    self.fix(var, value);
                    consistent = self.propagate();
                    continue;
                }
            } else {
                self.stats.failures += 1;
                failures += 1;
            }

            if restarts && failures >= failure_limit && !stack.is_empty() {
                self.undo(root);
                stack.clear();
                self.stats.restarts += 1;
                failures = 0;
                failure_limit = RESTART_FAILURES * luby(self.stats.restarts + 1);
                consistent = true;
                continue;
            }

            // Backtrack to the most recent decision with an unexplored value
            loop {
                let frame = match stack.last_mut() {
                    Some(frame) => frame,
                    None => break 'search,
                };
                self.undo(frame.mark);
                if frame.retried {
                    stack.pop();
                    continue;
                }
                frame.retried = true;
                let (var, value) = (frame.var, !frame.value);
                self.fix(var, value);
                consistent = self.propagate();
                continue 'search;
            }
        }

        self.stats.exhausted = true;
        shared.stop.store(true, Ordering::Relaxed);
    }
}

/// The `i`-th element (starting at 1) of the Luby sequence 1, 1, 2, 1, 1, 2, 4, 1, …
fn luby(mut i: u64) -> u64 {
    loop {
        let mut k = 1;
        while (1 << k) - 1 < i {
            k += 1;
        }
        if (1 << k) - 1 == i {
            return 1 << (k - 1);
        }
        i -= (1 << (k - 1)) - 1;
    }
}

#[cfg(test)]
mod tests;
