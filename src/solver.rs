//! The solve driver and the interface to the search engine.
//!
//! The search itself is not part of the model: any [`SearchEngine`] receives the compiled model, a
//! search strategy and a time limit and reports the last (best) solution it recorded, or nothing.
//! The crate's own engine is [`crate::bab::BranchAndBound`].

use std::time::{Duration, Instant};

use log::{error, info};

use crate::config::{Problem, Variant};
use crate::model::expr::ExprId;
use crate::model::vars::VarId;
use crate::model::CompiledModel;

/// Rule for choosing the next variable to branch on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariableSelection {
    /// Uniformly random among the unassigned variables
    Random,
    /// Unassigned variable with the lowest index
    First,
}

/// Rule for choosing the value tried first on a branching variable
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueSelection {
    /// Try `true` first
    MaxValue,
    /// Try `false` first
    MinValue,
    /// Try `true` first if the variable occurs in a `≥` constraint that is not yet satisfied,
    /// `false` otherwise. Fills units up to their headcount floor before exceeding it anywhere.
    Demand,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchStrategy {
    pub variables: VariableSelection,
    pub values: ValueSelection,
    /// Seed of the engine's random source. Without a seed, runs are not reproducible.
    pub seed: Option<u64>,
}

impl Default for SearchStrategy {
    fn default() -> Self {
        SearchStrategy {
            variables: VariableSelection::Random,
            values: ValueSelection::MaxValue,
            seed: None,
        }
    }
}

/// Values of all decision variables in a recorded solution
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSolution {
    values: Vec<bool>,
    objective: i64,
}

impl RawSolution {
    pub fn new(values: Vec<bool>, objective: i64) -> RawSolution {
        RawSolution { values, objective }
    }

    pub fn value(&self, var: VarId) -> bool {
        self.values[var.index()]
    }

    pub fn values(&self) -> &[bool] {
        &self.values
    }

    /// Objective value, as reported by the engine
    pub fn objective(&self) -> i64 {
        self.objective
    }

    /// Value of any expression of `model` in this solution
    pub fn evaluate(&self, model: &CompiledModel, expr: ExprId) -> i64 {
        model.exprs().value(&self.values, expr)
    }
}

/// A time-limited search engine for compiled models
pub trait SearchEngine {
    /// Search for feasible assignments minimizing the model's objective until the search space is
    /// exhausted or `time_limit` has passed. Returns the last solution recorded, if any.
    fn search(
        &self,
        model: &CompiledModel,
        strategy: &SearchStrategy,
        time_limit: Duration,
    ) -> Option<RawSolution>;
}

/// Parameters of one solve
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolveParams {
    pub strategy: SearchStrategy,
    pub time_limit: Duration,
    /// Number of search threads
    pub threads: usize,
}

impl SolveParams {
    /// Strategy for the problem's variant with its seed and time limit, single-threaded.
    ///
    /// The grouped variant bounds every headcount to `target ..= target + 1`, so it fills floors
    /// first ([`ValueSelection::Demand`]).
    pub fn for_problem(problem: &Problem) -> SolveParams {
        let values = match problem.variant {
            Variant::Simple => ValueSelection::MaxValue,
            Variant::Grouped => ValueSelection::Demand,
        };
        SolveParams {
            strategy: SearchStrategy {
                values,
                seed: problem.seed,
                ..SearchStrategy::default()
            },
            time_limit: problem.max_timeout,
            threads: 1,
        }
    }
}

/// Run `engine` on `model` and return its solution.
///
/// `None` is the explicit no-solution outcome: the engine found no feasible assignment within the
/// time limit. A solution violating the model's constraints is reported and discarded.
pub fn solve<E: SearchEngine + ?Sized>(
    model: &CompiledModel,
    engine: &E,
    params: &SolveParams,
) -> Option<RawSolution> {
    info!(
        "Starting search with {:?} variable and {:?} value selection, time limit {:?}",
        params.strategy.variables, params.strategy.values, params.time_limit
    );
    let start = Instant::now();
    let solution = engine.search(model, &params.strategy, params.time_limit);
    let elapsed = start.elapsed();

    let solution = match solution {
        Some(solution) => solution,
        None => {
            info!("No solution found within {:?}", elapsed);
            return None;
        }
    };
    if solution.values.len() != model.vars().len() {
        error!(
            "Search engine returned {} values for {} variables",
            solution.values.len(),
            model.vars().len()
        );
        return None;
    }
    let violations = model.violations(&solution.values);
    if !violations.is_empty() {
        error!(
            "Search engine returned a solution violating {} constraints, e.g. {:?}",
            violations.len(),
            violations[0].kind
        );
        return None;
    }

    info!(
        "Found solution with objective {} after {:?}",
        solution.objective, elapsed
    );
    Some(solution)
}
