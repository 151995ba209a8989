//! The complete rotation assignment pipeline: model compilation, search and projection of the result.

use log::info;
use serde::{Deserialize, Serialize};

use crate::bab::BranchAndBound;
use crate::config::Problem;
use crate::model;
use crate::projection::{self, RotationPlan, Summary};
use crate::solver::{self, SearchEngine, SolveParams};
use crate::Error;

/// A solved rotation: the plan and the metrics it achieves
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub plan: RotationPlan,
    pub summary: Summary,
}

/// Solve a validated rotation problem with the built-in branch and bound engine, using `params.threads` threads.
///
/// Returns `Ok(None)` if no feasible rotation was found within the time limit.
pub fn solve(problem: &Problem, params: &SolveParams) -> Result<Option<Outcome>, Error> {
    solve_with(problem, &BranchAndBound::new(params.threads), params)
}

/// Solve a validated rotation problem with any search engine
pub fn solve_with<E: SearchEngine + ?Sized>(
    problem: &Problem,
    engine: &E,
    params: &SolveParams,
) -> Result<Option<Outcome>, Error> {
    info!(
        "Assigning {} students to {} companies ({} groups) over {} terms",
        problem.num_students,
        problem.num_companies,
        problem.num_groups(),
        problem.num_terms
    );
    let model = model::compile(problem)?;
    Ok(solver::solve(&model, engine, params).map(|raw| Outcome {
        plan: projection::project(&model, &raw),
        summary: projection::summarize(&model, &raw),
    }))
}
