//! Compilation of a rotation problem into an optimization model.
//!
//! A [`ModelBuilder`] takes the resolved units and combined ratings, allocates the decision
//! variables, builds the derived metrics, posts the business constraints and composes the objective.
//! The result is an immutable [`CompiledModel`], which is handed to a search engine by the solve
//! driver and afterwards used to interpret the engine's raw solution.

pub mod constraints;
pub mod expr;
pub mod metrics;
pub mod objective;
pub mod vars;

#[cfg(test)]
mod tests;

use log::info;

use self::constraints::Constraint;
use self::expr::Exprs;
use self::metrics::Metrics;
use self::objective::Objective;
use self::vars::VarSpace;
use crate::config::{Problem, Weights};
use crate::ratings::CombinedRatings;
use crate::units::UnitLayout;
use crate::Error;

/// Immutable optimization model of one solve
#[derive(Clone, Debug)]
pub struct CompiledModel {
    layout: UnitLayout,
    ratings: CombinedRatings,
    vars: VarSpace,
    exprs: Exprs,
    metrics: Metrics,
    constraints: Vec<Constraint>,
    objective: Objective,
}

impl CompiledModel {
    pub fn layout(&self) -> &UnitLayout {
        &self.layout
    }

    pub fn ratings(&self) -> &CombinedRatings {
        &self.ratings
    }

    pub fn vars(&self) -> &VarSpace {
        &self.vars
    }

    pub fn exprs(&self) -> &Exprs {
        &self.exprs
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Objective value of a complete assignment
    pub fn objective_value(&self, values: &[bool]) -> i64 {
        self.exprs.value(values, self.objective.expr)
    }

    /// All constraints violated by a complete assignment
    pub fn violations(&self, values: &[bool]) -> Vec<&Constraint> {
        self.constraints
            .iter()
            .filter(|c| !c.is_satisfied(values))
            .collect()
    }
}

/// Builder for a [`CompiledModel`]
pub struct ModelBuilder {
    layout: UnitLayout,
    ratings: CombinedRatings,
    num_terms: usize,
    headcount_cap: Option<u32>,
}

impl ModelBuilder {
    pub fn new(layout: UnitLayout, ratings: CombinedRatings, num_terms: usize) -> ModelBuilder {
        ModelBuilder {
            layout,
            ratings,
            num_terms,
            headcount_cap: None,
        }
    }

    /// Upper headcount bound per unit and term (simple variant only)
    pub fn headcount_cap(mut self, cap: Option<u32>) -> ModelBuilder {
        self.headcount_cap = cap;
        self
    }

    /// Build variables, metrics, constraints and objective.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::EmptyAggregate`] if there are no units, terms or students to average
    /// over, and with [`Error::ObjectiveOverflow`] if the objective or any metric could exceed the
    /// `i64` range for some assignment.
    pub fn build(self, weights: &Weights) -> Result<CompiledModel, Error> {
        let num_students = self.ratings.dim().1;
        let vars = VarSpace::new(self.layout.num_units(), self.num_terms, num_students);
        let mut exprs = Exprs::with_vars(vars.len());

        let metrics = metrics::build(&mut exprs, &vars, &self.layout, &self.ratings)?;
        let constraints = constraints::build(&vars, &self.layout, self.headcount_cap);
        let objective = objective::compose(&mut exprs, &metrics, weights);
        if !exprs.is_overflow_free(objective.expr) {
            return Err(Error::ObjectiveOverflow);
        }

        info!(
            "Compiled {:?} model: {} variables, {} constraints, {} expression nodes",
            self.layout.variant(),
            vars.len(),
            constraints.len(),
            exprs.len()
        );

        Ok(CompiledModel {
            layout: self.layout,
            ratings: self.ratings,
            vars,
            exprs,
            metrics,
            constraints,
            objective,
        })
    }
}

/// Resolve units, combine ratings and build the model of a validated problem.
pub fn compile(problem: &Problem) -> Result<CompiledModel, Error> {
    let layout = UnitLayout::resolve(&problem.groups, problem.num_students, problem.variant)?;
    let ratings =
        CombinedRatings::combine(&problem.company_ratings, &problem.student_ratings, &layout)?;
    ModelBuilder::new(layout, ratings, problem.num_terms)
        .headcount_cap(problem.headcount_cap)
        .build(&problem.weights)
}
