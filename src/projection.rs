//! Interpretation of a raw solution: the rotation plan and a summary of its metrics.

use serde::{Deserialize, Serialize};

use crate::config::Variant;
use crate::model::CompiledModel;
use crate::solver::RawSolution;

/// Students of one unit, per term, in ascending student order
pub type TermAssignments = Vec<Vec<usize>>;

/// Assignment of students to units for every term
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPlan {
    /// One entry per company
    Companies(Vec<TermAssignments>),
    /// One entry per company, holding one entry per group of the company
    Groups(Vec<Vec<TermAssignments>>),
}

impl RotationPlan {
    /// The term assignments of all units, in unit order
    pub fn units(&self) -> Vec<&TermAssignments> {
        match self {
            RotationPlan::Companies(companies) => companies.iter().collect(),
            RotationPlan::Groups(companies) => companies.iter().flatten().collect(),
        }
    }
}

/// Build the rotation plan from a raw solution of `model`.
///
/// # Panics
///
/// Panics if `raw` holds fewer values than `model` has variables.
pub fn project(model: &CompiledModel, raw: &RawSolution) -> RotationPlan {
    let vars = model.vars();
    let (num_units, num_terms, num_students) = vars.dim();
    let units: Vec<TermAssignments> = (0..num_units)
        .map(|unit| {
            (0..num_terms)
                .map(|term| {
                    (0..num_students)
                        .filter(|&student| raw.value(vars.var(unit, term, student)))
                        .collect()
                })
                .collect()
        })
        .collect();

    let layout = model.layout();
    match layout.variant() {
        Variant::Simple => RotationPlan::Companies(units),
        Variant::Grouped => {
            let mut units = units.into_iter();
            RotationPlan::Groups(
                (0..layout.num_companies())
                    .map(|company| units.by_ref().take(layout.groups_of(company)).collect())
                    .collect(),
            )
        }
    }
}

/// Values of the objective and the aggregate metrics in a solution
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub objective: i64,
    /// Headcount per unit and term
    pub headcounts: Vec<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_delta: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub avg_delta: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub var_delta: Option<i64>,
    pub total_dissatisfaction: i64,
    pub avg_dissatisfaction: i64,
    pub var_dissatisfaction: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_duplicates: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub company_duplicates: Option<Vec<i64>>,
}

/// Evaluate the objective and all metrics of `model` in the raw solution
pub fn summarize(model: &CompiledModel, raw: &RawSolution) -> Summary {
    let metrics = model.metrics();
    let eval = |expr| raw.evaluate(model, expr);
    let delta = metrics.delta();
    let duplicates = metrics.duplicates();

    Summary {
        objective: eval(model.objective().expr),
        headcounts: metrics
            .headcounts
            .outer_iter()
            .map(|row| row.iter().map(|hc| eval(*hc)).collect())
            .collect(),
        total_delta: delta.map(|d| eval(d.total)),
        avg_delta: delta.map(|d| eval(d.avg)),
        var_delta: delta.map(|d| eval(d.var)),
        total_dissatisfaction: eval(metrics.dissatisfaction.total),
        avg_dissatisfaction: eval(metrics.dissatisfaction.avg),
        var_dissatisfaction: eval(metrics.dissatisfaction.var),
        total_duplicates: duplicates.map(|d| eval(d.total)),
        company_duplicates: duplicates
            .map(|d| d.company_duplicates.iter().map(|e| eval(*e)).collect()),
    }
}
