//! Composition of the scalar objective from the derived metrics.

use std::num::NonZeroUsize;

use super::expr::{ExprId, Exprs};
use super::metrics::{Metrics, VariantMetrics};
use crate::config::Weights;

const PERCENT: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(n) => n,
    None => unreachable!(),
};

/// Minimization target of a model. A new solution is only accepted if it improves the objective by
/// at least `step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Objective {
    pub expr: ExprId,
    pub step: i64,
}

/// Build the objective for the variant the metrics were built for.
///
/// Simple variant:
/// `delta.obj * (delta.ttl * TotalDelta + delta.var * VarDelta)
///  + satisfaction.obj * (satisfaction.ttl * TotalDissatisfaction + satisfaction.var * VarDissatisfaction)`
///
/// Grouped variant, with integer percent weights:
/// `dissatisfaction = (avg * 100 * AvgDissatisfaction + var * VarDissatisfaction) / 100`,
/// `objective = (duplicates * TotalDuplicates + dissatisfaction_weight * dissatisfaction) / 100`
pub fn compose(exprs: &mut Exprs, metrics: &Metrics, weights: &Weights) -> Objective {
    let dissatisfaction = &metrics.dissatisfaction;
    let expr = match &metrics.variant {
        VariantMetrics::Simple(delta) => {
            let w = &weights.delta;
            let delta_objective = exprs.linear(
                vec![(w.ttl as i64, delta.total), (w.var as i64, delta.var)],
                0,
            );
            let w = &weights.satisfaction;
            let dissatisfaction_objective = exprs.linear(
                vec![
                    (w.ttl as i64, dissatisfaction.total),
                    (w.var as i64, dissatisfaction.var),
                ],
                0,
            );
            exprs.linear(
                vec![
                    (weights.delta.obj as i64, delta_objective),
                    (weights.satisfaction.obj as i64, dissatisfaction_objective),
                ],
                0,
            )
        }
        VariantMetrics::Grouped(duplicates) => {
            let w = &weights.grouped;
            let blended = exprs.linear(
                vec![
                    (w.avg_dissatisfaction as i64 * 100, dissatisfaction.avg),
                    (w.var_dissatisfaction as i64, dissatisfaction.var),
                ],
                0,
            );
            let dissatisfaction_objective = exprs.floor_div(blended, PERCENT);
            let blended = exprs.linear(
                vec![
                    (w.duplicates as i64, duplicates.total),
                    (w.dissatisfaction as i64, dissatisfaction_objective),
                ],
                0,
            );
            exprs.floor_div(blended, PERCENT)
        }
    };

    Objective { expr, step: 1 }
}

