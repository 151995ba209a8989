//! Aggregate expressions over the assignment variables: headcounts, headcount deltas,
//! dissatisfaction statistics and (grouped variant) duplicate company exposure.
//!
//! All means and variances use floor division. The delta "variance" is the mean of squared deltas,
//! i.e. the deviation from zero, since a delta already is a deviation from the target. The
//! dissatisfaction variance is a proper population variance around the (floored) mean.

use std::num::NonZeroUsize;

use log::debug;
use ndarray::{Array2, Array3};

use super::expr::{ExprId, Exprs};
use super::vars::VarSpace;
use crate::config::Variant;
use crate::ratings::CombinedRatings;
use crate::units::UnitLayout;
use crate::Error;

/// All derived metrics of a model
#[derive(Clone, Debug)]
pub struct Metrics {
    /// Headcount per (unit, term)
    pub headcounts: Array2<ExprId>,
    pub dissatisfaction: DissatisfactionMetrics,
    pub variant: VariantMetrics,
}

/// Metrics only one of the variants has
#[derive(Clone, Debug)]
pub enum VariantMetrics {
    Simple(DeltaMetrics),
    Grouped(DuplicateMetrics),
}

#[derive(Clone, Debug)]
pub struct DeltaMetrics {
    /// Headcount minus target per (unit, term)
    pub deltas: Array2<ExprId>,
    pub abs_deltas: Array2<ExprId>,
    pub total: ExprId,
    pub avg: ExprId,
    pub var: ExprId,
}

#[derive(Clone, Debug)]
pub struct DissatisfactionMetrics {
    /// `x * (100 - rating)` per (unit, term, student)
    pub assigned: Array3<ExprId>,
    pub total: ExprId,
    pub avg: ExprId,
    pub var: ExprId,
}

#[derive(Clone, Debug)]
pub struct DuplicateMetrics {
    /// Number of terms a group sees a student, per (group, student)
    pub combined_assignments: Array2<ExprId>,
    /// Excess number of groups of a company that saw the same student, per (company, student)
    pub duplicates: Array2<ExprId>,
    /// Duplicates summed per company
    pub company_duplicates: Vec<ExprId>,
    pub total: ExprId,
}

impl Metrics {
    pub fn delta(&self) -> Option<&DeltaMetrics> {
        match &self.variant {
            VariantMetrics::Simple(delta) => Some(delta),
            VariantMetrics::Grouped(_) => None,
        }
    }

    pub fn duplicates(&self) -> Option<&DuplicateMetrics> {
        match &self.variant {
            VariantMetrics::Simple(_) => None,
            VariantMetrics::Grouped(duplicates) => Some(duplicates),
        }
    }
}

/// Divisor of an aggregate, guarded against empty aggregates
fn divisor(count: usize, what: &'static str) -> Result<NonZeroUsize, Error> {
    NonZeroUsize::new(count).ok_or(Error::EmptyAggregate(what))
}

/// Build all metrics for the variant of `layout`.
pub fn build(
    exprs: &mut Exprs,
    vars: &VarSpace,
    layout: &UnitLayout,
    ratings: &CombinedRatings,
) -> Result<Metrics, Error> {
    let (num_units, num_terms, num_students) = vars.dim();
    let unit_terms = divisor(num_units * num_terms, "unit × term")?;
    let unit_term_students = divisor(vars.len(), "unit × term × student")?;

    let headcounts = Array2::from_shape_fn([num_units, num_terms], |(u, t)| {
        exprs.sum((0..num_students).map(|s| exprs_var(vars, u, t, s)))
    });

    let dissatisfaction = build_dissatisfaction(exprs, vars, ratings, unit_term_students);

    let variant = match layout.variant() {
        Variant::Simple => {
            VariantMetrics::Simple(build_deltas(exprs, &headcounts, layout, unit_terms))
        }
        Variant::Grouped => VariantMetrics::Grouped(build_duplicates(exprs, vars, layout)),
    };
    debug!("Built metrics, expression arena holds {} nodes", exprs.len());

    Ok(Metrics {
        headcounts,
        dissatisfaction,
        variant,
    })
}

fn exprs_var(vars: &VarSpace, unit: usize, term: usize, student: usize) -> ExprId {
    ExprId::of_var(vars.var(unit, term, student))
}

fn build_deltas(
    exprs: &mut Exprs,
    headcounts: &Array2<ExprId>,
    layout: &UnitLayout,
    unit_terms: NonZeroUsize,
) -> DeltaMetrics {
    let deltas = Array2::from_shape_fn(headcounts.dim(), |(u, t)| {
        exprs.offset(headcounts[[u, t]], -layout.target(u))
    });
    let abs_deltas = deltas.mapv(|d| exprs.abs(d));

    let total = exprs.sum(abs_deltas.iter().copied());
    let avg = exprs.floor_div(total, unit_terms);
    let squares: Vec<ExprId> = deltas.iter().map(|d| exprs.square(*d)).collect();
    let sum_squares = exprs.sum(squares);
    let var = exprs.floor_div(sum_squares, unit_terms);

    DeltaMetrics {
        deltas,
        abs_deltas,
        total,
        avg,
        var,
    }
}

fn build_dissatisfaction(
    exprs: &mut Exprs,
    vars: &VarSpace,
    ratings: &CombinedRatings,
    unit_term_students: NonZeroUsize,
) -> DissatisfactionMetrics {
    let assigned = Array3::from_shape_fn(vars.dim(), |(u, t, s)| {
        exprs.scale(exprs_var(vars, u, t, s), ratings.dissatisfaction(u, s))
    });

    let total = exprs.sum(assigned.iter().copied());
    let avg = exprs.floor_div(total, unit_term_students);
    let squares: Vec<ExprId> = assigned
        .iter()
        .map(|a| {
            let deviation = exprs.linear(vec![(1, *a), (-1, avg)], 0);
            exprs.square(deviation)
        })
        .collect();
    let sum_squares = exprs.sum(squares);
    let var = exprs.floor_div(sum_squares, unit_term_students);

    DissatisfactionMetrics {
        assigned,
        total,
        avg,
        var,
    }
}

fn build_duplicates(exprs: &mut Exprs, vars: &VarSpace, layout: &UnitLayout) -> DuplicateMetrics {
    let (num_units, num_terms, num_students) = vars.dim();
    let combined_assignments = Array2::from_shape_fn([num_units, num_students], |(u, s)| {
        exprs.sum((0..num_terms).map(|t| exprs_var(vars, u, t, s)))
    });

    // duplicate = [sum != 0] * [sum != 1] * (sum - 1), i.e. 0 for sums of 0 and 1, sum - 1 otherwise
    let duplicates = Array2::from_shape_fn([layout.num_companies(), num_students], |(c, s)| {
        let summed = exprs.sum(layout.units_of(c).map(|g| combined_assignments[[g, s]]));
        let seen = exprs.is_different(summed, 0);
        let not_once = exprs.is_different(summed, 1);
        let more_than_once = exprs.product(seen, not_once);
        let excess = exprs.offset(summed, -1);
        exprs.product(more_than_once, excess)
    });

    let company_duplicates: Vec<ExprId> = duplicates
        .rows()
        .into_iter()
        .map(|row| exprs.sum(row.iter().copied()))
        .collect();
    let total = exprs.sum(company_duplicates.iter().copied());

    DuplicateMetrics {
        combined_assignments,
        duplicates,
        company_duplicates,
        total,
    }
}
