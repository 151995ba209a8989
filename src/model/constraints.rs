//! The hard business rules, posted as cardinality constraints over the assignment variables.
//!
//! No symmetry breaking is done: interchangeable units stay interchangeable for the search.

use log::warn;

use super::vars::{VarId, VarSpace};
use crate::config::Variant;
use crate::units::UnitLayout;

/// Comparison of a constraint's variable sum with its right-hand side
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Le,
    Ge,
}

/// The business rule a constraint was posted for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    /// In every term, a student is assigned to exactly one unit
    OneUnitPerTerm { term: usize, student: usize },
    /// A unit sees each student in at most one term
    OncePerUnit { unit: usize, student: usize },
    /// Lower headcount bound of a unit in a term
    HeadcountFloor { unit: usize, term: usize },
    /// Upper headcount bound of a unit in a term
    HeadcountCap { unit: usize, term: usize },
}

/// `sum(vars) <relation> rhs`, with every variable boolean
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub vars: Vec<VarId>,
    pub relation: Relation,
    pub rhs: i64,
}

impl Constraint {
    /// Check the constraint against a complete assignment
    pub fn is_satisfied(&self, values: &[bool]) -> bool {
        let sum = self.vars.iter().filter(|v| values[v.index()]).count() as i64;
        match self.relation {
            Relation::Eq => sum == self.rhs,
            Relation::Le => sum <= self.rhs,
            Relation::Ge => sum >= self.rhs,
        }
    }
}

/// Post all business constraints for the units of `layout`.
///
/// `headcount_cap` is an optional upper headcount bound for the simple variant. The grouped
/// variant always bounds headcounts to `target ..= target + 1`.
pub fn build(vars: &VarSpace, layout: &UnitLayout, headcount_cap: Option<u32>) -> Vec<Constraint> {
    let (num_units, num_terms, num_students) = vars.dim();
    let mut constraints = Vec::new();

    for term in 0..num_terms {
        for student in 0..num_students {
            constraints.push(Constraint {
                kind: ConstraintKind::OneUnitPerTerm { term, student },
                vars: (0..num_units).map(|u| vars.var(u, term, student)).collect(),
                relation: Relation::Eq,
                rhs: 1,
            });
        }
    }

    for unit in 0..num_units {
        for student in 0..num_students {
            constraints.push(Constraint {
                kind: ConstraintKind::OncePerUnit { unit, student },
                vars: (0..num_terms).map(|t| vars.var(unit, t, student)).collect(),
                relation: Relation::Le,
                rhs: 1,
            });
        }
    }

    let cap = match layout.variant() {
        Variant::Simple => headcount_cap.map(|cap| cap as i64),
        Variant::Grouped => {
            if headcount_cap.is_some() {
                warn!("headcountCap is ignored by the grouped variant");
            }
            None
        }
    };
    for unit in 0..num_units {
        let floor = layout.headcount_floor(unit);
        let upper = match layout.variant() {
            Variant::Simple => cap,
            Variant::Grouped => Some(layout.target(unit) + 1),
        };
        if let Some(upper) = upper {
            if floor > upper {
                warn!(
                    "Headcount floor {} of unit {} exceeds its cap {}. No solution will be found.",
                    floor, unit, upper
                );
            }
        }
        for term in 0..num_terms {
            let unit_vars: Vec<VarId> =
                (0..num_students).map(|s| vars.var(unit, term, s)).collect();
            if let Some(upper) = upper {
                constraints.push(Constraint {
                    kind: ConstraintKind::HeadcountCap { unit, term },
                    vars: unit_vars.clone(),
                    relation: Relation::Le,
                    rhs: upper,
                });
            }
            constraints.push(Constraint {
                kind: ConstraintKind::HeadcountFloor { unit, term },
                vars: unit_vars,
                relation: Relation::Ge,
                rhs: floor,
            });
        }
    }

    constraints
}
