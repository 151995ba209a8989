//! Resolution of the assignable units and their target headcounts.
//!
//! In the simple variant every company is one unit. In the grouped variant every company owns a
//! contiguous range of group units, in company order. Either way the layout keeps a back-reference
//! from unit to owning company, so that ratings and the duplicate metric can be expressed per unit.

use std::ops::Range;

use crate::config::{ConfigError, Variant};

/// Assignable units of one solve, with their owning companies and target headcounts
#[derive(Debug, Clone, PartialEq)]
pub struct UnitLayout {
    variant: Variant,
    /// Number of groups requested per company
    groups: Vec<usize>,
    /// Unit indexes owned by each company
    company_units: Vec<Range<usize>>,
    /// Owning company of each unit
    unit_company: Vec<usize>,
    /// Target headcount of each unit per term
    targets: Vec<i64>,
}

impl UnitLayout {
    /// Build the unit layout for `groups` (number of groups per company) and compute the target
    /// headcounts.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError::NoGroups`], if the companies have no groups at all.
    pub fn resolve(
        groups: &[usize],
        num_students: usize,
        variant: Variant,
    ) -> Result<UnitLayout, ConfigError> {
        let total_groups: usize = groups.iter().sum();
        if total_groups == 0 {
            return Err(ConfigError::NoGroups);
        }

        let mut company_units = Vec::with_capacity(groups.len());
        let mut unit_company = Vec::new();
        let targets;
        match variant {
            Variant::Simple => {
                for company in 0..groups.len() {
                    company_units.push(company..company + 1);
                    unit_company.push(company);
                }
                let share = num_students as f64 / total_groups as f64;
                targets = groups
                    .iter()
                    .map(|g| (*g as f64 * share).round_ties_even() as i64)
                    .collect();
            }
            Variant::Grouped => {
                let mut next = 0;
                for (company, g) in groups.iter().enumerate() {
                    company_units.push(next..next + g);
                    unit_company.extend(std::iter::repeat(company).take(*g));
                    next += g;
                }
                let target = (num_students / total_groups) as i64;
                targets = vec![target; total_groups];
            }
        }

        Ok(UnitLayout {
            variant,
            groups: groups.to_vec(),
            company_units,
            unit_company,
            targets,
        })
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn num_units(&self) -> usize {
        self.unit_company.len()
    }

    pub fn num_companies(&self) -> usize {
        self.company_units.len()
    }

    /// Owning company of `unit`
    pub fn company_of(&self, unit: usize) -> usize {
        self.unit_company[unit]
    }

    /// Units owned by `company`
    pub fn units_of(&self, company: usize) -> Range<usize> {
        self.company_units[company].clone()
    }

    /// Number of groups configured for `company`
    pub fn groups_of(&self, company: usize) -> usize {
        self.groups[company]
    }

    pub fn target(&self, unit: usize) -> i64 {
        self.targets[unit]
    }

    pub fn targets(&self) -> &[i64] {
        &self.targets
    }

    /// Smallest target headcount over all units
    pub fn min_target(&self) -> i64 {
        self.targets.iter().copied().min().unwrap_or(0)
    }

    /// Lower bound of the headcount of `unit` in every term.
    ///
    /// Simple variant: the smallest target, but never more than the number of groups of the
    /// owning company, so small companies are not starved. Grouped variant: the shared target.
    pub fn headcount_floor(&self, unit: usize) -> i64 {
        match self.variant {
            Variant::Simple => self
                .min_target()
                .min(self.groups_of(self.company_of(unit)) as i64),
            Variant::Grouped => self.targets[unit],
        }
    }
}
