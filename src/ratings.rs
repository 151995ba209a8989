//! Normalization of the two raw preference matrices into one combined rating per unit and student.

use ndarray::Array2;

use crate::config::{ConfigError, RatingMatrix};
use crate::units::UnitLayout;

/// Upper end of the combined rating scale
pub const MAX_RATING: i64 = 100;

/// Convert a raw score on the scale `[0, max]` into percent, rounding down.
pub fn percent(raw: u32, max: u32) -> i64 {
    raw as i64 * MAX_RATING / max as i64
}

/// Combined 0–100 ratings, one per (unit, student)
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedRatings {
    ratings: Array2<i64>,
}

impl CombinedRatings {
    /// Blend company → student and student → company ratings for every unit of the layout. A unit
    /// inherits the ratings of its owning company.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError::ZeroRatingWeights`] if both matrix weights are 0.
    pub fn combine(
        companies: &RatingMatrix,
        students: &RatingMatrix,
        layout: &UnitLayout,
    ) -> Result<CombinedRatings, ConfigError> {
        let total_weight = companies.weight as i64 + students.weight as i64;
        if total_weight == 0 {
            return Err(ConfigError::ZeroRatingWeights);
        }

        let num_students = companies.values.dim().1;
        let mut ratings = Array2::<i64>::zeros([layout.num_units(), num_students]);
        for ((unit, student), rating) in ratings.indexed_iter_mut() {
            let company = layout.company_of(unit);
            let c = percent(companies.values[[company, student]], companies.max);
            let s = percent(students.values[[student, company]], students.max);
            *rating = (companies.weight as i64 * c + students.weight as i64 * s) / total_weight;
        }

        Ok(CombinedRatings { ratings })
    }

    pub fn get(&self, unit: usize, student: usize) -> i64 {
        self.ratings[[unit, student]]
    }

    /// Dissatisfaction of `student` when assigned to `unit`, i.e. `100 - rating`
    pub fn dissatisfaction(&self, unit: usize, student: usize) -> i64 {
        MAX_RATING - self.get(unit, student)
    }

    /// Dimension as (units, students)
    pub fn dim(&self) -> (usize, usize) {
        self.ratings.dim()
    }
}
