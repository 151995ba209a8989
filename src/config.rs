//! Input payload of a rotation assignment run and its validation into a typed [`Problem`].
//!
//! The payload mirrors the historical JSON records (camelCase field names). It is only a transport
//! representation: every field is checked once by [`Payload::validate`], which either returns a
//! `Problem` that the model builder can rely on, or a [`ConfigError`] describing the first defect
//! found. Nothing downstream re-validates the input.

use std::time::Duration;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors, detected before any model construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{what} count must be at least 1")]
    ZeroCount { what: &'static str },
    #[error("expected {expected} group counts (one per company), found {found}")]
    GroupCountMismatch { expected: usize, found: usize },
    #[error("company {company} is divided into 0 groups")]
    EmptyCompany { company: usize },
    #[error("the companies are divided into 0 groups in total")]
    NoGroups,
    #[error("{matrix} rating matrix must have {expected} rows, found {found}")]
    RatingRows {
        matrix: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("row {row} of the {matrix} rating matrix must have {expected} values, found {found}")]
    RatingColumns {
        matrix: &'static str,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("{matrix} rating [{row}][{column}] = {value} exceeds the declared maximum {max}")]
    RatingOutOfRange {
        matrix: &'static str,
        row: usize,
        column: usize,
        value: u32,
        max: u32,
    },
    #[error("the declared maximum of the {matrix} rating matrix must be at least 1")]
    ZeroRatingScale { matrix: &'static str },
    #[error("company and student rating weights must not both be 0")]
    ZeroRatingWeights,
    #[error("maxTimeout must be at least 1 second")]
    ZeroTimeout,
    #[error("headcountCap must be at least 1 when given")]
    ZeroHeadcountCap,
}

/// Which entity students are assigned to
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Units are companies, with a proportional headcount target per company
    #[default]
    Simple,
    /// Units are the groups a company is divided into, all sharing one headcount target. Seeing the
    /// same student in several groups of one company is penalized.
    Grouped,
}

/// Raw input payload as read from JSON
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub companies: CompaniesInput,
    pub students: StudentsInput,
    pub terms: TermsInput,
    pub weights: Weights,
    /// Wall-clock budget of the search in seconds
    pub max_timeout: u64,
    #[serde(default)]
    pub variant: Variant,
    #[serde(default)]
    pub headcount_cap: Option<u32>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CompaniesInput {
    pub count: usize,
    /// Number of groups each company is divided into
    pub groups: Vec<usize>,
    /// Company → student preference scores
    pub ratings: RatingsInput,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StudentsInput {
    pub count: usize,
    /// Student → company preference scores
    pub ratings: RatingsInput,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TermsInput {
    pub count: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RatingsInput {
    pub values: Vec<Vec<u32>>,
    pub weight: u32,
    /// Declared maximum raw score. Required, since a wrong scale skews every combined rating.
    pub max: u32,
}

/// Objective weights. `delta` and `satisfaction` drive the simple variant, `grouped` the grouped
/// one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Weights {
    pub delta: TermWeights,
    pub satisfaction: TermWeights,
    #[serde(default)]
    pub grouped: GroupedWeights,
}

/// Weights of one sub-objective: its total, its variance and the sub-objective as a whole
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermWeights {
    pub ttl: u32,
    pub var: u32,
    pub obj: u32,
}

/// Percent weights of the grouped variant's objective. The defaults are the historical fixed
/// values: duplicates dominate dissatisfaction 80/20, and dissatisfaction is blended from 20% mean
/// and 80% variance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupedWeights {
    pub avg_dissatisfaction: u32,
    pub var_dissatisfaction: u32,
    pub dissatisfaction: u32,
    pub duplicates: u32,
}

impl Default for GroupedWeights {
    fn default() -> Self {
        GroupedWeights {
            avg_dissatisfaction: 20,
            var_dissatisfaction: 80,
            dissatisfaction: 20,
            duplicates: 80,
        }
    }
}

/// A validated rating matrix
#[derive(Debug, Clone, PartialEq)]
pub struct RatingMatrix {
    pub values: Array2<u32>,
    pub weight: u32,
    pub max: u32,
}

/// Validated problem definition. All counts are at least 1 and all matrices have consistent shapes.
#[derive(Debug, Clone)]
pub struct Problem {
    pub num_companies: usize,
    pub num_students: usize,
    pub num_terms: usize,
    /// Number of groups per company (each ≥ 1)
    pub groups: Vec<usize>,
    /// companies × students
    pub company_ratings: RatingMatrix,
    /// students × companies
    pub student_ratings: RatingMatrix,
    pub weights: Weights,
    pub variant: Variant,
    pub headcount_cap: Option<u32>,
    pub max_timeout: Duration,
    pub seed: Option<u64>,
}

impl Problem {
    pub fn num_groups(&self) -> usize {
        self.groups.iter().sum()
    }
}

impl Payload {
    /// Check the whole payload and convert it into a [`Problem`].
    pub fn validate(self) -> Result<Problem, ConfigError> {
        let num_companies = self.companies.count;
        let num_students = self.students.count;
        let num_terms = self.terms.count;
        for (what, count) in [
            ("company", num_companies),
            ("student", num_students),
            ("term", num_terms),
        ] {
            if count == 0 {
                return Err(ConfigError::ZeroCount { what });
            }
        }

        if self.companies.groups.len() != num_companies {
            return Err(ConfigError::GroupCountMismatch {
                expected: num_companies,
                found: self.companies.groups.len(),
            });
        }
        if let Some(company) = self.companies.groups.iter().position(|g| *g == 0) {
            return Err(ConfigError::EmptyCompany { company });
        }

        let company_ratings =
            rating_matrix("company", self.companies.ratings, num_companies, num_students)?;
        let student_ratings =
            rating_matrix("student", self.students.ratings, num_students, num_companies)?;
        if company_ratings.weight == 0 && student_ratings.weight == 0 {
            return Err(ConfigError::ZeroRatingWeights);
        }

        if self.max_timeout == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.headcount_cap == Some(0) {
            return Err(ConfigError::ZeroHeadcountCap);
        }

        Ok(Problem {
            num_companies,
            num_students,
            num_terms,
            groups: self.companies.groups,
            company_ratings,
            student_ratings,
            weights: self.weights,
            variant: self.variant,
            headcount_cap: self.headcount_cap,
            max_timeout: Duration::from_secs(self.max_timeout),
            seed: self.seed,
        })
    }
}

/// Check shape and value range of a raw rating matrix and copy it into a dense array
fn rating_matrix(
    matrix: &'static str,
    input: RatingsInput,
    rows: usize,
    columns: usize,
) -> Result<RatingMatrix, ConfigError> {
    if input.max == 0 {
        return Err(ConfigError::ZeroRatingScale { matrix });
    }
    if input.values.len() != rows {
        return Err(ConfigError::RatingRows {
            matrix,
            expected: rows,
            found: input.values.len(),
        });
    }

    let mut values = Array2::<u32>::zeros([rows, columns]);
    for (row, row_values) in input.values.iter().enumerate() {
        if row_values.len() != columns {
            return Err(ConfigError::RatingColumns {
                matrix,
                row,
                expected: columns,
                found: row_values.len(),
            });
        }
        for (column, value) in row_values.iter().enumerate() {
            if *value > input.max {
                return Err(ConfigError::RatingOutOfRange {
                    matrix,
                    row,
                    column,
                    value: *value,
                    max: input.max,
                });
            }
            values[[row, column]] = *value;
        }
    }

    Ok(RatingMatrix {
        values,
        weight: input.weight,
        max: input.max,
    })
}
