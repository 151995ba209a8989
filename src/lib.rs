//! Assignment of students to company rotation groups over several terms.
//!
//! The crate compiles a rotation problem (companies, their groups, students, terms and mutual
//! preference ratings) into an optimization model over boolean assignment variables, hands it to a
//! time-limited search engine and projects the best solution found back into a rotation plan.
//!
//! The usual entry point is [`rotation::solve`], taking a [`config::Problem`] validated from a
//! [`config::Payload`].

pub mod bab;
pub mod config;
pub mod io;
pub mod model;
pub mod projection;
pub mod ratings;
pub mod rotation;
pub mod solver;
pub mod units;

use thiserror::Error;

pub use config::{ConfigError, Payload, Problem, Variant};
pub use projection::{RotationPlan, Summary};
pub use rotation::Outcome;

/// Errors of the model compilation. Not finding a solution within the time limit is not an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("cannot average over an empty {0} aggregate")]
    EmptyAggregate(&'static str),
    #[error("objective weights too large: the objective may exceed the i64 range")]
    ObjectiveOverflow,
}
