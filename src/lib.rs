//! Balanced course-to-teacher assignment as a min-max integer program.
//!
//! [`model::build_model`] turns an [`data::AssignmentInput`] into a
//! solver-neutral [`model::Model`]; [`solver::solve`] runs it on a
//! [`backend::MilpBackend`] and returns a [`data::SolveOutcome`].

pub mod backend;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod server;
pub mod solver;

pub use backend::{BackendKind, MilpBackend};
pub use config::{ServerConfig, SolverConfig};
pub use data::{AssignmentInput, Schedule, SolveOutcome, TeacherLoad};
pub use error::AssignmentError;
pub use model::{Model, build_model};
pub use solver::{solve, solve_model};
