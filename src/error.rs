use thiserror::Error;

/// Failures of a solve request that are not legitimate solve outcomes.
///
/// Infeasibility, an exhausted limit and a missing backend are reported as
/// [`crate::data::SolveOutcome`] values instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    /// Dangling or inconsistent references in the problem input.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The backend's values disagree with the model or with themselves.
    #[error("solver inconsistency: {0}")]
    SolverInconsistency(String),

    /// The backend was created but failed while solving.
    #[error("solver failure: {0}")]
    SolverFailure(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}
