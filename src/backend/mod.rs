// MILP backends behind a narrow trait so the adapter never touches a solver
// library directly.

#[cfg(feature = "cbc")]
pub mod cbc;
pub mod highs;

use crate::config::SolverConfig;
use crate::model::{Model, Sense, VariableKind};
use good_lp::solvers::SolutionStatus;
use good_lp::{
    Constraint, Expression, ProblemVariables, ResolutionError, Solution, Variable, constraint,
    variable,
};
use log::trace;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use highs::HighsBackend;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend cannot be created in this build or environment.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend failed: {0}")]
    Failed(String),
}

/// Terminal status reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Optimal,
    /// Stopped on a limit; values hold the incumbent if one exists.
    Feasible,
    Infeasible,
    Unbounded,
    /// Stopped on a limit before any incumbent was found; no values.
    NoSolution,
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendStatus::Optimal => write!(f, "Optimal"),
            BackendStatus::Feasible => write!(f, "Feasible"),
            BackendStatus::Infeasible => write!(f, "Infeasible"),
            BackendStatus::Unbounded => write!(f, "Unbounded"),
            BackendStatus::NoSolution => write!(f, "No solution found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendSolution {
    pub status: BackendStatus,
    /// One value per model variable, empty unless Optimal or Feasible.
    pub values: Vec<f64>,
}

impl BackendSolution {
    pub fn new(status: BackendStatus, values: Vec<f64>) -> Self {
        Self { status, values }
    }

    pub fn without_values(status: BackendStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
        }
    }
}

/// A mixed-integer solver able to minimise a [`Model`].
pub trait MilpBackend: Send + Sync {
    fn name(&self) -> &str;

    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<BackendSolution, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Highs,
    Cbc,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Highs, BackendKind::Cbc];

    pub fn is_available(self) -> bool {
        match self {
            BackendKind::Highs => true,
            BackendKind::Cbc => cfg!(feature = "cbc"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Highs => write!(f, "HiGHS"),
            BackendKind::Cbc => write!(f, "COIN-OR CBC"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "highs" => Ok(BackendKind::Highs),
            "cbc" | "coin_cbc" => Ok(BackendKind::Cbc),
            other => Err(format!("unknown backend '{}', expected 'highs' or 'cbc'", other)),
        }
    }
}

/// Instantiate the backend for `kind`.
pub fn create_backend(kind: BackendKind) -> Result<Box<dyn MilpBackend>, BackendError> {
    match kind {
        BackendKind::Highs => Ok(Box::new(HighsBackend::new())),
        #[cfg(feature = "cbc")]
        BackendKind::Cbc => Ok(Box::new(cbc::CbcBackend::new())),
        #[cfg(not(feature = "cbc"))]
        BackendKind::Cbc => Err(BackendError::Unavailable(
            "COIN-OR CBC support was not compiled in (enable the `cbc` feature)".to_string(),
        )),
    }
}

/// A [`Model`] expressed in `good_lp` terms, ready for any of its solvers.
pub(crate) struct LpProblem {
    pub problem: ProblemVariables,
    pub variables: Vec<Variable>,
    pub objective: Expression,
    pub constraints: Vec<Constraint>,
}

pub(crate) fn translate(model: &Model) -> LpProblem {
    let mut problem = ProblemVariables::new();
    let variables: Vec<Variable> = model
        .variables
        .iter()
        .map(|def| {
            let definition = match def.kind {
                VariableKind::Binary => variable().binary(),
                VariableKind::Integer => variable().integer().min(def.lower).max(def.upper),
            };
            problem.add(definition.name(def.name.clone()))
        })
        .collect();

    let linear = |terms: &[(crate::model::VarId, f64)]| -> Expression {
        terms
            .iter()
            .map(|&(var, coefficient)| coefficient * variables[var.index()])
            .sum()
    };

    let objective = linear(&model.objective);
    let constraints = model
        .constraints
        .iter()
        .map(|row| {
            let lhs = linear(&row.terms);
            let rhs = row.rhs;
            match row.sense {
                Sense::LessOrEqual => constraint!(lhs <= rhs),
                Sense::Equal => constraint!(lhs == rhs),
                Sense::GreaterOrEqual => constraint!(lhs >= rhs),
            }
        })
        .collect();
    trace!(
        "Translated model into {} good_lp variables and {} constraints.",
        variables.len(),
        model.constraints.len()
    );

    LpProblem {
        problem,
        variables,
        objective,
        constraints,
    }
}

/// Map a `good_lp` resolution into a [`BackendSolution`].
pub(crate) fn collect<S: Solution>(
    result: Result<S, ResolutionError>,
    variables: &[Variable],
) -> Result<BackendSolution, BackendError> {
    match result {
        Ok(solution) => {
            let status = match solution.status() {
                SolutionStatus::Optimal => BackendStatus::Optimal,
                _ => BackendStatus::Feasible,
            };
            let values = variables.iter().map(|&v| solution.value(v)).collect();
            Ok(BackendSolution::new(status, values))
        }
        Err(e) => resolution_failure(e),
    }
}

/// Terminal `good_lp` errors that still describe a legitimate outcome.
pub(crate) fn resolution_failure(error: ResolutionError) -> Result<BackendSolution, BackendError> {
    match error {
        ResolutionError::Infeasible => Ok(BackendSolution::without_values(BackendStatus::Infeasible)),
        ResolutionError::Unbounded => Ok(BackendSolution::without_values(BackendStatus::Unbounded)),
        // HiGHS hit a time, iteration or interrupt limit without an incumbent
        ResolutionError::Other("NoSolutionFound") => {
            Ok(BackendSolution::without_values(BackendStatus::NoSolution))
        }
        e => Err(BackendError::Failed(e.to_string())),
    }
}
