use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// Type aliases for clarity
pub type TeacherId = u32;
pub type CourseId = u32;
pub type Credits = u32;

/// The complete input for the assignment problem.
///
/// `credits[i]` is the credit weight of `courses[i]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentInput {
    pub teachers: Vec<TeacherId>,
    pub courses: Vec<CourseId>,
    /// Courses each teacher is willing to teach. Teachers missing from the map
    /// are eligible for nothing.
    pub preferences: HashMap<TeacherId, Vec<CourseId>>,
    /// Unordered pairs of courses that must go to different teachers.
    #[serde(default)]
    pub conflicts: Vec<(CourseId, CourseId)>,
    pub credits: Vec<Credits>,
}

/// Courses handed to a single teacher and the load they add up to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherLoad {
    pub teacher_id: TeacherId,
    pub courses: Vec<CourseId>,
    pub load: Credits,
}

/// A complete assignment of courses to teachers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub max_load: Credits,
    /// One entry per declared teacher, in declaration order.
    pub teachers: Vec<TeacherLoad>,
}

impl Schedule {
    /// Teacher that received `course`, if any.
    pub fn teacher_of(&self, course: CourseId) -> Option<TeacherId> {
        self.teachers
            .iter()
            .find(|t| t.courses.contains(&course))
            .map(|t| t.teacher_id)
    }

    pub fn load_of(&self, teacher: TeacherId) -> Option<Credits> {
        self.teachers
            .iter()
            .find(|t| t.teacher_id == teacher)
            .map(|t| t.load)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Minimum possible maximum load: {}", self.max_load)?;
        for teacher in &self.teachers {
            writeln!(
                f,
                "Teacher {} is assigned courses {:?} with a load of {}",
                teacher.teacher_id, teacher.courses, teacher.load
            )?;
        }
        Ok(())
    }
}

/// The final output of the solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SolveOutcome {
    /// The backend proved the schedule minimizes the maximum load.
    Optimal(Schedule),
    /// A valid schedule that was not proven optimal before a limit hit.
    Feasible(Schedule),
    /// No assignment satisfies coverage, eligibility and conflicts together.
    Infeasible,
    /// A limit stopped the backend before it found any valid schedule.
    LimitReached,
    /// The requested backend could not be created.
    SolverUnavailable { reason: String },
}

impl SolveOutcome {
    pub fn schedule(&self) -> Option<&Schedule> {
        match self {
            SolveOutcome::Optimal(schedule) | SolveOutcome::Feasible(schedule) => Some(schedule),
            _ => None,
        }
    }

    pub fn is_optimal(&self) -> bool {
        matches!(self, SolveOutcome::Optimal(_))
    }
}

impl fmt::Display for SolveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveOutcome::Optimal(schedule) => write!(f, "[optimal] {}", schedule),
            SolveOutcome::Feasible(schedule) => {
                write!(f, "[feasible, not proven optimal] {}", schedule)
            }
            SolveOutcome::Infeasible => write!(f, "No solution found: the problem is infeasible."),
            SolveOutcome::LimitReached => {
                write!(f, "No solution found before the configured limit was reached.")
            }
            SolveOutcome::SolverUnavailable { reason } => {
                write!(f, "Solver not available: {}", reason)
            }
        }
    }
}
