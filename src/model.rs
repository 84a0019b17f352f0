use crate::data::{AssignmentInput, CourseId, Credits, TeacherId};
use crate::error::AssignmentError;
use itertools::Itertools;
use log::{info, trace};
use std::collections::HashMap;

/// Index of a variable in [`Model::variables`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Binary,
    Integer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    pub kind: VariableKind,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    LessOrEqual,
    Equal,
    GreaterOrEqual,
}

/// `sum(coefficient * variable) <sense> rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

/// Where each decision variable lives, plus the validated instance the
/// solution gets checked against.
#[derive(Debug, Clone)]
pub struct ModelLayout {
    pub teachers: Vec<TeacherId>,
    pub courses: Vec<CourseId>,
    pub credits: Vec<Credits>,
    pub total_credits: Credits,
    /// `eligible[t][c]` by position in `teachers` / `courses`.
    pub eligible: Vec<Vec<bool>>,
    /// Conflict pairs as positions in `courses`.
    pub conflicts: Vec<(usize, usize)>,
    assign: Vec<VarId>,
    load: Vec<VarId>,
    max_load: VarId,
}

impl ModelLayout {
    /// `X[t,c]`, addressed by positions.
    pub fn assign_var(&self, teacher: usize, course: usize) -> VarId {
        self.assign[teacher * self.courses.len() + course]
    }

    /// `Y[t]`
    pub fn load_var(&self, teacher: usize) -> VarId {
        self.load[teacher]
    }

    /// `Z`
    pub fn max_load_var(&self) -> VarId {
        self.max_load
    }
}

/// Solver-neutral mixed-integer program. The objective is always minimised.
#[derive(Debug, Clone)]
pub struct Model {
    pub variables: Vec<VariableDef>,
    pub constraints: Vec<LinearConstraint>,
    pub objective: Vec<(VarId, f64)>,
    pub layout: ModelLayout,
}

impl Model {
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn variable(&self, id: VarId) -> &VariableDef {
        &self.variables[id.index()]
    }
}

#[derive(Default)]
struct ModelBuilder {
    variables: Vec<VariableDef>,
    constraints: Vec<LinearConstraint>,
}

impl ModelBuilder {
    fn add_variable(&mut self, name: String, kind: VariableKind, lower: f64, upper: f64) -> VarId {
        self.variables.push(VariableDef {
            name,
            kind,
            lower,
            upper,
        });
        VarId(self.variables.len() - 1)
    }

    fn add_constraint(&mut self, name: String, terms: Vec<(VarId, f64)>, sense: Sense, rhs: f64) {
        self.constraints.push(LinearConstraint {
            name,
            terms,
            sense,
            rhs,
        });
    }
}

/// Translates a problem instance into the min-max assignment program.
///
/// Variables are `X[t,c]` (binary, teacher t teaches course c), `Y[t]`
/// (integer load of t) and `Z` (integer maximum load), with `Y` and `Z`
/// bounded by the total of all credits. Constraints are added in this order:
/// coverage, eligibility, conflict exclusion, load definition and max-load
/// linkage. The objective is `min Z`.
pub fn build_model(input: &AssignmentInput) -> Result<Model, AssignmentError> {
    let instance = validate(input)?;
    let num_teachers = instance.teachers.len();
    let num_courses = instance.courses.len();
    let bound = f64::from(instance.total_credits);

    info!(
        "Building assignment model with {} teachers, {} courses and {} conflicts...",
        num_teachers,
        num_courses,
        instance.conflicts.len()
    );

    let mut builder = ModelBuilder::default();

    let assign: Vec<VarId> = instance
        .teachers
        .iter()
        .cartesian_product(instance.courses.iter())
        .map(|(t, c)| builder.add_variable(format!("X_{}_{}", t, c), VariableKind::Binary, 0.0, 1.0))
        .collect();
    let load: Vec<VarId> = instance
        .teachers
        .iter()
        .map(|t| builder.add_variable(format!("Y_{}", t), VariableKind::Integer, 0.0, bound))
        .collect();
    let max_load = builder.add_variable("Z".to_string(), VariableKind::Integer, 0.0, bound);

    let layout = ModelLayout {
        teachers: instance.teachers,
        courses: instance.courses,
        credits: instance.credits,
        total_credits: instance.total_credits,
        eligible: instance.eligible,
        conflicts: instance.conflicts,
        assign,
        load,
        max_load,
    };
    trace!(
        "Declared {} variables ({} assignment, {} load, 1 max-load).",
        builder.variables.len(),
        num_teachers * num_courses,
        num_teachers
    );

    // each course goes to exactly one teacher
    for (c, course) in layout.courses.iter().enumerate() {
        let terms = (0..num_teachers)
            .map(|t| (layout.assign_var(t, c), 1.0))
            .collect();
        builder.add_constraint(format!("cover_{}", course), terms, Sense::Equal, 1.0);
    }

    // teachers only get courses from their preference list
    for (t, teacher) in layout.teachers.iter().enumerate() {
        for (c, course) in layout.courses.iter().enumerate() {
            if !layout.eligible[t][c] {
                builder.add_constraint(
                    format!("eligible_{}_{}", teacher, course),
                    vec![(layout.assign_var(t, c), 1.0)],
                    Sense::Equal,
                    0.0,
                );
            }
        }
    }

    // no teacher holds both courses of a conflicting pair
    for &(i, j) in &layout.conflicts {
        for (t, teacher) in layout.teachers.iter().enumerate() {
            builder.add_constraint(
                format!(
                    "conflict_{}_{}_{}",
                    teacher, layout.courses[i], layout.courses[j]
                ),
                vec![(layout.assign_var(t, i), 1.0), (layout.assign_var(t, j), 1.0)],
                Sense::LessOrEqual,
                1.0,
            );
        }
    }

    // Y[t] - sum(credit[c] * X[t,c]) = 0
    for (t, teacher) in layout.teachers.iter().enumerate() {
        let mut terms = vec![(layout.load_var(t), 1.0)];
        terms.extend(
            layout
                .credits
                .iter()
                .enumerate()
                .map(|(c, &credit)| (layout.assign_var(t, c), -f64::from(credit))),
        );
        builder.add_constraint(format!("load_{}", teacher), terms, Sense::Equal, 0.0);
    }

    // Z - Y[t] >= 0
    for (t, teacher) in layout.teachers.iter().enumerate() {
        builder.add_constraint(
            format!("max_load_{}", teacher),
            vec![(layout.max_load_var(), 1.0), (layout.load_var(t), -1.0)],
            Sense::GreaterOrEqual,
            0.0,
        );
    }

    info!(
        "Model ready: {} variables, {} constraints, load bound {}.",
        builder.variables.len(),
        builder.constraints.len(),
        layout.total_credits
    );

    Ok(Model {
        variables: builder.variables,
        constraints: builder.constraints,
        objective: vec![(layout.max_load_var(), 1.0)],
        layout,
    })
}

struct ValidatedInstance {
    teachers: Vec<TeacherId>,
    courses: Vec<CourseId>,
    credits: Vec<Credits>,
    total_credits: Credits,
    eligible: Vec<Vec<bool>>,
    conflicts: Vec<(usize, usize)>,
}

fn validate(input: &AssignmentInput) -> Result<ValidatedInstance, AssignmentError> {
    let malformed = |msg: String| AssignmentError::MalformedInput(msg);

    if input.credits.len() != input.courses.len() {
        return Err(malformed(format!(
            "{} courses declared but {} credit weights given",
            input.courses.len(),
            input.credits.len()
        )));
    }

    let teacher_pos: HashMap<TeacherId, usize> = input
        .teachers
        .iter()
        .enumerate()
        .map(|(i, &t)| (t, i))
        .collect();
    if teacher_pos.len() != input.teachers.len() {
        let dup = input.teachers.iter().duplicates().join(", ");
        return Err(malformed(format!("duplicate teacher ids: {}", dup)));
    }

    let course_pos: HashMap<CourseId, usize> = input
        .courses
        .iter()
        .enumerate()
        .map(|(i, &c)| (c, i))
        .collect();
    if course_pos.len() != input.courses.len() {
        let dup = input.courses.iter().duplicates().join(", ");
        return Err(malformed(format!("duplicate course ids: {}", dup)));
    }

    let total_credits = input
        .credits
        .iter()
        .try_fold(0 as Credits, |acc, &c| acc.checked_add(c))
        .ok_or_else(|| malformed("total credit weight overflows".to_string()))?;

    let mut eligible = vec![vec![false; input.courses.len()]; input.teachers.len()];
    // sorted so the first reported dangling reference is stable
    for (teacher, courses) in input.preferences.iter().sorted_by_key(|(t, _)| **t) {
        let t = *teacher_pos.get(teacher).ok_or_else(|| {
            malformed(format!("preferences reference undeclared teacher {}", teacher))
        })?;
        for course in courses {
            let c = *course_pos.get(course).ok_or_else(|| {
                malformed(format!(
                    "preferences of teacher {} reference undeclared course {}",
                    teacher, course
                ))
            })?;
            eligible[t][c] = true;
        }
    }

    let conflicts = input
        .conflicts
        .iter()
        .map(|&(i, j)| match (course_pos.get(&i), course_pos.get(&j)) {
            (Some(&a), Some(&b)) => Ok((a, b)),
            _ => Err(malformed(format!(
                "conflict ({}, {}) references an undeclared course",
                i, j
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let unteachable = (0..input.courses.len())
        .filter(|&c| eligible.iter().all(|row| !row[c]))
        .count();
    if unteachable > 0 {
        trace!(
            "{} courses have no eligible teacher; the model will be infeasible.",
            unteachable
        );
    }

    Ok(ValidatedInstance {
        teachers: input.teachers.clone(),
        courses: input.courses.clone(),
        credits: input.credits.clone(),
        total_credits,
        eligible,
        conflicts,
    })
}
