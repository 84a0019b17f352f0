use crate::backend::{BackendError, BackendStatus, MilpBackend, create_backend};
use crate::config::SolverConfig;
use crate::data::{AssignmentInput, Credits, Schedule, SolveOutcome, TeacherLoad};
use crate::error::AssignmentError;
use crate::model::{Model, VarId, build_model};
use log::{debug, info, warn};
use std::time::Instant;

/// Distance from 0 or 1 within which an assignment value counts as boolean.
pub const INTEGRALITY_TOLERANCE: f64 = 1e-5;
/// Allowed gap between a recomputed load and the backend's `Y[t]` or `Z`.
pub const LOAD_TOLERANCE: f64 = 1e-4;

/// Solves the balanced assignment problem with the backend named in `config`.
///
/// Input errors come back as [`AssignmentError::MalformedInput`] before any
/// backend is created. A backend that cannot be created is an outcome
/// ([`SolveOutcome::SolverUnavailable`]), as is infeasibility.
pub fn solve(input: &AssignmentInput, config: &SolverConfig) -> Result<SolveOutcome, AssignmentError> {
    let start_time = Instant::now();
    let model = build_model(input)?;

    let backend = match create_backend(config.backend) {
        Ok(backend) => backend,
        Err(BackendError::Unavailable(reason)) => {
            warn!("Backend {} unavailable: {}", config.backend, reason);
            return Ok(SolveOutcome::SolverUnavailable { reason });
        }
        Err(BackendError::Failed(reason)) => return Err(AssignmentError::SolverFailure(reason)),
    };

    let outcome = solve_model(backend.as_ref(), &model, config)?;
    info!("Solve finished in {:.2?}", start_time.elapsed());
    Ok(outcome)
}

/// Runs an already built model on `backend` and maps the result.
pub fn solve_model(
    backend: &dyn MilpBackend,
    model: &Model,
    config: &SolverConfig,
) -> Result<SolveOutcome, AssignmentError> {
    info!(
        "Solving {} variables / {} constraints with {}...",
        model.num_variables(),
        model.num_constraints(),
        backend.name()
    );

    let solution = match backend.solve(model, config) {
        Ok(solution) => solution,
        Err(BackendError::Unavailable(reason)) => {
            return Ok(SolveOutcome::SolverUnavailable { reason });
        }
        Err(BackendError::Failed(reason)) => return Err(AssignmentError::SolverFailure(reason)),
    };
    debug!("{} reported status {}", backend.name(), solution.status);

    match solution.status {
        BackendStatus::Optimal => {
            extract_schedule(model, &solution.values, true).map(SolveOutcome::Optimal)
        }
        BackendStatus::Feasible => match extract_schedule(model, &solution.values, false) {
            Ok(schedule) => {
                warn!(
                    "Returning a schedule with max load {} that is not proven optimal.",
                    schedule.max_load
                );
                Ok(SolveOutcome::Feasible(schedule))
            }
            Err(err) => {
                warn!("Limit reached without a usable assignment: {}", err);
                Ok(SolveOutcome::LimitReached)
            }
        },
        BackendStatus::NoSolution => {
            warn!("{} stopped on a limit before finding any assignment.", backend.name());
            Ok(SolveOutcome::LimitReached)
        }
        BackendStatus::Infeasible => Ok(SolveOutcome::Infeasible),
        BackendStatus::Unbounded => Err(inconsistency(
            "backend reported the model as unbounded although every variable is bounded".to_string(),
        )),
    }
}

/// Reads the assignment out of raw backend values and cross-checks it
/// against the instance and against the backend's own `Y` and `Z`.
pub fn extract_schedule(
    model: &Model,
    values: &[f64],
    proven_optimal: bool,
) -> Result<Schedule, AssignmentError> {
    let layout = &model.layout;
    if values.len() != model.num_variables() {
        return Err(inconsistency(format!(
            "expected {} variable values, got {}",
            model.num_variables(),
            values.len()
        )));
    }
    let value = |id: VarId| values[id.index()];

    // position of the teacher holding each course
    let mut holder: Vec<Option<usize>> = vec![None; layout.courses.len()];
    let mut teachers = Vec::with_capacity(layout.teachers.len());

    for (t, &teacher) in layout.teachers.iter().enumerate() {
        let mut courses = Vec::new();
        let mut load: Credits = 0;

        for (c, &course) in layout.courses.iter().enumerate() {
            let raw = value(layout.assign_var(t, c));
            let assigned = rounded_binary(raw).ok_or_else(|| {
                inconsistency(format!(
                    "X[{}, {}] = {} is not within {} of 0 or 1",
                    teacher, course, raw, INTEGRALITY_TOLERANCE
                ))
            })?;
            if !assigned {
                continue;
            }
            if !layout.eligible[t][c] {
                return Err(inconsistency(format!(
                    "course {} assigned to teacher {} who is not eligible for it",
                    course, teacher
                )));
            }
            if let Some(other) = holder[c] {
                return Err(inconsistency(format!(
                    "course {} assigned to both teacher {} and teacher {}",
                    course, layout.teachers[other], teacher
                )));
            }
            holder[c] = Some(t);
            courses.push(course);
            load += layout.credits[c];
        }

        let reported = value(layout.load_var(t));
        if (reported - f64::from(load)).abs() > LOAD_TOLERANCE {
            return Err(inconsistency(format!(
                "teacher {} has load {} from the assignment but the solver reported {}",
                teacher, load, reported
            )));
        }

        teachers.push(TeacherLoad {
            teacher_id: teacher,
            courses,
            load,
        });
    }

    if let Some(c) = holder.iter().position(Option::is_none) {
        return Err(inconsistency(format!(
            "course {} is not assigned to any teacher",
            layout.courses[c]
        )));
    }

    for &(i, j) in &layout.conflicts {
        if holder[i] == holder[j] {
            let teacher = holder[i].map(|t| layout.teachers[t]).unwrap_or_default();
            return Err(inconsistency(format!(
                "conflicting courses {} and {} both assigned to teacher {}",
                layout.courses[i], layout.courses[j], teacher
            )));
        }
    }

    let max_load = teachers.iter().map(|t| t.load).max().unwrap_or(0);
    let reported_max = value(layout.max_load_var());
    if reported_max < f64::from(max_load) - LOAD_TOLERANCE {
        return Err(inconsistency(format!(
            "solver max load {} is below the actual maximum {}",
            reported_max, max_load
        )));
    }
    if proven_optimal && reported_max > f64::from(max_load) + LOAD_TOLERANCE {
        return Err(inconsistency(format!(
            "optimal max load {} exceeds the actual maximum {}",
            reported_max, max_load
        )));
    }

    Ok(Schedule { max_load, teachers })
}

fn rounded_binary(value: f64) -> Option<bool> {
    if value.abs() <= INTEGRALITY_TOLERANCE {
        Some(false)
    } else if (value - 1.0).abs() <= INTEGRALITY_TOLERANCE {
        Some(true)
    } else {
        None
    }
}

fn inconsistency(message: String) -> AssignmentError {
    AssignmentError::SolverInconsistency(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendKind, BackendSolution};
    use crate::data::TeacherId;
    use std::collections::HashMap;

    struct ScriptedBackend(Result<BackendSolution, BackendError>);

    impl MilpBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn solve(&self, _: &Model, _: &SolverConfig) -> Result<BackendSolution, BackendError> {
            self.0.clone()
        }
    }

    // teacher 0 may teach everything, teacher 1 only courses 0 and 1,
    // and courses 0 and 1 conflict
    fn sample_input() -> AssignmentInput {
        AssignmentInput {
            teachers: vec![0, 1],
            courses: vec![0, 1, 2],
            preferences: HashMap::from([(0, vec![0, 1, 2]), (1, vec![0, 1])]),
            conflicts: vec![(0, 1)],
            credits: vec![3, 3, 3],
        }
    }

    /// Consistent values for the given (teacher, course) positions.
    fn values_for(model: &Model, assigned: &[(usize, usize)]) -> Vec<f64> {
        let layout = &model.layout;
        let mut values = vec![0.0; model.num_variables()];
        let mut loads = vec![0.0; layout.teachers.len()];
        for &(t, c) in assigned {
            values[layout.assign_var(t, c).index()] = 1.0;
            loads[t] += f64::from(layout.credits[c]);
        }
        for (t, load) in loads.iter().enumerate() {
            values[layout.load_var(t).index()] = *load;
        }
        values[layout.max_load_var().index()] = loads.iter().cloned().fold(0.0, f64::max);
        values
    }

    fn run(model: &Model, result: Result<BackendSolution, BackendError>) -> Result<SolveOutcome, AssignmentError> {
        solve_model(&ScriptedBackend(result), model, &SolverConfig::default())
    }

    fn optimal(values: Vec<f64>) -> Result<BackendSolution, BackendError> {
        Ok(BackendSolution::new(BackendStatus::Optimal, values))
    }

    fn assert_inconsistent(outcome: Result<SolveOutcome, AssignmentError>, needle: &str) {
        match outcome {
            Err(AssignmentError::SolverInconsistency(msg)) => {
                assert!(msg.contains(needle), "unexpected message: {}", msg)
            }
            other => panic!("expected an inconsistency, got {:?}", other),
        }
    }

    fn courses_of(schedule: &Schedule, teacher: TeacherId) -> Vec<u32> {
        schedule
            .teachers
            .iter()
            .find(|t| t.teacher_id == teacher)
            .map(|t| t.courses.clone())
            .unwrap()
    }

    #[test]
    fn optimal_values_become_a_schedule() {
        let model = build_model(&sample_input()).unwrap();
        let outcome = run(&model, optimal(values_for(&model, &[(0, 0), (0, 2), (1, 1)]))).unwrap();

        let schedule = match outcome {
            SolveOutcome::Optimal(schedule) => schedule,
            other => panic!("expected optimal, got {:?}", other),
        };
        assert_eq!(schedule.max_load, 6);
        assert_eq!(courses_of(&schedule, 0), vec![0, 2]);
        assert_eq!(courses_of(&schedule, 1), vec![1]);
        assert_eq!(schedule.load_of(1), Some(3));
    }

    #[test]
    fn feasible_status_stays_distinct_from_optimal() {
        let model = build_model(&sample_input()).unwrap();
        let values = values_for(&model, &[(0, 0), (0, 2), (1, 1)]);
        let outcome = run(&model, Ok(BackendSolution::new(BackendStatus::Feasible, values))).unwrap();

        assert!(matches!(outcome, SolveOutcome::Feasible(ref s) if s.max_load == 6));
        assert!(!outcome.is_optimal());
    }

    #[test]
    fn feasible_status_without_incumbent_is_limit_reached() {
        let model = build_model(&sample_input()).unwrap();
        let values = vec![0.0; model.num_variables()];
        let outcome = run(&model, Ok(BackendSolution::new(BackendStatus::Feasible, values))).unwrap();
        assert_eq!(outcome, SolveOutcome::LimitReached);
    }

    #[test]
    fn limit_without_incumbent_is_an_outcome_not_a_failure() {
        let model = build_model(&sample_input()).unwrap();
        let outcome = run(&model, Ok(BackendSolution::without_values(BackendStatus::NoSolution)));
        assert_eq!(outcome, Ok(SolveOutcome::LimitReached));
    }

    #[test]
    fn near_integral_values_are_rounded() {
        let model = build_model(&sample_input()).unwrap();
        let mut values = values_for(&model, &[(0, 0), (0, 2), (1, 1)]);
        values[model.layout.assign_var(0, 0).index()] = 0.999_999_9;
        values[model.layout.assign_var(1, 0).index()] = 1e-7;

        let outcome = run(&model, optimal(values)).unwrap();
        assert_eq!(outcome.schedule().unwrap().max_load, 6);
    }

    #[test]
    fn fractional_assignment_is_reported() {
        let model = build_model(&sample_input()).unwrap();
        let mut values = values_for(&model, &[(0, 0), (0, 2), (1, 1)]);
        values[model.layout.assign_var(0, 0).index()] = 0.5;
        values[model.layout.assign_var(1, 0).index()] = 0.5;

        assert_inconsistent(run(&model, optimal(values)), "X[0, 0] = 0.5");
    }

    #[test]
    fn load_mismatch_is_reported() {
        let model = build_model(&sample_input()).unwrap();
        let mut values = values_for(&model, &[(0, 0), (0, 2), (1, 1)]);
        values[model.layout.load_var(0).index()] = 5.0;

        assert_inconsistent(run(&model, optimal(values)), "teacher 0 has load 6");
    }

    #[test]
    fn uncovered_course_is_reported() {
        let model = build_model(&sample_input()).unwrap();
        let values = values_for(&model, &[(0, 0), (1, 1)]);
        assert_inconsistent(run(&model, optimal(values)), "course 2 is not assigned");
    }

    #[test]
    fn double_assignment_is_reported() {
        let model = build_model(&sample_input()).unwrap();
        let values = values_for(&model, &[(0, 0), (0, 2), (1, 1), (1, 0)]);
        assert_inconsistent(run(&model, optimal(values)), "assigned to both");
    }

    #[test]
    fn ineligible_assignment_is_reported() {
        let model = build_model(&sample_input()).unwrap();
        let values = values_for(&model, &[(0, 0), (1, 1), (1, 2)]);
        assert_inconsistent(run(&model, optimal(values)), "not eligible");
    }

    #[test]
    fn conflict_violation_is_reported() {
        let model = build_model(&sample_input()).unwrap();
        let values = values_for(&model, &[(0, 0), (0, 1), (0, 2)]);
        assert_inconsistent(run(&model, optimal(values)), "conflicting courses 0 and 1");
    }

    #[test]
    fn max_load_is_checked_against_the_assignment() {
        let model = build_model(&sample_input()).unwrap();
        let z = model.layout.max_load_var().index();

        let mut low = values_for(&model, &[(0, 0), (0, 2), (1, 1)]);
        low[z] = 3.0;
        assert_inconsistent(run(&model, optimal(low)), "below the actual maximum");

        let mut high = values_for(&model, &[(0, 0), (0, 2), (1, 1)]);
        high[z] = 9.0;
        assert_inconsistent(run(&model, optimal(high.clone())), "exceeds the actual maximum");

        // a slack Z is acceptable while optimality is unproven
        let outcome = run(&model, Ok(BackendSolution::new(BackendStatus::Feasible, high))).unwrap();
        assert_eq!(outcome.schedule().unwrap().max_load, 6);
    }

    #[test]
    fn value_count_must_match_the_model() {
        let model = build_model(&sample_input()).unwrap();
        assert_inconsistent(run(&model, optimal(vec![0.0; 3])), "variable values");
    }

    #[test]
    fn terminal_statuses_map_to_outcomes() {
        let model = build_model(&sample_input()).unwrap();

        let outcome = run(&model, Ok(BackendSolution::without_values(BackendStatus::Infeasible)));
        assert_eq!(outcome, Ok(SolveOutcome::Infeasible));

        let outcome = run(&model, Ok(BackendSolution::without_values(BackendStatus::Unbounded)));
        assert_inconsistent(outcome, "unbounded");

        let outcome = run(&model, Err(BackendError::Failed("SolveError".to_string())));
        assert_eq!(outcome, Err(AssignmentError::SolverFailure("SolveError".to_string())));

        let outcome = run(&model, Err(BackendError::Unavailable("no license".to_string())));
        assert_eq!(
            outcome,
            Ok(SolveOutcome::SolverUnavailable {
                reason: "no license".to_string()
            })
        );
    }

    #[test]
    fn malformed_input_fails_before_any_backend_is_created() {
        let mut input = sample_input();
        input.conflicts.push((2, 42));
        let config = SolverConfig {
            backend: BackendKind::Cbc,
            ..SolverConfig::default()
        };
        assert!(matches!(
            solve(&input, &config),
            Err(AssignmentError::MalformedInput(_))
        ));
    }

    #[cfg(not(feature = "cbc"))]
    #[test]
    fn missing_backend_is_an_outcome() {
        let config = SolverConfig {
            backend: BackendKind::Cbc,
            ..SolverConfig::default()
        };
        let outcome = solve(&sample_input(), &config).unwrap();
        assert!(matches!(outcome, SolveOutcome::SolverUnavailable { .. }));
    }
}
