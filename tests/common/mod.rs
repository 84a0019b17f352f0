#![allow(dead_code)]

use course_assignment::data::{AssignmentInput, CourseId, Credits, Schedule, TeacherId};
use itertools::Itertools;
use std::collections::HashMap;

pub const FIXTURES: [&str; 6] = [
    "thirteen_courses",
    "even_split",
    "three_teachers_six_courses",
    "forced_split",
    "shared_fallback_teacher",
    "twenty_courses",
];

pub fn load_fixture(name: &str) -> AssignmentInput {
    let path = format!("{}/tests/fixtures/{}.json", env!("CARGO_MANIFEST_DIR"), name);
    let text = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path, e));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("{}: {}", path, e))
}

pub fn instance(
    teachers: &[TeacherId],
    credits: &[Credits],
    preferences: &[(TeacherId, &[CourseId])],
    conflicts: &[(CourseId, CourseId)],
) -> AssignmentInput {
    AssignmentInput {
        teachers: teachers.to_vec(),
        courses: (0..credits.len() as CourseId).collect(),
        preferences: preferences
            .iter()
            .map(|(t, cs)| (*t, cs.to_vec()))
            .collect(),
        conflicts: conflicts.to_vec(),
        credits: credits.to_vec(),
    }
}

fn eligible_teachers(input: &AssignmentInput, course: CourseId) -> Vec<TeacherId> {
    input
        .teachers
        .iter()
        .copied()
        .filter(|t| {
            input
                .preferences
                .get(t)
                .is_some_and(|courses| courses.contains(&course))
        })
        .collect()
}

/// Smallest achievable maximum load, by trying every eligible assignment.
/// `None` when no assignment satisfies the constraints.
pub fn brute_force_max_load(input: &AssignmentInput) -> Option<Credits> {
    assert!(!input.courses.is_empty(), "brute force needs at least one course");
    let position: HashMap<CourseId, usize> = input
        .courses
        .iter()
        .enumerate()
        .map(|(i, &c)| (c, i))
        .collect();

    input
        .courses
        .iter()
        .map(|&c| eligible_teachers(input, c))
        .multi_cartesian_product()
        .filter(|choice| {
            input
                .conflicts
                .iter()
                .all(|(i, j)| choice[position[i]] != choice[position[j]])
        })
        .map(|choice| {
            let mut loads: HashMap<TeacherId, Credits> = HashMap::new();
            for (teacher, credit) in choice.iter().zip(&input.credits) {
                *loads.entry(*teacher).or_default() += credit;
            }
            loads.values().copied().max().unwrap_or(0)
        })
        .min()
}

/// Coverage, eligibility, conflict and load laws for a returned schedule.
pub fn assert_schedule_laws(input: &AssignmentInput, schedule: &Schedule) {
    let listed: Vec<TeacherId> = schedule.teachers.iter().map(|t| t.teacher_id).collect();
    assert_eq!(listed, input.teachers, "every teacher is listed in order");

    for &course in &input.courses {
        let holders = schedule
            .teachers
            .iter()
            .filter(|t| t.courses.contains(&course))
            .count();
        assert_eq!(holders, 1, "course {} must have exactly one teacher", course);
    }

    let credit: HashMap<CourseId, Credits> = input
        .courses
        .iter()
        .copied()
        .zip(input.credits.iter().copied())
        .collect();

    for teacher in &schedule.teachers {
        let preferred = input
            .preferences
            .get(&teacher.teacher_id)
            .cloned()
            .unwrap_or_default();
        for course in &teacher.courses {
            assert!(
                preferred.contains(course),
                "teacher {} is not eligible for course {}",
                teacher.teacher_id,
                course
            );
        }
        for (i, j) in &input.conflicts {
            assert!(
                !(teacher.courses.contains(i) && teacher.courses.contains(j)),
                "teacher {} holds conflicting courses {} and {}",
                teacher.teacher_id,
                i,
                j
            );
        }
        let load: Credits = teacher.courses.iter().map(|c| credit[c]).sum();
        assert_eq!(teacher.load, load, "load of teacher {}", teacher.teacher_id);
    }

    let max = schedule.teachers.iter().map(|t| t.load).max().unwrap_or(0);
    assert_eq!(schedule.max_load, max);
}
