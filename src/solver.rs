use crate::backend::{Backend, HighsBackend, SolveOutcome};
use crate::config::SolverConfig;
use crate::data::{
    Assignment, CourseSection, Instructor, ResultStatus, Room, TimePattern, UnmetPreference,
};
use crate::feasibility::pre_check;
use crate::model::{
    AssignmentModel, ModelBuilder, PATTERN_PREFERENCE_WEIGHT, ROOM_PREFERENCE_WEIGHT,
};
use log::{info, warn};
use std::time::Instant;

pub const NO_FEASIBLE_SOLUTION: &str = "No feasible solution found.";
pub const TIME_LIMIT_REACHED: &str = "No feasible solution found within time limit";

/// Solves with the HiGHS backend and the default configuration.
pub fn solve(
    instructors: &[Instructor],
    patterns: &[TimePattern],
    rooms: &[Room],
    sections: &[CourseSection],
) -> ResultStatus {
    Scheduler::new(HighsBackend::new(SolverConfig::default()))
        .solve(instructors, patterns, rooms, sections)
}

/// Pre-check, build, solve, extract. Every call builds a fresh model.
#[derive(Debug, Clone)]
pub struct Scheduler<B> {
    backend: B,
}

impl<B: Backend> Scheduler<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn solve(
        &self,
        instructors: &[Instructor],
        patterns: &[TimePattern],
        rooms: &[Room],
        sections: &[CourseSection],
    ) -> ResultStatus {
        let start_time = Instant::now();
        if let Err(e) = pre_check(instructors, patterns, rooms, sections) {
            warn!("Pre-check rejected the input: {e}");
            return ResultStatus::failed(e.to_string());
        }
        if sections.is_empty() {
            info!("No course sections to schedule.");
            return ResultStatus::success(Vec::new(), 0, Vec::new());
        }

        let model = ModelBuilder::new(instructors, patterns, rooms, sections).build();
        let outcome = match self.backend.solve(&model.program) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Backend {} failed: {e}", self.backend.name());
                return ResultStatus::failed(format!("Solver error: {e}"));
            }
        };

        let values = match outcome {
            SolveOutcome::Optimal(values) => values,
            SolveOutcome::Feasible(values) => {
                info!("Limit reached, returning the best schedule found so far.");
                values
            }
            SolveOutcome::Infeasible => {
                warn!("{NO_FEASIBLE_SOLUTION}");
                return ResultStatus::failed(NO_FEASIBLE_SOLUTION);
            }
            SolveOutcome::LimitReached => {
                warn!("{TIME_LIMIT_REACHED}");
                return ResultStatus::failed(TIME_LIMIT_REACHED);
            }
        };

        if values.len() != model.program.num_vars() {
            warn!(
                "Backend {} returned {} values for {} variables.",
                self.backend.name(),
                values.len(),
                model.program.num_vars()
            );
            return ResultStatus::failed(NO_FEASIBLE_SOLUTION);
        }
        if !model.program.is_feasible(&values) {
            warn!(
                "Backend {} returned an assignment violating {} constraints.",
                self.backend.name(),
                model.program.violated_constraints(&values).len()
            );
            return ResultStatus::failed(NO_FEASIBLE_SOLUTION);
        }

        let Some(results) = extract(&model, &values, instructors, patterns, rooms, sections) else {
            warn!("Some section has no unique assignment in the returned solution.");
            return ResultStatus::failed(NO_FEASIBLE_SOLUTION);
        };
        let (penalty, unmet) = unmet_preferences(&results);
        debug_assert_eq!(penalty, model.program.objective_value(&values));
        info!(
            "Scheduled {} sections with penalty {} in {:.2?}",
            results.len(),
            penalty,
            start_time.elapsed()
        );
        ResultStatus::success(results, penalty, unmet)
    }
}

/// Materialises one assignment per section from the true variable of its block.
fn extract(
    model: &AssignmentModel,
    values: &[bool],
    instructors: &[Instructor],
    patterns: &[TimePattern],
    rooms: &[Room],
    sections: &[CourseSection],
) -> Option<Vec<Assignment>> {
    let index = model.index;
    let mut results = Vec::with_capacity(sections.len());
    for (c, section) in sections.iter().enumerate() {
        let mut chosen = index.course_vars(c).filter(|&var| values[var]);
        let var = chosen.next()?;
        if chosen.next().is_some() {
            return None;
        }
        let quad = index.decode(var);
        results.push(Assignment {
            course_section: section.clone(),
            instructor: instructors[quad.instructor].clone(),
            room: rooms[quad.room].clone(),
            pattern: patterns[quad.pattern].clone(),
            pattern_index: quad.pattern,
        });
    }
    Some(results)
}

/// Weighted soft-violation total and one entry per violation.
pub fn unmet_preferences(assignments: &[Assignment]) -> (i64, Vec<UnmetPreference>) {
    let mut penalty = 0;
    let mut unmet = Vec::new();

    for assignment in assignments {
        let section = &assignment.course_section;
        if !assignment.room.permits(&section.department) {
            penalty += ROOM_PREFERENCE_WEIGHT;
            unmet.push(UnmetPreference {
                constraint_type: "Preferred Room".to_string(),
                description: format!(
                    "Section {} ({}) is in room {}, which does not list that department.",
                    section.section_display_name(),
                    section.department,
                    assignment.room.name
                ),
            });
        }
        if !section.prefers_pattern(assignment.pattern_index) {
            penalty += PATTERN_PREFERENCE_WEIGHT;
            unmet.push(UnmetPreference {
                constraint_type: "Preferred Time Pattern".to_string(),
                description: format!(
                    "Section {} is scheduled at pattern {}, preferred were {:?}.",
                    section.section_display_name(),
                    assignment.pattern_index + 1,
                    section.preferred_timeslots
                ),
            });
        }
    }

    (penalty, unmet)
}
