//! Constraint model construction.
//!
//! One boolean variable exists per (course section, instructor, room, pattern)
//! quadruple. Variables live in a dense range addressed by [`VarIndex`]; hard
//! constraints and the soft-preference objective are accumulated by
//! [`ModelBuilder`] into an immutable [`LinearProgram`] that any
//! [`Backend`](crate::backend::Backend) can solve.

use crate::clash::find_conflict_groups;
use crate::data::{
    CourseIndex, CourseSection, Instructor, InstructorIndex, PatternIndex, Room, RoomIndex,
    TimePattern,
};
use itertools::iproduct;
use log::{debug, info, trace};
use std::collections::BTreeSet;
use std::fmt;

pub type VarId = usize;

/// Penalty for placing a section in a room that does not list its department.
pub const ROOM_PREFERENCE_WEIGHT: i64 = 3;
/// Penalty for placing a section at a pattern it did not ask for.
pub const PATTERN_PREFERENCE_WEIGHT: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quad {
    pub course: CourseIndex,
    pub instructor: InstructorIndex,
    pub room: RoomIndex,
    pub pattern: PatternIndex,
}

/// Flattens quadruples into `((c * I + i) * R + r) * E + e`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarIndex {
    courses: usize,
    instructors: usize,
    rooms: usize,
    patterns: usize,
}

impl VarIndex {
    pub fn new(courses: usize, instructors: usize, rooms: usize, patterns: usize) -> Self {
        Self {
            courses,
            instructors,
            rooms,
            patterns,
        }
    }

    pub fn len(&self) -> usize {
        self.courses * self.instructors * self.rooms * self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn courses(&self) -> usize {
        self.courses
    }

    pub fn instructors(&self) -> usize {
        self.instructors
    }

    pub fn rooms(&self) -> usize {
        self.rooms
    }

    pub fn patterns(&self) -> usize {
        self.patterns
    }

    pub fn index(&self, quad: Quad) -> VarId {
        debug_assert!(quad.course < self.courses);
        debug_assert!(quad.instructor < self.instructors);
        debug_assert!(quad.room < self.rooms);
        debug_assert!(quad.pattern < self.patterns);
        ((quad.course * self.instructors + quad.instructor) * self.rooms + quad.room)
            * self.patterns
            + quad.pattern
    }

    pub fn decode(&self, var: VarId) -> Quad {
        let pattern = var % self.patterns;
        let rest = var / self.patterns;
        let room = rest % self.rooms;
        let rest = rest / self.rooms;
        let instructor = rest % self.instructors;
        let course = rest / self.instructors;
        Quad {
            course,
            instructor,
            room,
            pattern,
        }
    }

    /// Every variable of course `c`, in index order.
    pub fn course_vars(&self, c: CourseIndex) -> std::ops::Range<VarId> {
        let width = self.instructors * self.rooms * self.patterns;
        c * width..(c + 1) * width
    }

    fn var(&self, c: usize, i: usize, r: usize, e: usize) -> VarId {
        self.index(Quad {
            course: c,
            instructor: i,
            room: r,
            pattern: e,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessOrEqual,
    Equal,
    GreaterOrEqual,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::LessOrEqual => write!(f, "<="),
            Relation::Equal => write!(f, "=="),
            Relation::GreaterOrEqual => write!(f, ">="),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstraintKind {
    ExactlyOne,
    Capacity,
    InstructorMax,
    InstructorMin,
    RoomPattern,
    InstructorPattern,
    Department,
    InstructorGroup,
    RoomGroup,
}

/// A weighted sum of boolean variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    terms: Vec<(VarId, i64)>,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, var: VarId, coefficient: i64) {
        if coefficient != 0 {
            self.terms.push((var, coefficient));
        }
    }

    pub fn terms(&self) -> &[(VarId, i64)] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn evaluate(&self, values: &[bool]) -> i64 {
        self.terms
            .iter()
            .filter(|(var, _)| values[*var])
            .map(|(_, coefficient)| coefficient)
            .sum()
    }
}

impl FromIterator<VarId> for LinearExpr {
    fn from_iter<T: IntoIterator<Item = VarId>>(iter: T) -> Self {
        Self {
            terms: iter.into_iter().map(|var| (var, 1)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConstraint {
    pub kind: ConstraintKind,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: i64,
}

impl LinearConstraint {
    pub fn is_satisfied_by(&self, values: &[bool]) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.relation {
            Relation::LessOrEqual => lhs <= self.rhs,
            Relation::Equal => lhs == self.rhs,
            Relation::GreaterOrEqual => lhs >= self.rhs,
        }
    }
}

/// Boolean variables, hard constraints, and an objective to minimise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearProgram {
    num_vars: usize,
    constraints: Vec<LinearConstraint>,
    objective: LinearExpr,
}

impl LinearProgram {
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn objective_value(&self, values: &[bool]) -> i64 {
        self.objective.evaluate(values)
    }

    /// Indices of the constraints `values` breaks.
    pub fn violated_constraints(&self, values: &[bool]) -> Vec<usize> {
        self.constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_satisfied_by(values))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn is_feasible(&self, values: &[bool]) -> bool {
        values.len() == self.num_vars && self.constraints.iter().all(|c| c.is_satisfied_by(values))
    }

    pub fn count_kind(&self, kind: ConstraintKind) -> usize {
        self.constraints.iter().filter(|c| c.kind == kind).count()
    }
}

/// Accumulates constraints and objective terms, then freezes them.
#[derive(Debug, Clone)]
pub struct ProgramBuilder {
    num_vars: usize,
    constraints: Vec<LinearConstraint>,
    objective: LinearExpr,
}

impl ProgramBuilder {
    pub fn new(num_vars: usize) -> Self {
        Self {
            num_vars,
            constraints: Vec::new(),
            objective: LinearExpr::new(),
        }
    }

    pub fn add_constraint(
        &mut self,
        kind: ConstraintKind,
        expr: LinearExpr,
        relation: Relation,
        rhs: i64,
    ) -> &mut Self {
        debug_assert!(expr.terms().iter().all(|(var, _)| *var < self.num_vars));
        self.constraints.push(LinearConstraint {
            kind,
            expr,
            relation,
            rhs,
        });
        self
    }

    pub fn add_objective_term(&mut self, var: VarId, coefficient: i64) -> &mut Self {
        debug_assert!(var < self.num_vars);
        self.objective.add_term(var, coefficient);
        self
    }

    pub fn build(self) -> LinearProgram {
        LinearProgram {
            num_vars: self.num_vars,
            constraints: self.constraints,
            objective: self.objective,
        }
    }
}

/// The assignment program together with the index it was built over.
#[derive(Debug, Clone)]
pub struct AssignmentModel {
    pub index: VarIndex,
    pub program: LinearProgram,
    pub conflict_groups: Vec<BTreeSet<PatternIndex>>,
}

pub struct ModelBuilder<'a> {
    instructors: &'a [Instructor],
    patterns: &'a [TimePattern],
    rooms: &'a [Room],
    sections: &'a [CourseSection],
    index: VarIndex,
    program: ProgramBuilder,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(
        instructors: &'a [Instructor],
        patterns: &'a [TimePattern],
        rooms: &'a [Room],
        sections: &'a [CourseSection],
    ) -> Self {
        let index = VarIndex::new(sections.len(), instructors.len(), rooms.len(), patterns.len());
        Self {
            instructors,
            patterns,
            rooms,
            sections,
            index,
            program: ProgramBuilder::new(index.len()),
        }
    }

    pub fn build(mut self) -> AssignmentModel {
        info!(
            "Setting up model with {} sections, {} instructors, {} rooms, and {} patterns...",
            self.sections.len(),
            self.instructors.len(),
            self.rooms.len(),
            self.patterns.len()
        );
        trace!("Generated {} assignment variables.", self.index.len());

        let conflict_groups = find_conflict_groups(self.patterns);

        self.add_exactly_one();
        self.add_capacity();
        self.add_instructor_bounds();
        self.add_room_pattern_exclusivity();
        self.add_instructor_pattern_exclusivity();
        self.add_department_match();
        self.add_group_exclusivity(&conflict_groups);
        self.add_objective();

        let program = self.program.build();
        debug!(
            "Model has {} constraints and {} objective terms.",
            program.constraints().len(),
            program.objective().len()
        );
        AssignmentModel {
            index: self.index,
            program,
            conflict_groups,
        }
    }

    fn add_exactly_one(&mut self) {
        for c in 0..self.index.courses() {
            let expr: LinearExpr = self.index.course_vars(c).collect();
            self.program
                .add_constraint(ConstraintKind::ExactlyOne, expr, Relation::Equal, 1);
        }
    }

    fn add_capacity(&mut self) {
        let ix = self.index;
        for (c, section) in self.sections.iter().enumerate() {
            let expr: LinearExpr = iproduct!(0..ix.instructors(), 0..ix.rooms(), 0..ix.patterns())
                .filter(|&(_, r, _)| self.rooms[r].student_capacity < section.student_enrollment)
                .map(|(i, r, e)| ix.var(c, i, r, e))
                .collect();
            self.program
                .add_constraint(ConstraintKind::Capacity, expr, Relation::Equal, 0);
        }
    }

    fn add_instructor_bounds(&mut self) {
        let ix = self.index;
        for (i, instructor) in self.instructors.iter().enumerate() {
            let teaching = || -> LinearExpr {
                iproduct!(0..ix.courses(), 0..ix.rooms(), 0..ix.patterns())
                    .map(|(c, r, e)| ix.var(c, i, r, e))
                    .collect()
            };
            if let Some(max) = instructor.course_max {
                self.program.add_constraint(
                    ConstraintKind::InstructorMax,
                    teaching(),
                    Relation::LessOrEqual,
                    i64::from(max),
                );
            }
            if let Some(min) = instructor.course_min {
                self.program.add_constraint(
                    ConstraintKind::InstructorMin,
                    teaching(),
                    Relation::GreaterOrEqual,
                    i64::from(min),
                );
            }
        }
    }

    fn add_room_pattern_exclusivity(&mut self) {
        let ix = self.index;
        for (r, e) in iproduct!(0..ix.rooms(), 0..ix.patterns()) {
            let expr: LinearExpr = iproduct!(0..ix.courses(), 0..ix.instructors())
                .map(|(c, i)| ix.var(c, i, r, e))
                .collect();
            self.program
                .add_constraint(ConstraintKind::RoomPattern, expr, Relation::LessOrEqual, 1);
        }
    }

    fn add_instructor_pattern_exclusivity(&mut self) {
        let ix = self.index;
        for (i, e) in iproduct!(0..ix.instructors(), 0..ix.patterns()) {
            let expr: LinearExpr = iproduct!(0..ix.courses(), 0..ix.rooms())
                .map(|(c, r)| ix.var(c, i, r, e))
                .collect();
            self.program.add_constraint(
                ConstraintKind::InstructorPattern,
                expr,
                Relation::LessOrEqual,
                1,
            );
        }
    }

    fn add_department_match(&mut self) {
        let ix = self.index;
        for (i, instructor) in self.instructors.iter().enumerate() {
            let expr: LinearExpr = iproduct!(0..ix.courses(), 0..ix.rooms(), 0..ix.patterns())
                .filter(|&(c, _, _)| self.sections[c].department != instructor.department)
                .map(|(c, r, e)| ix.var(c, i, r, e))
                .collect();
            self.program
                .add_constraint(ConstraintKind::Department, expr, Relation::Equal, 0);
        }
    }

    /// At most one assignment per conflict group, for each instructor and each room.
    fn add_group_exclusivity(&mut self, groups: &[BTreeSet<PatternIndex>]) {
        let ix = self.index;
        for (i, group) in iproduct!(0..ix.instructors(), groups) {
            let expr: LinearExpr = iproduct!(0..ix.courses(), 0..ix.rooms(), group.iter())
                .map(|(c, r, &e)| ix.var(c, i, r, e))
                .collect();
            self.program.add_constraint(
                ConstraintKind::InstructorGroup,
                expr,
                Relation::LessOrEqual,
                1,
            );
        }
        for (r, group) in iproduct!(0..ix.rooms(), groups) {
            let expr: LinearExpr = iproduct!(0..ix.courses(), 0..ix.instructors(), group.iter())
                .map(|(c, i, &e)| ix.var(c, i, r, e))
                .collect();
            self.program
                .add_constraint(ConstraintKind::RoomGroup, expr, Relation::LessOrEqual, 1);
        }
    }

    fn add_objective(&mut self) {
        for var in 0..self.index.len() {
            let quad = self.index.decode(var);
            let section = &self.sections[quad.course];
            let mut weight = 0;
            if !self.rooms[quad.room].permits(&section.department) {
                weight += ROOM_PREFERENCE_WEIGHT;
            }
            if !section.prefers_pattern(quad.pattern) {
                weight += PATTERN_PREFERENCE_WEIGHT;
            }
            self.program.add_objective_term(var, weight);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Day, DaySlots, TimeWindow};
    use chrono::NaiveTime;

    fn pattern(day: Day, start: u32, end: u32) -> TimePattern {
        TimePattern::new(vec![DaySlots {
            day,
            windows: vec![TimeWindow::new(
                NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
            )],
        }])
    }

    fn instructor(name: &str, department: &str, min: Option<u32>, max: Option<u32>) -> Instructor {
        Instructor {
            name: name.into(),
            department: department.into(),
            course_min: min,
            course_max: max,
        }
    }

    fn room(name: &str, capacity: u32, departments: &[&str]) -> Room {
        Room {
            name: name.into(),
            student_capacity: capacity,
            permitted_departments: departments.iter().map(|d| d.to_string()).collect(),
        }
    }

    fn section(department: &str, enrollment: u32, preferred: Vec<usize>) -> CourseSection {
        CourseSection {
            name: "c".into(),
            display_name: "C".into(),
            section_num: 1,
            department: department.into(),
            student_enrollment: enrollment,
            preferred_timeslots: preferred,
        }
    }

    #[test]
    fn index_round_trips_through_decode() {
        let ix = VarIndex::new(2, 3, 4, 5);
        assert_eq!(ix.len(), 120);
        for var in 0..ix.len() {
            assert_eq!(ix.index(ix.decode(var)), var);
        }
        let quad = Quad {
            course: 1,
            instructor: 2,
            room: 3,
            pattern: 4,
        };
        assert_eq!(ix.index(quad), 119);
        assert_eq!(ix.course_vars(1), 60..120);
    }

    #[test]
    fn constraint_counts_follow_dimensions() {
        let instructors = vec![
            instructor("a", "CS", None, Some(2)),
            instructor("b", "CS", Some(1), None),
        ];
        let rooms = vec![room("r1", 30, &["CS"]), room("r2", 10, &[])];
        let patterns = vec![
            pattern(Day::Monday, 9, 11),
            pattern(Day::Monday, 10, 12),
            pattern(Day::Tuesday, 9, 11),
        ];
        let sections = vec![section("CS", 20, vec![1]), section("CS", 5, vec![])];

        let model = ModelBuilder::new(&instructors, &patterns, &rooms, &sections).build();
        let program = &model.program;

        assert_eq!(program.num_vars(), 2 * 2 * 2 * 3);
        assert_eq!(model.conflict_groups.len(), 2);
        assert_eq!(program.count_kind(ConstraintKind::ExactlyOne), 2);
        assert_eq!(program.count_kind(ConstraintKind::Capacity), 2);
        assert_eq!(program.count_kind(ConstraintKind::InstructorMax), 1);
        assert_eq!(program.count_kind(ConstraintKind::InstructorMin), 1);
        assert_eq!(program.count_kind(ConstraintKind::RoomPattern), 2 * 3);
        assert_eq!(program.count_kind(ConstraintKind::InstructorPattern), 2 * 3);
        assert_eq!(program.count_kind(ConstraintKind::Department), 2);
        assert_eq!(program.count_kind(ConstraintKind::InstructorGroup), 2 * 2);
        assert_eq!(program.count_kind(ConstraintKind::RoomGroup), 2 * 2);
    }

    #[test]
    fn capacity_and_department_forbid_the_right_vars() {
        let instructors = vec![instructor("a", "CS", None, None), instructor("b", "MATH", None, None)];
        let rooms = vec![room("big", 50, &["CS"]), room("small", 10, &["CS"])];
        let patterns = vec![pattern(Day::Monday, 9, 10)];
        let sections = vec![section("CS", 20, vec![1])];

        let model = ModelBuilder::new(&instructors, &patterns, &rooms, &sections).build();
        let ix = model.index;
        let program = &model.program;

        let capacity = &program.constraints()[1];
        assert_eq!(capacity.kind, ConstraintKind::Capacity);
        let forbidden: Vec<Quad> = capacity.expr.terms().iter().map(|(v, _)| ix.decode(*v)).collect();
        assert!(forbidden.iter().all(|q| q.room == 1));
        assert_eq!(forbidden.len(), 2);

        let departments: Vec<&LinearConstraint> = program
            .constraints()
            .iter()
            .filter(|c| c.kind == ConstraintKind::Department)
            .collect();
        assert!(departments[0].expr.is_empty());
        assert_eq!(departments[1].expr.len(), 2);

        // Only CS instructor in the big room is allowed.
        let mut values = vec![false; ix.len()];
        values[ix.index(Quad {
            course: 0,
            instructor: 0,
            room: 0,
            pattern: 0,
        })] = true;
        assert!(program.is_feasible(&values));

        let mut wrong_room = vec![false; ix.len()];
        wrong_room[ix.index(Quad {
            course: 0,
            instructor: 0,
            room: 1,
            pattern: 0,
        })] = true;
        assert!(!program.is_feasible(&wrong_room));

        let mut wrong_department = vec![false; ix.len()];
        wrong_department[ix.index(Quad {
            course: 0,
            instructor: 1,
            room: 0,
            pattern: 0,
        })] = true;
        assert!(!program.is_feasible(&wrong_department));
    }

    #[test]
    fn objective_weights_room_and_pattern_preferences() {
        let instructors = vec![instructor("a", "CS", None, None)];
        let rooms = vec![room("cs", 50, &["CS"]), room("other", 50, &["BIO"])];
        let patterns = vec![pattern(Day::Monday, 9, 10), pattern(Day::Friday, 9, 10)];
        let sections = vec![section("CS", 20, vec![2])];

        let model = ModelBuilder::new(&instructors, &patterns, &rooms, &sections).build();
        let ix = model.index;
        let weight = |room, pattern| {
            let var = ix.index(Quad {
                course: 0,
                instructor: 0,
                room,
                pattern,
            });
            let mut values = vec![false; ix.len()];
            values[var] = true;
            model.program.objective_value(&values)
        };
        assert_eq!(weight(0, 1), 0);
        assert_eq!(weight(0, 0), PATTERN_PREFERENCE_WEIGHT);
        assert_eq!(weight(1, 1), ROOM_PREFERENCE_WEIGHT);
        assert_eq!(weight(1, 0), ROOM_PREFERENCE_WEIGHT + PATTERN_PREFERENCE_WEIGHT);
        // Zero weights are not stored.
        assert_eq!(model.program.objective().len(), 3);
    }

    #[test]
    fn group_constraint_covers_whole_component() {
        let instructors = vec![instructor("a", "CS", None, None)];
        let rooms = vec![room("r", 50, &["CS"])];
        let patterns = vec![
            pattern(Day::Monday, 9, 11),
            pattern(Day::Monday, 10, 13),
            pattern(Day::Monday, 12, 14),
        ];
        let sections = vec![section("CS", 10, vec![]), section("CS", 10, vec![])];

        let model = ModelBuilder::new(&instructors, &patterns, &rooms, &sections).build();
        let ix = model.index;
        let mut values = vec![false; ix.len()];
        // Patterns 0 and 2 do not clash directly but share a component.
        values[ix.index(Quad {
            course: 0,
            instructor: 0,
            room: 0,
            pattern: 0,
        })] = true;
        values[ix.index(Quad {
            course: 1,
            instructor: 0,
            room: 0,
            pattern: 2,
        })] = true;
        let violated: BTreeSet<ConstraintKind> = model
            .program
            .violated_constraints(&values)
            .into_iter()
            .map(|index| model.program.constraints()[index].kind)
            .collect();
        assert_eq!(
            violated,
            BTreeSet::from([ConstraintKind::InstructorGroup, ConstraintKind::RoomGroup])
        );
    }

    #[test]
    fn instructor_minimum_rejects_short_loads() {
        let instructors = vec![
            instructor("ada", "CS", None, None),
            instructor("grace", "CS", Some(2), None),
        ];
        let rooms = vec![room("r", 50, &["CS"])];
        let patterns = vec![pattern(Day::Monday, 9, 10), pattern(Day::Tuesday, 9, 10)];
        let sections = vec![section("CS", 10, vec![]), section("CS", 10, vec![])];

        let model = ModelBuilder::new(&instructors, &patterns, &rooms, &sections).build();
        let ix = model.index;
        let schedule = |teachers: [usize; 2]| {
            let mut values = vec![false; ix.len()];
            for (course, instructor) in teachers.into_iter().enumerate() {
                values[ix.index(Quad {
                    course,
                    instructor,
                    room: 0,
                    pattern: course,
                })] = true;
            }
            values
        };

        let all_ada = schedule([0, 0]);
        assert!(!model.program.is_feasible(&all_ada));
        let violated: Vec<ConstraintKind> = model
            .program
            .violated_constraints(&all_ada)
            .into_iter()
            .map(|index| model.program.constraints()[index].kind)
            .collect();
        assert_eq!(violated, vec![ConstraintKind::InstructorMin]);

        assert!(!model.program.is_feasible(&schedule([0, 1])));
        assert!(model.program.is_feasible(&schedule([1, 1])));
    }
}
