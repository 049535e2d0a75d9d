use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for clarity
pub type CourseIndex = usize;
pub type InstructorIndex = usize;
pub type RoomIndex = usize;
pub type PatternIndex = usize;

/// Represents an instructor with an optional teaching quota.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    pub name: String,
    pub department: String,
    pub course_min: Option<u32>,
    pub course_max: Option<u32>,
}

/// Represents a physical room with a given capacity.
///
/// `permitted_departments` only feeds the soft penalty; an empty list is not a
/// hard restriction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub name: String,
    pub student_capacity: u32,
    #[serde(default)]
    pub permitted_departments: Vec<String>,
}

impl Room {
    pub fn permits(&self, department: &str) -> bool {
        self.permitted_departments.iter().any(|d| d == department)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A half-open `[start, end)` window within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Windows that only touch at an endpoint do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DaySlots {
    pub day: Day,
    pub windows: Vec<TimeWindow>,
}

/// A weekly recurring time pattern, treated as one atomic slot option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimePattern {
    pub slots: Vec<DaySlots>,
}

impl TimePattern {
    pub fn new(slots: Vec<DaySlots>) -> Self {
        Self { slots }
    }

    /// All windows of this pattern falling on `day`.
    pub fn windows_on(&self, day: Day) -> impl Iterator<Item = &TimeWindow> {
        self.slots
            .iter()
            .filter(move |s| s.day == day)
            .flat_map(|s| s.windows.iter())
    }
}

/// One schedulable section of a course.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSection {
    pub name: String,
    pub display_name: String,
    pub section_num: u32,
    pub department: String,
    pub student_enrollment: u32,
    /// 1-based indices into the submitted pattern list.
    #[serde(default)]
    pub preferred_timeslots: Vec<usize>,
}

impl CourseSection {
    pub fn section_display_name(&self) -> String {
        format!("{}.{}", self.display_name, self.section_num)
    }

    pub fn prefers_pattern(&self, pattern: PatternIndex) -> bool {
        self.preferred_timeslots.contains(&(pattern + 1))
    }
}

/// Represents a single, scheduled course section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub course_section: CourseSection,
    pub instructor: Instructor,
    pub room: Room,
    pub pattern: TimePattern,
    pub pattern_index: PatternIndex,
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} in {} at pattern {}",
            self.course_section.section_display_name(),
            self.instructor.name,
            self.room.name,
            self.pattern_index + 1
        )
    }
}

/// Describes a soft preference that was not met in the final schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetPreference {
    pub constraint_type: String,
    pub description: String,
}

impl fmt::Display for UnmetPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.constraint_type, self.description)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    Failed,
}

/// The final output of one solve attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultStatus {
    pub status: Status,
    pub message: String,
    pub results: Vec<Assignment>,
    pub penalty: i64,
    pub unmet_preferences: Vec<UnmetPreference>,
}

impl ResultStatus {
    pub fn success(
        results: Vec<Assignment>,
        penalty: i64,
        unmet_preferences: Vec<UnmetPreference>,
    ) -> Self {
        Self {
            status: Status::Success,
            message: String::new(),
            results,
            penalty,
            unmet_preferences,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            message: message.into(),
            results: Vec::new(),
            penalty: 0,
            unmet_preferences: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
