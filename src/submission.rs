//! Turns a raw scheduling submission into validated solver inputs.

use crate::data::{CourseSection, Day, DaySlots, Instructor, Room, TimePattern, TimeWindow};
use chrono::NaiveTime;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Unrecognized day of week: {0}")]
    UnknownDay(String),
    #[error("Invalid time '{0}', expected HH:MM or HH:MM:SS")]
    InvalidTime(String),
    #[error("Time window {start}-{end} on {day} does not end after it starts")]
    EmptyWindow {
        day: Day,
        start: NaiveTime,
        end: NaiveTime,
    },
    #[error("Instructor {0} has a minimum above their maximum")]
    InstructorBounds(String),
    #[error("Duplicate instructor name: {0}")]
    DuplicateInstructor(String),
    #[error("Duplicate room name: {0}")]
    DuplicateRoom(String),
    #[error("Course {course} prefers timeslot {index}, but only {available} were submitted")]
    UnknownTimeslot {
        course: String,
        index: usize,
        available: usize,
    },
}

impl FromStr for Day {
    type Err = SubmissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Monday" => Ok(Day::Monday),
            "Tuesday" => Ok(Day::Tuesday),
            "Wednesday" => Ok(Day::Wednesday),
            "Thursday" => Ok(Day::Thursday),
            "Friday" => Ok(Day::Friday),
            "Saturday" => Ok(Day::Saturday),
            "Sunday" => Ok(Day::Sunday),
            other => Err(SubmissionError::UnknownDay(other.to_string())),
        }
    }
}

/// A course as entered, before it is split into sections.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub name: String,
    pub display_name: String,
    pub department: String,
    pub enrollment: u32,
    pub number_of_sections: u32,
    #[serde(default)]
    pub preferred_timeslots: Vec<usize>,
}

impl Course {
    pub fn sections(&self) -> impl Iterator<Item = CourseSection> + '_ {
        (1..=self.number_of_sections).map(move |section_num| CourseSection {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            section_num,
            department: self.department.clone(),
            student_enrollment: self.enrollment,
            preferred_timeslots: self.preferred_timeslots.clone(),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawWindow {
    pub start: String,
    pub end: String,
}

/// The complete submission for one scheduling run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingRequest {
    pub instructors: Vec<Instructor>,
    pub rooms: Vec<Room>,
    pub courses: Vec<Course>,
    /// One map per pattern: day name to that day's windows.
    pub timeslots: Vec<BTreeMap<String, Vec<RawWindow>>>,
}

/// Inputs ready for [`crate::solve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub instructors: Vec<Instructor>,
    pub patterns: Vec<TimePattern>,
    pub rooms: Vec<Room>,
    pub sections: Vec<CourseSection>,
}

fn parse_time(raw: &str) -> Result<NaiveTime, SubmissionError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| SubmissionError::InvalidTime(raw.to_string()))
}

fn parse_pattern(days: &BTreeMap<String, Vec<RawWindow>>) -> Result<TimePattern, SubmissionError> {
    let mut slots = Vec::with_capacity(days.len());
    for (name, raw_windows) in days {
        let day: Day = name.parse()?;
        let mut windows = Vec::with_capacity(raw_windows.len());
        for raw in raw_windows {
            let start = parse_time(&raw.start)?;
            let end = parse_time(&raw.end)?;
            if end <= start {
                return Err(SubmissionError::EmptyWindow { day, start, end });
            }
            windows.push(TimeWindow::new(start, end));
        }
        slots.push(DaySlots { day, windows });
    }
    slots.sort_by_key(|s| s.day);
    Ok(TimePattern::new(slots))
}

impl SchedulingRequest {
    pub fn into_problem(self) -> Result<Problem, SubmissionError> {
        if let Some(name) = self.instructors.iter().map(|i| &i.name).duplicates().next() {
            return Err(SubmissionError::DuplicateInstructor(name.clone()));
        }
        if let Some(name) = self.rooms.iter().map(|r| &r.name).duplicates().next() {
            return Err(SubmissionError::DuplicateRoom(name.clone()));
        }
        if let Some(instructor) = self
            .instructors
            .iter()
            .find(|i| matches!((i.course_min, i.course_max), (Some(min), Some(max)) if min > max))
        {
            return Err(SubmissionError::InstructorBounds(instructor.name.clone()));
        }

        let patterns: Vec<TimePattern> = self
            .timeslots
            .iter()
            .map(parse_pattern)
            .collect::<Result<_, _>>()?;

        for course in &self.courses {
            if let Some(&index) = course
                .preferred_timeslots
                .iter()
                .find(|&&index| index == 0 || index > patterns.len())
            {
                return Err(SubmissionError::UnknownTimeslot {
                    course: course.name.clone(),
                    index,
                    available: patterns.len(),
                });
            }
        }

        let sections = self.courses.iter().flat_map(|course| course.sections()).collect();
        Ok(Problem {
            instructors: self.instructors,
            patterns,
            rooms: self.rooms,
            sections,
        })
    }
}
