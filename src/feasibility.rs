use crate::data::{CourseSection, Instructor, Room, TimePattern};
use thiserror::Error;

/// Cheap necessary conditions that rule out a solve before any model is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PreCheckError {
    #[error("Not enough rooms and timeslots")]
    NotEnoughRoomSlots,
    #[error("There is a course with enrollment over all rooms' capacities")]
    EnrollmentOverCapacity,
    #[error("Too many courses given the limits for each instructor")]
    InstructorMaximaTooLow,
    #[error("There are not enough courses to fill the quotas for some instructors.")]
    InstructorMinimaTooHigh,
}

/// Runs the checks in order and stops at the first failure.
pub fn pre_check(
    instructors: &[Instructor],
    patterns: &[TimePattern],
    rooms: &[Room],
    sections: &[CourseSection],
) -> Result<(), PreCheckError> {
    let room_slot_combos = rooms.len() * patterns.len();
    if sections.len() > room_slot_combos {
        return Err(PreCheckError::NotEnoughRoomSlots);
    }

    let cannot_fit = sections.iter().any(|section| {
        rooms
            .iter()
            .all(|room| room.student_capacity < section.student_enrollment)
    });
    if cannot_fit {
        return Err(PreCheckError::EnrollmentOverCapacity);
    }

    let maxima: Option<u64> = instructors
        .iter()
        .map(|i| i.course_max.map(u64::from))
        .sum();
    if let Some(total) = maxima {
        if total < sections.len() as u64 {
            return Err(PreCheckError::InstructorMaximaTooLow);
        }
    }

    let minima: u64 = instructors
        .iter()
        .map(|i| u64::from(i.course_min.unwrap_or(0)))
        .sum();
    if (sections.len() as u64) < minima {
        return Err(PreCheckError::InstructorMinimaTooHigh);
    }

    Ok(())
}
