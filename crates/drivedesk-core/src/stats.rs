use std::collections::{BTreeMap, BTreeSet};

use drivedesk_shared::BookingStatsDto;

use crate::booking::{Booking, BookingStatus};
use crate::fetch::FetchWindow;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingStats {
    pub total: usize,
    pub scheduled: usize,
    pub completed: usize,
    pub cancelled: usize,
    /// Booked time excluding cancelled lessons.
    pub scheduled_minutes: i64,
    pub students: usize,
    pub by_lesson_type: BTreeMap<String, usize>,
}

impl BookingStats {
    /// Single pass over the bookings overlapping `window`.
    pub fn summarize(bookings: &[Booking], window: &FetchWindow) -> Self {
        let mut stats = Self::default();
        let mut students = BTreeSet::new();

        for booking in bookings.iter().filter(|b| window.overlaps(b)) {
            stats.total += 1;
            match booking.status {
                BookingStatus::Scheduled => stats.scheduled += 1,
                BookingStatus::Completed => stats.completed += 1,
                BookingStatus::Cancelled => stats.cancelled += 1,
            }
            if booking.status != BookingStatus::Cancelled && booking.is_well_formed() {
                stats.scheduled_minutes += booking.duration().num_minutes();
            }
            if let Some(student) = booking.student_id {
                students.insert(student);
            }
            *stats
                .by_lesson_type
                .entry(booking.lesson_type.clone())
                .or_insert(0) += 1;
        }

        stats.students = students.len();
        stats
    }

    pub fn to_dto(&self) -> BookingStatsDto {
        BookingStatsDto {
            total: self.total,
            scheduled: self.scheduled,
            completed: self.completed,
            cancelled: self.cancelled,
            scheduled_minutes: self.scheduled_minutes,
            students: self.students,
            by_lesson_type: self.by_lesson_type.clone(),
        }
    }
}
