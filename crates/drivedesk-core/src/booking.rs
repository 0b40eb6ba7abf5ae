use std::collections::BTreeMap;

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use drivedesk_shared::{BookingDto, BookingStatusDto};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_LESSON_TYPE: &str = "standard";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_key(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    fn to_dto(self) -> BookingStatusDto {
        match self {
            Self::Scheduled => BookingStatusDto::Scheduled,
            Self::Completed => BookingStatusDto::Completed,
            Self::Cancelled => BookingStatusDto::Cancelled,
        }
    }
}

fn default_lesson_type() -> String {
    DEFAULT_LESSON_TYPE.to_string()
}

/// A lesson booking as returned by the storage backend.
///
/// Column names follow the backend's booking table; unknown columns (owner,
/// timestamps) are kept in `extra` so nothing is lost on re-export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,

    pub title: String,

    #[serde(alias = "start_time")]
    pub start: DateTime<Utc>,

    #[serde(alias = "end_time")]
    pub end: DateTime<Utc>,

    #[serde(default)]
    pub student_id: Option<Uuid>,

    pub status: BookingStatus,

    #[serde(default = "default_lesson_type")]
    pub lesson_type: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub targets_for_next_session: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Booking {
    pub fn new_scheduled(title: String, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            start,
            end,
            student_id: None,
            status: BookingStatus::Scheduled,
            lesson_type: default_lesson_type(),
            description: None,
            targets_for_next_session: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.start <= self.end
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.is_well_formed() {
            return Err(anyhow!(
                "booking {} starts after it ends ({} > {})",
                self.id,
                self.start.to_rfc3339(),
                self.end.to_rfc3339()
            ));
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Overlap of the booking's half-open `[start, end)` interval with an
    /// inclusive `[start, end]` range: the booking starts inside it, ends
    /// inside it, or spans all of it. A booking ending exactly at `start`
    /// does not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let starts_inside = self.start >= start && self.start <= end;
        let ends_inside = self.end > start && self.end <= end;
        let spans = self.start <= start && self.end > end;
        starts_inside || ends_inside || spans
    }

    pub fn to_dto(&self) -> BookingDto {
        BookingDto {
            id: self.id,
            title: self.title.clone(),
            start: self.start.to_rfc3339(),
            end: self.end.to_rfc3339(),
            student_id: self.student_id,
            status: self.status.to_dto(),
            lesson_type: self.lesson_type.clone(),
            description: self.description.clone(),
        }
    }
}
