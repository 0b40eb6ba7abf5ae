use std::collections::BTreeMap;

use serde::{
  Deserialize,
  Serialize
};
use uuid::Uuid;

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewModeDto {
  Day,
  Week,
  Month,
  Agenda
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatusDto {
  Scheduled,
  Completed,
  Cancelled
}

/// Visible time-of-day axis for the
/// day and week grids. Times are
/// `HH:MM`; `24:00` marks the end of
/// the anchor day.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct ViewportDto {
  pub date:     String,
  pub min_time: String,
  pub max_time: String
}

/// RFC 3339 bounds of the next
/// booking request. `end` is
/// inclusive.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct FetchWindowDto {
  pub seq:   u64,
  pub start: String,
  pub end:   String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct BookingDto {
  pub id:          Uuid,
  pub title:       String,
  pub start:       String,
  pub end:         String,
  #[serde(default)]
  pub student_id:  Option<Uuid>,
  pub status:      BookingStatusDto,
  pub lesson_type: String,
  #[serde(default)]
  pub description: Option<String>
}

#[derive(
  Debug,
  Clone,
  Default,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct BookingStatsDto {
  pub total:             usize,
  pub scheduled:         usize,
  pub completed:         usize,
  pub cancelled:         usize,
  pub scheduled_minutes: i64,
  pub students:          usize,
  #[serde(default)]
  pub by_lesson_type:    BTreeMap<String, usize>
}

/// Everything the calendar grid needs
/// for one render pass.
#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct CalendarFrameDto {
  pub anchor_date:  String,
  pub view:         ViewModeDto,
  pub title:        String,
  pub viewport:     ViewportDto,
  pub fetch_window: FetchWindowDto,
  pub bookings:     Vec<BookingDto>,
  pub stats:        BookingStatsDto
}
