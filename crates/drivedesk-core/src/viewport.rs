//! Visible time-of-day bounds for the
//! day and week calendar grids.
//!
//! The grid normally shows the default
//! working hours. When a booking in the
//! displayed week starts earlier or ends
//! later, the axis widens to whole
//! hours around it so nothing is
//! clipped.

use chrono::{
  DateTime,
  Duration,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Timelike,
  Utc
};
use drivedesk_shared::ViewportDto;
use tracing::{
  debug,
  trace
};

use crate::booking::Booking;
use crate::config::CalendarSettings;
use crate::datetime::{
  end_of_day,
  end_of_week,
  start_of_day,
  start_of_week
};
use crate::view::ViewMode;

pub const DEFAULT_DAY_START_HOUR: u32 =
  9;
pub const DEFAULT_DAY_END_HOUR: u32 =
  18;

/// Default working hours. `end_hour`
/// may be 24 (end of day); start never
/// exceeds end.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct HourWindow {
  start_hour: u32,
  end_hour:   u32
}

impl Default for HourWindow {
  fn default() -> Self {
    Self {
      start_hour: DEFAULT_DAY_START_HOUR,
      end_hour:   DEFAULT_DAY_END_HOUR
    }
  }
}

impl HourWindow {
  pub fn new(
    start_hour: u32,
    end_hour: u32
  ) -> anyhow::Result<Self> {
    if start_hour > 23 {
      anyhow::bail!(
        "day start hour must be 0-23, \
         got {start_hour}"
      );
    }
    if end_hour > 24
      || end_hour < start_hour
    {
      anyhow::bail!(
        "day end hour must be \
         {start_hour}-24, got \
         {end_hour}"
      );
    }
    Ok(Self {
      start_hour,
      end_hour
    })
  }

  /// Clamps out-of-range hours instead
  /// of rejecting them.
  pub fn sanitized(
    start_hour: u32,
    end_hour: u32
  ) -> Self {
    let start = start_hour.min(23);
    let end = end_hour.min(24).max(start);
    if start != start_hour
      || end != end_hour
    {
      tracing::warn!(
        start_hour,
        end_hour,
        sanitized_start = start,
        sanitized_end = end,
        "calendar hours out of range; \
         clamped"
      );
    }
    Self {
      start_hour: start,
      end_hour:   end
    }
  }

  pub fn start_hour(&self) -> u32 {
    self.start_hour
  }

  pub fn end_hour(&self) -> u32 {
    self.end_hour
  }
}

/// Hour axis for one render of the
/// grid, expressed on the anchor date.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct Viewport {
  pub date:     NaiveDate,
  pub min_hour: u32,
  pub max_hour: u32
}

impl Viewport {
  fn from_hours(
    date: NaiveDate,
    hours: HourWindow
  ) -> Self {
    Self {
      date,
      min_hour: hours.start_hour,
      max_hour: hours.end_hour
    }
  }

  pub fn min_time(&self) -> NaiveTime {
    NaiveTime::from_hms_opt(
      self.min_hour,
      0,
      0
    )
    .unwrap_or(NaiveTime::MIN)
  }

  /// `None` when the axis runs to the
  /// end of the day (hour 24); use
  /// `max_datetime` for that case.
  pub fn max_time(
    &self
  ) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(
      self.max_hour,
      0,
      0
    )
  }

  pub fn min_datetime(
    &self
  ) -> NaiveDateTime {
    self.date.and_time(NaiveTime::MIN)
      + Duration::hours(i64::from(
        self.min_hour
      ))
  }

  /// A max hour of 24 lands on the
  /// following midnight.
  pub fn max_datetime(
    &self
  ) -> NaiveDateTime {
    self.date.and_time(NaiveTime::MIN)
      + Duration::hours(i64::from(
        self.max_hour
      ))
  }

  pub fn hour_count(&self) -> u32 {
    self.max_hour.saturating_sub(self.min_hour)
  }

  pub fn label(&self) -> String {
    format!(
      "{} - {}",
      format_hour(self.min_hour),
      format_hour(self.max_hour)
    )
  }

  pub fn to_dto(&self) -> ViewportDto {
    ViewportDto {
      date:     self
        .date
        .format("%Y-%m-%d")
        .to_string(),
      min_time: format_hour(
        self.min_hour
      ),
      max_time: format_hour(
        self.max_hour
      )
    }
  }
}

fn format_hour(hour: u32) -> String {
  format!("{hour:02}:00")
}

/// Computes the visible hour range.
///
/// Month and agenda views always get
/// the default hours. Day and week
/// views look at every booking that
/// overlaps the Monday-start week
/// around `anchor`: the axis starts at
/// the earlier of the default start and
/// the earliest booking's hour, and ends
/// at the default end unless the latest
/// booking ends after it, in which case
/// the end is that booking's hour,
/// rounded up when it has minutes.
///
/// Bookings that start after they end
/// are skipped.
pub fn compute_viewport(
  anchor: NaiveDate,
  mode: ViewMode,
  bookings: &[Booking],
  settings: &CalendarSettings
) -> Viewport {
  let hours = settings.hours;
  if !mode.has_time_axis() {
    return Viewport::from_hours(
      anchor, hours
    );
  }

  let tz = settings.timezone;
  let week_start = start_of_day(
    tz,
    start_of_week(anchor)
  );
  let week_end =
    end_of_day(tz, end_of_week(anchor));

  let Some((earliest, latest)) =
    overlapping_extent(
      bookings, week_start, week_end
    )
  else {
    trace!(
      %anchor,
      %mode,
      "no bookings in week; default viewport"
    );
    return Viewport::from_hours(
      anchor, hours
    );
  };

  let earliest = earliest.with_timezone(&tz);
  let latest = latest.with_timezone(&tz);

  let min_hour = hours
    .start_hour
    .min(earliest.hour());

  let end_hour = latest.hour();
  let has_minutes = latest.minute() > 0;
  let max_hour = if end_hour
    > hours.end_hour
    || (end_hour == hours.end_hour
      && has_minutes)
  {
    if has_minutes {
      end_hour + 1
    } else {
      end_hour
    }
  } else {
    hours.end_hour
  };

  debug!(
    %anchor,
    %mode,
    min_hour,
    max_hour,
    "computed viewport"
  );

  Viewport {
    date: anchor,
    min_hour,
    max_hour
  }
}

fn overlapping_extent(
  bookings: &[Booking],
  range_start: DateTime<Utc>,
  range_end: DateTime<Utc>
) -> Option<(DateTime<Utc>, DateTime<Utc>)>
{
  bookings
    .iter()
    .filter(|booking| {
      if booking.is_well_formed() {
        return true;
      }
      debug!(
        id = %booking.id,
        "skipping booking that starts after it ends"
      );
      false
    })
    .filter(|booking| {
      booking
        .overlaps(range_start, range_end)
    })
    .fold(None, |acc, booking| {
      Some(match acc {
        | None => {
          (booking.start, booking.end)
        }
        | Some((earliest, latest)) => {
          (
            earliest.min(booking.start),
            latest.max(booking.end)
          )
        }
      })
    })
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::*;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn booking(
    start: (u32, u32, u32),
    end: (u32, u32, u32)
  ) -> Booking {
    let at = |(d, h, m): (u32, u32, u32)| {
      Utc
        .with_ymd_and_hms(
          2024, 6, d, h, m, 0
        )
        .single()
        .expect("valid instant")
    };
    Booking::new_scheduled(
      "Lesson".to_string(),
      at(start),
      at(end)
    )
  }

  fn hours(
    viewport: Viewport
  ) -> (u32, u32) {
    (
      viewport.min_hour,
      viewport.max_hour
    )
  }

  #[test]
  fn week_widens_for_early_and_late_bookings()
   {
    let settings =
      CalendarSettings::default();
    let bookings = vec![
      booking((10, 7, 30), (10, 8, 30)),
      booking((12, 19, 0), (12, 20, 0)),
    ];
    let viewport = compute_viewport(
      date(2024, 6, 10),
      ViewMode::Week,
      &bookings,
      &settings
    );
    assert_eq!(hours(viewport), (7, 20));
    assert_eq!(viewport.label(), "07:00 - 20:00");
    assert_eq!(
      viewport.max_time(),
      NaiveTime::from_hms_opt(20, 0, 0)
    );
    assert_eq!(
      viewport.min_datetime(),
      date(2024, 6, 10)
        .and_hms_opt(7, 0, 0)
        .expect("valid")
    );
  }

  #[test]
  fn max_hour_rounding_rules() {
    let settings =
      CalendarSettings::default();
    let anchor = date(2024, 6, 12);
    let cases = [
      ((12, 18, 0), (9, 18)),
      ((12, 18, 30), (9, 19)),
      ((12, 19, 0), (9, 19)),
      ((12, 19, 15), (9, 20)),
      ((12, 17, 45), (9, 18)),
    ];
    for (end, expected) in cases {
      let bookings =
        vec![booking((12, 10, 0), end)];
      let viewport = compute_viewport(
        anchor,
        ViewMode::Day,
        &bookings,
        &settings
      );
      assert_eq!(
        hours(viewport),
        expected,
        "end {end:?}"
      );
    }
  }

  #[test]
  fn late_night_booking_reaches_midnight()
   {
    let settings =
      CalendarSettings::default();
    let bookings = vec![booking(
      (14, 22, 0),
      (14, 23, 30)
    )];
    let viewport = compute_viewport(
      date(2024, 6, 14),
      ViewMode::Week,
      &bookings,
      &settings
    );
    assert_eq!(hours(viewport), (9, 24));
    assert_eq!(viewport.max_time(), None);
    assert_eq!(
      viewport.max_datetime(),
      date(2024, 6, 15)
        .and_hms_opt(0, 0, 0)
        .expect("valid")
    );
  }

  #[test]
  fn ignores_bookings_outside_week_and_inverted()
   {
    let settings =
      CalendarSettings::default();
    let bookings = vec![
      // previous week
      booking((7, 6, 0), (7, 7, 0)),
      // next week
      booking((17, 21, 0), (17, 22, 0)),
      booking((11, 20, 0), (11, 5, 0)),
    ];
    let viewport = compute_viewport(
      date(2024, 6, 11),
      ViewMode::Week,
      &bookings,
      &settings
    );
    assert_eq!(hours(viewport), (9, 18));
  }

  #[test]
  fn booking_ending_at_week_start_is_excluded()
   {
    let settings =
      CalendarSettings::default();
    let bookings = vec![booking(
      (9, 6, 0),
      (10, 0, 0)
    )];
    let viewport = compute_viewport(
      date(2024, 6, 12),
      ViewMode::Week,
      &bookings,
      &settings
    );
    assert_eq!(hours(viewport), (9, 18));

    let previous = compute_viewport(
      date(2024, 6, 5),
      ViewMode::Week,
      &bookings,
      &settings
    );
    assert_eq!(hours(previous), (6, 18));
  }

  #[test]
  fn later_short_booking_can_reset_max_hour()
   {
    let settings =
      CalendarSettings::default();
    let evening =
      booking((10, 17, 37), (10, 20, 1));
    let before = compute_viewport(
      date(2024, 6, 12),
      ViewMode::Week,
      std::slice::from_ref(&evening),
      &settings
    );
    assert_eq!(hours(before), (9, 21));

    // latest end is now Thursday 00:15,
    // whose hour sits below the default
    let bookings = vec![
      evening,
      booking((13, 0, 0), (13, 0, 15)),
    ];
    let after = compute_viewport(
      date(2024, 6, 12),
      ViewMode::Week,
      &bookings,
      &settings
    );
    assert_eq!(hours(after), (0, 18));
  }

  #[test]
  fn month_and_agenda_use_default_hours()
   {
    let settings =
      CalendarSettings::default();
    let bookings = vec![booking(
      (10, 5, 0),
      (10, 23, 0)
    )];
    for mode in
      [ViewMode::Month, ViewMode::Agenda]
    {
      let viewport = compute_viewport(
        date(2024, 6, 10),
        mode,
        &bookings,
        &settings
      );
      assert_eq!(hours(viewport), (9, 18));
      assert_eq!(
        viewport.date,
        date(2024, 6, 10)
      );
    }
  }

  #[test]
  fn hours_are_read_in_calendar_timezone()
   {
    let settings = CalendarSettings {
      timezone:
        chrono_tz::Australia::Sydney,
      ..CalendarSettings::default()
    };
    // 21:00-22:00 UTC on the 10th is
    // 07:00-08:00 on the 11th in Sydney
    let bookings = vec![booking(
      (10, 21, 0),
      (10, 22, 0)
    )];
    let viewport = compute_viewport(
      date(2024, 6, 11),
      ViewMode::Day,
      &bookings,
      &settings
    );
    assert_eq!(hours(viewport), (7, 18));
  }

  #[test]
  fn custom_default_hours() {
    let settings = CalendarSettings {
      hours: HourWindow::new(8, 20)
        .expect("valid hours"),
      ..CalendarSettings::default()
    };
    let viewport = compute_viewport(
      date(2024, 6, 11),
      ViewMode::Week,
      &[],
      &settings
    );
    assert_eq!(hours(viewport), (8, 20));
    assert_eq!(viewport.hour_count(), 12);
  }

  #[test]
  fn hour_window_validation() {
    assert!(HourWindow::new(24, 24).is_err());
    assert!(HourWindow::new(10, 9).is_err());
    assert!(HourWindow::new(0, 24).is_ok());
    let clamped =
      HourWindow::sanitized(30, 40);
    assert_eq!(
      (
        clamped.start_hour(),
        clamped.end_hour()
      ),
      (23, 24)
    );
  }
}
