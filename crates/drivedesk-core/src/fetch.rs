use chrono::{
  DateTime,
  Datelike,
  NaiveDate,
  SecondsFormat,
  Utc
};
use chrono_tz::Tz;
use drivedesk_shared::FetchWindowDto;

use crate::booking::Booking;
use crate::datetime::{
  end_of_day,
  end_of_week,
  first_day_of_month,
  last_day_of_month,
  local_date,
  shift_months,
  start_of_day,
  start_of_week
};
use crate::view::ViewMode;

/// Months past the anchor month that the
/// agenda view loads up front.
pub const AGENDA_LOOKAHEAD_MONTHS: i32 =
  2;

/// Instants to request from storage.
/// Both ends are inclusive; `end` is the
/// last millisecond of the final day.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct FetchWindow {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>
}

impl FetchWindow {
  pub fn contains(
    &self,
    instant: DateTime<Utc>
  ) -> bool {
    instant >= self.start
      && instant <= self.end
  }

  pub fn overlaps(
    &self,
    booking: &Booking
  ) -> bool {
    booking.overlaps(self.start, self.end)
  }

  /// First and last calendar day
  /// covered, in `tz`.
  pub fn local_dates(
    &self,
    tz: Tz
  ) -> (NaiveDate, NaiveDate) {
    (
      local_date(tz, self.start),
      local_date(tz, self.end)
    )
  }

  pub fn to_dto(
    &self,
    seq: u64
  ) -> FetchWindowDto {
    FetchWindowDto {
      seq,
      start: self.start.to_rfc3339_opts(
        SecondsFormat::Millis,
        true
      ),
      end: self.end.to_rfc3339_opts(
        SecondsFormat::Millis,
        true
      )
    }
  }
}

/// Date range to load for `mode` around
/// `anchor`:
///
/// - day: the anchor day
/// - week: Monday to Sunday
/// - month: the anchor month
/// - agenda: the anchor month through
///   the end of the month two months
///   later
pub fn compute_fetch_window(
  anchor: NaiveDate,
  mode: ViewMode,
  tz: Tz
) -> FetchWindow {
  let (first, last) = match mode {
    | ViewMode::Day => (anchor, anchor),
    | ViewMode::Week => {
      (
        start_of_week(anchor),
        end_of_week(anchor)
      )
    }
    | ViewMode::Month => {
      month_bounds(anchor, 0)
    }
    | ViewMode::Agenda => {
      (
        month_bounds(anchor, 0).0,
        month_bounds(
          anchor,
          AGENDA_LOOKAHEAD_MONTHS
        )
        .1
      )
    }
  };

  tracing::trace!(
    %anchor,
    %mode,
    %first,
    %last,
    "computed fetch window"
  );

  FetchWindow {
    start: start_of_day(tz, first),
    end:   end_of_day(tz, last)
  }
}

fn month_bounds(
  anchor: NaiveDate,
  offset: i32
) -> (NaiveDate, NaiveDate) {
  let shifted =
    shift_months(anchor, offset);
  (
    first_day_of_month(
      shifted.year(),
      shifted.month()
    ),
    last_day_of_month(
      shifted.year(),
      shifted.month()
    )
  )
}
