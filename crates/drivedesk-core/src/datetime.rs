use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "drivedesk-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "DRIVEDESK_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "DRIVEDESK_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Resolves the calendar timezone.
///
/// Order: the configured value, then
/// `DRIVEDESK_TIMEZONE`, then the
/// `drivedesk-time.toml` file, then
/// UTC. Invalid ids are logged and
/// skipped.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  if let Some(raw) = configured
    && let Some(tz) = parse_timezone(
      raw,
      "calendar.timezone"
    )
  {
    return tz;
  }

  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(
        &raw,
        TIMEZONE_ENV_VAR
      )
  {
    return tz;
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return tz;
  }

  tracing::debug!(
    "no calendar timezone configured; \
     using UTC"
  );
  chrono_tz::UTC
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &Path
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "configured calendar timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Maps a wall-clock time in `tz` to
/// UTC. Ambiguous times take the
/// earlier instant; times inside a DST
/// gap move forward to the first valid
/// wall-clock time.
pub fn local_to_utc(
  tz: Tz,
  local: NaiveDateTime
) -> DateTime<Utc> {
  let mut candidate = local;
  for _ in 0..8 {
    match tz
      .from_local_datetime(&candidate)
    {
      | LocalResult::Single(dt) => {
        return dt.with_timezone(&Utc);
      }
      | LocalResult::Ambiguous(
        first,
        second
      ) => {
        let chosen = if first <= second {
          first
        } else {
          second
        };
        return chosen
          .with_timezone(&Utc);
      }
      | LocalResult::None => {
        candidate +=
          Duration::minutes(15);
      }
    }
  }

  tracing::warn!(
    timezone = %tz,
    local = %local,
    "no valid local time near \
     requested instant; treating as UTC"
  );
  Utc.from_utc_datetime(&local)
}

#[must_use]
pub fn start_of_day(
  tz: Tz,
  date: NaiveDate
) -> DateTime<Utc> {
  local_to_utc(
    tz,
    date.and_time(NaiveTime::MIN)
  )
}

/// Last millisecond of `date` in `tz`.
#[must_use]
pub fn end_of_day(
  tz: Tz,
  date: NaiveDate
) -> DateTime<Utc> {
  start_of_day(tz, add_days(date, 1))
    - Duration::milliseconds(1)
}

#[must_use]
pub fn local_date(
  tz: Tz,
  instant: DateTime<Utc>
) -> NaiveDate {
  instant.with_timezone(&tz).date_naive()
}

#[must_use]
pub fn today_in(tz: Tz) -> NaiveDate {
  local_date(tz, Utc::now())
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  Duration::try_days(days)
    .and_then(|delta| {
      date.checked_add_signed(delta)
    })
    .unwrap_or(date)
}

/// Monday of the week containing `day`.
#[must_use]
pub fn start_of_week(
  day: NaiveDate
) -> NaiveDate {
  let diff = day
    .weekday()
    .num_days_from_monday()
    as i64;
  add_days(day, -diff)
}

#[must_use]
pub fn end_of_week(
  day: NaiveDate
) -> NaiveDate {
  add_days(start_of_week(day), 6)
}

#[must_use]
pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

#[must_use]
pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

/// Moves by whole months, clamping the
/// day to the target month's length
/// (Jan 31 + 1 month = Feb 28/29).
#[must_use]
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let total = i64::from(date.year())
    * 12
    + i64::from(date.month0())
    + i64::from(months);
  let Ok(year) =
    i32::try_from(total.div_euclid(12))
  else {
    return date;
  };
  let month =
    total.rem_euclid(12) as u32 + 1;
  let day = date
    .day()
    .min(days_in_month(year, month));
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .unwrap_or(date)
}

/// Parses an anchor date expression
/// relative to `today` (a date in
/// `tz`).
#[tracing::instrument(skip(today, tz), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate,
  tz: Tz
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  if token.len() == 4
    && token
      .chars()
      .all(|c| c.is_ascii_digit())
  {
    let year: i32 =
      token.parse().context(
        "invalid 4-digit year"
      )?;
    return NaiveDate::from_ymd_opt(
      year, 1, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid year value: {year}"
      )
    });
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today,
      target_weekday
    ));
  }

  if let Some(target_month) =
    parse_month_name(&lower)
  {
    let this_year =
      first_day_of_month(
        today.year(),
        target_month
      );
    return Ok(if this_year <= today {
      first_day_of_month(
        today.year().saturating_add(1),
        target_month
      )
    } else {
      this_year
    });
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwm])$")
    .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let negative = caps
      .name("sign")
      .map(|m| m.as_str() == "-")
      .unwrap_or(false);
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let num =
      if negative { -num } else { num };
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    return match unit {
      | "d" => Ok(add_days(today, num)),
      | "w" => {
        Ok(add_days(
          today,
          num.saturating_mul(7)
        ))
      }
      | "m" => {
        let months = i32::try_from(num)
          .context(
            "relative month offset out \
             of range"
          )?;
        Ok(shift_months(today, months))
      }
      | _ => {
        Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ))
      }
    };
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(local_date(
      tz,
      dt.with_timezone(&Utc)
    ));
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, 4-digit \
     year, weekday names (e.g. \
     monday), month names (e.g. \
     march), +Nd/+Nw/+Nm, YYYY-MM-DD, \
     RFC3339"
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  add_days(from, delta)
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
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

  #[test]
  fn parses_relative_and_named_dates()
  {
    let today = date(2026, 2, 17);
    let tz = chrono_tz::UTC;

    assert_eq!(
      parse_date_expr(
        "tomorrow", today, tz
      )
      .expect("tomorrow"),
      date(2026, 2, 18)
    );
    assert_eq!(
      parse_date_expr(
        "wednesday",
        today,
        tz
      )
      .expect("weekday"),
      date(2026, 2, 18)
    );
    assert_eq!(
      parse_date_expr(
        "tuesday", today, tz
      )
      .expect("same weekday"),
      date(2026, 2, 24)
    );
    assert_eq!(
      parse_date_expr(
        "march", today, tz
      )
      .expect("month"),
      date(2026, 3, 1)
    );
    assert_eq!(
      parse_date_expr("feb", today, tz)
        .expect("current month"),
      date(2027, 2, 1)
    );
    assert_eq!(
      parse_date_expr("-2w", today, tz)
        .expect("weeks"),
      date(2026, 2, 3)
    );
    assert_eq!(
      parse_date_expr("2028", today, tz)
        .expect("year"),
      date(2028, 1, 1)
    );
  }

  #[test]
  fn rfc3339_uses_calendar_timezone() {
    let today = date(2024, 6, 1);
    let parsed = parse_date_expr(
      "2024-06-10T23:30:00Z",
      today,
      chrono_tz::Australia::Sydney
    )
    .expect("rfc3339");
    assert_eq!(
      parsed,
      date(2024, 6, 11)
    );
  }

  #[test]
  fn rejects_unknown_expression() {
    let err = parse_date_expr(
      "someday",
      date(2024, 6, 1),
      chrono_tz::UTC
    )
    .expect_err("should fail");
    assert!(
      format!("{err:#}")
        .contains("supported formats")
    );
  }

  #[test]
  fn shift_months_clamps_day() {
    assert_eq!(
      shift_months(
        date(2024, 1, 31),
        1
      ),
      date(2024, 2, 29)
    );
    assert_eq!(
      shift_months(
        date(2024, 1, 15),
        -2
      ),
      date(2023, 11, 15)
    );
    assert_eq!(
      shift_months(
        date(2024, 11, 30),
        3
      ),
      date(2025, 2, 28)
    );
  }

  #[test]
  fn week_starts_on_monday() {
    assert_eq!(
      start_of_week(date(2024, 6, 16)),
      date(2024, 6, 10)
    );
    assert_eq!(
      start_of_week(date(2024, 6, 10)),
      date(2024, 6, 10)
    );
    assert_eq!(
      end_of_week(date(2024, 6, 12)),
      date(2024, 6, 16)
    );
  }

  #[test]
  fn day_bounds_follow_dst_changes() {
    let tz =
      chrono_tz::America::New_York;
    let start =
      start_of_day(tz, date(2024, 3, 10));
    let end =
      end_of_day(tz, date(2024, 3, 10));
    assert_eq!(
      start,
      Utc
        .with_ymd_and_hms(
          2024, 3, 10, 5, 0, 0
        )
        .single()
        .expect("valid start")
    );
    // 23-hour day
    assert_eq!(
      (end - start).num_milliseconds(),
      23 * 3_600_000 - 1
    );
  }

  #[test]
  fn gap_times_move_forward() {
    let tz =
      chrono_tz::America::New_York;
    let local = date(2024, 3, 10)
      .and_hms_opt(2, 30, 0)
      .expect("valid local");
    let utc = local_to_utc(tz, local);
    assert_eq!(
      utc,
      Utc
        .with_ymd_and_hms(
          2024, 3, 10, 7, 0, 0
        )
        .single()
        .expect("valid utc")
    );
  }

  #[test]
  fn configured_timezone_wins() {
    assert_eq!(
      resolve_timezone(Some(
        "Europe/London"
      )),
      chrono_tz::Europe::London
    );
  }
}
