use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use drivedesk_shared::ViewModeDto;
use tracing::warn;

use crate::datetime::{
    add_days, end_of_week, first_day_of_month, last_day_of_month, shift_months, start_of_week,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewMode {
    Day,
    Week,
    Month,
    Agenda,
}

impl ViewMode {
    pub fn all() -> [Self; 4] {
        [Self::Day, Self::Week, Self::Month, Self::Agenda]
    }

    pub fn as_key(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Agenda => "agenda",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::all()
            .into_iter()
            .find(|mode| mode.as_key().eq_ignore_ascii_case(key))
    }

    /// Unrecognised keys fall back to the agenda view, which also carries the
    /// widest fetch window.
    pub fn from_key_or_default(key: &str) -> Self {
        Self::from_key(key).unwrap_or_else(|| {
            warn!(key, "unknown view mode; using agenda");
            Self::Agenda
        })
    }

    /// Day and week grids have an hour axis; month and agenda do not.
    pub fn has_time_axis(self) -> bool {
        matches!(self, Self::Day | Self::Week)
    }

    pub fn to_dto(self) -> ViewModeDto {
        match self {
            Self::Day => ViewModeDto::Day,
            Self::Week => ViewModeDto::Week,
            Self::Month => ViewModeDto::Month,
            Self::Agenda => ViewModeDto::Agenda,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for ViewMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| {
            anyhow!("unknown view mode: {s} (expected one of day, week, month, agenda)")
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Previous,
    Next,
    Today(NaiveDate),
}

/// What the calendar is showing: the anchor date and the view mode. Any mode
/// can switch to any other; the anchor moves freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    pub anchor: NaiveDate,
    pub mode: ViewMode,
}

impl ViewState {
    pub fn new(anchor: NaiveDate, mode: ViewMode) -> Self {
        Self { anchor, mode }
    }

    pub fn navigate(self, nav: Navigation) -> Self {
        let anchor = match nav {
            Navigation::Previous => shift_anchor(self.anchor, self.mode, -1),
            Navigation::Next => shift_anchor(self.anchor, self.mode, 1),
            Navigation::Today(today) => today,
        };
        Self { anchor, ..self }
    }

    pub fn with_mode(self, mode: ViewMode) -> Self {
        Self { mode, ..self }
    }

    pub fn with_anchor(self, anchor: NaiveDate) -> Self {
        Self { anchor, ..self }
    }

    /// Dates visibly rendered for this state, inclusive.
    pub fn displayed_range(&self) -> (NaiveDate, NaiveDate) {
        displayed_range(self.anchor, self.mode)
    }

    pub fn title(&self) -> String {
        let anchor = self.anchor;
        match self.mode {
            ViewMode::Day => format!("Day {}", anchor.format("%A, %Y-%m-%d")),
            ViewMode::Week => format!(
                "Week {} - {}",
                start_of_week(anchor).format("%Y-%m-%d"),
                end_of_week(anchor).format("%Y-%m-%d")
            ),
            ViewMode::Month => format!("Month {}", anchor.format("%B %Y")),
            ViewMode::Agenda => format!(
                "Agenda {} - {}",
                anchor.format("%B %Y"),
                shift_months(anchor, 2).format("%B %Y")
            ),
        }
    }
}

pub fn shift_anchor(anchor: NaiveDate, mode: ViewMode, step: i64) -> NaiveDate {
    match mode {
        ViewMode::Day => add_days(anchor, step),
        ViewMode::Week => add_days(anchor, step.saturating_mul(7)),
        ViewMode::Month | ViewMode::Agenda => {
            let months = i32::try_from(step).unwrap_or(if step < 0 { i32::MIN } else { i32::MAX });
            shift_months(anchor, months)
        }
    }
}

pub fn displayed_range(anchor: NaiveDate, mode: ViewMode) -> (NaiveDate, NaiveDate) {
    match mode {
        ViewMode::Day => (anchor, anchor),
        ViewMode::Week => (start_of_week(anchor), end_of_week(anchor)),
        ViewMode::Month | ViewMode::Agenda => (
            first_day_of_month(anchor.year(), anchor.month()),
            last_day_of_month(anchor.year(), anchor.month()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn keys_roundtrip_and_unknown_falls_back_to_agenda() {
        for mode in ViewMode::all() {
            assert_eq!(ViewMode::from_key(mode.as_key()), Some(mode));
        }
        assert_eq!(ViewMode::from_key(" Week "), Some(ViewMode::Week));
        assert_eq!(ViewMode::from_key_or_default("timeline"), ViewMode::Agenda);
        assert!("fortnight".parse::<ViewMode>().is_err());
    }

    #[test]
    fn navigation_steps_depend_on_view() {
        let state = ViewState::new(date(2024, 1, 31), ViewMode::Month);
        assert_eq!(state.navigate(Navigation::Next).anchor, date(2024, 2, 29));

        let week = state.with_mode(ViewMode::Week);
        assert_eq!(week.navigate(Navigation::Previous).anchor, date(2024, 1, 24));

        let day = state.with_mode(ViewMode::Day);
        assert_eq!(day.navigate(Navigation::Next).anchor, date(2024, 2, 1));

        let today = day.navigate(Navigation::Today(date(2024, 6, 10)));
        assert_eq!(today.anchor, date(2024, 6, 10));
        assert_eq!(today.mode, ViewMode::Day);
    }

    #[test]
    fn displayed_ranges() {
        let anchor = date(2024, 6, 12);
        assert_eq!(
            displayed_range(anchor, ViewMode::Week),
            (date(2024, 6, 10), date(2024, 6, 16))
        );
        assert_eq!(
            displayed_range(anchor, ViewMode::Month),
            (date(2024, 6, 1), date(2024, 6, 30))
        );
        assert_eq!(displayed_range(anchor, ViewMode::Day), (anchor, anchor));
    }

    #[test]
    fn titles_name_the_period() {
        let state = ViewState::new(date(2024, 6, 12), ViewMode::Week);
        assert_eq!(state.title(), "Week 2024-06-10 - 2024-06-16");
        assert_eq!(
            state.with_mode(ViewMode::Agenda).title(),
            "Agenda June 2024 - August 2024"
        );
    }
}
