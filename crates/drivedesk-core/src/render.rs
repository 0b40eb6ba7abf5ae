use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::booking::{Booking, BookingStatus};
use crate::config::Config;
use crate::fetch::FetchWindow;
use crate::stats::BookingStats;
use crate::viewport::Viewport;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    pub fn write_viewport<W: Write>(
        &self,
        mut out: W,
        title: &str,
        viewport: &Viewport,
    ) -> anyhow::Result<()> {
        writeln!(out, "{title}")?;
        writeln!(out, "hours     {}", viewport.label())?;
        writeln!(out, "date      {}", viewport.date.format("%Y-%m-%d"))?;
        Ok(())
    }

    pub fn write_window<W: Write>(
        &self,
        mut out: W,
        title: &str,
        window: &FetchWindow,
        tz: Tz,
    ) -> anyhow::Result<()> {
        let (first, last) = window.local_dates(tz);
        writeln!(out, "{title}")?;
        writeln!(out, "days      {first} .. {last} ({tz})")?;
        writeln!(out, "start     {}", window.start.to_rfc3339())?;
        writeln!(out, "end       {}", window.end.to_rfc3339())?;
        Ok(())
    }

    #[tracing::instrument(skip(self, out, bookings, tz), fields(count = bookings.len()))]
    pub fn write_agenda<W: Write>(
        &self,
        out: W,
        bookings: &[Booking],
        tz: Tz,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "Date".to_string(),
            "Time".to_string(),
            "Status".to_string(),
            "Type".to_string(),
            "Title".to_string(),
        ];

        let rows = bookings
            .iter()
            .map(|booking| {
                let start = booking.start.with_timezone(&tz);
                let end = booking.end.with_timezone(&tz);
                let status = booking.status.as_key();
                let status = match booking.status {
                    BookingStatus::Scheduled => status.to_string(),
                    BookingStatus::Completed => self.paint(status, "32"),
                    BookingStatus::Cancelled => self.paint(status, "2"),
                };
                vec![
                    start.format("%a %Y-%m-%d").to_string(),
                    format!("{}-{}", start.format("%H:%M"), end.format("%H:%M")),
                    status,
                    booking.lesson_type.clone(),
                    booking.title.clone(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    pub fn write_stats<W: Write>(&self, mut out: W, stats: &BookingStats) -> anyhow::Result<()> {
        writeln!(out, "bookings  {}", stats.total)?;
        writeln!(out, "scheduled {}", stats.scheduled)?;
        writeln!(out, "completed {}", stats.completed)?;
        writeln!(out, "cancelled {}", stats.cancelled)?;
        writeln!(
            out,
            "hours     {}h{:02}m",
            stats.scheduled_minutes / 60,
            stats.scheduled_minutes % 60
        )?;
        writeln!(out, "students  {}", stats.students)?;
        for (lesson_type, count) in &stats.by_lesson_type {
            writeln!(out, "  {lesson_type:<16} {count}")?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| UnicodeWidthStr::width(header.as_str()))
        .collect();

    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(visible_width(cell));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let padding = width.saturating_sub(visible_width(cell));
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn visible_width(cell: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(cell).as_str())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
