use std::io::Write;

use anyhow::Context;
use chrono::NaiveDate;
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::cli::{Command, ViewArgs};
use crate::config::CalendarSettings;
use crate::datetime::parse_date_expr;
use crate::render::Renderer;
use crate::session::CalendarSession;
use crate::source::BookingSource;
use crate::view::{ViewState, shift_anchor};

/// Runs one command against `source`, writing its output to `out`. `today`
/// is the current date in the calendar timezone.
#[instrument(skip(out, source, settings, renderer, command), fields(command = command.name()))]
pub fn dispatch<W: Write>(
    mut out: W,
    source: &dyn BookingSource,
    settings: &CalendarSettings,
    renderer: &Renderer,
    command: &Command,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let args = command.view_args();
    let state = resolve_state(args, settings, today)?;
    debug!(anchor = %state.anchor, mode = %state.mode, "resolved view state");

    if let Command::Shift { step, .. } = command {
        return cmd_shift(out, state, *step, args.json);
    }

    let mut session = CalendarSession::new(*settings, state);
    session.refresh(source)?;

    if args.json {
        let frame = session.frame();
        let text = serde_json::to_string_pretty(&frame).context("failed to serialize frame")?;
        writeln!(out, "{text}")?;
        return Ok(());
    }

    let title = state.title();
    match command {
        Command::Viewport(_) => renderer.write_viewport(out, &title, &session.viewport()),
        Command::Window(_) => renderer.write_window(
            out,
            &title,
            &session.fetch_window(),
            settings.timezone,
        ),
        Command::Agenda(_) => {
            if session.bookings().is_empty() {
                info!("no bookings in window");
                writeln!(out, "No bookings.")?;
                return Ok(());
            }
            renderer.write_agenda(out, session.bookings(), settings.timezone)
        }
        Command::Stats(_) => renderer.write_stats(out, &session.stats()),
        Command::Shift { .. } => Ok(()),
    }
}

fn resolve_state(
    args: &ViewArgs,
    settings: &CalendarSettings,
    today: NaiveDate,
) -> anyhow::Result<ViewState> {
    let anchor = parse_date_expr(&args.date, today, settings.timezone)
        .with_context(|| format!("invalid --date value: {}", args.date))?;
    let mode = args.view.unwrap_or(settings.default_view);
    Ok(ViewState::new(anchor, mode))
}

fn cmd_shift<W: Write>(mut out: W, state: ViewState, step: i64, json: bool) -> anyhow::Result<()> {
    let anchor = shift_anchor(state.anchor, state.mode, step);
    debug!(from = %state.anchor, to = %anchor, step, "shifted anchor");

    if json {
        let value = json!({
            "anchor_date": anchor.format("%Y-%m-%d").to_string(),
            "view": state.mode.as_key(),
            "title": state.with_anchor(anchor).title(),
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    } else {
        writeln!(out, "{}", anchor.format("%Y-%m-%d"))?;
    }
    Ok(())
}
