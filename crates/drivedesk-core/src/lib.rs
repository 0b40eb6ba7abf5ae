pub mod booking;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod fetch;
pub mod render;
pub mod session;
pub mod source;
pub mod stats;
pub mod view;
pub mod viewport;

use std::ffi::OsString;
use std::io;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use booking::{
  Booking,
  BookingStatus
};
pub use config::CalendarSettings;
pub use fetch::{
  FetchWindow,
  compute_fetch_window
};
pub use session::CalendarSession;
pub use source::{
  BookingSource,
  JsonlBookingSource
};
pub use view::{
  ViewMode,
  ViewState
};
pub use viewport::{
  HourWindow,
  Viewport,
  compute_viewport
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    command = cli.command.name(),
    "starting drivedesk CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.rc_file.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let settings =
    CalendarSettings::from_config(&cfg);
  let bookings_path =
    config::resolve_bookings_path(
      &cfg,
      cli.bookings.as_deref()
    )
    .context(
      "failed to resolve bookings \
       file"
    )?;
  let source =
    JsonlBookingSource::new(
      &bookings_path
    );

  let renderer =
    render::Renderer::new(&cfg)?;
  let today =
    datetime::today_in(settings.timezone);

  commands::dispatch(
    io::stdout().lock(),
    &source,
    &settings,
    &renderer,
    &cli.command,
    today
  )?;

  info!("done");
  Ok(())
}
