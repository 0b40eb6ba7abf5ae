use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono_tz::Tz;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::datetime::resolve_timezone;
use crate::view::ViewMode;
use crate::viewport::{
  DEFAULT_DAY_END_HOUR,
  DEFAULT_DAY_START_HOUR,
  HourWindow
};

const RC_ENV_VAR: &str = "DRIVEDESKRC";
const RC_FILE_NAME: &str =
  ".drivedeskrc";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::defaults();

    let rc = resolve_rc_path(
      rc_override
    )?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading drivedeskrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no drivedeskrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  /// Built-in settings only; nothing is
  /// read from disk.
  pub fn defaults() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "bookings.location".to_string(),
      "~/.drivedesk/bookings.jsonl"
        .to_string()
    );
    map.insert(
      "calendar.view".to_string(),
      ViewMode::Week.as_key().to_string()
    );
    map.insert(
      "calendar.day_start".to_string(),
      DEFAULT_DAY_START_HOUR.to_string()
    );
    map.insert(
      "calendar.day_end".to_string(),
      DEFAULT_DAY_END_HOUR.to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );

    Config {
      map,
      loaded_files: vec![]
    }
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  /// Unparseable numbers are reported
  /// and treated as unset.
  pub fn get_u32(
    &self,
    key: &str
  ) -> Option<u32> {
    let raw = self.map.get(key)?;
    match raw.trim().parse::<u32>() {
      | Ok(value) => Some(value),
      | Err(err) => {
        warn!(
          key,
          value = %raw,
          error = %err,
          "ignoring non-numeric config value"
        );
        None
      }
    }
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        if self
          .loaded_files
          .contains(&include_path)
        {
          warn!(include = %include_path.display(), "include cycle detected; skipping");
          continue;
        }
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

/// Calendar inputs the calculator needs
/// besides the view state. Built once
/// by the caller and passed in
/// explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarSettings {
  pub timezone:     Tz,
  pub hours:        HourWindow,
  pub default_view: ViewMode
}

impl Default for CalendarSettings {
  fn default() -> Self {
    Self {
      timezone:     chrono_tz::UTC,
      hours:        HourWindow::default(),
      default_view: ViewMode::Week
    }
  }
}

impl CalendarSettings {
  #[tracing::instrument(skip(cfg))]
  pub fn from_config(
    cfg: &Config
  ) -> Self {
    let timezone = resolve_timezone(
      cfg
        .get("calendar.timezone")
        .as_deref()
    );
    let hours = HourWindow::sanitized(
      cfg
        .get_u32("calendar.day_start")
        .unwrap_or(
          DEFAULT_DAY_START_HOUR
        ),
      cfg
        .get_u32("calendar.day_end")
        .unwrap_or(DEFAULT_DAY_END_HOUR)
    );
    let default_view = cfg
      .get("calendar.view")
      .map(|key| {
        ViewMode::from_key_or_default(
          &key
        )
      })
      .unwrap_or(ViewMode::Week);

    info!(
      timezone = %timezone,
      day_start = hours.start_hour(),
      day_end = hours.end_hour(),
      default_view = %default_view,
      "resolved calendar settings"
    );

    Self {
      timezone,
      hours,
      default_view
    }
  }
}

#[tracing::instrument(skip(
  cfg,
  override_path
))]
pub fn resolve_bookings_path(
  cfg: &Config,
  override_path: Option<&Path>
) -> anyhow::Result<PathBuf> {
  if let Some(path) = override_path {
    return Ok(path.to_path_buf());
  }

  if let Some(cfg_value) =
    cfg.get("bookings.location")
  {
    return Ok(expand_tilde(
      Path::new(&cfg_value)
    ));
  }

  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(
    home
      .join(".drivedesk")
      .join("bookings.jsonl")
  )
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping drivedeskrc"
    );
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
