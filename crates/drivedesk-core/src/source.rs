use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::booking::Booking;
use crate::fetch::FetchWindow;

/// Read side of the booking store: "bookings within this window".
pub trait BookingSource {
    fn fetch(&self, window: &FetchWindow) -> anyhow::Result<Vec<Booking>>;
}

impl BookingSource for Vec<Booking> {
    fn fetch(&self, window: &FetchWindow) -> anyhow::Result<Vec<Booking>> {
        Ok(select_window(self.iter().cloned(), window))
    }
}

/// Bookings exported from the backend as JSON lines, one row per line.
#[derive(Debug, Clone)]
pub struct JsonlBookingSource {
    pub path: PathBuf,
}

impl JsonlBookingSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Every booking in the file. A missing file reads as empty.
    #[tracing::instrument(skip(self), fields(file = %self.path.display()))]
    pub fn load_all(&self) -> anyhow::Result<Vec<Booking>> {
        if !self.path.exists() {
            warn!("bookings file does not exist; treating as empty");
            return Ok(vec![]);
        }
        load_jsonl(&self.path)
            .with_context(|| format!("failed to load bookings from {}", self.path.display()))
    }
}

impl BookingSource for JsonlBookingSource {
    #[tracing::instrument(skip(self, window), fields(start = %window.start, end = %window.end))]
    fn fetch(&self, window: &FetchWindow) -> anyhow::Result<Vec<Booking>> {
        let all = self.load_all()?;
        let total = all.len();
        let selected = select_window(all, window);
        info!(total, selected = selected.len(), "fetched bookings");
        Ok(selected)
    }
}

fn select_window<I>(bookings: I, window: &FetchWindow) -> Vec<Booking>
where
    I: IntoIterator<Item = Booking>,
{
    let mut out: Vec<Booking> = bookings
        .into_iter()
        .filter(|booking| window.overlaps(booking))
        .collect();
    out.sort_by_key(|booking| (booking.start, booking.end));
    out
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<Booking>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let booking: Booking = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        booking
            .validate()
            .with_context(|| format!("invalid booking at {} line {}", path.display(), idx + 1))?;
        out.push(booking);
    }

    debug!(count = out.len(), "loaded bookings from jsonl");
    Ok(out)
}
