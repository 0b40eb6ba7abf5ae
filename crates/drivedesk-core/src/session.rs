use chrono::NaiveDate;
use drivedesk_shared::CalendarFrameDto;
use tracing::{debug, info, instrument, warn};

use crate::booking::Booking;
use crate::config::CalendarSettings;
use crate::fetch::{FetchWindow, compute_fetch_window};
use crate::source::BookingSource;
use crate::stats::BookingStats;
use crate::view::{Navigation, ViewMode, ViewState};
use crate::viewport::{Viewport, compute_viewport};

/// A booking request issued for one view state. `seq` increases with every
/// request so late responses can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub seq: u64,
    pub window: FetchWindow,
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub seq: u64,
    pub bookings: Vec<Booking>,
}

/// Caller-side state around the calculator: current view, the bookings last
/// loaded for it, and the sequence number of the newest request. Only a
/// response to the newest request replaces the loaded bookings.
#[derive(Debug, Clone)]
pub struct CalendarSession {
    settings: CalendarSettings,
    state: ViewState,
    bookings: Vec<Booking>,
    latest_seq: u64,
    loaded_seq: Option<u64>,
}

impl CalendarSession {
    pub fn new(settings: CalendarSettings, state: ViewState) -> Self {
        Self {
            settings,
            state,
            bookings: vec![],
            latest_seq: 0,
            loaded_seq: None,
        }
    }

    pub fn settings(&self) -> &CalendarSettings {
        &self.settings
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    /// Whether the loaded bookings answer the newest request.
    pub fn is_current(&self) -> bool {
        self.loaded_seq == Some(self.latest_seq)
    }

    #[instrument(skip(self))]
    pub fn navigate(&mut self, nav: Navigation) -> FetchRequest {
        self.state = self.state.navigate(nav);
        self.refetch()
    }

    #[instrument(skip(self))]
    pub fn set_view(&mut self, mode: ViewMode) -> FetchRequest {
        self.state = self.state.with_mode(mode);
        self.refetch()
    }

    #[instrument(skip(self))]
    pub fn go_to(&mut self, anchor: NaiveDate) -> FetchRequest {
        self.state = self.state.with_anchor(anchor);
        self.refetch()
    }

    /// New request for the current state. Also used after a booking is
    /// created, edited, deleted or changes status.
    pub fn refetch(&mut self) -> FetchRequest {
        self.latest_seq += 1;
        let request = FetchRequest {
            seq: self.latest_seq,
            window: self.fetch_window(),
        };
        debug!(
            seq = request.seq,
            anchor = %self.state.anchor,
            mode = %self.state.mode,
            start = %request.window.start,
            end = %request.window.end,
            "issued fetch request"
        );
        request
    }

    /// Applies a response if it answers the newest request. Returns false
    /// and keeps the current bookings otherwise.
    #[instrument(skip(self, response), fields(seq = response.seq, count = response.bookings.len()))]
    pub fn accept(&mut self, response: FetchResponse) -> bool {
        if response.seq != self.latest_seq {
            warn!(
                latest = self.latest_seq,
                "dropping stale booking response"
            );
            return false;
        }
        self.bookings = response.bookings;
        self.loaded_seq = Some(response.seq);
        true
    }

    /// Issues a request and feeds the source's answer straight back in.
    #[instrument(skip(self, source))]
    pub fn refresh(&mut self, source: &dyn BookingSource) -> anyhow::Result<FetchRequest> {
        let request = self.refetch();
        let bookings = source.fetch(&request.window)?;
        info!(seq = request.seq, count = bookings.len(), "refreshed bookings");
        self.accept(FetchResponse {
            seq: request.seq,
            bookings,
        });
        Ok(request)
    }

    pub fn viewport(&self) -> Viewport {
        compute_viewport(
            self.state.anchor,
            self.state.mode,
            &self.bookings,
            &self.settings,
        )
    }

    pub fn fetch_window(&self) -> FetchWindow {
        compute_fetch_window(self.state.anchor, self.state.mode, self.settings.timezone)
    }

    pub fn stats(&self) -> BookingStats {
        BookingStats::summarize(&self.bookings, &self.fetch_window())
    }

    pub fn frame(&self) -> CalendarFrameDto {
        let window = self.fetch_window();
        CalendarFrameDto {
            anchor_date: self.state.anchor.format("%Y-%m-%d").to_string(),
            view: self.state.mode.to_dto(),
            title: self.state.title(),
            viewport: self.viewport().to_dto(),
            fetch_window: window.to_dto(self.latest_seq),
            bookings: self
                .bookings
                .iter()
                .filter(|booking| window.overlaps(booking))
                .map(Booking::to_dto)
                .collect(),
            stats: BookingStats::summarize(&self.bookings, &window).to_dto(),
        }
    }
}
