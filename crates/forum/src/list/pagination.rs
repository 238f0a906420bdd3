//! Page cursor for online discussions
//!
//! Every fetch is described by a [`PageRequest`] handed out by
//! [`Pagination`]. The result of a fetch is only applied if its request is
//! still the outstanding one, so a late response from a superseded fetch can
//! never overwrite newer state.

use log::{debug, warn};

use crate::models::SortOrder;

/// How a fetched page is merged into the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// Page 0 of a refresh: replaces all online discussions
    Replace,
    /// Further page: appended after the loaded online discussions
    Append,
}

/// A single page fetch handed out by [`Pagination`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub mode: PageMode,
    pub sort_order: SortOrder,
    generation: u64,
}

impl PageRequest {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Why a load-more request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LoadMoreRejection {
    #[error("No more discussions to load")]
    NoMorePages,
    #[error("A page fetch is already in flight")]
    InFlight,
    #[error("Previous load failed, waiting for a manual retry")]
    AfterError,
}

/// Cursor and load-more state for online discussion pages
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    next_page: u32,
    can_load_more: bool,
    load_more_error: bool,
    in_flight: Option<PageRequest>,
    generation: u64,
}

impl Pagination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page the next load-more fetch will request
    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    pub fn can_load_more(&self) -> bool {
        self.can_load_more
    }

    pub fn load_more_error(&self) -> bool {
        self.load_more_error
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<&PageRequest> {
        self.in_flight.as_ref()
    }

    /// Start fetching page 0. Supersedes any outstanding request. The
    /// cursor only moves back to page 1 once the page arrives.
    pub fn begin_refresh(&mut self, sort_order: SortOrder) -> PageRequest {
        self.generation += 1;
        self.load_more_error = false;

        if let Some(stale) = self.in_flight.take() {
            debug!("Refresh supersedes in-flight fetch of page {}", stale.page);
        }

        let request = PageRequest {
            page: 0,
            mode: PageMode::Replace,
            sort_order,
            generation: self.generation,
        };
        self.in_flight = Some(request.clone());
        request
    }

    /// Start fetching the next page, unless paging is exhausted, already
    /// running, or stopped by an earlier failure.
    pub fn begin_load_more(
        &mut self,
        sort_order: SortOrder,
    ) -> Result<PageRequest, LoadMoreRejection> {
        if self.in_flight.is_some() {
            return Err(LoadMoreRejection::InFlight);
        }
        if self.load_more_error {
            return Err(LoadMoreRejection::AfterError);
        }
        if !self.can_load_more {
            return Err(LoadMoreRejection::NoMorePages);
        }

        let request = PageRequest {
            page: self.next_page,
            mode: PageMode::Append,
            sort_order,
            generation: self.generation,
        };
        self.in_flight = Some(request.clone());
        Ok(request)
    }

    /// Record a successful fetch. Returns false if `request` is stale and
    /// its result must be discarded.
    pub fn complete(&mut self, request: &PageRequest, can_load_more: bool) -> bool {
        if !self.is_current(request) {
            debug!(
                "Discarding stale page {} (generation {}, current {})",
                request.page, request.generation, self.generation
            );
            return false;
        }

        self.in_flight = None;
        self.next_page = request.page + 1;
        self.can_load_more = can_load_more;
        self.load_more_error = false;
        true
    }

    /// Record a failed fetch. Further load-more calls are refused until
    /// [`Pagination::clear_error`].
    pub fn fail(&mut self, request: &PageRequest) {
        if !self.is_current(request) {
            return;
        }
        warn!("Fetching discussions page {} failed", request.page);
        self.in_flight = None;
        self.load_more_error = true;
    }

    /// Mark the list as errored without an outstanding request, e.g. when
    /// the fetch failed before a page was requested
    pub fn set_error(&mut self) {
        self.load_more_error = true;
    }

    pub fn clear_error(&mut self) {
        self.load_more_error = false;
    }

    fn is_current(&self, request: &PageRequest) -> bool {
        self.in_flight.as_ref() == Some(request)
    }
}
