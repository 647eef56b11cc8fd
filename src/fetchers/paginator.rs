use crate::fetchers::retry::{classify, FetchFailure, RetryPolicy, RetryState, RetryTracker};
use crate::fetchers::transport::{ApiRequest, Transport};
use serde_json::Value;
use std::ops::AddAssign;
use tracing::{debug, error, warn};

/// Why a page walk stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEnd {
    Exhausted,
    NotFound,
    Abandoned(FetchFailure),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    pub calls: usize,
    pub pages: usize,
    pub records: usize,
    pub retries: usize,
    pub rate_limited: usize,
}

impl AddAssign for PageStats {
    fn add_assign(&mut self, other: Self) {
        self.calls += other.calls;
        self.pages += other.pages;
        self.records += other.records;
        self.retries += other.retries;
        self.rate_limited += other.rate_limited;
    }
}

/// Lazy walk over `page=1,2,...` of one endpoint. Each call to
/// [`PageWalker::next_batch`] issues requests until a page comes back or the
/// walk ends; after that it only returns `None`.
pub struct PageWalker<'a, T: Transport + ?Sized> {
    transport: &'a T,
    request: ApiRequest,
    page_size: u32,
    policy: RetryPolicy,
    label: String,
    next_page: u32,
    end: Option<WalkEnd>,
    stats: PageStats,
}

impl<'a, T: Transport + ?Sized> PageWalker<'a, T> {
    pub fn new(
        transport: &'a T,
        request: ApiRequest,
        page_size: u32,
        policy: RetryPolicy,
    ) -> Self {
        let label = request.url.clone();
        Self {
            transport,
            request,
            page_size,
            policy,
            label,
            next_page: 1,
            end: None,
            stats: PageStats::default(),
        }
    }

    /// Name used in log lines instead of the URL
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn stats(&self) -> PageStats {
        self.stats
    }

    pub fn end(&self) -> Option<&WalkEnd> {
        self.end.as_ref()
    }

    pub fn into_parts(self) -> (PageStats, Option<WalkEnd>) {
        (self.stats, self.end)
    }

    pub async fn next_batch(&mut self) -> Option<Vec<Value>> {
        if self.end.is_some() {
            return None;
        }

        let page = self.next_page;
        if page > 1 && !self.policy.inter_request_delay.is_zero() {
            tokio::time::sleep(self.policy.inter_request_delay).await;
        }

        let request = self
            .request
            .clone()
            .with_param("limit", self.page_size)
            .with_param("page", page);
        let mut tracker = RetryTracker::new(self.policy);

        loop {
            self.stats.calls += 1;
            let failure = match classify(self.transport.get(&request).await) {
                Ok(records) => {
                    tracker.record_success();

                    if records.is_empty() {
                        debug!(target_label = %self.label, page, "No more results");
                        self.end = Some(WalkEnd::Exhausted);
                        return None;
                    }

                    debug!(target_label = %self.label, page, records = records.len(), "Fetched page");
                    self.stats.pages += 1;
                    self.stats.records += records.len();
                    self.next_page += 1;
                    return Some(records);
                }
                Err(failure) => failure,
            };

            match tracker.record_failure(&failure) {
                RetryState::Backoff(delay) => {
                    if failure == FetchFailure::RateLimited {
                        self.stats.rate_limited += 1;
                        warn!(target_label = %self.label, page, ?delay, "Rate limit hit, cooling down");
                    } else {
                        self.stats.retries += 1;
                        warn!(
                            target_label = %self.label,
                            page,
                            attempt = tracker.retries(),
                            error = %failure,
                            "Request failed, retrying"
                        );
                    }
                    tokio::time::sleep(delay).await;
                    tracker.resume();
                }
                RetryState::NoData => {
                    debug!(target_label = %self.label, page, "Not found, treating as no data");
                    self.end = Some(WalkEnd::NotFound);
                    return None;
                }
                RetryState::Attempting | RetryState::Succeeded | RetryState::Abandoned => {
                    error!(target_label = %self.label, page, error = %failure, "Giving up on this stream");
                    self.end = Some(WalkEnd::Abandoned(failure));
                    return None;
                }
            }
        }
    }
}
