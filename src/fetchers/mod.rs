pub mod openaq;
pub mod paginator;
pub mod retry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use openaq::{Discovery, FetchSummary, OpenAqFetcher, SensorFetch};
pub use paginator::{PageStats, PageWalker, WalkEnd};
pub use retry::{classify, FetchFailure, RetryPolicy, RetryState, RetryTracker};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport, TransportError};
