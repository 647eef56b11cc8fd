use crate::fetchers::transport::{ApiResponse, TransportError};
use crate::utils::constants::{INTER_REQUEST_DELAY, MAX_RETRIES, RATE_LIMIT_COOLDOWN, WAIT_TIME};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Why one page request did not yield records
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("rate limited (429)")]
    RateLimited,

    #[error("server error ({0})")]
    ServerError(StatusCode),

    #[error("not found (404)")]
    NotFound,

    #[error("network failure: {0}")]
    Network(String),

    #[error("request rejected ({0})")]
    Rejected(StatusCode),

    #[error("undecodable response body: {0}")]
    MalformedBody(String),
}

/// Map one transport result onto the page's records or a failure class.
/// A 2xx body must be an object carrying a `results` array.
pub fn classify(
    outcome: std::result::Result<ApiResponse, TransportError>,
) -> std::result::Result<Vec<Value>, FetchFailure> {
    let response = outcome.map_err(|err| FetchFailure::Network(err.to_string()))?;
    let status = response.status;

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchFailure::RateLimited);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(FetchFailure::NotFound);
    }
    if status.is_server_error() {
        return Err(FetchFailure::ServerError(status));
    }
    if !status.is_success() {
        return Err(FetchFailure::Rejected(status));
    }

    let body: Value = serde_json::from_slice(&response.body)
        .map_err(|err| FetchFailure::MalformedBody(err.to_string()))?;

    match body.get("results") {
        Some(Value::Array(results)) => Ok(results.clone()),
        Some(_) => Err(FetchFailure::MalformedBody(
            "`results` is not an array".to_string(),
        )),
        None => Err(FetchFailure::MalformedBody(
            "missing `results` field".to_string(),
        )),
    }
}

/// Next step after a page attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting,
    Backoff(Duration),
    Abandoned,
    Succeeded,
    /// The endpoint has nothing for this query (404); the walk ends cleanly
    NoData,
}

/// Timing knobs for one endpoint walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub wait_time: Duration,
    pub rate_limit_cooldown: Duration,
    pub inter_request_delay: Duration,
}

impl RetryPolicy {
    /// Same retry budget with every sleep set to zero
    pub fn immediate() -> Self {
        Self {
            wait_time: Duration::ZERO,
            rate_limit_cooldown: Duration::ZERO,
            inter_request_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            wait_time: WAIT_TIME,
            rate_limit_cooldown: RATE_LIMIT_COOLDOWN,
            inter_request_delay: INTER_REQUEST_DELAY,
        }
    }
}

/// Retry bookkeeping for a single page. Rate limiting never spends the
/// budget; network failures back off linearly until it runs out.
#[derive(Debug, Clone)]
pub struct RetryTracker {
    policy: RetryPolicy,
    retries: u32,
    rate_limited: u32,
    state: RetryState,
}

impl RetryTracker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            retries: 0,
            rate_limited: 0,
            state: RetryState::Attempting,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn rate_limited(&self) -> u32 {
        self.rate_limited
    }

    /// A page came back; the next page starts with a fresh budget
    pub fn record_success(&mut self) -> RetryState {
        self.retries = 0;
        self.state = RetryState::Succeeded;
        self.state
    }

    pub fn record_failure(&mut self, failure: &FetchFailure) -> RetryState {
        self.state = match failure {
            FetchFailure::RateLimited => {
                self.rate_limited += 1;
                RetryState::Backoff(self.policy.rate_limit_cooldown)
            }
            FetchFailure::Network(_) if self.retries < self.policy.max_retries => {
                self.retries += 1;
                RetryState::Backoff(self.policy.wait_time * self.retries)
            }
            FetchFailure::NotFound => RetryState::NoData,
            _ => RetryState::Abandoned,
        };

        self.state
    }

    /// Back in the attempting state after a backoff sleep
    pub fn resume(&mut self) {
        self.state = RetryState::Attempting;
    }
}
