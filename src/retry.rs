// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Classification-based retry with exponential backoff.
//!
//! An error is retryable iff a numeric status can be extracted from it and
//! that status is 404, 408, 429 or any 5xx. Errors without a status, or with
//! any other status, abort on the first attempt. When retries run out the
//! last error is returned as-is, never wrapped.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info, warn};

use crate::config::RetryConfig;
use crate::error::{TaskError, TransportError};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Upper bound on any single backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

static STATUS_CODE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"status code (\d{3})").unwrap());

/// Errors that may carry a numeric status.
///
/// Each accessor defaults to `None`; implementors override whichever fields
/// their error actually has. The `Display` text is searched last.
pub trait StatusCarrier: Display {
    /// Explicit status field.
    fn status(&self) -> Option<u16> {
        None
    }

    /// Explicit status code reported in a response body.
    fn status_code(&self) -> Option<u16> {
        None
    }

    /// Status of a nested response object.
    fn response_status(&self) -> Option<u16> {
        None
    }
}

impl StatusCarrier for TransportError {
    fn status(&self) -> Option<u16> {
        TransportError::status(self)
    }

    fn status_code(&self) -> Option<u16> {
        TransportError::status_code(self)
    }
}

impl<E: StatusCarrier> StatusCarrier for TaskError<E> {
    fn status(&self) -> Option<u16> {
        self.work_error().and_then(StatusCarrier::status)
    }

    fn status_code(&self) -> Option<u16> {
        self.work_error().and_then(StatusCarrier::status_code)
    }

    fn response_status(&self) -> Option<u16> {
        self.work_error().and_then(StatusCarrier::response_status)
    }
}

/// Extract a status code from an error.
///
/// Checks, in order: the explicit status, the status code, the nested
/// response status, then a `status code NNN` pattern in the message.
pub fn extract_status_code<E: StatusCarrier + ?Sized>(err: &E) -> Option<u16> {
    err.status()
        .or_else(|| err.status_code())
        .or_else(|| err.response_status())
        .or_else(|| {
            let message = err.to_string();
            STATUS_CODE_REGEX
                .captures(&message)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
}

/// Whether a status is worth retrying.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 404 | 408 | 429) || status >= 500
}

/// Whether an error is worth retrying.
pub fn is_retryable<E: StatusCarrier + ?Sized>(err: &E) -> bool {
    extract_status_code(err).is_some_and(is_retryable_status)
}

/// Bounded exponential-backoff retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// Run `work`, retrying retryable failures.
    ///
    /// `on_retry` is called with the failed attempt's error before each
    /// backoff sleep. `id` only labels log lines.
    pub async fn run<F, Fut, T, E, R>(&self, mut work: F, id: Option<&str>, mut on_retry: R) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: StatusCarrier,
        R: FnMut(&E),
    {
        let id = id.unwrap_or("-");
        let mut retries = 0;

        loop {
            let err = match work().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let Some(status) = extract_status_code(&err).filter(|s| is_retryable_status(*s)) else {
                return Err(err);
            };
            if retries >= self.max_retries {
                warn!(id, error = %err, max_retries = self.max_retries, "Retries exhausted");
                return Err(err);
            }

            let delay = self.delay_for(retries);
            retries += 1;
            warn!(
                id,
                error = %err,
                status,
                retry = retries,
                max_retries = self.max_retries,
                backoff_ms = delay.as_millis() as u64,
                "Retrying after retryable failure"
            );
            on_retry(&err);
            tokio::time::sleep(delay).await;
        }
    }
}

/// Retry `work` up to `max_retries` times with the default backoff.
pub async fn with_retry<F, Fut, T, E, R>(work: F, id: Option<&str>, max_retries: u32, on_retry: R) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: StatusCarrier,
    R: FnMut(&E),
{
    RetryPolicy::new(max_retries).run(work, id, on_retry).await
}

/// Await `work`, logging a failure by class before returning it unchanged.
pub async fn handle_http_exceptions_for_retry<Fut, T, E>(work: Fut) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: StatusCarrier,
{
    work.await.inspect_err(log_failure)
}

/// Log an error at the level matching its retry class.
pub fn log_failure<E: StatusCarrier + ?Sized>(err: &E) {
    match extract_status_code(err) {
        Some(404) => info!(status = 404, error = %err, "Resource not found"),
        Some(408) => info!(status = 408, error = %err, "Request timed out"),
        Some(429) => info!(status = 429, error = %err, "Rate limited"),
        Some(status) if status >= 500 => info!(status, error = %err, "Server error"),
        status => error!(status = ?status, error = %err, "Non-retryable failure"),
    }
}
