// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Exponential backoff for read-only tracker calls.
//!
//! Only idempotent reads go through this helper. Mutating calls such as
//! posting a comment are issued once, since a retried comment can be
//! duplicated when the first attempt succeeded server-side.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::Error;

/// Configuration for retry behavior with exponential backoff.
#[derive(Debug, Clone,)]
pub struct RetryConfig
{
    /// Maximum number of attempts including the first one (default: 3).
    pub max_attempts:     u32,
    /// Delay before the second attempt in milliseconds (default: 1000).
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after each failure (default: 2.0).
    pub backoff_factor:   f64,
}

impl Default for RetryConfig
{
    fn default() -> Self
    {
        Self {
            max_attempts: 3, initial_delay_ms: 1000, backoff_factor: 2.0,
        }
    }
}

/// Runs `f` until it succeeds, sleeping between transient failures.
///
/// The delay starts at `initial_delay_ms` and grows by `backoff_factor` after
/// each failed attempt. Errors for which [`Error::is_transient`] is `false`
/// are returned immediately.
///
/// # Errors
///
/// Returns the first permanent error, or the last transient error once
/// `max_attempts` attempts have failed.
///
/// # Example
///
/// ```no_run
/// use stale_issues::{Error, RetryConfig, retry_with_backoff};
///
/// # async fn example() -> Result<(), Error> {
/// let config = RetryConfig::default();
/// let issues = retry_with_backoff(&config, "list issues", || async {
///     Ok::<_, Error,>(vec![1, 2, 3],)
/// },)
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_with_backoff<F, Fut, T,>(
    config: &RetryConfig,
    operation_name: &str,
    mut f: F,
) -> Result<T, Error,>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, Error,>,>,
{
    let attempts = config.max_attempts.max(1,);
    let mut delay = Duration::from_millis(config.initial_delay_ms,);
    let mut attempt = 1;

    loop {
        let error = match f().await {
            Ok(value,) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(value,);
            }
            Err(error,) => error,
        };

        if !error.is_transient() {
            debug!("{} failed permanently: {}", operation_name, error);
            return Err(error,);
        }
        if attempt >= attempts {
            warn!("{} gave up after {} attempts: {}", operation_name, attempts, error);
            return Err(error,);
        }

        warn!(
            "{} failed ({}/{}): {}; next attempt in {}ms",
            operation_name,
            attempt,
            attempts,
            error,
            delay.as_millis()
        );
        sleep(delay,).await;
        delay = next_delay(delay, config.backoff_factor,);
        attempt += 1;
    }
}

/// Scales `delay` by `factor`, keeping it unchanged when the product is not a
/// valid duration.
fn next_delay(delay: Duration, factor: f64,) -> Duration
{
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor,).unwrap_or(delay,)
}

#[cfg(test)]
mod tests
{
    use std::sync::{Arc, Mutex};

    use super::*;

    fn fast() -> RetryConfig
    {
        RetryConfig {
            max_attempts: 3, initial_delay_ms: 10, backoff_factor: 2.0,
        }
    }

    #[test]
    fn retry_config_default_values()
    {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay_ms, 1000);
        assert_eq!(config.backoff_factor, 2.0);
    }

    #[tokio::test]
    async fn first_success_is_returned_immediately()
    {
        let issues = retry_with_backoff(&fast(), "list issues", || async {
            Ok::<_, Error,>(vec![7u64, 9],)
        },)
        .await
        .expect("should succeed",);
        assert_eq!(issues, vec![7, 9]);
    }

    #[tokio::test]
    async fn transient_failures_are_retried()
    {
        let counter = Arc::new(Mutex::new(0,),);
        let counter_clone = counter.clone();

        let contents = retry_with_backoff(&fast(), "fetch config", move || {
            let counter = counter_clone.clone();
            async move {
                let mut count = counter.lock().unwrap();
                *count += 1;
                if *count < 3 {
                    Err(Error::service("502 Bad Gateway",),)
                } else {
                    Ok(b"daysUntilStale: 30".to_vec(),)
                }
            }
        },)
        .await
        .expect("should succeed after retries",);

        assert_eq!(contents, b"daysUntilStale: 30".to_vec());
        assert_eq!(*counter.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried()
    {
        let counter = Arc::new(Mutex::new(0,),);
        let counter_clone = counter.clone();

        let error = retry_with_backoff(&fast(), "fetch config", move || {
            let counter = counter_clone.clone();
            async move {
                *counter.lock().unwrap() += 1;
                Err::<(), _,>(Error::validation("staleLabel cannot be empty",),)
            }
        },)
        .await
        .expect_err("should fail without retrying",);

        assert!(matches!(error, Error::Validation { .. }));
        assert_eq!(*counter.lock().unwrap(), 1);
    }

    #[test]
    fn delay_grows_by_backoff_factor()
    {
        let delay = Duration::from_millis(250,);
        assert_eq!(next_delay(delay, 2.0,), Duration::from_millis(500));
        assert_eq!(next_delay(delay, -1.0,), delay);
    }

    #[tokio::test]
    async fn last_error_is_returned_after_max_attempts()
    {
        let config = RetryConfig {
            max_attempts: 2, ..fast()
        };
        let counter = Arc::new(Mutex::new(0,),);
        let counter_clone = counter.clone();

        let result = retry_with_backoff(&config, "list comments", move || {
            let counter = counter_clone.clone();
            async move {
                let mut count = counter.lock().unwrap();
                *count += 1;
                Err::<(), _,>(Error::service(format!("attempt {count} failed"),),)
            }
        },)
        .await;

        let error = result.expect_err("should fail after max attempts",);
        assert_eq!(error.to_display_string(), "service error: attempt 2 failed");
        assert_eq!(*counter.lock().unwrap(), 2);
    }
}
