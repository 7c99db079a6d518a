//! Fail-open utilities for graceful degradation
//!
//! Side channels such as the tweet archive, the round summary and the state
//! file must never abort a heartbeat. Wrap them with [`fail_open`] so a failure
//! becomes a warning and the cycle carries on.
//!
//! DO NOT use fail-open for:
//! - Forum writes (the handler decides what a failed write means)
//! - Credential loading (missing credentials are fatal)

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation that should fail open
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// # Usage
///
/// ```no_run
/// use nanopost_core::fail_open::fail_open;
/// use nanopost_core::Result;
///
/// async fn append_summary() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let result = fail_open("journal::summary", || append_summary()).await;
///     // result is None if append_summary() failed, otherwise Some(())
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}
