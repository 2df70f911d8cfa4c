//! Timeout enforcement for guarded calls.
//!
//! # Responsibilities
//! - Bound a single invocation when a call timeout is configured
//! - Cancel the operation cleanly on expiry (the future is dropped)
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - No limit configured means no timer is armed at all
//! - Expiry is reported as the limit that was exceeded, distinct from the operation's own errors

use std::future::Future;
use std::time::Duration;

/// Await `fut`, giving up after `limit` if one is set.
///
/// Returns `Err(limit)` when the deadline passed before `fut` completed.
pub async fn bounded<F>(limit: Option<Duration>, fut: F) -> Result<F::Output, Duration>
where
    F: Future,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| limit),
        None => Ok(fut.await),
    }
}
