//! Optional deadlines for gateway calls.

use crate::error::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;

/// Await `future`, failing with `AppError::Timeout` if `limit` elapses first.
///
/// `None` waits indefinitely. Expiry drops the future, which aborts any
/// in-flight HTTP request it owns.
pub async fn within<F, T>(limit: Option<Duration>, what: &str, future: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match limit {
        None => future.await,
        Some(limit) => tokio::time::timeout(limit, future).await.map_err(|_| {
            AppError::Timeout(format!("{} did not finish within {:?}", what, limit))
        })?,
    }
}
