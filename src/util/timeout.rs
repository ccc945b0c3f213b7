//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::BridgeError;

/// Wrap a future with a timeout, mapping expiry to [`BridgeError::Timeout`].
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, BridgeError>>,
) -> Result<T, BridgeError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(BridgeError::Timeout(duration.as_millis() as u64)),
    }
}
