//! Time limits on store calls.

use std::future::Future;
use std::time::Duration;

use crate::DomainError;

/// Runs a store call under `limit`.
///
/// Store errors convert through `From<StoreError>`; elapsing the limit
/// yields `Timeout` naming `operation`.
pub async fn within<T, F>(
    limit: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, DomainError>
where
    F: Future<Output = store::Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(|e| {
            let err = DomainError::from(e);
            if err.is_internal() {
                tracing::error!(operation, error = %err, "Store call failed");
            }
            err
        }),
        Err(_) => {
            tracing::warn!(operation, ?limit, "Store call timed out");
            Err(DomainError::Timeout { operation })
        }
    }
}
