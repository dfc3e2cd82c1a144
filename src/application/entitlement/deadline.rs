//! Caller-visible deadlines for backend calls.

use std::future::Future;
use std::time::Duration;

use crate::ports::{ClientError, Endpoint};

/// Run a backend call, failing with a `Network` error once `deadline` passes.
///
/// Dropping the call on expiry also drops its in-flight response, so a late
/// answer can never be observed by the caller.
pub(crate) async fn with_deadline<T, F>(
    endpoint: Endpoint,
    deadline: Duration,
    call: F,
) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                endpoint = %endpoint,
                timeout_ms = deadline.as_millis() as u64,
                "Backend call exceeded deadline"
            );
            Err(ClientError::timed_out(endpoint, deadline))
        }
    }
}
