//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound the wait for the upstream response head
//! - Surface an elapsed deadline as a transport failure
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - The streamed response body is not bounded here; dropping it aborts the upstream read

use std::future::Future;
use std::time::Duration;

use crate::proxy::error::TransportError;

/// Run `fut`, failing with [`TransportError::Timeout`] after `deadline`.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(deadline)),
    }
}
