//! Retry classification.
//!
//! # Design Decisions
//! - Never retry POST/PATCH (non-idempotent)
//! - Connection errors and timeouts are always retryable
//! - Only transient statuses are retried: 408, 429 and 5xx

use reqwest::{Method, StatusCode};

/// Whether `method` may be sent more than once.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE | Method::PUT | Method::DELETE
    )
}

/// Whether a response status indicates a transient failure.
pub fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// Decide whether an attempt should be retried.
///
/// `status` is `None` when no response was received.
pub fn is_retryable(method: &Method, status: Option<StatusCode>, is_network_error: bool) -> bool {
    if !is_idempotent(method) {
        return false;
    }
    match status {
        Some(status) => is_transient_status(status),
        None => is_network_error,
    }
}
