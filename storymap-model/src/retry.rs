//! Classification of provider failures into retryable and fatal.

#[must_use]
pub fn is_retryable_status_code(status_code: u16) -> bool {
    matches!(status_code, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Quota, rate-limit and availability signals in a provider error body.
///
/// Status codes are not matched here; use [`is_retryable_status_code`].
#[must_use]
pub fn is_retryable_error_message(message: &str) -> bool {
    let normalized = message.to_ascii_uppercase();
    normalized.contains("RATE LIMIT")
        || normalized.contains("RATE_LIMIT")
        || normalized.contains("TOO MANY REQUESTS")
        || normalized.contains("RESOURCE_EXHAUSTED")
        || normalized.contains("QUOTA")
        || normalized.contains("UNAVAILABLE")
        || normalized.contains("OVERLOADED")
        || normalized.contains("DEADLINE_EXCEEDED")
        || normalized.contains("TIMEOUT")
        || normalized.contains("TIMED OUT")
        || normalized.contains("CONNECTION")
}

/// Transport-level failures are retryable on timeouts, connection errors and
/// retryable statuses. The error text is never inspected.
#[must_use]
pub fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout()
        || error.is_connect()
        || error.status().is_some_and(|status| is_retryable_status_code(status.as_u16()))
}
