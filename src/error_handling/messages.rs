//! Human-readable error messages shown to callers.

pub const INVALID_URL: &str =
    "Oops! The URL you provided is invalid. Please double-check and try again.";
pub const SSL_VERIFICATION_FAILED: &str = "SSL certificate verification failed";
pub const EMPTY_RESPONSE: &str = "Navigation returned no response";
pub const RETRY_COUNT_EXCEEDED: &str = "Retry count exceeded";
