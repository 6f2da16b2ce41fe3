//! Utility modules for the aggregator
//!
//! This module contains reusable utilities that can be used
//! across different parts of the system.

pub mod channel_name;
pub mod retry;
pub mod url;

// Re-export commonly used types for convenience
pub use channel_name::normalize_channel_name;
pub use retry::{RetryPolicy, RetryState, Retryable, with_retry};
pub use url::UrlUtils;
