//! Centralized error handling for the aggregator
//!
//! Errors fall into two groups. Recoverable errors degrade only their own
//! contribution to a run and are counted in the [`RunReport`](crate::models::RunReport):
//!
//! - **Source errors**: a playlist source could not be fetched ([`SourceError`])
//! - **Parse skips**: a single malformed or filtered entry ([`ParseSkip`])
//! - **Probe errors**: a candidate URL did not answer ([`ProbeError`])
//!
//! Fatal errors ([`AppError`]) stop the run: the template cannot be read, the
//! configuration is invalid, or an output artifact cannot be written.
//!
//! # Usage
//!
//! ```rust
//! use m3u_aggregator::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Err(AppError::configuration("network.max_retries must be at least 1"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Source Results
pub type SourceResult<T> = Result<T, SourceError>;
