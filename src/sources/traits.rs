//! Source fetcher abstraction
//!
//! The pipeline depends on this trait rather than on an HTTP client so that
//! tests can serve playlists from memory.

use async_trait::async_trait;

use crate::errors::SourceResult;

/// Retrieves the raw text of one playlist source
#[async_trait]
pub trait PlaylistFetcher: Send + Sync {
    /// Fetch `url`, applying the fetcher's own timeout and retry policy
    ///
    /// An `Err` means the source is given up on for this run.
    async fn fetch(&self, url: &str) -> SourceResult<String>;
}
