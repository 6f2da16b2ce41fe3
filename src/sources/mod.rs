//! Playlist sources
//!
//! Fetching is split from decoding: a [`PlaylistFetcher`] returns raw text,
//! [`SourceFormat::sniff`] picks the grammar, and the ingestor decodes it.

pub mod format;
pub mod http;
pub mod traits;

pub use format::SourceFormat;
pub use http::HttpPlaylistFetcher;
pub use traits::PlaylistFetcher;
