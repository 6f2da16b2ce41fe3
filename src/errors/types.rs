//! Error type definitions for the aggregator
//!
//! This module defines all error types used throughout the pipeline. Only
//! [`AppError`] ever aborts a run; the other types describe why a single
//! source, entry or URL was dropped.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level application error type
///
/// Every variant here is fatal to the run.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The operator template could not be read
    #[error("Template error: {path}: {message}")]
    Template { path: PathBuf, message: String },

    /// An output artifact could not be written
    #[error("Output error: {path}: {message}")]
    Output { path: PathBuf, message: String },

    /// Filesystem errors outside template/output handling
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Source handling specific errors
///
/// Returned by the playlist fetcher once its retry budget is spent. A failed
/// source contributes zero records to the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Connection refused, DNS failure, reset, invalid body encoding
    #[error("Network error: {url} - {message}")]
    Network { url: String, message: String },

    /// The attempt exceeded its per-request timeout
    #[error("Connection timeout: {url}")]
    Timeout { url: String },

    /// The source answered with a non-success status
    #[error("HTTP error: {status} - {url}")]
    HttpStatus { url: String, status: u16 },
}

/// Reason a single playlist entry was skipped during parsing
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParseSkip {
    /// `#EXTINF` entry without a parseable attribute block / title
    #[error("entry has no parseable attribute block")]
    MissingAttributes,

    /// `#EXTINF` entry with no stream URL line following it
    #[error("entry has no stream URL")]
    MissingUrl,

    /// TXT line without a comma separator
    #[error("line has no comma separator")]
    NoComma,

    /// Channel name is empty after trimming
    #[error("channel name is empty")]
    EmptyName,

    /// URL matched a configured blacklist pattern
    #[error("URL matches a blacklist pattern")]
    Blacklisted,

    /// URL carries no IPv4 dotted-quad or bracketed IPv6 literal
    #[error("URL has no recognizable IP literal")]
    Implausible,
}

/// Probe failure, recorded as unreachable (infinite latency)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Connection could not be established or was reset
    #[error("Unreachable: {url} - {message}")]
    Unreachable { url: String, message: String },

    /// No response within the probe timeout
    #[error("Probe timeout: {url}")]
    Timeout { url: String },

    /// The endpoint answered with a non-success status
    #[error("HTTP error: {status} - {url}")]
    HttpStatus { url: String, status: u16 },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a template error for the given path
    pub fn template<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Template {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an output error for the given path
    pub fn output<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Output {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl SourceError {
    /// Whether another attempt may succeed
    ///
    /// Network failures, timeouts, 5xx and 429 are transient. Any other 4xx is
    /// a permanent failure of the source.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || (500..600).contains(status),
        }
    }

    /// URL of the source that failed
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. } | Self::Timeout { url } | Self::HttpStatus { url, .. } => url,
        }
    }
}

impl ParseSkip {
    /// Stable key used in run reports and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingAttributes => "missing_attributes",
            Self::MissingUrl => "missing_url",
            Self::NoComma => "no_comma",
            Self::EmptyName => "empty_name",
            Self::Blacklisted => "blacklisted",
            Self::Implausible => "implausible",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(500, true)]
    #[case(503, true)]
    #[case(429, true)]
    #[case(404, false)]
    #[case(403, false)]
    #[case(400, false)]
    fn test_http_status_retry_classification(#[case] status: u16, #[case] retryable: bool) {
        let err = SourceError::HttpStatus {
            url: "http://example.com/live.m3u".to_string(),
            status,
        };
        assert_eq!(err.is_retryable(), retryable);
    }

    #[test]
    fn test_network_and_timeout_are_retryable() {
        let network = SourceError::Network {
            url: "http://a".to_string(),
            message: "connection refused".to_string(),
        };
        let timeout = SourceError::Timeout {
            url: "http://a".to_string(),
        };
        assert!(network.is_retryable());
        assert!(timeout.is_retryable());
        assert_eq!(timeout.url(), "http://a");
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::template("demo.txt", "No such file or directory");
        assert_eq!(
            err.to_string(),
            "Template error: demo.txt: No such file or directory"
        );
    }
}
