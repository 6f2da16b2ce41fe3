//! Source format classification

use std::fmt;

/// Number of non-empty lines inspected when classifying content
pub const SNIFF_LINES: usize = 15;

/// Playlist grammar used to decode a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    M3u,
    /// `name,url` listing; also the fallback for anything unrecognized
    Txt,
}

impl SourceFormat {
    /// Classify content by its first non-empty lines
    ///
    /// Content is M3U when any of the first [`SNIFF_LINES`] non-empty lines
    /// starts with `#EXTINF`. Everything else, including empty or binary-ish
    /// content, is TXT and left to per-line skipping.
    ///
    /// ```rust
    /// use m3u_aggregator::sources::SourceFormat;
    ///
    /// assert_eq!(SourceFormat::sniff("#EXTM3U\n#EXTINF:-1,A\nhttp://1.1.1.1/a"), SourceFormat::M3u);
    /// assert_eq!(SourceFormat::sniff("A,http://1.1.1.1/a"), SourceFormat::Txt);
    /// ```
    pub fn sniff(content: &str) -> Self {
        let is_m3u = content
            .trim_start_matches('\u{feff}')
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(SNIFF_LINES)
            .any(|line| line.starts_with("#EXTINF"));

        if is_m3u { Self::M3u } else { Self::Txt }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::M3u => write!(f, "m3u"),
            Self::Txt => write!(f, "txt"),
        }
    }
}
