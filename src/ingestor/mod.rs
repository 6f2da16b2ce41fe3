//! Playlist decoding
//!
//! Turns fetched source text into [`RawRecord`](crate::models::RawRecord)s.
//! Both decoders share the same output type and the same [`UrlFilter`]; a
//! malformed entry is counted and skipped, never fatal.

pub mod m3u_parser;
pub mod txt_parser;
pub mod url_filter;

pub use m3u_parser::parse_m3u;
pub use txt_parser::{GENRE_MARKER, parse_txt};
pub use url_filter::{BlacklistPattern, UrlFilter};

use crate::models::ParseOutcome;
use crate::sources::SourceFormat;

/// Decode `content` with the decoder for `format`
pub fn parse_playlist(content: &str, format: SourceFormat, filter: &UrlFilter) -> ParseOutcome {
    let content = content.trim_start_matches('\u{feff}');
    match format {
        SourceFormat::M3u => parse_m3u(content, filter),
        SourceFormat::Txt => parse_txt(content, filter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_format() {
        let m3u = "\u{feff}#EXTM3U\n#EXTINF:-1,CCTV1\nhttp://1.1.1.1/a\n";
        let txt = "CCTV1,http://1.1.1.1/a\n";
        let filter = UrlFilter::permissive();

        let from_m3u = parse_playlist(m3u, SourceFormat::sniff(m3u), &filter);
        let from_txt = parse_playlist(txt, SourceFormat::sniff(txt), &filter);
        assert_eq!(from_m3u.records, from_txt.records);
    }

    #[test]
    fn test_misclassified_content_only_skips() {
        let m3u = "#EXTM3U\n#EXTINF:-1,CCTV1\nhttp://1.1.1.1/a\n";
        let outcome = parse_playlist(m3u, SourceFormat::Txt, &UrlFilter::new::<&str>(&[], true));
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.skipped_total(), 3);
    }
}
