//! Flat TXT playlist decoding
//!
//! Each non-empty line is either a category boundary (`央视频道,#genre#`) or
//! a channel line `name,url[#url2#url3...]`. Route annotations introduced by
//! `$` are stripped from every URL.

use tracing::trace;

use crate::errors::ParseSkip;
use crate::ingestor::url_filter::UrlFilter;
use crate::models::{ParseOutcome, RawRecord};
use crate::utils::UrlUtils;

/// Token that marks a category line in flat listings and templates
pub const GENRE_MARKER: &str = "#genre#";

/// Decode TXT content into records, one per accepted URL
pub fn parse_txt(content: &str, filter: &UrlFilter) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    let mut category = String::new();

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some((name, tail)) = line.split_once(',') else {
            outcome.record_skip(ParseSkip::NoComma);
            continue;
        };
        let (name, tail) = (name.trim(), tail.trim());

        if tail.eq_ignore_ascii_case(GENRE_MARKER) {
            category = name.to_string();
            continue;
        }
        if name.is_empty() {
            outcome.record_skip(ParseSkip::EmptyName);
            continue;
        }

        for candidate in tail.split('#') {
            let url = UrlUtils::strip_route_suffix(candidate);
            if url.is_empty() {
                continue;
            }
            match filter.check(url) {
                Ok(()) => outcome.records.push(RawRecord::new(&category, name, url)),
                Err(reason) => {
                    trace!("Skipping '{}' candidate: {}", name, reason);
                    outcome.record_skip(reason);
                }
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_and_multi_url_lines() {
        let content = "央视频道,#genre#\nCCTV-01,http://10.0.0.1/a#http://10.0.0.2/b\n\n卫视频道,#genre#\n湖南卫视,http://10.0.0.3/c\n";
        let outcome = parse_txt(content, &UrlFilter::permissive());

        assert_eq!(
            outcome.records,
            vec![
                RawRecord::new("央视频道", "CCTV-01", "http://10.0.0.1/a"),
                RawRecord::new("央视频道", "CCTV-01", "http://10.0.0.2/b"),
                RawRecord::new("卫视频道", "湖南卫视", "http://10.0.0.3/c"),
            ]
        );
    }

    #[test]
    fn test_route_suffix_is_stripped() {
        let content = "CCTV1,http://[2409:8087::1]:6410/x$IPV6•线路22#http://1.1.1.1/y$备用\n";
        let outcome = parse_txt(content, &UrlFilter::new::<&str>(&[], true));

        let urls: Vec<_> = outcome.records.iter().map(|r| r.stream_url.as_str()).collect();
        assert_eq!(urls, vec!["http://[2409:8087::1]:6410/x", "http://1.1.1.1/y"]);
        assert_eq!(outcome.records[0].category, "");
    }

    #[test]
    fn test_malformed_lines_are_counted() {
        let content = "#EXTM3U\nno comma here\n,http://1.1.1.1/a\nA,http://example.com/a\nB,http://1.1.1.1/b#\n";
        let outcome = parse_txt(content, &UrlFilter::new::<&str>(&[], true));

        assert_eq!(outcome.records, vec![RawRecord::new("", "B", "http://1.1.1.1/b")]);
        assert_eq!(outcome.skipped[&ParseSkip::NoComma], 2);
        assert_eq!(outcome.skipped[&ParseSkip::EmptyName], 1);
        assert_eq!(outcome.skipped[&ParseSkip::Implausible], 1);
    }

    #[test]
    fn test_blacklisted_candidates_drop_individually() {
        let content = "CCTV1,http://1.1.1.1/ok#http://1.1.1.2/epg.pw/stream/bad\n";
        let outcome = parse_txt(content, &UrlFilter::new(&["EPG.PW/STREAM"], true));

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].stream_url, "http://1.1.1.1/ok");
        assert_eq!(outcome.skipped[&ParseSkip::Blacklisted], 1);
    }
}
