//! Candidate URL acceptance filters
//!
//! Every stream URL a parser emits passes two independent checks before it
//! becomes a record: it must not match the blacklist, and it must carry an
//! IP literal (when that requirement is enabled).

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::config::SourcesConfig;
use crate::errors::ParseSkip;
use crate::utils::UrlUtils;

/// One blacklist entry, matched as a substring and, when it compiles, as a regex
#[derive(Debug, Clone)]
pub struct BlacklistPattern {
    raw: String,
    lowered: String,
    regex: Option<Regex>,
}

impl BlacklistPattern {
    pub fn new(pattern: &str) -> Self {
        let regex = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => Some(regex),
            Err(e) => {
                debug!("Blacklist pattern '{}' is not a valid regex, matching as substring: {}", pattern, e);
                None
            }
        };

        Self {
            raw: pattern.to_string(),
            lowered: pattern.to_lowercase(),
            regex,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `lowered_url` must already be lower-cased
    fn matches(&self, url: &str, lowered_url: &str) -> bool {
        lowered_url.contains(&self.lowered)
            || self.regex.as_ref().is_some_and(|re| re.is_match(url))
    }
}

/// Blacklist plus structural plausibility check
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    blacklist: Vec<BlacklistPattern>,
    require_ip_literal: bool,
}

impl UrlFilter {
    pub fn new<S: AsRef<str>>(blacklist: &[S], require_ip_literal: bool) -> Self {
        Self {
            blacklist: blacklist
                .iter()
                .map(|p| BlacklistPattern::new(p.as_ref()))
                .collect(),
            require_ip_literal,
        }
    }

    pub fn from_config(config: &SourcesConfig) -> Self {
        Self::new(&config.blacklist, config.require_ip_literal)
    }

    /// Filter that accepts every URL
    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn is_blacklisted(&self, url: &str) -> bool {
        let lowered = url.to_lowercase();
        self.blacklist.iter().any(|p| p.matches(url, &lowered))
    }

    /// Accept or reject a candidate stream URL
    pub fn check(&self, url: &str) -> Result<(), ParseSkip> {
        if self.is_blacklisted(url) {
            return Err(ParseSkip::Blacklisted);
        }
        if self.require_ip_literal && !UrlUtils::has_ip_literal(url) {
            return Err(ParseSkip::Implausible);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blacklist() -> UrlFilter {
        UrlFilter::new(
            &[
                r"epg\.pw/stream/",
                r"[2409:8087:1a01:df::7005]/ottrrs\.hl\.chinamobile\.com",
                r"stream1\.freetv\.fun",
            ],
            true,
        )
    }

    #[test]
    fn test_regex_pattern_matches_case_insensitively() {
        let filter = sample_blacklist();
        assert!(filter.is_blacklisted("http://1.2.3.4/EPG.PW/stream/abc"));
        assert!(filter.is_blacklisted("http://STREAM1.FREETV.FUN/x?ip=1.1.1.1"));
        assert!(!filter.is_blacklisted("http://1.2.3.4/live/abc"));
    }

    #[test]
    fn test_bracketed_ipv6_pattern_matches_as_substring() {
        // As a regex the brackets form a character class; the literal substring still matches
        let filter = UrlFilter::new(&["[2409:8087:1a01:df::7005]/ottrrs.hl"], true);
        assert_eq!(
            filter.check("http://[2409:8087:1a01:df::7005]/ottrrs.hl.chinamobile.com/PLTV/1"),
            Err(ParseSkip::Blacklisted)
        );
        assert_eq!(filter.check("http://[2409:8087:1a01:df::7006]/other"), Ok(()));
    }

    #[test]
    fn test_invalid_regex_falls_back_to_substring() {
        let filter = UrlFilter::new(&["bad(pattern"], false);
        assert!(filter.is_blacklisted("http://host/BAD(PATTERN/x"));
        assert!(!filter.is_blacklisted("http://host/bad/x"));
    }

    #[test]
    fn test_plausibility_check() {
        let filter = UrlFilter::new::<&str>(&[], true);
        assert_eq!(filter.check("http://10.0.0.1/a"), Ok(()));
        assert_eq!(filter.check("http://[2409:8087::1]/a"), Ok(()));
        assert_eq!(filter.check("http://example.com/a"), Err(ParseSkip::Implausible));
        assert_eq!(filter.check("javascript:void(0)"), Err(ParseSkip::Implausible));
    }

    #[test]
    fn test_blacklist_is_checked_before_plausibility() {
        let filter = UrlFilter::new(&["example"], true);
        assert_eq!(filter.check("http://example.com/a"), Err(ParseSkip::Blacklisted));
    }

    #[test]
    fn test_permissive_accepts_hostnames() {
        assert_eq!(UrlFilter::permissive().check("http://a"), Ok(()));
    }
}
