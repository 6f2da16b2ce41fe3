//! URL utilities for stream and source URLs
//!
//! Helpers for the coarse structural checks applied to candidate stream URLs
//! and for keeping credentials out of logs.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static IPV4_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9.])((?:[0-9]{1,3}\.){3}[0-9]{1,3})(?:$|[^0-9.])")
        .expect("IPv4 candidate pattern is valid")
});

static IPV6_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([0-9A-Fa-f:.]+)(?:%[0-9A-Za-z]+)?\]").expect("IPv6 candidate pattern is valid")
});

static SENSITIVE_PARAMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([?&](?:username|password|user|pass|pwd|passwd|token)=)[^&]*")
        .expect("sensitive parameter pattern is valid")
});

/// IP literal found inside a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpLiteral {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
}

/// URL utilities for consistent URL handling
pub struct UrlUtils;

impl UrlUtils {
    /// Find the first IPv4 dotted-quad or bracketed IPv6 literal in `url`
    ///
    /// This is a coarse plausibility signal, not validation: the literal may
    /// sit anywhere in the string, including a query parameter.
    ///
    /// ```rust
    /// use m3u_aggregator::utils::url::{IpLiteral, UrlUtils};
    ///
    /// assert!(matches!(
    ///     UrlUtils::find_ip_literal("http://10.0.0.1:8080/live"),
    ///     Some(IpLiteral::V4(_))
    /// ));
    /// assert!(UrlUtils::find_ip_literal("http://example.com/live").is_none());
    /// ```
    pub fn find_ip_literal(url: &str) -> Option<IpLiteral> {
        for caps in IPV6_CANDIDATE.captures_iter(url) {
            if let Ok(addr) = caps[1].parse::<Ipv6Addr>() {
                return Some(IpLiteral::V6(addr));
            }
        }

        // Octets above 255 are rejected by the parse
        IPV4_CANDIDATE
            .captures_iter(url)
            .find_map(|caps| caps[1].parse::<Ipv4Addr>().ok())
            .map(IpLiteral::V4)
    }

    pub fn has_ip_literal(url: &str) -> bool {
        Self::find_ip_literal(url).is_some()
    }

    /// Drop a `$`-introduced route annotation (`http://x/live$IPV6•线路22`)
    pub fn strip_route_suffix(url: &str) -> &str {
        url.split_once('$').map_or(url, |(head, _)| head).trim()
    }

    /// Mask user info and credential-like query parameters for logging
    pub fn obfuscate_credentials(url: &str) -> String {
        let mut obfuscated = url.to_string();

        if let Ok(parsed) = Url::parse(url)
            && (!parsed.username().is_empty() || parsed.password().is_some())
        {
            let mut masked = parsed.clone();
            let _ = masked.set_username("****");
            let _ = masked.set_password(Some("****"));
            obfuscated = masked.to_string();
        }

        SENSITIVE_PARAMS
            .replace_all(&obfuscated, "${1}****")
            .into_owned()
    }
}
