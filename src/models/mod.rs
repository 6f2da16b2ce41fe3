//! Core data model shared by every pipeline stage
//!
//! Records flow from source text ([`RawRecord`]) through the merged channel
//! index into template-ordered [`RankedCategory`] values that the renderer
//! consumes. Nothing here outlives a single run.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ParseSkip;
use crate::utils::channel_name::normalize_channel_name;

/// A remote playlist source, identified only by its URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Source {
    pub url: String,
}

impl Source {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self { url: url.into() }
    }
}

/// One accepted entry of a parsed source
///
/// `category` is whatever label the source declared. It is kept for
/// diagnostics only; the template decides output categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub category: String,
    pub channel_name: String,
    pub stream_url: String,
}

impl RawRecord {
    pub fn new(
        category: impl Into<String>,
        channel_name: impl Into<String>,
        stream_url: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            channel_name: channel_name.into(),
            stream_url: stream_url.into(),
        }
    }
}

/// Normalized channel identifier used for cross-source matching
///
/// Two raw names denote the same channel iff their canonical names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalName(String);

impl CanonicalName {
    /// Canonicalize a raw channel name
    pub fn new(raw: &str) -> Self {
        Self(normalize_channel_name(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of parsing one source: accepted records plus skip counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub records: Vec<RawRecord>,
    pub skipped: BTreeMap<ParseSkip, usize>,
}

impl ParseOutcome {
    pub fn record_skip(&mut self, reason: ParseSkip) {
        *self.skipped.entry(reason).or_default() += 1;
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// A channel wanted by the operator, as declared in the template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateChannel {
    /// Name as written in the template, used for display and logos
    pub display_name: String,
    pub canonical: CanonicalName,
}

/// A template category and its channels in declared order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateCategory {
    pub name: String,
    pub channels: Vec<TemplateChannel>,
}

/// Operator template: ordered categories of ordered channel names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    pub categories: Vec<TemplateCategory>,
}

impl Template {
    pub fn channel_count(&self) -> usize {
        self.categories.iter().map(|c| c.channels.len()).sum()
    }
}

/// A template channel together with its unprobed candidate URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedChannel {
    pub display_name: String,
    pub canonical: CanonicalName,
    /// Candidates in first-seen order
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedCategory {
    pub name: String,
    pub channels: Vec<MatchedChannel>,
}

/// Measured responsiveness of a single URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latency {
    Reachable(Duration),
    Unreachable,
}

impl Latency {
    /// Latency in milliseconds, infinite when unreachable
    pub fn as_millis_f64(&self) -> f64 {
        match self {
            Self::Reachable(d) => d.as_secs_f64() * 1000.0,
            Self::Unreachable => f64::INFINITY,
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable(_))
    }
}

/// Outcome of probing one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub url: String,
    pub latency: Latency,
}

/// A reachable candidate URL with its measured latency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedUrl {
    pub url: String,
    pub latency: Duration,
}

/// A channel whose candidates are sorted ascending by latency
///
/// Never contains unreachable or duplicate URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedChannel {
    pub category: String,
    pub display_name: String,
    pub canonical: CanonicalName,
    pub urls: Vec<RankedUrl>,
}

/// A template category with its ranked channels, possibly empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCategory {
    pub name: String,
    pub channels: Vec<RankedChannel>,
}

/// A static entry rendered above the template-driven channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub name: String,
    pub url: String,
    /// Explicit icon; the synthesized logo is used when absent
    #[serde(default)]
    pub logo: Option<String>,
}

/// A titled group of announcements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementGroup {
    pub category: String,
    #[serde(default)]
    pub entries: Vec<Announcement>,
}

/// Counters describing what a run did and what it had to skip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub sources_attempted: usize,
    pub sources_succeeded: usize,
    pub sources_failed: usize,
    pub records_accepted: usize,
    pub entries_skipped: BTreeMap<ParseSkip, usize>,
    pub indexed_channels: usize,
    pub template_channels: usize,
    pub channels_matched: usize,
    pub channels_unmatched: usize,
    pub channels_unreachable: usize,
    pub urls_probed: usize,
    pub urls_reachable: usize,
    pub urls_unreachable: usize,
    pub entries_emitted: usize,
    pub duplicates_suppressed: usize,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            sources_attempted: 0,
            sources_succeeded: 0,
            sources_failed: 0,
            records_accepted: 0,
            entries_skipped: BTreeMap::new(),
            indexed_channels: 0,
            template_channels: 0,
            channels_matched: 0,
            channels_unmatched: 0,
            channels_unreachable: 0,
            urls_probed: 0,
            urls_reachable: 0,
            urls_unreachable: 0,
            entries_emitted: 0,
            duplicates_suppressed: 0,
        }
    }

    pub fn absorb_skips(&mut self, skipped: &BTreeMap<ParseSkip, usize>) {
        for (reason, count) in skipped {
            *self.entries_skipped.entry(*reason).or_default() += count;
        }
    }

    pub fn skipped_total(&self) -> usize {
        self.entries_skipped.values().sum()
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
