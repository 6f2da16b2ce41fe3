//! Cross-source channel merging
//!
//! [`ChannelIndex`] maps canonical names to their candidate URLs. During the
//! fetch phase it is owned by a single [`MergeAggregator`] task; fetch workers
//! only send it finished per-source batches.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::{ParseSkip, SourceError};
use crate::models::{CanonicalName, ParseOutcome, RawRecord};
use crate::utils::UrlUtils;

/// Canonical name to candidate URLs, deduplicated by exact string
///
/// Candidates keep first-seen order, which ranking uses to break latency ties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelIndex {
    channels: HashMap<CanonicalName, Candidates>,
}

/// First-seen URL order plus a lookup set for constant-time dedup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Candidates {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl Candidates {
    fn push(&mut self, url: &str) -> bool {
        if self.seen.contains(url) {
            return false;
        }
        self.seen.insert(url.to_string());
        self.urls.push(url.to_string());
        true
    }
}

impl ChannelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `url` under `name`; returns false if it was already present
    pub fn insert(&mut self, name: CanonicalName, url: &str) -> bool {
        self.channels.entry(name).or_default().push(url)
    }

    /// Merge records into the index, returning how many URLs were new
    ///
    /// Never removes a URL and performs no filtering.
    pub fn merge<'a, I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = &'a RawRecord>,
    {
        records
            .into_iter()
            .filter(|record| self.insert(CanonicalName::new(&record.channel_name), &record.stream_url))
            .count()
    }

    pub fn get(&self, name: &CanonicalName) -> Option<&[String]> {
        self.channels.get(name).map(|c| c.urls.as_slice())
    }

    /// Number of distinct channels
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn url_count(&self) -> usize {
        self.channels.values().map(|c| c.urls.len()).sum()
    }

    /// Order-insensitive view, for comparing indexes built in different orders
    pub fn as_sets(&self) -> BTreeMap<CanonicalName, BTreeSet<String>> {
        self.channels
            .iter()
            .map(|(name, c)| (name.clone(), c.urls.iter().cloned().collect()))
            .collect()
    }
}

/// Everything one fetch worker learned about its source
#[derive(Debug)]
pub struct SourceBatch {
    /// Position of the source in the configured list
    pub position: usize,
    pub url: String,
    pub outcome: Result<ParseOutcome, SourceError>,
}

/// Fetch-phase counters gathered by the aggregator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub sources_succeeded: usize,
    pub sources_failed: usize,
    pub records_accepted: usize,
    pub skipped: BTreeMap<ParseSkip, usize>,
}

/// Single owner of the index while sources are being fetched
///
/// Batches are applied in configured source order, whatever order they
/// arrive in, so candidate order (and therefore tie-breaking) does not depend
/// on network timing.
#[derive(Debug, Default)]
pub struct MergeAggregator {
    index: ChannelIndex,
    stats: MergeStats,
    pending: BTreeMap<usize, SourceBatch>,
    next_position: usize,
}

impl MergeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer `batch` and apply every batch that is now in sequence
    pub fn accept(&mut self, batch: SourceBatch) {
        self.pending.insert(batch.position, batch);
        while let Some(batch) = self.pending.remove(&self.next_position) {
            self.apply(batch);
            self.next_position += 1;
        }
    }

    /// Apply whatever is still buffered and hand back the finished index
    pub fn finish(mut self) -> (ChannelIndex, MergeStats) {
        let pending = std::mem::take(&mut self.pending);
        for batch in pending.into_values() {
            self.apply(batch);
        }
        (self.index, self.stats)
    }

    /// Run the aggregator as a task fed through a channel
    ///
    /// The task finishes once every sender has been dropped.
    pub fn spawn(buffer: usize) -> (mpsc::Sender<SourceBatch>, JoinHandle<(ChannelIndex, MergeStats)>) {
        let (tx, mut rx) = mpsc::channel(buffer.max(1));
        let handle = tokio::spawn(async move {
            let mut aggregator = MergeAggregator::new();
            while let Some(batch) = rx.recv().await {
                aggregator.accept(batch);
            }
            aggregator.finish()
        });
        (tx, handle)
    }

    fn apply(&mut self, batch: SourceBatch) {
        let url = UrlUtils::obfuscate_credentials(&batch.url);
        match batch.outcome {
            Ok(outcome) => {
                let added = self.index.merge(&outcome.records);
                debug!(
                    source = %url,
                    records = outcome.records.len(),
                    new_urls = added,
                    skipped = outcome.skipped_total(),
                    "Merged source"
                );
                self.stats.sources_succeeded += 1;
                self.stats.records_accepted += outcome.records.len();
                for (reason, count) in outcome.skipped {
                    *self.stats.skipped.entry(reason).or_default() += count;
                }
            }
            Err(e) => {
                warn!(source = %url, "Source contributes no records: {}", e);
                self.stats.sources_failed += 1;
            }
        }
    }
}
