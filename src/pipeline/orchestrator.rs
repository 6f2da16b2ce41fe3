//! Run orchestration
//!
//! Phases run strictly one after another: fetch and parse every source into
//! the merged index, match against the template, probe every candidate,
//! rank, render. Only fetching and probing suspend; everything else is a
//! synchronous pass over complete data.

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::merger::{ChannelIndex, MergeAggregator, MergeStats, SourceBatch};
use super::probe::{HttpProber, LatencyProbe, UrlProber};
use super::ranking::rank;
use super::template::match_template;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::ingestor::{UrlFilter, parse_playlist};
use crate::models::{RankedCategory, RunReport, Source, Template};
use crate::output::{RenderOptions, RenderedArtifacts, Renderer};
use crate::sources::{HttpPlaylistFetcher, PlaylistFetcher, SourceFormat};
use crate::utils::UrlUtils;

/// Everything a run produced; writing the artifacts is left to the caller
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ranked: Vec<RankedCategory>,
    pub artifacts: RenderedArtifacts,
    pub report: RunReport,
}

/// The aggregation pipeline, generic over its two network collaborators
pub struct Pipeline<F, P> {
    sources: Vec<Source>,
    fetcher: F,
    filter: UrlFilter,
    max_concurrent_fetches: usize,
    probe: LatencyProbe<P>,
    renderer: Renderer,
}

impl Pipeline<HttpPlaylistFetcher, HttpProber> {
    /// Pipeline backed by real HTTP clients
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let fetcher = HttpPlaylistFetcher::from_config(&config.network)?;
        let prober = HttpProber::from_config(&config.probe, &config.network.user_agent)?;
        Ok(Self::new(config, fetcher, prober))
    }
}

impl<F: PlaylistFetcher, P: UrlProber> Pipeline<F, P> {
    pub fn new(config: &Config, fetcher: F, prober: P) -> Self {
        Self {
            sources: config.sources(),
            fetcher,
            filter: UrlFilter::from_config(&config.sources),
            max_concurrent_fetches: config.network.max_concurrent_fetches.max(1),
            probe: LatencyProbe::new(prober, config.probe.max_concurrent_probes),
            renderer: Renderer::new(RenderOptions::from_config(
                &config.output,
                &config.announcements,
            )),
        }
    }

    /// Run every phase against `template`
    ///
    /// Source, entry and probe failures only shrink the output; the result is
    /// always a complete pair of artifacts.
    pub async fn run(&self, template: &Template) -> AppResult<RunOutput> {
        let mut report = RunReport::new();
        report.sources_attempted = self.sources.len();
        report.template_channels = template.channel_count();

        info!("Fetching {} sources", self.sources.len());
        let (index, stats) = self.fetch_sources().await?;
        report.sources_succeeded = stats.sources_succeeded;
        report.sources_failed = stats.sources_failed;
        report.records_accepted = stats.records_accepted;
        report.absorb_skips(&stats.skipped);
        report.indexed_channels = index.len();
        info!(
            "Merged {} channels ({} URLs) from {}/{} sources",
            index.len(),
            index.url_count(),
            stats.sources_succeeded,
            self.sources.len()
        );

        let matched = match_template(template, &index);
        report.channels_matched = matched.iter().map(|c| c.channels.len()).sum();
        report.channels_unmatched = report.template_channels - report.channels_matched;

        let latencies = self
            .probe
            .probe_all(
                matched
                    .iter()
                    .flat_map(|c| &c.channels)
                    .flat_map(|ch| ch.candidates.iter().map(String::as_str)),
            )
            .await;
        report.urls_probed = latencies.len();
        report.urls_reachable = latencies.values().filter(|l| l.is_reachable()).count();
        report.urls_unreachable = report.urls_probed - report.urls_reachable;

        let ranked = rank(&matched, &latencies);
        let ranked_channels: usize = ranked.iter().map(|c| c.channels.len()).sum();
        report.channels_unreachable = report.channels_matched - ranked_channels;

        let artifacts = self.renderer.render(&ranked);
        report.entries_emitted = artifacts.emitted;
        report.duplicates_suppressed = artifacts.suppressed;
        report.finish();

        Ok(RunOutput {
            ranked,
            artifacts,
            report,
        })
    }

    /// Fetch and parse all sources with bounded concurrency
    ///
    /// Workers never touch the index; they hand finished batches to the
    /// aggregator, which owns it until every worker is done.
    async fn fetch_sources(&self) -> AppResult<(ChannelIndex, MergeStats)> {
        let (tx, aggregator) = MergeAggregator::spawn(self.max_concurrent_fetches);

        stream::iter(self.sources.iter().enumerate())
            .map(|(position, source)| {
                let tx = tx.clone();
                async move {
                    let outcome = self.fetcher.fetch(&source.url).await.map(|content| {
                        let format = SourceFormat::sniff(&content);
                        let parsed = parse_playlist(&content, format, &self.filter);
                        info!(
                            source = %UrlUtils::obfuscate_credentials(&source.url),
                            %format,
                            records = parsed.records.len(),
                            skipped = parsed.skipped_total(),
                            "Parsed source"
                        );
                        parsed
                    });

                    let batch = SourceBatch {
                        position,
                        url: source.url.clone(),
                        outcome,
                    };
                    if tx.send(batch).await.is_err() {
                        warn!("Merge aggregator stopped before all sources were fetched");
                    }
                }
            })
            .buffer_unordered(self.max_concurrent_fetches)
            .collect::<Vec<()>>()
            .await;
        drop(tx);

        aggregator
            .await
            .map_err(|e| AppError::internal(format!("Merge aggregator failed: {e}")))
    }
}

/// Log the counters of a finished run
pub fn log_run_report(report: &RunReport) {
    let elapsed = report
        .elapsed()
        .map(|d| format!("{:.1}s", d.num_milliseconds() as f64 / 1000.0))
        .unwrap_or_else(|| "unfinished".to_string());

    info!(
        "Run finished in {}: sources {}/{} ok ({} failed), {} records accepted, {} entries skipped",
        elapsed,
        report.sources_succeeded,
        report.sources_attempted,
        report.sources_failed,
        report.records_accepted,
        report.skipped_total()
    );
    for (reason, count) in &report.entries_skipped {
        info!("  skipped {}: {}", reason.as_str(), count);
    }
    info!(
        "Template channels: {} total, {} matched, {} unmatched, {} with no reachable URL",
        report.template_channels,
        report.channels_matched,
        report.channels_unmatched,
        report.channels_unreachable
    );
    info!(
        "URLs probed: {} ({} reachable, {} unreachable); {} entries emitted, {} duplicates suppressed",
        report.urls_probed,
        report.urls_reachable,
        report.urls_unreachable,
        report.entries_emitted,
        report.duplicates_suppressed
    );
}
