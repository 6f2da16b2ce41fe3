//! Playlist and flat-listing rendering
//!
//! Both artifacts are written by one pass over the ranked data, so they can
//! never disagree on content or order. A write-once set spanning the whole
//! pass keeps any stream URL from being emitted twice.

use std::collections::HashSet;
use std::fmt::Write as _;

use tracing::debug;

use crate::config::OutputConfig;
use crate::ingestor::GENRE_MARKER;
use crate::models::{AnnouncementGroup, RankedCategory};

/// Sequence id given to announcement entries
const ANNOUNCEMENT_SEQ: usize = 0;

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Prefix for synthesized logos, `<base><name>.png`
    pub logo_base_url: String,
    /// Guide URLs for the playlist header
    pub epg_urls: Vec<String>,
    pub announcements: Vec<AnnouncementGroup>,
}

impl RenderOptions {
    pub fn from_config(output: &OutputConfig, announcements: &[AnnouncementGroup]) -> Self {
        Self {
            logo_base_url: output.logo_base_url.clone(),
            epg_urls: output.epg_urls.clone(),
            announcements: announcements.to_vec(),
        }
    }

    fn logo_for(&self, name: &str) -> String {
        format!("{}{}.png", self.logo_base_url, name)
    }
}

/// The two rendered artifacts plus what the pass emitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedArtifacts {
    /// Entry-based M3U playlist
    pub playlist: String,
    /// `name,url` listing with `#genre#` category lines
    pub listing: String,
    /// Channel entries emitted, announcements excluded
    pub emitted: usize,
    /// Candidates skipped because their URL was already emitted
    pub suppressed: usize,
}

pub struct Renderer {
    options: RenderOptions,
}

/// Mutable state of a single render pass
struct RenderPass<'a> {
    options: &'a RenderOptions,
    playlist: String,
    listing: String,
    emitted_urls: HashSet<&'a str>,
    emitted: usize,
    suppressed: usize,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Render header, announcements, then every category in the given order
    pub fn render(&self, ranked: &[RankedCategory]) -> RenderedArtifacts {
        let mut pass = RenderPass::new(&self.options);

        pass.header();
        for group in &self.options.announcements {
            pass.category(&group.category);
            for entry in &group.entries {
                let logo = entry
                    .logo
                    .clone()
                    .unwrap_or_else(|| self.options.logo_for(&entry.name));
                // Always emitted, but claims the URL for the rest of the pass
                pass.emitted_urls.insert(entry.url.as_str());
                pass.entry(&entry.name, &entry.url, &logo, &group.category, ANNOUNCEMENT_SEQ);
            }
        }

        for category in ranked {
            pass.category(&category.name);
            for channel in &category.channels {
                let logo = self.options.logo_for(&channel.display_name);
                for (position, ranked_url) in channel.urls.iter().enumerate() {
                    if !pass.emitted_urls.insert(ranked_url.url.as_str()) {
                        debug!(
                            "Suppressing repeated URL for '{}': {}",
                            channel.display_name, ranked_url.url
                        );
                        pass.suppressed += 1;
                        continue;
                    }
                    pass.entry(
                        &channel.display_name,
                        &ranked_url.url,
                        &logo,
                        &category.name,
                        position + 1,
                    );
                    pass.emitted += 1;
                }
            }
        }

        pass.finish()
    }
}

impl<'a> RenderPass<'a> {
    fn new(options: &'a RenderOptions) -> Self {
        Self {
            options,
            playlist: String::new(),
            listing: String::new(),
            emitted_urls: HashSet::new(),
            emitted: 0,
            suppressed: 0,
        }
    }

    fn header(&mut self) {
        if self.options.epg_urls.is_empty() {
            self.playlist.push_str("#EXTM3U\n");
        } else {
            let _ = writeln!(
                self.playlist,
                "#EXTM3U x-tvg-url=\"{}\"",
                self.options.epg_urls.join(",")
            );
        }
    }

    fn category(&mut self, name: &str) {
        let _ = writeln!(self.listing, "{name},{GENRE_MARKER}");
    }

    fn entry(&mut self, name: &str, url: &str, logo: &str, category: &str, seq: usize) {
        let _ = writeln!(
            self.playlist,
            "#EXTINF:-1 tvg-id=\"{seq}\" tvg-name=\"{name}\" tvg-logo=\"{logo}\" group-title=\"{category}\",{name}\n{url}"
        );
        let _ = writeln!(self.listing, "{name},{url}");
    }

    fn finish(self) -> RenderedArtifacts {
        RenderedArtifacts {
            playlist: self.playlist,
            listing: self.listing,
            emitted: self.emitted,
            suppressed: self.suppressed,
        }
    }
}
