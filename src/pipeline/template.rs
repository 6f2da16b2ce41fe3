//! Operator template loading and matching
//!
//! The template is line-oriented text:
//!
//! ```text
//! 央视频道,#genre#
//! CCTV1
//! CCTV5+,体育
//! # comment
//! 卫视频道,#genre#
//! 湖南卫视
//! ```
//!
//! It alone decides which channels appear and in which category and order.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use crate::errors::{AppError, AppResult};
use crate::ingestor::GENRE_MARKER;
use crate::models::{
    CanonicalName, MatchedCategory, MatchedChannel, Template, TemplateCategory, TemplateChannel,
};
use crate::pipeline::merger::ChannelIndex;

/// Category for channels listed before any category line
pub const UNCATEGORIZED: &str = "未分类";

/// Parse template text
///
/// Lines containing the marker (in any ASCII case) start a category named by
/// the text before it.
/// Other lines starting with `#` are comments. A channel line may carry a
/// trailing `,<anything>`; only the text before the first comma is the name.
pub fn parse_template(text: &str) -> Template {
    let mut categories: Vec<TemplateCategory> = Vec::new();
    let mut seen: HashSet<CanonicalName> = HashSet::new();

    for line in text
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
    {
        // ASCII lowering keeps byte offsets valid for `line`
        if let Some(marker_at) = line.to_ascii_lowercase().find(GENRE_MARKER) {
            let label = line[..marker_at].trim().trim_end_matches(',').trim();
            categories.push(TemplateCategory {
                name: label.to_string(),
                channels: Vec::new(),
            });
            seen.clear();
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let display_name = line.split(',').next().unwrap_or_default().trim();
        let canonical = CanonicalName::new(display_name);
        if canonical.is_empty() {
            debug!("Ignoring template line without a usable channel name: {}", line);
            continue;
        }

        if categories.is_empty() {
            categories.push(TemplateCategory {
                name: UNCATEGORIZED.to_string(),
                channels: Vec::new(),
            });
        }
        if !seen.insert(canonical.clone()) {
            debug!("Duplicate template channel '{}' ignored", display_name);
            continue;
        }
        if let Some(current) = categories.last_mut() {
            current.channels.push(TemplateChannel {
                display_name: display_name.to_string(),
                canonical,
            });
        }
    }

    Template { categories }
}

/// Read and parse the template file; failure is fatal to the run
pub async fn load_template<P: AsRef<Path>>(path: P) -> AppResult<Template> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::template(path, e.to_string()))?;

    let template = parse_template(&text);
    info!(
        "Loaded template {}: {} categories, {} channels",
        path.display(),
        template.categories.len(),
        template.channel_count()
    );
    Ok(template)
}

/// Look up every template channel in the index, in template order
///
/// Channels without candidates are omitted; categories are always kept, even
/// when empty.
pub fn match_template(template: &Template, index: &ChannelIndex) -> Vec<MatchedCategory> {
    template
        .categories
        .iter()
        .map(|category| MatchedCategory {
            name: category.name.clone(),
            channels: category
                .channels
                .iter()
                .filter_map(|channel| {
                    let candidates = index.get(&channel.canonical)?;
                    Some(MatchedChannel {
                        display_name: channel.display_name.clone(),
                        canonical: channel.canonical.clone(),
                        candidates: candidates.to_vec(),
                    })
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawRecord;
    use tempfile::TempDir;

    const TEMPLATE: &str = "\
卫视频道,#genre#
湖南卫视
# a comment
CCTV5+,体育

央视频道,#genre#
CCTV-01
cctv1
CCTV2
";

    fn names(category: &TemplateCategory) -> Vec<&str> {
        category.channels.iter().map(|c| c.display_name.as_str()).collect()
    }

    #[test]
    fn test_parse_categories_in_order() {
        let template = parse_template(TEMPLATE);

        assert_eq!(template.categories.len(), 2);
        assert_eq!(template.categories[0].name, "卫视频道");
        assert_eq!(names(&template.categories[0]), ["湖南卫视", "CCTV5+"]);
        assert_eq!(template.categories[1].name, "央视频道");
        // Later spellings of the same channel in one category are dropped
        assert_eq!(names(&template.categories[1]), ["CCTV-01", "CCTV2"]);
        assert_eq!(template.channel_count(), 4);
    }

    #[test]
    fn test_channels_before_first_category() {
        let template = parse_template("CCTV1\n新闻,#genre#\nCCTV13\n");
        assert_eq!(template.categories[0].name, UNCATEGORIZED);
        assert_eq!(names(&template.categories[0]), ["CCTV1"]);
        assert_eq!(template.categories[1].name, "新闻");
    }

    #[test]
    fn test_marker_case_is_ignored() {
        for marker in ["#genre#", "#GENRE#", "#Genre#"] {
            let template = parse_template(&format!("体育,{marker}\nCCTV5\n"));
            assert_eq!(template.categories.len(), 1, "{marker}");
            assert_eq!(template.categories[0].name, "体育");
            assert_eq!(names(&template.categories[0]), ["CCTV5"]);
        }
    }

    #[test]
    fn test_same_channel_in_two_categories_is_kept_in_both() {
        let template = parse_template("A,#genre#\nCCTV1\nB,#genre#\nCCTV1\n");
        assert_eq!(template.channel_count(), 2);
    }

    #[test]
    fn test_match_follows_template_order_and_omits_unmatched() {
        let template = parse_template(TEMPLATE);
        let mut index = ChannelIndex::new();
        index.merge(&[
            RawRecord::new("央视", "CCTV1", "http://1.1.1.1/a"),
            RawRecord::new("央视", "CCTV2", "http://1.1.1.1/b"),
            RawRecord::new("卫视", "湖南卫视", "http://1.1.1.1/c"),
        ]);

        let matched = match_template(&template, &index);
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].name, "卫视频道");
        assert_eq!(matched[0].channels.len(), 1);
        assert_eq!(matched[0].channels[0].display_name, "湖南卫视");
        assert_eq!(matched[1].name, "央视频道");
        let shown: Vec<_> = matched[1].channels.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(shown, ["CCTV-01", "CCTV2"]);
        assert_eq!(matched[1].channels[0].candidates, ["http://1.1.1.1/a"]);
    }

    #[test]
    fn test_empty_index_keeps_empty_categories() {
        let matched = match_template(&parse_template(TEMPLATE), &ChannelIndex::new());
        assert_eq!(matched.len(), 2);
        assert!(matched.iter().all(|c| c.channels.is_empty()));
    }

    #[tokio::test]
    async fn test_load_template_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo.txt");
        tokio::fs::write(&path, TEMPLATE).await.unwrap();

        let template = load_template(&path).await.unwrap();
        assert_eq!(template.categories.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_template_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = load_template(dir.path().join("missing.txt")).await.unwrap_err();
        assert!(matches!(err, AppError::Template { .. }));
    }
}
