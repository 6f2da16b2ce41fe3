//! Candidate ranking

use std::collections::HashMap;

use crate::models::{Latency, MatchedCategory, RankedCategory, RankedChannel, RankedUrl};

/// Order each channel's reachable candidates by ascending latency
///
/// Unreachable candidates are dropped, and so is a channel left with none.
/// The sort is stable, so equal latencies keep first-seen order. A candidate
/// missing from `latencies` counts as unreachable.
pub fn rank(matched: &[MatchedCategory], latencies: &HashMap<String, Latency>) -> Vec<RankedCategory> {
    matched
        .iter()
        .map(|category| RankedCategory {
            name: category.name.clone(),
            channels: category
                .channels
                .iter()
                .filter_map(|channel| {
                    let mut urls: Vec<RankedUrl> = channel
                        .candidates
                        .iter()
                        .filter_map(|url| match latencies.get(url) {
                            Some(Latency::Reachable(latency)) => Some(RankedUrl {
                                url: url.clone(),
                                latency: *latency,
                            }),
                            _ => None,
                        })
                        .collect();
                    if urls.is_empty() {
                        return None;
                    }
                    urls.sort_by_key(|ranked| ranked.latency);

                    Some(RankedChannel {
                        category: category.name.clone(),
                        display_name: channel.display_name.clone(),
                        canonical: channel.canonical.clone(),
                        urls,
                    })
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CanonicalName, MatchedChannel};
    use std::time::Duration;

    fn matched(channels: &[(&str, Vec<&str>)]) -> Vec<MatchedCategory> {
        vec![MatchedCategory {
            name: "News".to_string(),
            channels: channels
                .iter()
                .map(|(name, urls)| MatchedChannel {
                    display_name: name.to_string(),
                    canonical: CanonicalName::new(name),
                    candidates: urls.iter().map(|u| u.to_string()).collect(),
                })
                .collect(),
        }]
    }

    fn latencies(entries: &[(&str, Option<u64>)]) -> HashMap<String, Latency> {
        entries
            .iter()
            .map(|(url, ms)| {
                let latency = ms.map_or(Latency::Unreachable, |ms| {
                    Latency::Reachable(Duration::from_millis(ms))
                });
                (url.to_string(), latency)
            })
            .collect()
    }

    #[test]
    fn test_rank_drops_unreachable_and_keeps_tie_order() {
        let input = matched(&[("CCTV1", vec!["A", "B", "C", "C2"])]);
        let probed = latencies(&[("A", Some(50)), ("B", None), ("C", Some(10)), ("C2", Some(10))]);

        let ranked = rank(&input, &probed);
        let order: Vec<_> = ranked[0].channels[0].urls.iter().map(|u| u.url.as_str()).collect();
        assert_eq!(order, ["C", "C2", "A"]);
    }

    #[test]
    fn test_channel_with_no_reachable_candidate_is_omitted() {
        let input = matched(&[("CCTV1", vec!["A"]), ("CCTV2", vec!["B", "C"])]);
        let probed = latencies(&[("A", Some(5)), ("B", None)]);

        let ranked = rank(&input, &probed);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].channels.len(), 1);
        assert_eq!(ranked[0].channels[0].display_name, "CCTV1");
        assert_eq!(ranked[0].channels[0].category, "News");
    }

    #[test]
    fn test_empty_category_survives() {
        let input = matched(&[("CCTV1", vec!["A"])]);
        let ranked = rank(&input, &HashMap::new());
        assert_eq!(ranked[0].name, "News");
        assert!(ranked[0].channels.is_empty());
    }
}
