//! The aggregation pipeline
//!
//! Merge, template matching, probing and ranking, plus the orchestrator that
//! runs them behind full phase barriers.

pub mod merger;
pub mod orchestrator;
pub mod probe;
pub mod ranking;
pub mod template;

pub use merger::{ChannelIndex, MergeAggregator, MergeStats, SourceBatch};
pub use orchestrator::{Pipeline, RunOutput, log_run_report};
pub use probe::{HttpProber, LatencyProbe, UrlProber};
pub use ranking::rank;
pub use template::{UNCATEGORIZED, load_template, match_template, parse_template};
