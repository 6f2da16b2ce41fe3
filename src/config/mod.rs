use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::models::{Announcement, AnnouncementGroup, Source};
use crate::utils::retry::RetryPolicy;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_template_path")]
    pub template_path: PathBuf,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default = "default_announcements")]
    pub announcements: Vec<AnnouncementGroup>,
}

/// Playlist sources and URL filtering
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Source playlist URLs, fetched concurrently
    #[serde(default)]
    pub urls: Vec<String>,
    /// Substring or regex patterns, matched case-insensitively against stream URLs
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Only accept stream URLs carrying an IPv4 or bracketed IPv6 literal
    #[serde(default = "default_require_ip_literal")]
    pub require_ip_literal: bool,
}

/// Source fetch policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Per-attempt request timeout
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub timeout: Duration,
    /// Total attempts per source, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff", with = "duration_serde")]
    pub initial_backoff: Duration,
    #[serde(default = "default_max_backoff", with = "duration_serde")]
    pub max_backoff: Duration,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Reachability probe policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_timeout", with = "duration_serde")]
    pub timeout: Duration,
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,
    #[serde(default)]
    pub method: ProbeMethod,
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,
}

/// Request used to probe a stream URL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    #[default]
    Head,
    /// Ranged GET of the first byte, for servers that reject HEAD
    Get,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_m3u_filename")]
    pub m3u_filename: String,
    #[serde(default = "default_txt_filename")]
    pub txt_filename: String,
    /// Prefix for synthesized channel logos (`<base><name>.png`)
    #[serde(default = "default_logo_base_url")]
    pub logo_base_url: String,
    /// Guide sources advertised in the playlist header
    #[serde(default = "default_epg_urls")]
    pub epg_urls: Vec<String>,
}

fn default_template_path() -> PathBuf {
    PathBuf::from(DEFAULT_TEMPLATE_PATH)
}

fn default_require_ip_literal() -> bool {
    true
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS)
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(DEFAULT_MAX_BACKOFF_SECS)
}

fn default_max_concurrent_fetches() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS)
}

/// Probe pool sized relative to available parallelism, within fixed bounds
fn default_max_concurrent_probes() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores * DEFAULT_PROBES_PER_CORE).clamp(MIN_CONCURRENT_PROBES, MAX_CONCURRENT_PROBES)
}

fn default_follow_redirects() -> bool {
    DEFAULT_FOLLOW_REDIRECTS
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_m3u_filename() -> String {
    DEFAULT_M3U_FILENAME.to_string()
}

fn default_txt_filename() -> String {
    DEFAULT_TXT_FILENAME.to_string()
}

fn default_logo_base_url() -> String {
    DEFAULT_LOGO_BASE_URL.to_string()
}

fn default_epg_urls() -> Vec<String> {
    DEFAULT_EPG_URLS.iter().map(|s| s.to_string()).collect()
}

fn default_announcements() -> Vec<AnnouncementGroup> {
    vec![AnnouncementGroup {
        category: DEFAULT_ANNOUNCEMENT_CATEGORY.to_string(),
        entries: vec![Announcement {
            name: DEFAULT_ANNOUNCEMENT_NAME.to_string(),
            url: DEFAULT_ANNOUNCEMENT_URL.to_string(),
            logo: None,
        }],
    }]
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            max_retries: default_max_retries(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            user_agent: default_user_agent(),
        }
    }
}

impl NetworkConfig {
    /// Retry policy applied to every source fetch
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            initial_delay: self.initial_backoff,
            max_delay: self.max_backoff,
            ..RetryPolicy::default()
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: default_probe_timeout(),
            max_concurrent_probes: default_max_concurrent_probes(),
            method: ProbeMethod::default(),
            follow_redirects: default_follow_redirects(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            m3u_filename: default_m3u_filename(),
            txt_filename: default_txt_filename(),
            logo_base_url: default_logo_base_url(),
            epg_urls: default_epg_urls(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_path: default_template_path(),
            sources: SourcesConfig {
                require_ip_literal: default_require_ip_literal(),
                ..SourcesConfig::default()
            },
            network: NetworkConfig::default(),
            probe: ProbeConfig::default(),
            output: OutputConfig::default(),
            announcements: default_announcements(),
        }
    }
}

impl Config {
    /// Layer defaults, the TOML file and `M3U_AGGREGATOR_*` environment overrides
    ///
    /// A missing file is created with the default configuration.
    pub fn load_from_file<P: AsRef<Path>>(config_file: P) -> AppResult<Self> {
        let path = config_file.as_ref();
        if !path.exists() {
            let contents = toml::to_string_pretty(&Self::default())
                .map_err(|e| AppError::configuration(format!("Failed to render defaults: {e}")))?;
            std::fs::write(path, contents)?;
            info!("Created default config file: {}", path.display());
        }

        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| AppError::configuration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> AppResult<()> {
        if self.network.max_retries == 0 {
            return Err(AppError::configuration(
                "network.max_retries must be at least 1",
            ));
        }
        if self.network.max_concurrent_fetches == 0 {
            return Err(AppError::configuration(
                "network.max_concurrent_fetches must be at least 1",
            ));
        }
        if self.probe.max_concurrent_probes == 0 {
            return Err(AppError::configuration(
                "probe.max_concurrent_probes must be at least 1",
            ));
        }
        if let Some(pos) = self.sources.blacklist.iter().position(|p| p.trim().is_empty()) {
            return Err(AppError::configuration(format!(
                "sources.blacklist[{pos}] is empty"
            )));
        }
        if self.output.m3u_filename == self.output.txt_filename {
            return Err(AppError::configuration(
                "output.m3u_filename and output.txt_filename must differ",
            ));
        }
        Ok(())
    }

    pub fn sources(&self) -> Vec<Source> {
        self.sources.urls.iter().map(Source::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.network.timeout, Duration::from_secs(10));
        assert_eq!(config.network.max_retries, 3);
        assert!(config.sources.require_ip_literal);
        assert!(config.probe.max_concurrent_probes >= MIN_CONCURRENT_PROBES);
        assert!(config.probe.max_concurrent_probes <= MAX_CONCURRENT_PROBES);
        assert_eq!(config.announcements.len(), 1);
    }

    #[test]
    fn test_load_creates_default_file_when_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from_file(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.output.m3u_filename, DEFAULT_M3U_FILENAME);

        // The written file must load back to the same settings
        let reloaded = Config::load_from_file(&path).unwrap();
        assert_eq!(reloaded.network.timeout, config.network.timeout);
        assert_eq!(reloaded.output.epg_urls, config.output.epg_urls);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
template_path = "channels.txt"

[sources]
urls = ["http://example.com/a.m3u", "http://example.com/b.txt"]
blacklist = ['epg\.pw/stream/']

[network]
timeout = "3s"
max_retries = 5

[probe]
method = "get"

[[announcements]]
category = "Notice"
entries = [{ name = "Updated daily", url = "http://example.com/notice.mp4" }]
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.template_path, PathBuf::from("channels.txt"));
        assert_eq!(config.sources().len(), 2);
        assert_eq!(config.network.timeout, Duration::from_secs(3));
        assert_eq!(config.network.max_retries, 5);
        assert_eq!(config.network.max_concurrent_fetches, DEFAULT_MAX_CONCURRENT_FETCHES);
        assert_eq!(config.probe.method, ProbeMethod::Get);
        assert_eq!(config.announcements[0].category, "Notice");
        assert_eq!(config.announcements[0].entries[0].logo, None);
    }

    #[test]
    fn test_example_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.toml");
        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.sources.blacklist.len(), 3);
        assert_eq!(config.probe.max_concurrent_probes, 32);
        assert_eq!(config.network.initial_backoff, Duration::from_millis(500));
    }

    #[test]
    fn test_validate_rejects_zero_retries_and_empty_patterns() {
        let mut config = Config::default();
        config.network.max_retries = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sources.blacklist = vec!["ok".to_string(), "  ".to_string()];
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("sources.blacklist[1]"));
    }

    #[test]
    fn test_retry_policy_follows_network_config() {
        let network = NetworkConfig {
            max_retries: 4,
            initial_backoff: Duration::from_millis(10),
            ..NetworkConfig::default()
        };
        let policy = network.retry_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.initial_delay, Duration::from_millis(10));
    }
}
