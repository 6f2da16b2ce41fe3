/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Source defaults
pub const DEFAULT_TEMPLATE_PATH: &str = "demo.txt";

// Network (source fetch) defaults
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 5;
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 16;
pub const DEFAULT_USER_AGENT: &str = concat!("m3u-aggregator/", env!("CARGO_PKG_VERSION"));

// Probe defaults
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_PROBES_PER_CORE: usize = 4;
pub const MIN_CONCURRENT_PROBES: usize = 8;
pub const MAX_CONCURRENT_PROBES: usize = 128;
pub const DEFAULT_FOLLOW_REDIRECTS: bool = true;

// Output defaults
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_M3U_FILENAME: &str = "live.m3u";
pub const DEFAULT_TXT_FILENAME: &str = "live.txt";
pub const DEFAULT_LOGO_BASE_URL: &str = "https://gitee.com/IIII-9306/PAV/raw/master/logos/";
pub const DEFAULT_EPG_URLS: &[&str] = &["https://epg.v1.mk/fy.xml", "http://epg.51zmt.top:8000/e.xml"];

// Announcement defaults
pub const DEFAULT_ANNOUNCEMENT_CATEGORY: &str = "系统公告";
pub const DEFAULT_ANNOUNCEMENT_NAME: &str = "每日自动更新";
pub const DEFAULT_ANNOUNCEMENT_URL: &str =
    "https://codeberg.org/alantang/photo/raw/branch/main/ChatGPTImage.png";

// Environment override prefix, nested keys split by `__`
pub const ENV_PREFIX: &str = "M3U_AGGREGATOR_";
