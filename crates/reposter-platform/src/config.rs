//! Platform client configuration.

use std::time::Duration;

use crate::error::{PlatformError, PlatformResult};

/// Desktop browser user agent the web-upload endpoints are signed against.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/68.0.3440.106 Safari/537.36";

/// Application id sent as `aid` on every web API call.
pub const WEB_AID: u32 = 1988;

/// Platform client configuration.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Regional host prefix (`us` => `https://us.tiktok.com`)
    pub region: String,
    /// Regional web host; derived from `region` unless overridden
    pub web_base: String,
    /// Main site host (upload auth, hashtag suggestions, feed)
    pub www_base: String,
    /// Video-on-demand control plane used by the ingest upload
    pub vod_base: String,
    /// Scheme used for the per-upload transfer host
    pub upload_scheme: String,
    pub user_agent: String,
    /// Optional HTTP(S) proxy for every request
    pub proxy: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Pause between the ingest upload and tag resolution
    pub tag_lookup_delay: Duration,
    /// Pause between tag resolution and the publish call
    pub publish_delay: Duration,
    /// Ingest chunk size in bytes
    pub chunk_size: usize,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::for_region("us")
    }
}

impl PlatformConfig {
    /// Defaults for a regional host prefix.
    pub fn for_region(region: &str) -> Self {
        Self {
            region: region.to_string(),
            web_base: format!("https://{}.tiktok.com", region),
            www_base: "https://www.tiktok.com".to_string(),
            vod_base: "https://vod-us-east-1.bytevcloudapi.com".to_string(),
            upload_scheme: "https".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            tag_lookup_delay: Duration::from_secs(2),
            publish_delay: Duration::from_secs(3),
            chunk_size: 5 * 1024 * 1024,
        }
    }

    /// Point every host at one base URL. Used against mock servers.
    pub fn with_single_host(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        self.web_base = base.clone();
        self.www_base = base.clone();
        self.vod_base = base;
        self.upload_scheme = "http".to_string();
        self
    }

    pub fn without_delays(mut self) -> Self {
        self.tag_lookup_delay = Duration::ZERO;
        self.publish_delay = Duration::ZERO;
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> PlatformResult<Self> {
        let region = std::env::var("PLATFORM_REGION")
            .ok()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "us".to_string());

        if !region.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(PlatformError::config(format!(
                "PLATFORM_REGION must be a host prefix, got {:?}",
                region
            )));
        }

        let mut config = Self::for_region(&region);

        config.proxy = std::env::var("PLATFORM_PROXY")
            .ok()
            .filter(|p| !p.trim().is_empty());

        if let Ok(ua) = std::env::var("PLATFORM_USER_AGENT") {
            if !ua.trim().is_empty() {
                config.user_agent = ua;
            }
        }

        let timeout_secs: u64 = std::env::var("PLATFORM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120);
        config.timeout = Duration::from_secs(timeout_secs);

        let tag_delay_ms: u64 = std::env::var("PLATFORM_TAG_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2000);
        config.tag_lookup_delay = Duration::from_millis(tag_delay_ms);

        let publish_delay_ms: u64 = std::env::var("PLATFORM_PUBLISH_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        config.publish_delay = Duration::from_millis(publish_delay_ms);

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_region_hosts() {
        let config = PlatformConfig::for_region("eu");
        assert_eq!(config.web_base, "https://eu.tiktok.com");
        assert_eq!(config.www_base, "https://www.tiktok.com");
        assert_eq!(config.chunk_size, 5 * 1024 * 1024);
    }

    #[test]
    fn test_single_host() {
        let config = PlatformConfig::default()
            .with_single_host("http://127.0.0.1:9000/")
            .without_delays();
        assert_eq!(config.web_base, "http://127.0.0.1:9000");
        assert_eq!(config.vod_base, "http://127.0.0.1:9000");
        assert_eq!(config.upload_scheme, "http");
        assert_eq!(config.tag_lookup_delay, Duration::ZERO);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("PLATFORM_REGION", "eu");
        std::env::set_var("PLATFORM_PROXY", "http://proxy:8080");
        std::env::set_var("PLATFORM_TAG_DELAY_MS", "10");
        let config = PlatformConfig::from_env().unwrap();
        assert_eq!(config.web_base, "https://eu.tiktok.com");
        assert_eq!(config.proxy.as_deref(), Some("http://proxy:8080"));
        assert_eq!(config.tag_lookup_delay, Duration::from_millis(10));

        std::env::set_var("PLATFORM_REGION", "bad/host");
        assert!(PlatformConfig::from_env().is_err());

        std::env::remove_var("PLATFORM_REGION");
        std::env::remove_var("PLATFORM_PROXY");
        std::env::remove_var("PLATFORM_TAG_DELAY_MS");
        assert_eq!(PlatformConfig::from_env().unwrap().region, "us");
    }
}
