// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact intake service.
//!
//! Every section carries serde defaults so a partial configuration (or none
//! at all) yields the production values used by the landing page.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Configuration for the contact intake service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Contact form validation rules
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Email / mailing-list provider configuration
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Public site metadata used for robots.txt and sitemap.xml
    #[serde(default)]
    pub site: SiteConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests per window per client (default: 5)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in milliseconds (default: 60000)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Store size above which expired entries are swept (default: 10000)
    #[serde(default = "default_sweep_threshold")]
    pub sweep_threshold: usize,
}

/// Field rules for contact submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_name_min")]
    pub name_min_chars: usize,

    #[serde(default = "default_name_max")]
    pub name_max_chars: usize,

    #[serde(default = "default_company_max")]
    pub company_max_chars: usize,

    #[serde(default = "default_message_min")]
    pub message_min_chars: usize,

    #[serde(default = "default_message_max")]
    pub message_max_chars: usize,
}

/// Notification collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Forward accepted submissions to the notifier (default: true)
    #[serde(default = "default_true")]
    pub notify_on_submit: bool,

    /// Inbox that receives contact submissions
    #[serde(default)]
    pub contact_email: Option<String>,

    /// Mailchimp API key; mock notifier is used when absent
    #[serde(default)]
    pub mailchimp_api_key: Option<String>,

    /// Mailchimp audience (list) id
    #[serde(default)]
    pub mailchimp_list_id: Option<String>,

    /// Mailchimp data-centre prefix (default: us1)
    #[serde(default = "default_server_prefix")]
    pub mailchimp_server_prefix: String,

    /// Attempts per contact email before giving up (default: 3)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay before the first retry, doubled each time (default: 1000)
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

/// Public site metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Canonical site URL (default: https://example.com)
    #[serde(default = "default_site_url")]
    pub url: String,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

/// CORS configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origin allowed to call the API cross-site; same-origin only when unset
    #[serde(default)]
    pub allowed_origin: Option<String>,
}

/// Configuration rejected at start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rate_limit.max_requests must be positive")]
    ZeroMaxRequests,

    #[error("rate_limit.window_ms must be positive")]
    ZeroWindow,

    #[error("invalid site url {url}: {source}")]
    InvalidSiteUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("validation.{field} minimum exceeds maximum")]
    InvertedBounds { field: &'static str },
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_sweep_threshold() -> usize {
    10_000
}

fn default_name_min() -> usize {
    2
}

fn default_name_max() -> usize {
    100
}

fn default_company_max() -> usize {
    100
}

fn default_message_min() -> usize {
    10
}

fn default_message_max() -> usize {
    1000
}

fn default_server_prefix() -> String {
    "us1".to_string()
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_site_url() -> String {
    "https://example.com".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            validation: ValidationConfig::default(),
            notifier: NotifierConfig::default(),
            site: SiteConfig::default(),
            metrics: MetricsConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
            sweep_threshold: default_sweep_threshold(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            name_min_chars: default_name_min(),
            name_max_chars: default_name_max(),
            company_max_chars: default_company_max(),
            message_min_chars: default_message_min(),
            message_max_chars: default_message_max(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            notify_on_submit: default_true(),
            contact_email: None,
            mailchimp_api_key: None,
            mailchimp_list_id: None,
            mailchimp_server_prefix: default_server_prefix(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: default_site_url(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Get the window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl NotifierConfig {
    /// Get the delay before the first retry
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_string("BIND_ADDR").unwrap_or(defaults.bind_addr),
            rate_limit: RateLimitConfig {
                max_requests: env_parse("RATE_LIMIT_MAX_REQUESTS")
                    .unwrap_or(defaults.rate_limit.max_requests),
                window_ms: env_parse("RATE_LIMIT_WINDOW_MS").unwrap_or(defaults.rate_limit.window_ms),
                sweep_threshold: env_parse("RATE_LIMIT_SWEEP_THRESHOLD")
                    .unwrap_or(defaults.rate_limit.sweep_threshold),
            },
            notifier: NotifierConfig {
                notify_on_submit: env_parse("NOTIFY_ON_SUBMIT").unwrap_or(true),
                contact_email: env_string("CONTACT_EMAIL"),
                mailchimp_api_key: env_string("MAILCHIMP_API_KEY"),
                mailchimp_list_id: env_string("MAILCHIMP_LIST_ID"),
                mailchimp_server_prefix: env_string("MAILCHIMP_SERVER_PREFIX")
                    .unwrap_or_else(default_server_prefix),
                ..defaults.notifier
            },
            site: SiteConfig {
                url: env_string("SITE_URL").unwrap_or(defaults.site.url),
            },
            metrics: MetricsConfig {
                enabled: env_parse("METRICS_ENABLED").unwrap_or(defaults.metrics.enabled),
                ..defaults.metrics
            },
            cors: CorsConfig {
                allowed_origin: env_string("CORS_ALLOWED_ORIGIN"),
            },
            ..defaults
        }
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::ZeroMaxRequests);
        }
        if self.rate_limit.window_ms == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.validation.name_min_chars > self.validation.name_max_chars {
            return Err(ConfigError::InvertedBounds { field: "name" });
        }
        if self.validation.message_min_chars > self.validation.message_max_chars {
            return Err(ConfigError::InvertedBounds { field: "message" });
        }
        Url::parse(&self.site.url).map_err(|source| ConfigError::InvalidSiteUrl {
            url: self.site.url.clone(),
            source,
        })?;
        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contact_endpoint() {
        let config = Config::default();
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert_eq!(config.rate_limit.sweep_threshold, 10_000);
        assert_eq!(config.rate_limit.window_duration(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"rate_limit": {"max_requests": 20}}"#).unwrap();
        assert_eq!(config.rate_limit.max_requests, 20);
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert!(config.notifier.notify_on_submit);
        assert_eq!(config.notifier.mailchimp_server_prefix, "us1");
        assert_eq!(config.metrics.path, "/metrics");
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = Config::default();
        config.rate_limit.max_requests = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroMaxRequests)));

        let mut config = Config::default();
        config.rate_limit.window_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroWindow)));
    }

    #[test]
    fn test_validate_rejects_bad_site_url() {
        let mut config = Config::default();
        config.site.url = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSiteUrl { .. })
        ));
    }
}
