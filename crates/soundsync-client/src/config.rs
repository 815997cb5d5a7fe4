//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use soundsync_models::project::DEFAULT_DATE_FORMAT;
use soundsync_models::{is_valid_date_format, DisplayOptions};
use tracing::warn;

use crate::error::{ClientError, ClientResult};

/// Identity Toolkit endpoint.
pub const IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";

/// Secure Token endpoint.
pub const SECURE_TOKEN_ENDPOINT: &str = "https://securetoken.googleapis.com";

/// Default generation pipeline endpoint.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// SoundSync client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Firebase Web API key
    pub api_key: String,
    /// Identity Toolkit base URL
    pub identity_endpoint: String,
    /// Secure Token base URL
    pub secure_token_endpoint: String,
    /// Generation pipeline base URL
    pub api_url: String,
    /// Poll interval for live record watches
    pub poll_interval: Duration,
    /// Directory downloads are written to
    pub download_dir: PathBuf,
    /// How dates are rendered in view models
    pub display: DisplayOptions,
    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            identity_endpoint: IDENTITY_ENDPOINT.to_string(),
            secure_token_endpoint: SECURE_TOKEN_ENDPOINT.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_millis(2000),
            download_dir: PathBuf::from("."),
            display: DisplayOptions::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        let api_key = std::env::var("FIREBASE_API_KEY")
            .map_err(|_| ClientError::config("FIREBASE_API_KEY must be set"))?;
        if api_key.trim().is_empty() {
            return Err(ClientError::config("FIREBASE_API_KEY cannot be empty"));
        }

        let (identity_endpoint, secure_token_endpoint) = match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) if !host.is_empty() => (
                format!("http://{}/identitytoolkit.googleapis.com", host),
                format!("http://{}/securetoken.googleapis.com", host),
            ),
            _ => (IDENTITY_ENDPOINT.to_string(), SECURE_TOKEN_ENDPOINT.to_string()),
        };

        let date_format =
            std::env::var("SOUNDSYNC_DATE_FORMAT").unwrap_or_else(|_| DEFAULT_DATE_FORMAT.to_string());
        if !is_valid_date_format(&date_format) {
            warn!(format = %date_format, "Ignoring invalid SOUNDSYNC_DATE_FORMAT");
        }
        let offset_minutes: i32 = std::env::var("SOUNDSYNC_UTC_OFFSET_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        Ok(Self {
            api_key,
            identity_endpoint,
            secure_token_endpoint,
            api_url: std::env::var("SOUNDSYNC_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            poll_interval: Duration::from_millis(
                std::env::var("SOUNDSYNC_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|ms: &u64| *ms > 0)
                    .unwrap_or(2000),
            ),
            download_dir: std::env::var("SOUNDSYNC_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            display: DisplayOptions::new(date_format, offset_minutes),
            request_timeout: Duration::from_secs(30),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "FIREBASE_API_KEY",
            "FIREBASE_AUTH_EMULATOR_HOST",
            "SOUNDSYNC_API_URL",
            "SOUNDSYNC_POLL_INTERVAL_MS",
            "SOUNDSYNC_DOWNLOAD_DIR",
            "SOUNDSYNC_DATE_FORMAT",
            "SOUNDSYNC_UTC_OFFSET_MINUTES",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_requires_api_key() {
        clear_env();
        assert!(matches!(ClientConfig::from_env(), Err(ClientError::Config(_))));
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        std::env::set_var("FIREBASE_API_KEY", "key");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.identity_endpoint, IDENTITY_ENDPOINT);
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.display, DisplayOptions::default());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_overrides_and_invalid_values() {
        clear_env();
        std::env::set_var("FIREBASE_API_KEY", "key");
        std::env::set_var("FIREBASE_AUTH_EMULATOR_HOST", "localhost:9099");
        std::env::set_var("SOUNDSYNC_POLL_INTERVAL_MS", "not-a-number");
        std::env::set_var("SOUNDSYNC_UTC_OFFSET_MINUTES", "-300");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.identity_endpoint, "http://localhost:9099/identitytoolkit.googleapis.com");
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.display.utc_offset.local_minus_utc(), -300 * 60);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_unusable_display_settings_fall_back() {
        clear_env();
        std::env::set_var("FIREBASE_API_KEY", "key");
        std::env::set_var("SOUNDSYNC_DATE_FORMAT", "%Q");
        std::env::set_var("SOUNDSYNC_UTC_OFFSET_MINUTES", "214748364");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.display, DisplayOptions::default());
        clear_env();
    }
}
