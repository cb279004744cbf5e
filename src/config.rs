//! Client configuration loading: remote endpoints, push feed timing and local storage paths.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/client.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "VOLLEY_SCOREKEEPER_CONFIG_PATH";
/// Environment variable overriding the REST base URL.
const API_BASE_URL_ENV: &str = "VOLLEY_API_BASE_URL";
/// Environment variable overriding the push feed URL.
const PUSH_URL_ENV: &str = "VOLLEY_PUSH_URL";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_PUSH_URL: &str = "ws://localhost:8000/ws/websocket";
const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;
const DEFAULT_HEARTBEAT_MS: u64 = 4_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_DEGRADED_AFTER_FAILURES: u32 = 3;
const DEFAULT_NOTICE_TTL_MS: u64 = 3_000;
const DEFAULT_CREDENTIALS_PATH: &str = ".volley/credentials.json";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the client.
pub struct ClientConfig {
    /// Base URL every REST path is appended to.
    pub api_base_url: String,
    /// WebSocket URL of the push feed.
    pub push_url: String,
    /// Fixed delay between push feed reconnect attempts.
    pub reconnect_delay: Duration,
    /// Heart-beat interval requested in both directions on the push feed.
    pub heartbeat: Duration,
    /// Per-request timeout for REST calls.
    pub request_timeout: Duration,
    /// Consecutive failed connection attempts before the feed is reported degraded.
    pub degraded_after_failures: u32,
    /// How long a notice stays visible.
    pub notice_ttl: Duration,
    /// File holding the persisted auth token and user.
    pub credentials_path: PathBuf,
}

impl ClientConfig {
    /// Load the configuration from disk, falling back to built-in defaults, then apply
    /// environment overrides.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded client config");
                    raw.into()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };
        config.with_env_overrides()
    }

    /// Parse a configuration from a JSON document; absent fields keep their defaults.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(url) = non_empty_env(API_BASE_URL_ENV) {
            self.api_base_url = url;
        }
        if let Some(url) = non_empty_env(PUSH_URL_ENV) {
            self.push_url = url;
        }
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    api_base_url: Option<String>,
    push_url: Option<String>,
    reconnect_delay_ms: Option<u64>,
    heartbeat_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    degraded_after_failures: Option<u32>,
    notice_ttl_ms: Option<u64>,
    credentials_path: Option<PathBuf>,
}

impl From<RawConfig> for ClientConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            api_base_url: value
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.into()),
            push_url: value.push_url.unwrap_or_else(|| DEFAULT_PUSH_URL.into()),
            reconnect_delay: Duration::from_millis(
                value.reconnect_delay_ms.unwrap_or(DEFAULT_RECONNECT_DELAY_MS),
            ),
            heartbeat: Duration::from_millis(value.heartbeat_ms.unwrap_or(DEFAULT_HEARTBEAT_MS)),
            request_timeout: Duration::from_millis(
                value.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
            ),
            degraded_after_failures: value
                .degraded_after_failures
                .unwrap_or(DEFAULT_DEGRADED_AFTER_FAILURES)
                .max(1),
            notice_ttl: Duration::from_millis(value.notice_ttl_ms.unwrap_or(DEFAULT_NOTICE_TTL_MS)),
            credentials_path: value
                .credentials_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH)),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
