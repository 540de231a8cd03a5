use std::{fs, net::SocketAddr, path::Path};

use serde::{Deserialize, Serialize};

use crate::{BatchError, Result};

pub const DEFAULT_API_ENDPOINT: &str =
    "https://www.googleapis.com/pagespeed/insights/v5/runPagespeed";
pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:3000/api/pagespeed";
pub const DEFAULT_USER_AGENT: &str = "PageSpeed-Batch-Tester/1.0";
pub const API_KEY_ENV: &str = "PAGESPEED_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientMode {
    /// Call the provider through the local proxy service.
    Proxy,
    /// Call the provider endpoint directly.
    Direct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub mode: ClientMode,
    pub proxy_url: String,
    pub api_endpoint: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mode: ClientMode::Proxy,
            proxy_url: DEFAULT_PROXY_URL.into(),
            api_endpoint: DEFAULT_API_ENDPOINT.into(),
            api_key: None,
            request_timeout_secs: 120,
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

impl ClientConfig {
    /// Configured key, overridden by `PAGESPEED_API_KEY` when that is set. Blank keys count as absent.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .or_else(|| self.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Wait between iterations so the provider cache can expire.
    pub interval_secs: u64,
    /// Emit one progress event per elapsed second instead of a single silent sleep.
    pub countdown: bool,
    /// Extra wait after a failed iteration, on top of `interval_secs`.
    pub failure_delay_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 35,
            countdown: true,
            failure_delay_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub log_level: String,
    pub export_dir: String,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            export_dir: "reports".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub bind_addr: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub client: ClientConfig,
    pub pacing: PacingConfig,
    pub ops: OpsConfig,
    pub proxy: ProxyConfig,
}

impl BatchConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            BatchError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            BatchError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.client.request_timeout_secs == 0 {
            return Err(BatchError::Configuration(
                "client.request_timeout_secs must be greater than zero".into(),
            ));
        }
        match self.client.mode {
            ClientMode::Proxy if self.client.proxy_url.trim().is_empty() => {
                return Err(BatchError::Configuration(
                    "client.proxy_url is required in proxy mode".into(),
                ));
            }
            ClientMode::Direct if self.client.api_endpoint.trim().is_empty() => {
                return Err(BatchError::Configuration(
                    "client.api_endpoint is required in direct mode".into(),
                ));
            }
            _ => {}
        }
        if self.ops.export_dir.trim().is_empty() {
            return Err(BatchError::Configuration(
                "ops.export_dir must not be empty".into(),
            ));
        }
        self.proxy_bind_addr()?;
        Ok(())
    }

    pub fn proxy_bind_addr(&self) -> Result<SocketAddr> {
        self.proxy.bind_addr.parse().map_err(|err| {
            BatchError::Configuration(format!(
                "proxy.bind_addr '{}' is not a socket address: {err}",
                self.proxy.bind_addr
            ))
        })
    }
}
