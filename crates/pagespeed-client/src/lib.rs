//! Outbound calls to the performance provider, directly or through the proxy.

use std::time::Duration;

use async_trait::async_trait;
use pagespeed_analysis::ensure_report_shape;
use pagespeed_types::{
    config::{ClientConfig, ClientMode},
    metrics::Strategy,
    BatchError, Result,
};
use reqwest::{
    header::{CACHE_CONTROL, PRAGMA, USER_AGENT},
    StatusCode, Url,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Query parameter carrying the per-call cache-buster token.
pub const CACHE_BUSTER_PARAM: &str = "nocache";

/// One measurement of `url` under `strategy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementRequest {
    pub url: String,
    pub strategy: Strategy,
    pub cache_buster: String,
}

#[async_trait]
pub trait MeasurementClient: Send + Sync {
    /// Returns the provider report, already checked for its required sections.
    async fn measure(&self, request: &MeasurementRequest) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub enum Endpoint {
    Direct {
        api_endpoint: String,
        api_key: Option<String>,
    },
    Proxy {
        proxy_url: String,
    },
}

impl Endpoint {
    pub fn from_config(config: &ClientConfig) -> Self {
        match config.mode {
            ClientMode::Direct => Endpoint::Direct {
                api_endpoint: config.api_endpoint.clone(),
                api_key: config.resolved_api_key(),
            },
            ClientMode::Proxy => Endpoint::Proxy {
                proxy_url: config.proxy_url.clone(),
            },
        }
    }
}

/// reqwest-backed client for either endpoint flavour.
#[derive(Debug, Clone)]
pub struct HttpMeasurementClient {
    client: reqwest::Client,
    endpoint: Endpoint,
    user_agent: String,
    timeout: Duration,
}

impl HttpMeasurementClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Self::with_timeout(
            Endpoint::from_config(config),
            config.user_agent.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn with_timeout(endpoint: Endpoint, user_agent: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| client_error(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            endpoint,
            user_agent,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn request_url(&self, request: &MeasurementRequest) -> Result<Url> {
        let mut params: Vec<(&str, &str)> = vec![
            ("url", request.url.as_str()),
            ("strategy", request.strategy.as_str()),
        ];
        let base = match &self.endpoint {
            Endpoint::Direct {
                api_endpoint,
                api_key,
            } => {
                params.push(("category", "performance"));
                if let Some(key) = api_key {
                    params.push(("key", key.as_str()));
                }
                api_endpoint
            }
            Endpoint::Proxy { proxy_url } => proxy_url,
        };
        params.push((CACHE_BUSTER_PARAM, request.cache_buster.as_str()));

        Url::parse_with_params(base, &params).map_err(|err| {
            BatchError::Configuration(format!("invalid measurement endpoint '{base}': {err}"))
        })
    }
}

#[async_trait]
impl MeasurementClient for HttpMeasurementClient {
    async fn measure(&self, request: &MeasurementRequest) -> Result<Value> {
        let url = self.request_url(request)?;
        debug!(strategy = %request.strategy, url = %request.url, "Requesting measurement");

        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .await
            .map_err(|err| self.send_error(err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| self.send_error(err))?;

        if !status.is_success() {
            warn!(strategy = %request.strategy, status = status.as_u16(), "Measurement request rejected");
            return Err(client_error(status_message(status, &body)));
        }

        let report: Value = serde_json::from_str(&body).map_err(|err| {
            BatchError::MalformedReport(format!("response is not valid JSON: {err}"))
        })?;
        ensure_report_shape(&report)?;
        Ok(report)
    }
}

impl HttpMeasurementClient {
    fn send_error(&self, err: reqwest::Error) -> BatchError {
        if err.is_timeout() {
            client_error(format!("request timed out after {:?}", self.timeout))
        } else {
            client_error(format!("request failed: {err}"))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<Value>,
}

fn status_message(status: StatusCode, body: &str) -> String {
    let mut message = format!(
        "API request failed: {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    );
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        message.push_str(": ");
        message.push_str(&parsed.error);
        match parsed.details {
            Some(Value::String(details)) => {
                if !details.is_empty() {
                    message.push_str(&format!(" ({details})"));
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => message.push_str(&format!(" ({other})")),
        }
    }
    message
}

/// Transport-level failure for a single measurement call.
pub fn client_error(message: impl Into<String>) -> BatchError {
    BatchError::Transport(message.into())
}
