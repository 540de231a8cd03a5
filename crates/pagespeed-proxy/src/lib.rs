//! HTTP proxy in front of the provider API, keeping the API key server-side.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use pagespeed_analysis::ensure_report_shape;
use pagespeed_types::{config::ClientConfig, BatchError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

pub const PAGESPEED_ROUTE: &str = "/api/pagespeed";

/// Upstream settings for the proxy.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub api_endpoint: String,
    pub api_key: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
}

impl ProxySettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            api_endpoint: config.api_endpoint.clone(),
            api_key: config.resolved_api_key(),
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

#[derive(Clone)]
struct AppState {
    client: reqwest::Client,
    settings: Arc<ProxySettings>,
}

#[derive(Debug, Deserialize)]
struct PageSpeedQuery {
    url: Option<String>,
    strategy: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug)]
struct ProxyError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl ProxyError {
    fn new(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details,
        }
    }

    fn internal(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            Some(details.into()),
        )
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse {
            error: self.error,
            details: self.details,
        });
        (self.status, payload).into_response()
    }
}

pub fn router(settings: ProxySettings) -> Result<Router> {
    let client = reqwest::Client::builder()
        .timeout(settings.timeout)
        .build()
        .map_err(|err| BatchError::Configuration(format!("failed to build proxy client: {err}")))?;
    let state = AppState {
        client,
        settings: Arc::new(settings),
    };

    Ok(Router::new()
        .route("/health", get(health_handler))
        .route(
            PAGESPEED_ROUTE,
            // CORS answers OPTIONS before routing.
            get(pagespeed_handler).fallback(method_not_allowed),
        )
        .layer(CorsLayer::permissive())
        .with_state(state))
}

pub async fn serve(addr: SocketAddr, settings: ProxySettings) -> Result<()> {
    let router = router(settings)?;
    let listener = TcpListener::bind(addr).await.map_err(|err| {
        BatchError::Configuration(format!("failed to bind proxy listener at {addr}: {err}"))
    })?;
    info!(addr = %addr, "starting pagespeed proxy");
    axum::serve(listener, router)
        .await
        .map_err(|err| BatchError::Other(anyhow_error(err)))
}

fn anyhow_error(err: std::io::Error) -> anyhow::Error {
    anyhow::Error::new(err).context("proxy server terminated unexpectedly")
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn method_not_allowed() -> ProxyError {
    ProxyError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", None)
}

async fn pagespeed_handler(
    State(state): State<AppState>,
    Query(query): Query<PageSpeedQuery>,
) -> std::result::Result<Json<Value>, ProxyError> {
    let url = query.url.filter(|v| !v.trim().is_empty());
    let strategy = query.strategy.filter(|v| !v.trim().is_empty());
    let (Some(url), Some(strategy)) = (url, strategy) else {
        return Err(ProxyError::new(
            StatusCode::BAD_REQUEST,
            "Missing required parameters: url and strategy",
            None,
        ));
    };

    let settings = &state.settings;
    let mut params = vec![
        ("url", url.as_str()),
        ("strategy", strategy.as_str()),
        ("category", "performance"),
    ];
    if let Some(key) = settings.api_key.as_deref() {
        params.push(("key", key));
    }

    info!(strategy = %strategy, url = %url, "Calling PageSpeed API");
    let response = state
        .client
        .get(&settings.api_endpoint)
        .query(&params)
        .header(header::USER_AGENT, settings.user_agent.as_str())
        .send()
        .await
        .map_err(|err| {
            error!(error = %err, "PageSpeed API call failed");
            ProxyError::internal(err.to_string())
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = format!(
            "PageSpeed API error: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )
        .trim_end()
        .to_string();
        warn!(status = status.as_u16(), "{message}");
        return Err(ProxyError::new(status, message, Some(body)));
    }

    let data: Value = response.json().await.map_err(|err| {
        error!(error = %err, "PageSpeed API returned an unreadable body");
        ProxyError::internal(err.to_string())
    })?;
    if ensure_report_shape(&data).is_err() {
        error!("Invalid PageSpeed API response structure");
        return Err(ProxyError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Invalid response from PageSpeed API",
            Some("Missing lighthouse data".into()),
        ));
    }

    info!(strategy = %strategy, "PageSpeed API call successful");
    Ok(Json(data))
}
