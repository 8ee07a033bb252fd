//! Kaspersky OpenTIP domain lookup client
//!
//! Issues one `GET <endpoint>?request=<domain>` per domain and normalizes the
//! JSON reply into a [`QueryResult`]. Calls are paced by a token bucket and
//! never retried.

use crate::{
    config::Config,
    errors::CheckerError,
    rate_limit::SharedRateLimiter,
    QueryResult,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};
use url::Url;

const API_KEY_HEADER: &str = "x-api-key";

/// Anything that can turn a domain into a [`QueryResult`].
///
/// Implementations never fail: errors are folded into the result's status.
#[async_trait]
pub trait DomainLookup: Send + Sync {
    async fn query(&self, domain: &str) -> QueryResult;
}

pub struct OpenTipClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    max_response_size: usize,
    rate_limiter: SharedRateLimiter,
}

/// Subset of the OpenTIP domain report this tool reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenTipResponse {
    #[serde(rename = "Zone")]
    pub zone: Option<String>,
    #[serde(rename = "Categories")]
    pub categories: Option<Vec<OpenTipCategory>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenTipCategory {
    #[serde(rename = "Name")]
    pub name: Option<String>,
}

impl OpenTipResponse {
    pub fn into_query_result(self) -> QueryResult {
        let zone = self.zone.unwrap_or_else(|| "Unknown".to_string());

        let names: Vec<String> = self
            .categories
            .unwrap_or_default()
            .into_iter()
            .map(|category| category.name.unwrap_or_else(|| "Unknown".to_string()))
            .collect();

        let categories = if names.is_empty() {
            "None".to_string()
        } else {
            names.join(", ")
        };

        QueryResult::success(zone, categories)
    }
}

impl OpenTipClient {
    pub fn new(config: Arc<Config>, api_key: impl Into<String>) -> Result<Self, CheckerError> {
        let endpoint = Url::parse(&config.api_endpoint)
            .map_err(|e| CheckerError::Internal(format!("Invalid API endpoint '{}': {}", config.api_endpoint, e)))?;

        if config.accept_invalid_certs {
            warn!("TLS certificate verification is DISABLED for {}", endpoint);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(config.user_agent.as_str())
            .gzip(true)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(CheckerError::HttpError)?;

        info!(
            "OpenTipClient initialized (endpoint: {}, timeout: {}s, rate: {}/s)",
            endpoint, config.request_timeout_seconds, config.requests_per_second
        );

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            max_response_size: config.max_response_size,
            rate_limiter: SharedRateLimiter::new(config.requests_per_second),
        })
    }

    /// Look up a single domain, returning the decoded report
    pub async fn lookup(&self, domain: &str) -> Result<OpenTipResponse, CheckerError> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(CheckerError::InvalidDomain("Empty domain".to_string()));
        }

        self.rate_limiter.acquire().await;

        debug!("Querying OpenTIP for {}", domain);

        let response = self.client
            .get(self.endpoint.clone())
            .query(&[("request", domain)])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckerError::HttpStatus(status));
        }

        if let Some(length) = response.content_length() {
            let length = usize::try_from(length).unwrap_or(usize::MAX);
            if length > self.max_response_size {
                return Err(CheckerError::ResponseTooLarge(length));
            }
        }

        let body = response.bytes().await.map_err(map_transport_error)?;
        if body.len() > self.max_response_size {
            return Err(CheckerError::ResponseTooLarge(body.len()));
        }

        debug!("OpenTIP response length: {} bytes", body.len());

        let report: OpenTipResponse = serde_json::from_slice(&body)?;
        Ok(report)
    }
}

#[async_trait]
impl DomainLookup for OpenTipClient {
    async fn query(&self, domain: &str) -> QueryResult {
        match self.lookup(domain).await {
            Ok(report) => report.into_query_result(),
            Err(e) => {
                warn!("Lookup failed for {}: {}", domain, e);
                QueryResult::from_error(&e)
            }
        }
    }
}

fn map_transport_error(error: reqwest::Error) -> CheckerError {
    if error.is_timeout() {
        CheckerError::Timeout
    } else {
        CheckerError::HttpError(error)
    }
}
