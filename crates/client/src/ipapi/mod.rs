//! ip-api.com geolocation client.
//!
//! Provides a client for the ip-api JSON API with optional client-side rate
//! limiting and response normalization into core [`LookupResponse`] values.
//!
//! ### Endpoints
//!
//! - **Single**: `GET {base}/json/{ip}?fields=...`
//! - **Batch**: `POST {base}/batch?fields=...` with a JSON array of up to 100
//!   IPs; answers come back in request order.
//! - **Rate Limiting**: the free tier allows 45 single and 15 batch requests
//!   per minute and answers 429 beyond that. The client surfaces 429 as
//!   [`IpApiError::RateLimited`] and never retries; callers pace themselves.

pub mod error;
pub mod response;

pub use error::IpApiError;
pub use response::IpApiResponse;

use async_trait::async_trait;
use ipscope_core::{AppConfig, GeoLookup, LookupResponse};
use reqwest::header;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Default base URL for ip-api.
const DEFAULT_BASE_URL: &str = "http://ip-api.com";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "ipscope/0.1";

/// Largest batch the service accepts.
pub const MAX_BATCH: usize = 100;

/// Fields requested from the service.
const FIELDS: &str = "status,message,country,countryCode,region,regionName,city,zip,lat,lon,timezone,isp,org,as,query";

/// ip-api client configuration.
#[derive(Debug, Clone)]
pub struct IpApiConfig {
    /// Base URL (default: http://ip-api.com).
    pub base_url: String,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    /// User-agent string (default: ipscope/0.x).
    pub user_agent: String,
    /// Minimum spacing between requests. Zero disables the limiter.
    pub min_request_interval: Duration,
}

impl Default for IpApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_request_interval: Duration::ZERO,
        }
    }
}

impl From<&AppConfig> for IpApiConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            min_request_interval: config.min_request_interval(),
        }
    }
}

/// Rate limiter to enforce request intervals.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(Instant::now().checked_sub(min_interval).unwrap_or_else(Instant::now)),
            min_interval,
        }
    }

    /// Acquire permission to make a request, waiting if necessary.
    async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            tracing::debug!(wait_ms = (self.min_interval - elapsed).as_millis() as u64, "rate limiter waiting");
            tokio::time::sleep(self.min_interval - elapsed).await;
        }
        *last = Instant::now();
    }
}

/// ip-api client.
#[derive(Debug, Clone)]
pub struct IpApiClient {
    http: reqwest::Client,
    config: IpApiConfig,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl IpApiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: IpApiConfig) -> Result<Self, IpApiError> {
        match url::Url::parse(&config.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(IpApiError::InvalidBaseUrl(config.base_url)),
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| IpApiError::Network(Arc::new(e)))?;

        let rate_limiter =
            (!config.min_request_interval.is_zero()).then(|| Arc::new(RateLimiter::new(config.min_request_interval)));

        Ok(Self { http, config, rate_limiter })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }
    }

    /// Look up a single IP.
    pub async fn lookup(&self, ip: &str) -> Result<LookupResponse, IpApiError> {
        self.throttle().await;

        let start = Instant::now();
        tracing::debug!(ip, "querying ip-api");

        let http_response = self
            .http
            .get(self.endpoint(&format!("json/{ip}")))
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, &self.config.user_agent)
            .query(&[("fields", FIELDS)])
            .send()
            .await?;

        let raw: IpApiResponse = Self::parse_body(http_response).await?;
        let response = LookupResponse::try_from(raw)?;

        tracing::debug!(ip, status = response.status.as_str(), elapsed = ?start.elapsed(), "ip-api answered");
        Ok(response)
    }

    /// Look up several IPs in one request, one response per IP in order.
    pub async fn lookup_batch(&self, ips: &[String]) -> Result<Vec<LookupResponse>, IpApiError> {
        if ips.is_empty() {
            return Ok(vec![]);
        }
        if ips.len() > MAX_BATCH {
            return Err(IpApiError::BatchTooLarge(ips.len()));
        }

        self.throttle().await;

        let start = Instant::now();
        tracing::debug!(size = ips.len(), "querying ip-api batch");

        let http_response = self
            .http
            .post(self.endpoint("batch"))
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, &self.config.user_agent)
            .query(&[("fields", FIELDS)])
            .json(ips)
            .send()
            .await?;

        let raw: Vec<IpApiResponse> = Self::parse_body(http_response).await?;
        if raw.len() != ips.len() {
            return Err(IpApiError::Protocol(format!("expected {} answers, got {}", ips.len(), raw.len())));
        }

        let responses = raw.into_iter().map(LookupResponse::try_from).collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(size = ips.len(), elapsed = ?start.elapsed(), "ip-api batch answered");
        Ok(responses)
    }

    async fn parse_body<T: serde::de::DeserializeOwned>(http_response: reqwest::Response) -> Result<T, IpApiError> {
        let status = http_response.status();
        tracing::debug!("ip-api response status: {}", status);

        if status == 429 {
            return Err(IpApiError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(IpApiError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| IpApiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl GeoLookup for IpApiClient {
    async fn fetch(&self, ip: &str) -> Result<LookupResponse, ipscope_core::Error> {
        Ok(self.lookup(ip).await?)
    }

    async fn fetch_batch(&self, ips: &[String]) -> Result<Vec<LookupResponse>, ipscope_core::Error> {
        Ok(self.lookup_batch(ips).await?)
    }
}
