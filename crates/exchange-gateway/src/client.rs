//! Gateway REST client with rate limiting.
//!
//! Every call is a JSON `POST {base_url}/{endpoint}` carrying the
//! `chain`/`network`/`connector`/`address` envelope. Read-only endpoints are
//! retried on transient failures; transaction submissions are sent once.
//!
//! # Example
//!
//! ```ignore
//! use range_keeper_gateway::{GatewayClient, GatewayClientConfig};
//!
//! let client = GatewayClient::new(GatewayClientConfig::from_app_config(&config)?)?;
//! let (spacing, ladder) = client.tick_spacing_and_ladder(&pool).await?;
//! ```

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use range_keeper_core::{AppConfig, KeeperError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::Envelope;

/// Default local Gateway URL.
pub const DEFAULT_GATEWAY_URL: &str = "https://localhost:15888";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Gateway client.
#[derive(Debug, Clone)]
pub struct GatewayClientConfig {
    pub base_url: String,
    pub chain: String,
    pub network: String,
    pub connector: String,
    /// Wallet the Gateway signs for.
    pub wallet_address: String,
    pub requests_per_minute: NonZeroU32,
    pub timeout_secs: u64,
    /// Attempts for read-only calls, including the first.
    pub read_retry_attempts: u32,
    pub read_retry_delay: Duration,
}

impl Default for GatewayClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            chain: "ethereum".to_string(),
            network: "sepolia".to_string(),
            connector: "panoptic".to_string(),
            wallet_address: String::new(),
            requests_per_minute: nonzero!(120u32),
            timeout_secs: 30,
            read_retry_attempts: 3,
            read_retry_delay: Duration::from_millis(500),
        }
    }
}

impl GatewayClientConfig {
    /// Builds the client configuration from the loaded application config.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the rate limit is zero.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        let gateway = &config.gateway;
        let requests_per_minute = NonZeroU32::new(gateway.requests_per_minute)
            .ok_or_else(|| KeeperError::config("gateway.requests_per_minute must be positive"))?;

        Ok(Self {
            base_url: gateway.base_url.clone(),
            chain: gateway.chain.clone(),
            network: gateway.network.clone(),
            connector: gateway.connector.clone(),
            wallet_address: config.pair.wallet_address.clone(),
            requests_per_minute,
            timeout_secs: gateway.timeout_secs,
            read_retry_attempts: gateway.read_retry_attempts.max(1),
            read_retry_delay: Duration::from_millis(gateway.read_retry_delay_ms),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_wallet(mut self, address: impl Into<String>) -> Self {
        self.wallet_address = address.into();
        self
    }

    #[must_use]
    pub fn with_read_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.read_retry_attempts = attempts.max(1);
        self.read_retry_delay = delay;
        self
    }
}

// =============================================================================
// GatewayClient
// =============================================================================

/// Gateway REST client.
pub struct GatewayClient {
    pub(crate) config: GatewayClientConfig,
    http: Client,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.config.base_url)
            .field("network", &self.config.network)
            .field("requests_per_minute", &self.config.requests_per_minute)
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// # Errors
    ///
    /// Returns a configuration error if the wallet is unset or the HTTP client
    /// cannot be built.
    pub fn new(config: GatewayClientConfig) -> Result<Self> {
        if config.wallet_address.trim().is_empty() {
            return Err(KeeperError::config("gateway client needs a wallet address"));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KeeperError::config(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_minute(config.requests_per_minute);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config,
            http,
            rate_limiter,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Read-only call, retried while the failure is transient.
    pub(crate) async fn read<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let attempts = self.config.read_retry_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.post(endpoint, body).await {
                Err(err) if err.is_retryable() && attempt < attempts => {
                    tracing::warn!(endpoint, attempt, error = %err, "Gateway read failed, retrying");
                    tokio::time::sleep(self.config.read_retry_delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Transaction submission. Never retried.
    pub(crate) async fn submit<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.post(endpoint, body).await
    }

    /// Waits for the rate limiter and performs a single POST.
    async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let envelope = Envelope {
            chain: &self.config.chain,
            network: &self.config.network,
            connector: &self.config.connector,
            address: &self.config.wallet_address,
            body,
        };

        tracing::debug!(endpoint, "POST {}", url);

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(&envelope)
            .send()
            .await
            .map_err(|e| KeeperError::transient_venue(endpoint, e.to_string()))?;

        Self::handle_response(endpoint, response).await
    }

    /// Maps HTTP status and body into a typed response.
    async fn handle_response<T: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| KeeperError::transient_venue(endpoint, e.to_string()))?;

        if status.as_u16() == 429 || status.is_server_error() {
            return Err(KeeperError::transient_venue(
                endpoint,
                format!("HTTP {}: {}", status.as_u16(), text),
            ));
        }
        if !status.is_success() {
            return Err(KeeperError::venue(
                endpoint,
                format!("HTTP {}: {}", status.as_u16(), text),
            ));
        }

        serde_json::from_str(&text)
            .map_err(|e| KeeperError::venue(endpoint, format!("malformed response: {e}")))
    }
}
