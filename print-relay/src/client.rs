//! Relay API client
//!
//! Talks to the four print-relay endpoints of the main application:
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET | /api/print-relay/orders | Auto-print feed |
//! | POST | /api/print-relay/orders | Acknowledge an auto-printed order |
//! | GET | /api/print-relay/queue | Manual print queue |
//! | DELETE | /api/print-relay/queue | Remove a printed job from the queue |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder};
use shared::{Order, OrderIdBody, OrdersResponse};
use thiserror::Error;
use tracing::warn;

use crate::config::{AgentConfig, AuthStrategy};

const ORDERS_PATH: &str = "api/print-relay/orders";
const QUEUE_PATH: &str = "api/print-relay/queue";

/// Timeout for the auto feed endpoint
pub const FEED_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the manual queue endpoint, polled every 2s
pub const QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Relay API errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx response, raw body kept
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Connect failures and timeouts
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Where print jobs come from and where their completion is reported
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Orders eligible for automatic printing
    async fn fetch_auto_print_feed(&self) -> ClientResult<Vec<Order>>;

    /// Orders an operator queued for printing
    async fn fetch_manual_queue(&self) -> ClientResult<Vec<Order>>;

    /// Flag an auto-fed order as printed (idempotent)
    async fn acknowledge_auto_printed(&self, order_id: &str) -> ClientResult<()>;

    /// Remove a job from the manual queue (idempotent)
    async fn dequeue_manual(&self, order_id: &str) -> ClientResult<()>;
}

/// HTTPS client for the relay endpoints
#[derive(Debug, Clone)]
pub struct RelayApiClient {
    client: Client,
    base_url: String,
    secret: String,
    tenant_slug: String,
    feed_timeout: Duration,
    queue_timeout: Duration,
}

impl RelayApiClient {
    pub fn new(config: &AgentConfig) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("PrintAgent/{}", config.agent_name))?,
        );
        if config.auth == AuthStrategy::Header {
            headers.insert("X-Print-Relay-Key", HeaderValue::from_str(&config.secret)?);
            headers.insert("X-Tenant-Slug", HeaderValue::from_str(&config.tenant_slug)?);
        }

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            secret: config.secret.clone(),
            tenant_slug: config.tenant_slug.clone(),
            feed_timeout: FEED_TIMEOUT,
            queue_timeout: QUEUE_TIMEOUT,
        })
    }

    /// Override the per-endpoint request timeouts
    pub fn with_timeouts(mut self, feed: Duration, queue: Duration) -> Self {
        self.feed_timeout = feed;
        self.queue_timeout = queue;
        self
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, timeout: Duration) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        self.client
            .request(method, url)
            .timeout(timeout)
            .query(&[("key", self.secret.as_str())])
    }

    /// Reads carry the tenant in the query as well
    fn read(&self, path: &str, timeout: Duration) -> RequestBuilder {
        self.request(Method::GET, path, timeout)
            .query(&[("tenant", self.tenant_slug.as_str())])
    }

    /// Writes carry `{"orderId": ...}`
    fn write(
        &self,
        method: Method,
        path: &str,
        timeout: Duration,
        order_id: &str,
    ) -> RequestBuilder {
        let body = OrderIdBody {
            order_id: order_id.to_string(),
        };
        self.request(method, path, timeout).json(&body)
    }

    async fn fetch_orders(&self, req: RequestBuilder) -> ClientResult<Vec<Order>> {
        let text = Self::handle_response(req.send().await?).await?;
        let response: OrdersResponse = serde_json::from_str(&text)?;
        let (orders, rejected) = response.into_orders();
        for entry in &rejected {
            warn!(
                order_id = entry.id.as_deref().unwrap_or("unknown"),
                error = %entry.error,
                "Skipping malformed order"
            );
        }
        Ok(orders)
    }

    /// Body text of a 2xx response, `ClientError::Status` otherwise
    async fn handle_response(response: reqwest::Response) -> ClientResult<String> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl OrderSource for RelayApiClient {
    async fn fetch_auto_print_feed(&self) -> ClientResult<Vec<Order>> {
        self.fetch_orders(self.read(ORDERS_PATH, self.feed_timeout))
            .await
    }

    async fn fetch_manual_queue(&self) -> ClientResult<Vec<Order>> {
        self.fetch_orders(self.read(QUEUE_PATH, self.queue_timeout))
            .await
    }

    async fn acknowledge_auto_printed(&self, order_id: &str) -> ClientResult<()> {
        let req = self.write(Method::POST, ORDERS_PATH, self.feed_timeout, order_id);
        Self::handle_response(req.send().await?).await?;
        Ok(())
    }

    async fn dequeue_manual(&self, order_id: &str) -> ClientResult<()> {
        let req = self.write(Method::DELETE, QUEUE_PATH, self.queue_timeout, order_id);
        Self::handle_response(req.send().await?).await?;
        Ok(())
    }
}
