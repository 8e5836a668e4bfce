//! HTTP exchange with the daemon.
//!
//! A transport never fails in the `Result` sense: every outcome, including a
//! dropped connection, is folded into a [`Reply`] whose status carries the
//! protocol meaning.  Status `0` stands for "no HTTP response at all".

use std::future::Future;
use std::time::Duration;

use mixctl_proto::codec::{HttpMethod, HttpRequest};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub const TRANSPORT_FAILURE: u16 = 0;

    /// No response at all.  The body holds the failure detail for logs.
    pub fn transport_failure(detail: impl Into<String>) -> Self {
        Self {
            status: Self::TRANSPORT_FAILURE,
            body: detail.into(),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: String::new(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn busy() -> Self {
        Self {
            status: 503,
            body: String::new(),
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status == Self::TRANSPORT_FAILURE
    }
}

pub trait Transport: Send + Sync + 'static {
    fn exchange(&self, request: HttpRequest) -> impl Future<Output = Reply> + Send;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid base url '{0}'")]
    InvalidBaseUrl(String),
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(TransportError::InvalidBaseUrl(base_url));
        }
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a target such as `/mpctrl/title/0`.
    pub fn url_for(&self, target: &str) -> String {
        format!("{}{}", self.base_url, target)
    }
}

impl Transport for HttpTransport {
    async fn exchange(&self, request: HttpRequest) -> Reply {
        let url = self.url_for(&request.target);
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };

        let response = match builder.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("transport: {} failed: {}", request.target, e);
                return Reply::transport_failure(e.to_string());
            }
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => {
                debug!("transport: {} → {} ({} bytes)", request.target, status, body.len());
                Reply { status, body }
            }
            Err(e) => {
                warn!("transport: reading body of {} failed: {}", request.target, e);
                Reply::transport_failure(e.to_string())
            }
        }
    }
}
