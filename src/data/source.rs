//! Remote quote source abstraction and HTTP implementation
//!
//! The fetch pipeline treats the remote source as an opaque async call
//! parameterized by the symbol. [`HttpQuoteSource`] is a generic
//! JSON-over-HTTP implementation of that seam; anything implementing
//! [`RemoteQuoteSource`] can stand in for it.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when fetching from a remote quote source
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("unexpected HTTP status: {0}")]
    Status(reqwest::StatusCode),

    /// Failed to parse the response body
    #[error("failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Raw payload returned by a remote source
///
/// Providers signal rate limiting or unknown symbols with an empty body
/// rather than an error status, so every field is optional and the caller
/// decides whether the payload is usable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteQuote {
    /// Last traded price
    pub price: Option<f64>,
    /// Absolute change since the previous close
    pub change: Option<f64>,
    /// Percentage change since the previous close
    pub change_percent: Option<f64>,
}

impl RemoteQuote {
    /// Returns the price when the payload carries a usable, positive value
    pub fn usable_price(&self) -> Option<f64> {
        self.price.filter(|p| *p > 0.0)
    }
}

/// An asynchronous source of market quotes
#[async_trait]
pub trait RemoteQuoteSource: Send + Sync {
    /// Fetches the raw quote payload for a symbol
    async fn fetch_quote(&self, symbol: &str) -> Result<RemoteQuote, SourceError>;
}

/// Quote source backed by a JSON-over-HTTP endpoint
///
/// Expects the endpoint to answer `GET {base_url}?symbol=SYM` with a JSON
/// body shaped like `{"price": 178.5, "change": -1.2, "change_percent":
/// -0.67}`. An API key, when present, is passed as an `apikey` query
/// parameter.
#[derive(Debug, Clone)]
pub struct HttpQuoteSource {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

/// Response envelope from the quote endpoint
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    price: Option<f64>,
    change: Option<f64>,
    change_percent: Option<f64>,
}

impl HttpQuoteSource {
    /// Creates a new source for the given endpoint
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Creates a new source with a custom HTTP client
    pub fn with_client(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http_client: client,
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl RemoteQuoteSource for HttpQuoteSource {
    async fn fetch_quote(&self, symbol: &str) -> Result<RemoteQuote, SourceError> {
        let mut request = self
            .http_client
            .get(&self.base_url)
            .query(&[("symbol", symbol)]);

        if let Some(ref key) = self.api_key {
            request = request.query(&[("apikey", key.as_str())]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }

        let text = response.text().await?;
        let parsed: QuoteResponse = serde_json::from_str(&text)?;

        debug!(symbol, price = ?parsed.price, "remote quote received");

        Ok(RemoteQuote {
            price: parsed.price,
            change: parsed.change,
            change_percent: parsed.change_percent,
        })
    }
}
