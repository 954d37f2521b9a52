//! Core data models for tickerfeed
//!
//! This module contains the quote payload stored in the cache and the
//! per-fetch result types handed back to callers, along with the remote
//! source abstraction in [`source`].

pub mod source;

pub use source::{HttpQuoteSource, RemoteQuote, RemoteQuoteSource, SourceError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single market quote for a ticker symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker symbol the quote is for
    pub symbol: String,
    /// Last traded price
    pub price: f64,
    /// Absolute change since the previous close
    pub change: f64,
    /// Percentage change since the previous close
    pub change_percent: f64,
    /// Whether this quote was generated rather than fetched
    pub synthetic: bool,
    /// When this quote was fetched or generated
    pub as_of: DateTime<Utc>,
}

/// Where a fetched quote came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchSource {
    /// Served from the in-memory cache
    Cache,
    /// Fetched live from the remote source
    Remote,
    /// Generated after a remote failure
    SyntheticFallback,
    /// Generated because no live remote configuration is in effect
    SyntheticNoConfig,
}

impl FetchSource {
    /// Stable label for logs and dashboards
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchSource::Cache => "cache",
            FetchSource::Remote => "remote",
            FetchSource::SyntheticFallback => "synthetic-fallback",
            FetchSource::SyntheticNoConfig => "synthetic-no-config",
        }
    }
}

impl std::fmt::Display for FetchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single fetch, consumed within the calling request
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    /// The quote, real or synthetic
    pub quote: Quote,
    /// Which layer of the fallback chain produced it
    pub source: FetchSource,
    /// Underlying failure description when the quote is a failure fallback
    pub error_reason: Option<String>,
}

impl FetchOutcome {
    /// Whether the quote was generated rather than fetched
    pub fn is_synthetic(&self) -> bool {
        self.quote.synthetic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_serialization_roundtrip() {
        let quote = Quote {
            symbol: "AAPL".to_string(),
            price: 178.52,
            change: -1.23,
            change_percent: -0.68,
            synthetic: false,
            as_of: Utc::now(),
        };

        let json = serde_json::to_string(&quote).expect("Failed to serialize Quote");
        let deserialized: Quote = serde_json::from_str(&json).expect("Failed to deserialize Quote");

        assert_eq!(deserialized.symbol, "AAPL");
        assert!((deserialized.price - 178.52).abs() < 0.001);
        assert!((deserialized.change - (-1.23)).abs() < 0.001);
        assert!(!deserialized.synthetic);
    }

    #[test]
    fn test_fetch_source_labels() {
        assert_eq!(FetchSource::Cache.as_str(), "cache");
        assert_eq!(FetchSource::Remote.as_str(), "remote");
        assert_eq!(FetchSource::SyntheticFallback.as_str(), "synthetic-fallback");
        assert_eq!(FetchSource::SyntheticNoConfig.as_str(), "synthetic-no-config");
    }

    #[test]
    fn test_fetch_source_serializes_to_label() {
        let json = serde_json::to_string(&FetchSource::SyntheticFallback)
            .expect("Failed to serialize FetchSource");
        assert_eq!(json, "\"synthetic-fallback\"");
    }

    #[test]
    fn test_outcome_reports_synthetic_flag_from_quote() {
        let outcome = FetchOutcome {
            quote: Quote {
                symbol: "MSFT".to_string(),
                price: 415.0,
                change: 0.0,
                change_percent: 0.0,
                synthetic: true,
                as_of: Utc::now(),
            },
            source: FetchSource::SyntheticNoConfig,
            error_reason: None,
        };

        assert!(outcome.is_synthetic());
    }
}
