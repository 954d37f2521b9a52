//! Layered quote fetching with cache, remote, and synthetic fallback
//!
//! [`QuoteFetcher`] resolves a symbol through a fixed chain: the in-memory
//! cache, then the remote source bounded by a timeout, then the synthetic
//! generator. The outcome decides how long the result stays cached — live
//! data the longest, configuration fallbacks shorter, and failures the
//! shortest so a recovered source is retried soon. Every step reports to
//! the metrics recorder.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::cache::ExpiringCache;
use crate::config::SourceConfig;
use crate::data::{FetchOutcome, FetchSource, Quote, RemoteQuoteSource};
use crate::metrics::MetricsRecorder;
use crate::symbol::is_valid_symbol;
use crate::synthetic::SyntheticQuoteGenerator;

/// Endpoint label used for call accounting
const QUOTE_ENDPOINT: &str = "quote";

/// Errors surfaced to callers of [`QuoteFetcher::fetch`]
#[derive(Debug, Error)]
pub enum FetchError {
    /// The symbol failed format validation; nothing was attempted
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),

    /// No remote source is configured and synthetic data was not permitted
    #[error("no remote source configuration available")]
    ConfigurationUnavailable,

    /// The remote call failed and synthetic data was not permitted
    #[error("remote fetch failed: {reason}")]
    RemoteFailure {
        /// Underlying failure description
        reason: String,
    },
}

/// Cache lifetimes and remote-call bounds for the fetch pipeline
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// How long a live remote quote stays cached
    pub live_ttl: Duration,
    /// How long a synthetic quote from a configuration short-circuit stays cached
    pub fallback_ttl: Duration,
    /// How long a synthetic quote from a remote failure stays cached.
    /// Kept shorter than `fallback_ttl` so a recovered source is retried
    /// sooner than a missing configuration.
    pub error_ttl: Duration,
    /// Upper bound on the remote round trip
    pub remote_timeout: Duration,
    /// Maximum number of cached quotes
    pub max_cache_entries: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            live_ttl: Duration::from_secs(300),     // 5 minutes
            fallback_ttl: Duration::from_secs(60),  // 1 minute
            error_ttl: Duration::from_secs(30),     // 30 seconds
            remote_timeout: Duration::from_secs(10),
            max_cache_entries: 100,
        }
    }
}

/// Resolves symbols through cache, remote source, and synthetic fallback
pub struct QuoteFetcher {
    cache: ExpiringCache<Quote>,
    metrics: MetricsRecorder,
    generator: SyntheticQuoteGenerator,
    source: Arc<dyn RemoteQuoteSource>,
    source_config: SourceConfig,
    config: FetcherConfig,
    validator: fn(&str) -> bool,
}

impl QuoteFetcher {
    /// Creates a fetcher with default configuration, a fresh cache and
    /// metrics recorder, and an entropy-seeded generator
    pub fn new(source: Arc<dyn RemoteQuoteSource>, source_config: SourceConfig) -> Self {
        let config = FetcherConfig::default();
        Self {
            cache: ExpiringCache::new(config.max_cache_entries),
            metrics: MetricsRecorder::new(),
            generator: SyntheticQuoteGenerator::new(),
            source,
            source_config,
            config,
            validator: is_valid_symbol,
        }
    }

    /// Replaces the pipeline configuration, resizing the cache to match
    pub fn with_config(mut self, config: FetcherConfig) -> Self {
        self.cache = ExpiringCache::new(config.max_cache_entries);
        self.config = config;
        self
    }

    /// Shares an externally owned metrics recorder
    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replaces the synthetic generator (e.g. a seeded one in tests)
    pub fn with_generator(mut self, generator: SyntheticQuoteGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Replaces the symbol-validity predicate
    pub fn with_validator(mut self, validator: fn(&str) -> bool) -> Self {
        self.validator = validator;
        self
    }

    /// The underlying cache, for stats, administrative clears, and
    /// spawning the background cleanup task
    pub fn cache(&self) -> &ExpiringCache<Quote> {
        &self.cache
    }

    /// The underlying metrics recorder, for snapshots and resets
    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Fetches a quote for a symbol, degrading gracefully when
    /// `allow_synthetic` is set.
    ///
    /// Resolution order: live cache entry, then the remote source bounded
    /// by the configured timeout, then the synthetic generator. With
    /// `allow_synthetic` false the error is returned instead of a
    /// generated quote, which lets callers distinguish real from degraded
    /// data: call once with `false` to learn whether live data is
    /// obtainable, then retry with `true` to take whatever is available.
    ///
    /// Concurrent fetches for the same symbol are not coalesced; each one
    /// that misses the cache performs its own remote call, and the last
    /// write to finish wins the cache slot.
    pub async fn fetch(
        &self,
        symbol: &str,
        allow_synthetic: bool,
    ) -> Result<FetchOutcome, FetchError> {
        if !(self.validator)(symbol) {
            return Err(FetchError::InvalidSymbol(symbol.to_string()));
        }

        // The cache is authoritative while an entry is live
        if let Some(quote) = self.cache.get(symbol) {
            self.metrics.record_cache_hit();
            debug!(symbol, "serving cached quote");
            return Ok(FetchOutcome {
                quote,
                source: FetchSource::Cache,
                error_reason: None,
            });
        }
        self.metrics.record_cache_miss();
        // Every cycle past the cache counts as a call attempt, including
        // the configuration short-circuits below
        self.metrics.record_call(QUOTE_ENDPOINT);

        if !self.source_config.is_available() {
            self.metrics.record_error("no source configuration", symbol);
            if !allow_synthetic {
                return Err(FetchError::ConfigurationUnavailable);
            }
            let quote = self.generator.generate(symbol);
            self.cache.insert(symbol, quote.clone(), self.config.fallback_ttl);
            warn!(symbol, "serving synthetic quote: no source configuration");
            return Ok(FetchOutcome {
                quote,
                source: FetchSource::SyntheticNoConfig,
                error_reason: None,
            });
        }

        if self.source_config.is_demo_mode() {
            let quote = self.generator.generate(symbol);
            self.cache.insert(symbol, quote.clone(), self.config.fallback_ttl);
            debug!(symbol, "demo mode, serving synthetic quote");
            return Ok(FetchOutcome {
                quote,
                source: FetchSource::SyntheticNoConfig,
                error_reason: None,
            });
        }

        let started = tokio::time::Instant::now();
        let reason = match timeout(self.config.remote_timeout, self.source.fetch_quote(symbol)).await
        {
            Ok(Ok(raw)) => match raw.usable_price() {
                Some(price) => {
                    self.metrics.record_latency(started.elapsed());
                    let quote = Quote {
                        symbol: symbol.to_string(),
                        price,
                        change: raw.change.unwrap_or(0.0),
                        change_percent: raw.change_percent.unwrap_or(0.0),
                        synthetic: false,
                        as_of: Utc::now(),
                    };
                    self.cache.insert(symbol, quote.clone(), self.config.live_ttl);
                    debug!(symbol, price, "remote quote cached");
                    return Ok(FetchOutcome {
                        quote,
                        source: FetchSource::Remote,
                        error_reason: None,
                    });
                }
                // Rate limiting and unknown symbols come back as empty
                // payloads rather than transport errors
                None => "empty or non-positive quote payload".to_string(),
            },
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!(
                "remote call timed out after {:?}",
                self.config.remote_timeout
            ),
        };

        self.metrics.record_error(&reason, symbol);
        if !allow_synthetic {
            return Err(FetchError::RemoteFailure { reason });
        }

        let quote = self.generator.generate(symbol);
        self.cache.insert(symbol, quote.clone(), self.config.error_ttl);
        warn!(symbol, %reason, "serving synthetic quote after remote failure");
        Ok(FetchOutcome {
            quote,
            source: FetchSource::SyntheticFallback,
            error_reason: Some(reason),
        })
    }

    /// Fetches quotes for a whole watchlist concurrently.
    ///
    /// Results come back in input order; a failure for one symbol does not
    /// abort the rest. Duplicate symbols in one batch may each reach the
    /// remote source, since in-flight fetches are not coalesced.
    pub async fn fetch_many(
        &self,
        symbols: &[&str],
        allow_synthetic: bool,
    ) -> Vec<(String, Result<FetchOutcome, FetchError>)> {
        let fetches: Vec<_> = symbols
            .iter()
            .map(|symbol| self.fetch(symbol, allow_synthetic))
            .collect();
        let results = join_all(fetches).await;

        symbols
            .iter()
            .map(|symbol| symbol.to_string())
            .zip(results)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RemoteQuote, SourceError};
    use async_trait::async_trait;

    /// Source that always fails with an HTTP status
    struct FailingSource;

    #[async_trait]
    impl RemoteQuoteSource for FailingSource {
        async fn fetch_quote(&self, _symbol: &str) -> Result<RemoteQuote, SourceError> {
            Err(SourceError::Status(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }

    #[test]
    fn test_default_ttls_are_ordered() {
        let config = FetcherConfig::default();
        assert!(
            config.error_ttl < config.fallback_ttl,
            "failures must be retried sooner than configuration fallbacks"
        );
        assert!(config.fallback_ttl < config.live_ttl);
    }

    #[test]
    fn test_fetch_error_display() {
        assert_eq!(
            FetchError::InvalidSymbol("aa pl".to_string()).to_string(),
            "invalid symbol: \"aa pl\""
        );
        assert_eq!(
            FetchError::ConfigurationUnavailable.to_string(),
            "no remote source configuration available"
        );
        assert!(FetchError::RemoteFailure {
            reason: "boom".to_string()
        }
        .to_string()
        .contains("boom"));
    }

    #[tokio::test]
    async fn test_invalid_symbol_short_circuits_before_any_accounting() {
        let fetcher = QuoteFetcher::new(Arc::new(FailingSource), SourceConfig::unconfigured());

        let result = fetcher.fetch("not valid", true).await;

        assert!(matches!(result, Err(FetchError::InvalidSymbol(_))));
        assert_eq!(fetcher.metrics().snapshot().total_calls, 0);
        let stats = fetcher.cache().stats();
        assert_eq!(stats.hit_count + stats.miss_count, 0);
    }

    #[tokio::test]
    async fn test_custom_validator_is_honored() {
        fn accept_anything(_: &str) -> bool {
            true
        }

        let fetcher = QuoteFetcher::new(Arc::new(FailingSource), SourceConfig::unconfigured())
            .with_validator(accept_anything);

        let outcome = fetcher
            .fetch("lowercase ok", true)
            .await
            .expect("custom validator should accept this symbol");
        assert_eq!(outcome.source, FetchSource::SyntheticNoConfig);
    }

    #[tokio::test]
    async fn test_demo_mode_serves_synthetic_even_when_disallowed() {
        let fetcher = QuoteFetcher::new(Arc::new(FailingSource), SourceConfig::demo());

        let outcome = fetcher
            .fetch("AAPL", false)
            .await
            .expect("demo mode should always produce a quote");

        assert_eq!(outcome.source, FetchSource::SyntheticNoConfig);
        assert!(outcome.is_synthetic());
    }

    #[tokio::test]
    async fn test_demo_mode_counts_the_fetch_cycle() {
        let fetcher = QuoteFetcher::new(Arc::new(FailingSource), SourceConfig::demo());

        fetcher.fetch("AAPL", false).await.expect("demo fetch");

        let snapshot = fetcher.metrics().snapshot();
        assert_eq!(snapshot.total_calls, 1);
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.error_count, 0, "demo degradation is not a failure");
    }
}
