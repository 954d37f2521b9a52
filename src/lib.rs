//! Market quote fetching with bounded TTL caching and graceful fallback
//!
//! `tickerfeed` resolves ticker symbols through a layered chain — an
//! in-memory expiring cache, a remote quote source, and a synthetic
//! generator — so callers always receive a usable quote even when the
//! remote source is rate limited, misconfigured, or down. Outcomes are
//! recorded to an injectable metrics recorder for dashboards and adaptive
//! behavior.
//!
//! The entry point is [`QuoteFetcher`]; see [`fetcher`] for the
//! resolution order and the `allow_synthetic` two-call pattern.

pub mod cache;
pub mod config;
pub mod data;
pub mod fetcher;
pub mod metrics;
pub mod symbol;
pub mod synthetic;

pub use cache::{CacheStats, CleanupHandle, ExpiringCache};
pub use config::SourceConfig;
pub use data::{
    FetchOutcome, FetchSource, HttpQuoteSource, Quote, RemoteQuote, RemoteQuoteSource, SourceError,
};
pub use fetcher::{FetchError, FetcherConfig, QuoteFetcher};
pub use metrics::{MetricsRecorder, MetricsSnapshot};
pub use synthetic::SyntheticQuoteGenerator;
