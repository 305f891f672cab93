//! Metrics source
//!
//! The pivot engine consumes series through the [`MetricSource`] trait.
//! [`PromClient`] implements it against the Prometheus HTTP API:
//!
//! - `GET /api/v1/query_range` for one metric over a time range
//! - `GET /api/v1/label/__name__/values` to enumerate metric names

pub mod client;
pub mod config;
pub mod model;

pub use client::PromClient;
pub use config::{construct_url, SourceConfig};
pub use model::{QueryData, SampleStream};

use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

use crate::pivot::Series;

/// Supplier of labeled time series
pub trait MetricSource: Send + Sync {
    /// All series for one metric name within `[start, end)`
    fn fetch_samples(
        &self,
        metric: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Series>, SourceError>> + Send;

    /// Metric names with data within `[start, end)`
    fn list_metric_names(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<String>, SourceError>> + Send;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Prometheus error ({error_type}): {error}")]
    Api { error_type: String, error: String },

    #[error("Unexpected result type '{0}', expected matrix")]
    UnexpectedResultType(String),

    #[error("Invalid sample value '{0}'")]
    InvalidSample(String),
}

/// Query window ending at `now` and reaching `lookback` into the past
pub fn query_window(now: DateTime<Utc>, lookback: Duration) -> (DateTime<Utc>, DateTime<Utc>) {
    let lookback = chrono::Duration::from_std(lookback).unwrap_or_else(|_| chrono::Duration::hours(1));
    (now - lookback, now)
}
