//! Fetch, pivot and write one table per cube

use chrono::{DateTime, SecondsFormat, Utc};
use fxhash::FxHashSet;
use regex::Regex;
use serde::Serialize;

use super::config::{Cube, LoaderConfig};
use crate::pivot::{pivot, CubeMeta, PivotError, Series};
use crate::source::{query_window, MetricSource, SourceError};
use crate::storage::{StorageError, TableWriter};

/// Outcome of a successful cube load
#[derive(Debug, Clone, Serialize)]
pub struct CubeReport {
    pub name: String,
    pub metrics: Vec<String>,
    pub series: usize,
    pub rows: usize,
    pub label_columns: usize,
    pub metric_columns: usize,
    pub last_refresh: String,
}

/// Loads cubes from a metrics source into a table writer
pub struct CubeLoader<S, W> {
    source: S,
    writer: W,
    config: LoaderConfig,
}

impl<S: MetricSource, W: TableWriter> CubeLoader<S, W> {
    pub fn new(source: S, writer: W, config: LoaderConfig) -> Self {
        Self {
            source,
            writer,
            config,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Explicit metrics first, then source metric names matching the pattern
    pub async fn resolve_metrics(
        &self,
        cube: &Cube,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>, LoadError> {
        let mut metrics: Vec<String> = Vec::new();
        for metric in &cube.metrics {
            if !metrics.contains(metric) {
                metrics.push(metric.clone());
            }
        }

        let Some(pattern) = &cube.metric_pattern else {
            return Ok(metrics);
        };

        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            LoadError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            }
        })?;

        let names = self.source.list_metric_names(start, end).await?;
        for name in names {
            if regex.is_match(&name) && !metrics.contains(&name) {
                metrics.push(name);
            }
        }

        Ok(metrics)
    }

    /// Load one cube using a window ending now
    pub async fn load_cube(&self, cube: &Cube) -> Result<CubeReport, LoadError> {
        self.load_cube_at(cube, Utc::now()).await
    }

    /// Load one cube using a window ending at `now`
    pub async fn load_cube_at(
        &self,
        cube: &Cube,
        now: DateTime<Utc>,
    ) -> Result<CubeReport, LoadError> {
        let (start, end) = query_window(now, self.config.lookback());
        let metrics = self.resolve_metrics(cube, start, end).await?;

        if metrics.is_empty() {
            tracing::warn!("Cube '{}' resolved no metrics", cube.name);
        }

        let fetches = metrics.iter().map(|metric| async move {
            self.source
                .fetch_samples(metric, start, end)
                .await
                .map_err(|e| {
                    tracing::warn!("Fetching {} for cube '{}' failed: {}", metric, cube.name, e);
                    e
                })
        });
        let series: Vec<Series> = futures::future::try_join_all(fetches)
            .await?
            .into_iter()
            .flatten()
            .collect();

        let last_refresh = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        let options = self.config.pivot_options().with_meta(CubeMeta {
            name: cube.name.clone(),
            description: cube.description.clone(),
            last_refresh: last_refresh.clone(),
        });

        let table = pivot(cube.name.clone(), &series, &options)?;
        let rows = self.writer.write_table(&table)?;

        tracing::info!(
            "Loaded cube '{}': {} metrics, {} series, {} rows",
            cube.name,
            metrics.len(),
            series.len(),
            rows
        );

        Ok(CubeReport {
            name: cube.name.clone(),
            series: series.len(),
            rows,
            label_columns: table.columns.label_columns.len(),
            metric_columns: table.columns.metric_columns.len(),
            metrics,
            last_refresh,
        })
    }

    /// Load every cube concurrently. One result per cube, in input order.
    /// A cube repeating an earlier cube's name is not loaded.
    pub async fn load_all(&self, cubes: &[Cube]) -> Vec<Result<CubeReport, LoadError>> {
        self.load_all_at(cubes, Utc::now()).await
    }

    pub async fn load_all_at(
        &self,
        cubes: &[Cube],
        now: DateTime<Utc>,
    ) -> Vec<Result<CubeReport, LoadError>> {
        let mut names = FxHashSet::default();
        let loads = cubes.iter().map(|cube| {
            let first = names.insert(cube.name.as_str());
            async move {
                if !first {
                    tracing::warn!("Skipping cube '{}': name already loaded", cube.name);
                    return Err(LoadError::DuplicateCube(cube.name.clone()));
                }
                self.load_cube_at(cube, now).await
            }
        });
        let loads: Vec<_> = loads.collect();

        futures::future::join_all(loads).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Pivot error: {0}")]
    Pivot(#[from] PivotError),

    #[error("Write error: {0}")]
    Write(#[from] StorageError),

    #[error("Invalid metric pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Cube '{0}' appears more than once")]
    DuplicateCube(String),
}
