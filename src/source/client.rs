use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::config::SourceConfig;
use super::model::{ApiResponse, QueryData};
use super::{MetricSource, SourceError};
use crate::pivot::{Series, METRIC_NAME_LABEL};

/// Client for the Prometheus HTTP API
#[derive(Debug, Clone)]
pub struct PromClient {
    http_client: reqwest::Client,
    base_url: String,
    step: Duration,
    query_timeout: Duration,
}

impl PromClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SourceError> {
        let defaults = SourceConfig::default();
        Self::build(base_url.into(), defaults.step(), defaults.query_timeout())
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceError> {
        Self::build(config.url(), config.step(), config.query_timeout())
    }

    fn build(base_url: String, step: Duration, query_timeout: Duration) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            step,
            query_timeout,
        })
    }

    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(params)
            .timeout(self.query_timeout)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let parsed: ApiResponse<T> = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(SourceError::Remote(format!("{}: {}", status, body)));
            }
            Err(e) => return Err(SourceError::Deserialization(e.to_string())),
        };

        // Warnings never fail the call
        for warning in &parsed.warnings {
            tracing::warn!("Prometheus warning for {}: {}", path, warning);
        }

        if parsed.status != "success" {
            return Err(SourceError::Api {
                error_type: parsed.error_type.unwrap_or_default(),
                error: parsed.error.unwrap_or_default(),
            });
        }

        parsed
            .data
            .ok_or_else(|| SourceError::Deserialization("response has no data".to_string()))
    }
}

fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Prometheus takes float seconds ("1.5") or integer units ("1s500ms"), never "1.5s"
fn duration_param(d: Duration) -> String {
    d.as_secs_f64().to_string()
}

impl MetricSource for PromClient {
    async fn fetch_samples(
        &self,
        metric: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Series>, SourceError> {
        let start = format_time(start);
        let end = format_time(end);
        let step = duration_param(self.step);
        let timeout = duration_param(self.query_timeout);

        let data: QueryData = self
            .get(
                "/api/v1/query_range",
                &[
                    ("query", metric),
                    ("start", start.as_str()),
                    ("end", end.as_str()),
                    ("step", step.as_str()),
                    ("timeout", timeout.as_str()),
                ],
            )
            .await?;

        let series = data.into_series()?;
        tracing::debug!("Fetched {} series for {}", series.len(), metric);
        Ok(series)
    }

    async fn list_metric_names(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>, SourceError> {
        let start = format_time(start);
        let end = format_time(end);
        let path = format!("/api/v1/label/{}/values", METRIC_NAME_LABEL);

        self.get(&path, &[("start", start.as_str()), ("end", end.as_str())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn spawn_prometheus(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        (start, start + chrono::Duration::hours(1))
    }

    #[tokio::test]
    async fn test_fetch_samples() {
        let router = Router::new().route(
            "/api/v1/query_range",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("step").map(String::as_str), Some("60"));
                let metric = params.get("query").cloned().unwrap_or_default();
                Json(serde_json::json!({
                    "status": "success",
                    "data": {
                        "resultType": "matrix",
                        "result": [{
                            "metric": {"__name__": metric, "instance": "a:9100"},
                            "values": [[1700000000, "1.5"], [1700000060, "2.5"]]
                        }]
                    }
                }))
            }),
        );
        let url = spawn_prometheus(router).await;
        let client = PromClient::new(url).unwrap();
        let (start, end) = window();

        let series = client
            .fetch_samples("node_memory_Cached_bytes", start, end)
            .await
            .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].metric, "node_memory_Cached_bytes");
        assert_eq!(series[0].points.len(), 2);
        assert_eq!(series[0].points[1].timestamp, 1_700_000_060_000);
        assert_eq!(series[0].points[1].value, 2.5);
    }

    #[tokio::test]
    async fn test_fractional_step_and_timeout() {
        let seen = Arc::new(Mutex::new(HashMap::new()));
        let recorded = Arc::clone(&seen);
        let router = Router::new().route(
            "/api/v1/query_range",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let recorded = Arc::clone(&recorded);
                async move {
                    *recorded.lock() = params;
                    Json(serde_json::json!({
                        "status": "success",
                        "data": {"resultType": "matrix", "result": []}
                    }))
                }
            }),
        );
        let url = spawn_prometheus(router).await;
        let client = PromClient::new(url)
            .unwrap()
            .with_step(Duration::from_millis(1500))
            .with_query_timeout(Duration::from_millis(2500));
        let (start, end) = window();

        client.fetch_samples("up", start, end).await.unwrap();

        let params = seen.lock();
        assert_eq!(params.get("step").map(String::as_str), Some("1.5"));
        assert_eq!(params.get("timeout").map(String::as_str), Some("2.5"));
    }

    #[tokio::test]
    async fn test_warnings_do_not_fail() {
        let router = Router::new().route(
            "/api/v1/query_range",
            get(|| async {
                Json(serde_json::json!({
                    "status": "success",
                    "warnings": ["query hit the sample limit"],
                    "data": {"resultType": "matrix", "result": []}
                }))
            }),
        );
        let url = spawn_prometheus(router).await;
        let client = PromClient::new(url).unwrap();
        let (start, end) = window();

        let series = client.fetch_samples("up", start, end).await.unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn test_api_error() {
        let router = Router::new().route(
            "/api/v1/query_range",
            get(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({
                        "status": "error",
                        "errorType": "bad_data",
                        "error": "parse error"
                    })),
                )
            }),
        );
        let url = spawn_prometheus(router).await;
        let client = PromClient::new(url).unwrap();
        let (start, end) = window();

        let result = client.fetch_samples("up{", start, end).await;
        assert!(matches!(
            result,
            Err(SourceError::Api { ref error_type, .. }) if error_type == "bad_data"
        ));
    }

    #[tokio::test]
    async fn test_non_json_error_is_remote() {
        let router = Router::new().route(
            "/api/v1/query_range",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded") }),
        );
        let url = spawn_prometheus(router).await;
        let client = PromClient::new(url).unwrap();
        let (start, end) = window();

        let result = client.fetch_samples("up", start, end).await;
        assert!(matches!(result, Err(SourceError::Remote(_))));
    }

    #[tokio::test]
    async fn test_list_metric_names() {
        let router = Router::new().route(
            "/api/v1/label/__name__/values",
            get(|| async {
                Json(serde_json::json!({
                    "status": "success",
                    "data": ["node_memory_Cached_bytes", "node_memory_MemFree_bytes", "up"]
                }))
            }),
        );
        let url = spawn_prometheus(router).await;
        let client = PromClient::new(url).unwrap();
        let (start, end) = window();

        let names = client.list_metric_names(start, end).await.unwrap();
        assert_eq!(names.len(), 3);
        assert_eq!(names[2], "up");
    }

    #[tokio::test]
    async fn test_unreachable_source() {
        let client = PromClient::new("http://127.0.0.1:1").unwrap();
        let (start, end) = window();

        let result = client.list_metric_names(start, end).await;
        assert!(matches!(result, Err(SourceError::Network(_))));
    }
}
