//! Prometheus HTTP API response model

use serde::Deserialize;
use std::collections::BTreeMap;

use super::SourceError;
use crate::pivot::{Point, Series};

/// Envelope shared by every Prometheus API response
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: Option<T>,
    #[serde(rename = "errorType")]
    pub error_type: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// `[<unix seconds>, "<value>"]`
pub type SamplePair = (f64, String);

/// Query result, keyed by `resultType`
#[derive(Debug, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum QueryData {
    Matrix(Vec<SampleStream>),
    Vector(Vec<InstantSample>),
    Scalar(SamplePair),
    String(SamplePair),
}

impl QueryData {
    pub fn result_type(&self) -> &'static str {
        match self {
            QueryData::Matrix(_) => "matrix",
            QueryData::Vector(_) => "vector",
            QueryData::Scalar(_) => "scalar",
            QueryData::String(_) => "string",
        }
    }

    /// Convert a range result into series. Any other result type is an error.
    pub fn into_series(self) -> Result<Vec<Series>, SourceError> {
        match self {
            QueryData::Matrix(streams) => streams.into_iter().map(SampleStream::into_series).collect(),
            other => Err(SourceError::UnexpectedResultType(
                other.result_type().to_string(),
            )),
        }
    }
}

/// One series of a range query result
#[derive(Debug, Deserialize)]
pub struct SampleStream {
    pub metric: BTreeMap<String, String>,
    #[serde(default)]
    pub values: Vec<SamplePair>,
}

impl SampleStream {
    pub fn into_series(self) -> Result<Series, SourceError> {
        let points = self
            .values
            .iter()
            .map(|(ts, value)| parse_sample(*ts, value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Series::from_label_set(self.metric, points))
    }
}

/// One series of an instant query result
#[derive(Debug, Deserialize)]
pub struct InstantSample {
    pub metric: BTreeMap<String, String>,
    pub value: SamplePair,
}

/// Convert a Prometheus sample pair to a point with a millisecond timestamp
pub fn parse_sample(seconds: f64, value: &str) -> Result<Point, SourceError> {
    let value: f64 = value
        .parse()
        .map_err(|_| SourceError::InvalidSample(value.to_string()))?;
    let timestamp = (seconds * 1000.0).round() as i64;
    Ok(Point::new(timestamp, value))
}
