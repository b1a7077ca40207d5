//! Evaluation API over HTTP
//!
//! GETs with a per-request timeout, wrapped in exponential backoff.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::retry::{retry_with_backoff, RetryPolicy};
use super::source::{EvaluationSource, RawEvaluation};
use crate::dimensions::{DimensionCatalog, DimensionInfo, PerspectiveCatalog, PerspectiveInfo};
use crate::error::{EngineError, EngineResult, FetchError, FetchErrorKind};

const DIMENSIONS_PATH: &str = "evaluation-dimensions";
const PERSPECTIVES_PATH: &str = "cultural-perspectives";

/// The API sometimes wraps payloads in `{"data": ...}`
#[derive(Deserialize)]
#[serde(untagged)]
enum Payload<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Payload<T> {
    fn into_inner(self) -> T {
        match self {
            Payload::Wrapped { data } => data,
            Payload::Bare(value) => value,
        }
    }
}

pub struct HttpEvaluationSource {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
    api_token: Option<String>,
}

impl HttpEvaluationSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> EngineResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vulca-engine/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EngineError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url: base_url.into(), retry, api_token: None })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = self.url(path);
        let payload: Payload<T> = retry_with_backoff(&self.retry, || self.get_once(&url)).await?;
        Ok(payload.into_inner())
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        debug!("GET {}", url);

        let mut request = self.client.get(url);
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| classify(&e, url))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status.as_u16(), url, body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::new(FetchErrorKind::Decode, url, e.to_string()))
    }
}

fn classify(err: &reqwest::Error, url: &str) -> FetchError {
    if let Some(status) = err.status() {
        return FetchError::from_status(status.as_u16(), url, err.to_string());
    }
    let kind = if err.is_timeout() {
        FetchErrorKind::Timeout
    } else if err.is_decode() {
        FetchErrorKind::Decode
    } else {
        FetchErrorKind::Offline
    };
    FetchError::new(kind, url, err.to_string())
}

#[async_trait]
impl EvaluationSource for HttpEvaluationSource {
    async fn fetch_dimension_catalog(&self) -> Result<DimensionCatalog, FetchError> {
        let entries: Vec<DimensionInfo> = self.get_json(DIMENSIONS_PATH).await?;
        Ok(DimensionCatalog { entries })
    }

    async fn fetch_perspective_catalog(&self) -> Result<PerspectiveCatalog, FetchError> {
        let entries: Vec<PerspectiveInfo> = self.get_json(PERSPECTIVES_PATH).await?;
        Ok(PerspectiveCatalog { entries })
    }

    async fn fetch_evaluation(&self, subject_id: &str) -> Result<RawEvaluation, FetchError> {
        let path = format!("models/{}/evaluation", urlencoding::encode(subject_id));
        self.get_json(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let source = HttpEvaluationSource::new("http://localhost:8001/api/v1/", Duration::from_secs(5), RetryPolicy::default())
            .unwrap();
        assert_eq!(source.url("/evaluation-dimensions"), "http://localhost:8001/api/v1/evaluation-dimensions");
    }

    #[test]
    fn test_payload_accepts_wrapped_and_bare() {
        let wrapped: Payload<Vec<u32>> = serde_json::from_str(r#"{"data": [1, 2]}"#).unwrap();
        let bare: Payload<Vec<u32>> = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(wrapped.into_inner(), bare.into_inner());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_offline() {
        let source = HttpEvaluationSource::new("http://127.0.0.1:9", Duration::from_millis(500), RetryPolicy::no_retry())
            .unwrap();
        let err = source.fetch_dimension_catalog().await.unwrap_err();
        assert!(err.is_offline(), "{:?}", err);
        assert_eq!(err.retries, 0);
    }
}
