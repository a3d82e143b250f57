use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{parse_error_message, ApiError};
use crate::headers::build_headers;
use crate::payload::DocumentRef;
use crate::retry::{is_retryable_http_error, JobState, POLL_INTERVAL, POLL_MAX_ATTEMPTS};
use crate::transport::{await_or_cancel, CancellationSignal};
use crate::url::api_endpoint;

/// One ticker search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerMatch {
    #[serde(deserialize_with = "string_or_number")]
    pub cik_str: String,
    pub ticker: String,
    pub title: String,
}

/// One 10-K filing available for a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filing {
    pub accession_number: String,
    pub filing_date: String,
    pub primary_document: String,
}

/// Legacy non-streaming job families, each with its own status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Comparison,
    SectionAnalysis,
    Chatbot,
}

impl JobKind {
    pub fn status_path(&self) -> &'static str {
        match self {
            Self::Comparison => "get_comparison_status",
            Self::SectionAnalysis => "get_10k_analysis_status",
            Self::Chatbot => "get_chatbot_status",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProcessedResponse {
    #[serde(default)]
    processed: bool,
}

/// Request/response client for the auxiliary lookups the streaming core consumes.
#[derive(Debug, Clone)]
pub struct LookupClient {
    http: Client,
    config: ApiConfig,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl LookupClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ApiError::from)?;
        Ok(Self {
            http,
            config,
            poll_attempts: POLL_MAX_ATTEMPTS,
            poll_interval: POLL_INTERVAL,
        })
    }

    /// Override the bounded poll policy (defaults: 150 attempts, 2s apart).
    pub fn with_poll_policy(mut self, attempts: u32, interval: Duration) -> Self {
        self.poll_attempts = attempts.max(1);
        self.poll_interval = interval;
        self
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn build_headers(&self, id_token: Option<&str>) -> Result<HeaderMap, ApiError> {
        let headers = build_headers(&self.config, id_token, None);
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ApiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value)
                    .map_err(|_| ApiError::InvalidHeader(format!("invalid header value for {key}")))?,
            );
        }
        Ok(out)
    }

    pub fn build_get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        id_token: Option<&str>,
    ) -> Result<RequestBuilder, ApiError> {
        let headers = self.build_headers(id_token)?;
        Ok(self
            .http
            .get(api_endpoint(&self.config.api_url, path))
            .headers(headers)
            .query(query))
    }

    async fn get_json<T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        id_token: Option<&str>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        debug!(path, "lookup request");
        let response = self.build_get(path, query, id_token)?.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status(status, parse_error_message(status, &body)));
        }

        Ok(response.json::<T>().await?)
    }

    pub async fn search_tickers(
        &self,
        query: &str,
        id_token: Option<&str>,
    ) -> Result<Vec<TickerMatch>, ApiError> {
        self.get_json("search_tickers", &[("q", query)], id_token)
            .await
    }

    pub async fn available_filings(
        &self,
        cik: &str,
        id_token: Option<&str>,
    ) -> Result<Vec<Filing>, ApiError> {
        self.get_json("get_available_10k_filings", &[("cik", cik)], id_token)
            .await
    }

    /// Whether the backend already holds processed sections for this filing.
    pub async fn check_document_processed(
        &self,
        document: &DocumentRef,
        id_token: Option<&str>,
    ) -> Result<bool, ApiError> {
        let response: ProcessedResponse = self
            .get_json(
                "check_document_processed",
                &[
                    ("cik", document.cik.as_str()),
                    ("accession", document.accession.as_str()),
                    ("primaryDoc", document.primary_doc.as_str()),
                ],
                id_token,
            )
            .await?;
        Ok(response.processed)
    }

    pub async fn job_status(
        &self,
        kind: JobKind,
        job_id: &str,
        id_token: Option<&str>,
    ) -> Result<Value, ApiError> {
        self.get_json(kind.status_path(), &[("jobId", job_id)], id_token)
            .await
    }

    /// Poll a legacy job until it reaches a terminal status or the attempt budget runs out.
    ///
    /// Transient failures consume an attempt and are retried; anything else fails fast.
    pub async fn poll_job(
        &self,
        kind: JobKind,
        job_id: &str,
        id_token: Option<&str>,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Value, ApiError> {
        let mut last_status = None;

        for attempt in 1..=self.poll_attempts {
            match await_or_cancel(self.job_status(kind, job_id, id_token), cancellation).await? {
                Ok(body) => {
                    let status = body
                        .get("status")
                        .and_then(|value| value.as_str())
                        .unwrap_or("pending")
                        .to_string();
                    if JobState::parse(&status).is_terminal() {
                        return Ok(body);
                    }
                    last_status = Some(status);
                }
                Err(ApiError::Status(status, message))
                    if is_retryable_http_error(status.as_u16(), &message) =>
                {
                    warn!(attempt, %status, "transient job status failure");
                    last_status = Some(format!("HTTP {}", status.as_u16()));
                }
                Err(ApiError::Request(error)) if error.is_timeout() || error.is_connect() => {
                    warn!(attempt, %error, "job status request failed");
                    last_status = Some(error.to_string());
                }
                Err(error) => return Err(error),
            }

            if attempt < self.poll_attempts {
                await_or_cancel(tokio::time::sleep(self.poll_interval), cancellation).await?;
            }
        }

        Err(ApiError::PollExhausted {
            attempts: self.poll_attempts,
            last_status,
        })
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(value),
        Value::Number(value) => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
