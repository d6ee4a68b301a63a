//! HTTP client for a secondary extraction service.

use std::time::Duration;

use async_trait::async_trait;
use payslip_extract::{FallbackError, FallbackHook, FallbackRecord};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Shape of the record the service is asked to return.
pub const SCHEMA_DESCRIPTION: &str = r#"Return one JSON object (or null) with any of these fields; omit what the text does not state:
{
  "company": { "legal_name": string, "tax_id": string },
  "worker": { "full_name": string, "national_id": string },
  "period": { "start": "YYYY-MM-DD", "end": "YYYY-MM-DD", "days": integer },
  "document_date": "YYYY-MM-DD",
  "earning_items": [ { "concept": string, "raw_concept": string, "amount": "1234.56" } ],
  "deduction_items": [ { "concept": string, "raw_concept": string, "amount": "1234.56" } ],
  "employer_contributions": [ { "concept": string, "base": "1234.56", "rate": "23.60", "amount": "1234.56" } ],
  "totals": { "gross": "1234.56", "deductions": "1234.56", "net": "1234.56" }
}
Amounts are decimal strings with a dot separator and no thousands grouping."#;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ClientError> for FallbackError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(e) if e.is_timeout() => FallbackError::Timeout,
            ClientError::Json(e) => FallbackError::InvalidResponse(e.to_string()),
            other => FallbackError::Unavailable(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ExtractRequest<'a> {
    text: &'a str,
    schema: &'static str,
}

/// Client for a service exposing `POST {base_url}/extract`.
pub struct FallbackClient {
    client: reqwest::Client,
    base_url: String,
}

impl FallbackClient {
    /// `base_url` like `http://localhost:8080`; a trailing slash is dropped.
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Ask the service for a partial record. `204` or a `null` body means
    /// the service found nothing.
    pub async fn request(&self, text: &str) -> Result<Option<FallbackRecord>, ClientError> {
        let url = format!("{}/extract", self.base_url);

        info!(url = %url, chars = text.len(), "requesting fallback extraction");
        let resp = self
            .client
            .post(&url)
            .json(&ExtractRequest {
                text,
                schema: SCHEMA_DESCRIPTION,
            })
            .send()
            .await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let record = parse_response(&body)?;
        info!(found = record.is_some(), "fallback extraction complete");
        Ok(record)
    }
}

#[async_trait]
impl FallbackHook for FallbackClient {
    async fn extract_fallback(&self, text: &str) -> Result<Option<FallbackRecord>, FallbackError> {
        Ok(self.request(text).await?)
    }
}

fn parse_response(body: &str) -> Result<Option<FallbackRecord>, ClientError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    Ok(serde_json::from_str(body)?)
}
