use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Result, ScoringError};
use crate::{Availability, AvailabilityReport, ScoringRequest, ScoringResponse, ScoringService};

/// HTTP implementation of the scoring contract. The request timeout bounds
/// a hung backend so the caller's single-flight slot is always released.
pub struct HttpScoringClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpScoringClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(ref token) = self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

#[derive(Debug, Deserialize)]
struct AvailabilityWire {
    status: Availability,
    #[serde(default)]
    input_quota: u32,
}

#[derive(Debug, Deserialize)]
struct MeasureWire {
    tokens: u32,
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(ScoringError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp)
}

#[async_trait]
impl ScoringService for HttpScoringClient {
    async fn availability(&self) -> Result<AvailabilityReport> {
        let resp = self
            .request(reqwest::Method::GET, "/v1/availability")
            .send()
            .await?;
        let wire: AvailabilityWire = check_status(resp).await?.json().await?;
        Ok(AvailabilityReport {
            status: wire.status,
            input_quota: wire.input_quota,
        })
    }

    async fn measure_input(&self, content: &str) -> Result<u32> {
        let resp = self
            .request(reqwest::Method::POST, "/v1/measure")
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?;
        let wire: MeasureWire = check_status(resp).await?.json().await?;
        Ok(wire.tokens)
    }

    async fn generate(&self, request: &ScoringRequest) -> Result<ScoringResponse> {
        tracing::debug!(
            model = %request.model,
            content_chars = request.content.len(),
            "Scoring request"
        );

        let resp = self
            .request(reqwest::Method::POST, "/v1/generate")
            .json(request)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            ScoringError::MalformedOutput(format!("{e}: {}", truncate(&body, 200)))
        })
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
