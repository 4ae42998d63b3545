//! Client contract for the constrained text-generation service that scores
//! focused product content. The service exposes a character/token quota the
//! caller must respect; this crate only adapts the wire contract, the quota
//! handling itself lives with the caller.

pub mod error;
pub mod http;
pub mod mock;

pub use error::{Result, ScoringError};
pub use http::HttpScoringClient;
pub use mock::MockScoringClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Readiness of the scoring backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Availability {
    Available,
    AfterDownload,
    Unavailable,
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::AfterDownload => write!(f, "after-download"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Availability plus the input quota the service will enforce.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub status: Availability,
    pub input_quota: u32,
}

/// One scoring call: system context, user content, and the JSON schema the
/// structured output must satisfy.
#[derive(Debug, Clone, Serialize)]
pub struct ScoringRequest {
    pub model: String,
    pub system: String,
    pub content: String,
    pub output_schema: serde_json::Value,
}

impl ScoringRequest {
    pub fn new(
        model: impl Into<String>,
        system: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            content: content.into(),
            output_schema: serde_json::Value::Null,
        }
    }

    pub fn with_schema<T: schemars::JsonSchema>(mut self) -> Self {
        self.output_schema = serde_json::to_value(schemars::schema_for!(T))
            .unwrap_or(serde_json::Value::Null);
        self
    }
}

/// Raw structured output plus usage metadata. The caller deserializes
/// `output` into its own types and recovers parse failures locally.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringResponse {
    pub output: serde_json::Value,
    pub tokens_used: u32,
    pub quota: u32,
}

/// The scoring-service contract. One implementation talks HTTP, the mock
/// serves tests and offline runs. No cancellation primitive exists on the
/// wire; callers discard stale results instead.
#[async_trait]
pub trait ScoringService: Send + Sync {
    async fn availability(&self) -> Result<AvailabilityReport>;

    /// Measure how much of the quota `content` would consume.
    async fn measure_input(&self, content: &str) -> Result<u32>;

    async fn generate(&self, request: &ScoringRequest) -> Result<ScoringResponse>;
}
