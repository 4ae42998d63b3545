//! In-memory scoring service for tests and offline runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, ScoringError};
use crate::{Availability, AvailabilityReport, ScoringRequest, ScoringResponse, ScoringService};

/// Canned-response implementation of [`ScoringService`]. Counts calls so
/// tests can assert single-flight behavior, and can delay responses to
/// exercise stale-result handling.
pub struct MockScoringClient {
    output: serde_json::Value,
    quota: u32,
    status: Availability,
    delay: Option<Duration>,
    fail_generate: Mutex<Option<ScoringError>>,
    generate_calls: AtomicUsize,
}

impl MockScoringClient {
    pub fn new(output: serde_json::Value) -> Self {
        Self {
            output,
            quota: 8192,
            status: Availability::Available,
            delay: None,
            fail_generate: Mutex::new(None),
            generate_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_quota(mut self, quota: u32) -> Self {
        self.quota = quota;
        self
    }

    pub fn with_status(mut self, status: Availability) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next `generate` call with the given error.
    pub fn failing(self, error: ScoringError) -> Self {
        *self.fail_generate.lock().expect("mock lock") = Some(error);
        self
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Chars/4 token estimate; the real service measures opaquely.
    fn estimate_tokens(content: &str) -> u32 {
        (content.chars().count() as u32).div_ceil(4)
    }
}

#[async_trait]
impl ScoringService for MockScoringClient {
    async fn availability(&self) -> Result<AvailabilityReport> {
        Ok(AvailabilityReport {
            status: self.status,
            input_quota: self.quota,
        })
    }

    async fn measure_input(&self, content: &str) -> Result<u32> {
        Ok(Self::estimate_tokens(content))
    }

    async fn generate(&self, request: &ScoringRequest) -> Result<ScoringResponse> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.fail_generate.lock().expect("mock lock").take() {
            return Err(error);
        }

        Ok(ScoringResponse {
            output: self.output.clone(),
            tokens_used: Self::estimate_tokens(&request.content),
            quota: self.quota,
        })
    }
}
