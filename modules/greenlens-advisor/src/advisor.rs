//! Orchestrates one analysis pass per page load: detect → extract →
//! select → score → result. The extraction half is synchronous and
//! CPU-bound; the only suspension point is the scoring-service call,
//! which runs single-flight under the state machine in [`crate::state`].

use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use scraper::Html;

use greenlens_core::file_config::FileConfig;
use greenlens_core::matrix::MaterialMatrix;
use greenlens_core::sites::SiteRegistry;
use greenlens_core::types::{AnalysisResult, ScoredAnalysis, SelectionResult};
use greenlens_extract::extractor::{ContentExtractor, ExtractorLimits};
use greenlens_extract::select::select_for_analysis;
use scoring_client::{Availability, ScoringRequest, ScoringService};

use crate::normalize::{enrich_materials, normalize_percentages};
use crate::state::AnalysisState;

const SCORING_PROMPT: &str = include_str!("../prompts/scoring.md");

/// Rows of the matrix included in the system prompt.
const PROMPT_MATRIX_ROWS: usize = 40;

struct Inner {
    state: AnalysisState,
    /// Bumped on every navigation; a pass that finishes under a different
    /// epoch than it started with is stale and its result is discarded.
    epoch: u64,
}

pub struct Advisor {
    registry: SiteRegistry,
    scorer: Arc<dyn ScoringService>,
    matrix: MaterialMatrix,
    file_config: FileConfig,
    model: String,
    system_prompt: String,
    inner: Mutex<Inner>,
}

impl Advisor {
    pub fn new(registry: SiteRegistry, scorer: Arc<dyn ScoringService>) -> Self {
        let matrix = MaterialMatrix::builtin();
        let system_prompt =
            SCORING_PROMPT.replace("{{matrix}}", &matrix.prompt_excerpt(PROMPT_MATRIX_ROWS));
        Self {
            registry,
            scorer,
            matrix,
            file_config: FileConfig::default(),
            model: "on-device-summarizer".to_string(),
            system_prompt,
            inner: Mutex::new(Inner {
                state: AnalysisState::Idle,
                epoch: 0,
            }),
        }
    }

    pub fn with_file_config(mut self, file_config: FileConfig) -> Self {
        self.file_config = file_config;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn state(&self) -> AnalysisState {
        self.inner.lock().expect("state lock").state.clone()
    }

    /// Navigation event: abandon any in-flight pass (its result will be
    /// discarded as stale on arrival) and allow a fresh one.
    pub fn on_navigation(&self) {
        let mut inner = self.inner.lock().expect("state lock");
        inner.epoch += 1;
        inner.state = AnalysisState::Idle;
        tracing::debug!(epoch = inner.epoch, "Navigation: state reset");
    }

    /// Analyze one page snapshot. Soft outcomes — no matching site config,
    /// zero sections after dedup, a pass already running or already run,
    /// a stale completion — all return `None`. Scoring-service failures are
    /// recovered into a result with `success: false`; callers only ever
    /// check `success`, nothing is thrown past this boundary.
    pub async fn analyze(&self, url: &str, html: &str) -> Option<AnalysisResult> {
        let epoch = {
            let mut inner = self.inner.lock().expect("state lock");
            if !inner.state.can_start() {
                tracing::debug!(state = %inner.state, "Analysis refused: pass not startable");
                return None;
            }
            inner.state = AnalysisState::Detecting;
            inner.epoch
        };
        let started = Instant::now();

        let Some(detection) = self.registry.detect(url) else {
            self.back_to_idle(epoch);
            return None;
        };
        let site_name = detection.config.name.clone();
        let site_id = detection.config.id.clone();
        let product_id = detection.product_id.clone();
        tracing::info!(site = %site_id, product = product_id.as_deref().unwrap_or("-"), "Product page detected");

        self.set_state(epoch, AnalysisState::Extracting);
        let limits = ExtractorLimits {
            heading_crawl_steps: self.file_config.selection.heading_crawl_steps,
            min_block_chars: self.file_config.selection.min_block_chars,
        };
        // Html is not Send; drop the parsed document before any await so
        // the analysis future stays spawnable.
        let sections = {
            let document = Html::parse_document(html);
            ContentExtractor::new(detection.config)
                .with_limits(limits)
                .extract_sections(&document)
        };

        if sections.is_empty() {
            tracing::warn!(site = %site_id, "No relevant sections found");
            self.back_to_idle(epoch);
            return None;
        }

        let selection = select_for_analysis(
            detection.config,
            &sections,
            self.file_config.selection.target_chars,
        );
        let extraction_secs = started.elapsed().as_secs_f64();
        tracing::info!(
            sections_found = sections.len(),
            sections_used = selection.selected.len(),
            chars = selection.total_chars,
            "Sections selected for scoring"
        );

        self.set_state(epoch, AnalysisState::Scoring);
        let scoring_started = Instant::now();
        let outcome = self.run_scoring(&selection).await;
        let analysis_secs = scoring_started.elapsed().as_secs_f64();

        // Commit under the lock; a navigation during the await makes this
        // pass stale and its result must not surface.
        let mut inner = self.inner.lock().expect("state lock");
        if inner.epoch != epoch {
            tracing::info!(site = %site_id, "Discarding stale analysis result");
            return None;
        }

        let result = match outcome {
            Ok(scoring) => {
                tracing::info!(
                    score = scoring.analysis.score.overall,
                    tier = %scoring.analysis.score.tier,
                    total_secs = started.elapsed().as_secs_f64(),
                    "Analysis complete"
                );
                AnalysisResult {
                    success: true,
                    site: site_name,
                    site_id: Some(site_id),
                    product_id,
                    url: url.to_string(),
                    extracted: Some(scoring.analysis.extracted),
                    score: Some(scoring.analysis.score),
                    error: None,
                    hint: None,
                    sections_found: sections.len(),
                    sections_used: selection.selected.len(),
                    chars_processed: selection.total_chars,
                    tokens_used: Some(scoring.tokens_used),
                    quota: Some(scoring.quota),
                    extraction_secs,
                    analysis_secs,
                    total_secs: started.elapsed().as_secs_f64(),
                    timestamp: Utc::now(),
                }
            }
            Err(failure) => {
                tracing::error!(site = %site_id, error = %failure.error, "Analysis failed");
                let mut result = AnalysisResult::failure(
                    site_name,
                    Some(site_id),
                    product_id,
                    url,
                    failure.error,
                    failure.hint,
                );
                result.sections_found = sections.len();
                result.sections_used = selection.selected.len();
                result.chars_processed = selection.total_chars;
                result.extraction_secs = extraction_secs;
                result.analysis_secs = analysis_secs;
                result.total_secs = started.elapsed().as_secs_f64();
                result
            }
        };

        inner.state = if result.success {
            AnalysisState::Done(Box::new(result.clone()))
        } else {
            AnalysisState::Failed(result.error.clone().unwrap_or_default())
        };
        Some(result)
    }

    async fn run_scoring(&self, selection: &SelectionResult) -> Result<ScoringOutcome, Failure> {
        let report = self
            .scorer
            .availability()
            .await
            .map_err(|e| Failure::new(format!("Scoring service unavailable: {e}")))?;

        match report.status {
            Availability::Available => {}
            Availability::AfterDownload => {
                return Err(Failure::new("Scoring service not ready: after-download")
                    .with_hint("The model is still downloading; retry shortly"));
            }
            Availability::Unavailable => {
                return Err(Failure::new("Scoring service not available")
                    .with_hint("Configure SCORING_SERVICE_URL or enable the on-device model"));
            }
        }
        let quota = report.input_quota;

        let mut content = selection.focused_content.clone();
        let measured = self
            .scorer
            .measure_input(&content)
            .await
            .map_err(|e| Failure::new(format!("Quota measurement failed: {e}")))?;

        // Oversized payloads are trimmed, not fatal: keep a prefix sized by
        // the quota/measured ratio with a safety margin.
        if measured > quota {
            let ratio = quota as f64 / measured as f64 * self.file_config.quota.trim_margin;
            let keep = (content.chars().count() as f64 * ratio).floor() as usize;
            tracing::warn!(measured, quota, keep, "Payload exceeds quota, trimming");
            content = content.chars().take(keep).collect();
        }

        let request = ScoringRequest::new(&self.model, &self.system_prompt, content)
            .with_schema::<ScoredAnalysis>();
        let response = self
            .scorer
            .generate(&request)
            .await
            .map_err(|e| Failure::new(format!("Scoring call failed: {e}")))?;

        let mut analysis: ScoredAnalysis =
            serde_json::from_value(response.output).map_err(|e| {
                Failure::new(format!("Unparseable scoring output: {e}"))
                    .with_hint("The service returned JSON that does not match the expected schema")
            })?;

        normalize_percentages(&mut analysis.extracted.materials);
        enrich_materials(&mut analysis.extracted.materials, &self.matrix);

        Ok(ScoringOutcome {
            analysis,
            tokens_used: measured,
            quota,
        })
    }

    /// Write a transition for the pass that started under `epoch`. A
    /// navigation bumps the epoch, so writes from a superseded pass no-op
    /// instead of clobbering the reset state.
    fn set_state(&self, epoch: u64, state: AnalysisState) {
        let mut inner = self.inner.lock().expect("state lock");
        if inner.epoch == epoch {
            inner.state = state;
        }
    }

    fn back_to_idle(&self, epoch: u64) {
        self.set_state(epoch, AnalysisState::Idle);
    }
}

struct ScoringOutcome {
    analysis: ScoredAnalysis,
    tokens_used: u32,
    quota: u32,
}

struct Failure {
    error: String,
    hint: Option<String>,
}

impl Failure {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
