use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which extraction tier produced a section, in decreasing order of
/// structural trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    AlwaysInclude,
    Conditional,
    HeadingCrawl,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlwaysInclude => "always-include",
            Self::Conditional => "conditional",
            Self::HeadingCrawl => "heading-crawl",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExtractionMethod {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always-include" => Ok(Self::AlwaysInclude),
            "conditional" => Ok(Self::Conditional),
            "heading-crawl" => Ok(Self::HeadingCrawl),
            _ => Err(anyhow::anyhow!("Unknown extraction method: {}", s)),
        }
    }
}

/// A scored, bounded excerpt of page text with provenance metadata.
/// Created during one extraction pass and discarded after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub method: ExtractionMethod,
    pub selector: Option<String>,
    pub label: Option<String>,
    /// Heading text, for heading-crawled sections
    pub heading: Option<String>,
    /// Priority tag carried from the selector rule ("critical")
    pub priority: Option<String>,
    /// Relevance score, clamped to the config's max_score
    pub score: f64,
    /// Visible text, truncated to TEXT_LIMIT chars
    pub text: String,
    /// Serialized markup, truncated to HTML_LIMIT chars
    pub html: String,
}

impl Section {
    /// Max chars of visible text retained per section.
    pub const TEXT_LIMIT: usize = 3000;
    /// Max chars of raw markup retained per section.
    pub const HTML_LIMIT: usize = 5000;

    /// Label used when rendering the section into a payload block:
    /// label, else selector, else heading, else "Unknown".
    pub fn display_label(&self) -> &str {
        self.label
            .as_deref()
            .or(self.selector.as_deref())
            .or(self.heading.as_deref())
            .unwrap_or("Unknown")
    }

}

/// Output of the budget selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionResult {
    /// Concatenated labeled blocks, trimmed
    pub focused_content: String,
    /// Sections actually appended, in append order
    pub selected: Vec<Section>,
    /// Sum of included section text lengths; always < the target budget
    pub total_chars: usize,
}

/// Structured payload returned by the scoring service.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ScoredAnalysis {
    pub extracted: ExtractedProduct,
    pub score: SustainabilityScore,
}

/// What the scoring service extracts from the focused content.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExtractedProduct {
    pub materials: Vec<Material>,
    pub certifications: Vec<String>,
    pub durability_features: Vec<String>,
    pub packaging: Option<String>,
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Material {
    pub name: String,
    /// Fraction of the product, 0.0..=1.0 after normalization
    pub percentage: Option<f64>,
    /// Reference score from the material matrix (0-100), attached by the caller
    pub reference_score: Option<f64>,
    pub recyclable: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SustainabilityScore {
    /// Overall score, 0-100
    pub overall: f64,
    /// Tier letter (A-F)
    pub tier: String,
    pub breakdown: ScoreBreakdown,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ScoreBreakdown {
    pub materials: Option<f64>,
    pub certifications: Option<f64>,
    pub durability: Option<f64>,
    pub packaging: Option<f64>,
}

/// The externally-visible analysis artifact. The sole contract surface
/// the rendering layer depends on; no internal extraction state crosses
/// this boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub success: bool,

    // Detection metadata (present on failure too)
    pub site: String,
    pub site_id: Option<String>,
    pub product_id: Option<String>,
    pub url: String,

    // Analysis payload
    pub extracted: Option<ExtractedProduct>,
    pub score: Option<SustainabilityScore>,

    // Failure surface
    pub error: Option<String>,
    pub hint: Option<String>,

    // Pipeline metadata
    pub sections_found: usize,
    pub sections_used: usize,
    pub chars_processed: usize,
    pub tokens_used: Option<u32>,
    pub quota: Option<u32>,

    // Timing (seconds)
    pub extraction_secs: f64,
    pub analysis_secs: f64,
    pub total_secs: f64,

    pub timestamp: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn failure(
        site: impl Into<String>,
        site_id: Option<String>,
        product_id: Option<String>,
        url: impl Into<String>,
        error: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            success: false,
            site: site.into(),
            site_id,
            product_id,
            url: url.into(),
            extracted: None,
            score: None,
            error: Some(error.into()),
            hint,
            sections_found: 0,
            sections_used: 0,
            chars_processed: 0,
            tokens_used: None,
            quota: None,
            extraction_secs: 0.0,
            analysis_secs: 0.0,
            total_secs: 0.0,
            timestamp: Utc::now(),
        }
    }
}
