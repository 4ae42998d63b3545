//! Three-tier section extraction over a parsed document.
//!
//! Tier 1 trusts site-specific structural selectors outright, tier 2 adds
//! selectors too ambiguous to always trust (keyword-gated), tier 3 is a
//! structure-agnostic heading crawl that catches content the site config
//! did not anticipate. Tiers run in that fixed order and their outputs are
//! concatenated before deduplication.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use greenlens_core::sites::{CompiledSelectorRule, CompiledSiteConfig};
use greenlens_core::types::{ExtractionMethod, Section};

use crate::dedupe::dedupe_sections;
use crate::matcher::{has_any_keyword, has_any_pattern, keyword_bonus, pattern_bonus};

static HEADING_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"h1, h2, h3, h4, h5, h6, [role="heading"]"#).expect("valid selector")
});

/// Base score for heading-crawled sections; tiers 1-2 take theirs from the
/// selector rule.
const HEADING_BASE_SCORE: f64 = 0.6;

/// Tunables for the heading-crawl tier.
#[derive(Debug, Clone, Copy)]
pub struct ExtractorLimits {
    /// Forward siblings visited per heading before giving up
    pub heading_crawl_steps: usize,
    /// Minimum accumulated block length; shorter blocks are discarded
    pub min_block_chars: usize,
}

impl Default for ExtractorLimits {
    fn default() -> Self {
        Self {
            heading_crawl_steps: 10,
            min_block_chars: 100,
        }
    }
}

/// Extracts scored candidate sections from one page, driven by one site
/// config. Read-only over the document; re-entrant for distinct documents.
pub struct ContentExtractor<'a> {
    config: &'a CompiledSiteConfig,
    limits: ExtractorLimits,
}

impl<'a> ContentExtractor<'a> {
    pub fn new(config: &'a CompiledSiteConfig) -> Self {
        Self {
            config,
            limits: ExtractorLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ExtractorLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Full extraction pass: all three tiers, deduplicated, ranked.
    pub fn extract_sections(&self, document: &Html) -> Vec<Section> {
        let mut sections = Vec::new();
        sections.extend(self.always_include_sections(document));
        sections.extend(self.conditional_sections(document));
        sections.extend(self.heading_crawl_sections(document));

        let unique = dedupe_sections(sections);
        let ranked = rank_sections(unique);

        tracing::debug!(
            site = %self.config.id,
            sections = ranked.len(),
            "Extraction pass complete"
        );
        ranked
    }

    /// Tier 1: presence alone qualifies inclusion; the structural selector
    /// is trusted as a relevance signal.
    fn always_include_sections(&self, document: &Html) -> Vec<Section> {
        let mut sections = Vec::new();
        for rule in &self.config.always_include {
            for element in document.select(&rule.parsed) {
                let text = element_text(&element);
                if text.is_empty() {
                    continue;
                }
                sections.push(self.build_section(
                    ExtractionMethod::AlwaysInclude,
                    rule,
                    &element,
                    text,
                ));
            }
        }
        sections
    }

    /// Tier 2: same scoring as tier 1; keyword-gated when the rule asks.
    fn conditional_sections(&self, document: &Html) -> Vec<Section> {
        let mut sections = Vec::new();
        for rule in &self.config.conditional_include {
            for element in document.select(&rule.parsed) {
                let text = element_text(&element);
                if text.is_empty() {
                    continue;
                }
                if rule.requires_keywords
                    && !has_any_keyword(&text, &self.config.keywords)
                    && !has_any_pattern(&text, &self.config.patterns)
                {
                    continue;
                }
                sections.push(self.build_section(
                    ExtractionMethod::Conditional,
                    rule,
                    &element,
                    text,
                ));
            }
        }
        sections
    }

    /// Tier 3: for each heading whose own text matches a keyword or
    /// pattern, accumulate up to N following element siblings (stopping at
    /// the next heading) into one block. Blocks under the minimum length
    /// carry too little signal and are dropped.
    fn heading_crawl_sections(&self, document: &Html) -> Vec<Section> {
        let mut sections = Vec::new();

        for heading in document.select(&HEADING_SELECTOR) {
            let heading_text = element_text(&heading);
            if heading_text.is_empty() {
                continue;
            }
            if !has_any_keyword(&heading_text, &self.config.keywords)
                && !has_any_pattern(&heading_text, &self.config.patterns)
            {
                continue;
            }

            let mut block_text = heading_text.clone();
            let mut steps = 0;

            for node in heading.next_siblings() {
                if steps >= self.limits.heading_crawl_steps {
                    break;
                }
                let Some(element) = ElementRef::wrap(node) else {
                    continue;
                };
                if is_heading(&element) {
                    break;
                }
                let text = element_text(&element);
                if !text.is_empty() {
                    block_text.push('\n');
                    block_text.push_str(&text);
                }
                steps += 1;
            }

            if block_text.chars().count() < self.limits.min_block_chars {
                continue;
            }

            let score = self.clamp_score(
                HEADING_BASE_SCORE
                    + pattern_bonus(
                        &block_text,
                        &self.config.patterns,
                        self.config.scoring.pattern_match_bonus,
                    )
                    + keyword_bonus(
                        &block_text,
                        &self.config.keywords,
                        self.config.scoring.keyword_family_bonus,
                    ),
            );

            sections.push(Section {
                method: ExtractionMethod::HeadingCrawl,
                selector: None,
                label: None,
                heading: Some(heading_text),
                priority: None,
                score,
                text: truncate_chars(&block_text, Section::TEXT_LIMIT),
                html: truncate_chars(&heading.html(), Section::HTML_LIMIT),
            });
        }
        sections
    }

    fn build_section(
        &self,
        method: ExtractionMethod,
        rule: &CompiledSelectorRule,
        element: &ElementRef,
        text: String,
    ) -> Section {
        let score = self.clamp_score(
            rule.base_score
                + pattern_bonus(
                    &text,
                    &self.config.patterns,
                    self.config.scoring.pattern_match_bonus,
                )
                + keyword_bonus(
                    &text,
                    &self.config.keywords,
                    self.config.scoring.keyword_family_bonus,
                ),
        );

        Section {
            method,
            selector: Some(rule.selector.clone()),
            label: rule.label.clone(),
            heading: None,
            priority: rule.priority.clone(),
            score,
            text: truncate_chars(&text, Section::TEXT_LIMIT),
            html: truncate_chars(&element.html(), Section::HTML_LIMIT),
        }
    }

    fn clamp_score(&self, score: f64) -> f64 {
        score.clamp(0.0, self.config.scoring.max_score)
    }
}

/// Total ordering by descending score. Stable sort: ties keep input order.
/// Scores are pre-computed during extraction; no rescoring happens here.
pub fn rank_sections(mut sections: Vec<Section>) -> Vec<Section> {
    sections.sort_by(|a, b| b.score.total_cmp(&a.score));
    sections
}

/// Visible text of an element with whitespace runs collapsed.
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_heading(element: &ElementRef) -> bool {
    matches!(
        element.value().name(),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
    ) || element.value().attr("role") == Some("heading")
}

/// Truncate to at most `max` chars on a char boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
