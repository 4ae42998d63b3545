//! Declarative per-site extraction rules and URL detection.
//!
//! Site configs arrive as JSON (camelCase wire shape), get validated and
//! compiled once at load, and are never mutated afterwards. A config that
//! fails validation is skipped with a warning; the rest of the registry
//! still loads.

use regex::{Regex, RegexBuilder};
use scraper::Selector;
use serde::Deserialize;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

const BUILTIN_SITES: &[(&str, &str)] = &[
    ("amazon", include_str!("../config/sites/amazon.json")),
    ("walmart", include_str!("../config/sites/walmart.json")),
];

// =============================================================================
// Wire shape (JSON)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub detection: DetectionSpec,
    pub extraction: ExtractionSpec,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSpec {
    pub url_patterns: Vec<UrlPattern>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlPattern {
    pub pattern: String,
    #[serde(default = "default_product_id_group")]
    pub product_id_group: usize,
}

fn default_product_id_group() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSpec {
    pub selectors: SelectorTiers,
    #[serde(default)]
    pub keywords: std::collections::HashMap<String, Vec<String>>,
    #[serde(default)]
    pub patterns: Vec<PatternRule>,
    #[serde(default)]
    pub scoring: ScoringLimits,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorTiers {
    #[serde(default)]
    pub always_include: Vec<SelectorRule>,
    #[serde(default)]
    pub conditional_include: Vec<SelectorRule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorRule {
    pub selector: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_base_score")]
    pub base_score: f64,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub requires_keywords: bool,
}

fn default_base_score() -> f64 {
    0.7
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRule {
    pub pattern: String,
    #[serde(default = "default_pattern_bonus")]
    pub bonus: f64,
}

fn default_pattern_bonus() -> f64 {
    0.05
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringLimits {
    #[serde(default = "default_max_score")]
    pub max_score: f64,
    /// Cap on the summed pattern bonus per section
    #[serde(default = "default_pattern_cap")]
    pub pattern_match_bonus: f64,
    /// Bonus per distinct keyword family matched
    #[serde(default = "default_family_bonus")]
    pub keyword_family_bonus: f64,
}

fn default_max_score() -> f64 {
    1.0
}
fn default_pattern_cap() -> f64 {
    0.10
}
fn default_family_bonus() -> f64 {
    0.05
}

impl Default for ScoringLimits {
    fn default() -> Self {
        Self {
            max_score: default_max_score(),
            pattern_match_bonus: default_pattern_cap(),
            keyword_family_bonus: default_family_bonus(),
        }
    }
}

// =============================================================================
// Compiled form
// =============================================================================

/// A site config after validation: regexes compiled (case-insensitive),
/// selectors parsed, keyword terms lowercased.
#[derive(Debug, Clone)]
pub struct CompiledSiteConfig {
    pub id: String,
    pub name: String,
    pub version: Option<String>,
    pub url_patterns: Vec<CompiledUrlPattern>,
    pub always_include: Vec<CompiledSelectorRule>,
    pub conditional_include: Vec<CompiledSelectorRule>,
    /// Family name → lowercased terms, sorted by family for determinism
    pub keywords: Vec<(String, Vec<String>)>,
    pub patterns: Vec<CompiledPattern>,
    pub scoring: ScoringLimits,
}

#[derive(Debug, Clone)]
pub struct CompiledUrlPattern {
    pub regex: Regex,
    pub product_id_group: usize,
}

#[derive(Debug, Clone)]
pub struct CompiledSelectorRule {
    pub selector: String,
    pub parsed: Selector,
    pub label: Option<String>,
    pub base_score: f64,
    pub priority: Option<String>,
    pub requires_keywords: bool,
}

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub regex: Regex,
    pub bonus: f64,
}

impl CompiledSiteConfig {
    pub fn compile(raw: SiteConfig) -> ConfigResult<Self> {
        let site = raw.id.clone();

        if raw.id.trim().is_empty() {
            return Err(ConfigError::MissingField {
                site: raw.name.clone(),
                field: "id".to_string(),
            });
        }
        if raw.detection.url_patterns.is_empty() {
            return Err(ConfigError::MissingField {
                site,
                field: "detection.urlPatterns".to_string(),
            });
        }

        let url_patterns = raw
            .detection
            .url_patterns
            .iter()
            .map(|p| {
                Ok(CompiledUrlPattern {
                    regex: compile_regex(&site, &p.pattern)?,
                    product_id_group: p.product_id_group,
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        let always_include = compile_selector_rules(&site, &raw.extraction.selectors.always_include)?;
        let conditional_include =
            compile_selector_rules(&site, &raw.extraction.selectors.conditional_include)?;

        let patterns = raw
            .extraction
            .patterns
            .iter()
            .map(|p| {
                Ok(CompiledPattern {
                    regex: compile_regex(&site, &p.pattern)?,
                    bonus: p.bonus,
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        let mut keywords: Vec<(String, Vec<String>)> = raw
            .extraction
            .keywords
            .into_iter()
            .map(|(family, terms)| {
                let terms = terms.iter().map(|t| t.to_lowercase()).collect();
                (family, terms)
            })
            .collect();
        keywords.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(Self {
            id: raw.id,
            name: raw.name,
            version: raw.version,
            url_patterns,
            always_include,
            conditional_include,
            keywords,
            patterns,
            scoring: raw.extraction.scoring,
        })
    }

    /// Selectors from the always-include tier tagged `critical`. The budget
    /// selector packs their sections ahead of all other ranked content.
    pub fn critical_selectors(&self) -> Vec<&str> {
        self.always_include
            .iter()
            .filter(|r| r.priority.as_deref() == Some("critical"))
            .map(|r| r.selector.as_str())
            .collect()
    }
}

fn compile_regex(site: &str, pattern: &str) -> ConfigResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| ConfigError::InvalidPattern {
            site: site.to_string(),
            pattern: pattern.to_string(),
            source,
        })
}

fn compile_selector_rules(
    site: &str,
    rules: &[SelectorRule],
) -> ConfigResult<Vec<CompiledSelectorRule>> {
    rules
        .iter()
        .map(|r| {
            let parsed =
                Selector::parse(&r.selector).map_err(|_| ConfigError::InvalidSelector {
                    site: site.to_string(),
                    selector: r.selector.clone(),
                })?;
            Ok(CompiledSelectorRule {
                selector: r.selector.clone(),
                parsed,
                label: r.label.clone(),
                base_score: r.base_score,
                priority: r.priority.clone(),
                requires_keywords: r.requires_keywords,
            })
        })
        .collect()
}

// =============================================================================
// Registry + detection
// =============================================================================

/// A detection hit: which site config matched the URL and the product id
/// captured from it.
#[derive(Debug, Clone)]
pub struct Detection<'a> {
    pub config: &'a CompiledSiteConfig,
    pub product_id: Option<String>,
    pub url: String,
}

/// Ordered collection of compiled site configs. Detection is
/// first-match-wins across configs in load order, then across a config's
/// pattern list, so declaration order governs disambiguation.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    configs: Vec<CompiledSiteConfig>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the embedded default site configs. Invalid or disabled configs
    /// are skipped; the registry itself always constructs.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, json) in BUILTIN_SITES {
            if let Err(e) = registry.load_json(json) {
                tracing::warn!(site = name, error = %e, "Skipping builtin site config");
            }
        }
        tracing::info!(sites = registry.configs.len(), "Site registry loaded");
        registry
    }

    /// Parse, validate, and register one JSON config. Disabled configs are
    /// accepted but not registered.
    pub fn load_json(&mut self, json: &str) -> ConfigResult<()> {
        let raw: SiteConfig = serde_json::from_str(json)?;
        if !raw.enabled {
            tracing::info!(site = %raw.id, "Skipped disabled site config");
            return Ok(());
        }
        let compiled = CompiledSiteConfig::compile(raw)?;
        tracing::info!(
            site = %compiled.id,
            version = compiled.version.as_deref().unwrap_or("-"),
            "Loaded site config"
        );
        self.configs.push(compiled);
        Ok(())
    }

    /// Load every `*.json` in a directory, after the builtins. Files that
    /// fail to parse or validate are skipped with a warning.
    pub fn load_dir(&mut self, dir: &Path) -> ConfigResult<()> {
        let mut entries: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        entries.sort();

        for path in entries {
            let json = std::fs::read_to_string(&path)?;
            if let Err(e) = self.load_json(&json) {
                tracing::warn!(path = %path.display(), error = %e, "Skipping site config");
            }
        }
        Ok(())
    }

    pub fn get(&self, site_id: &str) -> Option<&CompiledSiteConfig> {
        self.configs.iter().find(|c| c.id == site_id)
    }

    pub fn configs(&self) -> &[CompiledSiteConfig] {
        &self.configs
    }

    /// Match a URL against every config's pattern list. Returns the first
    /// hit or `None` — no match is a normal "nothing to do" outcome, not an
    /// error. Deterministic and side-effect free.
    pub fn detect(&self, url: &str) -> Option<Detection<'_>> {
        for config in &self.configs {
            for pattern in &config.url_patterns {
                if let Some(captures) = pattern.regex.captures(url) {
                    let product_id = captures
                        .get(pattern.product_id_group)
                        .map(|m| m.as_str().to_string());
                    return Some(Detection {
                        config,
                        product_id,
                        url: url.to_string(),
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(id: &str, pattern: &str) -> String {
        // Regex backslashes need a second round of escaping for JSON
        let pattern = pattern.replace('\\', "\\\\");
        format!(
            r##"{{
                "id": "{id}",
                "name": "Test Site",
                "enabled": true,
                "detection": {{ "urlPatterns": [ {{ "pattern": "{pattern}", "productIdGroup": 1 }} ] }},
                "extraction": {{
                    "selectors": {{
                        "alwaysInclude": [ {{ "selector": "#productTitle", "label": "Title", "baseScore": 0.9, "priority": "critical" }} ]
                    }},
                    "keywords": {{ "material": ["cotton", "wool"] }},
                    "patterns": [ {{ "pattern": "\\d+\\s*%", "bonus": 0.05 }} ]
                }}
            }}"##
        )
    }

    #[test]
    fn detects_amazon_product_id() {
        let registry = SiteRegistry::builtin();
        let detection = registry
            .detect("https://www.amazon.com/Some-Title/dp/B012345678/")
            .expect("amazon URL should match");
        assert_eq!(detection.product_id.as_deref(), Some("B012345678"));
        assert_eq!(detection.config.id, "amazon-global");
    }

    #[test]
    fn product_id_capture_is_exactly_ten_chars() {
        // A longer id tail still captures only the first ten characters
        let registry = SiteRegistry::builtin();
        let detection = registry
            .detect("https://www.amazon.com/dp/B0123456789XYZ")
            .unwrap();
        assert_eq!(detection.product_id.as_deref(), Some("B012345678"));
    }

    #[test]
    fn detection_is_deterministic() {
        let registry = SiteRegistry::builtin();
        let url = "https://www.amazon.com/dp/B000000001";
        let first = registry.detect(url).map(|d| {
            (
                d.config.id.clone(),
                d.product_id.clone(),
            )
        });
        for _ in 0..3 {
            let again = registry.detect(url).map(|d| {
                (
                    d.config.id.clone(),
                    d.product_id.clone(),
                )
            });
            assert_eq!(first, again);
        }
    }

    #[test]
    fn no_match_is_none() {
        let registry = SiteRegistry::builtin();
        assert!(registry.detect("https://example.com/product/123").is_none());
    }

    #[test]
    fn first_registered_config_wins() {
        let mut registry = SiteRegistry::new();
        registry
            .load_json(&test_config("site-a", "example\\.com/p/(\\w+)"))
            .unwrap();
        registry
            .load_json(&test_config("site-b", "example\\.com/p/(\\w+)"))
            .unwrap();

        let detection = registry.detect("https://example.com/p/abc123").unwrap();
        assert_eq!(detection.config.id, "site-a");
        assert_eq!(detection.product_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn disabled_config_not_registered() {
        let json = test_config("off", "x").replace(r#""enabled": true"#, r#""enabled": false"#);
        let mut registry = SiteRegistry::new();
        registry.load_json(&json).unwrap();
        assert!(registry.get("off").is_none());
    }

    #[test]
    fn invalid_regex_is_config_error() {
        let json = test_config("bad", "dp/([A-Z");
        let mut registry = SiteRegistry::new();
        let err = registry.load_json(&json).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn invalid_selector_is_config_error() {
        let json = test_config("bad-sel", "x/(\\w+)").replace("#productTitle", ":::nope");
        let mut registry = SiteRegistry::new();
        let err = registry.load_json(&json).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSelector { .. }));
    }

    #[test]
    fn missing_patterns_is_config_error() {
        let json = r#"{
            "id": "empty",
            "name": "Empty",
            "detection": { "urlPatterns": [] },
            "extraction": { "selectors": {} }
        }"#;
        let mut registry = SiteRegistry::new();
        let err = registry.load_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { .. }));
    }

    #[test]
    fn keyword_terms_lowercased_and_sorted() {
        let json = test_config("kw", "x/(\\w+)").replace(
            r#""material": ["cotton", "wool"]"#,
            r#""material": ["COTTON"], "cert": ["GOTS"]"#,
        );
        let mut registry = SiteRegistry::new();
        registry.load_json(&json).unwrap();
        let config = registry.get("kw").unwrap();
        assert_eq!(config.keywords[0].0, "cert");
        assert_eq!(config.keywords[0].1, vec!["gots"]);
        assert_eq!(config.keywords[1].1, vec!["cotton"]);
    }

    #[test]
    fn load_dir_skips_unparseable_files() {
        let dir = std::env::temp_dir().join("greenlens-sites-load-dir-test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("good.json"),
            test_config("dir-site", "dirsite\\.com/p/(\\w+)"),
        )
        .unwrap();
        std::fs::write(dir.join("bad.json"), "{ not json").unwrap();
        std::fs::write(dir.join("ignored.txt"), "not a config").unwrap();

        let mut registry = SiteRegistry::new();
        registry.load_dir(&dir).unwrap();
        assert!(registry.get("dir-site").is_some());
        assert_eq!(registry.configs().len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn critical_selectors_filtered_from_always_include() {
        let registry = SiteRegistry::builtin();
        let amazon = registry.get("amazon-global").unwrap();
        let critical = amazon.critical_selectors();
        assert!(critical.contains(&"#productTitle"));
    }
}
