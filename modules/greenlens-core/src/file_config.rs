use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// TOML-backed tunables loaded from disk. Every field has a default so
/// a missing file or partial file is fine; secrets stay as env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub selection: SelectionConfig,
    pub quota: QuotaConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionConfig {
    /// Character budget handed to the budget selector
    pub target_chars: usize,
    /// Sibling walk limit for the heading-crawl tier
    pub heading_crawl_steps: usize,
    /// Minimum block length for heading-crawled sections
    pub min_block_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuotaConfig {
    /// Safety margin applied when trimming payloads that exceed the
    /// scoring service's measured quota
    pub trim_margin: f64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            selection: SelectionConfig::default(),
            quota: QuotaConfig::default(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            target_chars: 6000,
            heading_crawl_steps: 10,
            min_block_chars: 100,
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self { trim_margin: 0.9 }
    }
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let config = FileConfig::default();
        assert_eq!(config.selection.target_chars, 6000);
        assert_eq!(config.selection.heading_crawl_steps, 10);
        assert_eq!(config.selection.min_block_chars, 100);
        assert!((config.quota.trim_margin - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: FileConfig = toml::from_str("[selection]\ntarget_chars = 4000\n").unwrap();
        assert_eq!(config.selection.target_chars, 4000);
        assert_eq!(config.selection.heading_crawl_steps, 10);
    }

    #[test]
    fn load_config_reads_file() {
        let path = std::env::temp_dir().join("greenlens-file-config-test.toml");
        std::fs::write(&path, "[quota]\ntrim_margin = 0.8\n").unwrap();
        let config = load_config(&path).unwrap();
        assert!((config.quota.trim_margin - 0.8).abs() < f64::EPSILON);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("greenlens-no-such-config.toml");
        assert!(load_config(&path).is_err());
    }
}
