use anyhow::Result;

/// Application configuration loaded from environment variables.
/// Contains only endpoint/credential values; extraction tunables and
/// site rules live in the TOML FileConfig and the JSON site configs.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the scoring service
    pub scoring_service_url: Option<String>,
    pub scoring_service_token: Option<String>,

    /// Model identifier passed through to the scoring service
    pub scoring_model: String,

    /// Extra directory of site configs loaded after the builtins
    pub sites_dir: Option<String>,

    /// Path to the TOML tunables file
    pub config_path: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            scoring_service_url: std::env::var("SCORING_SERVICE_URL").ok(),
            scoring_service_token: std::env::var("SCORING_SERVICE_TOKEN").ok(),
            scoring_model: std::env::var("SCORING_MODEL")
                .unwrap_or_else(|_| "on-device-summarizer".to_string()),
            sites_dir: std::env::var("GREENLENS_SITES_DIR").ok(),
            config_path: std::env::var("GREENLENS_CONFIG").ok(),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  SCORING_SERVICE_URL: {}",
            self.scoring_service_url.as_deref().unwrap_or("<not set>")
        );
        tracing::info!(
            "  SCORING_SERVICE_TOKEN: {}",
            preview_opt(&self.scoring_service_token)
        );
        tracing::info!("  SCORING_MODEL: {}", self.scoring_model);
    }
}

/// First few characters of a secret for logging, never the whole value.
fn preview_opt(val: &Option<String>) -> String {
    match val {
        Some(v) if !v.is_empty() => {
            let prefix: String = v.chars().take(5).collect();
            format!("{}...({} chars)", prefix, v.chars().count())
        }
        _ => "<not set>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_always_resolves() {
        // Falls back to the on-device default when the env var is unset
        let config = AppConfig::from_env().unwrap();
        assert!(!config.scoring_model.is_empty());
    }

    #[test]
    fn preview_never_exposes_full_value_and_handles_multibyte() {
        let token = Some("ä1234567890".to_string());
        let preview = preview_opt(&token);
        assert!(preview.starts_with("ä1234..."));
        assert!(!preview.contains("890"));
        assert_eq!(preview_opt(&None), "<not set>");
        assert_eq!(preview_opt(&Some(String::new())), "<not set>");
    }
}
