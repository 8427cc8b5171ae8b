use crate::transport::DEFAULT_API_BASE_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// CLI configuration loaded from ~/.config/cfworkers/config.toml
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Cloudflare API settings
    #[serde(default)]
    pub cloudflare: CloudflareConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CloudflareConfig {
    /// API token (keep secret!)
    pub api_token: Option<String>,

    /// Account ID; enables the multi-script API
    pub account_id: Option<String>,

    /// Default zone for single-script commands
    pub zone_id: Option<String>,

    /// API base URL override
    pub api_base_url: Option<String>,
}

impl CliConfig {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("cfworkers").join("config.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                warn!("Failed to parse config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                warn!("Failed to read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Get API token (config -> env var)
    pub fn api_token(&self) -> Option<String> {
        non_empty(self.cloudflare.api_token.clone())
            .or_else(|| non_empty(std::env::var("CF_API_TOKEN").ok()))
    }

    /// Get account ID (config -> env var)
    pub fn account_id(&self) -> Option<String> {
        non_empty(self.cloudflare.account_id.clone())
            .or_else(|| non_empty(std::env::var("CF_ACCOUNT_ID").ok()))
    }

    /// Get default zone ID (config -> env var)
    pub fn zone_id(&self) -> Option<String> {
        non_empty(self.cloudflare.zone_id.clone())
            .or_else(|| non_empty(std::env::var("CF_ZONE_ID").ok()))
    }

    /// Get effective API base URL (config -> default)
    pub fn api_base_url(&self) -> String {
        non_empty(self.cloudflare.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Generate a sample config file content
pub fn sample_config() -> &'static str {
    r#"# cfworkers configuration
# Location: ~/.config/cfworkers/config.toml

[cloudflare]
# API token with Workers Scripts and Workers Routes edit permissions (keep secret!)
api_token = "your-token-here"

# Account ID - required for named (multi-script) workers
# account_id = "your-account-id"

# Default zone for single-script commands
# zone_id = "your-zone-id"

# api_base_url = "https://api.cloudflare.com/client/v4"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses() {
        let cfg: CliConfig = toml::from_str(sample_config()).unwrap();
        assert_eq!(cfg.cloudflare.api_token.as_deref(), Some("your-token-here"));
        assert!(cfg.cloudflare.account_id.is_none());
        assert_eq!(cfg.api_base_url(), DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = std::env::temp_dir().join("cfworkers-missing-config-test.toml");
        let cfg = CliConfig::load_from(&path);
        assert!(cfg.cloudflare.api_token.is_none());
    }

    #[test]
    fn test_invalid_file_is_default() {
        let path = std::env::temp_dir().join(format!(
            "cfworkers-invalid-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[cloudflare\napi_token = ").unwrap();
        let cfg = CliConfig::load_from(&path);
        std::fs::remove_file(&path).ok();
        assert!(cfg.cloudflare.api_token.is_none());
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let cfg: CliConfig = toml::from_str(
            r#"
[cloudflare]
api_base_url = "  "
"#,
        )
        .unwrap();
        assert_eq!(cfg.api_base_url(), DEFAULT_API_BASE_URL);
    }
}
