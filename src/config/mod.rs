/// Configuration management for cmx
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

pub const DEFAULT_API_ORIGIN: &str = "https://api.replicated.com/vendor";

const API_TOKEN_ENV: &str = "REPLICATED_API_TOKEN";
const API_ORIGIN_ENV: &str = "REPLICATED_API_ORIGIN";

/// Client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Vendor API token (can also be set via REPLICATED_API_TOKEN env var)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Vendor API origin
    #[serde(default = "default_api_origin")]
    pub api_origin: String,

    /// Default cluster creation values
    #[serde(default)]
    pub defaults: CreateDefaults,
}

/// Values applied when the matching flag is not given
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDefaults {
    /// Cluster/VM time to live (e.g., "1h")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,

    /// Output format: table, wide or json
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for CreateDefaults {
    fn default() -> Self {
        Self {
            ttl: None,
            output: default_output(),
        }
    }
}

fn default_api_origin() -> String {
    DEFAULT_API_ORIGIN.to_string()
}

fn default_output() -> String {
    "table".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_token: None,
            api_origin: default_api_origin(),
            defaults: CreateDefaults::default(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the file if it exists, then apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut settings = if path.as_ref().exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        if let Ok(origin) = std::env::var(API_ORIGIN_ENV) {
            settings.api_origin = origin;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings
    pub fn validate(&self) -> anyhow::Result<()> {
        let origin = Url::parse(&self.api_origin)
            .map_err(|e| anyhow::anyhow!("Invalid API origin {}: {}", self.api_origin, e))?;
        if !matches!(origin.scheme(), "http" | "https") {
            anyhow::bail!("API origin must be http or https: {}", self.api_origin);
        }

        if !matches!(self.defaults.output.as_str(), "table" | "wide" | "json") {
            anyhow::bail!("Unsupported output format: {}", self.defaults.output);
        }

        Ok(())
    }

    /// Get the API token from the environment or the settings file
    pub fn get_api_token(&self) -> anyhow::Result<String> {
        std::env::var(API_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.api_token.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "API token not found. Set {} environment variable or specify api_token in config",
                    API_TOKEN_ENV
                )
            })
    }

    /// Generate an example settings file
    pub fn example() -> Self {
        Self {
            api_token: None,
            api_origin: default_api_origin(),
            defaults: CreateDefaults {
                ttl: Some("1h".to_string()),
                output: "table".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::example();
        assert!(settings.validate().is_ok());

        settings.api_origin = "not a url".to_string();
        assert!(settings.validate().is_err());

        settings.api_origin = "ftp://example.com".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_output_validation() {
        let mut settings = Settings::default();
        settings.defaults.output = "yaml".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_from_file_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmx.yaml");
        std::fs::write(&path, "api_token: abc\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.api_token.as_deref(), Some("abc"));
        assert_eq!(settings.api_origin, DEFAULT_API_ORIGIN);
        assert_eq!(settings.defaults.output, "table");
    }

    #[test]
    fn test_example_round_trips() {
        let yaml = serde_yaml::to_string(&Settings::example()).unwrap();
        assert!(!yaml.contains("api_token"));
        let parsed: Settings = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.defaults.ttl.as_deref(), Some("1h"));
    }
}
