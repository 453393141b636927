//! Runtime configuration loaded from an optional YAML file.
//!
//! Every field has a default, so a missing file or a partial file both work.
//! The resulting [`AppConfig`] is built once in `main` and handed to the
//! fetcher and the assistant backend; nothing here is global.

use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use tracing::{info, instrument};

/// Placeholder in [`AssistantConfig::system_prompt`] replaced by the article URLs.
pub const LINKS_PLACEHOLDER: &str = "{links}";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a news specialist. Your job is to open all the Reuters news links below and use all the information gathered to answer the user's question. You MUST OPEN all the Reuters links provided.\nReuters News Links:\n{links}";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub assistant: AssistantConfig,
    /// Also write a JSON copy of each report next to the spreadsheet.
    pub json_copy: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            assistant: AssistantConfig::default(),
            json_copy: true,
        }
    }
}

/// Where and how the news search endpoint is reached.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Site root; article paths are resolved against it.
    pub site_url: String,
    pub search_path: String,
    pub website: String,
    /// Deployment number sent as the `d` query parameter.
    pub deployment: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            site_url: "https://www.reuters.com".to_string(),
            search_path: "/pf/api/v3/content/fetch/articles-by-search-v2".to_string(),
            website: "reuters".to_string(),
            deployment: 201,
        }
    }
}

/// Settings for the OpenAI-compatible chat endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub api_base: String,
    pub model: String,
    /// Never read from YAML; supplied through the CLI / environment.
    #[serde(skip)]
    pub api_key: Option<String>,
    pub system_prompt: String,
    pub max_retries: usize,
    pub base_delay_ms: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_retries: 5,
            base_delay_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Parse a YAML document, defaulting anything it leaves out.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    /// Load from `path` if given, otherwise use the defaults.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let raw = tokio::fs::read_to_string(path).await?;
        let config = Self::from_yaml(&raw)?;
        info!(path = %path.display(), site_url = %config.provider.site_url, model = %config.assistant.model, "Loaded configuration");
        Ok(config)
    }
}
