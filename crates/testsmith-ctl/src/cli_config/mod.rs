//! CLI defaults for policy, profile, emission, and AI settings.
//!
//! Command-line flags always win over values from the config file.

pub(crate) mod loader;

pub(crate) use loader::load_cli_config;

use std::path::PathBuf;

use anyhow::anyhow;
use serde::Deserialize;
use testsmith_core::augmenter::HttpGeneratorConfig;
use testsmith_core::policy::Category;

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

/// AI augmentation settings. Unset fields fall back to the generator defaults.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct AiConfig {
    /// Augment every `generate` run, as if `--ai` were passed.
    #[serde(default)]
    pub enabled: bool,

    /// OpenAI-compatible API root, e.g. `https://api.groq.com/openai/v1`.
    pub base_url: Option<String>,

    pub model: Option<String>,

    pub temperature: Option<f32>,

    pub max_tokens: Option<u32>,

    /// Per-call timeout in seconds.
    pub timeout_secs: Option<u64>,

    /// Environment variable holding the API key. Default: `GROQ_API_KEY`.
    pub api_key_env: Option<String>,

    /// Generator calls in flight at once.
    pub concurrency: Option<usize>,

    /// Categories sent for enrichment. Default: all.
    #[serde(default)]
    pub categories: Vec<String>,
}

impl AiConfig {
    /// Categories to enrich, in the order given. Empty means all.
    pub(crate) fn categories(&self) -> anyhow::Result<Vec<Category>> {
        if self.categories.is_empty() {
            return Ok(Category::ALL.to_vec());
        }
        self.categories
            .iter()
            .map(|key| Category::from_key(key).ok_or_else(|| anyhow!("unknown AI category '{}'", key)))
            .collect()
    }

    pub(crate) fn http_config(&self) -> HttpGeneratorConfig {
        let defaults = HttpGeneratorConfig::default();
        HttpGeneratorConfig {
            base_url: self.base_url.clone().unwrap_or(defaults.base_url),
            model: self.model.clone().unwrap_or(defaults.model),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
            api_key_env: self.api_key_env.clone().unwrap_or(defaults.api_key_env),
        }
    }
}

/// Contents of `.testsmith.toml`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct CliConfig {
    /// Policy file used when `--policy` is not given.
    pub policy: Option<PathBuf>,

    /// Profile applied when `--profile` is not given.
    pub profile: Option<String>,

    /// Directory for emitted pytest modules when `--pytest-dir` is not given.
    pub pytest_dir: Option<PathBuf>,

    /// Default `API_BASE_URL` baked into emitted pytest modules.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Synthesis worker threads.
    pub workers: Option<usize>,

    #[serde(default)]
    pub ai: AiConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            policy: None,
            profile: None,
            pytest_dir: None,
            base_url: default_base_url(),
            workers: None,
            ai: AiConfig::default(),
        }
    }
}
