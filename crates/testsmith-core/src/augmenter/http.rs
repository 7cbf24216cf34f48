//! OpenAI-compatible chat-completions backend.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{GeneratorError, TextGenerator};

const SYSTEM_PROMPT: &str =
    "You are a senior QA engineer writing precise, executable API test steps. Reply with JSON only.";

/// Connection settings for [`HttpTextGenerator`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpGeneratorConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for HttpGeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-8b-8192".to_string(),
            temperature: 0.7,
            max_tokens: 300,
            timeout_secs: 30,
            api_key_env: "GROQ_API_KEY".to_string(),
        }
    }
}

pub struct HttpTextGenerator {
    client: reqwest::Client,
    config: HttpGeneratorConfig,
    api_key: String,
}

impl fmt::Debug for HttpTextGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTextGenerator")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl HttpTextGenerator {
    pub fn new(config: HttpGeneratorConfig, api_key: impl Into<String>) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
        })
    }

    /// Read the API key from `config.api_key_env`.
    pub fn from_env(config: HttpGeneratorConfig) -> Result<Self, GeneratorError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GeneratorError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }

    pub fn config(&self) -> &HttpGeneratorConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        if self.config.base_url.ends_with('/') {
            format!("{}chat/completions", self.config.base_url)
        } else {
            format!("{}/chat/completions", self.config.base_url)
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        })
    }
}

fn completion_text(body: &Value) -> Result<String, GeneratorError> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| GeneratorError::InvalidResponse("missing choices[0].message.content".into()))
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, GeneratorError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Status { status, body });
        }

        let body: Value = response.json().await?;
        completion_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(base_url: &str) -> HttpTextGenerator {
        HttpTextGenerator::new(
            HttpGeneratorConfig {
                base_url: base_url.to_string(),
                ..HttpGeneratorConfig::default()
            },
            "secret",
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        assert_eq!(
            generator("https://api.example.test/v1").endpoint(),
            "https://api.example.test/v1/chat/completions"
        );
        assert_eq!(
            generator("https://api.example.test/v1/").endpoint(),
            "https://api.example.test/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = generator("http://localhost").request_body("hello");
        assert_eq!(body["model"], "llama3-8b-8192");
        assert_eq!(body["max_tokens"], 300);
        assert_eq!(body["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_completion_text() {
        let body = json!({"choices": [{"message": {"content": "  {\"steps\": []} "}}]});
        assert_eq!(completion_text(&body).unwrap(), "{\"steps\": []}");
        assert!(matches!(
            completion_text(&json!({"choices": []})),
            Err(GeneratorError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_missing_key() {
        let config = HttpGeneratorConfig {
            api_key_env: "TESTSMITH_UNSET_KEY_FOR_TESTS".into(),
            ..HttpGeneratorConfig::default()
        };
        assert!(matches!(
            HttpTextGenerator::from_env(config),
            Err(GeneratorError::MissingApiKey(name)) if name == "TESTSMITH_UNSET_KEY_FOR_TESTS"
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let rendered = format!("{:?}", generator("http://localhost"));
        assert!(!rendered.contains("secret"));
    }
}
