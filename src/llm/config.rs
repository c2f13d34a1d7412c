//! Configuration for the hosted chat model

use std::time::Duration;

/// Environment variables checked for the API key, in order
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// Hosted model identifier
    pub model_id: String,

    /// Secret credential. Session creation fails without it.
    pub api_key: Option<String>,

    /// API root, without a trailing slash
    pub base_url: String,

    /// Sampling temperature. `None` keeps the model default.
    pub temperature: Option<f32>,

    /// Reasoning token budget (0 disables thinking for lower latency)
    pub thinking_budget: u32,

    /// Timeout for establishing the HTTP connection. The stream itself is not timed out.
    pub connect_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model_id: "gemini-2.5-flash".to_string(),
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: None,
            thinking_budget: 0,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ChatConfig {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            ..Default::default()
        }
    }

    /// Default configuration with the API key read from the environment
    pub fn from_env() -> Self {
        Self {
            api_key: api_key_from_env(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = budget;
        self
    }

    /// Whether a non-empty API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }

    /// Streaming endpoint for the configured model
    pub fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model_id
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.model_id.trim().is_empty() {
            return Err("Model id must not be empty".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!("Invalid API base URL: {}", self.base_url));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }
        Ok(())
    }
}

/// First non-empty credential from [`API_KEY_VARS`]
pub fn api_key_from_env() -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
}
