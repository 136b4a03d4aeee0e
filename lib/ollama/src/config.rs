//! Ollama connection settings.

use serde::Deserialize;

/// Settings for the Ollama backend, read from the `ollama` config section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name, optionally with a tag (`llama3.2`, `qwen2.5:7b`).
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature. Uses the model default when unset.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// How long the server keeps the model loaded after a request.
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_keep_alive() -> String {
    "5m".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: None,
            keep_alive: default_keep_alive(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_local_server() {
        let config = OllamaConfig::default();
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.keep_alive, "5m");
        assert!(config.temperature.is_none());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: OllamaConfig =
            serde_json::from_str(r#"{"model": "qwen2.5:7b", "temperature": 0.2}"#)
                .expect("deserialize");
        assert_eq!(config.model, "qwen2.5:7b");
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.base_url, "http://localhost:11434");
    }
}
