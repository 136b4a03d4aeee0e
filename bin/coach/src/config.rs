//! Coach configuration.
//!
//! Loaded via the `config` crate from an optional TOML file, overridden by
//! environment variables such as `VITALS__OLLAMA__MODEL`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use vitals_conversation::SessionConfig;
use vitals_ollama::OllamaConfig;

/// Configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct CoachConfig {
    #[serde(default)]
    pub session: CoachSessionConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub health: HealthConfig,
}

/// Session limits plus the coach's instructions.
#[derive(Debug, Clone, Deserialize)]
pub struct CoachSessionConfig {
    #[serde(flatten)]
    pub limits: SessionConfig,

    /// Instructions given to the model ahead of the conversation.
    #[serde(default = "default_instructions")]
    pub instructions: String,
}

fn default_instructions() -> String {
    "You're a health coach. You help users manage their health by providing personalized \
     recommendations based on their blood pressure data."
        .to_string()
}

impl Default for CoachSessionConfig {
    fn default() -> Self {
        Self {
            limits: SessionConfig::default(),
            instructions: default_instructions(),
        }
    }
}

/// Where health records come from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthConfig {
    /// JSON export of correlated records. Starts empty when unset.
    #[serde(default)]
    pub records_path: Option<PathBuf>,

    /// Refuse every authorization request, as a user declining access would.
    #[serde(default)]
    pub deny_authorization: bool,
}

impl CoachConfig {
    /// Loads configuration from `path`, if it exists, and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an environment value is invalid.
    pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("VITALS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = CoachConfig::load(&dir.path().join("vitals.toml")).expect("load");
        assert_eq!(config.session.limits, SessionConfig::default());
        assert!(config.session.instructions.starts_with("You're a health coach."));
        assert_eq!(config.ollama.model, "llama3.2");
        assert!(config.health.records_path.is_none());
        assert!(!config.health.deny_authorization);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        write!(
            file,
            r#"
[session]
tool_timeout_ms = 2500
instructions = "Be brief."

[ollama]
model = "qwen2.5:7b"
temperature = 0.3

[health]
records_path = "/var/lib/vitals/records.json"
deny_authorization = true
"#
        )
        .expect("write");

        let config = CoachConfig::load(file.path()).expect("load");
        assert_eq!(config.session.limits.tool_timeout_ms, 2500);
        assert_eq!(config.session.limits.max_tool_rounds, 8);
        assert_eq!(config.session.instructions, "Be brief.");
        assert_eq!(config.ollama.model, "qwen2.5:7b");
        assert_eq!(config.ollama.temperature, Some(0.3));
        assert_eq!(
            config.health.records_path,
            Some(PathBuf::from("/var/lib/vitals/records.json"))
        );
        assert!(config.health.deny_authorization);
    }
}
