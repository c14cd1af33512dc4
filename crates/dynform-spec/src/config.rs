use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("invalid message template '{name}': {source}")]
    Template {
        name: &'static str,
        #[source]
        source: Box<handlebars::TemplateError>,
    },
}

/// Where `add_section` places a new section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionPlacement {
    #[default]
    Append,
    Prepend,
}

/// Handlebars templates for validation messages. `{{label}}` is the field
/// label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageConfig {
    #[serde(default = "default_required_message")]
    pub required: String,
    #[serde(default = "default_invalid_email_message")]
    pub invalid_email: String,
}

fn default_required_message() -> String {
    "{{label}} is required".into()
}

fn default_invalid_email_message() -> String {
    "{{label}} must be a valid email address".into()
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            required: default_required_message(),
            invalid_email: default_invalid_email_message(),
        }
    }
}

/// Engine-wide knobs. Everything else is described by the schema itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub section_placement: SectionPlacement,
    /// Opt-in format check on non-blank email answers.
    #[serde(default)]
    pub check_email_format: bool,
    #[serde(default)]
    pub messages: MessageConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            section_placement: SectionPlacement::default(),
            check_email_format: false,
            messages: MessageConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a JSON config; a blank document yields the defaults.
    pub fn from_json(config_json: &str) -> Result<Self, ConfigError> {
        if config_json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(config_json).map_err(ConfigError::Parse)
    }
}
