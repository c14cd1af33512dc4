use handlebars::Handlebars;
use serde_json::json;
use tracing::warn;

use crate::config::{ConfigError, MessageConfig};

const REQUIRED: &str = "required";
const INVALID_EMAIL: &str = "invalid_email";

/// Compiled validation message templates.
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    registry: Handlebars<'static>,
}

impl MessageTemplates {
    pub fn new(config: &MessageConfig) -> Result<Self, ConfigError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        register(&mut registry, REQUIRED, &config.required)?;
        register(&mut registry, INVALID_EMAIL, &config.invalid_email)?;
        Ok(Self { registry })
    }

    pub fn required(&self, label: &str) -> String {
        self.render(REQUIRED, label)
            .unwrap_or_else(|| format!("{} is required", label))
    }

    pub fn invalid_email(&self, label: &str) -> String {
        self.render(INVALID_EMAIL, label)
            .unwrap_or_else(|| format!("{} must be a valid email address", label))
    }

    fn render(&self, name: &str, label: &str) -> Option<String> {
        match self.registry.render(name, &json!({ "label": label })) {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(template = name, error = %err, "message template failed to render");
                None
            }
        }
    }
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self::new(&MessageConfig::default()).unwrap_or_else(|err| {
            warn!(error = %err, "built-in message templates rejected");
            let mut registry = Handlebars::new();
            registry.register_escape_fn(handlebars::no_escape);
            Self { registry }
        })
    }
}

fn register(
    registry: &mut Handlebars<'static>,
    name: &'static str,
    template: &str,
) -> Result<(), ConfigError> {
    registry
        .register_template_string(name, template)
        .map_err(|source| ConfigError::Template {
            name,
            source: Box::new(source),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_labels_without_html_escaping() {
        let templates = MessageTemplates::default();
        assert_eq!(templates.required("R&D <team>"), "R&D <team> is required");
        assert_eq!(
            templates.invalid_email("Email"),
            "Email must be a valid email address"
        );
    }

    #[test]
    fn custom_templates_are_used() {
        let config = MessageConfig {
            required: "Bitte {{label}} ausfüllen".into(),
            ..MessageConfig::default()
        };
        let templates = MessageTemplates::new(&config).expect("templates");
        assert_eq!(templates.required("Name"), "Bitte Name ausfüllen");
    }

    #[test]
    fn default_templates_match_the_default_config() {
        let templates = MessageTemplates::default();
        assert!(templates.registry.has_template(REQUIRED));
        assert!(templates.registry.has_template(INVALID_EMAIL));
    }

    #[test]
    fn broken_template_is_rejected() {
        let config = MessageConfig {
            required: "{{#if label}}unterminated".into(),
            ..MessageConfig::default()
        };
        assert!(matches!(
            MessageTemplates::new(&config),
            Err(ConfigError::Template { name: "required", .. })
        ));
    }
}
