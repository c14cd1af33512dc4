use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::answers::{Answer, ResponseStore};
use crate::config::{ConfigError, EngineConfig};
use crate::spec::{Field, FieldId, FieldKind, Schema, Section};
use crate::template::MessageTemplates;
use crate::visibility::is_visible;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// Why a field blocks progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Required,
    InvalidEmail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field_id: FieldId,
    pub label: String,
    pub message: String,
    pub code: ErrorCode,
}

/// Errors of one validation pass, in schema order.
///
/// Derived state: rebuilt from scratch on every pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, id: &FieldId) -> Option<&FieldError> {
        self.errors.iter().find(|error| &error.field_id == id)
    }

    pub fn get_by_label(&self, label: &str) -> Option<&FieldError> {
        self.errors.iter().find(|error| error.label == label)
    }

    /// First offending field in display order.
    pub fn first(&self) -> Option<&FieldError> {
        self.errors.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// `label → message`, the shape respondents see.
    pub fn to_label_map(&self) -> BTreeMap<String, String> {
        self.errors
            .iter()
            .map(|error| (error.label.clone(), error.message.clone()))
            .collect()
    }

    fn push(&mut self, field: &Field, message: String, code: ErrorCode) {
        self.errors.push(FieldError {
            field_id: field.id.clone(),
            label: field.label.clone(),
            message,
            code,
        });
    }
}

/// Required-answer and format checks for visible fields.
#[derive(Debug, Clone)]
pub struct Validator {
    templates: MessageTemplates,
    check_email_format: bool,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            templates: MessageTemplates::default(),
            check_email_format: false,
        }
    }
}

impl Validator {
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            templates: MessageTemplates::new(&config.messages)?,
            check_email_format: config.check_email_format,
        })
    }

    /// Checks only the fields of `section`; used to gate one wizard step.
    pub fn validate_section(
        &self,
        section: &Section,
        responses: &ResponseStore,
        all_fields: &[&Field],
    ) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        self.check_fields(section.fields.iter(), responses, all_fields, &mut errors);
        errors
    }

    pub fn validate_all(
        &self,
        schema: &Schema,
        responses: &ResponseStore,
        all_fields: &[&Field],
    ) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        for section in &schema.sections {
            self.check_fields(section.fields.iter(), responses, all_fields, &mut errors);
        }
        errors
    }

    fn check_fields<'a>(
        &self,
        fields: impl Iterator<Item = &'a Field>,
        responses: &ResponseStore,
        all_fields: &[&Field],
        errors: &mut ValidationErrors,
    ) {
        for field in fields {
            if !is_visible(field, responses, all_fields) {
                continue;
            }
            let answer = responses.get(&field.id);
            if field.required && is_empty(field, answer) {
                errors.push(
                    field,
                    self.templates.required(&field.label),
                    ErrorCode::Required,
                );
                continue;
            }
            if self.check_email_format
                && matches!(field.kind, FieldKind::Email)
                && let Some(text) = answer.and_then(Answer::as_text)
                && !text.trim().is_empty()
                && !EMAIL_PATTERN.is_match(text.trim())
            {
                errors.push(
                    field,
                    self.templates.invalid_email(&field.label),
                    ErrorCode::InvalidEmail,
                );
            }
        }
    }
}

/// Table questions are never treated as empty: their `required` flag is
/// informational only.
fn is_empty(field: &Field, answer: Option<&Answer>) -> bool {
    match &field.kind {
        FieldKind::Checkbox { .. } => answer
            .and_then(Answer::as_choices)
            .is_none_or(|values| values.is_empty()),
        FieldKind::Text
        | FieldKind::Email
        | FieldKind::Date
        | FieldKind::Select { .. }
        | FieldKind::Radio { .. } => answer
            .and_then(Answer::as_text)
            .is_none_or(|text| text.trim().is_empty()),
        FieldKind::Multiple(_) | FieldKind::CheckboxMatrix(_) => false,
    }
}

/// [`Validator::validate_section`] with the default messages.
pub fn validate_section(
    section: &Section,
    responses: &ResponseStore,
    all_fields: &[&Field],
) -> ValidationErrors {
    Validator::default().validate_section(section, responses, all_fields)
}

/// [`Validator::validate_all`] with the default messages.
pub fn validate_all(
    schema: &Schema,
    responses: &ResponseStore,
    all_fields: &[&Field],
) -> ValidationErrors {
    Validator::default().validate_all(schema, responses, all_fields)
}
