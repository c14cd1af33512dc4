//! Respondent flow: one section per step, gated by validation.

use serde_json::Value;
use tracing::{debug, warn};

use crate::answers::{DraftError, ResponseError, ResponseStore};
use crate::config::{ConfigError, EngineConfig};
use crate::payload::format_response;
use crate::service::{FormBackend, TransportError};
use crate::spec::{Field, FieldId, Schema, Section};
use crate::validate::{ValidationErrors, Validator};
use crate::visibility::is_visible;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    Editing { step: usize },
    Submitted,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// The payload the backend accepted.
    Submitted(Value),
    /// Blocking errors; focus moved to the first offending field.
    Invalid(ValidationErrors),
    /// The backend failed; answers are kept for a retry.
    Failed(TransportError),
    AlreadySubmitted,
}

#[derive(Debug, Clone)]
pub struct Wizard {
    schema: Schema,
    responses: ResponseStore,
    validator: Validator,
    state: WizardState,
    errors: ValidationErrors,
    show_errors: bool,
    focus: Option<FieldId>,
}

impl Wizard {
    pub fn new(schema: Schema) -> Self {
        let schema = schema.normalized();
        let responses = ResponseStore::for_schema(&schema);
        Self {
            schema,
            responses,
            validator: Validator::default(),
            state: WizardState::Editing { step: 0 },
            errors: ValidationErrors::default(),
            show_errors: false,
            focus: None,
        }
    }

    pub fn with_config(schema: Schema, config: &EngineConfig) -> Result<Self, ConfigError> {
        let mut wizard = Self::new(schema);
        wizard.validator = Validator::new(config)?;
        Ok(wizard)
    }

    /// Resumes from earlier answers, dropping any that no longer fit.
    pub fn with_responses(mut self, responses: &ResponseStore) -> Self {
        self.responses = responses.reconcile(&self.schema);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn responses(&self) -> &ResponseStore {
        &self.responses
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn is_submitted(&self) -> bool {
        self.state == WizardState::Submitted
    }

    /// Index of the section on screen; the last one after submission.
    pub fn current_step(&self) -> usize {
        match self.state {
            WizardState::Editing { step } => step,
            WizardState::Submitted => self.step_count().saturating_sub(1),
        }
    }

    pub fn step_count(&self) -> usize {
        self.schema.sections.len()
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step() + 1 >= self.step_count()
    }

    pub fn current_section(&self) -> Option<&Section> {
        self.schema.sections.get(self.current_step())
    }

    /// Visible fields of the current section, in display order.
    pub fn visible_fields(&self) -> Vec<&Field> {
        let all_fields = self.schema.all_fields();
        self.current_section()
            .map(|section| {
                section
                    .fields
                    .iter()
                    .filter(|field| is_visible(field, &self.responses, &all_fields))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Whether errors should be on screen.
    pub fn show_errors(&self) -> bool {
        self.show_errors
    }

    pub fn focus(&self) -> Option<&FieldId> {
        self.focus.as_ref()
    }

    pub fn set(&mut self, id: &FieldId, value: impl Into<String>) -> Result<(), ResponseError> {
        let field = lookup(&self.schema, id)?;
        self.responses.set(field, value)
    }

    pub fn toggle(&mut self, id: &FieldId, option: &str) -> Result<(), ResponseError> {
        let field = lookup(&self.schema, id)?;
        self.responses.toggle(field, option)
    }

    pub fn set_cell(
        &mut self,
        id: &FieldId,
        row: usize,
        column: usize,
        value: impl Into<String>,
    ) -> Result<(), ResponseError> {
        let field = lookup(&self.schema, id)?;
        self.responses.set_cell(field, row, column, value)
    }

    pub fn toggle_cell(&mut self, id: &FieldId, row: usize, column: usize) -> Result<(), ResponseError> {
        let field = lookup(&self.schema, id)?;
        self.responses.toggle_cell(field, row, column)
    }

    pub fn add_row(&mut self, id: &FieldId) -> Result<(), ResponseError> {
        let field = lookup(&self.schema, id)?;
        self.responses.add_row(field)
    }

    pub fn remove_row(&mut self, id: &FieldId, index: usize) -> Result<(), ResponseError> {
        let field = lookup(&self.schema, id)?;
        self.responses.remove_row(field, index)
    }

    /// Validates the current section and moves forward when it is clean.
    /// Returns whether the step changed.
    pub fn next(&mut self) -> bool {
        let WizardState::Editing { step } = self.state else {
            return false;
        };
        let Some(section) = self.schema.sections.get(step) else {
            return false;
        };
        let all_fields = self.schema.all_fields();
        self.errors = self
            .validator
            .validate_section(section, &self.responses, &all_fields);
        if !self.errors.is_empty() {
            self.show_errors = true;
            self.focus = self.errors.first().map(|error| error.field_id.clone());
            debug!(step, errors = self.errors.len(), "step blocked");
            return false;
        }
        self.show_errors = false;
        self.focus = None;
        if step + 1 < self.step_count() {
            self.state = WizardState::Editing { step: step + 1 };
            debug!(step = step + 1, "advanced");
            true
        } else {
            false
        }
    }

    /// Steps back without validating.
    pub fn prev(&mut self) -> bool {
        match self.state {
            WizardState::Editing { step } if step > 0 => {
                self.state = WizardState::Editing { step: step - 1 };
                debug!(step = step - 1, "went back");
                true
            }
            _ => false,
        }
    }

    /// Validates every section and, when clean, hands the label-keyed
    /// payload to `backend`.
    pub fn submit<B: FormBackend + ?Sized>(&mut self, backend: &mut B) -> SubmitOutcome {
        if self.is_submitted() {
            return SubmitOutcome::AlreadySubmitted;
        }
        let all_fields = self.schema.all_fields();
        self.errors = self
            .validator
            .validate_all(&self.schema, &self.responses, &all_fields);
        if !self.errors.is_empty() {
            self.show_errors = true;
            if let Some(first) = self.errors.first().map(|error| error.field_id.clone()) {
                self.focus_field(&first);
            }
            debug!(errors = self.errors.len(), "submission blocked");
            return SubmitOutcome::Invalid(self.errors.clone());
        }
        let payload = format_response(&self.schema, &self.responses);
        match backend.submit_response(&payload) {
            Ok(()) => {
                self.state = WizardState::Submitted;
                self.show_errors = false;
                self.focus = None;
                debug!("responses submitted");
                SubmitOutcome::Submitted(payload)
            }
            Err(err) => {
                warn!(error = %err, "submission failed");
                SubmitOutcome::Failed(err)
            }
        }
    }

    /// Moves focus to the step holding `id`, for jumping to an error.
    pub fn focus_field(&mut self, id: &FieldId) -> bool {
        if self.is_submitted() {
            return false;
        }
        match self.schema.section_of(id) {
            Some(step) => {
                self.state = WizardState::Editing { step };
                self.focus = Some(id.clone());
                true
            }
            None => false,
        }
    }

    pub fn save_draft(&self) -> Result<Vec<u8>, DraftError> {
        self.responses.to_cbor()
    }

    pub fn restore_draft(&mut self, bytes: &[u8]) -> Result<(), DraftError> {
        let draft = ResponseStore::from_cbor(bytes)?;
        self.responses = draft.reconcile(&self.schema);
        Ok(())
    }
}

fn lookup<'a>(schema: &'a Schema, id: &FieldId) -> Result<&'a Field, ResponseError> {
    schema
        .field(id)
        .ok_or_else(|| ResponseError::UnknownField(id.clone()))
}
