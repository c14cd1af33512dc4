//! Schema lifecycle: fetch, edit with undo, clean and persist.

use std::collections::VecDeque;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::editor;
use crate::spec::Schema;
use crate::wizard::{SubmitOutcome, Wizard};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The remote side of the engine: where schemas live and responses go.
pub trait FormBackend {
    /// Returns the raw `{ success, schema }` envelope.
    fn fetch_schema(&mut self) -> Result<Value, TransportError>;
    fn save_schema(&mut self, schema: &Value) -> Result<(), TransportError>;
    fn submit_response(&mut self, payload: &Value) -> Result<(), TransportError>;
}

/// Reads a `{ success, schema }` envelope. An unsuccessful or malformed
/// response yields an empty schema.
pub fn parse_schema_response(response: &Value) -> Schema {
    if response.get("success").and_then(Value::as_bool) != Some(true) {
        warn!("schema response not successful; using an empty schema");
        return Schema::default();
    }
    let Some(document) = response.get("schema") else {
        warn!("schema response has no schema; using an empty schema");
        return Schema::default();
    };
    match Schema::from_value(document.clone()) {
        Ok(schema) => schema,
        Err(err) => {
            warn!(error = %err, "malformed schema; using an empty schema");
            Schema::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A dismissable message for the person at the keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Edits kept for `undo`; older ones are dropped first.
pub const UNDO_LIMIT: usize = 100;

/// Owns the working schema and every exchange with the backend.
#[derive(Debug)]
pub struct SchemaService<B> {
    backend: B,
    config: EngineConfig,
    schema: Schema,
    history: VecDeque<Schema>,
    notification: Option<Notification>,
}

impl<B: FormBackend> SchemaService<B> {
    pub fn new(backend: B, config: EngineConfig) -> Self {
        Self {
            backend,
            config,
            schema: Schema::default(),
            history: VecDeque::new(),
            notification: None,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Fetches the schema. On transport failure the current schema stays in
    /// place and an error notification is raised.
    pub fn load(&mut self) -> Result<&Schema, TransportError> {
        match self.backend.fetch_schema() {
            Ok(response) => {
                self.schema = parse_schema_response(&response);
                self.history.clear();
                debug!(sections = self.schema.sections.len(), "schema loaded");
                Ok(&self.schema)
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch schema");
                self.notification = Some(Notification::error(format!(
                    "Could not load the form: {err}"
                )));
                Err(err)
            }
        }
    }

    /// Replaces the working schema with `edit(schema)`, remembering the
    /// previous version.
    pub fn edit(&mut self, edit: impl FnOnce(&Schema) -> Schema) -> &Schema {
        let next = edit(&self.schema);
        if next != self.schema {
            let previous = std::mem::replace(&mut self.schema, next);
            if self.history.len() == UNDO_LIMIT {
                self.history.pop_front();
            }
            self.history.push_back(previous);
        }
        &self.schema
    }

    /// Adds a section where the config says new sections go.
    pub fn add_section(&mut self) -> &Schema {
        let placement = self.config.section_placement;
        self.edit(|schema| editor::add_section_at(schema, placement))
    }

    /// Restores the version before the last edit.
    pub fn undo(&mut self) -> bool {
        match self.history.pop_back() {
            Some(previous) => {
                self.schema = previous;
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Persists the cleaned-up schema. The working copy is left as is so
    /// blank rows being typed into do not disappear.
    pub fn save(&mut self) -> Result<(), TransportError> {
        let cleaned = editor::clean_schema(&self.schema);
        let result = serde_json::to_value(&cleaned)
            .map_err(TransportError::from)
            .and_then(|document| self.backend.save_schema(&document));
        match result {
            Ok(()) => {
                debug!("schema saved");
                self.notification = Some(Notification::info("Form saved"));
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "failed to save schema");
                self.notification = Some(Notification::error(format!(
                    "Could not save the form: {err}"
                )));
                Err(err)
            }
        }
    }

    /// Builds a respondent wizard over the current schema.
    pub fn start_wizard(&self) -> Result<Wizard, ConfigError> {
        Wizard::with_config(self.schema.clone(), &self.config)
    }

    /// Submits through this service's backend, raising a notification when
    /// the backend fails.
    pub fn submit(&mut self, wizard: &mut Wizard) -> SubmitOutcome {
        let outcome = wizard.submit(&mut self.backend);
        if let SubmitOutcome::Failed(err) = &outcome {
            self.notification = Some(Notification::error(format!(
                "Could not submit your answers: {err}"
            )));
        }
        outcome
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }
}
