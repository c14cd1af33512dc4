#![allow(missing_docs)]

pub mod answers;
pub mod config;
pub mod document;
pub mod editor;
pub mod payload;
pub mod render;
pub mod service;
pub mod spec;
pub mod table;
pub mod template;
pub mod validate;
pub mod visibility;
pub mod wizard;

pub use answers::{Answer, DraftError, ResponseError, ResponseStore};
pub use config::{ConfigError, EngineConfig, MessageConfig, SectionPlacement};
pub use document::schema_document;
pub use payload::{format_response, import_response};
pub use render::{
    RenderField, RenderPayload, RenderProgress, RenderStatus, build_render_payload,
    build_step_payload, render_json_ui, render_text,
};
pub use service::{
    FormBackend, Notification, NotificationLevel, SchemaService, TransportError, UNDO_LIMIT,
    parse_schema_response,
};
pub use spec::{Condition, Field, FieldId, FieldKind, FieldType, Logic, Schema, Section, ShowWhen, Table};
pub use template::MessageTemplates;
pub use validate::{ErrorCode, FieldError, ValidationErrors, Validator, validate_all, validate_section};
pub use visibility::{VisibilityMap, is_visible, resolve_visibility};
pub use wizard::{SubmitOutcome, Wizard, WizardState};
