use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::spec::{Field, FieldId, FieldKind, FieldType, Schema};

/// Stored answer, shaped by the field type that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// `text`, `email`, `date`, `select` and `radio`.
    Text(String),
    /// `checkbox`: unique values in the order they were ticked.
    Choices(Vec<String>),
    /// `multiple`.
    TextGrid(Vec<Vec<String>>),
    /// `checkbox-matrix`.
    BoolGrid(Vec<Vec<bool>>),
}

impl Answer {
    /// Type-appropriate empty value for a freshly loaded schema.
    pub fn empty_for(field: &Field) -> Answer {
        match &field.kind {
            FieldKind::Text
            | FieldKind::Email
            | FieldKind::Date
            | FieldKind::Select { .. }
            | FieldKind::Radio { .. } => Answer::Text(String::new()),
            FieldKind::Checkbox { .. } => Answer::Choices(Vec::new()),
            FieldKind::Multiple(table) => Answer::TextGrid(vec![
                vec![String::new(); table.column_labels.len()];
                table.row_labels.len()
            ]),
            FieldKind::CheckboxMatrix(table) => Answer::BoolGrid(vec![
                vec![false; table.column_labels.len()];
                table.row_labels.len()
            ]),
        }
    }

    /// Whether the answer has the shape `field` expects.
    pub fn fits(&self, field: &Field) -> bool {
        matches!(
            (self, &field.kind),
            (
                Answer::Text(_),
                FieldKind::Text
                    | FieldKind::Email
                    | FieldKind::Date
                    | FieldKind::Select { .. }
                    | FieldKind::Radio { .. }
            ) | (Answer::Choices(_), FieldKind::Checkbox { .. })
                | (Answer::TextGrid(_), FieldKind::Multiple(_))
                | (Answer::BoolGrid(_), FieldKind::CheckboxMatrix(_))
        )
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Answer::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_choices(&self) -> Option<&[String]> {
        match self {
            Answer::Choices(values) => Some(values),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("'{label}' is a {actual} field and does not support {operation}")]
    KindMismatch {
        label: String,
        actual: FieldType,
        operation: &'static str,
    },
    #[error("no field with id '{0}'")]
    UnknownField(FieldId),
}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("failed to encode draft: {0}")]
    Encode(#[source] serde_cbor::Error),
    #[error("failed to decode draft: {0}")]
    Decode(#[source] serde_cbor::Error),
}

/// In-progress answers keyed by stable field id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseStore {
    answers: BTreeMap<FieldId, Answer>,
}

impl ResponseStore {
    /// Store with an empty answer for every field of `schema`.
    pub fn for_schema(schema: &Schema) -> Self {
        let answers = schema
            .all_fields()
            .into_iter()
            .map(|field| (field.id.clone(), Answer::empty_for(field)))
            .collect();
        Self { answers }
    }

    /// Rebuilds a store from a label-keyed submission payload.
    pub fn from_payload(schema: &Schema, payload: &serde_json::Value) -> Self {
        crate::payload::import_response(schema, payload)
    }

    pub fn get(&self, id: &FieldId) -> Option<&Answer> {
        self.answers.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &Answer)> {
        self.answers.iter()
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Replaces the answer for `field` without shape checks.
    pub(crate) fn insert(&mut self, field: &Field, answer: Answer) {
        self.answers.insert(field.id.clone(), answer);
    }

    /// Sets the value of a scalar field.
    pub fn set(&mut self, field: &Field, value: impl Into<String>) -> Result<(), ResponseError> {
        match &field.kind {
            FieldKind::Text
            | FieldKind::Email
            | FieldKind::Date
            | FieldKind::Select { .. }
            | FieldKind::Radio { .. } => {
                self.answers
                    .insert(field.id.clone(), Answer::Text(value.into()));
                Ok(())
            }
            _ => Err(mismatch(field, "a scalar value")),
        }
    }

    /// Adds `option` to a checkbox answer, or removes it when already ticked.
    pub fn toggle(&mut self, field: &Field, option: &str) -> Result<(), ResponseError> {
        if !matches!(field.kind, FieldKind::Checkbox { .. }) {
            return Err(mismatch(field, "toggling an option"));
        }
        let entry = self
            .answers
            .entry(field.id.clone())
            .or_insert_with(|| Answer::Choices(Vec::new()));
        if !matches!(entry, Answer::Choices(_)) {
            *entry = Answer::Choices(Vec::new());
        }
        if let Answer::Choices(values) = entry {
            if let Some(position) = values.iter().position(|value| value == option) {
                values.remove(position);
            } else {
                values.push(option.to_string());
            }
        }
        Ok(())
    }

    /// Writes one cell of a `multiple` answer, growing the grid when the
    /// schema and the stored grid have drifted apart.
    pub fn set_cell(
        &mut self,
        field: &Field,
        row: usize,
        column: usize,
        value: impl Into<String>,
    ) -> Result<(), ResponseError> {
        let FieldKind::Multiple(table) = &field.kind else {
            return Err(mismatch(field, "text cells"));
        };
        let width = (column + 1).max(table.column_labels.len());
        self.with_text_grid(field, |grid| {
            grow(grid, row + 1, width, String::new());
            grid[row][column] = value.into();
        });
        Ok(())
    }

    /// Flips one cell of a `checkbox-matrix` answer.
    pub fn toggle_cell(
        &mut self,
        field: &Field,
        row: usize,
        column: usize,
    ) -> Result<(), ResponseError> {
        let FieldKind::CheckboxMatrix(table) = &field.kind else {
            return Err(mismatch(field, "checkbox cells"));
        };
        let mut grid = match self.answers.remove(&field.id) {
            Some(Answer::BoolGrid(grid)) => grid,
            _ => {
                debug!(field = %field.id, "initializing checkbox matrix answer");
                vec![vec![false; table.column_labels.len()]; table.row_labels.len()]
            }
        };
        grow(
            &mut grid,
            row + 1,
            (column + 1).max(table.column_labels.len()),
            false,
        );
        grid[row][column] = !grid[row][column];
        self.answers
            .insert(field.id.clone(), Answer::BoolGrid(grid));
        Ok(())
    }

    /// Appends a blank respondent row to a `multiple` answer.
    pub fn add_row(&mut self, field: &Field) -> Result<(), ResponseError> {
        let FieldKind::Multiple(table) = &field.kind else {
            return Err(mismatch(field, "adding rows"));
        };
        let width = table.column_labels.len();
        self.with_text_grid(field, |grid| grid.push(vec![String::new(); width]));
        Ok(())
    }

    pub fn remove_row(&mut self, field: &Field, index: usize) -> Result<(), ResponseError> {
        if !matches!(field.kind, FieldKind::Multiple(_)) {
            return Err(mismatch(field, "removing rows"));
        }
        self.with_text_grid(field, |grid| {
            if index < grid.len() {
                grid.remove(index);
            }
        });
        Ok(())
    }

    /// Drops answers for fields that no longer exist or changed shape and
    /// fills in defaults for new fields.
    pub fn reconcile(&self, schema: &Schema) -> ResponseStore {
        let answers = schema
            .all_fields()
            .into_iter()
            .map(|field| {
                let answer = self
                    .answers
                    .get(&field.id)
                    .filter(|answer| answer.fits(field))
                    .cloned()
                    .unwrap_or_else(|| Answer::empty_for(field));
                (field.id.clone(), answer)
            })
            .collect();
        ResponseStore { answers }
    }

    /// Encodes the store as a CBOR draft.
    pub fn to_cbor(&self) -> Result<Vec<u8>, DraftError> {
        serde_cbor::to_vec(self).map_err(DraftError::Encode)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, DraftError> {
        serde_cbor::from_slice(bytes).map_err(DraftError::Decode)
    }

    fn with_text_grid(&mut self, field: &Field, edit: impl FnOnce(&mut Vec<Vec<String>>)) {
        let mut grid = match self.answers.remove(&field.id) {
            Some(Answer::TextGrid(grid)) => grid,
            _ => match Answer::empty_for(field) {
                Answer::TextGrid(grid) => grid,
                _ => Vec::new(),
            },
        };
        edit(&mut grid);
        self.answers
            .insert(field.id.clone(), Answer::TextGrid(grid));
    }
}

fn mismatch(field: &Field, operation: &'static str) -> ResponseError {
    ResponseError::KindMismatch {
        label: field.label.clone(),
        actual: field.field_type(),
        operation,
    }
}

/// Grows `grid` to at least `rows × columns`, keeping it rectangular.
fn grow<T: Clone>(grid: &mut Vec<Vec<T>>, rows: usize, columns: usize, filler: T) {
    let width = grid.iter().map(Vec::len).max().unwrap_or(0).max(columns);
    if grid.len() < rows {
        grid.resize(rows, Vec::new());
    }
    for row in grid.iter_mut() {
        if row.len() < width {
            row.resize(width, filler.clone());
        }
    }
}
