use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::spec::condition::ShowWhen;

/// Stable identifier assigned once when a field is created.
///
/// Labels and keys stay editable; the response store and bound `showWhen`
/// references only ever use this id.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct FieldId(String);

const LOADED_FIELDS: Uuid = Uuid::from_u128(0x6f1c_2b9e_4d7a_5e30_9b42_8c1d_e0f5_a763);

impl FieldId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Id for a field loaded without one. The same document always yields
    /// the same ids, so drafts keyed by id survive a reload.
    pub fn derive(section: usize, key: &str, label: &str, ordinal: usize) -> Self {
        let name = format!("{section}\u{1f}{key}\u{1f}{label}\u{1f}{ordinal}");
        Self(Uuid::new_v5(&LOADED_FIELDS, name.as_bytes()).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unset(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for FieldId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FieldId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Row labels, column labels and the cell grid of a table question.
///
/// Once repaired, `table_data` holds exactly `row_labels.len()` rows of
/// `column_labels.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Table<T> {
    #[serde(default)]
    pub row_labels: Vec<String>,
    #[serde(default)]
    pub column_labels: Vec<String>,
    #[serde(default)]
    pub table_data: Vec<Vec<T>>,
}

/// Field variants keyed by the `type` tag of the persisted schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FieldKind {
    #[default]
    Text,
    Email,
    Date,
    Select {
        #[serde(default)]
        options: Vec<String>,
    },
    Radio {
        #[serde(default)]
        options: Vec<String>,
    },
    Checkbox {
        #[serde(default)]
        options: Vec<String>,
    },
    Multiple(Table<String>),
    CheckboxMatrix(Table<bool>),
}

impl FieldKind {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldKind::Text => FieldType::Text,
            FieldKind::Email => FieldType::Email,
            FieldKind::Date => FieldType::Date,
            FieldKind::Select { .. } => FieldType::Select,
            FieldKind::Radio { .. } => FieldType::Radio,
            FieldKind::Checkbox { .. } => FieldType::Checkbox,
            FieldKind::Multiple(_) => FieldType::Multiple,
            FieldKind::CheckboxMatrix(_) => FieldType::CheckboxMatrix,
        }
    }

    pub fn options(&self) -> Option<&[String]> {
        match self {
            FieldKind::Select { options }
            | FieldKind::Radio { options }
            | FieldKind::Checkbox { options } => Some(options),
            _ => None,
        }
    }

    pub fn options_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            FieldKind::Select { options }
            | FieldKind::Radio { options }
            | FieldKind::Checkbox { options } => Some(options),
            _ => None,
        }
    }

    /// Row and column labels for table kinds.
    pub fn table_labels(&self) -> Option<(&[String], &[String])> {
        match self {
            FieldKind::Multiple(table) => Some((&table.row_labels, &table.column_labels)),
            FieldKind::CheckboxMatrix(table) => Some((&table.row_labels, &table.column_labels)),
            _ => None,
        }
    }

    /// Builds an empty kind for `field_type`, carrying options over when both
    /// sides are option based.
    pub fn convert(&self, field_type: FieldType) -> FieldKind {
        let options = self.options().map(<[String]>::to_vec).unwrap_or_default();
        match field_type {
            FieldType::Text => FieldKind::Text,
            FieldType::Email => FieldKind::Email,
            FieldType::Date => FieldKind::Date,
            FieldType::Select => FieldKind::Select { options },
            FieldType::Radio => FieldKind::Radio { options },
            FieldType::Checkbox => FieldKind::Checkbox { options },
            FieldType::Multiple => match self {
                FieldKind::CheckboxMatrix(table) => FieldKind::Multiple(Table {
                    row_labels: table.row_labels.clone(),
                    column_labels: table.column_labels.clone(),
                    table_data: Vec::new(),
                }),
                FieldKind::Multiple(table) => FieldKind::Multiple(table.clone()),
                _ => FieldKind::Multiple(Table::default()),
            },
            FieldType::CheckboxMatrix => match self {
                FieldKind::Multiple(table) => FieldKind::CheckboxMatrix(Table {
                    row_labels: table.row_labels.clone(),
                    column_labels: table.column_labels.clone(),
                    table_data: Vec::new(),
                }),
                FieldKind::CheckboxMatrix(table) => FieldKind::CheckboxMatrix(table.clone()),
                _ => FieldKind::CheckboxMatrix(Table::default()),
            },
        }
    }
}

/// Payload-free mirror of [`FieldKind`], used when switching a field's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Email,
    Date,
    Select,
    Radio,
    Checkbox,
    Multiple,
    CheckboxMatrix,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Multiple => "multiple",
            FieldType::CheckboxMatrix => "checkbox-matrix",
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, FieldType::Multiple | FieldType::CheckboxMatrix)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "text" => Ok(FieldType::Text),
            "email" => Ok(FieldType::Email),
            "date" => Ok(FieldType::Date),
            "select" => Ok(FieldType::Select),
            "radio" => Ok(FieldType::Radio),
            "checkbox" => Ok(FieldType::Checkbox),
            "multiple" => Ok(FieldType::Multiple),
            "checkbox-matrix" | "checkbox_matrix" => Ok(FieldType::CheckboxMatrix),
            _ => Err(format!("unknown field type '{}'", value)),
        }
    }
}

/// One question of a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Field {
    #[serde(default, skip_serializing_if = "FieldId::is_unset")]
    pub id: FieldId,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "showWhen", skip_serializing_if = "Option::is_none")]
    pub show_when: Option<ShowWhen>,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl Field {
    /// Creates a field with a freshly generated id.
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: FieldId::generate(),
            key: key.into(),
            label: label.into(),
            required: false,
            show_when: None,
            kind,
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    /// Whether `reference` names this field by id, key or label.
    pub fn answers_to(&self, reference: &str) -> bool {
        self.id.as_str() == reference || self.key == reference || self.label == reference
    }
}
