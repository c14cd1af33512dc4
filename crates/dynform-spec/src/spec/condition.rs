use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single dependency on another field's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Condition {
    /// Field reference: a field id once bound, otherwise a key or label.
    pub key: String,
    #[serde(default)]
    pub equals: Value,
}

impl Condition {
    pub fn new(key: impl Into<String>, equals: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            equals: equals.into(),
        }
    }
}

/// How the conditions of a group combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    #[serde(alias = "and")]
    And,
    #[default]
    #[serde(alias = "or")]
    Or,
}

/// Conditional visibility rule attached to a field.
///
/// The three persisted shapes are kept as written so a load/save round trip
/// does not rewrite authors' rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ShowWhen {
    Group {
        conditions: Vec<Condition>,
        #[serde(default)]
        logic: Logic,
    },
    AnyOf(Vec<Condition>),
    Single(Condition),
}

impl ShowWhen {
    pub fn conditions(&self) -> &[Condition] {
        match self {
            ShowWhen::Group { conditions, .. } => conditions,
            ShowWhen::AnyOf(conditions) => conditions,
            ShowWhen::Single(condition) => std::slice::from_ref(condition),
        }
    }

    pub fn conditions_mut(&mut self) -> &mut [Condition] {
        match self {
            ShowWhen::Group { conditions, .. } => conditions,
            ShowWhen::AnyOf(conditions) => conditions,
            ShowWhen::Single(condition) => std::slice::from_mut(condition),
        }
    }

    /// Only an explicit `{conditions, logic: "AND"}` group requires all.
    pub fn logic(&self) -> Logic {
        match self {
            ShowWhen::Group { logic, .. } => *logic,
            _ => Logic::Or,
        }
    }
}
