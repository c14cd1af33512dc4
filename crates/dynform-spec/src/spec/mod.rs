pub mod condition;
pub mod field;
pub mod schema;

pub use condition::{Condition, Logic, ShowWhen};
pub use field::{Field, FieldId, FieldKind, FieldType, Table};
pub use schema::{Schema, Section};
