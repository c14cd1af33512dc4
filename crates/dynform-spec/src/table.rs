//! Keeps the label arrays and cell grid of table questions in step.
//!
//! Every operation here leaves `table_data` at exactly
//! `row_labels.len() × column_labels.len()`.

use crate::spec::field::{Field, FieldKind, Table};

/// Cell payload of a table question.
pub trait Cell: Clone + Default {
    fn is_blank(&self) -> bool;
}

impl Cell for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Cell for bool {
    fn is_blank(&self) -> bool {
        !*self
    }
}

/// Pads or truncates the grid to the label dimensions.
pub fn repair<T: Cell>(table: &mut Table<T>) {
    let rows = table.row_labels.len();
    let columns = table.column_labels.len();
    table.table_data.resize_with(rows, Vec::new);
    for row in &mut table.table_data {
        row.resize_with(columns, T::default);
    }
}

pub fn is_rectangular<T>(table: &Table<T>) -> bool {
    table.table_data.len() == table.row_labels.len()
        && table
            .table_data
            .iter()
            .all(|row| row.len() == table.column_labels.len())
}

fn push_row<T: Cell>(table: &mut Table<T>) {
    repair(table);
    table.row_labels.push(String::new());
    table
        .table_data
        .push(vec![T::default(); table.column_labels.len()]);
}

fn push_column<T: Cell>(table: &mut Table<T>) {
    repair(table);
    table.column_labels.push(String::new());
    for row in &mut table.table_data {
        row.push(T::default());
    }
}

fn drop_row<T: Cell>(table: &mut Table<T>, index: usize) {
    repair(table);
    if index < table.row_labels.len() {
        table.row_labels.remove(index);
        table.table_data.remove(index);
    }
}

fn drop_column<T: Cell>(table: &mut Table<T>, index: usize) {
    repair(table);
    if index < table.column_labels.len() {
        table.column_labels.remove(index);
        for row in &mut table.table_data {
            row.remove(index);
        }
    }
}

fn rename(labels: &mut [String], index: usize, text: &str) {
    if let Some(label) = labels.get_mut(index) {
        *label = text.to_string();
    }
}

/// Appends an empty row label and a blank data row.
pub fn add_row_label(field: &Field) -> Field {
    let mut next = field.clone();
    match &mut next.kind {
        FieldKind::Multiple(table) => push_row(table),
        FieldKind::CheckboxMatrix(table) => push_row(table),
        _ => {}
    }
    next
}

/// Appends an empty column label and widens every data row.
pub fn add_column_label(field: &Field) -> Field {
    let mut next = field.clone();
    match &mut next.kind {
        FieldKind::Multiple(table) => push_column(table),
        FieldKind::CheckboxMatrix(table) => push_column(table),
        _ => {}
    }
    next
}

pub fn remove_row_label(field: &Field, index: usize) -> Field {
    let mut next = field.clone();
    match &mut next.kind {
        FieldKind::Multiple(table) => drop_row(table, index),
        FieldKind::CheckboxMatrix(table) => drop_row(table, index),
        _ => {}
    }
    next
}

pub fn remove_column_label(field: &Field, index: usize) -> Field {
    let mut next = field.clone();
    match &mut next.kind {
        FieldKind::Multiple(table) => drop_column(table, index),
        FieldKind::CheckboxMatrix(table) => drop_column(table, index),
        _ => {}
    }
    next
}

pub fn set_row_label(field: &Field, index: usize, text: &str) -> Field {
    let mut next = field.clone();
    match &mut next.kind {
        FieldKind::Multiple(table) => rename(&mut table.row_labels, index, text),
        FieldKind::CheckboxMatrix(table) => rename(&mut table.row_labels, index, text),
        _ => {}
    }
    next
}

pub fn set_column_label(field: &Field, index: usize, text: &str) -> Field {
    let mut next = field.clone();
    match &mut next.kind {
        FieldKind::Multiple(table) => rename(&mut table.column_labels, index, text),
        FieldKind::CheckboxMatrix(table) => rename(&mut table.column_labels, index, text),
        _ => {}
    }
    next
}

/// Drops rows whose label is blank and whose cells are all blank.
fn drop_blank_rows<T: Cell>(table: &mut Table<T>) {
    repair(table);
    let (labels, rows): (Vec<_>, Vec<_>) = table
        .row_labels
        .drain(..)
        .zip(table.table_data.drain(..))
        .filter(|(label, cells)| {
            !(label.trim().is_empty() && cells.iter().all(|cell| cell.is_blank()))
        })
        .unzip();
    table.row_labels = labels;
    table.table_data = rows;
}

fn drop_blank_columns<T: Cell>(table: &mut Table<T>) {
    repair(table);
    let keep = table
        .column_labels
        .iter()
        .map(|label| !label.trim().is_empty())
        .collect::<Vec<_>>();
    table.column_labels.retain(|label| !label.trim().is_empty());
    for row in &mut table.table_data {
        let mut flags = keep.iter();
        row.retain(|_| flags.next().copied().unwrap_or(false));
    }
}

/// Persistence-time compaction of a single field. Idempotent.
///
/// Only run right before saving; running it while an author is typing would
/// delete freshly added blank rows.
pub fn clean_table_data(field: &Field) -> Field {
    let mut next = field.clone();
    match &mut next.kind {
        FieldKind::CheckboxMatrix(table) => drop_blank_rows(table),
        FieldKind::Multiple(table) => {
            drop_blank_columns(table);
            drop_blank_rows(table);
        }
        FieldKind::Select { options }
        | FieldKind::Radio { options }
        | FieldKind::Checkbox { options } => {
            options.retain(|option| !option.trim().is_empty());
        }
        FieldKind::Text | FieldKind::Email | FieldKind::Date => {}
    }
    next
}
