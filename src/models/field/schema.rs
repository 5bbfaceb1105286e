use std::collections::HashSet;
use std::fmt;

use serde_json::Value;
use uuid::Uuid;

use super::types::{Field, FieldType};

/// Default storage key for a field, derived from its label.
///
/// Lowercases, keeps `[a-z0-9_]` and whitespace, then joins the remaining
/// words with single underscores. Underscores survive so that a derived name
/// fed back in is returned unchanged.
pub fn derive_name(label: &str) -> String {
    let kept: String = label
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("_")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    NotAnObject { index: usize },
    MissingLabel { index: usize },
    UnknownType { index: usize, value: String },
    MissingOptions { index: usize, label: String },
    EmptyName { index: usize, label: String },
    DuplicateName { name: String },
    DuplicateId { id: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::NotAnObject { index } => write!(f, "Field {} must be an object", index + 1),
            SchemaError::MissingLabel { index } => write!(f, "Field {} needs a label", index + 1),
            SchemaError::UnknownType { index, value } => {
                write!(f, "Field {} has unknown type \"{value}\"", index + 1)
            }
            SchemaError::MissingOptions { label, .. } => {
                write!(f, "Field \"{label}\" needs a list of options")
            }
            SchemaError::EmptyName { label, .. } => {
                write!(f, "Field \"{label}\" needs a name")
            }
            SchemaError::DuplicateName { name } => {
                write!(f, "Field name \"{name}\" is used more than once")
            }
            SchemaError::DuplicateId { id } => write!(f, "Field id \"{id}\" is used more than once"),
        }
    }
}

/// Join schema errors into one client-facing sentence list.
pub fn describe(errors: &[SchemaError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

fn str_of<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

/// Check the shape of a raw field list and normalize it into typed fields.
///
/// Every error is collected rather than stopping at the first. A missing or
/// blank `name` is filled from the label; options are kept only for choice
/// types and placeholders are dropped for file fields.
pub fn validate_schema(raw: &[Value]) -> Result<Vec<Field>, Vec<SchemaError>> {
    let mut errors = Vec::new();
    let mut fields = Vec::with_capacity(raw.len());

    for (index, value) in raw.iter().enumerate() {
        let Some(obj) = value.as_object() else {
            errors.push(SchemaError::NotAnObject { index });
            continue;
        };

        let label = str_of(obj, "label").map(str::trim).unwrap_or("");
        if label.is_empty() {
            errors.push(SchemaError::MissingLabel { index });
        }

        let type_str = str_of(obj, "type").unwrap_or("");
        let Some(field_type) = FieldType::parse(type_str) else {
            errors.push(SchemaError::UnknownType { index, value: type_str.to_string() });
            continue;
        };

        let options = if field_type.has_options() {
            match obj.get("options").and_then(Value::as_array) {
                Some(items) => Some(
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect::<Vec<_>>(),
                ),
                None => {
                    errors.push(SchemaError::MissingOptions { index, label: label.to_string() });
                    None
                }
            }
        } else {
            None
        };

        let name = match str_of(obj, "name").map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => derive_name(label),
        };
        if name.is_empty() && !label.is_empty() {
            errors.push(SchemaError::EmptyName { index, label: label.to_string() });
        }

        let id = match obj.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => format!("field_{}", Uuid::new_v4().simple()),
        };

        let placeholder = if field_type == FieldType::File {
            None
        } else {
            str_of(obj, "placeholder").map(String::from)
        };

        fields.push(Field {
            id,
            name,
            label: label.to_string(),
            field_type,
            placeholder,
            required: obj.get("required").and_then(Value::as_bool).unwrap_or(false),
            options,
        });
    }

    let mut seen_names = HashSet::new();
    let mut seen_ids = HashSet::new();
    for field in &fields {
        if !field.name.is_empty() && !seen_names.insert(field.name.as_str()) {
            let err = SchemaError::DuplicateName { name: field.name.clone() };
            if !errors.contains(&err) {
                errors.push(err);
            }
        }
        if !seen_ids.insert(field.id.as_str()) {
            errors.push(SchemaError::DuplicateId { id: field.id.clone() });
        }
    }

    if errors.is_empty() { Ok(fields) } else { Err(errors) }
}
