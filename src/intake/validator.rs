use std::collections::BTreeMap;
use std::fmt;

use crate::errors::AppError;
use crate::models::field::Field;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// Carries the field's label, which is what the submitter sees.
    MissingRequiredField(String),
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionError::MissingRequiredField(label) => write!(f, "Field \"{label}\" is required"),
        }
    }
}

impl From<SubmissionError> for AppError {
    fn from(e: SubmissionError) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Check a submission for presence of every required field, in field order,
/// stopping at the first miss.
///
/// `uploaded_to` holds the field name of every accepted upload. Only presence
/// is checked: no format validation of emails, phone numbers or options.
pub fn validate<'a, I>(fields: &[Field], payload: &BTreeMap<String, String>, uploaded_to: I) -> Result<(), SubmissionError>
where
    I: IntoIterator<Item = &'a str>,
{
    let uploaded: Vec<&str> = uploaded_to.into_iter().collect();

    for field in fields.iter().filter(|f| f.required) {
        let present = if field.is_file() {
            uploaded.iter().any(|name| *name == field.name)
        } else {
            payload.get(&field.name).is_some_and(|v| !v.trim().is_empty())
        };
        if !present {
            return Err(SubmissionError::MissingRequiredField(field.label.clone()));
        }
    }
    Ok(())
}

/// Keep only the answers that belong to a non-file field of the schema.
pub fn collect_answers(fields: &[Field], payload: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    fields
        .iter()
        .filter(|f| !f.is_file())
        .filter_map(|f| payload.get(&f.name).map(|v| (f.name.clone(), v.clone())))
        .collect()
}
