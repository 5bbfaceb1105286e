use std::collections::BTreeMap;

use actix_multipart::{Field as MultipartField, Multipart};
use actix_web::web::{Bytes, BytesMut};
use futures_util::StreamExt;

use super::files::UploadedPart;
use crate::errors::AppError;

/// Longest accepted text value per part.
const MAX_TEXT_BYTES: usize = 64 * 1024;

/// Most file parts one submission may carry.
const MAX_FILE_PARTS: usize = 20;

/// A parsed multipart submission.
#[derive(Debug, Default)]
pub struct SubmissionBody {
    /// Text values by part name. Repeated names are joined with ", ".
    pub values: BTreeMap<String, String>,
    pub files: Vec<UploadedPart>,
}

impl SubmissionBody {
    fn push_value(&mut self, name: String, value: String) {
        self.values
            .entry(name)
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
}

fn bad_request(e: impl std::fmt::Display) -> AppError {
    AppError::Validation(format!("Malformed form data: {e}"))
}

/// Drain one part, buffering at most `limit` bytes but counting all of them.
/// The part went over the limit when the returned size exceeds `limit`.
async fn read_part(field: &mut MultipartField, limit: usize) -> Result<(usize, Bytes), AppError> {
    let mut buf = BytesMut::new();
    let mut total = 0usize;
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(bad_request)?;
        total += chunk.len();
        if total <= limit {
            buf.extend_from_slice(&chunk);
        }
    }
    Ok((total, buf.freeze()))
}

/// Read a multipart body into text values and file parts.
///
/// Parts with a filename are files; everything else is a text value. Files
/// above `file_limit` are still read to the end so that the size is known, but
/// their content is not kept. Text values must be valid UTF-8 and at most
/// `MAX_TEXT_BYTES` long.
pub async fn read_submission(mut payload: Multipart, file_limit: usize) -> Result<SubmissionBody, AppError> {
    let mut body = SubmissionBody::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(bad_request)?;

        let (name, file_name) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().unwrap_or_default().to_string(),
                cd.get_filename().map(String::from),
            ),
            None => (String::new(), None),
        };
        if name.is_empty() {
            read_part(&mut field, 0).await?;
            continue;
        }

        match file_name {
            Some(file_name) => {
                if body.files.len() >= MAX_FILE_PARTS {
                    return Err(AppError::Validation(format!(
                        "Too many files; at most {MAX_FILE_PARTS} per submission"
                    )));
                }
                let content_type = field
                    .content_type()
                    .map(|m| m.essence_str().to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let (size, bytes) = read_part(&mut field, file_limit).await?;
                body.files.push(UploadedPart {
                    field_name: name,
                    file_name,
                    content_type,
                    size,
                    bytes,
                });
            }
            None => {
                let (size, bytes) = read_part(&mut field, MAX_TEXT_BYTES).await?;
                if size > MAX_TEXT_BYTES {
                    return Err(AppError::Validation(format!("Field \"{name}\" is too long")));
                }
                let value = String::from_utf8(bytes.to_vec())
                    .map_err(|_| AppError::Validation(format!("Field \"{name}\" is not valid text")))?;
                body.push_value(name, value);
            }
        }
    }

    Ok(body)
}
