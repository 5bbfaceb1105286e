use std::fmt;

use actix_web::web::Bytes;
use futures_util::future::join_all;
use uuid::Uuid;

use crate::models::submission::FileRecord;
use crate::storage::BlobStore;

pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
    "text/csv",
];

/// One file part of a submission as it came off the wire.
///
/// `size` counts every byte the client sent; once it passes the limit the
/// reader stops buffering, so `bytes` may hold less than `size`.
#[derive(Debug, Clone)]
pub struct UploadedPart {
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    TooLarge { size: usize, limit: usize },
    DisallowedType(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TooLarge { size, limit } => write!(f, "{size} bytes exceeds the {limit} byte limit"),
            Rejection::DisallowedType(ct) => write!(f, "content type {ct} is not allowed"),
        }
    }
}

fn is_allowed_type(content_type: &str) -> bool {
    // Ignore parameters such as "; charset=utf-8".
    let essence = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    ALLOWED_CONTENT_TYPES.contains(&essence.as_str())
}

/// Size and type check for one part. Runs before any storage call.
pub fn screen(part: &UploadedPart, limit: usize) -> Result<(), Rejection> {
    if part.size > limit {
        return Err(Rejection::TooLarge { size: part.size, limit });
    }
    if !is_allowed_type(&part.content_type) {
        return Err(Rejection::DisallowedType(part.content_type.clone()));
    }
    Ok(())
}

/// Split parts into those that pass `screen` and those that do not.
pub fn partition(parts: Vec<UploadedPart>, limit: usize) -> (Vec<UploadedPart>, Vec<(UploadedPart, Rejection)>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for part in parts {
        match screen(&part, limit) {
            Ok(()) => accepted.push(part),
            Err(reason) => rejected.push((part, reason)),
        }
    }
    (accepted, rejected)
}

/// File name reduced to a safe key segment: last path component, with
/// anything outside `[A-Za-z0-9._-]` replaced by `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() { "file".to_string() } else { cleaned }
}

/// Globally unique blob key for an upload.
pub fn storage_key(file_name: &str) -> String {
    format!("{}-{}", Uuid::new_v4(), sanitize_file_name(file_name))
}

/// Outcome of storing a batch of parts.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Confirmed uploads, in input order.
    pub stored: Vec<FileRecord>,
    /// Field names of parts whose upload failed.
    pub failed: Vec<String>,
}

/// Upload every part concurrently. `accepted` must come out of `partition`.
///
/// A failed upload is logged and skipped; the rest of the batch carries on.
/// Only uploads the store has confirmed end up in `stored`.
pub async fn ingest(store: &dyn BlobStore, accepted: Vec<UploadedPart>) -> IngestReport {
    let uploads = accepted.into_iter().map(|part| async move {
        let key = storage_key(&part.file_name);
        let result = store.upload(&key, part.bytes.clone(), &part.content_type).await;
        (part, result)
    });

    let mut report = IngestReport::default();
    for (part, result) in join_all(uploads).await {
        match result {
            Ok(path) => report.stored.push(FileRecord {
                name: part.file_name,
                path,
                size: part.size as i64,
                content_type: part.content_type,
                field_name: part.field_name,
            }),
            Err(e) => {
                log::error!("File upload error for '{}': {}", part.file_name, e);
                report.failed.push(part.field_name);
            }
        }
    }
    report
}
