use std::collections::BTreeMap;

use actix_web::HttpRequest;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::form::Form;
use crate::models::submission::{self, FileRecord, NewSubmission, Submission};
use crate::storage::BlobStore;
use super::validator::collect_answers;

/// Client details recorded with a submission.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn from_request(req: &HttpRequest) -> Self {
        RequestMeta {
            ip_address: req.connection_info().realip_remote_addr().map(String::from),
            user_agent: req
                .headers()
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .map(String::from),
        }
    }
}

/// Write one submission row with the schema's answers and the files that
/// made it to storage.
pub async fn record(
    pool: &PgPool,
    form: &Form,
    payload: &BTreeMap<String, String>,
    files: Vec<FileRecord>,
    meta: RequestMeta,
) -> Result<Submission, AppError> {
    let new = NewSubmission {
        form_id: form.id,
        data: collect_answers(&form.fields, payload),
        files,
        ip_address: meta.ip_address,
        user_agent: meta.user_agent,
    };
    submission::insert(pool, &new).await
}

pub async fn list_by_form(pool: &PgPool, form_id: Uuid) -> Result<Vec<Submission>, AppError> {
    submission::list_by_form(pool, form_id).await
}

/// Remove blobs, logging instead of failing.
pub async fn remove_blobs(store: &dyn BlobStore, files: &[FileRecord]) {
    if files.is_empty() {
        return;
    }
    let paths: Vec<String> = files.iter().map(|f| f.path.clone()).collect();
    if let Err(e) = store.remove(&paths).await {
        log::error!("Error deleting {} stored file(s): {}", paths.len(), e);
    }
}

/// Delete a submission owned (through its form) by `caller_id`, then its blobs.
///
/// The ownership check and the row delete are a single statement. Blob removal
/// is best-effort. Returns `NotFound` for missing and foreign submissions alike.
pub async fn delete(
    pool: &PgPool,
    store: &dyn BlobStore,
    submission_id: Uuid,
    caller_id: Uuid,
) -> Result<(), AppError> {
    let files = submission::delete_owned(pool, submission_id, caller_id)
        .await?
        .ok_or_else(|| AppError::not_found("Submission"))?;
    remove_blobs(store, &files).await;
    Ok(())
}
