use actix_web::http::header::ContentDisposition;
use actix_web::{HttpResponse, web};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{AuthUser, access};
use crate::errors::{AppError, ResultExt};
use crate::intake::persister;
use crate::models::submission;
use crate::storage::BlobStore;
use crate::templates_structs::{MessageResponse, SubmissionListResponse};

/// GET /api/submissions/form/{form_id} - Submissions of an owned form, newest first
pub async fn list(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let form_id = path.into_inner();

    access::ensure_owner(&pool, form_id, user.id())
        .await
        .or_fail("Error loading submissions")?;
    let submissions = persister::list_by_form(&pool, form_id)
        .await
        .or_fail("Error loading submissions")?;

    Ok(HttpResponse::Ok().json(SubmissionListResponse { submissions }))
}

/// GET /api/submissions/file/{submission_id}/{file_name} - Download an attachment
pub async fn download(
    pool: web::Data<PgPool>,
    store: web::Data<dyn BlobStore>,
    user: AuthUser,
    path: web::Path<(Uuid, String)>,
) -> Result<HttpResponse, AppError> {
    let (submission_id, file_name) = path.into_inner();

    let submission = submission::find_owned(&pool, submission_id, user.id())
        .await
        .or_fail("Error downloading file")?
        .ok_or_else(|| AppError::not_found("Submission"))?;
    let file = submission
        .file_named(&file_name)
        .ok_or_else(|| AppError::not_found("File"))?;

    let bytes = store.download(&file.path).await.map_err(|e| {
        log::error!("Error downloading {} for submission {}: {}", file.path, submission_id, e);
        AppError::NotFound("File could not be downloaded".to_string())
    })?;

    Ok(HttpResponse::Ok()
        .content_type(file.content_type.as_str())
        .insert_header(ContentDisposition::attachment(file.name.clone()))
        .body(bytes))
}

/// DELETE /api/submissions/{id} - Delete a submission and its files
pub async fn delete(
    pool: web::Data<PgPool>,
    store: web::Data<dyn BlobStore>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let submission_id = path.into_inner();

    persister::delete(&pool, store.get_ref(), submission_id, user.id())
        .await
        .or_fail("Error deleting submission")?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Submission deleted successfully")))
}
