use chrono::Utc;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::errors::AppError;
use super::types::*;

const SUBMISSION_COLUMNS: &str = "id, form_id, data, files, ip_address, user_agent, created_at";

/// Insert one submission row with a fresh id and the current server time.
pub async fn insert(pool: &PgPool, new: &NewSubmission) -> Result<Submission, AppError> {
    let sql = format!(
        "INSERT INTO submissions (id, form_id, data, files, ip_address, user_agent, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {SUBMISSION_COLUMNS}"
    );
    let submission = sqlx::query_as::<_, Submission>(&sql)
        .bind(Uuid::new_v4())
        .bind(new.form_id)
        .bind(Json(&new.data))
        .bind(Json(&new.files))
        .bind(new.ip_address.as_deref())
        .bind(new.user_agent.as_deref())
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;
    Ok(submission)
}

/// Submissions of a form, newest first.
pub async fn list_by_form(pool: &PgPool, form_id: Uuid) -> Result<Vec<Submission>, AppError> {
    let sql = format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions \
         WHERE form_id = $1 \
         ORDER BY created_at DESC, id"
    );
    let rows = sqlx::query_as::<_, Submission>(&sql)
        .bind(form_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Find a submission whose form belongs to `user_id`.
pub async fn find_owned(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Option<Submission>, AppError> {
    let submission = sqlx::query_as::<_, Submission>(
        "SELECT s.id, s.form_id, s.data, s.files, s.ip_address, s.user_agent, s.created_at \
         FROM submissions s \
         JOIN forms f ON f.id = s.form_id \
         WHERE s.id = $1 AND f.user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(submission)
}

/// Delete a submission if its form belongs to `user_id`, returning its files.
pub async fn delete_owned(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Vec<FileRecord>>, AppError> {
    let files: Option<Json<Vec<FileRecord>>> = sqlx::query_scalar(
        "DELETE FROM submissions s USING forms f \
         WHERE s.id = $1 AND s.form_id = f.id AND f.user_id = $2 \
         RETURNING s.files",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(files.map(|f| f.0))
}
