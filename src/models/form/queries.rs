use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::submission::FileRecord;
use super::types::*;

const FORM_COLUMNS: &str = "id, user_id, name, description, fields, settings, is_active, created_at, updated_at";

/// Insert a new, active form owned by `user_id`.
pub async fn create(pool: &PgPool, user_id: Uuid, new: &NewForm) -> Result<Form, AppError> {
    let sql = format!(
        "INSERT INTO forms (id, user_id, name, description, fields, settings, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, TRUE) \
         RETURNING {FORM_COLUMNS}"
    );
    let form = sqlx::query_as::<_, Form>(&sql)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(Json(&new.fields))
        .bind(Json(&new.settings))
        .fetch_one(pool)
        .await?;
    Ok(form)
}

/// Find a form only if it is active. Used by the public read and submit paths.
pub async fn find_active_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Form>, AppError> {
    let sql = format!("SELECT {FORM_COLUMNS} FROM forms WHERE id = $1 AND is_active = TRUE");
    let form = sqlx::query_as::<_, Form>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(form)
}

/// Find a form owned by `user_id`, active or not.
pub async fn find_owned(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Option<Form>, AppError> {
    let sql = format!("SELECT {FORM_COLUMNS} FROM forms WHERE id = $1 AND user_id = $2");
    let form = sqlx::query_as::<_, Form>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(form)
}

pub async fn is_owned(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM forms WHERE id = $1 AND user_id = $2)",
    )
    .bind(id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// All forms of an owner, newest first, each with its submission count.
/// Counts come from one grouped aggregate over the owner's forms.
pub async fn list_for_owner(pool: &PgPool, user_id: Uuid) -> Result<Vec<FormSummary>, AppError> {
    let sql = format!(
        "SELECT f.id, f.user_id, f.name, f.description, f.fields, f.settings, f.is_active, \
                f.created_at, f.updated_at, \
                COALESCE(c.submission_count, 0) AS submission_count \
         FROM forms f \
         LEFT JOIN ( \
             SELECT s.form_id, COUNT(*)::BIGINT AS submission_count \
             FROM submissions s \
             JOIN forms owned ON owned.id = s.form_id AND owned.user_id = $1 \
             GROUP BY s.form_id \
         ) c ON c.form_id = f.id \
         WHERE f.user_id = $1 \
         ORDER BY f.created_at DESC"
    );
    let forms = sqlx::query_as::<_, FormSummary>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(forms)
}

/// Overwrite only the provided columns, in one statement guarded by the owner id.
/// Returns `None` when no form with that id belongs to `user_id`.
pub async fn update_owned(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    patch: &FormPatch,
) -> Result<Option<Form>, AppError> {
    let sql = format!(
        "UPDATE forms SET \
             name = COALESCE($3, name), \
             description = COALESCE($4, description), \
             fields = COALESCE($5, fields), \
             settings = COALESCE($6, settings), \
             is_active = COALESCE($7, is_active), \
             updated_at = now() \
         WHERE id = $1 AND user_id = $2 \
         RETURNING {FORM_COLUMNS}"
    );
    let form = sqlx::query_as::<_, Form>(&sql)
        .bind(id)
        .bind(user_id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.fields.as_ref().map(Json))
        .bind(patch.settings.as_ref().map(Json))
        .bind(patch.is_active)
        .fetch_optional(pool)
        .await?;
    Ok(form)
}

/// Copy an owned form into a new active form named "<name> (Copy)".
pub async fn duplicate_owned(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Option<Form>, AppError> {
    let sql = format!(
        "INSERT INTO forms (id, user_id, name, description, fields, settings, is_active) \
         SELECT $3, user_id, name || ' (Copy)', description, fields, settings, TRUE \
         FROM forms WHERE id = $1 AND user_id = $2 \
         RETURNING {FORM_COLUMNS}"
    );
    let form = sqlx::query_as::<_, Form>(&sql)
        .bind(id)
        .bind(user_id)
        .bind(Uuid::new_v4())
        .fetch_optional(pool)
        .await?;
    Ok(form)
}

/// Delete an owned form and its submissions in one transaction.
///
/// Returns the file records of every removed submission so the caller can
/// clear their blobs, or `None` if the form does not belong to `user_id`.
pub async fn delete_owned(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Vec<FileRecord>>, AppError> {
    let mut tx = pool.begin().await?;

    let removed: Vec<Json<Vec<FileRecord>>> = sqlx::query_scalar(
        "DELETE FROM submissions s USING forms f \
         WHERE s.form_id = f.id AND f.id = $1 AND f.user_id = $2 \
         RETURNING s.files",
    )
    .bind(id)
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;

    let deleted = sqlx::query("DELETE FROM forms WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if deleted == 0 {
        tx.rollback().await?;
        return Ok(None);
    }
    tx.commit().await?;

    Ok(Some(removed.into_iter().flat_map(|files| files.0).collect()))
}

/// Submission totals for an owned form; recent means the last 30 days.
pub async fn stats_owned(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Option<FormStats>, AppError> {
    let stats = sqlx::query_as::<_, FormStats>(
        "SELECT COUNT(s.id)::BIGINT AS total_submissions, \
                (COUNT(s.id) FILTER (WHERE s.created_at >= now() - INTERVAL '30 days'))::BIGINT \
                    AS recent_submissions \
         FROM forms f \
         LEFT JOIN submissions s ON s.form_id = f.id \
         WHERE f.id = $1 AND f.user_id = $2 \
         GROUP BY f.id",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(stats)
}
