//! Form access gate: resolves a form under one of the two access modes.
//!
//! ```text
//! public  : id                -> active form, owner fields stripped
//! manage  : id + principal id -> any form of that owner
//! ```
//!
//! Both modes answer `NotFound` for anything they will not return. A manage
//! lookup of someone else's form is indistinguishable from a missing one, so
//! the owner predicate is part of the query rather than a check afterwards.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::cache::{CachedForm, FormCache};
use crate::errors::AppError;
use crate::models::form::{self, Form, FormSummary, compute_theme_tokens};
use crate::templates_structs::PublicFormResponse;

/// Strong validator for a form version: changes whenever `updated_at` does.
pub fn etag_for(form: &Form) -> String {
    format!("\"form-{}-{}\"", form.id, form.updated_at.timestamp_micros())
}

/// Public embed read. Served from `cache` while fresh.
pub async fn get_public(pool: &PgPool, cache: &FormCache, form_id: Uuid) -> Result<Arc<CachedForm>, AppError> {
    if let Some(hit) = cache.get(form_id) {
        return Ok(hit);
    }

    let form = form::find_active_by_id(pool, form_id)
        .await?
        .ok_or_else(|| AppError::not_found("Form"))?;

    let etag = etag_for(&form);
    let theme = compute_theme_tokens(form.id, &form.settings);
    let entry = CachedForm {
        body: PublicFormResponse { form: form.into(), theme },
        etag,
    };
    Ok(cache.insert(form_id, entry))
}

/// Active form with its full schema, read fresh for the submit path.
pub async fn get_for_submission(pool: &PgPool, form_id: Uuid) -> Result<Form, AppError> {
    form::find_active_by_id(pool, form_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Form not found or inactive".into()))
}

/// Owner-only read, inactive forms included.
pub async fn get_for_manage(pool: &PgPool, form_id: Uuid, caller_id: Uuid) -> Result<Form, AppError> {
    form::find_owned(pool, form_id, caller_id)
        .await?
        .ok_or_else(|| AppError::not_found("Form"))
}

/// Owner check without loading the form.
pub async fn ensure_owner(pool: &PgPool, form_id: Uuid, caller_id: Uuid) -> Result<(), AppError> {
    if form::is_owned(pool, form_id, caller_id).await? {
        Ok(())
    } else {
        Err(AppError::not_found("Form"))
    }
}

pub async fn list_for_owner(pool: &PgPool, caller_id: Uuid) -> Result<Vec<FormSummary>, AppError> {
    form::list_for_owner(pool, caller_id).await
}
