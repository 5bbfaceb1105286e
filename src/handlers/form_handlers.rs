use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{AuthUser, access, authenticate};
use crate::cache::FormCache;
use crate::errors::{AppError, ResultExt};
use crate::intake::persister;
use crate::models::field::{self, Field};
use crate::models::form::{self, FormPatch, FormSettings, NewForm};
use crate::storage::BlobStore;
use crate::templates_structs::{
    FormListResponse, FormReadQuery, FormRequest, FormResponse, FormStatsResponse, MessageResponse,
};

fn parse_fields(raw: &[Value]) -> Result<Vec<Field>, AppError> {
    field::validate_schema(raw).map_err(|errors| AppError::Validation(field::describe(&errors)))
}

fn parse_settings(raw: Value) -> Result<FormSettings, AppError> {
    FormSettings::from_json(raw).map_err(AppError::Validation)
}

/// True when an `If-None-Match` header value names `etag` (or is `*`).
fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match
        .split(',')
        .map(|tag| tag.trim().trim_start_matches("W/"))
        .any(|tag| tag == "*" || tag == etag)
}

/// GET /api/forms - The caller's forms with submission counts
pub async fn list(pool: web::Data<PgPool>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let forms = access::list_for_owner(&pool, user.id())
        .await
        .or_fail("Error loading forms")?;
    Ok(HttpResponse::Ok().json(FormListResponse { forms }))
}

/// GET /api/forms/{id} - Public embed read, or the owner's view with `?manage=true`
pub async fn read(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    cache: web::Data<FormCache>,
    path: web::Path<Uuid>,
    query: web::Query<FormReadQuery>,
) -> Result<HttpResponse, AppError> {
    let form_id = path.into_inner();

    if query.is_manage() {
        let caller = authenticate(&req).await?;
        let form = access::get_for_manage(&pool, form_id, caller.id)
            .await
            .or_fail("Error loading form")?;
        return Ok(HttpResponse::Ok().json(FormResponse { form }));
    }

    let entry = access::get_public(&pool, &cache, form_id)
        .await
        .or_fail("Error loading form")?;

    let not_modified = req
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| etag_matches(v, &entry.etag));

    let mut builder = if not_modified {
        HttpResponse::NotModified()
    } else {
        HttpResponse::Ok()
    };
    builder
        .insert_header((header::CACHE_CONTROL, "public, max-age=300"))
        .insert_header((header::ETAG, entry.etag.clone()));

    if not_modified {
        Ok(builder.finish())
    } else {
        Ok(builder.json(&entry.body))
    }
}

/// POST /api/forms - Create a form owned by the caller
pub async fn create(
    pool: web::Data<PgPool>,
    user: AuthUser,
    body: web::Json<FormRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let (name, raw_fields) = match (body.name, body.fields) {
        (Some(name), Some(Value::Array(fields))) if !name.trim().is_empty() => (name, fields),
        _ => return Err(AppError::Validation("Name and fields are required".to_string())),
    };

    let new_form = NewForm {
        name: name.trim().to_string(),
        description: body.description.unwrap_or_default(),
        fields: parse_fields(&raw_fields)?,
        settings: parse_settings(body.settings.unwrap_or(Value::Null))?,
    };

    let form = form::create(&pool, user.id(), &new_form)
        .await
        .or_fail("Error creating form")?;
    log::info!("Form {} created by {}", form.id, user.id());

    Ok(HttpResponse::Created().json(FormResponse { form }))
}

/// PUT /api/forms/{id} - Overwrite only the keys present in the body
pub async fn update(
    pool: web::Data<PgPool>,
    cache: web::Data<FormCache>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<FormRequest>,
) -> Result<HttpResponse, AppError> {
    let form_id = path.into_inner();
    let body = body.into_inner();

    let name = match body.name {
        Some(name) if name.trim().is_empty() => {
            return Err(AppError::Validation("Name cannot be empty".to_string()));
        }
        other => other.map(|n| n.trim().to_string()),
    };
    let fields = match body.fields {
        None => None,
        Some(Value::Array(raw)) => Some(parse_fields(&raw)?),
        Some(_) => return Err(AppError::Validation("Fields must be an array".to_string())),
    };
    let settings = body.settings.map(parse_settings).transpose()?;

    let patch = FormPatch {
        name,
        description: body.description,
        fields,
        settings,
        is_active: body.is_active,
    };

    let form = form::update_owned(&pool, form_id, user.id(), &patch)
        .await
        .or_fail("Error updating form")?
        .ok_or_else(|| AppError::not_found("Form"))?;
    cache.invalidate(form_id);

    Ok(HttpResponse::Ok().json(FormResponse { form }))
}

/// DELETE /api/forms/{id} - Remove a form, its submissions and their files
pub async fn delete(
    pool: web::Data<PgPool>,
    cache: web::Data<FormCache>,
    store: web::Data<dyn BlobStore>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let form_id = path.into_inner();

    let files = form::delete_owned(&pool, form_id, user.id())
        .await
        .or_fail("Error deleting form")?
        .ok_or_else(|| AppError::not_found("Form"))?;
    cache.invalidate(form_id);
    persister::remove_blobs(store.get_ref(), &files).await;

    log::info!("Form {} deleted by {} ({} file(s) removed)", form_id, user.id(), files.len());
    Ok(HttpResponse::Ok().json(MessageResponse::new("Form deleted successfully")))
}

/// POST /api/forms/{id}/duplicate - Copy an owned form
pub async fn duplicate(
    pool: web::Data<PgPool>,
    cache: web::Data<FormCache>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let form_id = path.into_inner();

    let form = form::duplicate_owned(&pool, form_id, user.id())
        .await
        .or_fail("Error duplicating form")?
        .ok_or_else(|| AppError::not_found("Form"))?;
    cache.invalidate(form_id);

    Ok(HttpResponse::Created().json(FormResponse { form }))
}

/// GET /api/forms/{id}/stats - Submission totals for an owned form
pub async fn stats(
    pool: web::Data<PgPool>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let stats = form::stats_owned(&pool, path.into_inner(), user.id())
        .await
        .or_fail("Error loading form stats")?
        .ok_or_else(|| AppError::not_found("Form"))?;
    Ok(HttpResponse::Ok().json(FormStatsResponse { stats }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etag_matching() {
        let tag = "\"form-1-2\"";
        assert!(etag_matches("\"form-1-2\"", tag));
        assert!(etag_matches("W/\"form-1-2\"", tag));
        assert!(etag_matches("\"other\", \"form-1-2\"", tag));
        assert!(etag_matches("*", tag));
        assert!(!etag_matches("\"form-1-3\"", tag));
    }
}
