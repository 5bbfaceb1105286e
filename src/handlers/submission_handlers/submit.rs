use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, web};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::access;
use crate::config::{Config, RequiredFilePolicy};
use crate::errors::{AppError, ResultExt};
use crate::intake::files::{self, IngestReport, UploadedPart};
use crate::intake::persister::{self, RequestMeta};
use crate::intake::{multipart, notify, validator};
use crate::mailer::Mailer;
use crate::models::form::Form;
use crate::storage::BlobStore;
use crate::templates_structs::SubmitResponse;

/// Parts the form accepts at all: uploads enabled and aimed at a file field.
fn retain_file_parts(form: &Form, parts: Vec<UploadedPart>) -> Vec<UploadedPart> {
    if !form.settings.allow_file_upload {
        if !parts.is_empty() {
            log::warn!("Form {} does not accept uploads; dropping {} file(s)", form.id, parts.len());
        }
        return Vec::new();
    }
    parts
        .into_iter()
        .filter(|part| {
            let known = form.fields.iter().any(|f| f.is_file() && f.name == part.field_name);
            if !known {
                log::warn!("Form {}: ignoring upload for unknown file field '{}'", form.id, part.field_name);
            }
            known
        })
        .collect()
}

/// Required file fields that had an accepted upload but ended up with nothing stored.
fn lost_required_files<'a>(form: &'a Form, report: &IngestReport) -> Vec<&'a str> {
    form.fields
        .iter()
        .filter(|f| f.required && f.is_file())
        .filter(|f| report.failed.iter().any(|name| *name == f.name))
        .filter(|f| !report.stored.iter().any(|r| r.field_name == f.name))
        .map(|f| f.label.as_str())
        .collect()
}

/// POST /api/submissions/submit/{form_id} - Public multipart submission
pub async fn submit(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    store: web::Data<dyn BlobStore>,
    mailer: web::Data<dyn Mailer>,
    config: web::Data<Config>,
    path: web::Path<Uuid>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let form_id = path.into_inner();
    let limit = config.max_upload_bytes;

    let form = access::get_for_submission(&pool, form_id)
        .await
        .or_fail("Error submitting form")?;

    let body = multipart::read_submission(payload, limit).await?;
    let parts = retain_file_parts(&form, body.files);

    // Screening happens before validation so a rejected file cannot satisfy a required field.
    let (accepted, rejected) = files::partition(parts, limit);
    for (part, reason) in &rejected {
        log::warn!(
            "Form {}: rejected upload '{}' for field '{}': {}",
            form.id,
            part.file_name,
            part.field_name,
            reason
        );
    }

    validator::validate(
        &form.fields,
        &body.values,
        accepted.iter().map(|p| p.field_name.as_str()),
    )?;

    let report = files::ingest(store.get_ref(), accepted).await;

    let lost = lost_required_files(&form, &report);
    if !lost.is_empty() {
        match config.required_file_policy {
            RequiredFilePolicy::BestEffort => {
                log::warn!("Form {}: storing submission without required file(s) {:?}", form.id, lost);
            }
            RequiredFilePolicy::Strict => {
                persister::remove_blobs(store.get_ref(), &report.stored).await;
                return Err(AppError::Upstream(format!(
                    "Upload of required file \"{}\" failed",
                    lost[0]
                )));
            }
        }
    }

    let stored = report.stored.clone();
    let submission = match persister::record(&pool, &form, &body.values, report.stored, RequestMeta::from_request(&req)).await
    {
        Ok(submission) => submission,
        Err(e) => {
            persister::remove_blobs(store.get_ref(), &stored).await;
            return Err(e.with_context("Error submitting form"));
        }
    };
    log::info!(
        "Submission {} stored for form {} ({} file(s))",
        submission.id,
        form.id,
        submission.files.len()
    );

    let submission_id = submission.id;
    notify::spawn_dispatch(mailer.into_inner(), form, submission, config.dashboard_url.clone());

    Ok(HttpResponse::Created().json(SubmitResponse {
        message: "Form submitted successfully".to_string(),
        submission_id,
    }))
}
