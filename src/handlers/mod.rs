pub mod auth_handlers;
pub mod form_handlers;
pub mod submission_handlers;

use actix_web::web;

use crate::errors::AppError;

/// Malformed JSON is the caller's fault, not ours.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid request body: {err}")).into()
    })
}

/// A path id that does not parse cannot name an existing resource.
fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|_err, _req| AppError::not_found("Resource").into())
}

/// Configure all JSON API routes under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config());
    cfg.app_data(path_config());
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/auth")
                    .route("/me", web::get().to(auth_handlers::me))
                    .route("/logout", web::post().to(auth_handlers::logout)),
            )
            .service(
                web::scope("/forms")
                    .route("", web::get().to(form_handlers::list))
                    .route("", web::post().to(form_handlers::create))
                    .route("/{id}", web::get().to(form_handlers::read))
                    .route("/{id}", web::put().to(form_handlers::update))
                    .route("/{id}", web::delete().to(form_handlers::delete))
                    .route("/{id}/duplicate", web::post().to(form_handlers::duplicate))
                    .route("/{id}/stats", web::get().to(form_handlers::stats)),
            )
            .service(
                web::scope("/submissions")
                    .route("/form/{form_id}", web::get().to(submission_handlers::list))
                    .route("/submit/{form_id}", web::post().to(submission_handlers::submit))
                    .route(
                        "/file/{submission_id}/{file_name}",
                        web::get().to(submission_handlers::download),
                    )
                    .route("/{id}", web::delete().to(submission_handlers::delete)),
            ),
    );
}
