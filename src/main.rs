use std::sync::Arc;

use actix_web::{App, HttpResponse, HttpServer, middleware, web};

use formdesk::auth::{HttpIdentityProvider, IdentityProvider};
use formdesk::cache::FormCache;
use formdesk::config::Config;
use formdesk::mailer::{HttpMailer, LogMailer, Mailer};
use formdesk::storage::{BlobStore, HttpBlobStore, MemoryBlobStore};
use formdesk::templates_structs::ApiErrorResponse;
use formdesk::{db, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let pool = db::init_pool(&config.database_url)
        .await
        .map_err(std::io::Error::other)?;
    db::run_migrations(&pool).await.map_err(std::io::Error::other)?;

    // One client for every outbound call so the timeout applies everywhere.
    let client = reqwest::Client::builder()
        .timeout(config.upstream_timeout)
        .build()
        .map_err(std::io::Error::other)?;

    let identity: Arc<dyn IdentityProvider> =
        Arc::new(HttpIdentityProvider::new(config.identity.clone(), client.clone()));

    let store: Arc<dyn BlobStore> = match &config.storage {
        Some(endpoint) => Arc::new(HttpBlobStore::new(
            endpoint.clone(),
            config.storage_bucket.clone(),
            client.clone(),
        )),
        None => {
            log::warn!("No STORAGE_URL set; uploads are kept in memory and lost on restart");
            Arc::new(MemoryBlobStore::new())
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.email {
        Some(endpoint) => Arc::new(HttpMailer::new(endpoint.clone(), config.email_from.clone(), client.clone())),
        None => {
            log::warn!("No EMAIL_API_URL set; notification emails are only logged");
            Arc::new(LogMailer)
        }
    };

    let cache = web::Data::new(FormCache::new(config.form_cache_ttl));
    let identity = web::Data::from(identity);
    let store = web::Data::from(store);
    let mailer = web::Data::from(mailer);
    let pool = web::Data::new(pool);
    let bind_addr = config.bind_addr.clone();
    let config = web::Data::new(config);

    log::info!("Starting server at http://{bind_addr}");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(pool.clone())
            .app_data(config.clone())
            .app_data(cache.clone())
            .app_data(identity.clone())
            .app_data(store.clone())
            .app_data(mailer.clone())
            .configure(handlers::configure)
            .default_service(web::to(|| async {
                HttpResponse::NotFound().json(ApiErrorResponse {
                    error: "Not found".to_string(),
                    details: None,
                })
            }))
    })
    .bind(bind_addr)?
    .run()
    .await
}
