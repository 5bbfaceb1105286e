//! Shared test infrastructure for database and HTTP tests.
//!
//! # Test Database Setup
//! - `setup_test_db()` - fresh Postgres schema with migrations applied
//! - `TestContext` - database plus fake identity, storage and email collaborators
//!
//! `DATABASE_URL` must point at a Postgres server the tests may create schemas on.
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::web;
use actix_web::web::Bytes;
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use uuid::Uuid;

use formdesk::auth::{IdentityProvider, Principal};
use formdesk::cache::FormCache;
use formdesk::config::Config;
use formdesk::errors::UpstreamError;
use formdesk::handlers;
use formdesk::mailer::{EmailMessage, Mailer};
use formdesk::models::field::{Field, FieldType};
use formdesk::models::form::{self, Form, FormSettings, NewForm};
use formdesk::storage::{BlobStore, MemoryBlobStore};

// ============================================================================
// DATABASE SETUP
// ============================================================================

pub struct TestDb {
    pool: PgPool,
    pub schema: String,
}

impl TestDb {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Create an isolated schema and run the migrations in it.
///
/// Each call gets its own schema, so tests can run in parallel against one
/// database without seeing each other's rows.
pub async fn setup_test_db() -> TestDb {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    let schema = format!("test_{}", Uuid::new_v4().simple());

    let admin = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");
    sqlx::query(&format!("CREATE SCHEMA {schema}"))
        .execute(&admin)
        .await
        .expect("Failed to create test schema");
    admin.close().await;

    let options = PgConnectOptions::from_str(&url)
        .expect("Invalid DATABASE_URL")
        .options([("search_path", schema.as_str())]);
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("Failed to open test pool");

    formdesk::db::MIGRATOR
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    TestDb { pool, schema }
}

// ============================================================================
// FAKE COLLABORATORS
// ============================================================================

/// Accepts tokens of the form `user:<uuid>`. The token `boom` simulates an
/// unreachable identity provider.
pub struct FakeIdentity;

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn verify(&self, token: &str) -> Result<Option<Principal>, UpstreamError> {
        if token == "boom" {
            return Err(UpstreamError::new("identity", "connection refused"));
        }
        Ok(token
            .strip_prefix("user:")
            .and_then(|id| Uuid::parse_str(id).ok())
            .map(|id| Principal {
                id,
                email: Some(format!("{}@example.com", id.simple())),
            }))
    }
}

pub fn bearer(user_id: Uuid) -> (&'static str, String) {
    ("Authorization", format!("Bearer user:{user_id}"))
}

/// Records every send attempt; sends to addresses in `failing` error out.
#[derive(Default)]
pub struct RecordingMailer {
    pub failing: Vec<String>,
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn failing_for(addresses: &[&str]) -> Self {
        RecordingMailer {
            failing: addresses.iter().map(|a| a.to_string()).collect(),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.to.clone()).collect()
    }

    pub fn messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Dispatch runs in the background; wait for `count` attempts or give up.
    pub async fn wait_for(&self, count: usize) -> Vec<String> {
        for _ in 0..100 {
            if self.sent.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.recipients()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), UpstreamError> {
        self.sent.lock().unwrap().push(message.clone());
        if self.failing.contains(&message.to) {
            return Err(UpstreamError::new("email", "status 500 Internal Server Error"));
        }
        Ok(())
    }
}

/// Memory store whose uploads fail for keys containing `failing`.
pub struct FlakyBlobStore {
    inner: MemoryBlobStore,
    failing: String,
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<String, UpstreamError> {
        if key.contains(&self.failing) {
            return Err(UpstreamError::new("storage", "connection reset"));
        }
        self.inner.upload(key, bytes, content_type).await
    }

    async fn download(&self, path: &str) -> Result<Bytes, UpstreamError> {
        self.inner.download(path).await
    }

    async fn remove(&self, paths: &[String]) -> Result<(), UpstreamError> {
        self.inner.remove(paths).await
    }
}

// ============================================================================
// APP CONTEXT
// ============================================================================

pub struct TestContext {
    pub db: TestDb,
    pub config: Config,
    pub cache: FormCache,
    pub store: MemoryBlobStore,
    pub mailer: Arc<RecordingMailer>,
    /// Uploads whose key contains this substring fail.
    pub failing_uploads: Option<String>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_mailer(RecordingMailer::default()).await
    }

    pub async fn with_mailer(mailer: RecordingMailer) -> Self {
        let config = Config::default();
        TestContext {
            db: setup_test_db().await,
            cache: FormCache::new(config.form_cache_ttl),
            config,
            store: MemoryBlobStore::new(),
            mailer: Arc::new(mailer),
            failing_uploads: None,
        }
    }

    /// Context whose store rejects uploads of file names containing `pattern`.
    pub async fn with_failing_uploads(pattern: &str) -> Self {
        let mut ctx = Self::new().await;
        ctx.failing_uploads = Some(pattern.to_string());
        ctx
    }

    pub fn pool(&self) -> &PgPool {
        self.db.pool()
    }

    /// Register state and routes the same way `main` does, with fakes.
    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        let identity: Arc<dyn IdentityProvider> = Arc::new(FakeIdentity);
        let store: Arc<dyn BlobStore> = match &self.failing_uploads {
            Some(pattern) => Arc::new(FlakyBlobStore {
                inner: self.store.clone(),
                failing: pattern.clone(),
            }),
            None => Arc::new(self.store.clone()),
        };
        let mailer: Arc<dyn Mailer> = self.mailer.clone();

        cfg.app_data(web::Data::new(self.db.pool().clone()))
            .app_data(web::Data::new(self.config.clone()))
            .app_data(web::Data::new(self.cache.clone()))
            .app_data(web::Data::from(identity))
            .app_data(web::Data::from(store))
            .app_data(web::Data::from(mailer));
        handlers::configure(cfg);
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub fn field(name: &str, label: &str, field_type: FieldType, required: bool) -> Field {
    Field {
        id: format!("f_{name}"),
        name: name.to_string(),
        label: label.to_string(),
        field_type,
        placeholder: None,
        required,
        options: None,
    }
}

/// The email + CV form used by most submission tests.
pub fn application_fields() -> Vec<Field> {
    vec![
        field("email", "Email", FieldType::Email, true),
        field("cv", "CV", FieldType::File, true),
    ]
}

pub async fn create_form(pool: &PgPool, owner: Uuid, name: &str, fields: Vec<Field>, settings: FormSettings) -> Form {
    let new = NewForm {
        name: name.to_string(),
        description: format!("{name} description"),
        fields,
        settings,
    };
    form::create(pool, owner, &new).await.expect("create form")
}

// ============================================================================
// MULTIPART BODIES
// ============================================================================

const BOUNDARY: &str = "----formdesk-test-boundary";

/// Hand-built multipart/form-data body.
#[derive(Default)]
pub struct MultipartBody {
    buf: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.buf.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(bytes);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    /// Content-Type header value and the finished body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.buf.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={BOUNDARY}"), self.buf)
    }
}
