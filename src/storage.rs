use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use actix_web::web::Bytes;
use async_trait::async_trait;

use crate::config::ServiceEndpoint;
use crate::errors::UpstreamError;

/// External blob store holding uploaded files.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`. Returns the path to record, which is only
    /// handed out once the store has confirmed the write.
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<String, UpstreamError>;

    async fn download(&self, path: &str) -> Result<Bytes, UpstreamError>;

    async fn remove(&self, paths: &[String]) -> Result<(), UpstreamError>;
}

/// Object storage over HTTP, bucket-scoped (`{url}/storage/v1/object/{bucket}/...`).
pub struct HttpBlobStore {
    endpoint: ServiceEndpoint,
    bucket: String,
    client: reqwest::Client,
}

impl HttpBlobStore {
    pub fn new(endpoint: ServiceEndpoint, bucket: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            endpoint,
            bucket: bucket.into(),
            client,
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.endpoint.url, self.bucket, path)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.endpoint.key).header("apikey", &self.endpoint.key)
    }
}

fn check_status(resp: &reqwest::Response, op: &str) -> Result<(), UpstreamError> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(UpstreamError::new("storage", format!("{op} returned status {status}")))
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<String, UpstreamError> {
        let resp = self
            .authed(self.client.post(self.object_url(key)))
            .header("content-type", content_type)
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| UpstreamError::new("storage", e))?;
        check_status(&resp, "upload")?;
        Ok(key.to_string())
    }

    async fn download(&self, path: &str) -> Result<Bytes, UpstreamError> {
        let resp = self
            .authed(self.client.get(self.object_url(path)))
            .send()
            .await
            .map_err(|e| UpstreamError::new("storage", e))?;
        check_status(&resp, "download")?;
        resp.bytes().await.map_err(|e| UpstreamError::new("storage", e))
    }

    async fn remove(&self, paths: &[String]) -> Result<(), UpstreamError> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = format!("{}/storage/v1/object/{}", self.endpoint.url, self.bucket);
        let resp = self
            .authed(self.client.delete(url))
            .json(&serde_json::json!({ "prefixes": paths }))
            .send()
            .await
            .map_err(|e| UpstreamError::new("storage", e))?;
        check_status(&resp, "remove")
    }
}

/// Process-local store. Used when no storage endpoint is configured and in tests.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<HashMap<String, (Bytes, String)>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let map = self.objects.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        let map = self.objects.read().unwrap_or_else(|e| e.into_inner());
        map.get(key).map(|(_, ct)| ct.clone())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<String, UpstreamError> {
        let mut map = self.objects.write().unwrap_or_else(|e| e.into_inner());
        if map.contains_key(key) {
            return Err(UpstreamError::new("storage", format!("object {key} already exists")));
        }
        map.insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(key.to_string())
    }

    async fn download(&self, path: &str) -> Result<Bytes, UpstreamError> {
        let map = self.objects.read().unwrap_or_else(|e| e.into_inner());
        map.get(path)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| UpstreamError::new("storage", format!("object {path} not found")))
    }

    async fn remove(&self, paths: &[String]) -> Result<(), UpstreamError> {
        let mut map = self.objects.write().unwrap_or_else(|e| e.into_inner());
        for path in paths {
            map.remove(path);
        }
        Ok(())
    }
}
