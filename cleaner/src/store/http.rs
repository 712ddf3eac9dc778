//! HTTP client for a remote artifact server.
//!
//! Payloads are downloaded into a local cache directory
//! (`<cache>/<name>/v<N>/<file>`) and checked against the manifest digests.
//! Cached files with a matching digest are not downloaded again.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

use super::{digest_bytes, ArtifactStore, PendingFile};
use crate::api::logs::log_info;
use crate::api::types::{CreateRunRequest, ErrorBody, FinishRunRequest, UseArtifactRequest};
use crate::error::{ArtifactError, ArtifactResult};
use crate::models::{
    validate_name, Artifact, ArtifactManifest, ArtifactRef, LocalArtifact, RunRecord, RunStatus,
};

/// Artifact store client speaking the artifact server's REST API.
#[derive(Clone)]
pub struct HttpArtifactStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    cache_dir: PathBuf,
}

impl HttpArtifactStore {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            cache_dir: cache_dir.into(),
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxies, TLS).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match self.api_key {
            Some(ref key) => req.bearer_auth(key),
            None => req,
        }
    }

    /// Turn a non-2xx response into [`ArtifactError::Server`].
    async fn check(response: Response) -> ArtifactResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        Err(ArtifactError::Server {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> ArtifactResult<T> {
        let response = Self::check(req.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    /// Fetch every payload file of `manifest` into the cache.
    async fn download(&self, manifest: &ArtifactManifest) -> ArtifactResult<PathBuf> {
        let dir = self
            .cache_dir
            .join(&manifest.name)
            .join(format!("v{}", manifest.version));
        fs::create_dir_all(&dir)?;

        for file in &manifest.files {
            validate_name(&file.name)?;
            let target = dir.join(&file.name);
            if let Ok(existing) = fs::read(&target) {
                if digest_bytes(&existing) == file.digest {
                    continue;
                }
            }

            let path = format!(
                "/files/{}/v{}/files/{}",
                manifest.name, manifest.version, file.name
            );
            let response = Self::check(self.request(Method::GET, &path).send().await?).await?;
            let bytes = response.bytes().await?;
            if digest_bytes(&bytes) != file.digest {
                return Err(ArtifactError::DigestMismatch {
                    reference: manifest.id(),
                    file: file.name.clone(),
                });
            }
            fs::write(&target, &bytes)?;
            log_info(format!("Downloaded {} ({} bytes)", file.name, bytes.len()));
        }

        Ok(dir)
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn init_run(&self, job_type: &str, config: Value) -> ArtifactResult<RunRecord> {
        let body = CreateRunRequest {
            job_type: job_type.to_string(),
            config,
        };
        self.send_json(self.request(Method::POST, "/api/runs").json(&body))
            .await
    }

    async fn use_artifact(
        &self,
        run: &RunRecord,
        reference: &ArtifactRef,
    ) -> ArtifactResult<LocalArtifact> {
        let body = UseArtifactRequest {
            reference: reference.to_string(),
        };
        let path = format!("/api/runs/{}/use", run.id);
        let manifest: ArtifactManifest = self
            .send_json(self.request(Method::POST, &path).json(&body))
            .await?;
        let dir = self.download(&manifest).await?;
        Ok(LocalArtifact { manifest, dir })
    }

    async fn log_artifact(
        &self,
        run: &RunRecord,
        artifact: &Artifact,
    ) -> ArtifactResult<ArtifactManifest> {
        let mut form = Form::new()
            .text("name", artifact.name.clone())
            .text("type", artifact.artifact_type.clone())
            .text("description", artifact.description.clone());
        for path in &artifact.files {
            let file = PendingFile::read(path)?;
            form = form.part("file", Part::bytes(file.bytes).file_name(file.name));
        }

        let path = format!("/api/runs/{}/artifacts", run.id);
        self.send_json(self.request(Method::POST, &path).multipart(form))
            .await
    }

    async fn finish_run(&self, run: &RunRecord, status: RunStatus) -> ArtifactResult<RunRecord> {
        let path = format!("/api/runs/{}/finish", run.id);
        self.send_json(self.request(Method::POST, &path).json(&FinishRunRequest { status }))
            .await
    }
}
