//! HTTP server exposing a [`LocalArtifactStore`].
//!
//! # API Endpoints
//!
//! | Method | Path                             | Description                      |
//! |--------|----------------------------------|----------------------------------|
//! | GET    | `/health`                        | Health check                     |
//! | POST   | `/api/runs`                      | Register a run                   |
//! | POST   | `/api/runs/{run_id}/use`         | Resolve + record an input        |
//! | POST   | `/api/runs/{run_id}/artifacts`   | Publish an artifact (multipart)  |
//! | POST   | `/api/runs/{run_id}/finish`      | Mark a run as ended              |
//! | GET    | `/api/artifacts`                 | Latest version of each artifact  |
//! | GET    | `/files/{name}/v{N}/files/{f}`   | Payload download                 |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::services::ServeDir;

use super::logs::{log_info, log_success, log_warning};
use super::types::{error_response, CreateRunRequest, FinishRunRequest, UseArtifactRequest};
use crate::error::{ArtifactError, ServerError, ServerResult};
use crate::models::{ArtifactManifest, ArtifactRef, RunRecord};
use crate::store::{LocalArtifactStore, PendingFile};

/// Largest accepted multipart upload.
pub const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Artifact(e) => match e {
                ArtifactError::NotFound(_) | ArtifactError::RunNotFound(_) => StatusCode::NOT_FOUND,
                ArtifactError::InvalidReference(_)
                | ArtifactError::InvalidName(_)
                | ArtifactError::NotSingleFile { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };
        if status.is_server_error() {
            log_warning(format!("Request failed: {}", self));
        }
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

type AppState = Arc<LocalArtifactStore>;

/// Build the router for `store`.
pub fn router(store: Arc<LocalArtifactStore>) -> Router {
    let files = ServeDir::new(store.artifacts_dir());

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/runs", post(create_run))
        .route("/api/runs/{run_id}/use", post(use_artifact))
        .route("/api/runs/{run_id}/artifacts", post(log_artifact))
        .route("/api/runs/{run_id}/finish", post(finish_run))
        .route("/api/artifacts", get(list_artifacts))
        .nest_service("/files", files)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(store)
}

/// Start the HTTP server
pub async fn start_server(root: PathBuf, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(LocalArtifactStore::open(&root)?);
    let app = router(store);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Artifact server running on http://localhost:{}", port);
    println!("   Store root: {}", root.display());
    println!("   POST /api/runs                    - Register a run");
    println!("   POST /api/runs/{{id}}/use           - Use an artifact");
    println!("   POST /api/runs/{{id}}/artifacts     - Log an artifact");
    println!("   POST /api/runs/{{id}}/finish        - Finish a run");
    println!("   GET  /api/artifacts               - List artifacts");
    println!("   GET  /health                      - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "artifact-store",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn create_run(
    State(store): State<AppState>,
    Json(req): Json<CreateRunRequest>,
) -> ServerResult<Json<RunRecord>> {
    let run = store.create_run(&req.job_type, req.config)?;
    log_info(format!("Run {} started ({})", run.id, run.job_type));
    Ok(Json(run))
}

async fn use_artifact(
    State(store): State<AppState>,
    Path(run_id): Path<String>,
    Json(req): Json<UseArtifactRequest>,
) -> ServerResult<Json<ArtifactManifest>> {
    let reference: ArtifactRef = req.reference.parse()?;
    let artifact = store.record_use(&run_id, &reference)?;
    log_info(format!("Run {} uses {}", run_id, artifact.manifest.id()));
    Ok(Json(artifact.manifest))
}

async fn log_artifact(
    State(store): State<AppState>,
    Path(run_id): Path<String>,
    mut multipart: Multipart,
) -> ServerResult<Json<ArtifactManifest>> {
    let mut name: Option<String> = None;
    let mut artifact_type: Option<String> = None;
    let mut description = String::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        let read_err = |e: axum::extract::multipart::MultipartError| {
            ServerError::BadRequest(format!("Read error: {}", e))
        };

        match field_name.as_str() {
            "name" => name = Some(field.text().await.map_err(read_err)?),
            "type" => artifact_type = Some(field.text().await.map_err(read_err)?),
            "description" => description = field.text().await.map_err(read_err)?,
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ServerError::BadRequest("File part without file name".into()))?;
                let bytes = field.bytes().await.map_err(read_err)?.to_vec();
                files.push(PendingFile { name: file_name, bytes });
            }
            _ => {}
        }
    }

    let name = name.ok_or_else(|| ServerError::BadRequest("Missing field 'name'".into()))?;
    let artifact_type =
        artifact_type.ok_or_else(|| ServerError::BadRequest("Missing field 'type'".into()))?;
    if files.is_empty() {
        return Err(ServerError::BadRequest("No file provided".into()));
    }

    let manifest = store.publish(&run_id, &name, &artifact_type, &description, files)?;
    log_success(format!("Run {} logged {}", run_id, manifest.id()));
    Ok(Json(manifest))
}

async fn finish_run(
    State(store): State<AppState>,
    Path(run_id): Path<String>,
    Json(req): Json<FinishRunRequest>,
) -> ServerResult<Json<RunRecord>> {
    let run = store.finish(&run_id, req.status)?;
    log_info(format!("Run {} ended: {:?}", run.id, run.status));
    Ok(Json(run))
}

async fn list_artifacts(State(store): State<AppState>) -> ServerResult<Json<Vec<ArtifactManifest>>> {
    Ok(Json(store.list_artifacts()?))
}
