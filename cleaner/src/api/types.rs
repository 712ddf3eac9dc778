//! REST API types shared by the artifact server and [`HttpArtifactStore`].
//!
//! [`HttpArtifactStore`]: crate::store::HttpArtifactStore

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::RunStatus;

/// Body of `POST /api/runs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRunRequest {
    pub job_type: String,
    #[serde(default)]
    pub config: Value,
}

/// Body of `POST /api/runs/{run_id}/use`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UseArtifactRequest {
    /// `[scope/]name[:alias]`
    pub reference: String,
}

/// Body of `POST /api/runs/{run_id}/finish`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishRunRequest {
    pub status: RunStatus,
}

/// Error payload returned with every non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub success: bool,
    pub error: String,
}

/// Create error response
pub fn error_response(message: &str) -> Value {
    json!({
        "success": false,
        "error": message
    })
}
