//! Artifact stores.
//!
//! [`ArtifactStore`] is the seam between the cleaning job and wherever
//! artifacts live:
//!
//! - [`LocalArtifactStore`] - versioned store in a local directory
//! - [`HttpArtifactStore`] - client for the artifact server's REST API

pub mod http;
pub mod local;

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::StoreConfig;
use crate::error::ArtifactResult;
use crate::models::{Artifact, ArtifactFile, ArtifactManifest, ArtifactRef, LocalArtifact, RunRecord, RunStatus};

pub use http::HttpArtifactStore;
pub use local::{LocalArtifactStore, PendingFile};

/// Operations the cleaning job needs from an artifact store.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Register a run and record its configuration.
    async fn init_run(&self, job_type: &str, config: Value) -> ArtifactResult<RunRecord>;

    /// Resolve a reference, make its payload available locally, and record
    /// it as an input of `run`.
    async fn use_artifact(
        &self,
        run: &RunRecord,
        reference: &ArtifactRef,
    ) -> ArtifactResult<LocalArtifact>;

    /// Publish a new version; the store assigns the version number.
    async fn log_artifact(
        &self,
        run: &RunRecord,
        artifact: &Artifact,
    ) -> ArtifactResult<ArtifactManifest>;

    /// Mark `run` as ended.
    async fn finish_run(&self, run: &RunRecord, status: RunStatus) -> ArtifactResult<RunRecord>;
}

/// Open the store selected by `config`.
pub fn open_store(config: &StoreConfig) -> ArtifactResult<Box<dyn ArtifactStore>> {
    match config {
        StoreConfig::Local { root } => Ok(Box::new(LocalArtifactStore::open(root)?)),
        StoreConfig::Http {
            base_url,
            api_key,
            cache_dir,
        } => Ok(Box::new(HttpArtifactStore::new(
            base_url.clone(),
            api_key.clone(),
            cache_dir.clone(),
        ))),
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Digest of a whole artifact, independent of file order.
pub fn aggregate_digest(files: &[ArtifactFile]) -> String {
    let mut lines: Vec<String> = files
        .iter()
        .map(|f| format!("{}:{}\n", f.name, f.digest))
        .collect();
    lines.sort();
    digest_bytes(lines.concat().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_known_value() {
        assert_eq!(
            digest_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_aggregate_digest_ignores_order() {
        let a = ArtifactFile { name: "a.csv".into(), size: 1, digest: digest_bytes(b"a") };
        let b = ArtifactFile { name: "b.csv".into(), size: 1, digest: digest_bytes(b"b") };
        assert_eq!(
            aggregate_digest(&[a.clone(), b.clone()]),
            aggregate_digest(&[b, a])
        );
    }

    #[test]
    fn test_open_local_store_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::Local { root: dir.path().join("artifacts") };
        assert!(open_store(&config).is_ok());
        assert!(dir.path().join("artifacts").join("runs").is_dir());
    }
}
