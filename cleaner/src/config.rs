//! Job configuration and artifact store selection.
//!
//! [`CleaningConfig`] comes from the command line and is recorded against the
//! run. [`StoreConfig`] comes from the environment (a `.env` file is honored).

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::transform::PriceRange;

/// Default root of the local artifact store.
pub const DEFAULT_STORE_DIR: &str = ".artifacts";

/// Default download cache for the HTTP store.
pub const DEFAULT_CACHE_DIR: &str = ".artifact-cache";

/// Job type registered with the store.
pub const JOB_TYPE: &str = "basic_cleaning";

/// Parameters of one cleaning job. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Fully qualified reference of the artifact to clean
    pub input_artifact: String,
    /// Name under which the cleaned artifact is published
    pub output_artifact: String,
    /// Type tag of the published artifact
    pub output_type: String,
    /// Description attached to the published artifact
    pub output_description: String,
    /// Inclusive lower price bound
    pub min_price: f64,
    /// Inclusive upper price bound
    pub max_price: f64,
}

impl CleaningConfig {
    pub fn price_range(&self) -> PriceRange {
        PriceRange::new(self.min_price, self.max_price)
    }

    /// Config as recorded against the run.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "input_artifact": self.input_artifact,
            "output_artifact": self.output_artifact,
            "output_type": self.output_type,
            "output_description": self.output_description,
            "min_price": self.min_price,
            "max_price": self.max_price,
        })
    }
}

/// Where artifacts live.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    /// Filesystem store rooted at `root`.
    Local { root: PathBuf },
    /// Remote store behind the HTTP API.
    Http {
        base_url: String,
        api_key: Option<String>,
        cache_dir: PathBuf,
    },
}

impl StoreConfig {
    /// Read store settings from the environment.
    ///
    /// `ARTIFACT_STORE_URL` selects the HTTP store; otherwise the local store
    /// at `ARTIFACT_STORE_DIR` is used.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`StoreConfig::from_env`] with an explicit variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        match non_empty("ARTIFACT_STORE_URL") {
            Some(url) => StoreConfig::Http {
                base_url: url.trim_end_matches('/').to_string(),
                api_key: non_empty("ARTIFACT_STORE_API_KEY"),
                cache_dir: non_empty("ARTIFACT_CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
            },
            None => StoreConfig::Local {
                root: non_empty("ARTIFACT_STORE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR)),
            },
        }
    }
}
