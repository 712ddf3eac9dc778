//! Filesystem artifact store.
//!
//! Layout under the store root:
//!
//! ```text
//! artifacts/<name>/v<N>/manifest.json
//! artifacts/<name>/v<N>/files/<file>
//! runs/<run_id>.json
//! ```
//!
//! A version directory without `manifest.json` is still being written and is
//! invisible to readers.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{aggregate_digest, digest_bytes, ArtifactStore};
use crate::error::{ArtifactError, ArtifactResult};
use crate::models::{
    validate_name, Alias, Artifact, ArtifactFile, ArtifactManifest, ArtifactRef, LocalArtifact,
    RunRecord, RunStatus,
};

const MANIFEST_FILE: &str = "manifest.json";
const FILES_DIR: &str = "files";

/// Job type of runs created by [`LocalArtifactStore::import_file`].
pub const IMPORT_JOB_TYPE: &str = "import";

/// A payload file held in memory, ready to be stored.
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl PendingFile {
    /// Read a local file, keeping its file name.
    pub fn read(path: &Path) -> ArtifactResult<Self> {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ArtifactError::InvalidName(path.display().to_string()))?
            .to_string();
        Ok(Self {
            name,
            bytes: fs::read(path)?,
        })
    }
}

/// Versioned artifact store in a local directory.
pub struct LocalArtifactStore {
    root: PathBuf,
    /// Serializes read-modify-write of run records.
    runs_lock: Mutex<()>,
}

impl LocalArtifactStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> ArtifactResult<Self> {
        let store = Self {
            root: PathBuf::from(root.as_ref()),
            runs_lock: Mutex::new(()),
        };
        fs::create_dir_all(store.artifacts_dir())?;
        fs::create_dir_all(store.runs_dir())?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one sub-directory per artifact name.
    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join("artifacts")
    }

    fn runs_dir(&self) -> PathBuf {
        self.root.join("runs")
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.artifacts_dir().join(name).join(format!("v{}", version))
    }

    fn run_path(&self, id: &str) -> ArtifactResult<PathBuf> {
        validate_name(id).map_err(|_| ArtifactError::RunNotFound(id.to_string()))?;
        Ok(self.runs_dir().join(format!("{}.json", id)))
    }

    // -------------------------------------------------------------------------
    // Artifacts
    // -------------------------------------------------------------------------

    /// All version numbers with a directory, complete or not.
    fn allocated_versions(&self, name: &str) -> ArtifactResult<Vec<u32>> {
        let dir = self.artifacts_dir().join(name);
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions: Vec<u32> = entries
            .flatten()
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|s| s.strip_prefix('v'))
                    .and_then(|s| s.parse().ok())
            })
            .collect();
        versions.sort_unstable();
        Ok(versions)
    }

    /// Published versions of `name`, ascending.
    pub fn versions(&self, name: &str) -> ArtifactResult<Vec<u32>> {
        validate_name(name)?;
        Ok(self
            .allocated_versions(name)?
            .into_iter()
            .filter(|v| self.version_dir(name, *v).join(MANIFEST_FILE).is_file())
            .collect())
    }

    /// Resolve a reference to a stored version.
    pub fn resolve(&self, reference: &ArtifactRef) -> ArtifactResult<LocalArtifact> {
        validate_name(&reference.name)?;
        let version = match reference.alias {
            Alias::Version(v) => v,
            Alias::Latest => *self
                .versions(&reference.name)?
                .last()
                .ok_or_else(|| ArtifactError::NotFound(reference.to_string()))?,
        };

        let dir = self.version_dir(&reference.name, version);
        let content = match fs::read_to_string(dir.join(MANIFEST_FILE)) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound(reference.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let manifest: ArtifactManifest = serde_json::from_str(&content)?;

        Ok(LocalArtifact {
            manifest,
            dir: dir.join(FILES_DIR),
        })
    }

    /// Latest manifest of every artifact, sorted by name.
    pub fn list_artifacts(&self) -> ArtifactResult<Vec<ArtifactManifest>> {
        let mut names: Vec<String> = fs::read_dir(self.artifacts_dir())?
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();

        let mut manifests = Vec::new();
        for name in names {
            match self.resolve(&ArtifactRef::latest(name)) {
                Ok(artifact) => manifests.push(artifact.manifest),
                Err(ArtifactError::NotFound(_)) | Err(ArtifactError::InvalidName(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(manifests)
    }

    /// Store a new version of an artifact and record it on the run.
    ///
    /// Every call creates a new version, even for identical content.
    pub fn publish(
        &self,
        run_id: &str,
        name: &str,
        artifact_type: &str,
        description: &str,
        files: Vec<PendingFile>,
    ) -> ArtifactResult<ArtifactManifest> {
        validate_name(name)?;
        let mut seen = HashSet::new();
        for file in &files {
            validate_name(&file.name)?;
            if !seen.insert(file.name.as_str()) {
                return Err(ArtifactError::InvalidName(file.name.clone()));
            }
        }
        // Fail before allocating a version if the run is unknown.
        self.load_run(run_id)?;

        let (version, dir) = self.allocate_version(name)?;
        let files_dir = dir.join(FILES_DIR);
        fs::create_dir_all(&files_dir)?;

        let mut entries = Vec::with_capacity(files.len());
        for file in &files {
            fs::write(files_dir.join(&file.name), &file.bytes)?;
            entries.push(ArtifactFile {
                name: file.name.clone(),
                size: file.bytes.len() as u64,
                digest: digest_bytes(&file.bytes),
            });
        }

        let manifest = ArtifactManifest {
            name: name.to_string(),
            version,
            artifact_type: artifact_type.to_string(),
            description: description.to_string(),
            digest: aggregate_digest(&entries),
            files: entries,
            created_by: run_id.to_string(),
            created_at: Utc::now(),
        };

        // Manifest last, via rename, so readers never see a partial version.
        let tmp = dir.join(format!("{}.tmp", MANIFEST_FILE));
        fs::write(&tmp, serde_json::to_string_pretty(&manifest)?)?;
        fs::rename(&tmp, dir.join(MANIFEST_FILE))?;

        self.update_run(run_id, |run| run.logged.push(manifest.id()))?;
        Ok(manifest)
    }

    /// Claim the next free version directory.
    fn allocate_version(&self, name: &str) -> ArtifactResult<(u32, PathBuf)> {
        let parent = self.artifacts_dir().join(name);
        fs::create_dir_all(&parent)?;

        let mut version = self
            .allocated_versions(name)?
            .last()
            .map(|v| v + 1)
            .unwrap_or(0);
        loop {
            let dir = self.version_dir(name, version);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok((version, dir)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => version += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Publish a local file outside of any job, under its own `import` run.
    pub fn import_file(
        &self,
        path: &Path,
        name: &str,
        artifact_type: &str,
        description: &str,
    ) -> ArtifactResult<ArtifactManifest> {
        let file = PendingFile::read(path)?;
        let run = self.create_run(
            IMPORT_JOB_TYPE,
            serde_json::json!({ "source": path.display().to_string() }),
        )?;
        let published = self.publish(&run.id, name, artifact_type, description, vec![file]);
        let status = if published.is_ok() {
            RunStatus::Finished
        } else {
            RunStatus::Failed
        };
        self.finish(&run.id, status)?;
        published
    }

    // -------------------------------------------------------------------------
    // Runs
    // -------------------------------------------------------------------------

    /// Register a new run.
    pub fn create_run(&self, job_type: &str, config: Value) -> ArtifactResult<RunRecord> {
        let run = RunRecord::new(job_type, config);
        let _guard = self.runs_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.save_run(&run)?;
        Ok(run)
    }

    /// Load a run record by id.
    pub fn load_run(&self, id: &str) -> ArtifactResult<RunRecord> {
        let content = match fs::read_to_string(self.run_path(id)?) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ArtifactError::RunNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    fn save_run(&self, run: &RunRecord) -> ArtifactResult<()> {
        let path = self.run_path(&run.id)?;
        fs::write(path, serde_json::to_string_pretty(run)?)?;
        Ok(())
    }

    fn update_run<F>(&self, id: &str, change: F) -> ArtifactResult<RunRecord>
    where
        F: FnOnce(&mut RunRecord),
    {
        let _guard = self.runs_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut run = self.load_run(id)?;
        change(&mut run);
        self.save_run(&run)?;
        Ok(run)
    }

    /// Resolve a reference and record it as consumed by the run.
    pub fn record_use(&self, run_id: &str, reference: &ArtifactRef) -> ArtifactResult<LocalArtifact> {
        self.load_run(run_id)?;
        let artifact = self.resolve(reference)?;
        let id = artifact.manifest.id();
        self.update_run(run_id, |run| {
            if !run.used.contains(&id) {
                run.used.push(id);
            }
        })?;
        Ok(artifact)
    }

    /// Mark a run as ended.
    pub fn finish(&self, run_id: &str, status: RunStatus) -> ArtifactResult<RunRecord> {
        self.update_run(run_id, |run| {
            run.status = status;
            run.finished_at = Some(Utc::now());
        })
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn init_run(&self, job_type: &str, config: Value) -> ArtifactResult<RunRecord> {
        self.create_run(job_type, config)
    }

    async fn use_artifact(
        &self,
        run: &RunRecord,
        reference: &ArtifactRef,
    ) -> ArtifactResult<LocalArtifact> {
        self.record_use(&run.id, reference)
    }

    async fn log_artifact(
        &self,
        run: &RunRecord,
        artifact: &Artifact,
    ) -> ArtifactResult<ArtifactManifest> {
        let files = artifact
            .files
            .iter()
            .map(|p| PendingFile::read(p))
            .collect::<ArtifactResult<Vec<_>>>()?;
        self.publish(
            &run.id,
            &artifact.name,
            &artifact.artifact_type,
            &artifact.description,
            files,
        )
    }

    async fn finish_run(&self, run: &RunRecord, status: RunStatus) -> ArtifactResult<RunRecord> {
        self.finish(&run.id, status)
    }
}
