//! Domain models for the cleaning job.
//!
//! - [`Dataset`] - Named columns and ordered rows of [`Cell`]s
//! - [`ArtifactRef`] - Parsed `[scope/]name[:alias]` reference
//! - [`Artifact`] - A pending artifact (files to publish)
//! - [`ArtifactManifest`] - A stored, versioned artifact
//! - [`LocalArtifact`] - A stored artifact materialized on local disk
//! - [`RunRecord`] - One job execution registered with a store

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ArtifactError, ArtifactResult, DatasetError, DatasetResult};

// =============================================================================
// Dataset
// =============================================================================

/// A single dataset value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Raw value as read from the source file.
    Text(String),
    /// Normalized date/time value.
    Timestamp(NaiveDateTime),
    /// Missing value.
    Null,
}

impl Cell {
    /// Raw text, if this cell has not been re-typed.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

/// In-memory table with named columns; row order is the source order.
///
/// Each row remembers the physical line it started on in the source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
    lines: Vec<usize>,
}

impl Dataset {
    /// Create an empty dataset with the given columns.
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Append a row on the line after the previous one (line 2 for the first).
    pub fn push_row(&mut self, row: Vec<Cell>) -> DatasetResult<()> {
        let line = self.lines.last().map_or(2, |l| l + 1);
        self.push_record(row, line)
    }

    /// Append a row read from source line `line`. Rows must be exactly as
    /// wide as the header.
    pub fn push_record(&mut self, row: Vec<Cell>, line: usize) -> DatasetResult<()> {
        if row.len() != self.headers.len() {
            return Err(DatasetError::Csv {
                line,
                message: format!(
                    "expected {} fields, found {}",
                    self.headers.len(),
                    row.len()
                ),
            });
        }
        self.rows.push(row);
        self.lines.push(line);
        Ok(())
    }

    /// Source line of row `idx`.
    pub fn line(&self, idx: usize) -> usize {
        self.lines[idx]
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of a column, or [`DatasetError::MissingColumn`].
    pub fn require_column(&self, name: &str) -> DatasetResult<usize> {
        self.column_index(name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    }

    /// Fail on the first absent column.
    pub fn require_columns(&self, names: &[&str]) -> DatasetResult<()> {
        for name in names {
            self.require_column(name)?;
        }
        Ok(())
    }

    /// Iterate over the cells of one column.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// New dataset holding the rows for which `keep` returns `Ok(true)`.
    ///
    /// The predicate gets the row and its 0-based position in this dataset.
    pub fn filter_rows<F>(&self, mut keep: F) -> DatasetResult<Dataset>
    where
        F: FnMut(usize, &[Cell]) -> DatasetResult<bool>,
    {
        let mut rows = Vec::new();
        let mut lines = Vec::new();
        for (i, row) in self.rows.iter().enumerate() {
            if keep(i, row)? {
                rows.push(row.clone());
                lines.push(self.lines[i]);
            }
        }
        Ok(Dataset {
            headers: self.headers.clone(),
            rows,
            lines,
        })
    }

    /// Replace every cell of column `idx` in place.
    pub fn map_column<F>(&mut self, idx: usize, mut f: F)
    where
        F: FnMut(&Cell) -> Cell,
    {
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
    }
}

// =============================================================================
// Artifact References
// =============================================================================

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap());

static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?P<scope>[A-Za-z0-9_.-]+(?:/[A-Za-z0-9_.-]+)*)/)?(?P<name>[A-Za-z0-9_.-]+)(?::(?P<alias>[A-Za-z0-9_.-]+))?$",
    )
    .unwrap()
});

static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v(\d+)$").unwrap());

/// Check that a name is safe to use as an artifact name or file name.
pub fn validate_name(name: &str) -> ArtifactResult<()> {
    if name == "." || name == ".." || !NAME_RE.is_match(name) {
        return Err(ArtifactError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Which version of an artifact a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alias {
    Latest,
    Version(u32),
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alias::Latest => write!(f, "latest"),
            Alias::Version(v) => write!(f, "v{}", v),
        }
    }
}

/// A parsed artifact reference: `[scope/]name[:alias]`.
///
/// The scope (entity/project prefix) is kept for display but not
/// interpreted by the stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub scope: Option<String>,
    pub name: String,
    pub alias: Alias,
}

impl ArtifactRef {
    /// Reference to the latest version of `name`.
    pub fn latest(name: impl Into<String>) -> Self {
        Self {
            scope: None,
            name: name.into(),
            alias: Alias::Latest,
        }
    }
}

impl FromStr for ArtifactRef {
    type Err = ArtifactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ArtifactError::InvalidReference(s.to_string());
        let caps = REFERENCE_RE.captures(s.trim()).ok_or_else(invalid)?;

        let name = caps["name"].to_string();
        validate_name(&name).map_err(|_| invalid())?;

        let alias = match caps.name("alias").map(|m| m.as_str()) {
            None | Some("latest") => Alias::Latest,
            Some(other) => {
                let v = VERSION_RE
                    .captures(other)
                    .and_then(|c| c[1].parse::<u32>().ok())
                    .ok_or_else(invalid)?;
                Alias::Version(v)
            }
        };

        Ok(Self {
            scope: caps.name("scope").map(|m| m.as_str().to_string()),
            name,
            alias,
        })
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref scope) = self.scope {
            write!(f, "{}/", scope)?;
        }
        write!(f, "{}:{}", self.name, self.alias)
    }
}

// =============================================================================
// Artifacts
// =============================================================================

/// An artifact being assembled for publication.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub artifact_type: String,
    pub description: String,
    pub files: Vec<PathBuf>,
}

impl Artifact {
    pub fn new(
        name: impl Into<String>,
        artifact_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            artifact_type: artifact_type.into(),
            description: description.into(),
            files: Vec::new(),
        }
    }

    /// Attach a local file as payload.
    pub fn add_file(&mut self, path: impl Into<PathBuf>) {
        self.files.push(path.into());
    }
}

/// One payload file of a stored artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactFile {
    pub name: String,
    pub size: u64,
    /// Lowercase hex SHA-256 of the content.
    pub digest: String,
}

/// Metadata of one stored artifact version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactManifest {
    pub name: String,
    pub version: u32,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub description: String,
    pub files: Vec<ArtifactFile>,
    /// Digest over all payload files.
    pub digest: String,
    /// Run that logged this version.
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl ArtifactManifest {
    /// `name:vN`
    pub fn id(&self) -> String {
        format!("{}:v{}", self.name, self.version)
    }
}

/// A stored artifact whose payload is available in a local directory.
#[derive(Debug, Clone)]
pub struct LocalArtifact {
    pub manifest: ArtifactManifest,
    pub dir: PathBuf,
}

impl LocalArtifact {
    /// Paths of all payload files.
    pub fn files(&self) -> Vec<PathBuf> {
        self.manifest
            .files
            .iter()
            .map(|f| self.dir.join(&f.name))
            .collect()
    }

    /// Path of the single payload file.
    pub fn file(&self) -> ArtifactResult<PathBuf> {
        match self.manifest.files.as_slice() {
            [only] => Ok(self.dir.join(&only.name)),
            files => Err(ArtifactError::NotSingleFile {
                reference: self.manifest.id(),
                count: files.len(),
            }),
        }
    }
}

// =============================================================================
// Runs
// =============================================================================

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// One job execution registered with a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: String,
    pub job_type: String,
    /// Configuration recorded for provenance.
    pub config: Value,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Artifact ids (`name:vN`) consumed by the run.
    #[serde(default)]
    pub used: Vec<String>,
    /// Artifact ids (`name:vN`) produced by the run.
    #[serde(default)]
    pub logged: Vec<String>,
}

impl RunRecord {
    pub fn new(job_type: impl Into<String>, config: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job_type: job_type.into(),
            config,
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            used: Vec::new(),
            logged: Vec::new(),
        }
    }
}
