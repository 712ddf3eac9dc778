//! The cleaning job: fetch, clean, publish.
//!
//! # Example
//!
//! ```rust,ignore
//! use basic_cleaning::{open_store, run_cleaning, CleaningConfig, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = open_store(&StoreConfig::from_env())?;
//!     let config = CleaningConfig {
//!         input_artifact: "sample.csv:latest".into(),
//!         output_artifact: "clean_sample.csv".into(),
//!         output_type: "clean_sample".into(),
//!         output_description: "Data with outliers and null values removed".into(),
//!         min_price: 10.0,
//!         max_price: 350.0,
//!     };
//!     let report = run_cleaning(store.as_ref(), &config, &std::env::current_dir()?).await?;
//!     println!("Published {}", report.output.id());
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::config::{CleaningConfig, JOB_TYPE};
use crate::error::JobResult;
use crate::models::{Artifact, ArtifactManifest, ArtifactRef, RunRecord, RunStatus};
use crate::parser::{parse_csv_file, write_csv_file};
use crate::store::ArtifactStore;
use crate::transform::{clean_dataset, validate_columns, CleanStats, LAST_REVIEW_COLUMN, PRICE_COLUMN};

/// Name of the transient output file, created in the working directory.
///
/// The name is fixed: two jobs sharing a working directory overwrite each other.
pub const OUTPUT_FILE_NAME: &str = "clean_sample.csv";

/// Outcome of a successful job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningReport {
    pub run_id: String,
    /// Input artifact id (`name:vN`)
    pub input: String,
    pub output: ArtifactManifest,
    pub stats: CleanStats,
}

/// Local file removed when the guard goes out of scope, on every exit path.
#[derive(Debug)]
pub struct TempOutput {
    path: PathBuf,
}

impl TempOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempOutput {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => log_info(format!("Removed {}", self.path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log_warning(format!("Could not remove {}: {}", self.path.display(), e)),
        }
    }
}

/// Run the cleaning job once against `store`.
///
/// Registers a run, cleans the input artifact and publishes the result as a
/// new version of `config.output_artifact`. The run is marked failed when any
/// step fails; the temporary output file never outlives this call.
pub async fn run_cleaning<S>(store: &S, config: &CleaningConfig, workdir: &Path) -> JobResult<CleaningReport>
where
    S: ArtifactStore + ?Sized,
{
    let reference: ArtifactRef = config.input_artifact.parse()?;

    let run = store.init_run(JOB_TYPE, config.to_json()).await?;
    log_info(format!("Run {} started ({})", run.id, JOB_TYPE));

    match execute(store, &run, &reference, config, workdir).await {
        Ok(report) => {
            store.finish_run(&run, RunStatus::Finished).await?;
            log_success(format!("Run {} finished", run.id));
            Ok(report)
        }
        Err(e) => {
            if let Err(finish_err) = store.finish_run(&run, RunStatus::Failed).await {
                log_warning(format!("Could not mark run {} as failed: {}", run.id, finish_err));
            }
            Err(e)
        }
    }
}

async fn execute<S>(
    store: &S,
    run: &RunRecord,
    reference: &ArtifactRef,
    config: &CleaningConfig,
    workdir: &Path,
) -> JobResult<CleaningReport>
where
    S: ArtifactStore + ?Sized,
{
    log_info("Downloading artifact");
    let input = store.use_artifact(run, reference).await?;
    let input_path = input.file()?;
    log_info_indent(format!("{} -> {}", input.manifest.id(), input_path.display()), 1);

    let parsed = parse_csv_file(&input_path)?;
    validate_columns(&parsed.dataset)?;
    log_info_indent(
        format!(
            "{} rows, {} columns ({})",
            parsed.dataset.len(),
            parsed.dataset.headers().len(),
            parsed.encoding
        ),
        1,
    );

    log_info(format!(
        "Start dropping outliers ({} outside [{}, {}])",
        PRICE_COLUMN, config.min_price, config.max_price
    ));
    log_info(format!("Start converting {} to datetime", LAST_REVIEW_COLUMN));
    let cleaned = clean_dataset(&parsed.dataset, config.price_range())?;
    let stats = cleaned.stats;
    log_info_indent(format!("Kept {} rows, dropped {}", stats.kept_rows, stats.dropped_rows), 1);
    if stats.invalid_dates > 0 {
        log_warning(format!(
            "{} {} values could not be parsed and were set to null",
            stats.invalid_dates, LAST_REVIEW_COLUMN
        ));
    }

    let output = TempOutput::new(workdir.join(OUTPUT_FILE_NAME));
    write_csv_file(&cleaned.dataset, output.path())?;

    let mut artifact = Artifact::new(
        config.output_artifact.as_str(),
        config.output_type.as_str(),
        config.output_description.as_str(),
    );
    artifact.add_file(output.path());

    log_info("Logging artifact");
    let manifest = store.log_artifact(run, &artifact).await?;
    log_success(format!("Published {}", manifest.id()));

    Ok(CleaningReport {
        run_id: run.id.clone(),
        input: input.manifest.id(),
        output: manifest,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArtifactError, DatasetError, JobError};
    use crate::store::LocalArtifactStore;
    use tempfile::{tempdir, TempDir};

    const LISTINGS: &str = "\
id,name,price,last_review
1,Skylit Midtown Castle,50,2019-05-21
2,Cozy Entire Floor,150,2019-05-21
3,THE VILLAGE OF HARLEM,300,not-a-date
";

    struct Fixture {
        _dir: TempDir,
        store: LocalArtifactStore,
        workdir: PathBuf,
    }

    fn fixture(input: &str) -> Fixture {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::open(dir.path().join("store")).unwrap();
        let workdir = dir.path().join("work");
        fs::create_dir_all(&workdir).unwrap();

        let src = dir.path().join("sample.csv");
        fs::write(&src, input).unwrap();
        store
            .import_file(&src, "sample.csv", "raw_data", "Raw listings")
            .unwrap();

        Fixture { _dir: dir, store, workdir }
    }

    fn config(min_price: f64, max_price: f64) -> CleaningConfig {
        CleaningConfig {
            input_artifact: "sample.csv:latest".into(),
            output_artifact: "clean_sample.csv".into(),
            output_type: "clean_sample".into(),
            output_description: "Data with outliers and null values removed".into(),
            min_price,
            max_price,
        }
    }

    fn published(fx: &Fixture, report: &CleaningReport) -> String {
        let reference = ArtifactRef {
            scope: None,
            name: report.output.name.clone(),
            alias: crate::models::Alias::Version(report.output.version),
        };
        let artifact = fx.store.resolve(&reference).unwrap();
        fs::read_to_string(artifact.file().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_publishes_cleaned_artifact() {
        let fx = fixture(LISTINGS);
        let report = run_cleaning(&fx.store, &config(100.0, 200.0), &fx.workdir)
            .await
            .unwrap();

        assert_eq!(report.input, "sample.csv:v0");
        assert_eq!(report.output.id(), "clean_sample.csv:v0");
        assert_eq!(report.output.artifact_type, "clean_sample");
        assert_eq!(report.output.files[0].name, OUTPUT_FILE_NAME);
        assert_eq!(report.stats.kept_rows, 1);
        assert_eq!(
            published(&fx, &report),
            "id,name,price,last_review\n2,Cozy Entire Floor,150,2019-05-21\n"
        );
    }

    #[tokio::test]
    async fn test_temp_file_removed_after_success() {
        let fx = fixture(LISTINGS);
        run_cleaning(&fx.store, &config(0.0, 1000.0), &fx.workdir)
            .await
            .unwrap();
        assert!(!fx.workdir.join(OUTPUT_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_run_records_config_and_lineage() {
        let fx = fixture(LISTINGS);
        let report = run_cleaning(&fx.store, &config(10.0, 350.0), &fx.workdir)
            .await
            .unwrap();

        let run = fx.store.load_run(&report.run_id).unwrap();
        assert_eq!(run.job_type, JOB_TYPE);
        assert_eq!(run.status, RunStatus::Finished);
        assert_eq!(run.config["min_price"], 10.0);
        assert_eq!(run.config["output_artifact"], "clean_sample.csv");
        assert_eq!(run.used, vec!["sample.csv:v0"]);
        assert_eq!(run.logged, vec!["clean_sample.csv:v0"]);
    }

    #[tokio::test]
    async fn test_repeated_runs_yield_identical_versions() {
        let fx = fixture(LISTINGS);
        let first = run_cleaning(&fx.store, &config(0.0, 1000.0), &fx.workdir)
            .await
            .unwrap();
        let second = run_cleaning(&fx.store, &config(0.0, 1000.0), &fx.workdir)
            .await
            .unwrap();

        assert_eq!(first.output.version, 0);
        assert_eq!(second.output.version, 1);
        assert_eq!(first.output.digest, second.output.digest);
        assert_eq!(published(&fx, &first), published(&fx, &second));
    }

    #[tokio::test]
    async fn test_unparsable_dates_become_empty() {
        let fx = fixture(LISTINGS);
        let report = run_cleaning(&fx.store, &config(0.0, 1000.0), &fx.workdir)
            .await
            .unwrap();

        assert_eq!(report.stats.invalid_dates, 1);
        assert!(published(&fx, &report).ends_with("3,THE VILLAGE OF HARLEM,300,\n"));
    }

    #[tokio::test]
    async fn test_reversed_bounds_publish_header_only() {
        let fx = fixture(LISTINGS);
        let report = run_cleaning(&fx.store, &config(200.0, 100.0), &fx.workdir)
            .await
            .unwrap();

        assert_eq!(report.stats.kept_rows, 0);
        assert_eq!(published(&fx, &report), "id,name,price,last_review\n");
    }

    #[tokio::test]
    async fn test_missing_column_fails_run() {
        let fx = fixture("id,price\n1,100\n");
        let err = run_cleaning(&fx.store, &config(0.0, 1000.0), &fx.workdir)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            JobError::Dataset(DatasetError::MissingColumn(ref c)) if c == LAST_REVIEW_COLUMN
        ));
        assert!(!fx.workdir.join(OUTPUT_FILE_NAME).exists());
        assert!(fx.store.versions("clean_sample.csv").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_still_removes_temp_file() {
        let fx = fixture(LISTINGS);
        let mut bad = config(0.0, 1000.0);
        bad.output_artifact = "not a valid name".into();

        let err = run_cleaning(&fx.store, &bad, &fx.workdir).await.unwrap_err();

        assert!(matches!(err, JobError::Artifact(ArtifactError::InvalidName(_))));
        assert!(!fx.workdir.join(OUTPUT_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_failed_run_is_marked_failed() {
        let fx = fixture(LISTINGS);
        let mut missing = config(0.0, 1000.0);
        missing.input_artifact = "nothing_here:v0".into();

        let err = run_cleaning(&fx.store, &missing, &fx.workdir).await.unwrap_err();
        assert!(matches!(err, JobError::Artifact(ArtifactError::NotFound(_))));

        let runs: Vec<RunRecord> = fs::read_dir(fx.store.root().join("runs"))
            .unwrap()
            .flatten()
            .map(|e| serde_json::from_str(&fs::read_to_string(e.path()).unwrap()).unwrap())
            .collect();
        let job_run = runs.iter().find(|r| r.job_type == JOB_TYPE).unwrap();
        assert_eq!(job_run.status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn test_invalid_reference_fails_before_run() {
        let fx = fixture(LISTINGS);
        let mut bad = config(0.0, 1000.0);
        bad.input_artifact = "sample.csv:production".into();

        let err = run_cleaning(&fx.store, &bad, &fx.workdir).await.unwrap_err();
        assert!(matches!(err, JobError::Artifact(ArtifactError::InvalidReference(_))));
    }

    #[test]
    fn test_temp_output_guard_removes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(OUTPUT_FILE_NAME);
        {
            let guard = TempOutput::new(&path);
            fs::write(guard.path(), "x").unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }
}
