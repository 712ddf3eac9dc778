//! basic_cleaning - download a CSV artifact, clean it, publish the result
//!
//! ```bash
//! basic_cleaning \
//!     --input_artifact "sample.csv:latest" \
//!     --output_artifact "clean_sample.csv" \
//!     --output_type "clean_sample" \
//!     --output_description "Data with outliers and null values removed" \
//!     --min_price 10 \
//!     --max_price 350
//! ```
//!
//! The artifact store is chosen from the environment (`ARTIFACT_STORE_URL`,
//! `ARTIFACT_STORE_DIR`); see [`basic_cleaning::StoreConfig`].

use basic_cleaning::{open_store, run_cleaning, CleaningConfig, StoreConfig};
use clap::Parser;

#[derive(Parser)]
#[command(name = "basic_cleaning")]
#[command(about = "A very basic data cleaning", long_about = None)]
struct Cli {
    /// Fully qualified name of the input artifact
    #[arg(long = "input_artifact")]
    input_artifact: String,

    /// Name of the output artifact
    #[arg(long = "output_artifact")]
    output_artifact: String,

    /// Type of the output artifact
    #[arg(long = "output_type")]
    output_type: String,

    /// Description of the output artifact
    #[arg(long = "output_description")]
    output_description: String,

    /// Minimum price to keep (inclusive)
    #[arg(long = "min_price", allow_negative_numbers = true)]
    min_price: f64,

    /// Maximum price to keep (inclusive)
    #[arg(long = "max_price", allow_negative_numbers = true)]
    max_price: f64,
}

impl From<Cli> for CleaningConfig {
    fn from(cli: Cli) -> Self {
        CleaningConfig {
            input_artifact: cli.input_artifact,
            output_artifact: cli.output_artifact,
            output_type: cli.output_type,
            output_description: cli.output_description,
            min_price: cli.min_price,
            max_price: cli.max_price,
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let config = CleaningConfig::from(Cli::parse());

    if let Err(e) = run(config).await {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: CleaningConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store_config = StoreConfig::from_env();
    match store_config {
        StoreConfig::Local { ref root } => eprintln!("📦 Artifact store: {}", root.display()),
        StoreConfig::Http { ref base_url, .. } => eprintln!("📦 Artifact store: {}", base_url),
    }
    let store = open_store(&store_config)?;
    let workdir = std::env::current_dir()?;

    eprintln!("📄 Cleaning: {}", config.input_artifact);
    eprintln!("   Price range: [{}, {}]", config.min_price, config.max_price);

    let report = run_cleaning(store.as_ref(), &config, &workdir).await?;

    eprintln!("\n⚙️  Input: {} ({} rows)", report.input, report.stats.input_rows);
    eprintln!("   Kept: {}", report.stats.kept_rows);
    eprintln!("   Dropped: {}", report.stats.dropped_rows);
    if report.stats.invalid_dates > 0 {
        eprintln!("   ⚠️  Unparsable dates set to null: {}", report.stats.invalid_dates);
    }
    eprintln!("\n✅ Published {} ({})", report.output.id(), report.output.digest);
    eprintln!("   Run: {}", report.run_id);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    const ARGS: &[&str] = &[
        "basic_cleaning",
        "--input_artifact",
        "sample.csv:latest",
        "--output_artifact",
        "clean_sample.csv",
        "--output_type",
        "clean_sample",
        "--output_description",
        "Data with outliers and null values removed",
    ];

    fn parse(extra: &[&str]) -> Result<CleaningConfig, clap::Error> {
        let args: Vec<&str> = ARGS.iter().chain(extra).copied().collect();
        Cli::try_parse_from(args).map(CleaningConfig::from)
    }

    #[test]
    fn test_underscore_flags() {
        let config = parse(&["--min_price", "10", "--max_price", "350"]).unwrap();
        assert_eq!(config.input_artifact, "sample.csv:latest");
        assert_eq!(config.output_artifact, "clean_sample.csv");
        assert_eq!(config.output_type, "clean_sample");
        assert_eq!(config.output_description, "Data with outliers and null values removed");
        assert_eq!(config.min_price, 10.0);
        assert_eq!(config.max_price, 350.0);
    }

    #[test]
    fn test_negative_min_price() {
        let config = parse(&["--min_price", "-10.5", "--max_price", "0"]).unwrap();
        assert_eq!(config.min_price, -10.5);
        assert_eq!(config.max_price, 0.0);
    }

    #[test]
    fn test_missing_flag_is_rejected() {
        let err = parse(&["--min_price", "10"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_non_numeric_price_is_rejected() {
        let err = parse(&["--min_price", "cheap", "--max_price", "350"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }
}
