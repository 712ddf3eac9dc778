//! artifact-store - manage and serve the local artifact store
//!
//! ```bash
//! artifact-store list                                  # Latest version of every artifact
//! artifact-store show sample.csv:latest                # Manifest of one version
//! artifact-store import sample.csv --name sample.csv --type raw_data
//! artifact-store serve --port 3000                     # Start HTTP server
//! ```

use basic_cleaning::api::server::start_server;
use basic_cleaning::config::DEFAULT_STORE_DIR;
use basic_cleaning::{ArtifactRef, LocalArtifactStore, StoreConfig};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "artifact-store")]
#[command(about = "Manage the local versioned artifact store", long_about = None)]
struct Cli {
    /// Store root (default: ARTIFACT_STORE_DIR or .artifacts)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the latest version of every artifact
    List,

    /// Show the manifest of an artifact version
    Show {
        /// Artifact reference, e.g. sample.csv:latest or sample.csv:v2
        reference: String,
    },

    /// Publish a local file as a new artifact version
    Import {
        /// File to import
        file: PathBuf,
        /// Artifact name
        #[arg(short, long)]
        name: String,
        /// Artifact type
        #[arg(short = 't', long = "type")]
        artifact_type: String,
        /// Artifact description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let root = cli.root.unwrap_or_else(default_root);

    let result = match cli.command {
        Commands::List => cmd_list(&root),
        Commands::Show { reference } => cmd_show(&root, &reference),
        Commands::Import {
            file,
            name,
            artifact_type,
            description,
        } => cmd_import(&root, &file, &name, &artifact_type, &description),
        Commands::Serve { port } => start_server(root, port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// The local root from the environment; a configured URL does not apply here.
fn default_root() -> PathBuf {
    match StoreConfig::from_env() {
        StoreConfig::Local { root } => root,
        StoreConfig::Http { .. } => PathBuf::from(DEFAULT_STORE_DIR),
    }
}

fn cmd_list(root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = LocalArtifactStore::open(root)?;
    let manifests = store.list_artifacts()?;
    if manifests.is_empty() {
        eprintln!("📋 No artifacts stored yet.");
        eprintln!("   Use 'artifact-store import <file> --name <name> --type <type>' to add one.");
        return Ok(());
    }

    eprintln!("📋 Stored artifacts ({}):\n", manifests.len());
    for m in manifests {
        println!("  📄 {} ({})", m.id(), m.artifact_type);
        if !m.description.is_empty() {
            println!("     {}", m.description);
        }
        println!("     Files: {}", m.files.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(", "));
        println!("     Created: {} by run {}", m.created_at, m.created_by);
        println!();
    }
    Ok(())
}

fn cmd_show(root: &Path, reference: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = LocalArtifactStore::open(root)?;
    let reference: ArtifactRef = reference.parse()?;
    let artifact = store.resolve(&reference)?;

    println!("{}", serde_json::to_string_pretty(&artifact.manifest)?);
    eprintln!("📁 {}", artifact.dir.display());
    Ok(())
}

fn cmd_import(
    root: &Path,
    file: &Path,
    name: &str,
    artifact_type: &str,
    description: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = LocalArtifactStore::open(root)?;
    eprintln!("📥 Importing: {}", file.display());
    let manifest = store.import_file(file, name, artifact_type, description)?;
    eprintln!("✅ Stored as {} ({})", manifest.id(), manifest.digest);
    Ok(())
}
