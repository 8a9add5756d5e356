//! lltrack-scan: command-line access to the LoadLock tracker
//!
//! Ingests label photos from disk through the same pipeline as the upload
//! endpoint, lists and exports units, and runs free-form document
//! extraction.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lltrack_server::db;
use lltrack_server::services::document::{extract_document, save_results};
use lltrack_server::services::export::write_units_csv;
use lltrack_server::services::{IngestError, IngestOutcome};
use lltrack_server::startup::{self, Bootstrap, Vision};
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(name = "lltrack-scan")]
#[command(about = "Scan load-lock labels and manage tracked units from the command line")]
#[command(version)]
struct Cli {
    /// Root folder holding the database, uploads and output
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    /// Config file (default ~/.config/lltrack/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read instruction numbers from label photos and register the units
    Ingest {
        /// Image files (jpg, jpeg, png, gif, webp)
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Print every tracked unit
    List,
    /// Write all units as CSV
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Extract text and key fields from a document photo
    Extract {
        image: PathBuf,

        /// File holding a custom prompt
        #[arg(long)]
        prompt_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    startup::load_dotenv();
    startup::init_tracing("lltrack_server=warn,lltrack_common=warn");

    let cli = Cli::parse();
    debug!(
        "lltrack-scan v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let vision = match cli.command {
        Commands::Ingest { .. } | Commands::Extract { .. } => Vision::Required,
        Commands::List | Commands::Export { .. } => Vision::NotUsed,
    };
    let bootstrap = Bootstrap::load(cli.root_folder, cli.config.as_deref(), vision).await?;

    let result = match cli.command {
        Commands::Ingest { images } => ingest(&bootstrap, &images).await,
        Commands::List => list(&bootstrap).await,
        Commands::Export { output } => export(&bootstrap, output.as_deref()).await,
        Commands::Extract { image, prompt_file } => {
            extract(&bootstrap, &image, prompt_file.as_deref()).await
        }
    };

    bootstrap.pool.close().await;
    result
}

async fn ingest(bootstrap: &Bootstrap, images: &[PathBuf]) -> Result<()> {
    let ingestor = bootstrap.ingestor()?;
    let mut failed = 0usize;

    for image in images {
        match ingestor.ingest_path(image).await {
            Ok(IngestOutcome::Created {
                identifier,
                confidence,
                id,
            }) => println!(
                "{}: created unit {} (id {}, confidence {})",
                image.display(),
                identifier,
                id,
                confidence
            ),
            Ok(IngestOutcome::AlreadyExists {
                identifier, id, ..
            }) => println!(
                "{}: {} already tracked{}",
                image.display(),
                identifier,
                id.map(|id| format!(" (id {})", id)).unwrap_or_default()
            ),
            Ok(IngestOutcome::NotRecognized { additional_info }) => {
                failed += 1;
                println!(
                    "{}: could not recognize instruction number ({})",
                    image.display(),
                    additional_info
                );
            }
            Ok(IngestOutcome::ExtractionFailed) => {
                failed += 1;
                println!("{}: error processing image", image.display());
            }
            Err(IngestError::InvalidFile(msg)) => {
                failed += 1;
                println!("{}: {}", image.display(), msg);
            }
            Err(e) => {
                failed += 1;
                error!("{}: {}", image.display(), e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} images were not registered", failed, images.len());
    }
    Ok(())
}

async fn list(bootstrap: &Bootstrap) -> Result<()> {
    let units = db::list_units(&bootstrap.pool).await?;
    if units.is_empty() {
        println!("No units tracked");
        return Ok(());
    }

    println!(
        "{:>5}  {:<16} {:<24} {:<10} {:<16} {}",
        "ID", "IDENTIFIER", "NAME", "STATUS", "SAMPLE", "UPDATED"
    );
    for unit in units {
        println!(
            "{:>5}  {:<16} {:<24} {:<10} {:<16} {}",
            unit.id,
            unit.identifier,
            unit.name,
            unit.status,
            unit.current_sample.as_deref().unwrap_or("-"),
            unit.updated_at
        );
    }
    Ok(())
}

async fn export(bootstrap: &Bootstrap, output: Option<&Path>) -> Result<()> {
    let units = db::list_units(&bootstrap.pool).await?;

    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_units_csv(&units, file)?;
            eprintln!("Exported {} units to {}", units.len(), path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            write_units_csv(&units, &mut handle)?;
            handle.flush()?;
        }
    }
    Ok(())
}

async fn extract(bootstrap: &Bootstrap, image: &Path, prompt_file: Option<&Path>) -> Result<()> {
    let prompt = match prompt_file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read prompt file {}", path.display()))?,
        ),
        None => None,
    };

    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("File not found: {}", image.display()))?;
    let file_name = image
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let client = bootstrap.vision_client()?;
    let answer = extract_document(&client, &bytes, file_name, prompt.as_deref())
        .await
        .context("Document extraction failed")?;

    println!("{}", answer);

    let path = save_results(&bootstrap.folders.output_dir(), &answer, chrono::Utc::now())?;
    eprintln!("Results saved: {}", path.display());
    Ok(())
}
