//! Process bootstrap shared by `lltrack-server` and `lltrack-scan`
//!
//! Order: `.env` → tracing → TOML config → vision credential → root folder →
//! database. Any failure aborts before the caller starts serving or scanning,
//! and a missing credential leaves nothing behind on disk.

use anyhow::{Context, Result};
use lltrack_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig, VisionConfig};
use lltrack_common::db::init_database;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::services::{Ingestor, VisionClient};

/// Load `.env` from the working directory, if present
pub fn load_dotenv() {
    // Nothing is logged yet; report once tracing is up
    if let Ok(path) = dotenvy::dotenv() {
        eprintln!("Loaded environment from {}", path.display());
    }
}

/// Install the global tracing subscriber (`RUST_LOG` overrides `default_filter`)
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Whether the caller talks to the vision API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vision {
    Required,
    NotUsed,
}

/// Everything a binary needs once configuration is resolved
pub struct Bootstrap {
    pub toml_config: TomlConfig,
    pub folders: RootFolderInitializer,
    pub pool: SqlitePool,
    vision_config: Option<VisionConfig>,
}

impl Bootstrap {
    /// Resolve configuration, create the root folder layout and open the database
    ///
    /// With [`Vision::Required`] the API key is resolved first; a missing key
    /// fails before any folder or database file is created.
    pub async fn load(
        root_folder: Option<PathBuf>,
        config_file: Option<&Path>,
        vision: Vision,
    ) -> Result<Self> {
        let toml_config = match config_file {
            Some(path) => TomlConfig::load_from(path),
            None => TomlConfig::load(),
        };

        let vision_config = match vision {
            Vision::Required => {
                let config = VisionConfig::resolve(&toml_config)?;
                info!(model = %config.model, base_url = %config.base_url, "Vision API configured");
                Some(config)
            }
            Vision::NotUsed => None,
        };

        let root_folder = RootFolderResolver::new(root_folder, &toml_config).resolve();
        info!("Root folder: {}", root_folder.display());

        let folders = RootFolderInitializer::new(root_folder);
        folders
            .ensure_directory_exists()
            .context("Failed to create root folder layout")?;

        let db_path = folders.database_path();
        info!("Database path: {}", db_path.display());
        let pool = init_database(&db_path)
            .await
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        Ok(Self {
            toml_config,
            folders,
            pool,
            vision_config,
        })
    }

    /// Vision client from the credential resolved at load time
    pub fn vision_client(&self) -> Result<VisionClient> {
        let config = self
            .vision_config
            .clone()
            .context("Vision API was not configured for this command")?;
        Ok(VisionClient::new(config)?)
    }

    /// Ingest pipeline writing into this root folder's uploads directory
    pub fn ingestor(&self) -> Result<Ingestor> {
        Ok(Ingestor::new(
            self.pool.clone(),
            self.vision_client()?,
            self.folders.uploads_dir(),
        ))
    }
}
