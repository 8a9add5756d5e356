//! Ingest pipeline: label photo in, unit record out
//!
//! 1. Validate the file extension (before anything else happens)
//! 2. Store the image under a timestamped name in the uploads folder
//! 3. Ask the vision service for the instruction number
//! 4. Create the unit unless the identifier is already tracked
//!
//! Used by both the upload endpoint and the `lltrack-scan` command.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use super::label_reading::Confidence;
use super::vision_client::{media_type_for, VisionClient};
use crate::db::{self, NewUnit};

/// Accepted image file extensions (compared case-insensitively)
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Result of ingesting one image
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// The vision call or its answer failed
    ExtractionFailed,
    /// The model found no instruction number
    NotRecognized { additional_info: String },
    /// A new unit was created
    Created {
        identifier: String,
        confidence: Confidence,
        id: i64,
    },
    /// The identifier is already tracked; `id` is the existing unit
    AlreadyExists {
        identifier: String,
        confidence: Confidence,
        id: Option<i64>,
    },
}

#[derive(Debug, Error)]
pub enum IngestError {
    /// Rejected before any external call
    #[error("{0}")]
    InvalidFile(String),

    #[error("Failed to store image: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] lltrack_common::Error),
}

/// Whether `filename` has an accepted image extension
pub fn is_allowed_image(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Keep the last path component, mapping whitespace to `_` and dropping
/// everything but ASCII alphanumerics, `.`, `-` and `_`
pub fn sanitize_file_name(name: &str) -> String {
    // Browsers on some platforms send the full client path
    let base = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(name);

    base.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect()
}

/// Name under which an uploaded image is stored
///
/// `attempt` is 0 for the first try; later attempts add a counter so a
/// collision within the same microsecond still gets its own file.
pub fn stored_file_name(original: &str, now: DateTime<Utc>, attempt: u32) -> String {
    let stamp = now.format("%Y%m%d_%H%M%S_%6f");
    let name = sanitize_file_name(original);
    if attempt == 0 {
        format!("label_{}_{}", stamp, name)
    } else {
        format!("label_{}_{}_{}", stamp, attempt, name)
    }
}

const MAX_STORE_ATTEMPTS: u32 = 100;

/// Runs the ingest pipeline against one database and uploads folder
pub struct Ingestor {
    pool: SqlitePool,
    vision: VisionClient,
    upload_dir: PathBuf,
}

impl Ingestor {
    pub fn new(pool: SqlitePool, vision: VisionClient, upload_dir: PathBuf) -> Self {
        Self {
            pool,
            vision,
            upload_dir,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Ingest an uploaded image held in memory
    pub async fn ingest_upload(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<IngestOutcome, IngestError> {
        if filename.trim().is_empty() {
            return Err(IngestError::InvalidFile("File not selected".to_string()));
        }
        if !is_allowed_image(filename) {
            return Err(IngestError::InvalidFile(
                "Unsupported file format".to_string(),
            ));
        }
        if bytes.is_empty() {
            return Err(IngestError::InvalidFile("File is empty".to_string()));
        }

        let stored = self.store_image(filename, bytes).await?;
        info!(path = %stored.display(), bytes = bytes.len(), "Image stored");

        self.process(&stored, bytes).await
    }

    /// Write `bytes` under a fresh name; never replaces an existing file
    async fn store_image(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, IngestError> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let now = Utc::now();

        for attempt in 0..MAX_STORE_ATTEMPTS {
            let path = self
                .upload_dir
                .join(stored_file_name(filename, now, attempt));
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            file.write_all(bytes).await?;
            file.flush().await?;
            return Ok(path);
        }

        Err(IngestError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("No free upload name for {}", filename),
        )))
    }

    /// Ingest an image file already on disk (copied into the uploads folder)
    pub async fn ingest_path(&self, path: &Path) -> Result<IngestOutcome, IngestError> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| IngestError::InvalidFile(format!("Invalid path: {}", path.display())))?;

        if !is_allowed_image(filename) {
            return Err(IngestError::InvalidFile(
                "Unsupported file format".to_string(),
            ));
        }

        let bytes = tokio::fs::read(path).await?;
        self.ingest_upload(filename, &bytes).await
    }

    async fn process(&self, stored: &Path, bytes: &[u8]) -> Result<IngestOutcome, IngestError> {
        let media_type = media_type_for(&stored.to_string_lossy());

        let Some(reading) = self.vision.read_label(bytes, media_type).await else {
            warn!(path = %stored.display(), "Extraction failed");
            return Ok(IngestOutcome::ExtractionFailed);
        };

        if reading.is_not_found() {
            info!(path = %stored.display(), "No instruction number on label");
            return Ok(IngestOutcome::NotRecognized {
                additional_info: reading.additional_info,
            });
        }

        let unit = NewUnit {
            identifier: reading.identifier.clone(),
            name: Some(format!("LoadLock {}", reading.identifier)),
            image_path: Some(stored.to_string_lossy().into_owned()),
            notes: Some(format!("Confidence: {}", reading.confidence)),
        };

        match db::create_unit(&self.pool, &unit).await? {
            (true, Some(id)) => Ok(IngestOutcome::Created {
                identifier: reading.identifier,
                confidence: reading.confidence,
                id,
            }),
            _ => {
                let id = db::find_unit_id(&self.pool, &reading.identifier).await?;
                info!(identifier = %reading.identifier, ?id, "Identifier already tracked");
                Ok(IngestOutcome::AlreadyExists {
                    identifier: reading.identifier,
                    confidence: reading.confidence,
                    id,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_allowed_extensions() {
        for name in ["a.jpg", "a.JPG", "b.jpeg", "c.png", "d.gif", "e.WebP", "x.y.png"] {
            assert!(is_allowed_image(name), "{} should be allowed", name);
        }
        for name in ["a.txt", "png", "a.png.exe", "", ".", "a.bmp", "a."] {
            assert!(!is_allowed_image(name), "{} should be rejected", name);
        }
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("label 1.jpg"), "label_1.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\photo.png"), "photo.png");
        assert_eq!(sanitize_file_name("תווית.png"), ".png");
    }

    #[test]
    fn test_stored_file_name_is_timestamped() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
            + chrono::Duration::microseconds(123_456);
        assert_eq!(
            stored_file_name("IMG 001.jpg", now, 0),
            "label_20240309_140507_123456_IMG_001.jpg"
        );
        assert_eq!(
            stored_file_name("IMG 001.jpg", now, 2),
            "label_20240309_140507_123456_2_IMG_001.jpg"
        );
        // Extension survives even when the stem is stripped entirely
        let stored = stored_file_name("תווית.png", now, 0);
        assert_eq!(stored, "label_20240309_140507_123456_.png");
        assert_eq!(media_type_for(&stored), "image/png");
    }
}
