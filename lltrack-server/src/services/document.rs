//! Free-form document extraction
//!
//! Sends an arbitrary document photo to the vision service and keeps the
//! answer as a results file in the output folder. Nothing is written to the
//! database.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::vision_client::{media_type_for, VisionClient, VisionError};

/// Token cap for document answers (larger than label answers)
pub const DOCUMENT_MAX_TOKENS: u32 = 2048;

pub const DOCUMENT_PROMPT: &str = r#"Please extract and analyze the text content from this document image.
Return the results as JSON with this structure:
{
    "document_type": "description of document type",
    "text_content": "all extracted text",
    "key_information": {
        "field1": "value1",
        "field2": "value2"
    },
    "notes": "any additional observations"
}"#;

const REFUSAL_MARKERS: [&str; 3] = ["unable to", "i can't", "i cannot"];

/// Whether the answer reads like the model declined the image
pub fn looks_like_refusal(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    REFUSAL_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Run one extraction; `prompt` defaults to [`DOCUMENT_PROMPT`]
pub async fn extract_document(
    client: &VisionClient,
    image: &[u8],
    file_name: &str,
    prompt: Option<&str>,
) -> Result<String, VisionError> {
    let answer = client
        .complete(
            image,
            media_type_for(file_name),
            prompt.unwrap_or(DOCUMENT_PROMPT),
            DOCUMENT_MAX_TOKENS,
        )
        .await?;

    if looks_like_refusal(&answer) {
        warn!("Model could not process the document; try a sharper image");
    }

    Ok(answer)
}

/// File name for a results file written at `now`
pub fn results_file_name(now: DateTime<Utc>) -> String {
    format!("results_{}.json", now.format("%Y%m%d_%H%M%S"))
}

/// Write `answer` into `output_dir`
///
/// A JSON answer is pretty-printed; anything else is written verbatim.
pub fn save_results(output_dir: &Path, answer: &str, now: DateTime<Utc>) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(results_file_name(now));

    let contents = serde_json::from_str::<serde_json::Value>(answer.trim())
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| answer.to_string());

    std::fs::write(&path, contents)?;
    info!("Results saved: {}", path.display());
    Ok(path)
}
