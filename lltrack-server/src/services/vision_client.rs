//! Vision API client
//!
//! Sends one image plus an instruction prompt to an OpenAI-compatible
//! `/chat/completions` endpoint and returns the model's text answer.
//! A single request timeout bounds each call; there is no retry or rate
//! limiting.

use base64::{engine::general_purpose::STANDARD, Engine};
use lltrack_common::config::VisionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::label_reading::{parse_label_reading, LabelReading, LABEL_PROMPT};

const USER_AGENT: &str = concat!("lltrack/", env!("CARGO_PKG_VERSION"));

/// Vision client errors
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Response contained no choices")]
    NoChoices,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    ImageUrl { image_url: ImageUrl },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Media type for an image file name or extension; JPEG when unknown
pub fn media_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(file_name)
        .to_ascii_lowercase();

    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

/// Client for the external vision-language API
#[derive(Clone)]
pub struct VisionClient {
    http_client: reqwest::Client,
    config: VisionConfig,
}

impl VisionClient {
    pub fn new(config: VisionConfig) -> Result<Self, VisionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VisionError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Send `image` with `prompt` and return the first choice's text
    pub async fn complete(
        &self,
        image: &[u8],
        media_type: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, VisionError> {
        let data_url = format!("data:{};base64,{}", media_type, STANDARD.encode(image));

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                    ContentPart::Text { text: prompt },
                ],
            }],
            max_tokens,
        };

        debug!(
            model = %self.config.model,
            image_bytes = image.len(),
            media_type,
            "Querying vision API"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VisionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(VisionError::Api(status.as_u16(), error_text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| VisionError::Parse(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(VisionError::NoChoices)
    }

    /// Read the instruction number from a label photo
    ///
    /// Every failure (network, HTTP status, payload shape, unparseable answer)
    /// yields `None`; callers treat that as the normal failure path.
    pub async fn read_label(&self, image: &[u8], media_type: &str) -> Option<LabelReading> {
        let answer = match self
            .complete(image, media_type, LABEL_PROMPT, self.config.max_tokens)
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Vision request failed: {}", e);
                return None;
            }
        };

        match parse_label_reading(&answer) {
            Ok(reading) => {
                info!(
                    identifier = %reading.identifier,
                    confidence = %reading.confidence,
                    "Label read"
                );
                Some(reading)
            }
            Err(e) => {
                warn!("Could not parse vision answer: {}", e);
                debug!(answer = %answer, "Unparseable vision answer");
                None
            }
        }
    }
}
