use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::NormalizedImage;
use crate::config::VisionSettings;
use crate::error::{AppError, ConversionError, NetworkError, ResponseParseError};

/// Content the vision service answers with when no formula is visible.
pub const NO_FORMULA_SENTINEL: &str = "None";

/// Prompt plus the JPEG payload for one vision query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub prompt: String,
    pub image_base64: String,
}

impl QueryRequest {
    pub fn from_image(
        prompt: &str,
        image: &NormalizedImage,
        jpeg_quality: u8,
    ) -> Result<Self, ConversionError> {
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgba8(image.clone().into_rgba_image()).to_rgb8();
        let mut jpeg = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut jpeg, jpeg_quality)
            .encode_image(&rgb)
            .map_err(|e| ConversionError::Encode(e.to_string()))?;

        Ok(Self {
            prompt: prompt.to_string(),
            image_base64: STANDARD.encode(jpeg.into_inner()),
        })
    }

    pub fn data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.image_base64)
    }
}

/// What the vision service recognized in a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    Formula(String),
    NoFormula,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Extracts `choices[0].message.content` from a chat completion body.
pub fn parse_recognition(body: &str) -> Result<Recognition, ResponseParseError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ResponseParseError::InvalidJson(e.to_string()))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or(ResponseParseError::MissingContent)?;

    if content == NO_FORMULA_SENTINEL {
        Ok(Recognition::NoFormula)
    } else if content.is_empty() {
        Err(ResponseParseError::EmptyContent)
    } else {
        Ok(Recognition::Formula(content))
    }
}

/// Visual recognition service. Returns the raw response body on a 2xx.
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn recognize(&self, request: &QueryRequest) -> Result<String, NetworkError>;
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
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

/// Chat-completions vision endpoint authenticated with a bearer key.
pub struct OpenAiVisionClient {
    http: reqwest::Client,
    settings: VisionSettings,
}

impl OpenAiVisionClient {
    pub fn new(settings: VisionSettings, connect_timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    fn body<'a>(&'a self, request: &'a QueryRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: &request.prompt,
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: request.data_url(),
                        },
                    },
                ],
            }],
            max_tokens: self.settings.max_tokens,
        }
    }
}

#[async_trait]
impl VisionClient for OpenAiVisionClient {
    async fn recognize(&self, request: &QueryRequest) -> Result<String, NetworkError> {
        debug!(
            "Posting vision query ({} base64 bytes) to {}",
            request.image_base64.len(),
            self.settings.endpoint
        );
        let response = self
            .http
            .post(&self.settings.endpoint)
            .bearer_auth(self.settings.api_key.expose())
            .json(&self.body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}
