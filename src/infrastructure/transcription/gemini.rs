//! Gemini API transcriber adapter
//!
//! Produces a full transcript plus time-ranged segments so playback can
//! highlight the entry matching the current audio position. The model is
//! instructed to answer with a strict JSON array of segments.

use async_trait::async_trait;
use base64::prelude::*;
use serde::{Deserialize, Serialize};

use crate::application::ports::{Transcriber, TranscriptionError};
use crate::domain::trace::{AudioAsset, TranscriptChunk, Transcription};

/// Gemini API model to use
const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";

/// Gemini API base URL
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const SEGMENT_INSTRUCTION: &str = "Transcribe the spoken audio. Respond with ONLY a JSON array \
of segments, each {\"text\": string, \"start\": seconds, \"end\": seconds}, in order, with no \
markdown fences and no commentary. Use an empty array if there is no speech.";

// Request types for Gemini API

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Option<SystemInstruction>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

// Response types for Gemini API

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// One segment of the model's JSON answer
#[derive(Debug, Deserialize)]
struct SegmentJson {
    text: String,
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
}

/// Gemini API transcriber
pub struct GeminiTranscriber {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiTranscriber {
    /// Create a new Gemini transcriber with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a new Gemini transcriber with a custom model
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            API_BASE_URL, self.model, self.api_key
        )
    }

    fn build_request(&self, audio: &AudioAsset, bytes: &[u8]) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: audio.mime_type.to_string(),
                        data: BASE64_STANDARD.encode(bytes),
                    }),
                }],
            }],
            system_instruction: Some(SystemInstruction {
                parts: vec![TextPart {
                    text: SEGMENT_INSTRUCTION.to_string(),
                }],
            }),
        }
    }

    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let parts: Vec<&str> = response
            .candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_ref()?
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(""))
        }
    }

    /// Parse the model's segment array into a transcription. Tolerates the
    /// answer being wrapped in a markdown code fence despite instructions.
    fn parse_segments(answer: &str) -> Result<Transcription, TranscriptionError> {
        let trimmed = answer
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        let segments: Vec<SegmentJson> = serde_json::from_str(trimmed)
            .map_err(|e| TranscriptionError::ParseError(e.to_string()))?;

        let chunks: Vec<TranscriptChunk> = segments
            .iter()
            .map(|s| TranscriptChunk {
                text: s.text.trim().to_string(),
                time_range_sec: [s.start, s.end],
            })
            .collect();
        let text = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Transcription { text, chunks })
    }
}

#[async_trait]
impl Transcriber for GeminiTranscriber {
    async fn transcribe(&self, audio: &AudioAsset) -> Result<Transcription, TranscriptionError> {
        let bytes = match (&audio.data, &audio.file) {
            (Some(data), _) => data.clone(),
            (None, Some(file)) => tokio::fs::read(file)
                .await
                .map_err(|_| TranscriptionError::NoAudioData)?,
            (None, None) => return Err(TranscriptionError::NoAudioData),
        };

        let body = self.build_request(audio, &bytes);
        let response = self
            .client
            .post(self.api_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| TranscriptionError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(TranscriptionError::InvalidApiKey);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TranscriptionError::RateLimited);
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TranscriptionError::RequestFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::ParseError(e.to_string()))?;

        let answer = Self::extract_text(&parsed).ok_or(TranscriptionError::EmptyResponse)?;
        Self::parse_segments(&answer)
    }
}
