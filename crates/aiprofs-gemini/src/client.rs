//! `GeminiClient` - REST implementation of [`GenerativeApi`].
//!
//! Files go through the resumable upload protocol; conversations are held
//! client-side and replayed in full on every `generateContent` call.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use aiprofs_core::config::GeminiConfig;
use aiprofs_core::UploadedDocument;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::api::{ChatSession, GenerativeApi, RemoteFile};
use crate::error::GeminiError;

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// HTTP client for the Gemini generative-language API.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    system_instruction: Option<String>,
    generation_config: GenerationConfig,
}

impl GeminiClient {
    /// Build a client from configuration.
    ///
    /// Fails with [`GeminiError::Configuration`] when the API key is missing.
    pub fn from_config(config: &GeminiConfig) -> Result<Self, GeminiError> {
        let api_key = config.require_api_key()?.to_string();
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GeminiError::Configuration(format!("failed to build HTTP client: {e}")))?;

        let system_instruction = Some(config.system_instruction.clone())
            .filter(|instruction| !instruction.trim().is_empty());

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            system_instruction,
            generation_config: GenerationConfig::from(config),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, contents: &[Content]) -> Result<String, GeminiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateContentRequest {
            contents,
            system_instruction: self.system_instruction.as_deref().map(Content::system),
            generation_config: &self.generation_config,
        };

        tracing::debug!(model = %self.model, turns = contents.len(), "generateContent");

        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: GenerateContentResponse = check_status(response).await?.json().await?;
        extract_text_response(parsed)
    }
}

#[async_trait]
impl GenerativeApi for GeminiClient {
    async fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFile, GeminiError> {
        let bytes = tokio::fs::read(path).await?;

        let start = self
            .http
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "displayName": display_name } }))
            .send()
            .await?;
        let start = check_status(start).await?;

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                GeminiError::Protocol("upload start response carried no upload URL".to_string())
            })?;

        let finished = self
            .http
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header(CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await?;
        let envelope: FileEnvelope = check_status(finished).await?.json().await?;

        tracing::debug!(name = %envelope.file.name, state = %envelope.file.state, "File uploaded");
        Ok(envelope.file)
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, GeminiError> {
        let url = format!("{}/v1beta/{}", self.base_url, name.trim_start_matches('/'));
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn start_chat(
        &self,
        documents: &[UploadedDocument],
    ) -> Result<Arc<dyn ChatSession>, GeminiError> {
        let mut history = Vec::new();
        if !documents.is_empty() {
            history.push(Content {
                role: Some("user".to_string()),
                parts: documents.iter().map(Part::file).collect(),
            });
        }

        Ok(Arc::new(GeminiChatSession {
            client: self.clone(),
            history: Mutex::new(history),
        }))
    }
}

/// A conversation whose turn history lives in this process.
///
/// Turns are serialized by the history lock, so concurrent messages in one
/// session never interleave.
pub struct GeminiChatSession {
    client: GeminiClient,
    history: Mutex<Vec<Content>>,
}

#[async_trait]
impl ChatSession for GeminiChatSession {
    async fn send_message(&self, message: &str) -> Result<String, GeminiError> {
        let mut history = self.history.lock().await;

        let mut contents = history.clone();
        contents.push(Content::user(message));

        let reply = self.client.generate(&contents).await?;

        // Only a completed exchange enters the history.
        *history = contents;
        history.push(Content::model(&reply));
        Ok(reply)
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: String,
}

impl From<&GeminiConfig> for GenerationConfig {
    fn from(config: &GeminiConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            max_output_tokens: config.max_output_tokens,
            response_mime_type: config.response_mime_type.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part::Text {
                text: text.to_string(),
            }],
        }
    }

    fn model(text: &str) -> Self {
        Self {
            role: Some("model".to_string()),
            parts: vec![Part::Text {
                text: text.to_string(),
            }],
        }
    }

    fn system(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part::Text {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileDataPayload,
    },
}

impl Part {
    fn file(document: &UploadedDocument) -> Self {
        Part::FileData {
            file_data: FileDataPayload {
                mime_type: document.mime_type.clone(),
                file_uri: document.uri.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileDataPayload {
    mime_type: String,
    file_uri: String,
}

#[derive(Deserialize)]
struct FileEnvelope {
    file: RemoteFile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

async fn check_status(response: Response) -> Result<Response, GeminiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "failed to read error body".to_string());
    Err(map_http_error(status, body))
}

fn map_http_error(status: StatusCode, body: String) -> GeminiError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    GeminiError::Http {
        status: status.as_u16(),
        message,
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text_response(response: GenerateContentResponse) -> Result<String, GeminiError> {
    let text: Option<String> = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .filter(|text: &String| !text.is_empty());

    text.ok_or_else(|| {
        match response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            Some(reason) => GeminiError::Protocol(format!("prompt blocked: {reason}")),
            None => GeminiError::Protocol("response contained no text".to_string()),
        }
    })
}
