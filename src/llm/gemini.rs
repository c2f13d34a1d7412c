//! Hosted chat backend over the Gemini streaming REST API

use super::config::ChatConfig;
use super::context::{ChatHistory, Turn};
use super::sse::{SseDecoder, DONE_MARKER};
use super::{ChatClient, ChatSession, ChunkStream};
use crate::{Result, TutorError};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct GeminiClient {
    config: Arc<ChatConfig>,
    http: Client,
}

impl GeminiClient {
    pub fn new(config: ChatConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TutorError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }
}

impl ChatClient for GeminiClient {
    fn create_session(&self, system_prompt: &str) -> Result<Arc<dyn ChatSession>> {
        if !self.config.has_api_key() {
            return Err(TutorError::Session(
                "API key not set. Set GEMINI_API_KEY or API_KEY in the environment.".to_string(),
            ));
        }
        self.config.validate().map_err(TutorError::Config)?;

        info!("Opened chat session with {}", self.config.model_id);

        Ok(Arc::new(GeminiSession {
            config: Arc::clone(&self.config),
            http: self.http.clone(),
            system_prompt: system_prompt.to_string(),
            history: Arc::new(Mutex::new(ChatHistory::default())),
        }))
    }
}

pub struct GeminiSession {
    config: Arc<ChatConfig>,
    http: Client,
    system_prompt: String,
    history: Arc<Mutex<ChatHistory>>,
}

impl GeminiSession {
    pub fn history(&self) -> Vec<Turn> {
        self.history.lock().turns().to_vec()
    }
}

impl ChatSession for GeminiSession {
    fn send_streaming(&self, text: &str) -> ChunkStream {
        Box::pin(stream_reply(
            self.http.clone(),
            Arc::clone(&self.config),
            self.system_prompt.clone(),
            Arc::clone(&self.history),
            text.to_string(),
        ))
    }
}

fn stream_reply(
    http: Client,
    config: Arc<ChatConfig>,
    system_prompt: String,
    history: Arc<Mutex<ChatHistory>>,
    text: String,
) -> impl Stream<Item = Result<String>> + Send {
    async_stream::try_stream! {
        let request = {
            let mut history = history.lock();
            history.push_user(text);
            GenerateRequest::new(&system_prompt, history.turns(), &config)
        };
        let turn = PendingTurn::new(Arc::clone(&history));

        debug!("Streaming request with {} turns", request.contents.len());

        let response = http
            .post(config.stream_url())
            .header("x-goog-api-key", config.api_key.as_deref().unwrap_or_default())
            .json(&request)
            .send()
            .await?;

        let response = check_status(response).await?;
        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut reply = String::new();

        while let Some(bytes) = body.next().await {
            let bytes = bytes?;
            for payload in decoder.feed(&bytes) {
                if let Some(chunk) = parse_payload(&payload)? {
                    reply.push_str(&chunk);
                    yield chunk;
                }
            }
        }
        if let Some(payload) = decoder.finish() {
            if let Some(chunk) = parse_payload(&payload)? {
                reply.push_str(&chunk);
                yield chunk;
            }
        }

        debug!("Reply complete ({} chars)", reply.len());
        turn.commit(reply);
    }
}

/// Turn a non-2xx response into an error carrying status and body
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TutorError::Send(format!("HTTP {}: {}", status, body.trim())))
}

/// Rolls the user turn back unless the reply completes
struct PendingTurn {
    history: Arc<Mutex<ChatHistory>>,
    committed: bool,
}

impl PendingTurn {
    fn new(history: Arc<Mutex<ChatHistory>>) -> Self {
        Self {
            history,
            committed: false,
        }
    }

    fn commit(mut self, reply: String) {
        // an empty model turn would be rejected on the next request
        if reply.is_empty() {
            return;
        }
        self.history.lock().push_model(reply);
        self.committed = true;
    }
}

impl Drop for PendingTurn {
    fn drop(&mut self) {
        if !self.committed {
            self.history.lock().rollback_user();
        }
    }
}

/// Extract the reply text carried by one event payload
pub fn parse_payload(payload: &str) -> Result<Option<String>> {
    let payload = payload.trim();
    if payload.is_empty() || payload == DONE_MARKER {
        return Ok(None);
    }

    let chunk: StreamChunk = serde_json::from_str(payload)
        .map_err(|e| TutorError::Send(format!("Malformed stream payload: {}", e)))?;

    if let Some(error) = chunk.error {
        return Err(TutorError::Send(error.message));
    }
    if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(TutorError::Send(format!("Prompt blocked: {}", reason)));
    }

    let Some(candidate) = chunk.candidates.into_iter().next() else {
        return Ok(None);
    };
    if let Some(reason) = candidate.finish_reason.as_deref() {
        if reason != "STOP" && reason != "MAX_TOKENS" {
            warn!("Reply finished early: {}", reason);
        }
    }

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    Ok((!text.is_empty()).then_some(text))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    system_instruction: RequestContent,
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

impl GenerateRequest {
    pub fn new(system_prompt: &str, turns: &[Turn], config: &ChatConfig) -> Self {
        Self {
            system_instruction: RequestContent {
                role: None,
                parts: vec![TextPart {
                    text: system_prompt.to_string(),
                }],
            },
            contents: turns
                .iter()
                .map(|turn| RequestContent {
                    role: Some(turn.role.as_str()),
                    parts: vec![TextPart {
                        text: turn.text.clone(),
                    }],
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: config.temperature,
                thinking_config: ThinkingConfig {
                    thinking_budget: config.thinking_budget,
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
