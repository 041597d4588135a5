// Inference service boundary
// Conversation transcript, tool declarations and the chat-completions client

use crate::config::{InferenceConfig, RetryConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {status_code} - {message}")]
    Api {
        status_code: u16,
        message: String,
        is_retryable: bool,
    },

    #[error("Could not decode inference response: {0}")]
    Decode(String),

    #[error("Inference service returned no choices")]
    EmptyResponse,
}

impl InferenceError {
    pub fn is_retryable(&self) -> bool {
        match self {
            InferenceError::Network(_) => true,
            InferenceError::Api { is_retryable, .. } => *is_retryable,
            InferenceError::Decode(_) | InferenceError::EmptyResponse => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

// A tool invocation the model asked for; arguments stay raw JSON text until dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    System(String),
    User(String),
    Assistant {
        content: Option<String>,
        tool_call: Option<ToolCallRequest>,
    },
    ToolResult {
        call_id: String,
        tool_name: String,
        content: String,
    },
}

impl Turn {
    pub fn role(&self) -> Role {
        match self {
            Turn::System(_) => Role::System,
            Turn::User(_) => Role::User,
            Turn::Assistant { .. } => Role::Assistant,
            Turn::ToolResult { .. } => Role::Tool,
        }
    }
}

// Conversation state for one planning run.
// Starts with one system and one user turn; a tool call is only appended together with its result.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn seeded(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::System(system.into()), Turn::User(user.into())],
        }
    }

    pub fn record_tool_exchange(
        &mut self,
        content: Option<String>,
        call: ToolCallRequest,
        result: String,
    ) {
        let call_id = call.id.clone();
        let tool_name = call.name.clone();
        self.turns.push(Turn::Assistant {
            content,
            tool_call: Some(call),
        });
        self.turns.push(Turn::ToolResult {
            call_id,
            tool_name,
            content: result,
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn tool_results(&self) -> usize {
        self.turns
            .iter()
            .filter(|turn| matches!(turn, Turn::ToolResult { .. }))
            .count()
    }
}

// Function exposed to the model, with a JSON-schema parameter description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

pub struct InferenceRequest<'a> {
    pub model: &'a str,
    pub temperature: f32,
    pub transcript: &'a Transcript,
    pub tools: &'a [ToolDeclaration],
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssistantReply {
    Content(String),
    ToolCall {
        content: Option<String>,
        call: ToolCallRequest,
    },
}

#[async_trait]
pub trait InferenceService: Send + Sync + 'static {
    async fn submit(&self, request: InferenceRequest<'_>) -> Result<AssistantReply, InferenceError>;
}

// Chat-completions wire format (response side)
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChatToolCall>,
}

#[derive(Debug, Deserialize)]
struct ChatToolCall {
    id: String,
    function: ChatFunctionCall,
}

#[derive(Debug, Deserialize)]
struct ChatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

// OpenAI-compatible chat-completions client
pub struct OpenAiChatService {
    http: reqwest::Client,
    config: InferenceConfig,
}

impl OpenAiChatService {
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| InferenceError::Network(e.to_string()))?;
        Ok(Self { http, config })
    }

    async fn send_once(&self, body: &Value) -> Result<AssistantReply, InferenceError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &text));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Decode(e.to_string()))?;
        parse_reply(completion)
    }
}

#[async_trait]
impl InferenceService for OpenAiChatService {
    async fn submit(&self, request: InferenceRequest<'_>) -> Result<AssistantReply, InferenceError> {
        let body = request_body(&request);
        let body = &body;
        let started = Instant::now();

        let reply = with_retries(&self.config.retry_config, || self.send_once(body)).await?;
        debug!(
            model = request.model,
            turns = request.transcript.turn_count(),
            tool_results = request.transcript.tool_results(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "inference call completed"
        );
        Ok(reply)
    }
}

// Re-sends while the error is retryable and attempts remain; 4xx and decode errors return at once
async fn with_retries<F, Fut>(retry: &RetryConfig, mut send: F) -> Result<AssistantReply, InferenceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<AssistantReply, InferenceError>>,
{
    let mut attempt = 0;
    loop {
        match send().await {
            Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                let backoff = retry.backoff(attempt);
                warn!(error = %e, attempt, backoff_ms = backoff.as_millis() as u64, "retrying inference call");
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            outcome => return outcome,
        }
    }
}

fn message_json(turn: &Turn) -> Value {
    let role = turn.role();
    match turn {
        Turn::System(content) | Turn::User(content) => json!({ "role": role, "content": content }),
        Turn::Assistant {
            content,
            tool_call: Some(call),
        } => json!({
            "role": role,
            "content": content,
            "tool_calls": [{
                "id": call.id,
                "type": "function",
                "function": { "name": call.name, "arguments": call.arguments }
            }]
        }),
        Turn::Assistant {
            content,
            tool_call: None,
        } => json!({ "role": role, "content": content }),
        Turn::ToolResult {
            call_id, content, ..
        } => json!({ "role": role, "tool_call_id": call_id, "content": content }),
    }
}

fn request_body(request: &InferenceRequest<'_>) -> Value {
    let messages: Vec<Value> = request.transcript.turns().iter().map(message_json).collect();
    let tools: Vec<Value> = request
        .tools
        .iter()
        .map(|tool| json!({ "type": "function", "function": tool }))
        .collect();

    json!({
        "model": request.model,
        "temperature": request.temperature,
        "messages": messages,
        "tools": tools,
        "tool_choice": "auto"
    })
}

fn parse_reply(completion: ChatCompletionResponse) -> Result<AssistantReply, InferenceError> {
    let message = completion
        .choices
        .into_iter()
        .next()
        .ok_or(InferenceError::EmptyResponse)?
        .message;

    if message.tool_calls.len() > 1 {
        // One call per turn; the rest are dropped so every kept call gets a result
        warn!(
            requested = message.tool_calls.len(),
            "model requested several tool calls, dispatching the first"
        );
    }

    match message.tool_calls.into_iter().next() {
        Some(call) => Ok(AssistantReply::ToolCall {
            content: message.content.filter(|c| !c.is_empty()),
            call: ToolCallRequest {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            },
        }),
        None => Ok(AssistantReply::Content(message.content.unwrap_or_default())),
    }
}

fn api_error(status_code: u16, body: &str) -> InferenceError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    InferenceError::Api {
        status_code,
        message,
        is_retryable: status_code == 429 || status_code >= 500,
    }
}
