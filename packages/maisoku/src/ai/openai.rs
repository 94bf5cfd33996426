//! OpenAI implementation of the service traits.
//!
//! A reference implementation using the chat completions API, with image
//! input for page classification.
//!
//! # Example
//!
//! ```rust,ignore
//! use maisoku::ai::shared_client;
//! use maisoku::security::AICredentials;
//!
//! let creds = AICredentials::from_env_var("OPENAI_API_KEY", "gpt-4o")?;
//! let client = shared_client(&creds)?;
//! let processor = BatchProcessor::new(client.clone(), client.clone(), store);
//! ```

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::{MaisokuError, Result};
use crate::pipeline::prompts::{format_classify_prompt, format_extract_prompt};
use crate::security::{AICredentials, SecretString};
use crate::traits::ai::{ListingExtractor, VisionClassifier};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

static SHARED_CLIENT: OnceCell<Arc<OpenAI>> = OnceCell::new();

/// OpenAI-based service implementation.
#[derive(Clone)]
pub struct OpenAI {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl std::fmt::Debug for OpenAI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAI")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAI {
    /// Create a client from validated credentials.
    pub fn from_credentials(credentials: &AICredentials) -> Self {
        Self {
            client: Client::new(),
            api_key: credentials.api_key.clone(),
            model: credentials.model.clone(),
            base_url: credentials
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_tokens: 2000,
        }
    }

    /// Set the chat model (default: gpt-4o).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the completion token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Get the current model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, content: serde_json::Value, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![serde_json::json!({
                "role": "user",
                "content": content,
            })],
            temperature: 0.1,
            max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| MaisokuError::Service(e.into()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MaisokuError::service(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| MaisokuError::Service(e.into()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| MaisokuError::service("No response from OpenAI"))
    }
}

/// The process-wide client, built on first use.
///
/// Later calls return the same client regardless of the credentials passed.
pub fn shared_client(credentials: &AICredentials) -> Result<Arc<OpenAI>> {
    SHARED_CLIENT
        .get_or_try_init(|| {
            if credentials.api_key.is_empty() {
                return Err(MaisokuError::Security(
                    crate::error::SecurityError::EmptyCredential,
                ));
            }
            info!(model = %credentials.model, "Initializing OpenAI client");
            Ok(Arc::new(OpenAI::from_credentials(credentials)))
        })
        .cloned()
}

#[async_trait]
impl ListingExtractor for OpenAI {
    async fn extract(&self, text: &str, page_index: usize) -> Result<String> {
        let prompt = format_extract_prompt(text, page_index);
        self.complete(serde_json::Value::String(prompt), self.max_tokens)
            .await
    }
}

#[async_trait]
impl VisionClassifier for OpenAI {
    async fn classify(&self, image_base64: &str) -> Result<String> {
        let content = serde_json::json!([
            { "type": "text", "text": format_classify_prompt() },
            {
                "type": "image_url",
                "image_url": { "url": format!("data:image/png;base64,{}", image_base64) }
            }
        ]);
        self.complete(content, 200).await
    }
}

// =============================================================================
// Request/Response types
// =============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<serde_json::Value>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
