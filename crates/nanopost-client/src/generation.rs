//! Text generation client
//!
//! One operation: send the system persona and a rendered user prompt to a
//! chat-completions endpoint, return the first choice. No conversation
//! history, no retries; callers supply their own fallback.

use crate::types::{ChatMessage, ChatRequest, ChatResponse};
use async_trait::async_trait;
use nanopost_core::{NanopostError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Single-shot completion (allows mocking in tests)
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `user_prompt` under `system_prompt`
    ///
    /// Fails with [`NanopostError::EmptyResponse`] when the backend returns
    /// no choices or blank text, and [`NanopostError::Transport`] on network failure.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Chat-completions client
#[derive(Debug, Clone)]
pub struct GenerationClient {
    http: reqwest::Client,
    url: String,
    model: String,
    token: String,
}

impl GenerationClient {
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NanopostError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: url.into(),
            model: model.into(),
            token: token.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, system_prompt: &str, user_prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
        }
    }
}

/// Content of the first choice; blank text counts as no answer
fn first_choice(chat: ChatResponse) -> Result<String> {
    chat.choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(NanopostError::EmptyResponse)
}

#[async_trait]
impl TextGenerator for GenerationClient {
    #[instrument(skip_all, fields(model = %self.model, prompt_len = user_prompt.len()))]
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = self.build_request(system_prompt, user_prompt);

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| NanopostError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            return Err(NanopostError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| NanopostError::Decode(e.to_string()))?;

        let content = first_choice(chat)?;
        debug!("Completion returned {} chars", content.len());
        Ok(content)
    }
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        (**self).complete(system_prompt, user_prompt).await
    }
}
