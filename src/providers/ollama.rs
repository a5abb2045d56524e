use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};

use crate::config::OllamaConfig;
use crate::error::{ParleyError, Result};
use crate::interfaces::providers::TextGenerator;

/// Talks to Ollama through its OpenAI-compatible `/chat/completions` route.
#[derive(Clone)]
pub struct OllamaProvider {
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| ParleyError::Http(format!("Could not build http client: {e}")))?;
        Ok(Self {
            model: config.model.clone(),
            base_url: api_base(&config.base_url),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, prompt: &str) -> Result<CreateChatCompletionRequest> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Text(
                prompt.to_string(),
            ))
            .build()
            .map_err(|e| ParleyError::Runtime(e.to_string()))?;

        CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(vec![ChatCompletionRequestMessage::User(message)])
            .build()
            .map_err(|e| ParleyError::Runtime(e.to_string()))
    }

    async fn raw_chat_completion(&self, request: &CreateChatCompletionRequest) -> Result<Value> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| ParleyError::Http(format!("Chat completion transport failed: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ParleyError::Http(format!("Chat completion read failed: {e}")))?;

        if !status.is_success() {
            return Err(ParleyError::Http(format!(
                "Chat completion failed ({status}): {body}"
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ParleyError::Serialization(format!("Chat completion decode failed: {e}"))
        })
    }

    /// First generated text, if the response carries one.
    fn extract_text_from_value(response: &Value) -> Option<String> {
        response
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .map(|text| text.to_string())
    }
}

/// Ollama serves the OpenAI-compatible API under `/v1`; accept the bare
/// server address too.
fn api_base(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

#[async_trait]
impl TextGenerator for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt)?;
        debug!(model = %self.model, prompt_chars = prompt.len(), "Requesting completion");

        let raw = self.raw_chat_completion(&request).await?;
        match Self::extract_text_from_value(&raw) {
            Some(text) => Ok(text),
            None => {
                warn!(model = %self.model, "Completion carried no text; replying empty");
                Ok(String::new())
            }
        }
    }
}
