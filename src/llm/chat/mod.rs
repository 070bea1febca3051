pub mod gemini;
pub mod openai;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use log::{ error, info };
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use super::{ LlmConfig, LlmError, LlmType };
use self::gemini::GeminiChatClient;
use self::openai::OpenAIChatClient;

/// One piece of user content sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Image {
        mime_type: String,
        data: Vec<u8>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Ask the provider for JSON output, optionally constrained by a schema.
    Json {
        schema: Option<Value>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub system_instruction: Option<String>,
    pub parts: Vec<Part>,
    pub temperature: Option<f32>,
    pub response_format: ResponseFormat,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(prompt.into())],
            ..Default::default()
        }
    }

    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_image(mut self, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.parts.push(Part::Image { mime_type: mime_type.into(), data });
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_json_output(mut self, schema: Option<Value>) -> Self {
        self.response_format = ResponseFormat::Json { schema };
        self
    }

    /// All text parts joined, for providers and tests that only deal in plain prompts.
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest
    ) -> Result<CompletionResponse, LlmError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
    fn llm_type(&self) -> LlmType;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, LlmError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Gemini => {
            let specific_client = GeminiChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::OpenAI | LlmType::OpenRouter => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    info!(
        "Chat client configured: Type={}, Model={}, BaseURL={:?}",
        client.llm_type(),
        client.get_model(),
        client.get_base_url()
    );
    Ok(client)
}

/// Removes a surrounding markdown code fence (```json ... ```) if the model added one.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Runs a completion and decodes the reply text as JSON.
pub async fn complete_json<T: DeserializeOwned>(
    client: &dyn ChatClient,
    request: &CompletionRequest
) -> Result<T, LlmError> {
    let resp = client.complete(request).await?;
    serde_json::from_str(strip_code_fences(&resp.response)).map_err(|e| {
        error!("Model {} returned unparseable JSON: {}", client.get_model(), e);
        LlmError::InvalidJson(e)
    })
}

pub(crate) fn read_error_body(status: reqwest::StatusCode, body: String) -> LlmError {
    LlmError::Status {
        status: status.as_u16(),
        body: body.chars().take(500).collect(),
    }
}
