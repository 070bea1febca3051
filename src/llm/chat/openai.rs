use async_trait::async_trait;
use base64::{ engine::general_purpose::STANDARD as BASE64, Engine as _ };
use log::info;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };

use super::{ read_error_body, ChatClient, CompletionRequest, CompletionResponse, Part, ResponseFormat };
use crate::llm::{ LlmConfig, LlmError, LlmType };

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Client for OpenAI's chat completions API and compatible gateways such as OpenRouter.
pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
    llm_type: LlmType,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: OpenAIContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OpenAIContent {
    Text(String),
    Parts(Vec<OpenAIPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAIPart {
    Text {
        text: String,
    },
    ImageUrl {
        image_url: ImageUrl,
    },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAIResponseFormat>,
}

#[derive(Serialize)]
struct OpenAIResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIReply,
}

#[derive(Deserialize)]
struct OpenAIReply {
    content: Option<String>,
}

fn build_request(model: &str, request: &CompletionRequest) -> OpenAIChatRequest {
    let mut messages = Vec::new();
    if let Some(system) = &request.system_instruction {
        messages.push(OpenAIMessage {
            role: "system",
            content: OpenAIContent::Text(system.clone()),
        });
    }

    let has_images = request.parts.iter().any(|p| matches!(p, Part::Image { .. }));
    let content = if has_images {
        OpenAIContent::Parts(
            request.parts
                .iter()
                .map(|part| match part {
                    Part::Text(text) => OpenAIPart::Text { text: text.clone() },
                    Part::Image { mime_type, data } =>
                        OpenAIPart::ImageUrl {
                            image_url: ImageUrl {
                                url: format!("data:{};base64,{}", mime_type, BASE64.encode(data)),
                            },
                        },
                })
                .collect()
        )
    } else {
        OpenAIContent::Text(request.prompt_text())
    };
    messages.push(OpenAIMessage { role: "user", content });

    let response_format = match &request.response_format {
        ResponseFormat::Json { .. } => Some(OpenAIResponseFormat { format_type: "json_object" }),
        ResponseFormat::Text => None,
    };

    OpenAIChatRequest {
        model: model.to_string(),
        messages,
        temperature: request.temperature,
        response_format,
    }
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        llm_type: LlmType
    ) -> Result<Self, LlmError> {
        let chat_model = model.unwrap_or_else(|| "gpt-4o-mini".to_string());
        let default_base = match llm_type {
            LlmType::OpenRouter => OPENROUTER_BASE_URL,
            _ => OPENAI_BASE_URL,
        };
        let api_url = base_url.unwrap_or_else(|| default_base.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| LlmError::Config(format!("Invalid API key format: {}", e)))?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url.trim_end_matches('/').to_string(),
            llm_type,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| LlmError::Config(format!("API key is required for {} chat client", config.llm_type)))?;

        Self::new(
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
            config.llm_type.clone()
        )
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(
        &self,
        request: &CompletionRequest
    ) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        info!("OpenAIChatClient::complete() → type={} model={}", self.llm_type, self.model);

        let resp = self.http
            .post(&url)
            .json(&build_request(&self.model, request))
            .send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(read_error_body(status, body));
        }

        let parsed: OpenAIResponse = resp.json().await?;
        let text = parsed.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        Ok(CompletionResponse { response: text })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }

    fn llm_type(&self) -> LlmType {
        self.llm_type.clone()
    }
}
