use async_trait::async_trait;
use base64::{ engine::general_purpose::STANDARD as BASE64, Engine as _ };
use log::info;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use serde_json::Value;

use super::{ read_error_body, ChatClient, CompletionRequest, CompletionResponse, Part, ResponseFormat };
use crate::llm::{ LlmConfig, LlmError, LlmType };

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum GeminiPart {
    Text(String),
    InlineData {
        #[serde(rename = "mimeType")]
        mime_type: String,
        data: String,
    },
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    content: Option<GoogleContent>,
}

#[derive(Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize)]
struct GooglePart {
    #[serde(default)]
    text: Option<String>,
}

fn build_request(request: &CompletionRequest) -> GeminiRequest {
    let parts = request.parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => GeminiPart::Text(text.clone()),
            Part::Image { mime_type, data } =>
                GeminiPart::InlineData {
                    mime_type: mime_type.clone(),
                    data: BASE64.encode(data),
                },
        })
        .collect();

    let mut generation_config = GenerationConfig {
        temperature: request.temperature,
        ..Default::default()
    };
    if let ResponseFormat::Json { schema } = &request.response_format {
        generation_config.response_mime_type = Some("application/json");
        generation_config.response_schema = schema.clone();
    }

    GeminiRequest {
        system_instruction: request.system_instruction.as_ref().map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart::Text(text.clone())],
        }),
        contents: vec![GeminiContent {
            role: Some("user"),
            parts,
        }],
        generation_config,
    }
}

fn response_text(resp: GoogleResponse) -> Option<String> {
    let content = resp.candidates.into_iter().next()?.content?;
    let text: String = content.parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

pub struct GeminiChatClient {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, LlmError> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let http = HttpClient::builder().build()?;

        Ok(Self {
            http,
            api_key,
            model: chat_model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| LlmError::Config("Google API key is required for GeminiChatClient".to_string()))?;

        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn complete(
        &self,
        request: &CompletionRequest
    ) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        info!(
            "GeminiChatClient::complete() → model={} parts={} json={}",
            self.model,
            request.parts.len(),
            matches!(request.response_format, ResponseFormat::Json { .. })
        );

        let resp = self.http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&build_request(request))
            .send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(read_error_body(status, body));
        }

        let parsed: GoogleResponse = resp.json().await?;
        let text = response_text(parsed).ok_or(LlmError::EmptyResponse)?;
        Ok(CompletionResponse { response: text })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }

    fn llm_type(&self) -> LlmType {
        LlmType::Gemini
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_carries_system_image_and_schema() {
        let req = CompletionRequest::new("Extract the information from the image.")
            .with_system("You read packaging.")
            .with_image("image/jpeg", vec![0xff, 0xd8])
            .with_temperature(0.0)
            .with_json_output(Some(json!({ "type": "OBJECT" })));

        let body = serde_json::to_value(build_request(&req)).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You read packaging.");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Extract the information from the image.");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["data"], "/9g=");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn plain_text_request_omits_json_config() {
        let body = serde_json::to_value(build_request(&CompletionRequest::new("hi"))).unwrap();
        assert!(body.get("systemInstruction").is_none());
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn joins_candidate_parts() {
        let resp: GoogleResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello " }, { "text": "there" }] } }]
        })).unwrap();
        assert_eq!(response_text(resp).as_deref(), Some("Hello there"));

        let empty: GoogleResponse = serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert!(response_text(empty).is_none());
    }

    #[test]
    fn from_config_requires_key() {
        let config = LlmConfig::default();
        assert!(GeminiChatClient::from_config(&config).is_err());
    }
}
