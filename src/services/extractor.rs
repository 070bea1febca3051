use log::{ error, info };
use serde_json::{ Map, Value };
use std::sync::Arc;

use crate::config::prompt::{ render, PromptConfig };
use crate::error::AppError;
use crate::llm::LlmError;
use crate::llm::chat::{ complete_json, ChatClient, CompletionRequest };
use crate::models::extractor::{ ExtractionRecord, IngredientsInfo, OtherInfo };

/// Reads packaging images and translates the resulting records.
#[derive(Clone)]
pub struct Extractor {
    client: Arc<dyn ChatClient>,
    prompts: Arc<PromptConfig>,
}

impl Extractor {
    pub fn new(client: Arc<dyn ChatClient>, prompts: Arc<PromptConfig>) -> Self {
        Self { client, prompts }
    }

    fn image_request(
        &self,
        instruction: &str,
        schema: Value,
        mime_type: &str,
        image: &[u8]
    ) -> CompletionRequest {
        CompletionRequest::new(self.prompts.extract_user.clone())
            .with_system(instruction)
            .with_image(mime_type, image.to_vec())
            .with_temperature(0.0)
            .with_json_output(Some(schema))
    }

    async fn extract_ingredients(&self, mime_type: &str, image: &[u8]) -> Result<IngredientsInfo, AppError> {
        let request = self.image_request(
            &self.prompts.extract_ingredients,
            IngredientsInfo::response_schema(),
            mime_type,
            image
        );
        let info: IngredientsInfo = complete_json(self.client.as_ref(), &request).await?;
        info.validate().map_err(LlmError::InvalidShape)?;
        Ok(info)
    }

    async fn extract_other_info(&self, mime_type: &str, image: &[u8]) -> Result<OtherInfo, AppError> {
        let request = self.image_request(
            &self.prompts.extract_other_info,
            OtherInfo::response_schema(),
            mime_type,
            image
        );
        Ok(complete_json(self.client.as_ref(), &request).await?)
    }

    /// Runs both extraction calls concurrently. Either failure fails the whole extraction.
    pub async fn extract(&self, mime_type: &str, image: &[u8]) -> Result<ExtractionRecord, AppError> {
        info!("Extracting product information from {} bytes of {}", image.len(), mime_type);

        let (ingredients, other) = tokio::try_join!(
            self.extract_ingredients(mime_type, image),
            self.extract_other_info(mime_type, image)
        ).map_err(|e| {
            error!("Extraction failed: {}", e);
            e
        })?;

        info!(
            "Extracted {} ingredients ({}) for '{}'",
            ingredients.ingredients.len(),
            ingredients.language,
            other.product_name
        );
        Ok(ExtractionRecord::merge(ingredients, other))
    }

    /// Translates every key and string value of `record`, keeping its structure.
    pub async fn translate(
        &self,
        record: &Map<String, Value>,
        language: &str
    ) -> Result<Map<String, Value>, AppError> {
        let language = language.trim();
        if language.is_empty() {
            return Err(AppError::validation("Target language is required"));
        }

        let encoded = serde_json::to_string(record).map_err(|e| AppError::validation(e.to_string()))?;
        let system = render(&self.prompts.translate_system, &[("language", language)]);
        let prompt = render(&self.prompts.translate_user, &[
            ("language", language),
            ("info", encoded.as_str()),
        ]);
        let request = CompletionRequest::new(prompt)
            .with_system(system)
            .with_temperature(0.0)
            .with_json_output(None);

        info!("Translating {} fields into {}", record.len(), language);
        let translated: Value = complete_json(self.client.as_ref(), &request).await?;
        match translated {
            Value::Object(map) => Ok(map),
            other =>
                Err(
                    LlmError::InvalidShape(
                        format!("translation returned {} instead of an object", json_kind(&other))
                    ).into()
                ),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
