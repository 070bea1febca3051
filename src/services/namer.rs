use log::info;
use std::sync::Arc;

use crate::config::prompt::{ render, PromptConfig };
use crate::error::AppError;
use crate::llm::chat::{ ChatClient, CompletionRequest };
use crate::models::chat::ProductInformation;

/// Derives a short title for a chat from its first exchange.
#[derive(Clone)]
pub struct ChatNamer {
    client: Arc<dyn ChatClient>,
    prompts: Arc<PromptConfig>,
}

impl ChatNamer {
    pub fn new(client: Arc<dyn ChatClient>, prompts: Arc<PromptConfig>) -> Self {
        Self { client, prompts }
    }

    pub async fn name(
        &self,
        first_user_message: &str,
        first_bot_message: &str,
        product_information: Option<&ProductInformation>
    ) -> Result<String, AppError> {
        let context = product_information
            .map(ProductInformation::to_prompt_json)
            .unwrap_or_default();
        let prompt = render(&self.prompts.chat_name, &[
            ("user_message", first_user_message),
            ("bot_message", first_bot_message),
            ("product_information", context.as_str()),
        ]);

        let resp = self.client.complete(&CompletionRequest::new(prompt).with_temperature(0.0)).await?;
        let title = resp.response.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Upstream("model returned an empty chat name".to_string()));
        }

        info!("Generated chat name: {}", title);
        Ok(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::chat::mock::MockChatClient;

    #[tokio::test]
    async fn trims_the_title() {
        let client = Arc::new(MockChatClient::new());
        client.push_ok("  Acme Shampoo Questions \n");
        let namer = ChatNamer::new(client.clone(), Arc::new(PromptConfig::default()));

        let title = namer.name("What is in this?", "Water and glycerin.", None).await.unwrap();
        assert_eq!(title, "Acme Shampoo Questions");

        let sent = client.requests()[0].prompt_text();
        assert!(sent.contains("User: What is in this?"));
        assert!(sent.contains("Bot: Water and glycerin."));
    }

    #[tokio::test]
    async fn blank_title_is_an_upstream_error() {
        let client = Arc::new(MockChatClient::new());
        client.push_ok("   ");
        let namer = ChatNamer::new(client, Arc::new(PromptConfig::default()));

        let err = namer.name("a", "b", None).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
