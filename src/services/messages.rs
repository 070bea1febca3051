use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::prompt::{ render, PromptConfig };
use crate::error::AppError;
use crate::history::{ format_history_for_prompt, ChatStore };
use crate::llm::chat::{ ChatClient, CompletionRequest };
use crate::models::chat::{ without_last_exchange, Chat, Message, Sender };

const HISTORY_FOR_PROMPT_LEN: usize = 5;
const CHAT_TEMPERATURE: f32 = 0.7;

/// Appends user messages and generated replies to a chat's history.
#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn ChatStore>,
    client: Arc<dyn ChatClient>,
    prompts: Arc<PromptConfig>,
}

impl MessageService {
    pub fn new(
        store: Arc<dyn ChatStore>,
        client: Arc<dyn ChatClient>,
        prompts: Arc<PromptConfig>
    ) -> Self {
        Self { store, client, prompts }
    }

    pub async fn send(&self, chat_id: &str, content: &str) -> Result<String, AppError> {
        let chat = self.load(chat_id, content).await?;

        let (user_message, bot_message) = self.exchange(&chat, &chat.messages, content).await?;
        let reply = bot_message.text.clone();

        if !self.store.append_messages(chat_id, &[user_message, bot_message]).await? {
            return Err(AppError::chat_not_found());
        }

        info!("Chat {}: stored exchange ({} messages before)", chat_id, chat.messages.len());
        Ok(reply)
    }

    /// Regenerates the most recent exchange and overwrites the stored history.
    pub async fn resend(&self, chat_id: &str, content: &str) -> Result<String, AppError> {
        let chat = self.load(chat_id, content).await?;
        if chat.messages.is_empty() {
            return Err(AppError::validation("Chat has no exchange to regenerate"));
        }

        let mut history = without_last_exchange(&chat.messages);
        let (user_message, bot_message) = self.exchange(&chat, &history, content).await?;
        let reply = bot_message.text.clone();
        history.push(user_message);
        history.push(bot_message);

        if !self.store.replace_messages(chat_id, &history).await? {
            return Err(AppError::chat_not_found());
        }

        info!("Chat {}: regenerated last exchange", chat_id);
        Ok(reply)
    }

    async fn load(&self, chat_id: &str, content: &str) -> Result<Chat, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::validation("Message content is required"));
        }
        self.store.find_chat(chat_id).await?.ok_or_else(AppError::chat_not_found)
    }

    /// Asks the model for a reply. Returns the user message and the reply as one exchange.
    async fn exchange(
        &self,
        chat: &Chat,
        history: &[Message],
        content: &str
    ) -> Result<(Message, Message), AppError> {
        let exchange_id = Uuid::new_v4().to_string();
        let user_message = Message::new(Sender::User, content, &exchange_id);

        let context = chat.product_information.to_prompt_json();
        let history_text = format_history_for_prompt(history, HISTORY_FOR_PROMPT_LEN);
        let system = render(&self.prompts.chat_system, &[("product_information", context.as_str())]);
        let prompt = render(&self.prompts.chat_user, &[
            ("history", history_text.as_str()),
            ("message", content),
        ]);
        let request = CompletionRequest::new(prompt)
            .with_system(system)
            .with_temperature(CHAT_TEMPERATURE);

        let resp = self.client.complete(&request).await?;
        let bot_message = Message::new(Sender::Bot, resp.response.trim(), &exchange_id);

        Ok((user_message, bot_message))
    }
}
