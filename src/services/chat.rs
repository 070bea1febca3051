use chrono::Utc;
use log::{ debug, info };
use serde_json::{ Map, Value };
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::history::ChatStore;
use crate::models::chat::{ Chat, ProductInformation, DEFAULT_CHAT_STATUS, PLACEHOLDER_CHAT_NAME };
use crate::services::namer::ChatNamer;

/// CRUD over chat documents.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    namer: ChatNamer,
    user_id: String,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, namer: ChatNamer, user_id: impl Into<String>) -> Self {
        Self { store, namer, user_id: user_id.into() }
    }

    /// Every chat starts under the placeholder name; a requested name is only honoured
    /// through [`ChatService::rename_once`].
    pub async fn create(
        &self,
        product_information: Map<String, Value>,
        requested_name: Option<String>
    ) -> Result<Chat, AppError> {
        let product_information = ProductInformation::new(product_information).ok_or_else(||
            AppError::validation("Product information is required")
        )?;
        if let Some(name) = requested_name.filter(|n| !n.trim().is_empty()) {
            debug!("Ignoring requested name '{}' at creation", name);
        }

        let chat = Chat {
            id: Uuid::new_v4().simple().to_string(),
            user_id: self.user_id.clone(),
            name: PLACEHOLDER_CHAT_NAME.to_string(),
            product_information,
            messages: Vec::new(),
            status: DEFAULT_CHAT_STATUS.to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_chat(&chat).await?;

        info!("Created chat {}", chat.id);
        Ok(chat)
    }

    pub async fn list(&self) -> Result<Vec<Chat>, AppError> {
        Ok(self.store.list_chats().await?)
    }

    pub async fn get(&self, id: &str) -> Result<Chat, AppError> {
        self.store.find_chat(id).await?.ok_or_else(AppError::chat_not_found)
    }

    pub async fn rename_once(&self, id: &str, new_name: &str) -> Result<(), AppError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(AppError::validation("New chat name is required"));
        }
        if new_name == PLACEHOLDER_CHAT_NAME {
            return Err(AppError::validation(format!("'{}' is reserved for unnamed chats", PLACEHOLDER_CHAT_NAME)));
        }

        let chat = self.get(id).await?;
        if chat.is_renamed() {
            return Err(AppError::Conflict("Chat name cannot be changed".to_string()));
        }

        if !self.store.rename_if(id, PLACEHOLDER_CHAT_NAME, new_name).await? {
            return Err(AppError::chat_not_found());
        }

        info!("Renamed chat {} to '{}'", id, new_name);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        if !self.store.delete_chat(id).await? {
            return Err(AppError::chat_not_found());
        }
        info!("Deleted chat {}", id);
        Ok(())
    }

    /// Names the chat after its first exchange, subject to the same rename-once rule.
    pub async fn generate_name(&self, id: &str) -> Result<String, AppError> {
        let chat = self.get(id).await?;
        if chat.is_renamed() {
            return Err(AppError::Conflict("Chat name cannot be changed".to_string()));
        }

        let (user, bot) = chat
            .first_exchange()
            .ok_or_else(|| AppError::validation("Need at least one user message and one bot response"))?;
        let title = self.namer.name(user, bot, Some(&chat.product_information)).await?;
        if title == PLACEHOLDER_CHAT_NAME {
            return Err(AppError::Upstream("model suggested the placeholder chat name".to_string()));
        }

        self.rename_once(id, &title).await?;
        Ok(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::prompt::PromptConfig;
    use crate::history::MemoryChatStore;
    use crate::llm::chat::mock::MockChatClient;
    use crate::models::chat::{ Message, Sender };
    use serde_json::json;

    fn product(brand: &str) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("brand".to_string(), json!(brand));
        fields
    }

    fn service_with(client: Arc<MockChatClient>) -> (ChatService, Arc<MemoryChatStore>) {
        let store = Arc::new(MemoryChatStore::new());
        let namer = ChatNamer::new(client, Arc::new(PromptConfig::default()));
        (ChatService::new(store.clone(), namer, "user123"), store)
    }

    fn service() -> ChatService {
        service_with(Arc::new(MockChatClient::new())).0
    }

    #[tokio::test]
    async fn create_requires_product_information() {
        let chats = service();
        let err = chats.create(Map::new(), None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(chats.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn created_chat_is_retrievable() {
        let chats = service();
        let created = chats.create(product("Acme"), Some("ignored".into())).await.unwrap();

        assert_eq!(created.name, PLACEHOLDER_CHAT_NAME);
        assert_eq!(created.user_id, "user123");
        assert_eq!(created.status, "active");

        let fetched = chats.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn list_keeps_creation_order() {
        let chats = service();
        let a = chats.create(product("A"), None).await.unwrap();
        let b = chats.create(product("B"), None).await.unwrap();

        let ids: Vec<String> = chats.list().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn rename_succeeds_only_once() {
        let chats = service();
        let chat = chats.create(product("Acme"), None).await.unwrap();

        chats.rename_once(&chat.id, "Acme support").await.unwrap();
        let err = chats.rename_once(&chat.id, "Other").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        assert_eq!(chats.get(&chat.id).await.unwrap().name, "Acme support");
    }

    #[tokio::test]
    async fn rename_validates_input_and_existence() {
        let chats = service();
        let chat = chats.create(product("Acme"), None).await.unwrap();

        assert!(matches!(chats.rename_once(&chat.id, "  ").await, Err(AppError::Validation(_))));
        assert!(matches!(chats.rename_once("missing", "Name").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn placeholder_name_cannot_be_used_to_rename_twice() {
        let chats = service();
        let chat = chats.create(product("Acme"), None).await.unwrap();

        let err = chats.rename_once(&chat.id, PLACEHOLDER_CHAT_NAME).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = chats.rename_once(&chat.id, "  New Chat ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        chats.rename_once(&chat.id, "Acme support").await.unwrap();
        assert!(matches!(chats.rename_once(&chat.id, "Other").await, Err(AppError::Conflict(_))));
        assert_eq!(chats.get(&chat.id).await.unwrap().name, "Acme support");
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let chats = service();
        let chat = chats.create(product("Acme"), None).await.unwrap();

        chats.delete(&chat.id).await.unwrap();
        assert!(matches!(chats.get(&chat.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(chats.delete(&chat.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn generated_name_is_applied_once() {
        let client = Arc::new(MockChatClient::new());
        client.push_ok("Acme Ingredients");
        let (chats, store) = service_with(client.clone());
        let chat = chats.create(product("Acme"), None).await.unwrap();
        store
            .append_messages(&chat.id, &[
                Message::new(Sender::User, "What is in this?", "e1"),
                Message::new(Sender::Bot, "Water.", "e1"),
            ]).await
            .unwrap();

        let title = chats.generate_name(&chat.id).await.unwrap();
        assert_eq!(title, "Acme Ingredients");
        assert_eq!(chats.get(&chat.id).await.unwrap().name, "Acme Ingredients");
        assert!(client.requests()[0].prompt_text().contains("Acme"));

        assert!(matches!(chats.generate_name(&chat.id).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn generated_placeholder_name_leaves_chat_unnamed() {
        let client = Arc::new(MockChatClient::new());
        client.push_ok("New Chat");
        client.push_ok("Acme Ingredients");
        let (chats, store) = service_with(client.clone());
        let chat = chats.create(product("Acme"), None).await.unwrap();
        store
            .append_messages(&chat.id, &[
                Message::new(Sender::User, "What is in this?", "e1"),
                Message::new(Sender::Bot, "Water.", "e1"),
            ]).await
            .unwrap();

        assert!(matches!(chats.generate_name(&chat.id).await, Err(AppError::Upstream(_))));
        assert_eq!(chats.get(&chat.id).await.unwrap().name, PLACEHOLDER_CHAT_NAME);

        assert_eq!(chats.generate_name(&chat.id).await.unwrap(), "Acme Ingredients");
    }

    #[tokio::test]
    async fn naming_needs_a_full_exchange() {
        let chats = service();
        let chat = chats.create(product("Acme"), None).await.unwrap();
        assert!(matches!(chats.generate_name(&chat.id).await, Err(AppError::Validation(_))));
    }
}
