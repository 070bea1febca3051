use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::history::{ ChatStore, StoreResult };
use crate::models::chat::{ Chat, Message };

/// Process-local store, kept in insertion order. Used for tests and `STORE_TYPE=memory`.
#[derive(Default)]
pub struct MemoryChatStore {
    chats: RwLock<Vec<Chat>>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn insert_chat(&self, chat: &Chat) -> StoreResult<()> {
        self.chats.write().await.push(chat.clone());
        Ok(())
    }

    async fn list_chats(&self) -> StoreResult<Vec<Chat>> {
        Ok(self.chats.read().await.clone())
    }

    async fn find_chat(&self, id: &str) -> StoreResult<Option<Chat>> {
        Ok(self.chats.read().await.iter().find(|c| c.id == id).cloned())
    }

    async fn rename_if(&self, id: &str, expected: &str, new_name: &str) -> StoreResult<bool> {
        let mut chats = self.chats.write().await;
        match chats.iter_mut().find(|c| c.id == id && c.name == expected) {
            Some(chat) => {
                chat.name = new_name.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn append_messages(&self, id: &str, messages: &[Message]) -> StoreResult<bool> {
        let mut chats = self.chats.write().await;
        match chats.iter_mut().find(|c| c.id == id) {
            Some(chat) => {
                chat.messages.extend_from_slice(messages);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn replace_messages(&self, id: &str, messages: &[Message]) -> StoreResult<bool> {
        let mut chats = self.chats.write().await;
        match chats.iter_mut().find(|c| c.id == id) {
            Some(chat) => {
                chat.messages = messages.to_vec();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_chat(&self, id: &str) -> StoreResult<bool> {
        let mut chats = self.chats.write().await;
        let before = chats.len();
        chats.retain(|c| c.id != id);
        Ok(chats.len() != before)
    }
}
