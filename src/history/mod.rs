mod memory;
mod redis;
use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error as ThisError;
use crate::cli::Args;
use crate::models::chat::{ Chat, Message };

pub use self::memory::MemoryChatStore;
pub use self::redis::RedisChatStore;

#[derive(ThisError, Debug)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("corrupt chat document {id}: {source}")]
    Corrupt {
        id: String,
        source: serde_json::Error,
    },

    #[error("serialization: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Document store for chats. Every mutation touches a single chat and is atomic for it.
/// Mutations report `false` when no chat matched.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn insert_chat(&self, chat: &Chat) -> StoreResult<()>;

    async fn list_chats(&self) -> StoreResult<Vec<Chat>>;

    async fn find_chat(&self, id: &str) -> StoreResult<Option<Chat>>;

    /// Sets the name only if the current name equals `expected`.
    async fn rename_if(&self, id: &str, expected: &str, new_name: &str) -> StoreResult<bool>;

    async fn append_messages(&self, id: &str, messages: &[Message]) -> StoreResult<bool>;

    /// Overwrites the whole message list.
    async fn replace_messages(&self, id: &str, messages: &[Message]) -> StoreResult<bool>;

    async fn delete_chat(&self, id: &str) -> StoreResult<bool>;
}

pub fn create_chat_store(
    args: &Args
) -> Result<Arc<dyn ChatStore>, Box<dyn Error + Send + Sync>> {
    match args.store_type.to_lowercase().as_str() {
        "redis" => {
            let store = RedisChatStore::new(&args.store_host, &args.store_prefix)?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemoryChatStore::new())),
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported chat store type: {}", args.store_type)
                    )
                )
            ),
    }
}

pub fn initialize_chat_store(
    args: &Args
) -> Result<Arc<dyn ChatStore>, Box<dyn Error + Send + Sync>> {
    info!("Chats will be stored in: {} at {}", args.store_type, args.store_host);
    create_chat_store(args)
}

/// Renders the tail of a conversation as `{sender}: {text}` lines.
pub fn format_history_for_prompt(messages: &[Message], limit: usize) -> String {
    let start = messages.len().saturating_sub(limit);
    messages[start..]
        .iter()
        .map(|msg| format!("{}: {}", msg.sender, msg.text))
        .collect::<Vec<_>>()
        .join("\n")
}
