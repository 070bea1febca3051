use async_trait::async_trait;
use chrono::{ DateTime, Utc };
use log::{ debug, warn };
use redis::{ AsyncCommands, Client, Script };
use serde::{ Deserialize, Serialize };

use crate::history::{ ChatStore, StoreError, StoreResult };
use crate::models::chat::{ Chat, Message, ProductInformation };

// KEYS[1] chat hash; ARGV[1] expected name, ARGV[2] new name.
const RENAME_IF_SCRIPT: &str = r"
if redis.call('HGET', KEYS[1], 'name') == ARGV[1] then
  redis.call('HSET', KEYS[1], 'name', ARGV[2])
  return 1
end
return 0
";

// KEYS[1] chat hash, KEYS[2] message list; ARGV encoded messages. Pushed in chunks to stay
// under Lua's unpack limit.
const APPEND_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return 0
end
for i = 1, #ARGV, 1000 do
  redis.call('RPUSH', KEYS[2], unpack(ARGV, i, math.min(i + 999, #ARGV)))
end
return 1
";

const REPLACE_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return 0
end
redis.call('DEL', KEYS[2])
for i = 1, #ARGV, 1000 do
  redis.call('RPUSH', KEYS[2], unpack(ARGV, i, math.min(i + 999, #ARGV)))
end
return 1
";

/// Everything on a chat except the name and messages, which are mutated on their own.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredChat {
    id: String,
    user_id: String,
    product_information: ProductInformation,
    status: String,
    created_at: DateTime<Utc>,
}

/// Chat documents in Redis.
///
/// Each chat is a hash `{prefix}chat:{id}` holding the encoded document and its name, plus a
/// list `{prefix}chat:{id}:messages` of encoded messages. `{prefix}chats` is a sorted set of
/// ids scored by creation time, which gives the listing order.
pub struct RedisChatStore {
    client: Client,
    key_prefix: String,
    rename_script: Script,
    append_script: Script,
    replace_script: Script,
}

impl RedisChatStore {
    pub fn new(host: &str, key_prefix: &str) -> StoreResult<Self> {
        Ok(Self {
            client: Client::open(host)?,
            key_prefix: key_prefix.to_string(),
            rename_script: Script::new(RENAME_IF_SCRIPT),
            append_script: Script::new(APPEND_SCRIPT),
            replace_script: Script::new(REPLACE_SCRIPT),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn index_key(&self) -> String {
        format!("{}chats", self.key_prefix)
    }

    fn chat_key(&self, id: &str) -> String {
        format!("{}chat:{}", self.key_prefix, id)
    }

    fn messages_key(&self, id: &str) -> String {
        format!("{}chat:{}:messages", self.key_prefix, id)
    }

    fn encode_messages(messages: &[Message]) -> StoreResult<Vec<String>> {
        messages
            .iter()
            .map(|m| serde_json::to_string(m).map_err(StoreError::from))
            .collect()
    }
}

fn decode_chat(
    id: &str,
    doc: &str,
    name: String,
    raw_messages: &[String]
) -> StoreResult<Chat> {
    let corrupt = |source| StoreError::Corrupt { id: id.to_string(), source };
    let stored: StoredChat = serde_json::from_str(doc).map_err(corrupt)?;

    let messages = raw_messages
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            serde_json::from_str::<Message>(raw).map_err(|e| {
                warn!("Unreadable message {} in chat {}: {}", index, id, e);
                corrupt(e)
            })
        })
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(Chat {
        id: stored.id,
        user_id: stored.user_id,
        name,
        product_information: stored.product_information,
        messages,
        status: stored.status,
        created_at: stored.created_at,
    })
}

#[async_trait]
impl ChatStore for RedisChatStore {
    async fn insert_chat(&self, chat: &Chat) -> StoreResult<()> {
        let mut conn = self.get_connection().await?;
        let stored = StoredChat {
            id: chat.id.clone(),
            user_id: chat.user_id.clone(),
            product_information: chat.product_information.clone(),
            status: chat.status.clone(),
            created_at: chat.created_at,
        };
        let doc = serde_json::to_string(&stored)?;
        let encoded = Self::encode_messages(&chat.messages)?;

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset_multiple(self.chat_key(&chat.id), &[("doc", doc.as_str()), ("name", chat.name.as_str())])
            .ignore()
            .zadd(self.index_key(), &chat.id, chat.created_at.timestamp_millis())
            .ignore();
        if !encoded.is_empty() {
            pipe.rpush(self.messages_key(&chat.id), &encoded).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;

        debug!("Inserted chat {}", chat.id);
        Ok(())
    }

    async fn list_chats(&self) -> StoreResult<Vec<Chat>> {
        let ids: Vec<String> = {
            let mut conn = self.get_connection().await?;
            conn.zrange(self.index_key(), 0, -1).await?
        };

        let mut chats = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(chat) = self.find_chat(&id).await? {
                chats.push(chat);
            }
        }
        Ok(chats)
    }

    async fn find_chat(&self, id: &str) -> StoreResult<Option<Chat>> {
        let mut conn = self.get_connection().await?;

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("HMGET")
            .arg(self.chat_key(id))
            .arg("doc")
            .arg("name")
            .lrange(self.messages_key(id), 0, -1);
        let (fields, raw_messages): (Vec<Option<String>>, Vec<String>) = pipe.query_async(
            &mut conn
        ).await?;

        let mut fields = fields.into_iter();
        let (Some(Some(doc)), Some(Some(name))) = (fields.next(), fields.next()) else {
            return Ok(None);
        };

        decode_chat(id, &doc, name, &raw_messages).map(Some)
    }

    async fn rename_if(&self, id: &str, expected: &str, new_name: &str) -> StoreResult<bool> {
        let mut conn = self.get_connection().await?;
        let updated: i64 = self.rename_script
            .key(self.chat_key(id))
            .arg(expected)
            .arg(new_name)
            .invoke_async(&mut conn).await?;
        Ok(updated == 1)
    }

    async fn append_messages(&self, id: &str, messages: &[Message]) -> StoreResult<bool> {
        let encoded = Self::encode_messages(messages)?;
        let mut conn = self.get_connection().await?;
        let updated: i64 = self.append_script
            .key(self.chat_key(id))
            .key(self.messages_key(id))
            .arg(&encoded)
            .invoke_async(&mut conn).await?;
        Ok(updated == 1)
    }

    async fn replace_messages(&self, id: &str, messages: &[Message]) -> StoreResult<bool> {
        let encoded = Self::encode_messages(messages)?;
        let mut conn = self.get_connection().await?;
        let updated: i64 = self.replace_script
            .key(self.chat_key(id))
            .key(self.messages_key(id))
            .arg(&encoded)
            .invoke_async(&mut conn).await?;
        Ok(updated == 1)
    }

    async fn delete_chat(&self, id: &str) -> StoreResult<bool> {
        let mut conn = self.get_connection().await?;

        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(self.chat_key(id))
            .del(self.messages_key(id))
            .ignore()
            .zrem(self.index_key(), id)
            .ignore();
        let (deleted,): (i64,) = pipe.query_async(&mut conn).await?;

        Ok(deleted > 0)
    }
}
