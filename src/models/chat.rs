use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const PLACEHOLDER_CHAT_NAME: &str = "New Chat";
pub const DEFAULT_CHAT_STATUS: &str = "active";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Bot => write!(f, "bot"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Shared by the user message and the bot reply of one exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_id: Option<String>,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>, exchange_id: &str) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: Utc::now(),
            exchange_id: Some(exchange_id.to_string()),
        }
    }
}

/// Structured product context extracted from packaging. Always a non-empty JSON object
/// once it has passed through [`ProductInformation::new`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductInformation(Map<String, Value>);

impl ProductInformation {
    pub fn new(fields: Map<String, Value>) -> Option<Self> {
        if fields.is_empty() {
            None
        } else {
            Some(Self(fields))
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| Value::Object(self.0.clone()).to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub product_information: ProductInformation,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn is_renamed(&self) -> bool {
        self.name != PLACEHOLDER_CHAT_NAME
    }

    /// The first user message and the first bot reply, in that order.
    pub fn first_exchange(&self) -> Option<(&str, &str)> {
        let user = self.messages.iter().find(|m| m.sender == Sender::User)?;
        let bot = self.messages.iter().find(|m| m.sender == Sender::Bot)?;
        Some((user.text.as_str(), bot.text.as_str()))
    }
}

/// History with the most recent exchange removed.
///
/// Trailing messages sharing the last message's exchange id are dropped. Messages stored
/// before exchange ids existed fall back to dropping the last two entries.
pub fn without_last_exchange(messages: &[Message]) -> Vec<Message> {
    let Some(last) = messages.last() else {
        return Vec::new();
    };

    let keep = match &last.exchange_id {
        Some(exchange_id) => {
            let trailing = messages
                .iter()
                .rev()
                .take_while(|m| m.exchange_id.as_deref() == Some(exchange_id.as_str()))
                .count();
            messages.len() - trailing
        }
        None => messages.len().saturating_sub(2),
    };

    messages[..keep].to_vec()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    #[serde(default)]
    pub product_information: Map<String, Value>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameChatRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(alias = "chat_id")]
    pub chat_id: String,
    #[serde(default)]
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(sender: Sender, text: &str, exchange: Option<&str>) -> Message {
        Message {
            sender,
            text: text.to_string(),
            timestamp: Utc::now(),
            exchange_id: exchange.map(str::to_string),
        }
    }

    #[test]
    fn empty_product_information_is_rejected() {
        assert!(ProductInformation::new(Map::new()).is_none());

        let mut fields = Map::new();
        fields.insert("brand".into(), json!("Acme"));
        assert!(ProductInformation::new(fields).is_some());
    }

    #[test]
    fn chat_serializes_with_document_field_names() {
        let mut fields = Map::new();
        fields.insert("brand".into(), json!("Acme"));
        let chat = Chat {
            id: "abc".into(),
            user_id: "user123".into(),
            name: PLACEHOLDER_CHAT_NAME.into(),
            product_information: ProductInformation::new(fields).unwrap(),
            messages: vec![msg(Sender::Bot, "hi", None)],
            status: DEFAULT_CHAT_STATUS.into(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&chat).unwrap();
        assert_eq!(value["_id"], "abc");
        assert_eq!(value["userId"], "user123");
        assert_eq!(value["productInformation"]["brand"], "Acme");
        assert_eq!(value["messages"][0]["sender"], "bot");
        assert!(value["messages"][0].get("exchangeId").is_none());
    }

    #[test]
    fn drops_trailing_exchange_by_id() {
        let history = vec![
            msg(Sender::User, "a", Some("1")),
            msg(Sender::Bot, "b", Some("1")),
            msg(Sender::User, "c", Some("2")),
            msg(Sender::Bot, "d", Some("2")),
        ];
        let kept = without_last_exchange(&history);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].text, "b");
    }

    #[test]
    fn half_finished_exchange_only_removes_its_own_messages() {
        let history = vec![
            msg(Sender::User, "a", Some("1")),
            msg(Sender::Bot, "b", Some("1")),
            msg(Sender::User, "c", Some("2")),
        ];
        let kept = without_last_exchange(&history);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn legacy_history_drops_last_two() {
        let history = vec![
            msg(Sender::User, "a", None),
            msg(Sender::Bot, "b", None),
            msg(Sender::User, "c", None),
        ];
        assert_eq!(without_last_exchange(&history).len(), 1);
        assert!(without_last_exchange(&[]).is_empty());
    }

    #[test]
    fn first_exchange_picks_first_of_each_sender() {
        let history = vec![
            msg(Sender::Bot, "welcome", None),
            msg(Sender::User, "question", None),
            msg(Sender::Bot, "answer", None),
        ];
        let chat = Chat {
            id: "x".into(),
            user_id: "u".into(),
            name: PLACEHOLDER_CHAT_NAME.into(),
            product_information: ProductInformation::default(),
            messages: history,
            status: DEFAULT_CHAT_STATUS.into(),
            created_at: Utc::now(),
        };
        assert_eq!(chat.first_exchange(), Some(("question", "welcome")));
    }
}
