//! Chat Message Types
//!
//! The wire shapes exchanged with the chat server. Messages are immutable
//! once received: the client only ever appends what the server returns.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned message identifier
///
/// Opaque to the client: whatever the server sends (a JSON number or a
/// string) is kept as-is and handed back verbatim as the `from` cursor of the
/// next incremental fetch. Ordering is the server's business.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    /// Numeric id
    Number(u64),
    /// Any other token, kept verbatim (`"0007"` stays `"0007"`)
    Token(String),
}

impl MessageId {
    /// Placeholder id sent on create; also the "from the beginning" cursor
    pub const ZERO: MessageId = MessageId::Number(0);

    /// Wrap a string token
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(token.into())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Token(token) => f.write_str(token),
        }
    }
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

/// Identifier of a chat participant
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A chat message as stored by the server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-assigned id
    pub id: MessageId,
    /// Author of the message
    pub user_id: UserId,
    /// Free-form text
    pub content: String,
}

impl Message {
    /// Create a message
    pub fn new(id: MessageId, user_id: impl Into<UserId>, content: impl Into<String>) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            content: content.into(),
        }
    }

    /// Build the create payload for an outgoing message
    ///
    /// The id is a placeholder; the server assigns the real one.
    pub fn outgoing(user_id: UserId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::ZERO,
            user_id,
            content: content.into(),
        }
    }

    /// Whether `user` wrote this message
    #[must_use]
    pub fn is_from(&self, user: &UserId) -> bool {
        &self.user_id == user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let msg = Message::outgoing(UserId::new("abc"), "hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": 0, "userId": "abc", "content": "hello" })
        );
    }

    #[test]
    fn test_message_id_accepts_number_or_string() {
        let page: Vec<Message> = serde_json::from_str(
            r#"[{"id":1,"userId":"a","content":"hi"},{"id":"msg-2","userId":"b","content":"yo"}]"#,
        )
        .unwrap();
        assert_eq!(page[0].id, MessageId::Number(1));
        assert_eq!(page[1].id, MessageId::token("msg-2"));
    }

    #[test]
    fn test_string_ids_round_trip_verbatim() {
        let msg: Message =
            serde_json::from_str(r#"{"id":"0007","userId":"a","content":""}"#).unwrap();
        assert_eq!(msg.id, MessageId::token("0007"));
        assert_eq!(msg.id.to_string(), "0007");
        assert_eq!(
            serde_json::to_value(&msg).unwrap()["id"],
            serde_json::json!("0007")
        );
    }

    #[test]
    fn test_message_id_rejects_non_scalar() {
        let result = serde_json::from_str::<Message>(r#"{"id":[1],"userId":"a","content":""}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_generated_user_ids_are_unique() {
        let a = UserId::generate();
        let b = UserId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_default_id_is_start_cursor() {
        assert_eq!(MessageId::default(), MessageId::ZERO);
        assert_eq!(MessageId::ZERO.to_string(), "0");
        assert_eq!(MessageId::from(42), MessageId::Number(42));
    }
}
