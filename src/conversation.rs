use chrono::Local;
use serde::Serialize;
use uuid::Uuid;

use crate::order::Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// What a message carries besides its text. An order payload exists only on `Order` bodies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
pub enum MessageBody {
    Plain,
    Order(Order),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub timestamp: String,
    pub role: Role,
    pub text: String,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl Message {
    fn new(role: Role, text: String, body: MessageBody) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            role,
            text,
            body,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text.into(), MessageBody::Plain)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text.into(), MessageBody::Plain)
    }

    pub fn assistant_order(text: impl Into<String>, order: Order) -> Self {
        Self::new(Role::Assistant, text.into(), MessageBody::Order(order))
    }

    pub fn order(&self) -> Option<&Order> {
        match &self.body {
            MessageBody::Order(order) => Some(order),
            MessageBody::Plain => None,
        }
    }

    pub fn is_order(&self) -> bool {
        self.order().is_some()
    }
}

/// Append-only transcript. Messages are never edited or removed once pushed.
#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transcript opened by the assistant's greeting, as the chat screen starts.
    pub fn with_greeting(greeting: &str) -> Self {
        let mut store = Self::new();
        store.append(Message::assistant(greeting));
        store
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Messages appended after the first `seen` ones.
    pub fn since(&self, seen: usize) -> &[Message] {
        &self.messages[seen.min(self.messages.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Order;

    #[test]
    fn test_append_preserves_order() {
        let mut store = ConversationStore::new();
        store.append(Message::user("Hello"));
        store.append(Message::assistant("Hi there!"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.messages()[0].role, Role::User);
        assert_eq!(store.messages()[0].text, "Hello");
        assert_eq!(store.messages()[1].role, Role::Assistant);
        assert_eq!(store.last().unwrap().text, "Hi there!");
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = Message::user("a");
        let b = Message::user("a");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_order_payload_only_on_order_messages() {
        let plain = Message::assistant("ok");
        assert!(!plain.is_order());

        let order = Order::new("r".into(), Vec::new(), "a".into(), "e".into());
        let msg = Message::assistant_order("ok", order.clone());
        assert_eq!(msg.order(), Some(&order));
    }

    #[test]
    fn test_since() {
        let mut store = ConversationStore::with_greeting("hi");
        store.append(Message::user("x"));
        assert_eq!(store.since(1).len(), 1);
        assert_eq!(store.since(5).len(), 0);
    }

    #[test]
    fn test_message_json_shape() {
        let json = serde_json::to_value(Message::assistant("ok")).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["kind"], "plain");
        assert!(json.get("payload").is_none());
    }
}
