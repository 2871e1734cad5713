use serde::{Deserialize, Serialize};

/// Fixed reply appended as its own assistant message when a turn fails.
/// Prior content is never altered; this is always a new message.
pub const ERROR_REPLY: &str = "Sorry, there was an error processing your message.";

/// Who authored a message. Serialized lowercase to match the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Transitions applied to a conversation over the course of a turn.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// The user submitted a message
    AppendUser(String),
    /// The response was accepted; show an empty reply slot
    AppendPlaceholder,
    /// A decoded fragment arrived for the in-flight reply
    ExtendLast(String),
    /// The turn failed; append the fixed error reply
    AppendError,
}

/// Ordered, append-only message sequence for one session.
///
/// The last message's content may be extended in place while a reply streams
/// in; messages are never reordered or removed.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Apply one transition. `ExtendLast` only touches the last message when
    /// its role is assistant; anything else leaves the sequence unchanged.
    pub fn apply(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::AppendUser(content) => {
                self.messages.push(Message::user(content));
            }
            ChatEvent::AppendPlaceholder => {
                self.messages.push(Message::assistant(String::new()));
            }
            ChatEvent::ExtendLast(delta) => {
                if let Some(last) = self.messages.last_mut() {
                    if last.role == Role::Assistant {
                        last.content.push_str(&delta);
                    }
                }
            }
            ChatEvent::AppendError => {
                self.messages.push(Message::assistant(ERROR_REPLY));
            }
        }
    }
}
