use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One turn in a conversation, in the wire shape the chat endpoint uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// May be empty while a response is still streaming.
    #[serde(default)]
    pub content: String,
    /// Tool name, only set on `tool` messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn tool(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            name: Some(name.into()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }
}

/// Ordered message log threaded through one dispatch loop run.
///
/// Append-only. The synthesized system message, when present, sits at the
/// front and is never part of [`to_sequence`](Self::to_sequence).
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    has_system: bool,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            has_system: false,
        }
    }

    /// Start a log with `prompt` prepended as a system message.
    pub fn with_system_prompt(prompt: impl Into<String>, messages: Vec<Message>) -> Self {
        let mut all = Vec::with_capacity(messages.len() + 1);
        all.push(Message::system(prompt));
        all.extend(messages);
        Self {
            messages: all,
            has_system: true,
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Everything, including the leading system message (what the model sees).
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The caller-visible part of the log.
    pub fn without_system(&self) -> &[Message] {
        if self.has_system {
            &self.messages[1..]
        } else {
            &self.messages
        }
    }

    pub fn to_sequence(&self) -> Vec<Message> {
        self.without_system().to_vec()
    }

    pub fn into_sequence(mut self) -> Vec<Message> {
        if self.has_system {
            self.messages.remove(0);
        }
        self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
