use std::fmt;

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message of the conversation. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
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

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// The state owned by a single chat widget.
#[derive(Debug, Default)]
pub struct ConversationState {
    turns: Vec<Turn>,
    pending_input: String,
    awaiting_response: bool,
    conversation_id: Option<String>,
    // Bumped on every reset so replies to older requests can be recognised.
    epoch: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user_message(&mut self, message: &str) {
        self.turns.push(Turn::user(message));
    }

    pub fn add_assistant_message(&mut self, message: &str) {
        self.turns.push(Turn::assistant(message));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn set_pending_input(&mut self, input: &str) {
        self.pending_input = input.to_string();
    }

    pub fn take_pending_input(&mut self) -> String {
        std::mem::take(&mut self.pending_input)
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.awaiting_response
    }

    pub fn set_awaiting_response(&mut self, awaiting: bool) {
        self.awaiting_response = awaiting;
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Stores `id` unless the conversation already has one.
    pub fn adopt_conversation_id(&mut self, id: &str) -> bool {
        if self.conversation_id.is_some() {
            return false;
        }
        self.conversation_id = Some(id.to_string());
        true
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Forgets the conversation. The awaiting flag is left alone: a request
    /// that is still in flight keeps blocking new submissions.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.pending_input.clear();
        self.conversation_id = None;
        self.epoch += 1;
    }
}
