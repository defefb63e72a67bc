use crate::providers::ChatMessage;

/// History of one conversation, owned by whoever renders it.
///
/// The system prompt is kept apart from the history so clearing the chat
/// never loses it.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    system_prompt: Option<String>,
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self { system_prompt: Some(prompt.into()), messages: Vec::new() }
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Drop the history, keep the system prompt.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Replace the system prompt and start over.
    pub fn reset_with(&mut self, system_prompt: Option<String>) {
        self.system_prompt = system_prompt;
        self.messages.clear();
    }

    /// Messages to send: the system prompt (if any) followed by the history.
    pub fn request_messages(&self) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        if let Some(sys) = &self.system_prompt {
            out.push(ChatMessage::system(sys.clone()));
        }
        out.extend(self.messages.iter().cloned());
        out
    }
}
