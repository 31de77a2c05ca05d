use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One line of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub speaker: String,
    pub text: String,
}

impl ContextEntry {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }

    /// `"{speaker}: {text}"`, the form used when composing prompts.
    pub fn render(&self) -> String {
        format!("{}: {}", self.speaker, self.text)
    }
}

type ConversationBuffer = Arc<Mutex<VecDeque<ContextEntry>>>;

/// Bounded per-conversation history.
///
/// Each conversation owns a FIFO buffer behind its own mutex: appends to one
/// conversation are serialized, different conversations never contend.
#[derive(Debug)]
pub struct ContextManager {
    capacity: usize,
    conversations: DashMap<String, ConversationBuffer>,
}

impl ContextManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            conversations: DashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn buffer(&self, conversation_id: &str) -> ConversationBuffer {
        self.conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::with_capacity(self.capacity))))
            .clone()
    }

    fn existing_buffer(&self, conversation_id: &str) -> Option<ConversationBuffer> {
        self.conversations
            .get(conversation_id)
            .map(|buffer| Arc::clone(&buffer))
    }

    fn push_bounded(&self, buffer: &mut VecDeque<ContextEntry>, entry: ContextEntry) {
        if self.capacity == 0 {
            return;
        }
        while buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(entry);
    }

    /// Append one entry, evicting the oldest when full.
    pub async fn append(
        &self,
        conversation_id: &str,
        speaker: impl Into<String>,
        text: impl Into<String>,
    ) {
        let buffer = self.buffer(conversation_id);
        let mut entries = buffer.lock().await;
        self.push_bounded(&mut entries, ContextEntry::new(speaker, text));
    }

    /// Append a message and its reply under one lock so they stay adjacent.
    pub async fn append_exchange(
        &self,
        conversation_id: &str,
        message: ContextEntry,
        reply: ContextEntry,
    ) {
        let buffer = self.buffer(conversation_id);
        let mut entries = buffer.lock().await;
        self.push_bounded(&mut entries, message);
        self.push_bounded(&mut entries, reply);
    }

    /// Retained entries, oldest first. Empty for unknown conversations.
    pub async fn recent(&self, conversation_id: &str) -> Vec<ContextEntry> {
        match self.existing_buffer(conversation_id) {
            Some(buffer) => buffer.lock().await.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Drop the history of one conversation. Returns whether anything was held.
    pub async fn clear(&self, conversation_id: &str) -> bool {
        match self.existing_buffer(conversation_id) {
            Some(buffer) => {
                let mut entries = buffer.lock().await;
                let had_entries = !entries.is_empty();
                entries.clear();
                had_entries
            }
            None => false,
        }
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }
}
