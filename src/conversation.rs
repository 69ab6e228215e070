//! Append-only transcript of user messages and gift-wrapped replies.

use chrono::Local;
use serde::Serialize;
use thiserror::Error;

use crate::completion::{ChatMessage, CompletionError, Role};
use crate::gate::{GateError, GateStatus, RevealGate};
use crate::trivia::TriviaItem;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("message is empty")]
    EmptyText,
    #[error("still waiting for the previous reply")]
    Busy,
    #[error(transparent)]
    Service(#[from] CompletionError),
    #[error("the reply was lost before it arrived")]
    Interrupted,
}

impl SubmitError {
    /// True for submissions refused before anything changed.
    pub fn is_rejection(&self) -> bool {
        matches!(self, SubmitError::EmptyText | SubmitError::Busy)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("no conversation entry with id {0}")]
    UnknownEntry(usize),
    #[error("entry {0} is not an assistant reply")]
    NotAReply(usize),
    #[error(transparent)]
    Gate(#[from] GateError),
}

#[derive(Debug)]
pub enum EntryKind {
    User(String),
    Assistant(RevealGate),
}

#[derive(Debug)]
pub struct ConversationEntry {
    pub id: usize,
    pub timestamp: String,
    pub kind: EntryKind,
}

impl ConversationEntry {
    pub fn role(&self) -> Role {
        match self.kind {
            EntryKind::User(_) => Role::User,
            EntryKind::Assistant(_) => Role::Assistant,
        }
    }

    fn view(&self) -> EntryView {
        match &self.kind {
            EntryKind::User(text) => EntryView {
                id: self.id,
                timestamp: self.timestamp.clone(),
                role: Role::User,
                status: None,
                text: Some(text.clone()),
                challenge: None,
            },
            EntryKind::Assistant(gate) => EntryView {
                id: self.id,
                timestamp: self.timestamp.clone(),
                role: Role::Assistant,
                status: Some(gate.status()),
                text: gate.revealed_payload().map(str::to_string),
                challenge: gate.open_challenge().map(ChallengeView::from),
            },
        }
    }
}

/// Published whenever the transcript changes so views can re-render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    EntryAppended { id: usize, role: Role },
    ChallengeOpened { id: usize },
    EntryUpdated { id: usize, status: GateStatus },
    RequestFailed { message: String },
}

/// Render-ready transcript. Sealed and discarded replies carry no text.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptView {
    pub entries: Vec<EntryView>,
    pub in_flight: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryView {
    pub id: usize,
    pub timestamp: String,
    pub role: Role,
    pub status: Option<GateStatus>,
    pub text: Option<String>,
    pub challenge: Option<ChallengeView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChallengeView {
    pub prompt: &'static str,
    pub media: Option<&'static str>,
    /// `None` means a free-text answer box.
    pub options: Option<&'static [&'static str]>,
}

impl From<&'static TriviaItem> for ChallengeView {
    fn from(item: &'static TriviaItem) -> Self {
        Self {
            prompt: item.prompt,
            media: item.media,
            options: item.options(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Conversation {
    entries: Vec<ConversationEntry>,
    in_flight: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Appends the user's message and returns the history to send.
    ///
    /// Marks a request as in flight; callers must follow up with
    /// [`Conversation::complete_exchange`] or [`Conversation::abort_exchange`].
    pub fn begin_exchange(&mut self, text: &str) -> Result<Vec<ChatMessage>, SubmitError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitError::EmptyText);
        }
        if self.in_flight {
            return Err(SubmitError::Busy);
        }

        self.push(EntryKind::User(text.to_string()));
        self.in_flight = true;
        Ok(self.history())
    }

    /// Wraps the reply in a sealed gate and ends the exchange.
    pub fn complete_exchange(&mut self, reply: String) -> usize {
        self.in_flight = false;
        self.push(EntryKind::Assistant(RevealGate::new(reply)))
    }

    /// Ends the exchange without a reply. The user's message stays.
    pub fn abort_exchange(&mut self) {
        self.in_flight = false;
    }

    pub fn gate_mut(&mut self, id: usize) -> Result<&mut RevealGate, ConversationError> {
        match self.entries.get_mut(id).map(|entry| &mut entry.kind) {
            Some(EntryKind::Assistant(gate)) => Ok(gate),
            Some(EntryKind::User(_)) => Err(ConversationError::NotAReply(id)),
            None => Err(ConversationError::UnknownEntry(id)),
        }
    }

    /// Latest reply that is still wrapped.
    pub fn newest_sealed(&self) -> Option<usize> {
        self.entries
            .iter()
            .rev()
            .find(|entry| {
                matches!(&entry.kind, EntryKind::Assistant(gate) if gate.status() == GateStatus::Sealed)
            })
            .map(|entry| entry.id)
    }

    pub fn view(&self) -> TranscriptView {
        TranscriptView {
            entries: self.entries.iter().map(ConversationEntry::view).collect(),
            in_flight: self.in_flight,
        }
    }

    // The model sees the whole exchange, wrapped or not.
    fn history(&self) -> Vec<ChatMessage> {
        self.entries
            .iter()
            .map(|entry| match &entry.kind {
                EntryKind::User(text) => ChatMessage::user(text.as_str()),
                EntryKind::Assistant(gate) => ChatMessage::assistant(gate.payload()),
            })
            .collect()
    }

    fn push(&mut self, kind: EntryKind) -> usize {
        let id = self.entries.len();
        self.entries.push(ConversationEntry {
            id,
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            kind,
        });
        id
    }
}
