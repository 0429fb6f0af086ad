//! Conversation turns and histories

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::llm::Provider;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Pm,
    Ia,
    Developer,
}

impl Role {
    /// Uppercase label used in transcripts
    pub fn label(&self) -> &'static str {
        match self {
            Role::Pm => "PM",
            Role::Ia => "IA",
            Role::Developer => "DEVELOPER",
        }
    }
}

/// Which document flow a conversation follows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TemplateType {
    /// Break an existing PRD down into user stories
    ExistingPrd,
    /// Write a brand new PRD (`prd.md`)
    NewPrd,
    /// Write a PRD and stories for a new feature (`feature.md`)
    NewFeature,
    /// Any other skeleton name
    Other(String),
}

impl TemplateType {
    pub fn as_str(&self) -> &str {
        match self {
            TemplateType::ExistingPrd => "prd_feature_existing",
            TemplateType::NewPrd => "prd.md",
            TemplateType::NewFeature => "feature.md",
            TemplateType::Other(name) => name,
        }
    }
}

impl From<String> for TemplateType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "prd_feature_existing" => TemplateType::ExistingPrd,
            "prd.md" => TemplateType::NewPrd,
            "feature.md" => TemplateType::NewFeature,
            _ => TemplateType::Other(s),
        }
    }
}

impl From<&str> for TemplateType {
    fn from(s: &str) -> Self {
        TemplateType::from(s.to_string())
    }
}

impl From<TemplateType> for String {
    fn from(t: TemplateType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata carried only by the opening turn of a PM conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningMetadata {
    pub template_type: TemplateType,
    pub existing_prd: Option<String>,
    pub provider: Provider,
}

/// One utterance.
///
/// The opening turn is a distinct variant so the metadata cannot be lost
/// or attached to a later turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationTurn {
    /// First PM turn of a PM conversation
    Opening { content: String, metadata: OpeningMetadata },
    Message { role: Role, content: String },
}

impl ConversationTurn {
    pub fn opening(content: impl Into<String>, metadata: OpeningMetadata) -> Self {
        ConversationTurn::Opening {
            content: content.into(),
            metadata,
        }
    }

    pub fn pm(content: impl Into<String>) -> Self {
        Self::message(Role::Pm, content)
    }

    pub fn ia(content: impl Into<String>) -> Self {
        Self::message(Role::Ia, content)
    }

    pub fn developer(content: impl Into<String>) -> Self {
        Self::message(Role::Developer, content)
    }

    fn message(role: Role, content: impl Into<String>) -> Self {
        ConversationTurn::Message {
            role,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            ConversationTurn::Opening { .. } => Role::Pm,
            ConversationTurn::Message { role, .. } => *role,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ConversationTurn::Opening { content, .. } | ConversationTurn::Message { content, .. } => content,
        }
    }

    pub fn metadata(&self) -> Option<&OpeningMetadata> {
        match self {
            ConversationTurn::Opening { metadata, .. } => Some(metadata),
            ConversationTurn::Message { .. } => None,
        }
    }
}

/// Structural problems with a stored PM history
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("la conversación está vacía")]
    Empty,

    #[error("el primer turno no contiene los metadatos de apertura")]
    MissingOpening,

    #[error("turno de apertura en la posición {0}")]
    MisplacedOpening(usize),
}

/// A PM history whose first turn is known to carry the opening metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmConversation {
    metadata: OpeningMetadata,
    turns: Vec<ConversationTurn>,
}

impl PmConversation {
    /// Start a conversation from the PM's opening turn
    pub fn start(content: impl Into<String>, metadata: OpeningMetadata) -> Self {
        Self {
            turns: vec![ConversationTurn::opening(content, metadata.clone())],
            metadata,
        }
    }

    pub fn metadata(&self) -> &OpeningMetadata {
        &self.metadata
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Append a plain turn; opening turns are only valid at position 0
    pub fn push(&mut self, turn: ConversationTurn) -> Result<(), HistoryError> {
        if turn.metadata().is_some() {
            return Err(HistoryError::MisplacedOpening(self.turns.len()));
        }
        self.turns.push(turn);
        Ok(())
    }

    pub fn into_turns(self) -> Vec<ConversationTurn> {
        self.turns
    }
}

impl TryFrom<Vec<ConversationTurn>> for PmConversation {
    type Error = HistoryError;

    fn try_from(turns: Vec<ConversationTurn>) -> Result<Self, Self::Error> {
        let first = turns.first().ok_or(HistoryError::Empty)?;
        let metadata = first.metadata().cloned().ok_or(HistoryError::MissingOpening)?;
        if let Some(pos) = turns.iter().skip(1).position(|t| t.metadata().is_some()) {
            return Err(HistoryError::MisplacedOpening(pos + 1));
        }
        Ok(Self { metadata, turns })
    }
}

/// True iff the history is empty or holds exactly one PM turn
pub fn is_initial(turns: &[ConversationTurn]) -> bool {
    match turns {
        [] => true,
        [only] => only.role() == Role::Pm,
        _ => false,
    }
}

/// Full transcript: one `ROLE: content` line per turn, in order
pub fn transcript(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role().label(), t.content()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Transcript of the PM's own turns only, each line newline-terminated
pub fn pm_transcript(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .filter(|t| t.role() == Role::Pm)
        .map(|t| format!("{}: {}\n", t.role().label(), t.content()))
        .collect()
}
