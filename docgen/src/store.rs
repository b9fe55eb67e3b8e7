use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Download metadata kept on an assistant turn. `download_url` is absolute.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    pub filename: String,
    pub download_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub doc_id: Option<String>,
    pub feedback_eligible: bool,
    pub word_document: Option<DocumentLink>,
}

/// Append-only conversation log.
///
/// A turn carries a `doc_id` only when it came from a successful generation,
/// and only such turns can be feedback-eligible.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversationStore {
    turns: Vec<ConversationTurn>,
    submitted: HashSet<String>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_user_turn(&mut self, text: impl Into<String>) {
        self.turns.push(ConversationTurn {
            role: Role::User,
            content: text.into(),
            timestamp: Utc::now(),
            doc_id: None,
            feedback_eligible: false,
            word_document: None,
        });
    }

    pub fn append_assistant_turn(
        &mut self,
        content: impl Into<String>,
        doc_id: Option<String>,
        word_document: Option<DocumentLink>,
    ) {
        let doc_id = doc_id.filter(|id| !id.is_empty());
        let feedback_eligible = doc_id
            .as_ref()
            .is_some_and(|id| !self.submitted.contains(id));

        self.turns.push(ConversationTurn {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            doc_id,
            feedback_eligible,
            word_document,
        });
    }

    /// Closes feedback for `doc_id`. Returns `false` when nothing changed.
    pub fn mark_feedback_submitted(&mut self, doc_id: &str) -> bool {
        if !self.submitted.insert(doc_id.to_owned()) {
            return false;
        }
        for turn in self
            .turns
            .iter_mut()
            .filter(|t| t.doc_id.as_deref() == Some(doc_id))
        {
            turn.feedback_eligible = false;
        }
        true
    }

    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.clone()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn contains_document(&self, doc_id: &str) -> bool {
        self.turns
            .iter()
            .any(|t| t.doc_id.as_deref() == Some(doc_id))
    }

    pub fn is_feedback_eligible(&self, doc_id: &str) -> bool {
        self.turns
            .iter()
            .any(|t| t.feedback_eligible && t.doc_id.as_deref() == Some(doc_id))
    }

    pub fn is_feedback_submitted(&self, doc_id: &str) -> bool {
        self.submitted.contains(doc_id)
    }

    /// Most recent turn that can still be rated.
    pub fn latest_eligible(&self) -> Option<&ConversationTurn> {
        self.turns.iter().rev().find(|t| t.feedback_eligible)
    }
}
