use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod api;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    #[default]
    Sop,
    Batch,
}

impl DocumentType {
    pub fn label(self) -> &'static str {
        match self {
            DocumentType::Sop => "Standard Operating Procedure (SOP)",
            DocumentType::Batch => "Batch Record",
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sop" => Ok(DocumentType::Sop),
            "batch" => Ok(DocumentType::Batch),
            other => Err(RequestError::UnknownDocumentType(other.to_owned())),
        }
    }
}

/// Client-side precondition failures. Nothing that fails here is ever sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("steps must not be empty")]
    EmptySteps,
    #[error("roles must not be empty")]
    EmptyRoles,
    #[error("document id must not be empty")]
    EmptyDocId,
    #[error("score {0} is outside 1..=5")]
    ScoreOutOfRange(u8),
    #[error("unknown document type `{0}`, expected `sop` or `batch`")]
    UnknownDocumentType(String),
}

/// One generation request. Fields are private so every instance has passed
/// [`DocumentRequest::new`].
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DocumentRequest {
    steps: String,
    roles: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(rename = "type")]
    kind: DocumentType,
}

impl DocumentRequest {
    pub fn new(
        steps: impl Into<String>,
        roles: impl Into<String>,
        notes: Option<String>,
        kind: DocumentType,
    ) -> Result<Self, RequestError> {
        let steps = steps.into();
        let roles = roles.into();

        if steps.trim().is_empty() {
            return Err(RequestError::EmptySteps);
        }
        if roles.trim().is_empty() {
            return Err(RequestError::EmptyRoles);
        }

        Ok(Self {
            steps,
            roles,
            notes: notes.filter(|n| !n.trim().is_empty()),
            kind,
        })
    }

    pub fn steps(&self) -> &str {
        &self.steps
    }

    pub fn roles(&self) -> &str {
        &self.roles
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn kind(&self) -> DocumentType {
        self.kind
    }
}

fn available_by_default() -> bool {
    true
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WordDocument {
    #[serde(default = "available_by_default")]
    pub available: bool,
    pub filename: String,
    pub download_url: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DocumentResponse {
    pub success: bool,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub doc_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_document: Option<WordDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRequest {
    doc_id: String,
    score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl FeedbackRequest {
    pub fn new(
        doc_id: impl Into<String>,
        score: u8,
        text: Option<String>,
    ) -> Result<Self, RequestError> {
        let doc_id = doc_id.into();
        if doc_id.is_empty() {
            return Err(RequestError::EmptyDocId);
        }
        check_score(score)?;

        Ok(Self {
            doc_id,
            score,
            text: text.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

pub fn check_score(score: u8) -> Result<u8, RequestError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(score)
    } else {
        Err(RequestError::ScoreOutOfRange(score))
    }
}

/// Acknowledgement returned by both `/api/feedback` and `/api/train`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FeedbackResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentTally {
    pub total: u64,
    pub with_feedback: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ModelStats {
    pub total_documents: u64,
    pub documents_with_feedback: u64,
    pub average_feedback_score: f64,
    pub sops: DocumentTally,
    pub batch_records: DocumentTally,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct StatsResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ModelStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of a non-2xx response. Every route reports failures the same way.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiFailure {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Failure taxonomy surfaced to callers once retries are exhausted.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Timeout,
    NetworkUnreachable,
    ServerError,
    Unknown,
}
