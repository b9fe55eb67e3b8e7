use std::cell::RefCell;
use std::collections::HashMap;

use shared::api::ClientTransport;
use shared::{DocumentRequest, DocumentType};

use crate::adapter::TransportAdapter;
use crate::error::{ClassifiedError, FeedbackError};
use crate::feedback::FeedbackDraft;
use crate::slot::{OnCancel, Slot};
use crate::store::{ConversationStore, ConversationTurn, DocumentLink};

pub const DEFAULT_ROLES: &str = "All relevant personnel";
pub const WELCOME_MESSAGE: &str = "Hello! I'm your SOP and Batch Record assistant. How can I help you today? You can ask me to create a document or provide information about SOPs and Batch Records.";
pub const GENERATION_APOLOGY: &str =
    "Sorry, I encountered an error while generating the document. Please try again.";
pub const FEEDBACK_THANKS: &str =
    "Thank you for your feedback! Is there anything else I can help you with?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Input was blank; nothing happened.
    Empty,
    /// A generation request is already in flight.
    Busy,
    Generated { doc_id: String },
    Failed(ClassifiedError),
    /// The slot moved on before the response arrived; it was dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            shift: false,
            ctrl: false,
            alt: false,
            meta: false,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn has_modifier(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Plain Enter: the input was submitted and the newline suppressed.
    Submitted(SendOutcome),
    /// Enter with a modifier: let the newline through.
    Newline,
    PassThrough,
}

impl KeyOutcome {
    pub fn prevents_default(&self) -> bool {
        matches!(self, KeyOutcome::Submitted(_))
    }
}

#[derive(Debug, Default)]
struct ConversationState {
    store: ConversationStore,
    input: String,
    document_type: DocumentType,
    slot: Slot,
    error: Option<ClassifiedError>,
    feedback: HashMap<String, FeedbackDraft>,
}

impl ConversationState {
    fn ensure_rateable(&self, doc_id: &str) -> Result<(), FeedbackError> {
        if self.store.is_feedback_submitted(doc_id) {
            return Err(FeedbackError::AlreadySubmitted(doc_id.to_owned()));
        }
        if !self.store.is_feedback_eligible(doc_id) {
            return Err(FeedbackError::UnknownDocument(doc_id.to_owned()));
        }
        Ok(())
    }
}

/// Drives the conversational generate-then-rate flow.
///
/// State lives behind a `RefCell` and no borrow is held across an await, so a
/// feedback submission can complete while a generation is still in flight.
/// Only one generation runs at a time.
pub struct ConversationController<T> {
    adapter: TransportAdapter<T>,
    state: RefCell<ConversationState>,
}

impl<T: ClientTransport> ConversationController<T> {
    pub fn new(adapter: TransportAdapter<T>) -> Self {
        Self {
            adapter,
            state: RefCell::new(ConversationState::default()),
        }
    }

    /// Opens the conversation with a greeting that cannot be rated.
    pub fn with_welcome(mut self) -> Self {
        self.state
            .get_mut()
            .store
            .append_assistant_turn(WELCOME_MESSAGE, None, None);
        self
    }

    pub fn adapter(&self) -> &TransportAdapter<T> {
        &self.adapter
    }

    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.state.borrow().store.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().slot.is_busy()
    }

    /// Error from the most recent generation attempt.
    pub fn error(&self) -> Option<ClassifiedError> {
        self.state.borrow().error.clone()
    }

    pub fn input(&self) -> String {
        self.state.borrow().input.clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.state.borrow_mut().input = text.into();
    }

    pub fn document_type(&self) -> DocumentType {
        self.state.borrow().document_type
    }

    pub fn set_document_type(&self, document_type: DocumentType) {
        self.state.borrow_mut().document_type = document_type;
    }

    pub fn feedback_state(&self, doc_id: &str) -> Option<FeedbackDraft> {
        self.state.borrow().feedback.get(doc_id).cloned()
    }

    /// Most recent document that can still be rated.
    pub fn latest_rateable(&self) -> Option<String> {
        self.state
            .borrow()
            .store
            .latest_eligible()
            .and_then(|t| t.doc_id.clone())
    }

    pub async fn send_message(&self) -> SendOutcome {
        let (ticket, request) = {
            let mut state = self.state.borrow_mut();
            let request = match DocumentRequest::new(
                state.input.clone(),
                DEFAULT_ROLES,
                None,
                state.document_type,
            ) {
                Ok(request) => request,
                Err(_) => return SendOutcome::Empty,
            };
            let Some(ticket) = state.slot.begin() else {
                return SendOutcome::Busy;
            };

            let text = std::mem::take(&mut state.input);
            state.store.append_user_turn(text);
            state.error = None;
            (ticket, request)
        };

        tracing::debug!(token = ticket.token(), "generation started");
        let cancel = OnCancel::new(move || {
            if let Ok(mut state) = self.state.try_borrow_mut() {
                state.slot.complete(ticket);
                tracing::debug!(token = ticket.token(), "generation dropped before completion");
            }
        });
        let result = self.adapter.generate_document(&request).await;
        cancel.disarm();

        let mut state = self.state.borrow_mut();
        if !state.slot.complete(ticket) {
            tracing::debug!(token = ticket.token(), "discarding stale generation");
            return SendOutcome::Stale;
        }

        match result {
            Ok(resp) => {
                let link = resp
                    .word_document
                    .as_ref()
                    .filter(|doc| doc.available)
                    .map(|doc| DocumentLink {
                        filename: doc.filename.clone(),
                        download_url: self.adapter.download_url(doc),
                    });
                let doc_id = resp.doc_id;
                state
                    .store
                    .append_assistant_turn(resp.content, Some(doc_id.clone()), link);
                tracing::debug!(token = ticket.token(), %doc_id, "generation succeeded");
                SendOutcome::Generated { doc_id }
            }
            Err(err) => {
                state
                    .store
                    .append_assistant_turn(GENERATION_APOLOGY, None, None);
                state.error = Some(err.clone());
                SendOutcome::Failed(err)
            }
        }
    }

    pub fn set_feedback_rating(&self, doc_id: &str, score: u8) -> Result<(), FeedbackError> {
        let mut state = self.state.borrow_mut();
        state.ensure_rateable(doc_id)?;
        state
            .feedback
            .entry(doc_id.to_owned())
            .or_default()
            .set_rating(score)
    }

    pub fn set_feedback_text(
        &self,
        doc_id: &str,
        text: impl Into<String>,
    ) -> Result<(), FeedbackError> {
        let mut state = self.state.borrow_mut();
        state.ensure_rateable(doc_id)?;
        state.feedback.entry(doc_id.to_owned()).or_default().text = text.into();
        Ok(())
    }

    /// Sends the draft rating for `doc_id`. Unknown or already-rated
    /// documents are refused before any network call.
    pub async fn submit_feedback(&self, doc_id: &str) -> Result<(), FeedbackError> {
        let request = {
            let mut state = self.state.borrow_mut();
            state.ensure_rateable(doc_id)?;
            let draft = state.feedback.entry(doc_id.to_owned()).or_default();
            if draft.pending {
                return Err(FeedbackError::Pending(doc_id.to_owned()));
            }
            let request = draft.to_request(doc_id)?;
            draft.pending = true;
            draft.error = None;
            request
        };

        let cancel = OnCancel::new(|| {
            if let Ok(mut state) = self.state.try_borrow_mut() {
                if let Some(draft) = state.feedback.get_mut(doc_id) {
                    draft.pending = false;
                }
            }
        });
        let result = self.adapter.submit_feedback(&request).await;
        cancel.disarm();

        let mut state = self.state.borrow_mut();
        match result {
            Ok(_) => {
                state.feedback.remove(doc_id);
                if state.store.mark_feedback_submitted(doc_id) {
                    state
                        .store
                        .append_assistant_turn(FEEDBACK_THANKS, None, None);
                }
                tracing::debug!(%doc_id, "feedback accepted");
                Ok(())
            }
            Err(err) => {
                if let Some(draft) = state.feedback.get_mut(doc_id) {
                    draft.pending = false;
                    draft.error = Some(err.user_message());
                }
                Err(err.into())
            }
        }
    }

    pub async fn handle_key_down(&self, key: &KeyPress) -> KeyOutcome {
        if key.key != "Enter" {
            return KeyOutcome::PassThrough;
        }
        if key.has_modifier() {
            return KeyOutcome::Newline;
        }
        KeyOutcome::Submitted(self.send_message().await)
    }
}
