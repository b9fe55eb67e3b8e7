use std::cell::RefCell;

use shared::api::ClientTransport;
use shared::{DocumentRequest, DocumentResponse, DocumentType, RequestError};

use crate::adapter::TransportAdapter;
use crate::error::{ClassifiedError, FeedbackError};
use crate::feedback::FeedbackDraft;
use crate::slot::{OnCancel, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormPhase {
    #[default]
    Idle,
    Submitting,
    Shown,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Invalid(RequestError),
    Busy,
    Shown { doc_id: String },
    Errored(ClassifiedError),
    /// The form was reset while the request was in flight.
    Stale,
}

#[derive(Debug, Default)]
struct FormState {
    steps: String,
    roles: String,
    notes: String,
    document_type: DocumentType,
    slot: Slot,
    phase: FormPhase,
    response: Option<DocumentResponse>,
    error: Option<ClassifiedError>,
    feedback: FeedbackDraft,
    feedback_submitted: bool,
}

impl FormState {
    fn current_doc_id(&self) -> Result<String, FeedbackError> {
        match (&self.phase, &self.response) {
            (FormPhase::Shown, Some(resp)) => Ok(resp.doc_id.clone()),
            _ => Err(FeedbackError::NoDocument),
        }
    }

    fn ensure_rateable(&self) -> Result<String, FeedbackError> {
        let doc_id = self.current_doc_id()?;
        if self.feedback_submitted {
            return Err(FeedbackError::AlreadySubmitted(doc_id));
        }
        Ok(doc_id)
    }
}

/// Single-slot "generate one document" flow. A new submission replaces the
/// previous result and clears its feedback.
pub struct FormController<T> {
    adapter: TransportAdapter<T>,
    state: RefCell<FormState>,
}

impl<T: ClientTransport> FormController<T> {
    pub fn new(adapter: TransportAdapter<T>) -> Self {
        Self {
            adapter,
            state: RefCell::new(FormState::default()),
        }
    }

    pub fn adapter(&self) -> &TransportAdapter<T> {
        &self.adapter
    }

    pub fn set_steps(&self, steps: impl Into<String>) {
        self.state.borrow_mut().steps = steps.into();
    }

    pub fn set_roles(&self, roles: impl Into<String>) {
        self.state.borrow_mut().roles = roles.into();
    }

    pub fn set_notes(&self, notes: impl Into<String>) {
        self.state.borrow_mut().notes = notes.into();
    }

    pub fn set_document_type(&self, document_type: DocumentType) {
        self.state.borrow_mut().document_type = document_type;
    }

    pub fn phase(&self) -> FormPhase {
        self.state.borrow().phase
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().slot.is_busy()
    }

    pub fn response(&self) -> Option<DocumentResponse> {
        self.state.borrow().response.clone()
    }

    pub fn error(&self) -> Option<ClassifiedError> {
        self.state.borrow().error.clone()
    }

    pub fn feedback(&self) -> FeedbackDraft {
        self.state.borrow().feedback.clone()
    }

    pub fn feedback_submitted(&self) -> bool {
        self.state.borrow().feedback_submitted
    }

    pub async fn on_submit(&self) -> SubmitOutcome {
        let (ticket, request) = {
            let mut state = self.state.borrow_mut();
            let request = match DocumentRequest::new(
                state.steps.clone(),
                state.roles.clone(),
                Some(state.notes.clone()),
                state.document_type,
            ) {
                Ok(request) => request,
                Err(err) => return SubmitOutcome::Invalid(err),
            };
            let Some(ticket) = state.slot.begin() else {
                return SubmitOutcome::Busy;
            };

            state.phase = FormPhase::Submitting;
            state.error = None;
            state.feedback = FeedbackDraft::default();
            state.feedback_submitted = false;
            (ticket, request)
        };

        tracing::debug!(token = ticket.token(), "form submission started");
        let cancel = OnCancel::new(move || {
            if let Ok(mut state) = self.state.try_borrow_mut() {
                if state.slot.complete(ticket) {
                    state.phase = FormPhase::Idle;
                }
                tracing::debug!(
                    token = ticket.token(),
                    "form submission dropped before completion"
                );
            }
        });
        let result = self.adapter.generate_document(&request).await;
        cancel.disarm();

        let mut state = self.state.borrow_mut();
        if !state.slot.complete(ticket) {
            tracing::debug!(token = ticket.token(), "discarding stale form response");
            return SubmitOutcome::Stale;
        }

        match result {
            Ok(resp) => {
                let doc_id = resp.doc_id.clone();
                state.response = Some(resp);
                state.phase = FormPhase::Shown;
                SubmitOutcome::Shown { doc_id }
            }
            Err(err) => {
                state.phase = FormPhase::Errored;
                state.error = Some(err.clone());
                SubmitOutcome::Errored(err)
            }
        }
    }

    /// Clears the form. A response still in flight will be discarded.
    pub fn reset(&self) {
        let mut state = self.state.borrow_mut();
        state.slot.supersede();
        let slot = std::mem::take(&mut state.slot);
        *state = FormState {
            slot,
            ..FormState::default()
        };
    }

    pub fn select_rating(&self, score: u8) -> Result<(), FeedbackError> {
        let mut state = self.state.borrow_mut();
        state.ensure_rateable()?;
        state.feedback.set_rating(score)
    }

    pub fn set_feedback_text(&self, text: impl Into<String>) -> Result<(), FeedbackError> {
        let mut state = self.state.borrow_mut();
        state.ensure_rateable()?;
        state.feedback.text = text.into();
        Ok(())
    }

    pub async fn submit_feedback(&self) -> Result<(), FeedbackError> {
        let (generation, request) = {
            let mut state = self.state.borrow_mut();
            let doc_id = state.ensure_rateable()?;
            if state.feedback.pending {
                return Err(FeedbackError::Pending(doc_id));
            }
            let request = state.feedback.to_request(&doc_id)?;
            state.feedback.pending = true;
            state.feedback.error = None;
            (state.slot.generation(), request)
        };

        let cancel = OnCancel::new(move || {
            if let Ok(mut state) = self.state.try_borrow_mut() {
                if state.slot.generation() == generation {
                    state.feedback.pending = false;
                }
            }
        });
        let result = self.adapter.submit_feedback(&request).await;
        cancel.disarm();

        let mut state = self.state.borrow_mut();
        if state.slot.generation() != generation {
            tracing::debug!(doc_id = request.doc_id(), "form moved on; dropping feedback result");
            return result.map(|_| ()).map_err(FeedbackError::from);
        }

        state.feedback.pending = false;
        match result {
            Ok(_) => {
                state.feedback_submitted = true;
                tracing::debug!(doc_id = request.doc_id(), "feedback accepted");
                Ok(())
            }
            Err(err) => {
                state.feedback.error = Some(err.user_message());
                Err(err.into())
            }
        }
    }
}
