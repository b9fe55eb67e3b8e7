//! Client core for the SOP / Batch Record document service.
//!
//! [`TransportAdapter`] performs the HTTP calls. [`ConversationController`]
//! and [`FormController`] own the UI-facing state built on top of it.

pub use shared::api::{ClientTransport, ROUTES};
pub use shared::{
    DocumentRequest, DocumentResponse, DocumentType, ErrorKind, FeedbackRequest,
    FeedbackResponse, ModelStats, RequestError,
};

pub use crate::adapter::{RequestKind, TransportAdapter};
pub use crate::config::Config;
pub use crate::conversation::{ConversationController, KeyOutcome, KeyPress, SendOutcome};
pub use crate::error::{ClassifiedError, FeedbackError};
pub use crate::feedback::FeedbackDraft;
pub use crate::form::{FormController, FormPhase, SubmitOutcome};
pub use crate::slot::{Slot, Ticket};
pub use crate::store::{ConversationStore, ConversationTurn, DocumentLink, Role};
pub use crate::transport::{HttpTransport, TransportError};

pub mod adapter;
pub mod config;
pub mod conversation;
pub mod error;
pub mod feedback;
pub mod form;
pub mod slot;
pub mod store;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
