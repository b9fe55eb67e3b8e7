use std::time::Duration;

use miette::Diagnostic;
use shared::api::{ClientError, ClientTransport};
use shared::{ApiFailure, ErrorKind, RequestError};
use thiserror::Error;

pub(crate) const GENERIC_SERVER_ERROR: &str = "Server error";

/// A failed call to the document service, after retries are exhausted.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedError {
    #[error("request timed out after {}s", .0.as_secs())]
    #[diagnostic(
        code(docgen::timeout),
        help("the document service may be overloaded; try again in a moment")
    )]
    Timeout(Duration),

    #[error("document service unreachable: {0}")]
    #[diagnostic(
        code(docgen::unreachable),
        help("check DOCGEN_BASE_URL and that the service is running")
    )]
    NetworkUnreachable(String),

    #[error("{0}")]
    #[diagnostic(code(docgen::server))]
    ServerError(String),

    #[error("unexpected failure: {0}")]
    #[diagnostic(code(docgen::unknown))]
    Unknown(String),
}

impl ClassifiedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClassifiedError::Timeout(_) => ErrorKind::Timeout,
            ClassifiedError::NetworkUnreachable(_) => ErrorKind::NetworkUnreachable,
            ClassifiedError::ServerError(_) => ErrorKind::ServerError,
            ClassifiedError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Short text suitable for an inline error panel.
    pub fn user_message(&self) -> String {
        match self {
            ClassifiedError::Timeout(_) => {
                "The document service took too long to respond. Please try again.".to_owned()
            }
            ClassifiedError::NetworkUnreachable(_) => {
                "Could not reach the document service. Please check your connection.".to_owned()
            }
            ClassifiedError::ServerError(message) => message.clone(),
            ClassifiedError::Unknown(_) => "Something went wrong. Please try again.".to_owned(),
        }
    }

    pub(crate) fn server(message: Option<String>) -> Self {
        ClassifiedError::ServerError(
            message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_SERVER_ERROR.to_owned()),
        )
    }

    pub(crate) fn from_client<T: ClientTransport>(
        err: ClientError<ApiFailure, T::Error>,
        timeout: Duration,
    ) -> Self {
        match err {
            ClientError::Api(failure) => ClassifiedError::server(failure.error),
            ClientError::Rejected(_) => ClassifiedError::server(None),
            ClientError::Deserialization(e) | ClientError::Serialization(e) => {
                ClassifiedError::Unknown(e.to_string())
            }
            ClientError::Transport(e) => match T::classify(&e) {
                ErrorKind::NetworkUnreachable => ClassifiedError::NetworkUnreachable(e.to_string()),
                ErrorKind::ServerError => ClassifiedError::server(Some(e.to_string())),
                ErrorKind::Timeout => ClassifiedError::Timeout(timeout),
                ErrorKind::Unknown => ClassifiedError::Unknown(e.to_string()),
            },
        }
    }
}

/// Why a feedback submission was refused or failed.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum FeedbackError {
    #[error("no generated document with id `{0}` in this conversation")]
    #[diagnostic(code(docgen::feedback::unknown_document))]
    UnknownDocument(String),

    #[error("feedback for `{0}` was already submitted")]
    #[diagnostic(code(docgen::feedback::already_submitted))]
    AlreadySubmitted(String),

    #[error("select a rating before submitting feedback")]
    #[diagnostic(code(docgen::feedback::missing_rating))]
    MissingRating,

    #[error("feedback for `{0}` is already being submitted")]
    #[diagnostic(code(docgen::feedback::pending))]
    Pending(String),

    #[error("there is no generated document to rate")]
    #[diagnostic(code(docgen::feedback::no_document))]
    NoDocument,

    #[error(transparent)]
    #[diagnostic(code(docgen::feedback::invalid))]
    Invalid(#[from] RequestError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Remote(#[from] ClassifiedError),
}
