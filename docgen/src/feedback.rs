use shared::{check_score, FeedbackRequest};

use crate::error::FeedbackError;

/// Editable feedback form state for one generated document.
///
/// A failed submission keeps the rating and comment so the user can retry
/// without re-entering them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackDraft {
    pub rating: Option<u8>,
    pub text: String,
    pub pending: bool,
    pub error: Option<String>,
}

impl FeedbackDraft {
    pub fn set_rating(&mut self, score: u8) -> Result<(), FeedbackError> {
        self.rating = Some(check_score(score)?);
        Ok(())
    }

    pub fn to_request(&self, doc_id: &str) -> Result<FeedbackRequest, FeedbackError> {
        let score = self.rating.ok_or(FeedbackError::MissingRating)?;
        Ok(FeedbackRequest::new(doc_id, score, Some(self.text.clone()))?)
    }
}
