use std::fmt::Debug;

use serde::Deserialize;
use thiserror::Error;

use super::*;

#[macros::rpc]
pub trait Api {
    type ErrorWrapper<T: for<'a> Deserialize<'a> + Debug>;

    #[rpc(route = "/api/generate_document", method = "post")]
    async fn generate_document(
        &self,
        body: &DocumentRequest,
    ) -> Result<DocumentResponse, Self::ErrorWrapper<ApiFailure>>;

    #[rpc(route = "/api/feedback", method = "post")]
    async fn submit_feedback(
        &self,
        body: &FeedbackRequest,
    ) -> Result<FeedbackResponse, Self::ErrorWrapper<ApiFailure>>;

    #[rpc(route = "/api/stats", method = "get")]
    async fn model_stats(&self) -> Result<StatsResponse, Self::ErrorWrapper<ApiFailure>>;

    #[rpc(route = "/api/train", method = "post")]
    async fn train_model(&self) -> Result<FeedbackResponse, Self::ErrorWrapper<ApiFailure>>;
}

/// One entry of the generated [`ROUTES`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    pub method: &'static str,
    pub path: &'static str,
}

/// Moves JSON to and from the remote service.
///
/// The outer `Result` is a transport failure (nothing usable came back); the
/// inner one separates 2xx bodies from error bodies.
pub trait ClientTransport {
    type Error: std::error::Error + 'static;

    async fn send_request(
        &self,
        method: &str,
        route: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Result<serde_json::Value, serde_json::Value>, Self::Error>;

    /// Maps a transport failure onto the shared taxonomy.
    fn classify(error: &Self::Error) -> ErrorKind;
}

#[derive(Error, Debug)]
pub enum ClientError<ApiError, TransportError>
where
    ApiError: std::fmt::Debug,
    TransportError: std::fmt::Debug + std::error::Error,
{
    #[error(transparent)]
    Transport(TransportError),
    #[error("malformed response: {0}")]
    Deserialization(serde_json::Error),
    #[error("could not encode request: {0}")]
    Serialization(serde_json::Error),
    #[error("api error: {0:?}")]
    Api(ApiError),
    /// An error status whose body did not have the expected shape.
    #[error("error response with unrecognised body: {0}")]
    Rejected(serde_json::Value),
}
