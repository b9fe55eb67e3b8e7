use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::Url;
use shared::api::{Api, ClientError, ClientTransport};
use shared::{
    ApiFailure, DocumentRequest, DocumentResponse, FeedbackRequest, FeedbackResponse, ModelStats,
    StatsResponse, WordDocument,
};

use crate::config::Config;
use crate::error::ClassifiedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    GenerateDocument,
    Feedback,
    Stats,
    Train,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::GenerateDocument => "generate_document",
            RequestKind::Feedback => "feedback",
            RequestKind::Stats => "stats",
            RequestKind::Train => "train",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded body that can still report failure in-band.
trait ServiceReply {
    fn rejection(&self) -> Option<ClassifiedError>;
}

impl ServiceReply for DocumentResponse {
    fn rejection(&self) -> Option<ClassifiedError> {
        if !self.success {
            Some(ClassifiedError::server(self.error.clone()))
        } else if self.doc_id.is_empty() {
            Some(ClassifiedError::Unknown(
                "response is missing doc_id".to_owned(),
            ))
        } else {
            None
        }
    }
}

impl ServiceReply for FeedbackResponse {
    fn rejection(&self) -> Option<ClassifiedError> {
        (!self.success).then(|| ClassifiedError::server(self.error.clone()))
    }
}

impl ServiceReply for StatsResponse {
    fn rejection(&self) -> Option<ClassifiedError> {
        if !self.success {
            Some(ClassifiedError::server(self.error.clone()))
        } else if self.stats.is_none() {
            Some(ClassifiedError::Unknown("response is missing stats".to_owned()))
        } else {
            None
        }
    }
}

/// Wraps a [`ClientTransport`] with a per-attempt timeout, a bounded retry
/// and error classification.
///
/// The adapter holds no mutable state, so any number of calls may be in
/// flight through the same instance.
#[derive(Debug, Clone)]
pub struct TransportAdapter<T> {
    transport: T,
    base_url: Url,
    timeout: Duration,
    retries: u32,
    retry_backoff: Duration,
}

impl<T: ClientTransport> TransportAdapter<T> {
    pub fn new(transport: T, config: &Config) -> Self {
        Self {
            transport,
            base_url: config.base_url.clone(),
            timeout: config.timeout,
            retries: config.retries,
            retry_backoff: config.retry_backoff,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn generate_document(
        &self,
        request: &DocumentRequest,
    ) -> Result<DocumentResponse, ClassifiedError> {
        self.send(RequestKind::GenerateDocument, || {
            self.transport.generate_document(request)
        })
        .await
    }

    pub async fn submit_feedback(
        &self,
        request: &FeedbackRequest,
    ) -> Result<FeedbackResponse, ClassifiedError> {
        self.send(RequestKind::Feedback, || {
            self.transport.submit_feedback(request)
        })
        .await
    }

    pub async fn model_stats(&self) -> Result<ModelStats, ClassifiedError> {
        let resp = self
            .send(RequestKind::Stats, || self.transport.model_stats())
            .await?;
        Ok(resp.stats.unwrap_or_default())
    }

    pub async fn train_model(&self) -> Result<FeedbackResponse, ClassifiedError> {
        self.send(RequestKind::Train, || self.transport.train_model())
            .await
    }

    /// Absolute download link for a generated Word document.
    pub fn download_url(&self, document: &WordDocument) -> String {
        self.base_url
            .join(&document.download_url)
            .map(String::from)
            .unwrap_or_else(|_| document.download_url.clone())
    }

    async fn send<R, F, Fut>(&self, kind: RequestKind, call: F) -> Result<R, ClassifiedError>
    where
        R: ServiceReply,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<R, ClientError<ApiFailure, T::Error>>>,
    {
        let attempts = self.retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Err(_) => Err(ClassifiedError::Timeout(self.timeout)),
                Ok(Err(err)) => Err(ClassifiedError::from_client::<T>(err, self.timeout)),
                Ok(Ok(reply)) => match reply.rejection() {
                    Some(err) => Err(err),
                    None => Ok(reply),
                },
            };

            match outcome {
                Ok(reply) => {
                    if attempt > 1 {
                        tracing::info!(%kind, attempt, "request recovered after retry");
                    }
                    return Ok(reply);
                }
                Err(err) if attempt < attempts => {
                    tracing::warn!(
                        %kind,
                        attempt,
                        max_attempts = attempts,
                        error = %err,
                        "request failed, retrying"
                    );
                    if !self.retry_backoff.is_zero() {
                        tokio::time::sleep(self.retry_backoff).await;
                    }
                }
                Err(err) => {
                    tracing::warn!(%kind, attempt, error = %err, "request failed");
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shared::{DocumentType, ErrorKind};

    use super::*;
    use crate::test_support::{Reply, ScriptedTransport};

    const GENERATE: &str = "/api/generate_document";
    const FEEDBACK: &str = "/api/feedback";

    fn adapter(transport: ScriptedTransport) -> TransportAdapter<ScriptedTransport> {
        TransportAdapter::new(transport, &Config::default())
    }

    fn request() -> DocumentRequest {
        DocumentRequest::new("Mix reagent A and B", "Lab tech", None, DocumentType::Sop).unwrap()
    }

    fn generated(doc_id: &str) -> Reply {
        Reply::Ok(json!({
            "success": true,
            "content": "1. Mix...",
            "type": "sop",
            "doc_id": doc_id
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn one_failure_then_success_is_success() {
        let transport = ScriptedTransport::default()
            .reply(GENERATE, Reply::Unreachable)
            .reply(GENERATE, generated("abc123"))
            .reply(GENERATE, generated("never"));
        let adapter = adapter(transport);

        let resp = adapter.generate_document(&request()).await.unwrap();

        assert_eq!(resp.doc_id, "abc123");
        assert_eq!(adapter.transport().calls(GENERATE), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_exactly_once() {
        let transport = ScriptedTransport::default()
            .reply(GENERATE, Reply::Unreachable)
            .reply(GENERATE, Reply::Unreachable)
            .reply(GENERATE, generated("never"));
        let adapter = adapter(transport);

        let err = adapter.generate_document(&request()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NetworkUnreachable);
        assert_eq!(adapter.transport().calls(GENERATE), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_surface_timeout() {
        let transport = ScriptedTransport::default()
            .reply(GENERATE, Reply::Hang)
            .reply(GENERATE, Reply::Hang);
        let adapter = adapter(transport);

        let started = tokio::time::Instant::now();
        let err = adapter.generate_document(&request()).await.unwrap_err();

        assert_eq!(err, ClassifiedError::Timeout(Duration::from_secs(60)));
        assert!(started.elapsed() >= Duration::from_secs(120));
        assert_eq!(adapter.transport().calls(GENERATE), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn error_status_uses_body_message() {
        let transport = ScriptedTransport::default()
            .reply(FEEDBACK, Reply::Status(json!({ "success": false, "error": "Missing required fields" })))
            .reply(FEEDBACK, Reply::Status(json!({ "success": false, "error": "Missing required fields" })));
        let adapter = adapter(transport);
        let req = FeedbackRequest::new("abc123", 5, None).unwrap();

        let err = adapter.submit_feedback(&req).await.unwrap_err();

        assert_eq!(
            err,
            ClassifiedError::ServerError("Missing required fields".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn in_band_failure_is_a_server_error() {
        let transport = ScriptedTransport::default()
            .reply(FEEDBACK, Reply::Ok(json!({ "success": false })))
            .reply(FEEDBACK, Reply::Ok(json!({ "success": false })));
        let adapter = adapter(transport);
        let req = FeedbackRequest::new("abc123", 5, None).unwrap();

        let err = adapter.submit_feedback(&req).await.unwrap_err();

        assert_eq!(err, ClassifiedError::ServerError("Server error".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_doc_id_is_malformed() {
        let body = json!({ "success": true, "content": "1. Mix..." });
        let transport = ScriptedTransport::default()
            .reply(GENERATE, Reply::Ok(body.clone()))
            .reply(GENERATE, Reply::Ok(body));
        let adapter = adapter(transport);

        let err = adapter.generate_document(&request()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_calls_run_concurrently() {
        let transport = ScriptedTransport::default()
            .reply(
                GENERATE,
                Reply::Delayed(Duration::from_secs(30), Box::new(generated("abc123"))),
            )
            .reply(FEEDBACK, Reply::Ok(json!({ "success": true })));
        let adapter = adapter(transport);
        let feedback = FeedbackRequest::new("older", 4, None).unwrap();

        let started = tokio::time::Instant::now();
        let req = request();
        let (generated, acknowledged) = tokio::join!(
            adapter.generate_document(&req),
            adapter.submit_feedback(&feedback)
        );

        assert!(generated.is_ok());
        assert!(acknowledged.is_ok());
        assert!(started.elapsed() < Duration::from_secs(31));
    }

    #[test]
    fn download_links_resolve_against_base_url() {
        let adapter = adapter(ScriptedTransport::default());
        let doc = WordDocument {
            available: true,
            filename: "sop.docx".into(),
            download_url: "/api/download/sop.docx".into(),
        };

        assert_eq!(
            adapter.download_url(&doc),
            "http://localhost:5000/api/download/sop.docx"
        );
    }
}
