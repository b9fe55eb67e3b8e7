use reqwest::{Method, Url};
use serde_json::Value;
use shared::api::ClientTransport;
use shared::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("unsupported http method `{0}`")]
    Method(String),
    #[error("could not build url for `{route}`: {source}")]
    Url {
        route: String,
        source: url::ParseError,
    },
}

/// reqwest-backed transport. Every call carries the session's cookie jar.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl ClientTransport for HttpTransport {
    type Error = TransportError;

    async fn send_request(
        &self,
        method: &str,
        route: &str,
        body: Option<Value>,
    ) -> Result<Result<Value, Value>, Self::Error> {
        let method = match method.to_lowercase().as_str() {
            "get" => Method::GET,
            "post" => Method::POST,
            "put" => Method::PUT,
            "delete" => Method::DELETE,
            other => return Err(TransportError::Method(other.to_owned())),
        };
        let url = self
            .base_url
            .join(route)
            .map_err(|source| TransportError::Url {
                route: route.to_owned(),
                source,
            })?;

        tracing::debug!(%method, %url, "sending request");

        let req = self.client.request(method, url);
        let req = if let Some(body) = body {
            req.json(&body)
        } else {
            req
        };

        let resp = req.send().await?;
        let status = resp.status();

        if status.is_success() {
            Ok(Ok(resp.json().await?))
        } else {
            // Error pages are not always JSON; an empty object still decodes
            // as a failure without a message.
            let text = resp.text().await?;
            tracing::debug!(%status, "service returned an error status");
            Ok(Err(serde_json::from_str(&text)
                .unwrap_or_else(|_| Value::Object(Default::default()))))
        }
    }

    fn classify(error: &Self::Error) -> ErrorKind {
        match error {
            TransportError::Http(e) if e.is_timeout() => ErrorKind::Timeout,
            TransportError::Http(e) if e.is_connect() || e.is_request() => {
                ErrorKind::NetworkUnreachable
            }
            _ => ErrorKind::Unknown,
        }
    }
}
