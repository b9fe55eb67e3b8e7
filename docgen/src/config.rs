use std::time::Duration;

use miette::{Context, IntoDiagnostic, Result};
use reqwest::Url;

use crate::adapter::TransportAdapter;
use crate::transport::HttpTransport;
use crate::APP_USER_AGENT;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_RETRIES: u32 = 1;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Origin every route is resolved against.
    pub base_url: Url,
    /// Upper bound for a single attempt.
    pub timeout: Duration,
    /// Automatic retries after the first attempt.
    pub retries: u32,
    pub retry_backoff: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(base_url) = lookup("DOCGEN_BASE_URL") {
            config = config.with_base_url(&base_url)?;
        }
        if let Some(ms) = lookup("DOCGEN_RETRY_BACKOFF_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .into_diagnostic()
                .wrap_err("DOCGEN_RETRY_BACKOFF_MS must be a whole number of milliseconds")?;
            config.retry_backoff = Duration::from_millis(ms);
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = Url::parse(base_url)
            .into_diagnostic()
            .wrap_err_with(|| format!("Invalid base url `{base_url}`"))?;
        Ok(self)
    }

    pub fn client(&self) -> Result<HttpTransport> {
        let client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .cookie_store(true)
            .build()
            .into_diagnostic()
            .wrap_err("Could not build reqwest client")?;

        Ok(HttpTransport::new(client, self.base_url.clone()))
    }

    pub fn adapter(&self) -> Result<TransportAdapter<HttpTransport>> {
        Ok(TransportAdapter::new(self.client()?, self))
    }
}
