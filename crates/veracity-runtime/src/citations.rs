//! Citation validation over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use veracity_core::heuristics::citations::{
    build_report, extract_attributions, extract_urls, is_well_formed_url,
};
use veracity_core::CitationReport;

use crate::collaborators::{CitationValidator, CollaboratorError};

/// Default per-URL request timeout.
pub const DEFAULT_URL_TIMEOUT: Duration = Duration::from_secs(5);

/// Validates cited URLs by fetching them.
///
/// A URL is valid when it is well formed and a GET (following redirects)
/// answers 200. Malformed URLs are rejected without a request. Textual
/// attributions are counted as valid, as in the offline check. URLs are
/// fetched concurrently.
#[derive(Debug, Clone)]
pub struct HttpCitationValidator {
    client: reqwest::Client,
}

impl HttpCitationValidator {
    pub fn new() -> Result<Self, CollaboratorError> {
        Self::with_timeout(DEFAULT_URL_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| CollaboratorError::Failed(format!("http client: {}", e)))?;
        Ok(Self { client })
    }

    /// Use a preconfigured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn check_url(&self, url: String) -> (String, bool) {
        if !is_well_formed_url(&url) {
            return (url, false);
        }
        let ok = match self.client.get(url.as_str()).send().await {
            Ok(response) => {
                let status = response.status();
                if status != reqwest::StatusCode::OK {
                    tracing::debug!(url = %url, status = status.as_u16(), "Citation not reachable");
                }
                status == reqwest::StatusCode::OK
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Citation request failed");
                false
            }
        };
        (url, ok)
    }
}

#[async_trait]
impl CitationValidator for HttpCitationValidator {
    async fn validate(&self, response: &str) -> Result<CitationReport, CollaboratorError> {
        let urls = extract_urls(response);
        let checks = join_all(urls.into_iter().map(|url| self.check_url(url))).await;
        Ok(build_report(checks, extract_attributions(response)))
    }
}
