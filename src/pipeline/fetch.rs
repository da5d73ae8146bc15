//! Profile fetch: one GET of the profile page, body returned as text.
//!
//! The status code is recorded but not inspected. GitHub serves an HTML body
//! for 404s as well, and the rewrite stage is the one that decides whether a
//! graph is present. No retries are attempted; the first transport error is
//! returned to the caller.

use crate::config::GraphConfig;
use crate::error::GraphError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// GitHub caps usernames at 39 characters.
const MAX_IDENTIFIER_LEN: usize = 39;

/// A fetched profile page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// The network capability used by the pipeline.
///
/// [`HttpFetcher`] is the production implementation; tests inject canned
/// pages instead.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage, GraphError>> + Send;
}

/// Check that `identifier` is a plausible profile handle before it is spliced
/// into a URL: non-empty, ASCII alphanumerics and `-` only.
pub fn validate_identifier(identifier: &str) -> Result<(), GraphError> {
    let invalid = |reason: &str| GraphError::InvalidIdentifier {
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    };

    if identifier.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if identifier.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid("longer than 39 characters"));
    }
    if !identifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(invalid("only ASCII letters, digits and '-' are allowed"));
    }
    Ok(())
}

/// reqwest-backed [`Fetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: Option<u64>,
}

impl HttpFetcher {
    pub fn new(config: &GraphConfig) -> Result<Self, GraphError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(secs) = config.fetch_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| GraphError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: config.fetch_timeout_secs,
        })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, GraphError> {
        info!("Fetching profile page: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            let reason = match self.timeout_secs {
                Some(secs) if e.is_timeout() => format!("timed out after {secs}s"),
                _ => e.to_string(),
            };
            GraphError::Network {
                url: url.to_string(),
                reason,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Profile page returned HTTP {}; continuing with body", status);
        }

        let body = response
            .text()
            .await
            .map_err(|e| GraphError::read(format!("response body from '{url}'"), e))?;

        debug!("Fetched {} bytes (HTTP {})", body.len(), status.as_u16());

        Ok(FetchedPage {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}
