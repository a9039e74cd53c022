use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::warn;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("unexpected status {status} from {url}")]
    Status { status: StatusCode, url: String },
}

impl FetchError {
    fn retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            FetchError::Http { source, .. } => source.is_timeout() || source.is_connect(),
            FetchError::Client(_) => false,
        }
    }
}

/// HTTP collaborator shared by every source: browser User-Agent, 10s
/// timeout, optional per-source Referer.
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.request(url, None).await
    }

    pub async fn get_text_with_referer(
        &self,
        url: &str,
        referer: &str,
    ) -> Result<String, FetchError> {
        self.request(url, Some(referer)).await
    }

    /// Like [`get_text`](Self::get_text) but retries rate limits, server
    /// errors and timeouts with exponential backoff.
    pub async fn get_text_retry(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.request(url, None).await {
                Ok(body) => return Ok(body),
                Err(e) if e.retryable() && attempt < MAX_RETRIES => {
                    let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                    warn!(
                        "{} (attempt {}/{}), backing off {:.1}s",
                        e,
                        attempt + 1,
                        MAX_RETRIES,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request(&self, url: &str, referer: Option<&str>) -> Result<String, FetchError> {
        let mut req = self.client.get(url);
        if let Some(referer) = referer {
            req = req.header(reqwest::header::REFERER, referer);
        }
        let resp = req.send().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: e,
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }

        resp.text().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: e,
        })
    }
}
