use async_trait::async_trait;
use pv_api_types::ProviderCapabilities;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum WabError {
    #[error("info request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("info request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("malformed info response from {url}: {detail}")]
    Malformed { url: String, detail: String },
}

#[async_trait]
pub trait WabClient: Send + Sync {
    /// Fetch the capability descriptor from `GET {wab_url}/info`.
    ///
    /// No retry at this layer. A non-2xx status or transport failure is a
    /// hard error; retries, if any, belong to the transport collaborator.
    async fn fetch_info(&self, wab_url: &str) -> Result<ProviderCapabilities, WabError>;
}

/// HTTP client for a Wallet Authentication Backend.
#[derive(Default, Clone)]
pub struct HttpWabClient {
    http: reqwest::Client,
}

impl HttpWabClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl WabClient for HttpWabClient {
    async fn fetch_info(&self, wab_url: &str) -> Result<ProviderCapabilities, WabError> {
        let url = format!("{}/info", wab_url.trim_end_matches('/'));

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| WabError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%url, %status, %body, "wab info request rejected");
            return Err(WabError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| WabError::Transport {
            url: url.clone(),
            source,
        })?;

        serde_json::from_str(&body).map_err(|err| WabError::Malformed {
            url,
            detail: format!("{err} — raw: {body}"),
        })
    }
}
