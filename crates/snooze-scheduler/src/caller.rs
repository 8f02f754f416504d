use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::types::HttpMethod;

/// Outcome of a call that reached the target and came back 2xx.
#[derive(Debug, Clone)]
pub struct CallSuccess {
    pub status: u16,
    pub body: String,
}

/// Any way a single call attempt can fail. There is no retry: one of these
/// becomes the job's terminal failure record.
#[derive(Debug, Error)]
pub enum CallError {
    /// Only http and https targets are callable.
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid target URL: {0}")]
    InvalidUrl(String),

    /// The target answered outside [200, 300).
    #[error("Request failed with status {status}: {body}")]
    BadStatus { status: u16, body: String },

    /// Connection, timeout or other transport-level fault.
    #[error("request error: {0}")]
    Transport(String),
}

/// Executes exactly one outbound request per job and classifies the outcome.
pub struct HttpCaller {
    client: reqwest::Client,
}

impl HttpCaller {
    /// `timeout` bounds the whole request so a hung target cannot pin a
    /// dispatcher slot.
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    /// Send `method` to `target_url` with no body and no custom headers,
    /// collecting the full response body as text.
    pub async fn call(&self, target_url: &str, method: HttpMethod) -> Result<CallSuccess, CallError> {
        let url = url::Url::parse(target_url).map_err(|e| CallError::InvalidUrl(e.to_string()))?;
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(CallError::UnsupportedScheme(scheme.to_string()));
        }

        debug!(%method, url = %url, "performing scheduled call");

        let resp = self
            .client
            .request(method.to_reqwest(), url)
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        if status.is_success() {
            Ok(CallSuccess {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(CallError::BadStatus {
                status: status.as_u16(),
                body,
            })
        }
    }
}
