//! Access-check API client implementation

use {
    crate::access::{ACCESS_API_BASE, ACCESS_ENDPOINT},
    reqwest::Client,
    serde::Deserialize,
    thiserror::Error,
};

/// Error type for access checks. Only surfaced to callers of the fallible
/// [`AccessClient::fetch`]; [`AccessClient::check`] folds every variant
/// into a denial.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Access API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse access response: {0}")]
    Parse(String),
}

/// Wire shape of the access-check response: `{ "hasAccess": bool }`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessCheckResponse {
    has_access: bool,
}

/// Client for the backend's access-check endpoint
pub struct AccessClient {
    /// HTTP client for making requests
    client: Client,
    /// Base URL of the backend
    base_url: String,
}

impl AccessClient {
    /// Creates a new access client, optionally pointed at a non-default
    /// base URL (used by tests and site configuration)
    pub fn new(base_url: Option<&str>) -> Self {
        let base_url = base_url.unwrap_or(ACCESS_API_BASE).to_string();

        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Asks the backend whether the holder of `credential` may see premium
    /// content. The credential is whatever the calling environment carries
    /// for the visitor; this client only forwards it.
    pub async fn fetch(&self, credential: Option<&str>) -> Result<bool, AccessError> {
        let url = format!("{}/{}", self.base_url, ACCESS_ENDPOINT);

        let mut request = self.client.get(&url);
        if let Some(credential) = credential {
            request = request.bearer_auth(credential);
        }

        let response = request.send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(AccessError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: AccessCheckResponse =
            serde_json::from_str(&text).map_err(|e| AccessError::Parse(e.to_string()))?;

        Ok(parsed.has_access)
    }

    /// Fail-closed form of [`AccessClient::fetch`]: any error denies access
    /// and is only logged. Favors protecting paid content over availability.
    pub async fn check(&self, credential: Option<&str>) -> bool {
        match self.fetch(credential).await {
            Ok(has_access) => has_access,
            Err(e) => {
                log::warn!("Access check failed, denying: {}", e);
                false
            }
        }
    }
}
