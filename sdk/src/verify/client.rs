//! Verification API client implementation
//!
//! A single stateless POST per submission: no retries, no idempotency key,
//! no client-side timeout beyond the transport's own. Resubmitting the same
//! transaction ID is a possible double-send; deduplication is the backend's
//! concern.

use {
    crate::verify::{
        models::VerificationResponse, ValidationError, VerificationOutcome, VerificationRequest,
        VERIFY_API_BASE, VERIFY_ENDPOINT,
    },
    reqwest::Client,
    thiserror::Error,
};

/// Error type for verification submissions
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Verification API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse verification response: {0}")]
    Parse(String),
}

/// Client for the external payment-verification backend
pub struct VerificationClient {
    /// HTTP client for making requests
    client: Client,
    /// Base URL of the verification backend
    base_url: String,
}

impl VerificationClient {
    /// Creates a new verification client, optionally pointed at a
    /// non-default base URL (used by tests and site configuration)
    pub fn new(base_url: Option<&str>) -> Self {
        let base_url = base_url.unwrap_or(VERIFY_API_BASE).to_string();

        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Submits a validated proof of payment and maps the response to a
    /// tagged outcome. Any transport or parse failure is an `Err`; the
    /// caller maps those to one generic user-facing message.
    pub async fn submit(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, VerifyError> {
        let url = format!("{}/{}", self.base_url, VERIFY_ENDPOINT);

        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(VerifyError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: VerificationResponse =
            serde_json::from_str(&text).map_err(|e| VerifyError::Parse(e.to_string()))?;

        if parsed.success {
            Ok(VerificationOutcome::Confirmed {
                transaction: parsed.transaction.unwrap_or(serde_json::Value::Null),
            })
        } else {
            Ok(VerificationOutcome::Rejected {
                error: parsed
                    .error
                    .unwrap_or_else(|| "Verification failed".to_string()),
            })
        }
    }
}
