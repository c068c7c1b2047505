//! Data models for the verification endpoint

use {
    serde::{Deserialize, Serialize},
    thiserror::Error,
};

/// A required submission field was empty after trimming. Caught locally;
/// no network call is made for an invalid submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A transaction ID is required")]
    MissingTransactionId,

    #[error("An email address is required")]
    MissingEmail,
}

/// Proof of payment as submitted by the buyer. Can only be constructed
/// through [`VerificationRequest::new`], which trims and validates both
/// fields, so holding a value of this type means it is safe to send.
///
/// Serialized with the backend's camelCase field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    transaction_id: String,
    email: String,
}

impl VerificationRequest {
    /// Trims both fields and rejects empty ones.
    pub fn new(transaction_id: &str, email: &str) -> Result<Self, ValidationError> {
        let transaction_id = transaction_id.trim();
        if transaction_id.is_empty() {
            return Err(ValidationError::MissingTransactionId);
        }

        let email = email.trim();
        if email.is_empty() {
            return Err(ValidationError::MissingEmail);
        }

        Ok(Self {
            transaction_id: transaction_id.to_string(),
            email: email.to_string(),
        })
    }

    /// The submitted transaction ID, exactly as the buyer entered it
    /// (modulo surrounding whitespace).
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// The buyer's email address.
    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Wire shape of the verification endpoint response:
/// `{ success: bool, transaction?: object, error?: string }`
#[derive(Debug, Deserialize)]
pub(crate) struct VerificationResponse {
    pub(crate) success: bool,
    #[serde(default)]
    pub(crate) transaction: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

/// Tagged outcome of a verification submission, as decided by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// The backend confirmed the payment. The transaction record is opaque
    /// to us and passed through for display only.
    Confirmed { transaction: serde_json::Value },
    /// The backend rejected the submission; `error` is shown to the buyer
    /// verbatim.
    Rejected { error: String },
}
