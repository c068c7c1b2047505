//! Purchase verification against the external backend.
//!
//! This module allows for:
//! - Validating a buyer's proof of payment before any network call is made
//! - Submitting the proof to the verification endpoint
//! - Driving the purchase flow state machine from first click to confirmation
//!
//! The actual transaction check happens entirely in the backend; the client
//! never inspects the chain itself.

mod client;
mod flow;
mod models;

/// Default backend base URL for local development. Production deployments
/// override this via site configuration.
pub const VERIFY_API_BASE: &str = "http://127.0.0.1:9090";

/// Path of the verification endpoint on the backend.
pub const VERIFY_ENDPOINT: &str = "api/verify";

/// What the buyer sees when the backend cannot be reached or answers with
/// something unparseable. Business rejections surface the backend's own
/// message instead.
pub const TRANSPORT_FAILURE_MESSAGE: &str =
    "Could not reach the verification service. Please try again in a moment.";

// Re-exports
pub use {client::*, flow::*, models::*};
