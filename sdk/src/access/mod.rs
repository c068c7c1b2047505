//! Content gating for premium chapters.
//!
//! Two gates exist side by side:
//! - A token-based check against the backend, performed per page load and
//!   failing closed on any error
//! - A static shared-secret gate, granted for the rest of the session on a
//!   successful match
//!
//! Neither is a hard security boundary; the content being staged is worth
//! exactly the price of the book.

mod client;
mod gate;

/// Default backend base URL for local development. Production deployments
/// override this via site configuration.
pub const ACCESS_API_BASE: &str = "http://127.0.0.1:9090";

/// Path of the access-check endpoint on the backend.
pub const ACCESS_ENDPOINT: &str = "api/access";

// Re-exports
pub use {client::*, gate::*};
