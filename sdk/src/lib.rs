//! This library contains the network-facing logic of the Webbook storefront
//! that is shared between the site and any embedding client: the spot-price
//! oracle, the purchase-verification flow and the content gates. The site
//! crate renders pages on top of these; everything talking to the outside
//! world lives here.

/// Spot-price oracle. Fetches the payment asset's USD price from a public
/// simple-price API and keeps a shared, periodically refreshed quote that
/// fails open to the last known value.
pub mod price;

/// Purchase verification. Validates proof-of-payment submissions, forwards
/// them to the external verification backend and drives the purchase flow
/// state machine.
pub mod verify;

/// Content gating. Token-based access checks against the backend (fail
/// closed) and the static shared-secret gate.
pub mod access;
