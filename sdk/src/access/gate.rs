//! Shared-secret gate and the gate state machine

use serde::Serialize;

/// Per-request resolution of a gate: `Loading -> {Granted | Denied}` with
/// no way back to `Loading` short of a fresh page load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// The access decision has not been made yet; render a spinner.
    #[default]
    Loading,
    /// Render the wrapped content.
    Granted,
    /// Render the upsell prompt instead.
    Denied,
}

impl GateState {
    /// Resolves a pending gate once the access decision is known.
    pub fn resolve(granted: bool) -> Self {
        if granted {
            Self::Granted
        } else {
            Self::Denied
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Compares a visitor-entered string against a statically configured
/// passphrase. Plain equality on trimmed input: no hashing, no rate
/// limiting, no lockout. Suitable only for staging low-stakes content.
#[derive(Debug, Clone)]
pub struct SecretGate {
    passphrase: String,
}

impl SecretGate {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }

    /// True when the attempt matches. An empty configured passphrase never
    /// unlocks, so a missing config value cannot leave the gate open.
    pub fn unlock(&self, attempt: &str) -> bool {
        !self.passphrase.is_empty() && attempt.trim() == self.passphrase
    }
}
