//! In-memory per-visitor sessions.
//!
//! A `sid` cookie maps to everything the site remembers about one visitor:
//! their purchase flow and their gate grant. Sessions are created lazily on
//! first use and live for the process lifetime at most; there is no durable
//! store behind them.

use {
    rand::{distributions::Alphanumeric, rngs::OsRng, Rng},
    std::{collections::HashMap, sync::Arc},
    tokio::sync::RwLock,
    webbook_sdk::{access::GateState, verify::PurchaseFlow},
};

/// Name of the session cookie.
pub(crate) const SESSION_COOKIE: &str = "sid";

/// Name of the cookie carrying the externally-managed access credential.
/// The site only forwards it to the access-check backend.
pub(crate) const ACCESS_COOKIE: &str = "access_token";

const SESSION_ID_LEN: usize = 32;

/// One visitor's state.
#[derive(Debug, Clone, Default)]
pub(crate) struct Session {
    pub(crate) flow: PurchaseFlow,
    pub(crate) gate: GateState,
}

/// Cookie-keyed session store. The handler servicing a request is the only
/// writer for the session it touches; the map itself sits behind one lock.
#[derive(Clone, Default)]
pub(crate) struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the session id to use for this request, minting a fresh
    /// session when the cookie is absent or references an unknown id
    /// (e.g. after a restart).
    pub(crate) async fn ensure(&self, sid: Option<String>) -> String {
        if let Some(sid) = sid {
            if self.inner.read().await.contains_key(&sid) {
                return sid;
            }
        }

        let sid = new_session_id();
        self.inner
            .write()
            .await
            .insert(sid.clone(), Session::default());

        sid
    }

    /// Runs `f` with exclusive access to the session behind `sid`.
    pub(crate) async fn with<F, T>(&self, sid: &str, f: F) -> T
    where
        F: FnOnce(&mut Session) -> T,
    {
        let mut sessions = self.inner.write().await;
        let session = sessions.entry(sid.to_string()).or_default();

        f(session)
    }

    /// Runs `f` against an existing session, if any. Unknown ids are
    /// ignored rather than minted; callers that need a session use
    /// [`SessionStore::ensure`] first.
    pub(crate) async fn with_existing<F>(&self, sid: &str, f: F)
    where
        F: FnOnce(&mut Session),
    {
        if let Some(session) = self.inner.write().await.get_mut(sid) {
            f(session);
        }
    }
}

fn new_session_id() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        webbook_sdk::{price::PriceQuote, verify::FlowState},
    };

    #[tokio::test]
    async fn test_ensure_mints_and_reuses_ids() {
        let store = SessionStore::new();

        let first = store.ensure(None).await;
        assert_eq!(first.len(), SESSION_ID_LEN);

        // A known id is kept as-is.
        let again = store.ensure(Some(first.clone())).await;
        assert_eq!(again, first);

        // An unknown id is replaced rather than trusted.
        let replaced = store.ensure(Some("stale-or-forged".to_string())).await;
        assert_ne!(replaced, "stale-or-forged");
    }

    #[tokio::test]
    async fn test_mutations_stick_to_the_session() {
        let store = SessionStore::new();
        let sid = store.ensure(None).await;

        store
            .with(&sid, |session| {
                session
                    .flow
                    .begin("buyer@example.com", 15.00, &PriceQuote::fallback("ergo"))
                    .expect("Expected the flow to advance");
                session.gate = GateState::Granted;
            })
            .await;

        let (state, gate) = store
            .with(&sid, |session| (session.flow.state(), session.gate))
            .await;

        assert_eq!(state, FlowState::Awaiting);
        assert!(gate.is_granted());
    }

    #[tokio::test]
    async fn test_with_existing_ignores_unknown_ids() {
        let store = SessionStore::new();

        // No session is minted as a side effect.
        store
            .with_existing("nobody-home", |session| {
                session.gate = GateState::Granted;
            })
            .await;

        let replaced = store.ensure(Some("nobody-home".to_string())).await;
        assert_ne!(replaced, "nobody-home");
    }
}
