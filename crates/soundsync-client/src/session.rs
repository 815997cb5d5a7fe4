//! Session context.
//!
//! One `SessionContext` owns the authentication signal for the whole client.
//! Guards and subscribers observe it through detachable [`AuthObserver`]s,
//! and the Firestore and Storage clients draw bearer tokens from it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use soundsync_models::{TokenError, TokenSource};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::error::AuthError;

/// Tokens closer than this to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A signed-in user with their credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// True when the ID token should be refreshed before the next request.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - ChronoDuration::seconds(EXPIRY_MARGIN_SECS) <= now
    }
}

/// Authentication signal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Not yet determined (startup)
    #[default]
    Unknown,
    SignedOut,
    SignedIn(Session),
}

impl AuthState {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, AuthState::Unknown)
    }

    pub fn uid(&self) -> Option<&str> {
        match self {
            AuthState::SignedIn(session) => Some(&session.uid),
            _ => None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::SignedIn(session) => Some(session),
            _ => None,
        }
    }
}

/// Fresh credentials returned by a token refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Exchanges a refresh token for a new ID token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, AuthError>;
}

struct Inner {
    state: watch::Sender<AuthState>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    refresh_lock: Mutex<()>,
}

/// Shared owner of the authentication signal.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    /// Context in the `Unknown` state without token refresh.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Context that refreshes expiring ID tokens through `refresher`.
    pub fn with_refresher(refresher: Arc<dyn TokenRefresher>) -> Self {
        Self::build(Some(refresher))
    }

    fn build(refresher: Option<Arc<dyn TokenRefresher>>) -> Self {
        let (state, _) = watch::channel(AuthState::Unknown);
        Self {
            inner: Arc::new(Inner {
                state,
                refresher,
                refresh_lock: Mutex::new(()),
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    pub fn current_uid(&self) -> Option<String> {
        self.inner.state.borrow().uid().map(str::to_string)
    }

    pub fn current_session(&self) -> Option<Session> {
        self.inner.state.borrow().session().cloned()
    }

    pub fn set_signed_in(&self, session: Session) {
        info!(uid = %session.uid, "Signed in");
        self.inner.state.send_replace(AuthState::SignedIn(session));
    }

    pub fn set_signed_out(&self) {
        if self.inner.state.borrow().is_resolved() {
            info!("Signed out");
        }
        self.inner.state.send_replace(AuthState::SignedOut);
    }

    /// Attach a new observer.
    pub fn observe(&self) -> AuthObserver {
        AuthObserver {
            rx: self.inner.state.subscribe(),
        }
    }

    /// Number of attached observers.
    pub fn observer_count(&self) -> usize {
        self.inner.state.receiver_count()
    }

    async fn refresh_session(&self, session: &Session) -> Result<Session, TokenError> {
        let refresher = self
            .inner
            .refresher
            .as_ref()
            .ok_or_else(|| TokenError::new("ID token expired and no refresher is configured"))?;

        debug!(uid = %session.uid, "Refreshing ID token");
        let refreshed = match refresher.refresh(&session.refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(e) if e.revokes_session() => {
                warn!(uid = %session.uid, "Token refresh rejected: {:?}", e);
                self.set_signed_out();
                return Err(TokenError::new(e.to_string()));
            }
            Err(e) => {
                // Keep the session so a later call can retry the refresh
                warn!(uid = %session.uid, "Token refresh failed: {:?}", e);
                return Err(TokenError::new(e.to_string()));
            }
        };

        let updated = Session {
            id_token: refreshed.id_token,
            refresh_token: refreshed.refresh_token,
            expires_at: refreshed.expires_at,
            ..session.clone()
        };

        // Only replace the session we refreshed; a concurrent sign-out wins
        let mut applied = false;
        self.inner.state.send_if_modified(|state| match state {
            AuthState::SignedIn(current) if current.uid == updated.uid => {
                *current = updated.clone();
                applied = true;
                true
            }
            _ => false,
        });

        if applied {
            Ok(updated)
        } else {
            Err(TokenError::new("session changed during token refresh"))
        }
    }
}

#[async_trait]
impl TokenSource for SessionContext {
    async fn access_token(&self) -> Result<String, TokenError> {
        let session = self
            .current_session()
            .ok_or_else(|| TokenError::new("not signed in"))?;
        if !session.needs_refresh(Utc::now()) {
            return Ok(session.id_token);
        }

        let _guard = self.inner.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited
        let session = self
            .current_session()
            .ok_or_else(|| TokenError::new("not signed in"))?;
        if !session.needs_refresh(Utc::now()) {
            return Ok(session.id_token);
        }

        Ok(self.refresh_session(&session).await?.id_token)
    }

    async fn invalidate(&self) {
        self.inner.state.send_if_modified(|state| match state {
            AuthState::SignedIn(session) => {
                session.expires_at = Utc::now() - ChronoDuration::seconds(1);
                // Token rotation is not a state change observers care about
                false
            }
            _ => false,
        });
    }
}

/// Detachable observer of a [`SessionContext`].
pub struct AuthObserver {
    rx: watch::Receiver<AuthState>,
}

impl AuthObserver {
    pub fn current(&self) -> AuthState {
        self.rx.borrow().clone()
    }

    /// Wait for the next state change. `None` once the context is gone.
    pub async fn changed(&mut self) -> Option<AuthState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the signal leaves `Unknown`.
    pub async fn resolved(&mut self) -> Option<AuthState> {
        self.rx
            .wait_for(AuthState::is_resolved)
            .await
            .ok()
            .map(|state| state.clone())
    }

    /// Wait until a user is signed in and return their uid.
    pub async fn signed_in_uid(&mut self) -> Option<String> {
        self.rx
            .wait_for(|state| state.uid().is_some())
            .await
            .ok()
            .and_then(|state| state.uid().map(str::to_string))
    }

    /// Release the observer.
    pub fn detach(self) {}
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    pub(crate) fn session(uid: &str) -> Session {
        Session {
            uid: uid.to_string(),
            email: Some(format!("{}@example.com", uid)),
            display_name: None,
            id_token: format!("id-{}", uid),
            refresh_token: format!("refresh-{}", uid),
            expires_at: Utc::now() + ChronoDuration::hours(1),
        }
    }

    struct CountingRefresher {
        calls: AtomicU32,
        fail_with: Option<AuthError>,
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, AuthError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            Ok(RefreshedToken {
                id_token: format!("fresh-{}", n),
                refresh_token: refresh_token.to_string(),
                expires_at: Utc::now() + ChronoDuration::hours(1),
            })
        }
    }

    #[test]
    fn test_initial_state_is_unknown() {
        let ctx = SessionContext::new();
        assert_eq!(ctx.state(), AuthState::Unknown);
        assert_eq!(ctx.current_uid(), None);
    }

    #[tokio::test]
    async fn test_observers_see_transitions() {
        let ctx = SessionContext::new();
        let mut a = ctx.observe();
        let mut b = ctx.observe();

        ctx.set_signed_in(session("u1"));
        assert_eq!(a.changed().await.unwrap().uid(), Some("u1"));
        assert_eq!(b.resolved().await.unwrap().uid(), Some("u1"));

        ctx.set_signed_out();
        assert_eq!(a.changed().await, Some(AuthState::SignedOut));
    }

    #[tokio::test]
    async fn test_detach_releases_observer() {
        let ctx = SessionContext::new();
        let observer = ctx.observe();
        assert_eq!(ctx.observer_count(), 1);
        observer.detach();
        assert_eq!(ctx.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_signed_in_uid_waits() {
        let ctx = SessionContext::new();
        let mut observer = ctx.observe();
        let waiter = tokio::spawn(async move { observer.signed_in_uid().await });

        ctx.set_signed_out();
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        ctx.set_signed_in(session("u7"));
        assert_eq!(waiter.await.unwrap().as_deref(), Some("u7"));
    }

    #[tokio::test]
    async fn test_token_requires_session() {
        let ctx = SessionContext::new();
        assert!(ctx.access_token().await.is_err());
    }

    #[tokio::test]
    async fn test_valid_token_is_returned_without_refresh() {
        let refresher = Arc::new(CountingRefresher {
            calls: AtomicU32::new(0),
            fail_with: None,
        });
        let ctx = SessionContext::with_refresher(refresher.clone());
        ctx.set_signed_in(session("u1"));

        assert_eq!(ctx.access_token().await.unwrap(), "id-u1");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let refresher = Arc::new(CountingRefresher {
            calls: AtomicU32::new(0),
            fail_with: None,
        });
        let ctx = SessionContext::with_refresher(refresher.clone());
        ctx.set_signed_in(session("u1"));

        ctx.invalidate().await;
        assert_eq!(ctx.access_token().await.unwrap(), "fresh-1");
        // The refreshed token is cached
        assert_eq!(ctx.access_token().await.unwrap(), "fresh-1");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.current_session().unwrap().id_token, "fresh-1");
    }

    #[tokio::test]
    async fn test_rejected_refresh_signs_out() {
        let refresher = Arc::new(CountingRefresher {
            calls: AtomicU32::new(0),
            fail_with: Some(AuthError::from_code("TOKEN_EXPIRED")),
        });
        let ctx = SessionContext::with_refresher(refresher);
        let mut expired = session("u1");
        expired.expires_at = Utc::now() - ChronoDuration::minutes(5);
        ctx.set_signed_in(expired);

        assert!(ctx.access_token().await.is_err());
        assert_eq!(ctx.state(), AuthState::SignedOut);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_session() {
        for failure in [AuthError::Network, AuthError::from_code("HTTP_503")] {
            let refresher = Arc::new(CountingRefresher {
                calls: AtomicU32::new(0),
                fail_with: Some(failure),
            });
            let ctx = SessionContext::with_refresher(refresher.clone());
            let mut expired = session("u1");
            expired.expires_at = Utc::now() - ChronoDuration::minutes(5);
            ctx.set_signed_in(expired.clone());

            assert!(ctx.access_token().await.is_err());
            assert_eq!(ctx.state(), AuthState::SignedIn(expired));

            // The next request tries again instead of giving up
            assert!(ctx.access_token().await.is_err());
            assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
        }
    }
}
