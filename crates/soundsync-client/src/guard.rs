//! Route table and session guard.

use std::fmt;

use crate::session::{AuthObserver, AuthState, Session, SessionContext};

/// Application routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Auth,
    Upload,
    Generate,
    Dashboard,
}

impl Route {
    pub const ALL: [Route; 5] = [Route::Home, Route::Auth, Route::Upload, Route::Generate, Route::Dashboard];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Auth => "/auth",
            Route::Upload => "/upload",
            Route::Generate => "/generate",
            Route::Dashboard => "/dashboard",
        }
    }

    /// Whether the route requires a session.
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Upload | Route::Generate | Route::Dashboard)
    }

    /// Resolve a path; unknown paths fall back to home.
    pub fn resolve(path: &str) -> Route {
        let trimmed = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = if trimmed.len() > 1 {
            trimmed.trim_end_matches('/')
        } else {
            trimmed
        };
        Route::ALL
            .into_iter()
            .find(|r| r.path() == trimmed)
            .unwrap_or(Route::Home)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Where unauthenticated sessions are sent.
pub const SIGN_IN_ROUTE: Route = Route::Auth;

/// What a guarded view should do right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Auth signal not resolved; render nothing
    Pending,
    /// Render the protected view
    Render(Session),
    /// Navigate away
    Redirect(Route),
}

impl GuardDecision {
    pub fn from_state(state: &AuthState) -> Self {
        match state {
            AuthState::Unknown => GuardDecision::Pending,
            AuthState::SignedIn(session) => GuardDecision::Render(session.clone()),
            AuthState::SignedOut => GuardDecision::Redirect(SIGN_IN_ROUTE),
        }
    }
}

/// Gate in front of a protected view.
pub struct SessionGuard {
    observer: AuthObserver,
}

impl SessionGuard {
    /// Mount a guard on the session context.
    pub fn mount(ctx: &SessionContext) -> Self {
        Self {
            observer: ctx.observe(),
        }
    }

    /// Decision for the current auth state.
    pub fn decision(&self) -> GuardDecision {
        GuardDecision::from_state(&self.observer.current())
    }

    /// Wait for the signal to resolve and return the decision.
    ///
    /// `Redirect` if the context is torn down while still unknown.
    pub async fn resolve(&mut self) -> GuardDecision {
        match self.observer.resolved().await {
            Some(state) => GuardDecision::from_state(&state),
            None => GuardDecision::Redirect(SIGN_IN_ROUTE),
        }
    }

    /// Wait for the next auth change and return the new decision.
    pub async fn next_decision(&mut self) -> Option<GuardDecision> {
        self.observer.changed().await.map(|s| GuardDecision::from_state(&s))
    }

    /// Release the subscription to the auth signal.
    pub fn detach(self) {
        self.observer.detach();
    }
}
