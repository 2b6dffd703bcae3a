//! Route guard for protected views.

use std::future::Future;

use super::{InitPhase, SessionManager, SessionState};
use crate::api::types::User;

/// Decision for a protected view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Startup verification has not settled; show a loading indicator.
    Loading,
    /// Authenticated; render the view for this user.
    Allow(User),
    /// Not authenticated; go to this path instead.
    Redirect(String),
}

fn decide(state: &SessionState, login_path: &str) -> Gate {
    if state.phase != InitPhase::Settled {
        return Gate::Loading;
    }
    match &state.user {
        Some(user) => Gate::Allow(user.clone()),
        None => Gate::Redirect(login_path.to_string()),
    }
}

/// Wraps protected views around a [`SessionManager`].
pub struct RouteGuard<'a> {
    session: &'a SessionManager,
}

impl<'a> RouteGuard<'a> {
    pub fn new(session: &'a SessionManager) -> Self {
        Self { session }
    }

    /// Decides from the current snapshot without waiting.
    pub fn check(&self) -> Gate {
        decide(&self.session.state(), self.session.login_path())
    }

    /// Waits for startup verification to settle, then decides.
    ///
    /// Never returns [`Gate::Loading`]. Requires
    /// [`SessionManager::initialize`] to have been started.
    pub async fn settle(&self) -> Gate {
        let state = self.session.settled().await;
        decide(&state, self.session.login_path())
    }

    /// Settles and returns the user, navigating to login when there is none.
    pub async fn enter(&self) -> Option<User> {
        match self.settle().await {
            Gate::Allow(user) => Some(user),
            Gate::Redirect(path) => {
                self.session.navigator().navigate(&path);
                None
            }
            Gate::Loading => None,
        }
    }

    /// Runs `view` for the authenticated user; redirects otherwise.
    pub async fn render<F, Fut, T>(&self, view: F) -> Option<T>
    where
        F: FnOnce(User) -> Fut,
        Fut: Future<Output = T>,
    {
        let user = self.enter().await?;
        Some(view(user).await)
    }
}
