//! Session state container.
//!
//! [`SessionManager`] owns the authenticated user: the in-memory slot, the
//! persisted mirror plus token, and the loading flag. Instances are
//! independent; nothing here is global.
//!
//! Lifecycle:
//! - `Uninitialized → Verifying → Authenticated | Anonymous` when a persisted
//!   user and token exist at startup (the token is verified first)
//! - `Uninitialized → Anonymous` when they do not
//! - `Anonymous → Authenticating → Authenticated | Anonymous` on `login`
//! - `Authenticated → Anonymous` on `logout` or any 401 response
//!
//! There is no mutual exclusion between concurrent `login` calls; the last
//! one to finish wins the slot.

pub mod guard;
pub mod navigator;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;

use crate::api::accounts::AccountsApi;
use crate::api::auth;
use crate::api::http::{HttpClient, UnauthorizedHandler};
use crate::api::types::{BankResponse, LoginRequest, User, UserRequest};
use crate::config::Config;
use crate::storage::{Credentials, mask_token};

pub use guard::{Gate, RouteGuard};
pub use navigator::{HistoryNavigator, Navigator};

/// Startup verification progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitPhase {
    #[default]
    Uninitialized,
    Verifying,
    Settled,
}

/// Operation currently holding the loading flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOp {
    Login,
    Register,
}

/// Snapshot of the container, published on every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub phase: InitPhase,
    pub user: Option<User>,
    pub pending: Option<PendingOp>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// True until initialization settles and while login/register run.
    pub fn is_loading(&self) -> bool {
        self.phase != InitPhase::Settled || self.pending.is_some()
    }

    pub fn status(&self) -> AuthStatus {
        match (self.phase, &self.user, self.pending) {
            (InitPhase::Uninitialized, _, _) => AuthStatus::Uninitialized,
            (InitPhase::Verifying, _, _) => AuthStatus::Verifying,
            (InitPhase::Settled, Some(_), _) => AuthStatus::Authenticated,
            (InitPhase::Settled, None, Some(PendingOp::Login)) => AuthStatus::Authenticating,
            (InitPhase::Settled, None, _) => AuthStatus::Anonymous,
        }
    }
}

/// Externally visible authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Uninitialized,
    Verifying,
    Anonymous,
    Authenticating,
    Authenticated,
}

/// Session behavior knobs, usually taken from [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Where expired or missing sessions navigate to.
    pub login_path: String,
    /// Token persisted when a successful login carries none.
    pub placeholder_token: Option<String>,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            login_path: config.login_path.clone(),
            placeholder_token: config.session.placeholder_token.clone(),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// State shared with the HTTP client's unauthorized hook.
struct Shared {
    credentials: Credentials,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    state: watch::Sender<SessionState>,
}

impl Shared {
    fn clear_persisted(&self) {
        if let Err(e) = self.credentials.clear() {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }
    }
}

impl UnauthorizedHandler for Shared {
    fn on_unauthorized(&self) {
        self.clear_persisted();
        self.state.send_modify(|state| state.user = None);
        tracing::info!(path = %self.login_path, "session invalidated; redirecting to login");
        self.navigator.navigate(&self.login_path);
    }
}

/// Clears the loading flag when the operation ends, however it ends.
struct PendingGuard<'a> {
    state: &'a watch::Sender<SessionState>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|state| state.pending = None);
    }
}

/// Single source of truth for the authenticated user.
#[derive(Clone)]
pub struct SessionManager {
    client: HttpClient,
    shared: Arc<Shared>,
    placeholder_token: Option<String>,
}

impl SessionManager {
    /// Wires a session around `client`.
    ///
    /// The session installs itself as the client's unauthorized handler; use
    /// [`SessionManager::client`] or [`SessionManager::accounts`] for other
    /// calls so their 401s invalidate this session too.
    pub fn new(client: HttpClient, navigator: Arc<dyn Navigator>, options: SessionOptions) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let shared = Arc::new(Shared {
            credentials: client.credentials().clone(),
            navigator,
            login_path: options.login_path,
            state,
        });
        let client =
            client.with_unauthorized_handler(Arc::clone(&shared) as Arc<dyn UnauthorizedHandler>);

        Self {
            client,
            shared,
            placeholder_token: options
                .placeholder_token
                .filter(|token| !token.trim().is_empty()),
        }
    }

    /// Restores a persisted session if the backend still accepts its token.
    ///
    /// Only the first call does anything; later calls return immediately.
    pub async fn initialize(&self) {
        if self.shared.state.borrow().phase != InitPhase::Uninitialized {
            return;
        }

        let credentials = &self.shared.credentials;
        let persisted = credentials
            .user()
            .and_then(|user| Ok((user, credentials.token()?)));
        let stored_user = match persisted {
            Ok((Some(user), Some(_))) => Some(user),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "persisted session unreadable; discarding it");
                self.shared.clear_persisted();
                None
            }
        };

        let Some(stored_user) = stored_user else {
            self.claim_phase(InitPhase::Settled);
            tracing::debug!("no persisted session");
            return;
        };

        if !self.claim_phase(InitPhase::Verifying) {
            return;
        }

        if auth::verify_token(&self.client).await {
            tracing::info!(account = %stored_user.account_number, "restored persisted session");
            self.shared.state.send_modify(|state| {
                state.user = Some(stored_user);
                state.phase = InitPhase::Settled;
            });
        } else {
            tracing::info!("persisted token rejected; clearing session");
            self.shared.clear_persisted();
            self.shared.state.send_modify(|state| {
                state.user = None;
                state.phase = InitPhase::Settled;
            });
        }
    }

    /// Moves out of `Uninitialized`; false if another caller already did.
    fn claim_phase(&self, next: InitPhase) -> bool {
        self.shared.state.send_if_modified(|state| {
            if state.phase == InitPhase::Uninitialized {
                state.phase = next;
                true
            } else {
                false
            }
        })
    }

    fn begin(&self, op: PendingOp) -> PendingGuard<'_> {
        self.shared
            .state
            .send_modify(|state| state.pending = Some(op));
        PendingGuard {
            state: &self.shared.state,
        }
    }

    /// Logs in and, on success, persists and publishes the user.
    ///
    /// A rejected login (`responseCode != "00"`) is returned unchanged and
    /// leaves the state alone.
    ///
    /// # Errors
    /// Transport failures (as [`ApiError`](crate::api::ApiError)) and storage
    /// failures. A successful response without a token fails when no
    /// placeholder token is configured.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<BankResponse> {
        let _pending = self.begin(PendingOp::Login);

        let response = auth::login(&self.client, credentials).await?;

        if response.is_success()
            && let Some(info) = &response.account_info
        {
            let user = User::from_account(info, &credentials.email);
            let token = self.resolve_token(&response)?;

            if let Err(e) = self.shared.credentials.save(&user, &token) {
                self.shared.clear_persisted();
                return Err(e.context("persist session"));
            }

            tracing::info!(
                account = %user.account_number,
                token = %mask_token(&token),
                "logged in"
            );
            self.shared
                .state
                .send_modify(|state| state.user = Some(user));
        } else {
            tracing::debug!(code = %response.response_code, "login rejected by backend");
        }

        Ok(response)
    }

    fn resolve_token(&self, response: &BankResponse) -> Result<String> {
        if let Some(token) = response.token() {
            return Ok(token.to_string());
        }
        match &self.placeholder_token {
            Some(placeholder) => {
                tracing::warn!(
                    "login response carried no token; persisting the configured placeholder"
                );
                Ok(placeholder.clone())
            }
            None => anyhow::bail!(
                "Login response carried no token and no placeholder token is configured"
            ),
        }
    }

    /// Registers a new customer. Never changes the authenticated state.
    ///
    /// # Errors
    /// Transport failures (as [`ApiError`](crate::api::ApiError)).
    pub async fn register(&self, request: &UserRequest) -> Result<BankResponse> {
        let _pending = self.begin(PendingOp::Register);
        let response = auth::register(&self.client, request).await?;
        Ok(response)
    }

    /// Clears the persisted mirror, the token and the in-memory user.
    ///
    /// Idempotent.
    ///
    /// # Errors
    /// Returns an error if the persisted store cannot be written; the
    /// in-memory user is cleared regardless.
    pub fn logout(&self) -> Result<()> {
        self.shared.state.send_modify(|state| state.user = None);
        self.shared
            .credentials
            .clear()
            .context("clear persisted session")?;
        tracing::info!("logged out");
        Ok(())
    }

    /// Current snapshot.
    pub fn state(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    /// Waits until startup verification settles and returns that snapshot.
    ///
    /// Pending forever if [`SessionManager::initialize`] is never called.
    pub async fn settled(&self) -> SessionState {
        let mut rx = self.shared.state.subscribe();
        let settled = match rx.wait_for(|state| state.phase == InitPhase::Settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }

    /// Receives every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.shared.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.shared.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.borrow().is_loading()
    }

    pub fn status(&self) -> AuthStatus {
        self.shared.state.borrow().status()
    }

    pub fn login_path(&self) -> &str {
        &self.shared.login_path
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.shared.navigator
    }

    /// HTTP client wired to this session's unauthorized handling.
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn accounts(&self) -> AccountsApi {
        AccountsApi::new(self.client.clone())
    }
}
