//! Session wiring for commands: persisted store, HTTP client and guard.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use bankr_core::api::HttpClient;
use bankr_core::api::types::{BankResponse, User};
use bankr_core::config::Config;
use bankr_core::session::{Navigator, RouteGuard, SessionManager, SessionOptions};
use bankr_core::storage::{Credentials, FileStore};

/// Returned when a protected command runs without a valid session.
#[derive(Debug)]
pub struct SignInRequired;

impl fmt::Display for SignInRequired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Not signed in")
    }
}

impl std::error::Error for SignInRequired {}

/// Terminal stand-in for navigating to the login page. Prints the hint once.
struct TerminalNavigator {
    login_path: String,
    hinted: AtomicBool,
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str) {
        if path != self.login_path {
            tracing::debug!(path, "ignoring navigation");
        } else if !self.hinted.swap(true, Ordering::SeqCst) {
            eprintln!("Sign in with `bankr login --email <EMAIL>` to continue.");
        }
    }
}

/// Builds a session over the on-disk store and the configured backend.
pub fn open(config: &Config) -> Result<SessionManager> {
    let base_url = config.effective_base_url()?;
    let credentials = Credentials::new(Arc::new(FileStore::default_location()));
    let client = HttpClient::new(&base_url, credentials).context("create backend client")?;
    tracing::debug!(%base_url, "opening session");

    let navigator = Arc::new(TerminalNavigator {
        login_path: config.login_path.clone(),
        hinted: AtomicBool::new(false),
    });
    Ok(SessionManager::new(
        client,
        navigator,
        SessionOptions::from_config(config),
    ))
}

/// Opens a session, verifies any saved token and returns the signed-in user.
///
/// # Errors
/// [`SignInRequired`] when there is no valid session; the navigator has
/// already printed the sign-in hint.
pub async fn require_user(config: &Config) -> Result<(SessionManager, User)> {
    let session = open(config)?;
    session.initialize().await;
    let user = RouteGuard::new(&session)
        .enter()
        .await
        .ok_or(SignInRequired)?;
    Ok((session, user))
}

/// Turns a domain rejection into an error carrying the backend's message.
pub fn expect_success(response: BankResponse) -> Result<BankResponse> {
    if response.is_success() {
        return Ok(response);
    }
    let message = if response.response_message.trim().is_empty() {
        "Request rejected by the bank"
    } else {
        response.response_message.as_str()
    };
    anyhow::bail!("{message} (code {})", response.response_code)
}
