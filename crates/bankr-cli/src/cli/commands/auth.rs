//! Login, registration and session commands.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result, bail};
use bankr_core::api::types::{LoginRequest, UserRequest};
use bankr_core::config::Config;

use crate::cli::session::{self, expect_success};

pub struct RegisterArgs {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub alt_phone: Option<String>,
    pub address: String,
    pub password: Option<String>,
}

/// Reads one line from stdin, prompting only when attached to a terminal.
fn read_password() -> Result<String> {
    if io::stdin().is_terminal() {
        eprint!("Password: ");
        io::stderr().flush()?;
    }
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("No password given");
    }
    Ok(password)
}

pub async fn login(config: &Config, email: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    let session = session::open(config)?;
    let response = session
        .login(&LoginRequest::new(email, password))
        .await
        .context("Login failed")?;
    expect_success(response).context("Login failed")?;

    let Some(user) = session.user() else {
        bail!("Login failed: the response carried no account details");
    };
    println!("✓ Logged in as {}", user.display_name());
    println!("  Account: {}", user.account_number);
    Ok(())
}

pub async fn register(config: &Config, args: RegisterArgs) -> Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => read_password()?,
    };
    let request = UserRequest {
        first_name: args.first_name,
        last_name: args.last_name,
        email: args.email,
        password,
        phone_number: args.phone,
        alternative_phone_number: args.alt_phone.filter(|p| !p.trim().is_empty()),
        address: args.address,
    };

    let session = session::open(config)?;
    let response = session
        .register(&request)
        .await
        .context("Registration failed")?;
    let response = expect_success(response).context("Registration failed")?;

    println!("✓ {}", response.response_message);
    if let Some(info) = &response.account_info {
        println!("  Account: {}", info.account_number);
    }
    println!("Sign in with `bankr login --email {}`.", request.email);
    Ok(())
}

pub fn logout(config: &Config) -> Result<()> {
    let session = session::open(config)?;
    // An unreadable store still counts as a session to clear.
    let had_session = !matches!(session.client().credentials().token(), Ok(None));
    session.logout()?;
    if had_session {
        println!("✓ Logged out");
    } else {
        println!("Not logged in (no saved session).");
    }
    Ok(())
}

pub async fn whoami(config: &Config) -> Result<()> {
    let (_, user) = session::require_user(config).await?;
    println!("{}", user.display_name());
    println!("  Email:   {}", user.email);
    println!("  Account: {}", user.account_number);
    Ok(())
}
