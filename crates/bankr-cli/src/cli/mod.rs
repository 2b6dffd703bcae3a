//! CLI entry and dispatch.

use std::fs;

use anyhow::{Context, Result};
use bankr_core::api::types::{TransactionStatus, TransactionType};
use bankr_core::config;
use bankr_core::statement::TransactionFilter;
use chrono::NaiveDate;
use clap::Parser;
use rust_decimal::Decimal;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
pub mod session;

/// Env var holding the log filter directives.
const LOG_ENV: &str = "BANKR_LOG";

#[derive(Parser)]
#[command(name = "bankr")]
#[command(version = "0.1")]
#[command(about = "Terminal client for the banking backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        /// Password (prompted on stdin when omitted)
        #[arg(long, env = "BANKR_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Open a new account
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        alt_phone: Option<String>,
        #[arg(long)]
        address: String,
        /// Password (prompted on stdin when omitted)
        #[arg(long, env = "BANKR_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Log out and forget the saved session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show an account balance
    Balance {
        /// Account number (default: your own)
        #[arg(long)]
        account: Option<String>,
    },
    /// Look up the holder of an account
    NameEnquiry {
        #[arg(value_name = "ACCOUNT")]
        account: String,
    },
    /// Deposit money into an account
    Credit {
        #[arg(long, value_parser = commands::account::parse_amount)]
        amount: Decimal,
        /// Account number (default: your own)
        #[arg(long)]
        account: Option<String>,
    },
    /// Withdraw money from an account
    Debit {
        #[arg(long, value_parser = commands::account::parse_amount)]
        amount: Decimal,
        /// Account number (default: your own)
        #[arg(long)]
        account: Option<String>,
    },
    /// Send money to another account
    Transfer {
        /// Destination account number
        #[arg(long)]
        to: String,
        #[arg(long, value_parser = commands::account::parse_amount)]
        amount: Decimal,
        #[arg(long, default_value = "")]
        narration: String,
        /// Source account number (default: your own)
        #[arg(long)]
        from: Option<String>,
    },
    /// List transactions and totals for a date range
    Statement {
        /// Start date, yyyy-mm-dd (default: one month ago)
        #[arg(long, value_name = "DATE")]
        from: Option<NaiveDate>,
        /// End date, yyyy-mm-dd (default: today)
        #[arg(long, value_name = "DATE")]
        to: Option<NaiveDate>,
        /// Account number (default: your own)
        #[arg(long)]
        account: Option<String>,
        /// Only lines whose narration or account number contains this text
        #[arg(long)]
        search: Option<String>,
        /// Only credit or debit lines
        #[arg(long = "type", value_name = "TYPE")]
        transaction_type: Option<TransactionType>,
        /// Only successful, pending or failed lines
        #[arg(long)]
        status: Option<TransactionStatus>,
        /// Smallest amount shown
        #[arg(long, value_name = "AMOUNT")]
        min_amount: Option<Decimal>,
        /// Largest amount shown
        #[arg(long, value_name = "AMOUNT")]
        max_amount: Option<Decimal>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Save the backend base URL
    SetBaseUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

/// Sends tracing output to `<home>/logs/bankr.log`; stdout is for command output.
///
/// Logging is best effort: if the log file cannot be opened the CLI runs
/// without it.
fn init_logging() -> Option<WorkerGuard> {
    let logs_dir = config::paths::logs_dir();
    fs::create_dir_all(&logs_dir).ok()?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("bankr")
        .filename_suffix("log")
        .build(&logs_dir)
        .ok()?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()
        .ok()?;

    Some(guard)
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = config::Config::load().context("load config")?;

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::SetBaseUrl { url } => commands::config::set_base_url(&url),
        },

        Commands::Login { email, password } => {
            commands::auth::login(&config, &email, password).await
        }
        Commands::Register {
            first_name,
            last_name,
            email,
            phone,
            alt_phone,
            address,
            password,
        } => {
            commands::auth::register(
                &config,
                commands::auth::RegisterArgs {
                    first_name,
                    last_name,
                    email,
                    phone,
                    alt_phone,
                    address,
                    password,
                },
            )
            .await
        }
        Commands::Logout => commands::auth::logout(&config),
        Commands::Whoami => commands::auth::whoami(&config).await,

        Commands::Balance { account } => {
            commands::account::balance(&config, account.as_deref()).await
        }
        Commands::NameEnquiry { account } => {
            commands::account::name_enquiry(&config, &account).await
        }
        Commands::Credit { amount, account } => {
            commands::account::credit(&config, amount, account.as_deref()).await
        }
        Commands::Debit { amount, account } => {
            commands::account::debit(&config, amount, account.as_deref()).await
        }
        Commands::Transfer {
            to,
            amount,
            narration,
            from,
        } => {
            commands::account::transfer(
                &config,
                commands::account::TransferArgs {
                    to: &to,
                    amount,
                    narration: &narration,
                    from: from.as_deref(),
                },
            )
            .await
        }
        Commands::Statement {
            from,
            to,
            account,
            search,
            transaction_type,
            status,
            min_amount,
            max_amount,
        } => {
            let filter = TransactionFilter {
                search,
                transaction_type,
                status,
                from,
                to,
                min_amount,
                max_amount,
            };
            commands::statement::run(&config, filter, account.as_deref()).await
        }
    }
}
