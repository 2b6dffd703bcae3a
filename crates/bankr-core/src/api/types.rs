//! Wire types shared with the banking backend.
//!
//! Field names follow the backend's camelCase JSON.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only `responseCode` the backend uses for success.
pub const SUCCESS_CODE: &str = "00";

/// Authenticated user, derived from the login response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub account_number: String,
}

impl User {
    /// Builds a user from a login payload.
    ///
    /// The backend only returns a display name, so it is split on whitespace:
    /// the first token becomes `first_name`, the second `last_name` (empty if
    /// absent). Further tokens are dropped, so "Jane Q Public" yields "Jane"
    /// and "Q". This is lossy for multi-word names and kept as-is for
    /// compatibility with records already persisted by other clients.
    pub fn from_account(info: &AccountInfo, email: &str) -> Self {
        let mut names = info.account_name.split_whitespace();
        let first_name = names.next().unwrap_or_default().to_string();
        let last_name = names.next().unwrap_or_default().to_string();

        Self {
            id: info.account_number.clone(),
            first_name,
            last_name,
            email: email.to_string(),
            account_number: info.account_number.clone(),
        }
    }

    pub fn display_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

/// Registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_phone_number: Option<String>,
    pub address: String,
}

/// Login payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Account snapshot embedded in backend responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_number: String,
    pub account_name: String,
    #[serde(default)]
    pub account_balance: Decimal,
}

/// Canonical response envelope for account and auth operations.
///
/// A response whose code is not [`SUCCESS_CODE`] is a domain failure: the
/// request reached the backend and was rejected. It is data, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankResponse {
    pub response_code: String,
    #[serde(default)]
    pub response_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_info: Option<AccountInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl BankResponse {
    pub fn is_success(&self) -> bool {
        self.response_code == SUCCESS_CODE
    }

    /// Token carried in `data.token`, if any.
    pub fn token(&self) -> Option<&str> {
        self.data
            .as_ref()?
            .get("token")
            .and_then(Value::as_str)
            .filter(|token| !token.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryRequest {
    pub account_number: String,
}

impl EnquiryRequest {
    pub fn new(account_number: impl Into<String>) -> Self {
        Self {
            account_number: account_number.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditDebitRequest {
    pub account_number: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub source_account_number: String,
    pub destination_account_number: String,
    pub amount: Decimal,
    pub narration: String,
}

/// Date-ranged statement query for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementRequest {
    pub account_number: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl StatementRequest {
    /// Query pairs in backend order, dates rendered `yyyy-MM-dd`.
    pub fn query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("accountNumber", self.account_number.clone()),
            ("startDate", self.start_date.format("%Y-%m-%d").to_string()),
            ("endDate", self.end_date.format("%Y-%m-%d").to_string()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Credit => write!(f, "CREDIT"),
            TransactionType::Debit => write!(f, "DEBIT"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREDIT" => Ok(TransactionType::Credit),
            "DEBIT" => Ok(TransactionType::Debit),
            other => Err(format!("unknown transaction type '{other}' (expected credit or debit)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Successful,
    Pending,
    Failed,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Successful => write!(f, "SUCCESSFUL"),
            TransactionStatus::Pending => write!(f, "PENDING"),
            TransactionStatus::Failed => write!(f, "FAILED"),
            TransactionStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    /// Parses a known status; `UNKNOWN` only ever comes from the backend.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUCCESSFUL" => Ok(TransactionStatus::Successful),
            "PENDING" => Ok(TransactionStatus::Pending),
            "FAILED" => Ok(TransactionStatus::Failed),
            other => Err(format!(
                "unknown transaction status '{other}' (expected successful, pending or failed)"
            )),
        }
    }
}

/// One statement line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub account_number: String,
    pub amount: Decimal,
    #[serde(default)]
    pub narration: String,
    /// Backend timestamp, kept verbatim.
    #[serde(default)]
    pub transaction_date: String,
    #[serde(default = "default_status")]
    pub status: TransactionStatus,
}

fn default_status() -> TransactionStatus {
    TransactionStatus::Unknown
}

/// Accepts ids sent either as JSON strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
