//! Account endpoints: enquiries, money movement and statements.

use serde_json::Value;

use super::errors::ApiError;
use super::http::{ApiRequest, HttpClient};
use super::types::{
    BankResponse, CreditDebitRequest, EnquiryRequest, StatementRequest, Transaction,
    TransferRequest,
};

const BALANCE_ENQUIRY_PATH: &str = "/api/user/balanceEnquiry";
const NAME_ENQUIRY_PATH: &str = "/api/user/nameEnquiry";
const CREDIT_PATH: &str = "/api/user/credit";
const DEBIT_PATH: &str = "/api/user/debit";
const TRANSFER_PATH: &str = "/api/user/transfer";
const STATEMENT_PATH: &str = "/bankStatement";

/// Typed account operations over a shared [`HttpClient`].
///
/// Each call maps one request shape to one response shape; transport failures
/// reach the caller unchanged.
#[derive(Clone)]
pub struct AccountsApi {
    client: HttpClient,
}

impl AccountsApi {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// # Errors
    /// Returns transport failures unchanged.
    pub async fn balance_enquiry(
        &self,
        request: &EnquiryRequest,
    ) -> Result<BankResponse, ApiError> {
        // The backend reads the account number from a JSON body on GET.
        self.client
            .send_json(ApiRequest::get(BALANCE_ENQUIRY_PATH).json(request)?)
            .await
    }

    /// Returns the account holder's name.
    ///
    /// Accepts a JSON string body as well as plain text.
    ///
    /// # Errors
    /// Returns transport failures unchanged.
    pub async fn name_enquiry(&self, request: &EnquiryRequest) -> Result<String, ApiError> {
        let body = self
            .client
            .send_text(ApiRequest::get(NAME_ENQUIRY_PATH).json(request)?)
            .await?;
        Ok(match serde_json::from_str::<Value>(&body) {
            Ok(Value::String(name)) => name,
            _ => body.trim().to_string(),
        })
    }

    /// # Errors
    /// Returns transport failures unchanged.
    pub async fn credit(&self, request: &CreditDebitRequest) -> Result<BankResponse, ApiError> {
        self.client
            .send_json(ApiRequest::post(CREDIT_PATH).json(request)?)
            .await
    }

    /// # Errors
    /// Returns transport failures unchanged.
    pub async fn debit(&self, request: &CreditDebitRequest) -> Result<BankResponse, ApiError> {
        self.client
            .send_json(ApiRequest::post(DEBIT_PATH).json(request)?)
            .await
    }

    /// # Errors
    /// Returns transport failures unchanged.
    pub async fn transfer(&self, request: &TransferRequest) -> Result<BankResponse, ApiError> {
        self.client
            .send_json(ApiRequest::post(TRANSFER_PATH).json(request)?)
            .await
    }

    /// Fetches the transactions of one account within a date range, in the
    /// order the backend returns them.
    ///
    /// # Errors
    /// Returns transport failures unchanged.
    pub async fn statement(
        &self,
        request: &StatementRequest,
    ) -> Result<Vec<Transaction>, ApiError> {
        let mut api_request = ApiRequest::get(STATEMENT_PATH);
        for (key, value) in request.query_pairs() {
            api_request = api_request.query(key, value);
        }
        self.client.send_json(api_request).await
    }
}
