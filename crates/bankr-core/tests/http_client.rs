use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bankr_core::api::accounts::AccountsApi;
use bankr_core::api::auth;
use bankr_core::api::types::{
    CreditDebitRequest, EnquiryRequest, StatementRequest, TransactionType, TransferRequest, User,
};
use bankr_core::api::{ApiErrorKind, HttpClient, UnauthorizedHandler};
use bankr_core::storage::Credentials;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct CountingHandler {
    calls: AtomicUsize,
}

impl UnauthorizedHandler for CountingHandler {
    fn on_unauthorized(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn signed_in(token: &str) -> Credentials {
    let credentials = Credentials::in_memory();
    let user = User {
        id: "2025001".to_string(),
        first_name: "Jane".to_string(),
        last_name: "Q".to_string(),
        email: "jane@example.com".to_string(),
        account_number: "2025001".to_string(),
    };
    credentials.save(&user, token).unwrap();
    credentials
}

fn ok_body() -> serde_json::Value {
    json!({
        "responseCode": "00",
        "responseMessage": "Account balance retrieved",
        "accountInfo": {
            "accountNumber": "2025001",
            "accountName": "Jane Q Public",
            "accountBalance": 1500.75
        }
    })
}

#[tokio::test]
async fn test_bearer_attached_when_token_present() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/user/balanceEnquiry"))
        .and(header("authorization", "Bearer jwt-abc"))
        .and(header("content-type", "application/json"))
        .and(header("accept", "application/json"))
        .and(body_json(json!({ "accountNumber": "2025001" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(&mock_server.uri(), signed_in("jwt-abc")).unwrap();
    let response = AccountsApi::new(client)
        .balance_enquiry(&EnquiryRequest::new("2025001"))
        .await
        .unwrap();

    assert!(response.is_success());
    let info = response.account_info.unwrap();
    assert_eq!(info.account_balance, Decimal::from_str("1500.75").unwrap());
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/user/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(&mock_server.uri(), Credentials::in_memory()).unwrap();
    let login = bankr_core::api::types::LoginRequest::new("jane@example.com", "pw");
    auth::login(&client, &login).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_domain_failure_is_data_not_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/user/debit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responseCode": "007",
            "responseMessage": "Insufficient balance"
        })))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(&mock_server.uri(), signed_in("jwt-abc")).unwrap();
    let response = AccountsApi::new(client)
        .debit(&CreditDebitRequest {
            account_number: "2025001".to_string(),
            amount: Decimal::from(10_000),
        })
        .await
        .unwrap();

    assert!(!response.is_success());
    assert_eq!(response.response_message, "Insufficient balance");
    assert!(response.account_info.is_none());
}

#[tokio::test]
async fn test_unauthorized_notifies_handler_and_is_distinguishable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/user/transfer"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let handler = Arc::new(CountingHandler::default());
    let client = HttpClient::new(&mock_server.uri(), signed_in("stale"))
        .unwrap()
        .with_unauthorized_handler(Arc::clone(&handler) as Arc<dyn UnauthorizedHandler>);

    let err = AccountsApi::new(client)
        .transfer(&TransferRequest {
            source_account_number: "2025001".to_string(),
            destination_account_number: "2025002".to_string(),
            amount: Decimal::from(5),
            narration: "lunch".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::Unauthorized);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_other_statuses_do_not_trigger_unauthorized_reaction() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/user/credit"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "status": 403,
            "error": "Forbidden"
        })))
        .mount(&mock_server)
        .await;

    let handler = Arc::new(CountingHandler::default());
    let client = HttpClient::new(&mock_server.uri(), signed_in("jwt-abc"))
        .unwrap()
        .with_unauthorized_handler(Arc::clone(&handler) as Arc<dyn UnauthorizedHandler>);

    let err = AccountsApi::new(client)
        .credit(&CreditDebitRequest {
            account_number: "2025001".to_string(),
            amount: Decimal::from(5),
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::HttpStatus);
    assert_eq!(err.status, Some(403));
    assert_eq!(err.message, "HTTP 403: Forbidden");
    assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_statement_uses_query_parameters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bankStatement"))
        .and(query_param("accountNumber", "2025001"))
        .and(query_param("startDate", "2025-01-01"))
        .and(query_param("endDate", "2025-01-31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 7,
                "transactionType": "CREDIT",
                "accountNumber": "2025001",
                "amount": 250.0,
                "narration": "salary",
                "transactionDate": "2025-01-05T09:00:00",
                "status": "SUCCESSFUL"
            },
            {
                "id": "8",
                "transactionType": "DEBIT",
                "accountNumber": "2025001",
                "amount": 40.5,
                "status": "REVERSED"
            }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(&mock_server.uri(), signed_in("jwt-abc")).unwrap();
    let transactions = AccountsApi::new(client)
        .statement(&StatementRequest {
            account_number: "2025001".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        })
        .await
        .unwrap();

    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].id, "7");
    assert_eq!(transactions[0].transaction_type, TransactionType::Credit);
    assert_eq!(transactions[1].id, "8");
    assert_eq!(transactions[1].amount, Decimal::from_str("40.5").unwrap());
}

#[tokio::test]
async fn test_name_enquiry_accepts_plain_text_and_json_string() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/user/nameEnquiry"))
        .and(body_json(json!({ "accountNumber": "2025002" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("John Doe"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user/nameEnquiry"))
        .and(body_json(json!({ "accountNumber": "2025003" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("\"Mary Major\""))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(&mock_server.uri(), signed_in("jwt-abc")).unwrap();
    let api = AccountsApi::new(client);

    assert_eq!(
        api.name_enquiry(&EnquiryRequest::new("2025002")).await.unwrap(),
        "John Doe"
    );
    assert_eq!(
        api.name_enquiry(&EnquiryRequest::new("2025003")).await.unwrap(),
        "Mary Major"
    );
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/user/credit"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(&mock_server.uri(), signed_in("jwt-abc")).unwrap();
    let err = AccountsApi::new(client)
        .credit(&CreditDebitRequest {
            account_number: "2025001".to_string(),
            amount: Decimal::from(1),
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::Parse);
    assert_eq!(err.details.as_deref(), Some("<html>oops</html>"));
}

#[tokio::test]
async fn test_verify_token_absorbs_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/user/validate-token"))
        .and(header("authorization", "Bearer good"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user/validate-token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let good = HttpClient::new(&mock_server.uri(), signed_in("good")).unwrap();
    assert!(auth::verify_token(&good).await);

    let bad = HttpClient::new(&mock_server.uri(), signed_in("bad")).unwrap();
    assert!(!auth::verify_token(&bad).await);

    // Nothing listens on the discard port.
    let unreachable = HttpClient::new("http://127.0.0.1:9", signed_in("good")).unwrap();
    assert!(!auth::verify_token(&unreachable).await);
}
