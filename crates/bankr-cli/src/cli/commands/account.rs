//! Balance, enquiry and money movement commands.

use std::str::FromStr;

use anyhow::{Context, Result};
use bankr_core::api::types::{
    BankResponse, CreditDebitRequest, EnquiryRequest, TransferRequest,
};
use bankr_core::config::Config;
use rust_decimal::Decimal;

use crate::cli::session::{self, expect_success};

/// Parses a strictly positive amount.
pub fn parse_amount(raw: &str) -> Result<Decimal, String> {
    let amount =
        Decimal::from_str(raw.trim()).map_err(|e| format!("invalid amount '{raw}': {e}"))?;
    if amount <= Decimal::ZERO {
        return Err("amount must be greater than zero".to_string());
    }
    Ok(amount)
}

fn print_account(response: &BankResponse) {
    if let Some(info) = &response.account_info {
        println!("  Account: {}", info.account_number);
        println!("  Name:    {}", info.account_name);
        println!("  Balance: {}", info.account_balance);
    }
}

pub async fn balance(config: &Config, account: Option<&str>) -> Result<()> {
    let (session, user) = session::require_user(config).await?;
    let account = account.unwrap_or(&user.account_number);

    let response = session
        .accounts()
        .balance_enquiry(&EnquiryRequest::new(account))
        .await?;
    let response = expect_success(response).context("Balance enquiry failed")?;

    match &response.account_info {
        Some(info) => {
            println!("{}", info.account_name);
            println!("  Account: {}", info.account_number);
            println!("  Balance: {}", info.account_balance);
        }
        None => println!("{}", response.response_message),
    }
    Ok(())
}

pub async fn name_enquiry(config: &Config, account: &str) -> Result<()> {
    let (session, _) = session::require_user(config).await?;
    let name = session
        .accounts()
        .name_enquiry(&EnquiryRequest::new(account))
        .await?;
    if name.is_empty() {
        anyhow::bail!("No account holder found for {account}");
    }
    println!("{name}");
    Ok(())
}

pub async fn credit(config: &Config, amount: Decimal, account: Option<&str>) -> Result<()> {
    let (session, user) = session::require_user(config).await?;
    let request = CreditDebitRequest {
        account_number: account.unwrap_or(&user.account_number).to_string(),
        amount,
    };

    let response = session.accounts().credit(&request).await?;
    let response = expect_success(response).context("Credit failed")?;
    println!("✓ {}", response.response_message);
    print_account(&response);
    Ok(())
}

pub async fn debit(config: &Config, amount: Decimal, account: Option<&str>) -> Result<()> {
    let (session, user) = session::require_user(config).await?;
    let request = CreditDebitRequest {
        account_number: account.unwrap_or(&user.account_number).to_string(),
        amount,
    };

    let response = session.accounts().debit(&request).await?;
    let response = expect_success(response).context("Debit failed")?;
    println!("✓ {}", response.response_message);
    print_account(&response);
    Ok(())
}

pub struct TransferArgs<'a> {
    pub to: &'a str,
    pub amount: Decimal,
    pub narration: &'a str,
    pub from: Option<&'a str>,
}

pub async fn transfer(config: &Config, args: TransferArgs<'_>) -> Result<()> {
    let (session, user) = session::require_user(config).await?;

    // Confirm the recipient first; a failed lookup does not block the transfer.
    match session
        .accounts()
        .name_enquiry(&EnquiryRequest::new(args.to))
        .await
    {
        Ok(name) if !name.trim().is_empty() => println!("Recipient: {}", name.trim()),
        Ok(_) => tracing::warn!(account = args.to, "recipient lookup returned no name"),
        Err(e) if e.is_unauthorized() => return Err(e.into()),
        Err(e) => tracing::warn!(account = args.to, error = %e, "recipient lookup failed"),
    }

    let request = TransferRequest {
        source_account_number: args.from.unwrap_or(&user.account_number).to_string(),
        destination_account_number: args.to.to_string(),
        amount: args.amount,
        narration: args.narration.to_string(),
    };

    let response = session.accounts().transfer(&request).await?;
    let response = expect_success(response).context("Transfer failed")?;
    println!("✓ {}", response.response_message);
    println!(
        "  Sent {} from {} to {}",
        request.amount, request.source_account_number, request.destination_account_number
    );
    print_account(&response);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_accepts_decimals() {
        assert_eq!(
            parse_amount("12.50").unwrap(),
            Decimal::from_str("12.50").unwrap()
        );
        assert_eq!(parse_amount(" 7 ").unwrap(), Decimal::from(7));
    }

    #[test]
    fn test_parse_amount_rejects_non_positive() {
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-3").is_err());
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        let err = parse_amount("ten").unwrap_err();
        assert!(err.contains("invalid amount 'ten'"));
    }
}
