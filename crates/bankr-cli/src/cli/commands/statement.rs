//! Statement command.

use anyhow::{Result, bail};
use bankr_core::api::types::{StatementRequest, Transaction};
use bankr_core::config::Config;
use bankr_core::statement::{StatementSummary, TransactionFilter, default_range};
use chrono::{Local, NaiveDate};

use crate::cli::session;

/// Longest narration shown before truncating.
const NARRATION_WIDTH: usize = 32;

fn resolve_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let end = to.unwrap_or(today);
    let start = from.unwrap_or_else(|| default_range(end).0);
    if start > end {
        bail!("Start date {start} is after end date {end}");
    }
    Ok((start, end))
}

fn check_amount_bounds(filter: &TransactionFilter) -> Result<()> {
    if let (Some(min), Some(max)) = (filter.min_amount, filter.max_amount)
        && min > max
    {
        bail!("Minimum amount {min} is above maximum amount {max}");
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

fn print_row(transaction: &Transaction) {
    // Backend timestamps look like 2025-01-05T09:00:00.123; show up to seconds.
    let date: String = transaction.transaction_date.chars().take(19).collect();
    println!(
        "{:<19}  {:<6}  {:>14}  {:<10}  {}",
        date.replace('T', " "),
        transaction.transaction_type.to_string(),
        transaction.amount.to_string(),
        transaction.status.to_string(),
        truncate(&transaction.narration, NARRATION_WIDTH)
    );
}

pub async fn run(config: &Config, filter: TransactionFilter, account: Option<&str>) -> Result<()> {
    let (start_date, end_date) = resolve_range(filter.from, filter.to, Local::now().date_naive())?;
    check_amount_bounds(&filter)?;
    let (session, user) = session::require_user(config).await?;
    let request = StatementRequest {
        account_number: account.unwrap_or(&user.account_number).to_string(),
        start_date,
        end_date,
    };

    let transactions = session.accounts().statement(&request).await?;
    let total = transactions.len();
    // The backend already restricts lines to the requested range.
    let filter = TransactionFilter {
        from: None,
        to: None,
        ..filter
    };
    let transactions = filter.apply(transactions);

    println!(
        "Statement for {} ({start_date} to {end_date})",
        request.account_number
    );
    if filter.narrows_lines() {
        println!("Showing {} of {total} transactions", transactions.len());
    }
    if transactions.is_empty() {
        println!("No transactions in this period.");
    } else {
        println!();
        println!(
            "{:<19}  {:<6}  {:>14}  {:<10}  NARRATION",
            "DATE", "TYPE", "AMOUNT", "STATUS"
        );
        for transaction in &transactions {
            print_row(transaction);
        }
    }

    let summary = StatementSummary::from_transactions(&transactions);
    println!();
    println!("  Total credit: {}", summary.total_credit);
    println!("  Total debit:  {}", summary.total_debit);
    println!("  Net amount:   {}", summary.net_amount());
    println!("  Transactions: {}", summary.transaction_count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_defaults_to_last_month() {
        let today = date(2025, 6, 15);
        assert_eq!(
            resolve_range(None, None, today).unwrap(),
            (date(2025, 5, 15), today)
        );
    }

    #[test]
    fn test_range_start_follows_explicit_end() {
        let (start, end) = resolve_range(None, Some(date(2025, 2, 10)), date(2025, 6, 15)).unwrap();
        assert_eq!((start, end), (date(2025, 1, 10), date(2025, 2, 10)));
    }

    #[test]
    fn test_range_rejects_inverted_dates() {
        let err =
            resolve_range(Some(date(2025, 3, 1)), Some(date(2025, 2, 1)), date(2025, 6, 15))
                .unwrap_err();
        assert!(err.to_string().contains("after end date"));
    }

    #[test]
    fn test_amount_bounds_must_be_ordered() {
        let inverted = TransactionFilter {
            min_amount: Some(Decimal::from(100)),
            max_amount: Some(Decimal::from(10)),
            ..TransactionFilter::default()
        };
        let err = check_amount_bounds(&inverted).unwrap_err();
        assert!(err.to_string().contains("above maximum"));

        let single = TransactionFilter {
            min_amount: Some(Decimal::from(10)),
            max_amount: Some(Decimal::from(10)),
            ..TransactionFilter::default()
        };
        assert!(check_amount_bounds(&single).is_ok());
    }

    #[test]
    fn test_truncate_long_narration() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 5), "abcd…");
    }
}
