//! Statement helpers: default date range, filtering and totals.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;

use crate::api::types::{Transaction, TransactionStatus, TransactionType};

/// Default statement range: one calendar month back from `today`, inclusive.
///
/// Month-end days clamp (March 31 → February 28/29).
pub fn default_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today.checked_sub_months(Months::new(1)).unwrap_or(today);
    (start, today)
}

/// Totals over a list of statement lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatementSummary {
    pub total_credit: Decimal,
    pub total_debit: Decimal,
    pub transaction_count: usize,
}

impl StatementSummary {
    /// Sums credits and debits. Status is not considered; every line counts.
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        transactions
            .iter()
            .fold(Self::default(), |mut summary, transaction| {
                match transaction.transaction_type {
                    TransactionType::Credit => summary.total_credit += transaction.amount,
                    TransactionType::Debit => summary.total_debit += transaction.amount,
                }
                summary.transaction_count += 1;
                summary
            })
    }

    /// Credits minus debits.
    pub fn net_amount(&self) -> Decimal {
        self.total_credit - self.total_debit
    }
}

/// Client-side narrowing of statement lines. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Case-insensitive match on the narration, or a substring of the
    /// account number.
    pub search: Option<String>,
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    /// Inclusive day bounds on `transactionDate`.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Inclusive amount bounds.
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

impl TransactionFilter {
    /// True when any criterion other than the date bounds is set.
    pub fn narrows_lines(&self) -> bool {
        self.search_term().is_some()
            || self.transaction_type.is_some()
            || self.status.is_some()
            || self.min_amount.is_some()
            || self.max_amount.is_some()
    }

    fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.matches_search(transaction)
            && self
                .transaction_type
                .is_none_or(|kind| transaction.transaction_type == kind)
            && self.status.is_none_or(|status| transaction.status == status)
            && self.matches_dates(transaction)
            && self.min_amount.is_none_or(|min| transaction.amount >= min)
            && self.max_amount.is_none_or(|max| transaction.amount <= max)
    }

    /// Keeps matching lines in their original order.
    pub fn apply(&self, transactions: Vec<Transaction>) -> Vec<Transaction> {
        transactions
            .into_iter()
            .filter(|transaction| self.matches(transaction))
            .collect()
    }

    fn matches_search(&self, transaction: &Transaction) -> bool {
        let Some(term) = self.search_term() else {
            return true;
        };
        transaction
            .narration
            .to_lowercase()
            .contains(&term.to_lowercase())
            || transaction.account_number.contains(term)
    }

    fn matches_dates(&self, transaction: &Transaction) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        // Lines without a readable date cannot satisfy a date bound.
        let Some(day) = transaction_day(transaction) else {
            return false;
        };
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }
}

/// Calendar day of a backend timestamp such as `2025-01-05T09:00:00`.
fn transaction_day(transaction: &Transaction) -> Option<NaiveDate> {
    let day = transaction.transaction_date.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
