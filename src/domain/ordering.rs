//! Stable transaction ordering for deterministic processing.

use crate::domain::Transaction;
use chrono::{DateTime, Utc};

/// Stable ordering key for transactions.
///
/// Ordering: timestamp -> trade_id -> id -> transaction key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TransactionOrderingKey {
    pub timestamp: DateTime<Utc>,
    pub trade_id: Option<String>,
    pub id: Option<i64>,
    pub key: String,
}

impl TransactionOrderingKey {
    pub fn from_transaction(transaction: &Transaction) -> Self {
        TransactionOrderingKey {
            timestamp: transaction.timestamp,
            trade_id: transaction.trade_id.clone(),
            id: transaction.id,
            key: transaction.key(),
        }
    }

    /// Returns true if `a` should be processed before `b`.
    pub fn should_come_before(a: &Transaction, b: &Transaction) -> bool {
        Self::from_transaction(a) < Self::from_transaction(b)
    }
}

/// Sort transactions deterministically.
pub fn sort_transactions_deterministic(transactions: &mut [Transaction]) {
    transactions.sort_by_cached_key(TransactionOrderingKey::from_transaction);
}

/// Returns true when the slice is already in processing order.
pub fn is_sorted_deterministic(transactions: &[Transaction]) -> bool {
    transactions
        .windows(2)
        .all(|w| !TransactionOrderingKey::should_come_before(&w[1], &w[0]))
}
