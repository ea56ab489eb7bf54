//! Contracts of the external collaborators the engine reads from.
//!
//! Storage, FX-rate sourcing and quotes live outside this crate; the engine
//! only sees these traits. All results are fully materialized before any
//! matching or reconciliation runs.

use crate::domain::{CashFlowType, Currency, Decimal, PortfolioId, SecurityEventCashFlow, SecurityId, Transaction};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod mock;

pub use mock::MockDataSource;

/// Source of normalized transactions.
#[async_trait]
pub trait TransactionSource: Send + Sync + fmt::Debug {
    /// Fetch transactions of one security within `[from, to)`.
    ///
    /// An empty `portfolios` slice selects every portfolio.
    ///
    /// # Returns
    /// Transactions ordered by (timestamp, trade_id, id)
    async fn fetch_transactions(
        &self,
        security: &SecurityId,
        portfolios: &[PortfolioId],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, DataSourceError>;

    /// Fetch transactions of every contract quoting the currency pair (e.g. "USDRUB").
    async fn fetch_currency_pair_transactions(
        &self,
        currency_pair: &str,
        portfolios: &[PortfolioId],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, DataSourceError>;
}

/// Source of security events (payments, redemptions, variation margin).
#[async_trait]
pub trait SecurityEventSource: Send + Sync + fmt::Debug {
    /// Fetch events of one kind within `[from, to)`, ordered by timestamp.
    async fn fetch_events(
        &self,
        security: &SecurityId,
        portfolios: &[PortfolioId],
        kind: CashFlowType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SecurityEventCashFlow>, DataSourceError>;
}

/// Exchange-rate capability.
///
/// Implementations may fall back to a coarse default rate when no
/// historical value exists.
#[async_trait]
pub trait CurrencyConverter: Send + Sync + fmt::Debug {
    /// Current rate: units of `quote` per one unit of `base`.
    async fn rate(&self, base: &Currency, quote: &Currency) -> Result<Decimal, DataSourceError>;

    /// Rate on a given date.
    async fn rate_at(
        &self,
        base: &Currency,
        quote: &Currency,
        date: NaiveDate,
    ) -> Result<Decimal, DataSourceError>;
}

/// Mark-to-market price of a security.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityQuote {
    pub security: SecurityId,
    pub timestamp: DateTime<Utc>,
    /// Clean price of one unit.
    pub price: Decimal,
    /// Accrued interest of one unit (bonds).
    pub accrued_interest: Option<Decimal>,
    pub currency: Currency,
}

impl SecurityQuote {
    /// Price including accrued interest.
    pub fn dirty_price(&self) -> Decimal {
        self.price + self.accrued_interest.unwrap_or_default()
    }
}

/// Source of the latest quotes.
#[async_trait]
pub trait QuoteSource: Send + Sync + fmt::Debug {
    async fn quote(&self, security: &SecurityId) -> Result<Option<SecurityQuote>, DataSourceError>;
}

/// Error type for collaborator operations.
#[derive(Debug, Clone)]
pub enum DataSourceError {
    /// Storage backend failure
    Storage(String),
    /// Requested entity does not exist
    NotFound(String),
    /// No exchange rate (not even a fallback) for the pair
    RateUnavailable { base: Currency, quote: Currency },
    /// Other error
    Other(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::Storage(msg) => write!(f, "Storage error: {}", msg),
            DataSourceError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DataSourceError::RateUnavailable { base, quote } => {
                write!(f, "No exchange rate for {}/{}", base, quote)
            }
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}
