//! Transaction type representing a single change of ownership.

use crate::domain::{CashFlowType, Currency, Decimal, PortfolioId, SecurityId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One component of a transaction's trade value (price, accrued interest, commission...).
///
/// Values are signed from the portfolio's point of view: money paid is negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCashFlow {
    pub kind: CashFlowType,
    pub value: Decimal,
    pub currency: Currency,
}

impl TransactionCashFlow {
    pub fn new(kind: CashFlowType, value: Decimal, currency: Currency) -> Self {
        Self {
            kind,
            value,
            currency,
        }
    }
}

/// A normalized acquisition (count > 0) or disposal (count < 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Storage identifier; `None` for transactions synthesized by the engine.
    pub id: Option<i64>,
    /// Broker trade/settlement id used to order same-instant transactions.
    pub trade_id: Option<String>,
    pub portfolio: PortfolioId,
    pub security: SecurityId,
    /// Signed count of units.
    pub count: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cash_flows: Vec<TransactionCashFlow>,
}

impl Transaction {
    pub fn new(
        id: Option<i64>,
        portfolio: PortfolioId,
        security: SecurityId,
        count: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Transaction {
            id,
            trade_id: None,
            portfolio,
            security,
            count,
            timestamp,
            cash_flows: Vec::new(),
        }
    }

    /// Engine-made transaction, e.g. from a redemption event.
    pub fn synthetic(
        portfolio: PortfolioId,
        security: SecurityId,
        count: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(None, portfolio, security, count, timestamp)
    }

    pub fn with_trade_id(mut self, trade_id: impl Into<String>) -> Self {
        self.trade_id = Some(trade_id.into());
        self
    }

    pub fn with_cash_flow(mut self, kind: CashFlowType, value: Decimal, currency: Currency) -> Self {
        self.cash_flows
            .push(TransactionCashFlow::new(kind, value, currency));
        self
    }

    pub fn is_synthetic(&self) -> bool {
        self.id.is_none()
    }

    /// Stable identity of this transaction.
    ///
    /// Priority: `id` (if present) > hash of deterministic fields.
    pub fn key(&self) -> String {
        if let Some(id) = self.id {
            return format!("id:{}", id);
        }

        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.portfolio.as_str());
        hasher.update([0u8]);
        hasher.update(self.security.as_str());
        hasher.update([0u8]);
        hasher.update(self.timestamp.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        hasher.update(self.count.to_le_bytes());
        if let Some(trade_id) = &self.trade_id {
            hasher.update(trade_id.as_bytes());
        }
        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }

    /// Currency of the first trade cash flow, if any.
    pub fn currency(&self) -> Option<&Currency> {
        self.cash_flows.first().map(|cf| &cf.currency)
    }
}
