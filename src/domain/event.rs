//! Cash-flow kinds and security event cash flows (dividends, coupons, margin...).

use crate::domain::{Currency, Decimal, PortfolioId, SecurityId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a cash flow, either part of a trade or a standalone security event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashFlowType {
    /// Trade price; also the closing kind of an ordinary sale.
    Price,
    AccruedInterest,
    Commission,
    DerivativePrice,
    DerivativeQuote,
    Coupon,
    Amortization,
    Dividend,
    Redemption,
    Tax,
    /// Daily variation margin on a derivative contract.
    DerivativeProfit,
}

impl CashFlowType {
    /// Event kinds reconciled against lots by book-closure inference.
    pub const PAYMENTS: [CashFlowType; 4] = [
        CashFlowType::Coupon,
        CashFlowType::Amortization,
        CashFlowType::Dividend,
        CashFlowType::Tax,
    ];
}

impl std::fmt::Display for CashFlowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CashFlowType::Price => "PRICE",
            CashFlowType::AccruedInterest => "ACCRUED_INTEREST",
            CashFlowType::Commission => "COMMISSION",
            CashFlowType::DerivativePrice => "DERIVATIVE_PRICE",
            CashFlowType::DerivativeQuote => "DERIVATIVE_QUOTE",
            CashFlowType::Coupon => "COUPON",
            CashFlowType::Amortization => "AMORTIZATION",
            CashFlowType::Dividend => "DIVIDEND",
            CashFlowType::Redemption => "REDEMPTION",
            CashFlowType::Tax => "TAX",
            CashFlowType::DerivativeProfit => "DERIVATIVE_PROFIT",
        };
        write!(f, "{}", name)
    }
}

/// A cash event tied to a security (payment, redemption, variation margin).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEventCashFlow {
    pub id: Option<i64>,
    pub portfolio: PortfolioId,
    pub security: SecurityId,
    pub kind: CashFlowType,
    pub timestamp: DateTime<Utc>,
    /// Signed value, positive when received.
    pub value: Decimal,
    pub currency: Currency,
    /// Units the payment is computed over; zero for pure cash events.
    pub count: i64,
}

impl SecurityEventCashFlow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Option<i64>,
        portfolio: PortfolioId,
        security: SecurityId,
        kind: CashFlowType,
        timestamp: DateTime<Utc>,
        value: Decimal,
        currency: Currency,
        count: i64,
    ) -> Self {
        Self {
            id,
            portfolio,
            security,
            kind,
            timestamp,
            value,
            currency,
            count,
        }
    }

    /// Copy of this event carrying a different value and count (a per-lot slice).
    pub fn slice(&self, value: Decimal, count: i64) -> Self {
        Self {
            value,
            count,
            ..self.clone()
        }
    }
}
