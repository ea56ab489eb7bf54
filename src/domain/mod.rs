//! Domain types for the position and cash-flow ledger.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Identifiers: PortfolioId, SecurityId, Currency, Security
//! - Transaction and SecurityEventCashFlow input records
//! - Stable transaction ordering key helper for deterministic processing
//! - The explicit reporting window (ViewFilter)

pub mod decimal;
pub mod event;
pub mod filter;
pub mod ordering;
pub mod primitives;
pub mod transaction;

pub use decimal::Decimal;
pub use event::{CashFlowType, SecurityEventCashFlow};
pub use filter::ViewFilter;
pub use ordering::{sort_transactions_deterministic, TransactionOrderingKey};
pub use primitives::{Currency, PortfolioId, Security, SecurityId, SecurityType};
pub use transaction::{Transaction, TransactionCashFlow};
