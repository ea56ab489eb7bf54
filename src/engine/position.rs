//! Lots, closed pairings and position-count checkpoints.

use crate::domain::{CashFlowType, PortfolioId, SecurityId, Transaction};
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Index of a lot in the matcher's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LotId(pub usize);

/// Index of a closed pairing in the matcher's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ClosedId(pub usize);

/// A lot: one acquisition (or its remainder) tracked for FIFO matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenedPosition {
    pub id: LotId,
    pub open_transaction: Transaction,
    /// Signed count still open. Starts at the transaction's count, or at the
    /// leftover of an over-closing transaction.
    unclosed_positions: i64,
}

impl OpenedPosition {
    pub(crate) fn new(id: LotId, open_transaction: Transaction, unclosed_positions: i64) -> Self {
        Self {
            id,
            open_transaction,
            unclosed_positions,
        }
    }

    pub fn unclosed_positions(&self) -> i64 {
        self.unclosed_positions
    }

    /// Unsigned count still open.
    pub fn count(&self) -> u64 {
        self.unclosed_positions.unsigned_abs()
    }

    /// Open at `instant` iff opened no later than it.
    pub fn was_opened_at_the_instant(&self, instant: DateTime<Utc>) -> bool {
        self.open_transaction.timestamp <= instant
    }

    /// Move `closing` units towards zero.
    ///
    /// # Errors
    /// Fails when the lot does not hold that many units; the sign must never flip.
    pub(crate) fn close(&mut self, closing: u64) -> Result<(), EngineError> {
        if closing > self.count() {
            return Err(EngineError::SignFlip {
                security: self.open_transaction.security.clone(),
                unclosed: self.unclosed_positions,
                closing: i64::try_from(closing).unwrap_or(i64::MAX),
            });
        }
        // closing <= |unclosed| <= i64::MAX, so the cast is lossless
        self.unclosed_positions -= self.unclosed_positions.signum() * closing as i64;
        Ok(())
    }
}

/// One FIFO match step between a lot and a closing transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosedPosition {
    pub id: ClosedId,
    pub opened: LotId,
    pub open_transaction: Transaction,
    pub close_transaction: Transaction,
    /// Matched units, always > 0.
    pub count: u64,
    /// `Price` for an ordinary sale, `Redemption` for a bond redemption.
    pub closing_event: CashFlowType,
}

impl ClosedPosition {
    /// Open at `instant` iff opened no later than it and closed after it.
    pub fn was_opened_at_the_instant(&self, instant: DateTime<Utc>) -> bool {
        self.open_transaction.timestamp <= instant && instant < self.close_transaction.timestamp
    }

    /// Signed count as it was while open (negative for short lots).
    pub fn signed_count(&self) -> i64 {
        let count = self.count as i64;
        if self.open_transaction.count < 0 {
            -count
        } else {
            count
        }
    }
}

/// Cumulative open count right after a transaction was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PositionHistory {
    pub timestamp: DateTime<Utc>,
    pub open_positions: i64,
}

/// Either kind of lot, seen through the questions the reconciler asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position<'a> {
    Opened(&'a OpenedPosition),
    Closed(&'a ClosedPosition),
}

impl<'a> Position<'a> {
    pub fn was_opened_at_the_instant(&self, instant: DateTime<Utc>) -> bool {
        match self {
            Position::Opened(p) => p.was_opened_at_the_instant(instant),
            Position::Closed(p) => p.was_opened_at_the_instant(instant),
        }
    }

    pub fn count(&self) -> u64 {
        match self {
            Position::Opened(p) => p.count(),
            Position::Closed(p) => p.count,
        }
    }

    pub fn open_transaction(&self) -> &'a Transaction {
        match self {
            Position::Opened(p) => &p.open_transaction,
            Position::Closed(p) => &p.open_transaction,
        }
    }

    pub fn key(&self) -> PositionKey {
        match self {
            Position::Opened(p) => PositionKey::Opened(p.id),
            Position::Closed(p) => PositionKey::Closed(p.id),
        }
    }
}

/// Placeholder lot for payments that cannot be attributed to a real lot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FictitiousPosition {
    pub portfolio: PortfolioId,
    pub security: SecurityId,
    pub count: i64,
    pub opened_at: DateTime<Utc>,
}

impl FictitiousPosition {
    pub fn new(portfolio: PortfolioId, security: SecurityId, count: i64) -> Self {
        Self {
            portfolio,
            security,
            count,
            opened_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// Identity of a payment recipient; closed lots sort before open ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PositionKey {
    Closed(ClosedId),
    Opened(LotId),
    Fictitious(FictitiousPosition),
}

impl PositionKey {
    pub fn is_fictitious(&self) -> bool {
        matches!(self, PositionKey::Fictitious(_))
    }
}
