use crate::domain::{CashFlowType, SecurityEventCashFlow, Transaction};
use crate::error::EngineError;
use std::collections::VecDeque;
use tracing::{debug, warn};

use super::position::{ClosedId, ClosedPosition, LotId, OpenedPosition, Position, PositionHistory};

/// FIFO lot matching result for one (security, portfolio set) scope.
///
/// Lots live in an arena and are only mutated while `new` runs; afterwards
/// the value is read-only and shared by reference.
#[derive(Debug, Clone)]
pub struct FifoPositions {
    transactions: Vec<Transaction>,
    redemptions: Vec<SecurityEventCashFlow>,
    lots: Vec<OpenedPosition>,
    /// Still-open lots, oldest first.
    opened: VecDeque<LotId>,
    closed: Vec<ClosedPosition>,
    histories: Vec<PositionHistory>,
    unreconciled_redemption: Option<i64>,
}

impl FifoPositions {
    /// Match transactions (and then redemptions) in order.
    ///
    /// Callers must supply transactions sorted by `TransactionOrderingKey`
    /// and redemptions sorted by timestamp.
    ///
    /// # Errors
    /// Fails on a non-redemption event in `redemptions` or on a lot sign flip.
    pub fn new(
        transactions: VecDeque<Transaction>,
        redemptions: VecDeque<SecurityEventCashFlow>,
    ) -> Result<Self, EngineError> {
        let mut positions = FifoPositions {
            transactions: transactions.into(),
            redemptions: redemptions.into(),
            lots: Vec::new(),
            opened: VecDeque::new(),
            closed: Vec::new(),
            histories: Vec::new(),
            unreconciled_redemption: None,
        };

        let transactions = positions.transactions.clone();
        positions.append_histories(&transactions);
        for transaction in transactions {
            positions.process_transaction(transaction, CashFlowType::Price)?;
        }

        if !positions.redemptions.is_empty() {
            positions.process_redemptions()?;
        }

        Ok(positions)
    }

    fn append_histories(&mut self, transactions: &[Transaction]) {
        let mut open_positions = self.current_open_positions_count();
        for transaction in transactions {
            open_positions += transaction.count;
            self.histories.push(PositionHistory {
                timestamp: transaction.timestamp,
                open_positions,
            });
        }
    }

    fn process_redemptions(&mut self) -> Result<(), EngineError> {
        let mut synthetic = Vec::with_capacity(self.redemptions.len());
        for event in &self.redemptions {
            if event.kind != CashFlowType::Redemption {
                return Err(EngineError::UnexpectedEventKind {
                    security: event.security.clone(),
                    expected: CashFlowType::Redemption,
                    actual: event.kind,
                });
            }
            synthetic.push(Transaction::synthetic(
                event.portfolio.clone(),
                event.security.clone(),
                -event.count,
                event.timestamp,
            ));
        }

        self.append_histories(&synthetic);
        for transaction in synthetic {
            self.process_transaction(transaction, CashFlowType::Redemption)?;
        }

        let residual = self.current_open_positions_count();
        if !self.opened.is_empty() || residual != 0 {
            let security = self
                .redemptions
                .first()
                .map(|e| e.security.to_string())
                .unwrap_or_default();
            warn!(
                "Redemption of {} leaves {} units open in {} lots; transaction history is probably incomplete",
                security,
                residual,
                self.opened.len()
            );
            self.unreconciled_redemption = Some(residual);
        }
        Ok(())
    }

    fn process_transaction(
        &mut self,
        transaction: Transaction,
        closing_event: CashFlowType,
    ) -> Result<(), EngineError> {
        if transaction.count == 0 {
            debug!("Skipping zero-count transaction {}", transaction.key());
            return Ok(());
        }

        if self.is_increase(&transaction) {
            let count = transaction.count;
            self.open_lot(transaction, count);
            return Ok(());
        }

        let mut remaining = transaction.count;
        while remaining != 0 {
            let Some(lot_id) = self.opened.pop_front() else {
                break;
            };
            let lot = &mut self.lots[lot_id.0];
            let matched = lot.count().min(remaining.unsigned_abs());
            lot.close(matched)?;
            let exhausted = lot.unclosed_positions() == 0;

            if matched > 0 {
                let open_transaction = lot.open_transaction.clone();
                let id = ClosedId(self.closed.len());
                self.closed.push(ClosedPosition {
                    id,
                    opened: lot_id,
                    open_transaction,
                    close_transaction: transaction.clone(),
                    count: matched,
                    closing_event,
                });
                // matched <= |remaining|
                remaining -= remaining.signum() * matched as i64;
            }

            if !exhausted {
                self.opened.push_front(lot_id);
            }
        }

        if remaining != 0 {
            debug!(
                "Transaction {} closes {} units more than known lots hold, opening leftover lot",
                transaction.key(),
                remaining.unsigned_abs()
            );
            self.open_lot(transaction, remaining);
        }
        Ok(())
    }

    fn is_increase(&self, transaction: &Transaction) -> bool {
        match self.opened.front() {
            None => true,
            Some(lot_id) => {
                let unclosed = self.lots[lot_id.0].unclosed_positions();
                unclosed == 0 || unclosed.signum() == transaction.count.signum()
            }
        }
    }

    fn open_lot(&mut self, transaction: Transaction, unclosed_positions: i64) {
        let id = LotId(self.lots.len());
        self.lots
            .push(OpenedPosition::new(id, transaction, unclosed_positions));
        self.opened.push_back(id);
    }

    /// Lots still open, oldest first.
    pub fn opened_positions(&self) -> impl Iterator<Item = &OpenedPosition> + '_ {
        self.opened.iter().map(move |id| &self.lots[id.0])
    }

    /// Closed pairings in creation order.
    pub fn closed_positions(&self) -> &[ClosedPosition] {
        &self.closed
    }

    /// Closed lots first (creation order), then open lots (oldest first).
    pub fn positions(&self) -> impl Iterator<Item = Position<'_>> + '_ {
        self.closed
            .iter()
            .map(Position::Closed)
            .chain(self.opened_positions().map(Position::Opened))
    }

    pub fn position_histories(&self) -> &[PositionHistory] {
        &self.histories
    }

    /// Open count after the last transaction (and redemption).
    pub fn current_open_positions_count(&self) -> i64 {
        self.histories
            .last()
            .map(|h| h.open_positions)
            .unwrap_or(0)
    }

    /// The matched input, without engine-made transactions.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn redemptions(&self) -> &[SecurityEventCashFlow] {
        &self.redemptions
    }

    pub fn lot(&self, id: LotId) -> Option<&OpenedPosition> {
        self.lots.get(id.0)
    }

    pub fn closed(&self, id: ClosedId) -> Option<&ClosedPosition> {
        self.closed.get(id.0)
    }

    /// Units still open after every redemption, when that count is not zero.
    pub fn unreconciled_redemption(&self) -> Option<i64> {
        self.unreconciled_redemption
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty() && self.redemptions.is_empty()
    }
}
