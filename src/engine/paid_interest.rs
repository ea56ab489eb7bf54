//! Attribution of corporate-action payments to the lots that earned them.
//!
//! The payment's unit count is matched against the position history to find
//! the book-closure instant, and the payment is split pro rata across every
//! lot open at that instant.

use crate::domain::{CashFlowType, Currency, Decimal, SecurityEventCashFlow, ViewFilter};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use super::fifo::FifoPositions;
use super::position::{FictitiousPosition, PositionHistory, PositionKey};

/// Decimal places of per-unit amounts and per-lot slices.
pub const PAYMENT_SCALE: u32 = 6;

/// Payments of one security, keyed by kind then by recipient lot.
#[derive(Debug, Clone, Default)]
pub struct PaidInterest {
    payments: BTreeMap<CashFlowType, BTreeMap<PositionKey, Vec<SecurityEventCashFlow>>>,
    fictitious_positions: BTreeSet<FictitiousPosition>,
    currencies: BTreeSet<Currency>,
}

impl PaidInterest {
    /// Reconcile payment events against a full-history FIFO result.
    ///
    /// `positions` must be built from the whole available history, while only
    /// lots opened inside `filter` are surfaced.
    pub fn new<I>(positions: &FifoPositions, payments: I, filter: &ViewFilter) -> Self
    where
        I: IntoIterator<Item = SecurityEventCashFlow>,
    {
        let mut paid = PaidInterest::default();
        for payment in payments {
            paid.currencies.insert(payment.currency.clone());
            let slices = match book_closure_instant(positions.position_histories(), &payment) {
                Some(instant) => split_by_lots(positions, &payment, instant, filter),
                None => {
                    warn!(
                        "No position of {} units of {} found before {} payment on {}, attributing it to a fictitious position",
                        payment.count, payment.security, payment.kind, payment.timestamp
                    );
                    let fictitious = FictitiousPosition::new(
                        payment.portfolio.clone(),
                        payment.security.clone(),
                        payment.count,
                    );
                    paid.fictitious_positions.insert(fictitious.clone());
                    vec![(PositionKey::Fictitious(fictitious), payment.clone())]
                }
            };

            let by_position = paid.payments.entry(payment.kind).or_default();
            for (key, slice) in slices {
                by_position.entry(key).or_default().push(slice);
            }
        }
        paid
    }

    /// Slices paid to one lot.
    pub fn get(&self, kind: CashFlowType, position: &PositionKey) -> &[SecurityEventCashFlow] {
        self.payments
            .get(&kind)
            .and_then(|by_position| by_position.get(position))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All slices of one kind, keyed by recipient lot.
    pub fn payments(&self, kind: CashFlowType) -> Option<&BTreeMap<PositionKey, Vec<SecurityEventCashFlow>>> {
        self.payments.get(&kind)
    }

    /// Every slice of every kind, in (kind, lot) order.
    pub fn all_slices(&self) -> impl Iterator<Item = &SecurityEventCashFlow> + '_ {
        self.payments
            .values()
            .flat_map(|by_position| by_position.values())
            .flatten()
    }

    pub fn total(&self, kind: CashFlowType) -> Decimal {
        self.payments
            .get(&kind)
            .map(|by_position| by_position.values().flatten().map(|s| s.value).sum::<Decimal>())
            .unwrap_or_default()
    }

    /// Placeholder lots used for payments the history could not explain.
    pub fn fictitious_positions(&self) -> &BTreeSet<FictitiousPosition> {
        &self.fictitious_positions
    }

    pub fn currencies(&self) -> &BTreeSet<Currency> {
        &self.currencies
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }
}

/// Instant right after the latest transaction that left exactly the paid
/// count open, strictly before the payment.
///
/// Only the last entry of a timestamp describes the state after it, so
/// earlier entries sharing that timestamp never match.
pub fn book_closure_instant(
    histories: &[PositionHistory],
    payment: &SecurityEventCashFlow,
) -> Option<DateTime<Utc>> {
    if payment.count <= 0 {
        return None;
    }
    histories
        .iter()
        .enumerate()
        .rev()
        .filter(|(i, h)| {
            histories
                .get(i + 1)
                .map_or(true, |next| next.timestamp != h.timestamp)
        })
        .map(|(_, h)| h)
        .find(|h| h.open_positions == payment.count && h.timestamp < payment.timestamp)
        .map(|h| h.timestamp + Duration::nanoseconds(1))
}

fn per_unit_amount(payment: &SecurityEventCashFlow) -> Option<Decimal> {
    if payment.count == 0 {
        return None;
    }
    Some((payment.value / Decimal::from(payment.count)).round_half_up(PAYMENT_SCALE))
}

fn slice_value(per_unit: Decimal, count: u64) -> Decimal {
    (per_unit * Decimal::from(count)).round_half_up(PAYMENT_SCALE)
}

fn split_by_lots(
    positions: &FifoPositions,
    payment: &SecurityEventCashFlow,
    instant: DateTime<Utc>,
    filter: &ViewFilter,
) -> Vec<(PositionKey, SecurityEventCashFlow)> {
    // count > 0 is guaranteed by book_closure_instant
    let Some(per_unit) = per_unit_amount(payment) else {
        return Vec::new();
    };

    positions
        .positions()
        .filter(|p| p.was_opened_at_the_instant(instant))
        .filter(|p| {
            let inside = filter.contains(p.open_transaction().timestamp);
            if !inside {
                debug!(
                    "Lot opened at {} is outside the report window, hiding its {} slice",
                    p.open_transaction().timestamp,
                    payment.kind
                );
            }
            inside
        })
        .map(|p| {
            let count = p.count();
            let slice = payment.slice(slice_value(per_unit, count), count as i64);
            (p.key(), slice)
        })
        .collect()
}
