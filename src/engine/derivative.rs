//! Daily variation-margin ledger of a derivative contract.

use crate::domain::{CashFlowType, Decimal, SecurityEventCashFlow, Transaction};
use crate::error::EngineError;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use tracing::warn;

/// Maps instants to exchange trading days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingCalendar {
    pub timezone: Tz,
    /// Events up to this local hour (inclusive) belong to the same day,
    /// later ones to the next calendar day.
    pub cutoff_hour: u32,
}

impl TradingCalendar {
    pub fn new(timezone: Tz, cutoff_hour: u32) -> Self {
        Self {
            timezone,
            cutoff_hour,
        }
    }

    pub fn trading_day(&self, instant: DateTime<Utc>) -> NaiveDate {
        let local = instant.with_timezone(&self.timezone);
        let date = local.date_naive();
        if local.hour() <= self.cutoff_hour {
            date
        } else {
            date.succ_opt().unwrap_or(date)
        }
    }
}

impl Default for TradingCalendar {
    fn default() -> Self {
        Self::new(chrono_tz::Europe::Moscow, 18)
    }
}

/// One emitted trading day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeDailyEvents {
    pub date: NaiveDate,
    pub profit: Option<SecurityEventCashFlow>,
    /// That day's transactions in original order, with their cash-flow breakdown.
    pub transactions: Vec<Transaction>,
    /// Profit accumulated up to and including this day.
    pub total_profit: Decimal,
    /// Signed open count at the end of this day.
    pub position: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivativeEvents {
    daily_events: Vec<DerivativeDailyEvents>,
    total_profit: Decimal,
    current_position: i64,
}

impl DerivativeEvents {
    /// Merge transactions and variation-margin events into a per-day ledger.
    ///
    /// # Errors
    /// Fails when `profits` holds anything but `DerivativeProfit` events.
    pub fn new(
        transactions: Vec<Transaction>,
        profits: Vec<SecurityEventCashFlow>,
        calendar: &TradingCalendar,
    ) -> Result<Self, EngineError> {
        let mut transactions_by_day: BTreeMap<NaiveDate, Vec<Transaction>> = BTreeMap::new();
        for transaction in transactions {
            transactions_by_day
                .entry(calendar.trading_day(transaction.timestamp))
                .or_default()
                .push(transaction);
        }

        let mut profit_by_day: BTreeMap<NaiveDate, SecurityEventCashFlow> = BTreeMap::new();
        for profit in profits {
            if profit.kind != CashFlowType::DerivativeProfit {
                return Err(EngineError::UnexpectedEventKind {
                    security: profit.security.clone(),
                    expected: CashFlowType::DerivativeProfit,
                    actual: profit.kind,
                });
            }
            let date = calendar.trading_day(profit.timestamp);
            match profit_by_day.get_mut(&date) {
                Some(existing) => {
                    warn!(
                        "Several variation margin events of {} on {}, merging them",
                        profit.security, date
                    );
                    existing.value += profit.value;
                }
                None => {
                    profit_by_day.insert(date, profit);
                }
            }
        }

        let first = first_key(&transactions_by_day, &profit_by_day);
        let last = last_key(&transactions_by_day, &profit_by_day);
        let mut events = DerivativeEvents::default();
        let (Some(first), Some(last)) = (first, last) else {
            return Ok(events);
        };

        let mut day = first;
        while day <= last {
            let day_transactions = transactions_by_day.remove(&day).unwrap_or_default();
            let profit = profit_by_day.remove(&day);
            let profit_value = profit.as_ref().map(|p| p.value).unwrap_or_default();

            if !day_transactions.is_empty() || !profit_value.is_zero() {
                events.current_position += day_transactions.iter().map(|t| t.count).sum::<i64>();
                events.total_profit += profit_value;
                events.daily_events.push(DerivativeDailyEvents {
                    date: day,
                    profit,
                    transactions: day_transactions,
                    total_profit: events.total_profit,
                    position: events.current_position,
                });
            }

            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        Ok(events)
    }

    pub fn daily_events(&self) -> &[DerivativeDailyEvents] {
        &self.daily_events
    }

    pub fn total_profit(&self) -> Decimal {
        self.total_profit
    }

    pub fn current_position(&self) -> i64 {
        self.current_position
    }
}

fn first_key<A, B>(a: &BTreeMap<NaiveDate, A>, b: &BTreeMap<NaiveDate, B>) -> Option<NaiveDate> {
    match (a.keys().next(), b.keys().next()) {
        (Some(x), Some(y)) => Some(*x.min(y)),
        (x, y) => x.or(y).copied(),
    }
}

fn last_key<A, B>(a: &BTreeMap<NaiveDate, A>, b: &BTreeMap<NaiveDate, B>) -> Option<NaiveDate> {
    match (a.keys().next_back(), b.keys().next_back()) {
        (Some(x), Some(y)) => Some(*x.max(y)),
        (x, y) => x.or(y).copied(),
    }
}
