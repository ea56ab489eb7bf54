use crate::datasource::{SecurityEventSource, TransactionSource};
use crate::domain::{CashFlowType, Security, ViewFilter};
use crate::engine::{DerivativeEvents, TradingCalendar};
use crate::error::EngineError;
use std::sync::Arc;

/// Builds the daily variation-margin ledger of a derivative contract.
#[derive(Debug, Clone)]
pub struct DerivativeEventsFactory {
    transactions: Arc<dyn TransactionSource>,
    events: Arc<dyn SecurityEventSource>,
    calendar: TradingCalendar,
}

impl DerivativeEventsFactory {
    pub fn new(
        transactions: Arc<dyn TransactionSource>,
        events: Arc<dyn SecurityEventSource>,
        calendar: TradingCalendar,
    ) -> Self {
        Self {
            transactions,
            events,
            calendar,
        }
    }

    pub async fn create(
        &self,
        security: &Security,
        filter: &ViewFilter,
    ) -> Result<DerivativeEvents, EngineError> {
        if !security.is_derivative() {
            return Err(EngineError::NotDerivative(security.id.clone()));
        }
        let portfolios = filter.portfolio_list();
        let transactions = self
            .transactions
            .fetch_transactions(&security.id, &portfolios, filter.from, filter.to)
            .await?;
        let profits = self
            .events
            .fetch_events(
                &security.id,
                &portfolios,
                CashFlowType::DerivativeProfit,
                filter.from,
                filter.to,
            )
            .await?;
        DerivativeEvents::new(transactions, profits, &self.calendar)
    }
}
