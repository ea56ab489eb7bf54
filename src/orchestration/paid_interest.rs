use crate::datasource::SecurityEventSource;
use crate::domain::{CashFlowType, Security, ViewFilter};
use crate::engine::PaidInterest;
use crate::error::EngineError;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

use super::positions_factory::FifoPositionsFactory;

/// Loads payments of a security and reconciles them against its lots.
#[derive(Debug, Clone)]
pub struct PaidInterestFactory {
    positions: Arc<FifoPositionsFactory>,
    events: Arc<dyn SecurityEventSource>,
}

impl PaidInterestFactory {
    pub fn new(positions: Arc<FifoPositionsFactory>, events: Arc<dyn SecurityEventSource>) -> Self {
        Self { positions, events }
    }

    /// Payments inside `filter`, attributed against the full position history.
    pub async fn create(
        &self,
        security: &Security,
        filter: &ViewFilter,
    ) -> Result<PaidInterest, EngineError> {
        let positions = self.positions.get_full_history(security, filter).await?;
        let portfolios = filter.portfolio_list();

        let fetches = CashFlowType::PAYMENTS.iter().map(|kind| {
            self.events
                .fetch_events(&security.id, &portfolios, *kind, filter.from, filter.to)
        });
        let payments: Vec<_> = try_join_all(fetches).await?.into_iter().flatten().collect();

        debug!("Reconciling {} payments of {}", payments.len(), security.id);
        Ok(PaidInterest::new(&positions, payments, filter))
    }
}
