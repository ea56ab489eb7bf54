//! Memoized FIFO matching per (instrument, portfolios, window).

use crate::datasource::{SecurityEventSource, TransactionSource};
use crate::domain::ordering::is_sorted_deterministic;
use crate::domain::{
    sort_transactions_deterministic, CashFlowType, PortfolioId, Security, SecurityType, ViewFilter,
};
use crate::engine::FifoPositions;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Cache key of one matcher run.
///
/// Contracts of one currency pair share the pair name as instrument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FifoPositionsKey {
    pub security_type: SecurityType,
    pub instrument: String,
    /// Sorted; empty means every portfolio.
    pub portfolios: Vec<PortfolioId>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl FifoPositionsKey {
    pub fn new(security: &Security, filter: &ViewFilter) -> Self {
        let instrument = security
            .currency_pair()
            .unwrap_or_else(|| security.id.as_str().to_string());
        Self {
            security_type: security.security_type,
            instrument,
            portfolios: filter.portfolio_list(),
            from: filter.from,
            to: filter.to,
        }
    }
}

type Slot = Arc<OnceCell<Arc<FifoPositions>>>;

/// Builds and caches `FifoPositions`.
///
/// The first caller of a key computes the result; concurrent callers of the
/// same key await that computation. A failed computation leaves its slot
/// empty, so the next call retries.
#[derive(Debug)]
pub struct FifoPositionsFactory {
    transactions: Arc<dyn TransactionSource>,
    events: Arc<dyn SecurityEventSource>,
    cache: DashMap<FifoPositionsKey, Slot>,
}

impl FifoPositionsFactory {
    pub fn new(transactions: Arc<dyn TransactionSource>, events: Arc<dyn SecurityEventSource>) -> Self {
        Self {
            transactions,
            events,
            cache: DashMap::new(),
        }
    }

    /// Positions of `security` built from the transactions inside `filter`.
    pub async fn get(
        &self,
        security: &Security,
        filter: &ViewFilter,
    ) -> Result<Arc<FifoPositions>, EngineError> {
        let key = FifoPositionsKey::new(security, filter);
        // The map guard must be released before awaiting.
        let slot: Slot = self.cache.entry(key).or_default().value().clone();
        let positions = slot
            .get_or_try_init(|| self.load(security, filter))
            .await?;
        Ok(Arc::clone(positions))
    }

    /// Positions built from the whole history up to `filter.to`.
    ///
    /// Payment attribution needs lots opened before the window.
    pub async fn get_full_history(
        &self,
        security: &Security,
        filter: &ViewFilter,
    ) -> Result<Arc<FifoPositions>, EngineError> {
        self.get(security, &filter.since_beginning()).await
    }

    /// Drop every cached result.
    pub fn invalidate(&self) {
        let dropped = self.cache.len();
        self.cache.clear();
        info!("Invalidated {} cached position sets", dropped);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    async fn load(
        &self,
        security: &Security,
        filter: &ViewFilter,
    ) -> Result<Arc<FifoPositions>, EngineError> {
        let portfolios = filter.portfolio_list();
        let mut transactions = match security.currency_pair() {
            Some(pair) => {
                self.transactions
                    .fetch_currency_pair_transactions(&pair, &portfolios, filter.from, filter.to)
                    .await?
            }
            None => {
                self.transactions
                    .fetch_transactions(&security.id, &portfolios, filter.from, filter.to)
                    .await?
            }
        };
        if !is_sorted_deterministic(&transactions) {
            debug!("Transactions of {} arrived out of order, sorting", security.id);
            sort_transactions_deterministic(&mut transactions);
        }

        // Currency contracts are never redeemed; the result must not depend
        // on which contract of the pair was asked for.
        let mut redemptions = if security.currency_pair().is_some() {
            Vec::new()
        } else {
            self.events
                .fetch_events(
                    &security.id,
                    &portfolios,
                    CashFlowType::Redemption,
                    filter.from,
                    filter.to,
                )
                .await?
        };
        redemptions.sort_by_key(|e| e.timestamp);

        debug!(
            "Matching {} transactions and {} redemptions of {}",
            transactions.len(),
            redemptions.len(),
            security.id
        );
        let positions = FifoPositions::new(transactions.into(), redemptions.into())?;
        Ok(Arc::new(positions))
    }
}
