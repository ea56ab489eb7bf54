//! Money-weighted return of one instrument over a reporting window.
//!
//! Cash flows: every trade (converted at the trade date's rate), every
//! attributed payment slice and redemption, and the mark-to-market value of
//! what is still open at the window end.

use crate::datasource::{CurrencyConverter, QuoteSource, SecurityEventSource};
use crate::domain::{Currency, Decimal, Security, SecurityId, ViewFilter};
use crate::engine::{xirr, DatedCashFlow, XirrSettings};
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use super::paid_interest::PaidInterestFactory;
use super::positions_factory::FifoPositionsFactory;

#[derive(Debug, Clone)]
pub struct InternalRateOfReturn {
    positions: Arc<FifoPositionsFactory>,
    paid_interest: Arc<PaidInterestFactory>,
    converter: Arc<dyn CurrencyConverter>,
    quotes: Arc<dyn QuoteSource>,
    settings: XirrSettings,
}

impl InternalRateOfReturn {
    pub fn new(
        positions: Arc<FifoPositionsFactory>,
        events: Arc<dyn SecurityEventSource>,
        converter: Arc<dyn CurrencyConverter>,
        quotes: Arc<dyn QuoteSource>,
        settings: XirrSettings,
    ) -> Self {
        let paid_interest = Arc::new(PaidInterestFactory::new(Arc::clone(&positions), events));
        Self {
            positions,
            paid_interest,
            converter,
            quotes,
            settings,
        }
    }

    /// Annual return in percent rounded to 2 places, `None` when undefined.
    ///
    /// Never fails: missing data and solver divergence are logged and
    /// reported as `None`.
    pub async fn calculate(&self, security: &Security, filter: &ViewFilter) -> Option<Decimal> {
        if security.is_derivative() {
            debug!("IRR is not defined for derivative {}", security.id);
            return None;
        }
        match self.try_calculate(security, filter).await {
            Ok(rate) => rate,
            Err(e) => {
                warn!("Failed to calculate IRR of {}: {:#}", security.id, e);
                None
            }
        }
    }

    pub async fn calculate_all(
        &self,
        securities: &[Security],
        filter: &ViewFilter,
    ) -> Vec<(SecurityId, Option<Decimal>)> {
        join_all(securities.iter().map(|security| async move {
            (security.id.clone(), self.calculate(security, filter).await)
        }))
        .await
    }

    async fn try_calculate(
        &self,
        security: &Security,
        filter: &ViewFilter,
    ) -> anyhow::Result<Option<Decimal>> {
        let positions = self
            .positions
            .get(security, filter)
            .await
            .context("matching transactions")?;

        let Some(currency) = positions
            .transactions()
            .iter()
            .find_map(|t| t.currency())
            .cloned()
        else {
            warn!("No trade currency known for {}, IRR is undefined", security.id);
            return Ok(None);
        };

        let mut flows = Vec::new();
        for transaction in positions.transactions() {
            let mut value = Decimal::zero();
            for cash_flow in &transaction.cash_flows {
                value += self
                    .convert(
                        cash_flow.value,
                        &cash_flow.currency,
                        &currency,
                        Some(date_of(transaction.timestamp)),
                    )
                    .await?;
            }
            flows.push(dated(transaction.timestamp, value)?);
        }

        let paid = self
            .paid_interest
            .create(security, filter)
            .await
            .context("reconciling payments")?;
        for slice in paid.all_slices() {
            let value = self
                .convert(
                    slice.value,
                    &slice.currency,
                    &currency,
                    Some(date_of(slice.timestamp)),
                )
                .await?;
            flows.push(dated(slice.timestamp, value)?);
        }

        for redemption in positions.redemptions() {
            let value = self
                .convert(
                    redemption.value,
                    &redemption.currency,
                    &currency,
                    Some(date_of(redemption.timestamp)),
                )
                .await?;
            flows.push(dated(redemption.timestamp, value)?);
        }

        let open = positions.current_open_positions_count();
        if open != 0 {
            let Some(quote) = self
                .quotes
                .quote(&security.id)
                .await
                .context("loading quote")?
            else {
                warn!("No quote for {} with {} units open, IRR is undefined", security.id, open);
                return Ok(None);
            };
            let market_value = Decimal::from(open) * quote.dirty_price();
            let value = self
                .convert(market_value, &quote.currency, &currency, None)
                .await?;
            flows.push(dated(filter.to, value)?);
        }

        let result = xirr(&flows, &self.settings);
        match result.value() {
            Some(rate) => {
                debug!(
                    "IRR of {} converged to {} after {} iterations",
                    security.id, rate, result.iterations
                );
                let fraction = Decimal::from_f64(rate).context("rate out of range")?;
                Ok(Some((fraction * Decimal::hundred()).round_half_up(2)))
            }
            None => {
                warn!(
                    "IRR of {} did not converge over {} cash flows",
                    security.id,
                    flows.len()
                );
                Ok(None)
            }
        }
    }

    /// `value` expressed in `to`, at the rate of `date` or the current rate.
    async fn convert(
        &self,
        value: Decimal,
        from: &Currency,
        to: &Currency,
        date: Option<NaiveDate>,
    ) -> anyhow::Result<Decimal> {
        if from == to {
            return Ok(value);
        }
        let rate = match date {
            Some(date) => self.converter.rate_at(from, to, date).await,
            None => self.converter.rate(from, to).await,
        }
        .with_context(|| format!("converting {} to {}", from, to))?;
        Ok(value * rate)
    }
}

fn date_of(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

fn dated(instant: DateTime<Utc>, value: Decimal) -> anyhow::Result<DatedCashFlow> {
    let amount = value
        .to_f64()
        .with_context(|| format!("cash flow {} is not representable", value))?;
    Ok(DatedCashFlow::new(date_of(instant), amount))
}
