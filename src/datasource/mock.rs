//! In-memory data source for tests and embedding without storage.

use super::{
    CurrencyConverter, DataSourceError, QuoteSource, SecurityEventSource, SecurityQuote,
    TransactionSource,
};
use crate::domain::{
    sort_transactions_deterministic, CashFlowType, Currency, Decimal, PortfolioId,
    SecurityEventCashFlow, SecurityId, Transaction,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock data source that serves predefined data through every collaborator trait.
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    transactions: Vec<Transaction>,
    events: Vec<SecurityEventCashFlow>,
    rates: HashMap<(Currency, Currency), Decimal>,
    dated_rates: HashMap<(Currency, Currency, NaiveDate), Decimal>,
    quotes: HashMap<SecurityId, SecurityQuote>,
    transaction_fetches: Arc<AtomicUsize>,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transactions.push(transaction);
        self
    }

    pub fn with_transactions(mut self, transactions: Vec<Transaction>) -> Self {
        self.transactions.extend(transactions);
        self
    }

    pub fn with_event(mut self, event: SecurityEventCashFlow) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_events(mut self, events: Vec<SecurityEventCashFlow>) -> Self {
        self.events.extend(events);
        self
    }

    /// Set the current rate of `base` expressed in `quote`.
    pub fn with_rate(mut self, base: &str, quote: &str, rate: Decimal) -> Self {
        self.rates
            .insert((Currency::new(base), Currency::new(quote)), rate);
        self
    }

    pub fn with_rate_at(mut self, base: &str, quote: &str, date: NaiveDate, rate: Decimal) -> Self {
        self.dated_rates
            .insert((Currency::new(base), Currency::new(quote), date), rate);
        self
    }

    pub fn with_quote(mut self, quote: SecurityQuote) -> Self {
        self.quotes.insert(quote.security.clone(), quote);
        self
    }

    /// Number of transaction fetches served so far (both trait methods).
    pub fn transaction_fetches(&self) -> usize {
        self.transaction_fetches.load(Ordering::SeqCst)
    }

    fn select_transactions<F>(
        &self,
        matches_security: F,
        portfolios: &[PortfolioId],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Transaction>
    where
        F: Fn(&SecurityId) -> bool,
    {
        self.transaction_fetches.fetch_add(1, Ordering::SeqCst);
        let mut selected: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| {
                matches_security(&t.security)
                    && (portfolios.is_empty() || portfolios.contains(&t.portfolio))
                    && t.timestamp >= from
                    && t.timestamp < to
            })
            .cloned()
            .collect();
        sort_transactions_deterministic(&mut selected);
        selected
    }
}

#[async_trait]
impl TransactionSource for MockDataSource {
    async fn fetch_transactions(
        &self,
        security: &SecurityId,
        portfolios: &[PortfolioId],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, DataSourceError> {
        Ok(self.select_transactions(|s| s == security, portfolios, from, to))
    }

    async fn fetch_currency_pair_transactions(
        &self,
        currency_pair: &str,
        portfolios: &[PortfolioId],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, DataSourceError> {
        let pair = currency_pair.to_ascii_uppercase();
        Ok(self.select_transactions(
            |s| s.as_str().to_ascii_uppercase().starts_with(&pair),
            portfolios,
            from,
            to,
        ))
    }
}

#[async_trait]
impl SecurityEventSource for MockDataSource {
    async fn fetch_events(
        &self,
        security: &SecurityId,
        portfolios: &[PortfolioId],
        kind: CashFlowType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SecurityEventCashFlow>, DataSourceError> {
        let mut selected: Vec<SecurityEventCashFlow> = self
            .events
            .iter()
            .filter(|e| {
                &e.security == security
                    && e.kind == kind
                    && (portfolios.is_empty() || portfolios.contains(&e.portfolio))
                    && e.timestamp >= from
                    && e.timestamp < to
            })
            .cloned()
            .collect();
        selected.sort_by_key(|e| e.timestamp);
        Ok(selected)
    }
}

#[async_trait]
impl CurrencyConverter for MockDataSource {
    async fn rate(&self, base: &Currency, quote: &Currency) -> Result<Decimal, DataSourceError> {
        if base == quote {
            return Ok(Decimal::one());
        }
        if let Some(rate) = self.rates.get(&(base.clone(), quote.clone())) {
            return Ok(*rate);
        }
        match self.rates.get(&(quote.clone(), base.clone())) {
            Some(inverse) if !inverse.is_zero() => Ok(Decimal::one() / *inverse),
            _ => Err(DataSourceError::RateUnavailable {
                base: base.clone(),
                quote: quote.clone(),
            }),
        }
    }

    async fn rate_at(
        &self,
        base: &Currency,
        quote: &Currency,
        date: NaiveDate,
    ) -> Result<Decimal, DataSourceError> {
        if base == quote {
            return Ok(Decimal::one());
        }
        match self
            .dated_rates
            .get(&(base.clone(), quote.clone(), date))
        {
            Some(rate) => Ok(*rate),
            // no historical value: fall back to the current rate
            None => self.rate(base, quote).await,
        }
    }
}

#[async_trait]
impl QuoteSource for MockDataSource {
    async fn quote(&self, security: &SecurityId) -> Result<Option<SecurityQuote>, DataSourceError> {
        Ok(self.quotes.get(security).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
    }

    fn tx(id: i64, security: &str, day: u32) -> Transaction {
        Transaction::new(
            Some(id),
            PortfolioId::new("acc"),
            SecurityId::new(security),
            1,
            at(day),
        )
    }

    #[tokio::test]
    async fn test_fetch_transactions_filters_and_sorts() {
        let mock = MockDataSource::new().with_transactions(vec![
            tx(2, "SBER", 3),
            tx(1, "SBER", 1),
            tx(3, "GAZP", 2),
            tx(4, "SBER", 20),
        ]);
        let found = mock
            .fetch_transactions(&SecurityId::new("SBER"), &[], at(1), at(10))
            .await
            .unwrap();
        assert_eq!(found.iter().map(|t| t.id).collect::<Vec<_>>(), vec![Some(1), Some(2)]);
        assert_eq!(mock.transaction_fetches(), 1);
    }

    #[tokio::test]
    async fn test_fetch_currency_pair_transactions_merges_contracts() {
        let mock = MockDataSource::new().with_transactions(vec![
            tx(1, "USDRUB_TOM", 2),
            tx(2, "USDRUB_TOD", 1),
            tx(3, "EURRUB_TOM", 1),
        ]);
        let found = mock
            .fetch_currency_pair_transactions("USDRUB", &[], at(1), at(10))
            .await
            .unwrap();
        assert_eq!(found.iter().map(|t| t.id).collect::<Vec<_>>(), vec![Some(2), Some(1)]);
    }

    #[tokio::test]
    async fn test_rates_with_inverse_and_fallback() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let mock = MockDataSource::new()
            .with_rate("USD", "RUB", Decimal::from(100i64))
            .with_rate_at("USD", "RUB", date, Decimal::from(90i64));
        let usd = Currency::new("USD");
        let rub = Currency::new("RUB");

        assert_eq!(mock.rate(&usd, &usd).await.unwrap(), Decimal::one());
        assert_eq!(mock.rate(&usd, &rub).await.unwrap(), Decimal::from(100i64));
        assert_eq!(
            mock.rate(&rub, &usd).await.unwrap(),
            Decimal::from_str_canonical("0.01").unwrap()
        );
        assert_eq!(mock.rate_at(&usd, &rub, date).await.unwrap(), Decimal::from(90i64));
        let other_day = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        assert_eq!(mock.rate_at(&usd, &rub, other_day).await.unwrap(), Decimal::from(100i64));
        assert!(mock.rate(&usd, &Currency::new("EUR")).await.is_err());
    }
}
