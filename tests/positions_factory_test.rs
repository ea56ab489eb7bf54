use chrono::{DateTime, TimeZone, Utc};
use lotbook::{
    CashFlowType, Currency, Decimal, FifoPositionsFactory, MockDataSource, PortfolioId, Security,
    SecurityEventCashFlow, SecurityId, SecurityType, Transaction, ViewFilter,
};
use std::sync::Arc;

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, day, 9, 30, 0).unwrap()
}

fn tx(id: i64, portfolio: &str, security: &str, count: i64, day: u32) -> Transaction {
    Transaction::new(
        Some(id),
        PortfolioId::new(portfolio),
        SecurityId::new(security),
        count,
        at(day),
    )
}

fn window() -> ViewFilter {
    ViewFilter::new(at(1), at(30))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_computation() {
    let source = MockDataSource::new().with_transactions(vec![
        tx(1, "acc", "SBER", 10, 2),
        tx(2, "acc", "SBER", -4, 3),
    ]);
    let shared = Arc::new(source.clone());
    let factory = Arc::new(FifoPositionsFactory::new(shared.clone(), shared));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let factory = Arc::clone(&factory);
            tokio::spawn(async move {
                let security = Security::new("SBER", SecurityType::Stock);
                factory.get(&security, &window()).await.unwrap()
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(source.transaction_fetches(), 1);
    assert!(results.iter().all(|p| Arc::ptr_eq(p, &results[0])));
    assert_eq!(results[0].current_open_positions_count(), 6);
    assert_eq!(factory.len(), 1);
}

#[tokio::test]
async fn test_invalidate_forces_reload() {
    let source = MockDataSource::new().with_transaction(tx(1, "acc", "SBER", 10, 2));
    let shared = Arc::new(source.clone());
    let factory = FifoPositionsFactory::new(shared.clone(), shared);
    let security = Security::new("SBER", SecurityType::Stock);

    let before = factory.get(&security, &window()).await.unwrap();
    factory.invalidate();
    assert!(factory.is_empty());
    let after = factory.get(&security, &window()).await.unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(source.transaction_fetches(), 2);
}

#[tokio::test]
async fn test_windows_and_portfolios_are_separate_keys() {
    let source = MockDataSource::new().with_transactions(vec![
        tx(1, "acc", "SBER", 10, 2),
        tx(2, "iis", "SBER", 5, 10),
    ]);
    let shared = Arc::new(source.clone());
    let factory = FifoPositionsFactory::new(shared.clone(), shared);
    let security = Security::new("SBER", SecurityType::Stock);

    let all = factory.get(&security, &window()).await.unwrap();
    assert_eq!(all.current_open_positions_count(), 15);

    let iis = window().with_portfolios([PortfolioId::new("iis")]);
    let only_iis = factory.get(&security, &iis).await.unwrap();
    assert_eq!(only_iis.current_open_positions_count(), 5);

    let late = ViewFilter::new(at(5), at(30));
    let windowed = factory.get(&security, &late).await.unwrap();
    assert_eq!(windowed.transactions().len(), 1);

    let full = factory.get_full_history(&security, &late).await.unwrap();
    assert_eq!(full.transactions().len(), 2);

    assert_eq!(factory.len(), 4);
    assert_eq!(source.transaction_fetches(), 4);
}

#[tokio::test]
async fn test_currency_pair_contracts_are_merged() {
    let source = MockDataSource::new().with_transactions(vec![
        tx(1, "acc", "USDRUB_TOM", 1000, 2),
        tx(2, "acc", "USDRUB_TOD", -400, 3),
        tx(3, "acc", "EURRUB_TOM", 50, 3),
    ]);
    let shared = Arc::new(source.clone());
    let factory = FifoPositionsFactory::new(shared.clone(), shared);

    let tom = Security::new("USDRUB_TOM", SecurityType::CurrencyPair);
    let positions = factory.get(&tom, &window()).await.unwrap();
    assert_eq!(positions.transactions().len(), 2);
    assert_eq!(positions.closed_positions().len(), 1);
    assert_eq!(positions.closed_positions()[0].count, 400);
    assert_eq!(positions.current_open_positions_count(), 600);

    // the other contract of the same pair hits the same cache entry
    let tod = Security::new("USDRUB_TOD", SecurityType::CurrencyPair);
    let again = factory.get(&tod, &window()).await.unwrap();
    assert!(Arc::ptr_eq(&positions, &again));
    assert_eq!(source.transaction_fetches(), 1);
}

#[tokio::test]
async fn test_currency_pair_ignores_contract_redemptions() {
    let redemption = SecurityEventCashFlow::new(
        None,
        PortfolioId::new("acc"),
        SecurityId::new("USDRUB_TOM"),
        CashFlowType::Redemption,
        at(10),
        Decimal::from(1000i64),
        Currency::new("RUB"),
        1000,
    );
    let source = MockDataSource::new()
        .with_transactions(vec![
            tx(1, "acc", "USDRUB_TOM", 1000, 2),
            tx(2, "acc", "USDRUB_TOD", 500, 3),
        ])
        .with_event(redemption);
    let shared = Arc::new(source);

    for first in ["USDRUB_TOM", "USDRUB_TOD"] {
        let factory = FifoPositionsFactory::new(shared.clone(), shared.clone());
        let security = Security::new(first, SecurityType::CurrencyPair);
        let positions = factory.get(&security, &window()).await.unwrap();
        assert!(positions.redemptions().is_empty());
        assert_eq!(positions.current_open_positions_count(), 1500);
    }
}

#[tokio::test]
async fn test_pair_and_same_named_instrument_are_cached_apart() {
    let source = MockDataSource::new().with_transactions(vec![
        tx(1, "acc", "USDRUB_TOM", 1000, 2),
        tx(2, "acc", "USDRUB", 7, 3),
    ]);
    let shared = Arc::new(source);
    let factory = FifoPositionsFactory::new(shared.clone(), shared);

    let pair = Security::new("USDRUB_TOM", SecurityType::CurrencyPair);
    let asset = Security::new("USDRUB", SecurityType::Asset);
    let from_pair = factory.get(&pair, &window()).await.unwrap();
    let from_asset = factory.get(&asset, &window()).await.unwrap();

    assert!(!Arc::ptr_eq(&from_pair, &from_asset));
    assert_eq!(from_asset.transactions().len(), 1);
    assert_eq!(from_asset.current_open_positions_count(), 7);
    assert_eq!(factory.len(), 2);
}
