use chrono::{DateTime, Duration, TimeZone, Utc};
use lotbook::engine::{FifoPositions, LotId, PositionHistory};
use lotbook::{CashFlowType, Currency, Decimal, EngineError, PortfolioId, SecurityEventCashFlow, SecurityId, Transaction};
use std::collections::VecDeque;

fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap() + Duration::days(n)
}

fn tx(id: i64, count: i64, d: i64) -> Transaction {
    Transaction::new(
        Some(id),
        PortfolioId::new("acc"),
        SecurityId::new("RU000A0JX0J2"),
        count,
        day(d),
    )
}

fn redemption(count: i64, d: i64) -> SecurityEventCashFlow {
    SecurityEventCashFlow::new(
        Some(500 + d),
        PortfolioId::new("acc"),
        SecurityId::new("RU000A0JX0J2"),
        CashFlowType::Redemption,
        day(d),
        Decimal::from(count * 1000),
        Currency::new("RUB"),
        count,
    )
}

fn fifo(transactions: Vec<Transaction>) -> FifoPositions {
    FifoPositions::new(transactions.into(), VecDeque::new()).unwrap()
}

#[test]
fn test_simple_round_trip() {
    let positions = fifo(vec![tx(1, 10, 0), tx(2, -10, 5)]);

    assert_eq!(positions.closed_positions().len(), 1);
    assert_eq!(positions.closed_positions()[0].count, 10);
    assert_eq!(positions.closed_positions()[0].closing_event, CashFlowType::Price);
    assert_eq!(positions.opened_positions().count(), 0);
    assert_eq!(
        positions.position_histories(),
        &[
            PositionHistory {
                timestamp: day(0),
                open_positions: 10
            },
            PositionHistory {
                timestamp: day(5),
                open_positions: 0
            },
        ]
    );
    assert_eq!(positions.current_open_positions_count(), 0);
}

#[test]
fn test_partial_fifo() {
    let positions = fifo(vec![tx(1, 10, 0), tx(2, 5, 1), tx(3, -12, 2)]);

    let closed = positions.closed_positions();
    assert_eq!(closed.len(), 2);
    assert_eq!(closed[0].opened, LotId(0));
    assert_eq!(closed[0].count, 10);
    assert_eq!(closed[0].open_transaction.timestamp, day(0));
    assert_eq!(closed[1].opened, LotId(1));
    assert_eq!(closed[1].count, 2);
    assert_eq!(closed[1].open_transaction.timestamp, day(1));

    let opened: Vec<_> = positions.opened_positions().collect();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].id, LotId(1));
    assert_eq!(opened[0].unclosed_positions(), 3);
    assert_eq!(positions.current_open_positions_count(), 3);
}

#[test]
fn test_short_lots_close_on_buy() {
    let positions = fifo(vec![tx(1, -4, 0), tx(2, -6, 1), tx(3, 7, 2)]);

    let closed = positions.closed_positions();
    assert_eq!(closed.len(), 2);
    assert_eq!(closed[0].signed_count(), -4);
    assert_eq!(closed[1].count, 3);

    let opened: Vec<_> = positions.opened_positions().collect();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].unclosed_positions(), -3);
}

#[test]
fn test_over_sell_opens_leftover_lot() {
    let positions = fifo(vec![tx(1, 5, 0), tx(2, -8, 1)]);

    assert_eq!(positions.closed_positions().len(), 1);
    assert_eq!(positions.closed_positions()[0].count, 5);

    let opened: Vec<_> = positions.opened_positions().collect();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].unclosed_positions(), -3);
    assert_eq!(opened[0].open_transaction.id, Some(2));
    assert_eq!(positions.current_open_positions_count(), -3);
}

#[test]
fn test_zero_count_transaction_only_adds_history() {
    let positions = fifo(vec![tx(1, 10, 0), tx(2, 0, 1)]);

    assert_eq!(positions.position_histories().len(), 2);
    assert_eq!(positions.position_histories()[1].open_positions, 10);
    assert_eq!(positions.opened_positions().count(), 1);
    assert!(positions.closed_positions().is_empty());
}

#[test]
fn test_fifo_conserves_counts() {
    let transactions = vec![
        tx(1, 10, 0),
        tx(2, 7, 1),
        tx(3, -3, 2),
        tx(4, 4, 3),
        tx(5, -12, 4),
        tx(6, -1, 5),
        tx(7, 9, 6),
        tx(8, -10, 7),
    ];
    let total: i64 = transactions.iter().map(|t| t.count).sum();
    let positions = fifo(transactions.clone());

    let opened: i64 = positions.opened_positions().map(|p| p.unclosed_positions()).sum();
    assert_eq!(opened, total);
    assert_eq!(positions.current_open_positions_count(), total);

    // every acquisition is accounted for by closings plus what is still open
    let acquired: i64 = transactions.iter().filter(|t| t.count > 0).map(|t| t.count).sum();
    let closed: u64 = positions.closed_positions().iter().map(|c| c.count).sum();
    assert_eq!(closed as i64 + opened, acquired);

    for closed in positions.closed_positions() {
        assert!(closed.count > 0);
        assert!(closed.open_transaction.timestamp <= closed.close_transaction.timestamp);
        let bound = closed
            .open_transaction
            .count
            .unsigned_abs()
            .min(closed.close_transaction.count.unsigned_abs());
        assert!(closed.count <= bound, "closed {} exceeds {}", closed.count, bound);
    }
}

#[test]
fn test_history_timestamps_are_monotonic() {
    let positions = fifo(vec![tx(1, 10, 0), tx(2, -5, 1), tx(3, 5, 1), tx(4, -10, 3)]);
    let histories = positions.position_histories();
    assert_eq!(histories.len(), 4);
    assert!(histories.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(histories.last().unwrap().open_positions, 0);
}

#[test]
fn test_redemption_closes_all_units() {
    let transactions: VecDeque<_> = vec![tx(1, 10, 0), tx(2, 20, 5), tx(3, -5, 10)].into();
    let redemptions: VecDeque<_> = vec![redemption(25, 30)].into();
    let positions = FifoPositions::new(transactions, redemptions).unwrap();

    assert_eq!(positions.opened_positions().count(), 0);
    assert_eq!(positions.current_open_positions_count(), 0);
    assert_eq!(positions.unreconciled_redemption(), None);

    let redeemed: Vec<_> = positions
        .closed_positions()
        .iter()
        .filter(|c| c.closing_event == CashFlowType::Redemption)
        .collect();
    assert_eq!(redeemed.len(), 2);
    assert_eq!(redeemed.iter().map(|c| c.count).sum::<u64>(), 25);
    assert!(redeemed.iter().all(|c| c.close_transaction.is_synthetic()));

    // synthetic redemption transactions are not part of the input view
    assert_eq!(positions.transactions().len(), 3);
    assert_eq!(positions.redemptions().len(), 1);
    assert_eq!(positions.position_histories().len(), 4);
}

#[test]
fn test_partial_redemption_records_residual() {
    let transactions: VecDeque<_> = vec![tx(1, 10, 0)].into();
    let redemptions: VecDeque<_> = vec![redemption(6, 30)].into();
    let positions = FifoPositions::new(transactions, redemptions).unwrap();

    assert_eq!(positions.unreconciled_redemption(), Some(4));
    assert_eq!(positions.current_open_positions_count(), 4);
}

#[test]
fn test_non_redemption_event_is_rejected() {
    let mut coupon = redemption(10, 30);
    coupon.kind = CashFlowType::Coupon;
    let err = FifoPositions::new(vec![tx(1, 10, 0)].into(), vec![coupon].into()).unwrap_err();
    assert!(matches!(
        err,
        EngineError::UnexpectedEventKind {
            expected: CashFlowType::Redemption,
            actual: CashFlowType::Coupon,
            ..
        }
    ));
}
