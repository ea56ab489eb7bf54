//! Pure computation engines: FIFO matching, payment reconciliation, the
//! derivative daily walk and the XIRR solver.
//!
//! Nothing in here awaits or touches storage; inputs are fully materialized
//! by the orchestration layer.

pub mod derivative;
pub mod fifo;
pub mod paid_interest;
pub mod position;
pub mod xirr;

pub use derivative::{DerivativeDailyEvents, DerivativeEvents, TradingCalendar};
pub use fifo::FifoPositions;
pub use paid_interest::{book_closure_instant, PaidInterest, PAYMENT_SCALE};
pub use position::{
    ClosedId, ClosedPosition, FictitiousPosition, LotId, OpenedPosition, Position,
    PositionHistory, PositionKey,
};
pub use xirr::{xirr, DatedCashFlow, XirrResult, XirrSettings};
