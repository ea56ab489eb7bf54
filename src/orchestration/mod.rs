//! Async services that load inputs from the collaborators and run the engines.

pub mod derivative_events;
pub mod irr;
pub mod paid_interest;
pub mod positions_factory;

pub use derivative_events::DerivativeEventsFactory;
pub use irr::InternalRateOfReturn;
pub use paid_interest::PaidInterestFactory;
pub use positions_factory::{FifoPositionsFactory, FifoPositionsKey};
