pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{
    CurrencyConverter, DataSourceError, MockDataSource, QuoteSource, SecurityEventSource,
    SecurityQuote, TransactionSource,
};
pub use domain::{
    CashFlowType, Currency, Decimal, PortfolioId, Security, SecurityEventCashFlow, SecurityId,
    SecurityType, Transaction, ViewFilter,
};
pub use engine::{DerivativeEvents, FifoPositions, PaidInterest, PositionKey};
pub use error::EngineError;
pub use orchestration::{
    DerivativeEventsFactory, FifoPositionsFactory, InternalRateOfReturn, PaidInterestFactory,
};
