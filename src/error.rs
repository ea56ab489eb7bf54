use crate::datasource::DataSourceError;
use crate::domain::{CashFlowType, SecurityId};
use thiserror::Error;

/// Failures that abort one engine computation.
///
/// Contract violations are reported here; data-completeness gaps are not
/// errors and are logged where they are recovered.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Expected {expected} event but got {actual} for {security}")]
    UnexpectedEventKind {
        security: SecurityId,
        expected: CashFlowType,
        actual: CashFlowType,
    },
    #[error("Closing {closing} units would flip the sign of a lot with {unclosed} unclosed units of {security}")]
    SignFlip {
        security: SecurityId,
        unclosed: i64,
        closing: i64,
    },
    #[error("Security {0} is not a derivative")]
    NotDerivative(SecurityId),
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
}
