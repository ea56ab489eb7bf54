//! Domain primitives: PortfolioId, SecurityId, Currency, Security.

use serde::{Deserialize, Serialize};

/// Portfolio (broker account) identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortfolioId(pub String);

impl PortfolioId {
    pub fn new(id: impl Into<String>) -> Self {
        PortfolioId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PortfolioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Security identifier (ISIN, ticker or contract name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SecurityId(pub String);

impl SecurityId {
    pub fn new(id: impl Into<String>) -> Self {
        SecurityId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SecurityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO-4217-like currency code (e.g., "RUB", "USD").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Currency(pub String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Self {
        Currency(code.into().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instrument family; decides how positions are loaded and valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityType {
    Stock,
    Bond,
    /// Futures and options settled through daily variation margin.
    Derivative,
    /// Currency exchange contract, e.g. `USDRUB_TOM`.
    CurrencyPair,
    Asset,
}

/// A tradable instrument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Security {
    pub id: SecurityId,
    pub security_type: SecurityType,
}

/// Length of the pair prefix shared by every contract quoting the same pair.
const CURRENCY_PAIR_LENGTH: usize = 6;

impl Security {
    pub fn new(id: impl Into<String>, security_type: SecurityType) -> Self {
        Self {
            id: SecurityId::new(id),
            security_type,
        }
    }

    pub fn is_derivative(&self) -> bool {
        self.security_type == SecurityType::Derivative
    }

    /// Pair name (e.g. "USDRUB") for currency contracts, `None` otherwise.
    pub fn currency_pair(&self) -> Option<String> {
        if self.security_type != SecurityType::CurrencyPair {
            return None;
        }
        let pair: String = self.id.as_str().chars().take(CURRENCY_PAIR_LENGTH).collect();
        Some(pair.to_ascii_uppercase())
    }
}
