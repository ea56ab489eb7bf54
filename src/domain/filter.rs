//! Reporting window passed explicitly through every engine call.

use crate::domain::PortfolioId;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Half-open `[from, to)` window over a set of portfolios.
///
/// An empty portfolio set selects every portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewFilter {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub portfolios: BTreeSet<PortfolioId>,
}

impl ViewFilter {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            portfolios: BTreeSet::new(),
        }
    }

    pub fn with_portfolios<I>(mut self, portfolios: I) -> Self
    where
        I: IntoIterator<Item = PortfolioId>,
    {
        self.portfolios = portfolios.into_iter().collect();
        self
    }

    /// Same filter starting at the earliest representable instant of the data set.
    pub fn since_beginning(&self) -> Self {
        Self {
            from: DateTime::<Utc>::UNIX_EPOCH,
            ..self.clone()
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant < self.to
    }

    /// Portfolios as a sorted slice-friendly vector.
    pub fn portfolio_list(&self) -> Vec<PortfolioId> {
        self.portfolios.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_window_is_half_open() {
        let filter = ViewFilter::new(at(1), at(10));
        assert!(filter.contains(at(1)));
        assert!(filter.contains(at(9)));
        assert!(!filter.contains(at(10)));
    }

    #[test]
    fn test_since_beginning_keeps_end_and_portfolios() {
        let filter =
            ViewFilter::new(at(5), at(10)).with_portfolios([PortfolioId::new("b"), PortfolioId::new("a")]);
        let full = filter.since_beginning();
        assert_eq!(full.from, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(full.to, at(10));
        assert_eq!(
            full.portfolio_list(),
            vec![PortfolioId::new("a"), PortfolioId::new("b")]
        );
    }
}
