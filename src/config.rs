use crate::engine::{TradingCalendar, XirrSettings};
use chrono_tz::Tz;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    /// Exchange timezone used to bucket derivative events into trading days.
    pub exchange_timezone: Tz,
    /// Last local hour (inclusive) that still belongs to the same trading day.
    pub trading_day_cutoff_hour: u32,
    /// Net present value tolerance of the return solver, in currency units.
    pub irr_tolerance: f64,
    pub irr_max_iterations: u32,
    pub irr_initial_guess: f64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            exchange_timezone: chrono_tz::Europe::Moscow,
            trading_day_cutoff_hour: 18,
            irr_tolerance: 1e-3,
            irr_max_iterations: 100,
            irr_initial_guess: 0.1,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let exchange_timezone = match env_map.get("EXCHANGE_TIMEZONE") {
            Some(name) => name.parse::<Tz>().map_err(|_| {
                ConfigError::InvalidValue(
                    "EXCHANGE_TIMEZONE".to_string(),
                    format!("unknown timezone {}", name),
                )
            })?,
            None => defaults.exchange_timezone,
        };

        let trading_day_cutoff_hour = match env_map.get("TRADING_DAY_CUTOFF_HOUR") {
            Some(s) => s
                .parse::<u32>()
                .ok()
                .filter(|hour| *hour < 24)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "TRADING_DAY_CUTOFF_HOUR".to_string(),
                        "must be an hour between 0 and 23".to_string(),
                    )
                })?,
            None => defaults.trading_day_cutoff_hour,
        };

        let irr_tolerance = match env_map.get("IRR_TOLERANCE") {
            Some(s) => s
                .parse::<f64>()
                .ok()
                .filter(|t| t.is_finite() && *t > 0.0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "IRR_TOLERANCE".to_string(),
                        "must be a positive number".to_string(),
                    )
                })?,
            None => defaults.irr_tolerance,
        };

        let irr_max_iterations = match env_map.get("IRR_MAX_ITERATIONS") {
            Some(s) => s.parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "IRR_MAX_ITERATIONS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?,
            None => defaults.irr_max_iterations,
        };

        let irr_initial_guess = match env_map.get("IRR_INITIAL_GUESS") {
            Some(s) => s
                .parse::<f64>()
                .ok()
                .filter(|g| g.is_finite() && *g > -1.0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "IRR_INITIAL_GUESS".to_string(),
                        "must be a number greater than -1".to_string(),
                    )
                })?,
            None => defaults.irr_initial_guess,
        };

        Ok(Config {
            exchange_timezone,
            trading_day_cutoff_hour,
            irr_tolerance,
            irr_max_iterations,
            irr_initial_guess,
        })
    }

    pub fn trading_calendar(&self) -> TradingCalendar {
        TradingCalendar::new(self.exchange_timezone, self.trading_day_cutoff_hour)
    }

    pub fn xirr_settings(&self) -> XirrSettings {
        XirrSettings {
            tolerance: self.irr_tolerance,
            max_iterations: self.irr_max_iterations,
            initial_guess: self.irr_initial_guess,
        }
    }
}
