//! Money-weighted rate of return over an irregular cash-flow series.
//!
//! Finds `r` such that `NPV(r) = Σ CF_i / (1 + r)^t_i = 0`, where `t_i` is
//! the actual/365 year fraction since the earliest flow. Newton-Raphson from
//! the initial guess, falling back to bisection over the clamp range.

use chrono::NaiveDate;

const MIN_RATE: f64 = -0.99;
const MAX_RATE: f64 = 10.0;
const DAYS_IN_YEAR: f64 = 365.0;

/// A signed amount on a date: negative for money invested, positive for money returned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatedCashFlow {
    pub date: NaiveDate,
    pub amount: f64,
}

impl DatedCashFlow {
    pub fn new(date: NaiveDate, amount: f64) -> Self {
        Self { date, amount }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XirrSettings {
    /// |NPV| below which the rate is accepted, in currency units.
    pub tolerance: f64,
    pub max_iterations: u32,
    pub initial_guess: f64,
}

impl Default for XirrSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            max_iterations: 100,
            initial_guess: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XirrResult {
    /// Annual rate as a fraction (0.1 = 10%).
    pub rate: f64,
    pub converged: bool,
    pub iterations: u32,
}

impl XirrResult {
    fn failed(iterations: u32) -> Self {
        Self {
            rate: f64::NAN,
            converged: false,
            iterations,
        }
    }

    /// The rate, when the solver converged.
    pub fn value(&self) -> Option<f64> {
        self.converged.then_some(self.rate)
    }
}

/// Solve for the annual rate that zeroes the net present value.
pub fn xirr(cash_flows: &[DatedCashFlow], settings: &XirrSettings) -> XirrResult {
    let has_inflow = cash_flows.iter().any(|cf| cf.amount > 0.0);
    let has_outflow = cash_flows.iter().any(|cf| cf.amount < 0.0);
    if !has_inflow || !has_outflow {
        return XirrResult::failed(0);
    }

    let Some(first_date) = cash_flows.iter().map(|cf| cf.date).min() else {
        return XirrResult::failed(0);
    };
    let series: Vec<(f64, f64)> = cash_flows
        .iter()
        .map(|cf| {
            let years = (cf.date - first_date).num_days() as f64 / DAYS_IN_YEAR;
            (cf.amount, years)
        })
        .collect();

    let mut rate = settings.initial_guess.clamp(MIN_RATE, MAX_RATE);
    let mut iterations = 0;
    while iterations < settings.max_iterations {
        iterations += 1;
        let (npv, dnpv) = npv_and_derivative(&series, rate);
        if !npv.is_finite() {
            break;
        }
        if npv.abs() <= settings.tolerance {
            return XirrResult {
                rate,
                converged: true,
                iterations,
            };
        }
        if dnpv == 0.0 || !dnpv.is_finite() {
            break;
        }
        let next = (rate - npv / dnpv).clamp(MIN_RATE, MAX_RATE);
        if (next - rate).abs() < f64::EPSILON {
            break;
        }
        rate = next;
    }

    bisect(&series, settings, iterations)
}

fn bisect(series: &[(f64, f64)], settings: &XirrSettings, mut iterations: u32) -> XirrResult {
    let (mut low, mut high) = (MIN_RATE, MAX_RATE);
    let mut npv_low = npv_and_derivative(series, low).0;
    let npv_high = npv_and_derivative(series, high).0;
    if !npv_low.is_finite() || !npv_high.is_finite() || npv_low.signum() == npv_high.signum() {
        return XirrResult::failed(iterations);
    }

    let budget = iterations + settings.max_iterations.max(64);
    while iterations < budget {
        iterations += 1;
        let middle = (low + high) / 2.0;
        let npv = npv_and_derivative(series, middle).0;
        if npv.abs() <= settings.tolerance {
            return XirrResult {
                rate: middle,
                converged: true,
                iterations,
            };
        }
        if npv.signum() == npv_low.signum() {
            low = middle;
            npv_low = npv;
        } else {
            high = middle;
        }
    }
    XirrResult::failed(iterations)
}

/// NPV and its first derivative with respect to the rate.
fn npv_and_derivative(series: &[(f64, f64)], rate: f64) -> (f64, f64) {
    let mut npv = 0.0;
    let mut dnpv = 0.0;
    for (amount, years) in series {
        let discount = (1.0 + rate).powf(*years);
        npv += amount / discount;
        dnpv -= years * amount / (discount * (1.0 + rate));
    }
    (npv, dnpv)
}
