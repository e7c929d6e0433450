//! Charging cost estimation.
//!
//! The estimate is a client-side preview only; the backend does its own
//! billing. It assumes a flat charger output over the whole slot:
//!
//! ```text
//! total = fixed_fee + (assumed_power_kw × hours) × price_per_kwh
//! ```

use chrono::{DateTime, Utc};

use crate::domain::Station;

/// Service fee added to every booking.
pub const DEFAULT_FIXED_FEE: f64 = 20.0;

/// Average charger output assumed for the estimate, in kW.
pub const DEFAULT_ASSUMED_POWER_KW: f64 = 7.5;

/// Price per kWh used when a station does not publish one.
pub const DEFAULT_FALLBACK_PRICE_PER_KWH: f64 = 18.0;

/// Pricing policy for cost estimates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tariff {
    pub fixed_fee: f64,
    pub assumed_power_kw: f64,
    pub fallback_price_per_kwh: f64,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            fixed_fee: DEFAULT_FIXED_FEE,
            assumed_power_kw: DEFAULT_ASSUMED_POWER_KW,
            fallback_price_per_kwh: DEFAULT_FALLBACK_PRICE_PER_KWH,
        }
    }
}

/// An estimated charging cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    pub hours: f64,
    pub energy_kwh: f64,
    pub price_per_kwh: f64,
    pub total: f64,
}

impl CostEstimate {
    /// Total formatted to two decimals, e.g. `"222.50"`.
    pub fn total_display(&self) -> String {
        format!("{:.2}", self.total)
    }

    pub fn hours_display(&self) -> String {
        format!("{:.2}", self.hours)
    }
}

impl Tariff {
    /// The unit price to charge, falling back when absent or non-positive.
    pub fn effective_price(&self, price_per_kwh: Option<f64>) -> f64 {
        price_per_kwh
            .filter(|p| p.is_finite() && *p > 0.0)
            .unwrap_or(self.fallback_price_per_kwh)
    }

    /// Estimate the cost of charging between `start` and `end`.
    ///
    /// Returns `None` (not zero) when either time is missing or the interval
    /// is not positive.
    pub fn estimate(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        price_per_kwh: Option<f64>,
    ) -> Option<CostEstimate> {
        let (start, end) = (start?, end?);
        if end <= start {
            return None;
        }

        let hours = (end - start).num_milliseconds() as f64 / 3_600_000.0;
        let price_per_kwh = self.effective_price(price_per_kwh);
        let energy_kwh = self.assumed_power_kw * hours;

        Some(CostEstimate {
            hours,
            energy_kwh,
            price_per_kwh,
            total: self.fixed_fee + energy_kwh * price_per_kwh,
        })
    }

    /// Estimate for a selected station; `None` when no station is selected.
    pub fn estimate_for_station(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        station: Option<&Station>,
    ) -> Option<CostEstimate> {
        let station = station?;
        self.estimate(start, end, station.price_per_kwh)
    }
}
