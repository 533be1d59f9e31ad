//! # Inventory Optimization Module
//!
//! Pure numeric core for network-cost-minimization scenarios: safety stock,
//! cycle stock, and holding cost per forecast year, computed from closed-form
//! formulas with no I/O and no cross-year state. Every forecast row maps
//! independently to one result row, so callers may parallelize freely.

pub(crate) mod normal;
pub(crate) mod rng;

pub use normal::inverse_standard_normal_cdf;
pub use rng::seed_from;
pub use rng::Lehmer;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Invalid policy parameters. Fatal for the offending optimization call
/// only, and always names the offending field; callers must not
/// substitute defaults silently.
#[derive(Error, Debug, PartialEq)]
pub enum PolicyError {
    #[error("service_level must lie strictly within (0, 1), got {0}")]
    ServiceLevelOutOfRange(f64),

    #[error("operating_days must be positive, got {0}")]
    NonPositiveOperatingDays(f64),

    #[error("lead_time_days must be non-negative, got {0}")]
    NegativeLeadTime(f64),

    #[error("demand_cv must be non-negative, got {0}")]
    NegativeDemandCv(f64),

    #[error("holding_cost_per_unit_per_year must be non-negative, got {0}")]
    NegativeHoldingCost(f64),

    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f64 },
}

/// Inventory policy parameters supplied by the caller
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InventoryPolicy {
    /// Target probability of not stocking out during lead time,
    /// strictly within (0, 1)
    pub service_level: f64,
    pub lead_time_days: f64,
    pub holding_cost_per_unit_per_year: f64,
    /// Coefficient of variation of daily demand
    pub demand_cv: f64,
    pub operating_days: f64,
}

impl InventoryPolicy {
    fn validate(&self) -> Result<(), PolicyError> {
        let fields = [
            ("service_level", self.service_level),
            ("lead_time_days", self.lead_time_days),
            (
                "holding_cost_per_unit_per_year",
                self.holding_cost_per_unit_per_year,
            ),
            ("demand_cv", self.demand_cv),
            ("operating_days", self.operating_days),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(PolicyError::NotFinite { field, value });
            }
        }

        if self.service_level <= 0.0 || self.service_level >= 1.0 {
            return Err(PolicyError::ServiceLevelOutOfRange(self.service_level));
        }
        if self.operating_days <= 0.0 {
            return Err(PolicyError::NonPositiveOperatingDays(self.operating_days));
        }
        if self.lead_time_days < 0.0 {
            return Err(PolicyError::NegativeLeadTime(self.lead_time_days));
        }
        if self.demand_cv < 0.0 {
            return Err(PolicyError::NegativeDemandCv(self.demand_cv));
        }
        if self.holding_cost_per_unit_per_year < 0.0 {
            return Err(PolicyError::NegativeHoldingCost(
                self.holding_cost_per_unit_per_year,
            ));
        }
        Ok(())
    }
}

/// One year of demand forecast. Duplicate years yield duplicate results,
/// never merged ones.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct ForecastRow {
    pub year: i32,
    pub annual_units: f64,
}

/// Stock and cost figures for one forecast year
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct InventoryYearResult {
    pub year: i32,
    pub daily_mean_demand: f64,
    pub safety_stock_units: f64,
    pub cycle_stock_units: f64,
    pub avg_inventory_units: f64,
    pub annual_holding_cost: f64,
}

/// Computes per-year safety stock, cycle stock, and holding cost.
///
/// The z multiplier comes from the inverse normal CDF at the target
/// service level; safety stock is clamped non-negative because a low
/// service level yields a negative z.
pub fn inventory_by_year(
    policy: &InventoryPolicy,
    forecast: &[ForecastRow],
) -> Result<Vec<InventoryYearResult>, PolicyError> {
    policy.validate()?;
    let z = inverse_standard_normal_cdf(policy.service_level);

    Ok(forecast
        .iter()
        .map(|row| {
            let daily_mean = row.annual_units / policy.operating_days;
            let sigma_daily = policy.demand_cv * daily_mean;
            let sigma_lead = sigma_daily * policy.lead_time_days.sqrt();
            let safety_stock = (z * sigma_lead).max(0.0);
            let cycle_stock = daily_mean * (policy.lead_time_days / 2.0);
            let avg_inventory = safety_stock + cycle_stock;
            InventoryYearResult {
                year: row.year,
                daily_mean_demand: daily_mean,
                safety_stock_units: safety_stock,
                cycle_stock_units: cycle_stock,
                avg_inventory_units: avg_inventory,
                annual_holding_cost: avg_inventory * policy.holding_cost_per_unit_per_year,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> InventoryPolicy {
        InventoryPolicy {
            service_level: 0.95,
            lead_time_days: 7.0,
            holding_cost_per_unit_per_year: 2.0,
            demand_cv: 0.3,
            operating_days: 365.0,
        }
    }

    #[test]
    fn reference_scenario() {
        let forecast = [ForecastRow {
            year: 2024,
            annual_units: 36_500.0,
        }];
        let results = inventory_by_year(&policy(), &forecast).unwrap();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.year, 2024);
        assert!((result.daily_mean_demand - 100.0).abs() < 1e-9);
        // z ~ 1.645, sigma_lead = 30 * sqrt(7) ~ 79.37
        assert!((result.safety_stock_units - 130.56).abs() < 0.01);
        assert!((result.cycle_stock_units - 350.0).abs() < 1e-9);
        assert!((result.avg_inventory_units - 480.56).abs() < 0.01);
        assert!((result.annual_holding_cost - 961.12).abs() < 0.02);
    }

    #[test]
    fn low_service_level_clamps_safety_stock() {
        let mut low = policy();
        low.service_level = 0.2;
        let forecast = [ForecastRow {
            year: 2024,
            annual_units: 36_500.0,
        }];
        let results = inventory_by_year(&low, &forecast).unwrap();
        assert_eq!(results[0].safety_stock_units, 0.0);
        assert!(results[0].avg_inventory_units >= results[0].cycle_stock_units);
    }

    #[test]
    fn duplicate_years_stay_duplicated() {
        let row = ForecastRow {
            year: 2025,
            annual_units: 1_000.0,
        };
        let results = inventory_by_year(&policy(), &[row, row]).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].year, results[1].year);
        assert_eq!(results[0].annual_holding_cost, results[1].annual_holding_cost);
    }

    #[test]
    fn empty_forecast_yields_empty_results() {
        assert!(inventory_by_year(&policy(), &[]).unwrap().is_empty());
    }

    #[test]
    fn invalid_parameters_name_the_field() {
        let mut invalid = policy();
        invalid.service_level = 1.0;
        assert_eq!(
            inventory_by_year(&invalid, &[]).unwrap_err(),
            PolicyError::ServiceLevelOutOfRange(1.0)
        );

        let mut invalid = policy();
        invalid.operating_days = -5.0;
        assert_eq!(
            inventory_by_year(&invalid, &[]).unwrap_err(),
            PolicyError::NonPositiveOperatingDays(-5.0)
        );

        let mut invalid = policy();
        invalid.demand_cv = -0.1;
        assert_eq!(
            inventory_by_year(&invalid, &[]).unwrap_err(),
            PolicyError::NegativeDemandCv(-0.1)
        );

        let mut invalid = policy();
        invalid.lead_time_days = f64::NAN;
        assert!(matches!(
            inventory_by_year(&invalid, &[]).unwrap_err(),
            PolicyError::NotFinite {
                field: "lead_time_days",
                ..
            }
        ));
    }

    #[test]
    fn error_messages_carry_the_offending_field() {
        let message = PolicyError::ServiceLevelOutOfRange(1.5).to_string();
        assert!(message.contains("service_level"));
        let message = PolicyError::NonPositiveOperatingDays(0.0).to_string();
        assert!(message.contains("operating_days"));
    }
}
