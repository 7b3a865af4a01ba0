//! Ready-made districts and profiles for demos and integration tests.

use crate::building::Building;
use crate::devices::{DeviceSpec, Objective};
use crate::district::{District, DistrictOperator};
use anyhow::{ensure, Context, Result};

/// Day-ahead electricity prices in EUR/kWh with a morning and evening peak.
pub fn day_ahead_prices(horizon: usize) -> Vec<f64> {
    (0..horizon)
        .map(|t| {
            let hour = (t % 24) as f64;
            let daily = (std::f64::consts::TAU * (hour - 7.0) / 24.0).sin();
            0.30 + 0.08 * daily
        })
        .collect()
}

/// Household demand in kW: a 1 kW base with an evening peak.
pub fn household_demand(horizon: usize) -> Vec<f64> {
    (0..horizon)
        .map(|t| {
            let hour = t % 24;
            let peak = if (17..22).contains(&hour) { 2.5 } else { 0.0 };
            1.0 + peak
        })
        .collect()
}

/// Photovoltaic generation in kW: a midday bell, zero at night.
pub fn pv_generation(horizon: usize) -> Vec<f64> {
    (0..horizon)
        .map(|t| {
            let hour = (t % 24) as f64;
            let arc = (std::f64::consts::PI * (hour - 6.0) / 12.0).sin();
            if (6.0..18.0).contains(&hour) {
                4.0 * arc.max(0.0)
            } else {
                0.0
            }
        })
        .collect()
}

fn battery() -> DeviceSpec {
    DeviceSpec::Battery {
        capacity_kwh: 12.0,
        max_charge_kw: 4.0,
        max_discharge_kw: 4.0,
        initial_soc_kwh: 6.0,
    }
}

/// A district of two flexible households behind one operator, all with
/// strictly convex peak-shaving objectives. The workhorse scenario for the
/// convex algorithms.
pub fn two_building_district(horizon: usize) -> Result<District> {
    ensure!(horizon >= 2, "scenario needs a horizon of at least 2 steps");

    let operator = DistrictOperator::new(
        "district_operator",
        horizon,
        Objective::PeakShaving { weight: 1.0 },
    );

    let household = Building::new("household_1", horizon, Objective::PeakShaving { weight: 1.0 })
        .with_device(DeviceSpec::FixedLoad {
            demand_kw: household_demand(horizon),
        })
        .with_device(battery());

    let prosumer = Building::new("household_2", horizon, Objective::PeakShaving { weight: 1.0 })
        .with_device(DeviceSpec::FixedLoad {
            demand_kw: household_demand(horizon),
        })
        .with_device(DeviceSpec::Photovoltaic {
            generation_kw: pv_generation(horizon),
        })
        .with_device(battery());

    District::new(operator, vec![household, prosumer])
        .context("assembling two-building district")
}

/// A district with one deferrable load, exercising the mixed-integer path.
/// The run window sits in the middle third of the horizon.
pub fn deferrable_district(horizon: usize) -> Result<District> {
    ensure!(horizon >= 9, "scenario needs a horizon of at least 9 steps");
    let window_start = horizon / 3;
    let window_end = 2 * horizon / 3;

    let operator = DistrictOperator::new(
        "district_operator",
        horizon,
        Objective::PeakShaving { weight: 1.0 },
    );

    let household = Building::new("household_1", horizon, Objective::PeakShaving { weight: 1.0 })
        .with_device(DeviceSpec::FixedLoad {
            demand_kw: household_demand(horizon),
        });

    let flexible = Building::new("household_2", horizon, Objective::PeakShaving { weight: 1.0 })
        .with_device(DeviceSpec::FixedLoad {
            demand_kw: household_demand(horizon),
        })
        .with_device(DeviceSpec::DeferrableLoad {
            nominal_kw: 3.0,
            runtime_steps: 2,
            window_start,
            window_end,
        });

    District::new(operator, vec![household, flexible])
        .context("assembling deferrable-load district")
}

/// A district whose single building cannot meet its demand within its grid
/// connection limits. Every algorithm must fail on it.
pub fn infeasible_district(horizon: usize) -> Result<District> {
    ensure!(horizon >= 1, "scenario needs a nonempty horizon");

    let operator = DistrictOperator::new(
        "district_operator",
        horizon,
        Objective::PeakShaving { weight: 1.0 },
    );

    let overloaded = Building::new("overloaded", horizon, Objective::PeakShaving { weight: 1.0 })
        .with_device(DeviceSpec::FixedLoad {
            demand_kw: vec![10.0; horizon],
        })
        .with_power_bounds(-1.0, 1.0);

    District::new(operator, vec![overloaded]).context("assembling infeasible district")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dst_core::EntityTree;

    #[test]
    fn test_profiles_match_horizon() {
        assert_eq!(day_ahead_prices(24).len(), 24);
        assert_eq!(household_demand(36).len(), 36);
        assert_eq!(pv_generation(24).len(), 24);
        // Night hours generate nothing.
        assert_eq!(pv_generation(24)[0], 0.0);
        assert!(pv_generation(24)[12] > 3.0);
    }

    #[test]
    fn test_two_building_district_builds() {
        let district = two_building_district(24).unwrap();
        assert_eq!(district.horizon(), 24);
        assert_eq!(district.num_buildings(), 2);
    }

    #[test]
    fn test_deferrable_district_has_integer_building() {
        let district = deferrable_district(24).unwrap();
        let buildings = district.buildings();
        assert!(buildings.iter().any(|b| b.has_integer_vars()));
    }

    #[test]
    fn test_rejects_tiny_horizon() {
        assert!(two_building_district(1).is_err());
        assert!(deferrable_district(6).is_err());
    }
}
