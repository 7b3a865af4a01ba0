//! Device specifications contributed to a building's local problem.
//!
//! Each device adds variables, constraint rows or right-hand-side load to the
//! building's power balance. Timesteps are hourly, so kW sums and kWh state
//! of charge share one unit scale.

use dst_core::{DstError, DstResult, Trajectory};
use serde::{Deserialize, Serialize};

/// One device inside a building.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceSpec {
    /// Inflexible consumption; enters the balance right-hand side.
    FixedLoad { demand_kw: Vec<f64> },

    /// Inflexible generation; offsets the balance right-hand side.
    Photovoltaic { generation_kw: Vec<f64> },

    /// Electrical storage. Charging power is positive, discharging negative;
    /// the state of charge must stay within capacity at every timestep and
    /// return to its initial value over the horizon.
    Battery {
        capacity_kwh: f64,
        max_charge_kw: f64,
        max_discharge_kw: f64,
        initial_soc_kwh: f64,
    },

    /// A load that must run at nominal power for a contiguous block of
    /// timesteps somewhere inside `[window_start, window_end)`. The block's
    /// start offset is the building's integer decision.
    DeferrableLoad {
        nominal_kw: f64,
        runtime_steps: usize,
        window_start: usize,
        window_end: usize,
    },
}

impl DeviceSpec {
    pub fn is_deferrable(&self) -> bool {
        matches!(self, DeviceSpec::DeferrableLoad { .. })
    }

    pub(crate) fn validate(&self, horizon: usize) -> DstResult<()> {
        match self {
            DeviceSpec::FixedLoad { demand_kw } => {
                if demand_kw.len() != horizon {
                    return Err(DstError::Validation(format!(
                        "fixed load profile has {} steps, horizon is {}",
                        demand_kw.len(),
                        horizon
                    )));
                }
            }
            DeviceSpec::Photovoltaic { generation_kw } => {
                if generation_kw.len() != horizon {
                    return Err(DstError::Validation(format!(
                        "photovoltaic profile has {} steps, horizon is {}",
                        generation_kw.len(),
                        horizon
                    )));
                }
            }
            DeviceSpec::Battery {
                capacity_kwh,
                max_charge_kw,
                max_discharge_kw,
                initial_soc_kwh,
            } => {
                if *capacity_kwh <= 0.0 || *max_charge_kw <= 0.0 || *max_discharge_kw <= 0.0 {
                    return Err(DstError::Validation(
                        "battery capacity and power limits must be positive".to_string(),
                    ));
                }
                if *initial_soc_kwh < 0.0 || *initial_soc_kwh > *capacity_kwh {
                    return Err(DstError::Validation(format!(
                        "initial state of charge {} outside [0, {}]",
                        initial_soc_kwh, capacity_kwh
                    )));
                }
            }
            DeviceSpec::DeferrableLoad {
                nominal_kw,
                runtime_steps,
                window_start,
                window_end,
            } => {
                if *nominal_kw <= 0.0 || *runtime_steps == 0 {
                    return Err(DstError::Validation(
                        "deferrable load needs positive nominal power and runtime".to_string(),
                    ));
                }
                if *window_start >= *window_end || *window_end > horizon {
                    return Err(DstError::Validation(format!(
                        "deferrable window [{}, {}) invalid for horizon {}",
                        window_start, window_end, horizon
                    )));
                }
                if *runtime_steps > window_end - window_start {
                    return Err(DstError::Validation(format!(
                        "runtime of {} steps does not fit window [{}, {})",
                        runtime_steps, window_start, window_end
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A scheduling objective over an entity's power trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Objective {
    /// Quadratic penalty `weight * sum_t p[t]^2` flattening the profile.
    PeakShaving { weight: f64 },
    /// Linear cost `sum_t prices_per_kwh[t] * p[t]`.
    Price { prices_per_kwh: Vec<f64> },
}

impl Objective {
    /// Evaluates the objective at a given power trajectory.
    pub fn evaluate(&self, power: &Trajectory) -> f64 {
        match self {
            Objective::PeakShaving { weight } => {
                weight * power.values().iter().map(|p| p * p).sum::<f64>()
            }
            Objective::Price { prices_per_kwh } => prices_per_kwh
                .iter()
                .zip(power.values())
                .map(|(price, p)| price * p)
                .sum(),
        }
    }

    pub(crate) fn validate(&self, horizon: usize) -> DstResult<()> {
        match self {
            Objective::PeakShaving { weight } => {
                if *weight <= 0.0 {
                    return Err(DstError::Validation(
                        "peak shaving weight must be positive".to_string(),
                    ));
                }
            }
            Objective::Price { prices_per_kwh } => {
                if prices_per_kwh.len() != horizon {
                    return Err(DstError::Validation(format!(
                        "price profile has {} steps, horizon is {}",
                        prices_per_kwh.len(),
                        horizon
                    )));
                }
            }
        }
        Ok(())
    }
}
