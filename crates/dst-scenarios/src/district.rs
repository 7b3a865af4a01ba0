//! District operator and the entity tree consumed by the algorithms.

use crate::building::{solve_model, Building};
use crate::devices::Objective;
use dst_core::{
    DstError, DstResult, EntityTree, LocalSolution, LocalSolveOptions, OptimizationEntity,
    PowerSignal, QuadraticModel, SolveFailure,
};

/// Default grid connection limit of the district supply, in kW.
const DEFAULT_SUPPLY_LIMIT_KW: f64 = 10_000.0;

/// The root entity supplying the district.
///
/// The operator's physical variable is its supplied power `p`, but the
/// trajectory it exchanges is `x = -p`: with the buildings exchanging
/// consumption positively, the coupling over the tree reads `sum_i x_i = 0`
/// and the gathered aggregate is directly the exchange imbalance.
pub struct DistrictOperator {
    name: String,
    horizon: usize,
    objective: Objective,
    supply_min_kw: f64,
    supply_max_kw: f64,
}

impl DistrictOperator {
    pub fn new(name: impl Into<String>, horizon: usize, objective: Objective) -> Self {
        DistrictOperator {
            name: name.into(),
            horizon,
            objective,
            supply_min_kw: -DEFAULT_SUPPLY_LIMIT_KW,
            supply_max_kw: DEFAULT_SUPPLY_LIMIT_KW,
        }
    }

    /// Limits on the supplied power `p`. Negative supply is export.
    pub fn with_supply_bounds(mut self, min_kw: f64, max_kw: f64) -> Self {
        self.supply_min_kw = min_kw;
        self.supply_max_kw = max_kw;
        self
    }

    pub(crate) fn validate(&self) -> DstResult<()> {
        self.objective.validate(self.horizon)?;
        if self.supply_min_kw >= self.supply_max_kw {
            return Err(DstError::Validation(format!(
                "supply bounds [{}, {}] are empty",
                self.supply_min_kw, self.supply_max_kw
            )));
        }
        Ok(())
    }

    /// Local model in the exchanged variable `x = -p`.
    fn model(&self) -> QuadraticModel {
        let h = self.horizon;
        let mut model = QuadraticModel {
            num_vars: h,
            power_vars: (0..h).collect(),
            linear: vec![0.0; h],
            ..Default::default()
        };
        match &self.objective {
            // p^2 = x^2, so peak shaving carries over unchanged.
            Objective::PeakShaving { weight } => {
                for t in 0..h {
                    model.quadratic.push((t, t, *weight));
                }
            }
            // price * p = -price * x.
            Objective::Price { prices_per_kwh } => {
                for t in 0..h {
                    model.linear[t] -= prices_per_kwh[t];
                }
            }
        }
        // p in [min, max] maps to x in [-max, -min].
        for t in 0..h {
            model
                .bounds
                .push((t, -self.supply_max_kw, -self.supply_min_kw));
        }
        model
    }
}

impl OptimizationEntity for DistrictOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn horizon(&self) -> usize {
        self.horizon
    }

    fn solve_local(
        &self,
        signal: &PowerSignal,
        _options: &LocalSolveOptions,
    ) -> Result<LocalSolution, SolveFailure> {
        let (power, objective, _) = solve_model(&self.model(), signal)?;
        Ok(LocalSolution {
            power,
            objective,
            commitment: None,
        })
    }

    fn joint_model(&self) -> QuadraticModel {
        self.model()
    }
}

/// A validated two-level entity tree: one operator, N buildings, all sharing
/// one operation horizon.
pub struct District {
    horizon: usize,
    operator: DistrictOperator,
    buildings: Vec<Building>,
}

impl District {
    pub fn new(operator: DistrictOperator, buildings: Vec<Building>) -> DstResult<Self> {
        let horizon = operator.horizon();
        if horizon == 0 {
            return Err(DstError::Validation(
                "operation horizon must be at least 1".to_string(),
            ));
        }
        operator.validate()?;
        for building in &buildings {
            if building.horizon() != horizon {
                return Err(DstError::Validation(format!(
                    "building '{}' has horizon {}, district uses {}",
                    building.name(),
                    building.horizon(),
                    horizon
                )));
            }
            building.validate()?;
        }
        Ok(District {
            horizon,
            operator,
            buildings,
        })
    }

    pub fn num_buildings(&self) -> usize {
        self.buildings.len()
    }
}

impl EntityTree for District {
    fn horizon(&self) -> usize {
        self.horizon
    }

    fn operator(&self) -> &dyn OptimizationEntity {
        &self.operator
    }

    fn buildings(&self) -> Vec<&dyn OptimizationEntity> {
        self.buildings
            .iter()
            .map(|b| b as &dyn OptimizationEntity)
            .collect()
    }
}
