//! End-to-end scheduling runs over the bundled scenario districts.

use dst_algo::{Algorithm, RunConfig, ScheduleError, ScheduleOptimizer, SolveStatus};
use dst_core::{IntegerMode, ScheduleSet, Trajectory, XUpdateMode};
use dst_scenarios::factory;

const HORIZON: usize = 24;

fn admm_config() -> RunConfig {
    RunConfig {
        algorithm: Algorithm::ExchangeAdmm,
        ..Default::default()
    }
}

#[test]
fn test_exchange_admm_converges_on_reference_district() {
    let district = factory::two_building_district(HORIZON).unwrap();
    let schedule = ScheduleOptimizer::new(admm_config()).solve(&district).unwrap();

    assert_eq!(schedule.status, SolveStatus::Converged);
    assert!(schedule.iterations <= 200);
    assert!(schedule.primal_residual < 0.01);
    assert!(schedule.dual_residual < 0.1);

    assert_eq!(schedule.building_power.len(), 2);
    for power in &schedule.building_power {
        assert_eq!(power.len(), HORIZON);
    }
    // District power is the elementwise sum of the building trajectories.
    let summed = Trajectory::sum_of(HORIZON, schedule.building_power.iter());
    assert_eq!(schedule.district_power, summed);
}

#[test]
fn test_admm_matches_central_baseline() {
    let district = factory::two_building_district(HORIZON).unwrap();

    let central = ScheduleOptimizer::new(admm_config())
        .with_algorithm(Algorithm::Central)
        .solve(&district)
        .unwrap();
    assert_eq!(central.status, SolveStatus::Converged);
    assert_eq!(central.iterations, 1);

    let admm = ScheduleOptimizer::new(admm_config()).solve(&district).unwrap();

    for (a, c) in admm.building_power.iter().zip(central.building_power.iter()) {
        assert!(
            a.sub(c).inf_norm() < 0.1,
            "distributed schedule deviates from joint baseline"
        );
    }
    assert!((admm.objective - central.objective).abs() < 0.5);
}

#[test]
fn test_dual_decomposition_converges() {
    let district = factory::two_building_district(HORIZON).unwrap();
    let config = RunConfig {
        algorithm: Algorithm::DualDecomposition,
        rho: 0.2,
        eps_primal: 0.05,
        max_iterations: 2000,
        ..Default::default()
    };
    let schedule = ScheduleOptimizer::new(config).solve(&district).unwrap();

    assert_eq!(schedule.status, SolveStatus::Converged);
    assert!(schedule.primal_residual < 0.05);
    // Dual decomposition tracks no dual residual.
    assert_eq!(schedule.dual_residual, 0.0);
}

#[test]
fn test_miqp_admm_keeps_deferrable_run_integral() {
    let district = factory::deferrable_district(HORIZON).unwrap();
    let config = RunConfig {
        algorithm: Algorithm::ExchangeMiqpAdmm,
        rho: 0.5,
        eps_primal: 0.1,
        eps_dual: 0.1,
        max_iterations: 200,
        integer_mode: IntegerMode::Integer,
        x_update_mode: XUpdateMode::Constrained,
    };
    let schedule = ScheduleOptimizer::new(config).solve(&district).unwrap();

    // Building 2 carries the deferrable load: its power minus the fixed
    // demand is the load's committed profile, which must be 3 kW for exactly
    // two contiguous steps inside the window and zero elsewhere.
    let demand = factory::household_demand(HORIZON);
    let flexible = &schedule.building_power[1];
    let window = HORIZON / 3..2 * HORIZON / 3;

    let mut on_steps = Vec::new();
    for t in 0..HORIZON {
        let extra = flexible[t] - demand[t];
        if (extra - 3.0).abs() < 1e-3 {
            on_steps.push(t);
        } else {
            assert!(extra.abs() < 1e-3, "fractional load power {} at step {}", extra, t);
        }
    }
    assert_eq!(on_steps.len(), 2);
    assert_eq!(on_steps[1], on_steps[0] + 1);
    assert!(window.contains(&on_steps[0]) && window.contains(&on_steps[1]));
}

#[test]
fn test_iteration_budget_is_normal_termination() {
    let district = factory::two_building_district(HORIZON).unwrap();
    let schedule = ScheduleOptimizer::new(admm_config())
        .with_max_iterations(1)
        .solve(&district)
        .unwrap();

    assert_eq!(schedule.status, SolveStatus::IterationLimitReached);
    assert_eq!(schedule.iterations, 1);
    // A schedule is still reported.
    assert_eq!(schedule.building_power.len(), 2);
}

#[test]
fn test_repeated_runs_are_identical() {
    let district = factory::two_building_district(HORIZON).unwrap();
    let optimizer = ScheduleOptimizer::new(admm_config());

    let first = optimizer.solve(&district).unwrap();
    let second = optimizer.solve(&district).unwrap();

    assert_eq!(first.iterations, second.iterations);
    assert_eq!(first.building_power, second.building_power);
    assert_eq!(first.district_power, second.district_power);
    assert_eq!(first.objective, second.objective);
}

#[test]
fn test_infeasible_district_fails_cleanly() {
    let district = factory::infeasible_district(HORIZON).unwrap();

    let err = ScheduleOptimizer::new(admm_config()).solve(&district).unwrap_err();
    assert!(matches!(
        err,
        ScheduleError::LocalSolveInfeasible { ref entity } if entity == "overloaded"
    ));

    let err = ScheduleOptimizer::new(admm_config())
        .with_algorithm(Algorithm::Central)
        .solve(&district)
        .unwrap_err();
    assert!(matches!(err, ScheduleError::LocalSolveInfeasible { .. }));
}

#[test]
fn test_invalid_config_is_rejected_before_solving() {
    let district = factory::two_building_district(HORIZON).unwrap();
    let config = RunConfig {
        rho: -1.0,
        ..Default::default()
    };
    let err = ScheduleOptimizer::new(config).solve(&district).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidConfig(_)));
}

#[test]
fn test_schedules_can_be_labeled_and_compared() {
    let district = factory::two_building_district(HORIZON).unwrap();

    let admm = ScheduleOptimizer::new(admm_config()).solve(&district).unwrap();
    let central = ScheduleOptimizer::new(admm_config())
        .with_algorithm(Algorithm::Central)
        .solve(&district)
        .unwrap();

    let mut schedules = ScheduleSet::new();
    schedules.copy_schedule("exchange_admm", admm.building_power[0].clone());
    schedules.copy_schedule("central", central.building_power[0].clone());

    let labels: Vec<&str> = schedules.labels().collect();
    assert_eq!(labels, vec!["central", "exchange_admm"]);
    let stored = schedules.get("exchange_admm").unwrap();
    assert_eq!(stored, &admm.building_power[0]);
}
