//! Integration test: black-box optimization of DMP forcing-term weights.

use dmp::{Dmp, DmpType};
use dmp_bbo::{
    Distribution, DmpTaskSolver, OptimizationConfig, Task, TaskSolver, UpdaterCovarDecay,
    ViapointTask, WeightingMethod, run_optimization_task,
};
use dmp_core::{Trajectory, linspace};
use dmp_fa::{FunctionApproximator, Rbfn, RbfnConfig};
use nalgebra::{DMatrix, DVector};

fn trained_dmp() -> Dmp {
    let demo = Trajectory::from_min_jerk(
        &linspace(0.0, 1.0, 101),
        &DVector::from_element(1, 0.0),
        &DVector::from_element(1, 1.0),
    )
    .unwrap();
    let fa = Rbfn::new(RbfnConfig {
        n_basis_functions: 8,
        ..RbfnConfig::default()
    })
    .unwrap();
    Dmp::from_traj(&demo, vec![Box::new(fa) as Box<dyn FunctionApproximator>], DmpType::Kulvicius2012Joining).unwrap()
}

#[test]
fn rollout_of_trained_parameters_reproduces_dmp() {
    let dmp = trained_dmp();
    let ts = linspace(0.0, 1.0, 51);
    let solver = DmpTaskSolver::new(dmp.clone(), ts.clone()).unwrap();
    let cost_vars = solver.perform_rollout(&dmp.parameter_vector().unwrap()).unwrap();
    assert_eq!(cost_vars.shape(), (51, 4));
    assert_eq!(cost_vars.column(0).into_owned(), ts);
    assert!((cost_vars[(50, 1)] - 1.0).abs() < 0.02);

    // Wrong parameter count surfaces as a DMP error
    assert!(solver.perform_rollout(&DVector::zeros(3)).is_err());
}

#[test]
fn untrained_dmp_cannot_be_optimized() {
    let dmp = Dmp::new(
        1.0,
        DVector::zeros(1),
        DVector::from_element(1, 1.0),
        vec![Box::new(Rbfn::default()) as Box<dyn FunctionApproximator>],
        DmpType::default(),
    )
    .unwrap();
    assert!(DmpTaskSolver::new(dmp, linspace(0.0, 1.0, 11)).is_err());
}

#[test]
fn optimization_pulls_trajectory_through_viapoint() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let dmp = trained_dmp();
    let weights = dmp.parameter_vector().unwrap();
    let n = weights.len();
    let solver = DmpTaskSolver::new(dmp, linspace(0.0, 1.0, 51)).unwrap();
    let task = ViapointTask::new(DVector::from_element(1, 0.8), Some(0.5), 0.0).unwrap();

    let initial = Distribution::new(weights, DMatrix::identity(n, n) * 400.0).unwrap();
    let updater = UpdaterCovarDecay::new(0.9, WeightingMethod::default()).unwrap();
    let config = OptimizationConfig {
        n_updates: 20,
        n_samples_per_update: 10,
        parallel_rollouts: true,
        seed: Some(7),
    };
    let run = run_optimization_task(&task, &solver, initial, &updater, &config, None).unwrap();

    let rows = run.learning_curve.rows();
    let first = rows[0].cost_eval;
    assert!((first - 0.3).abs() < 0.05, "min-jerk passes 0.5 at mid-time, got {first}");

    let final_mean = run.final_distribution().unwrap().mean().clone();
    let final_cost = task.evaluate_rollout(&solver.perform_rollout(&final_mean).unwrap()).unwrap()[0];
    assert!(final_cost < 0.5 * first, "viapoint cost went from {first} to {final_cost}");
}
